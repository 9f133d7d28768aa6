use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error as ThisError;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::EnvFilter;

use crate::codec;
use crate::commands;
use crate::config::Config;
use crate::connection::Connection;
use crate::store::Store;
use crate::value::Value;
use crate::Result;

/// A command handler. It receives the connection, to write replies, and every element of the
/// command array, the command name included.
pub type Handler = Arc<
    dyn for<'a> Fn(&'a mut Connection, Vec<Value>) -> BoxFuture<'a, Result<()>> + Send + Sync,
>;

/// Starts a server with the bundled commands and serves until an accept fails.
pub async fn run(config: Config) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let server = Server::new();
    commands::register(&server, Store::new());

    server.listen_and_serve(config.addr()).await
}

/// Routes decoded commands to the handlers registered for them. Cloning is cheap, clones share
/// the registry.
#[derive(Clone, Default)]
pub struct Server {
    handlers: Arc<Mutex<HashMap<String, Handler>>>,
}

impl Server {
    pub fn new() -> Server {
        Server::default()
    }

    /// Registers `handler` for `command`. Names are case insensitive.
    pub fn handle<F>(&self, command: &str, handler: F)
    where
        F: for<'a> Fn(&'a mut Connection, Vec<Value>) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.handlers().insert(command.to_uppercase(), Arc::new(handler));
    }

    fn handler(&self, command: &str) -> Option<Handler> {
        self.handlers().get(command).cloned()
    }

    fn handlers(&self) -> MutexGuard<'_, HashMap<String, Handler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn listen_and_serve(&self, addr: impl ToSocketAddrs) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener`, each served by its own task. Only returns when
    /// accepting fails.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("Server listening on {}", listener.local_addr()?);

        loop {
            let (socket, client_address) = listener.accept().await?;
            info!("Accepted connection from {:?}", client_address);

            let server = self.clone();
            tokio::spawn(async move { server.handle_connection(socket, client_address).await });
        }
    }

    #[instrument(
        name = "connection",
        skip(self, stream, client_address),
        fields(connection_id, client_address = %client_address)
    )]
    async fn handle_connection(&self, stream: TcpStream, client_address: SocketAddr) {
        let mut conn = Connection::new(stream, client_address);

        tracing::Span::current().record("connection_id", tracing::field::display(conn.id()));

        match self.dispatch(&mut conn).await {
            Ok(()) => info!("Connection closed"),
            Err(e) => {
                if let Some(reply) = e.reply() {
                    // Best effort, the connection is closed either way.
                    let _ = conn.write_error(reply).await;
                }

                if e.is_transport() {
                    debug!("Connection dropped: {}", e);
                } else {
                    warn!("Connection closed on error: {}", e);
                }
            }
        }
    }

    /// Runs commands from `conn` in arrival order until the client leaves or something fails.
    async fn dispatch(&self, conn: &mut Connection) -> std::result::Result<(), ConnectionError> {
        while let Some(value) = conn.read_value().await? {
            debug!("Received value from client: {}", value);

            // Clients send commands as an array of bulk strings. Anything else reads as empty.
            let args = value.into_array();
            if args.is_empty() {
                continue;
            }

            let command = args[0].to_string().to_uppercase();

            match command.as_str() {
                "QUIT" => {
                    conn.write_simple_string("OK").await?;
                    return Ok(());
                }
                // Unlike Redis, the connection is closed after the reply.
                "PING" => {
                    conn.write_simple_string("PONG").await?;
                    return Ok(());
                }
                _ => {}
            }

            match self.handler(&command) {
                Some(handler) => handler(conn, args)
                    .await
                    .map_err(ConnectionError::Handler)?,
                None => {
                    debug!("Unknown command {}", command);
                    conn.write_error(format!("unknown command {}", command)).await?;
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, ThisError)]
enum ConnectionError {
    #[error(transparent)]
    Codec(#[from] codec::Error),
    #[error("handler failed: {0}")]
    Handler(crate::Error),
}

impl ConnectionError {
    /// The socket itself failed or was closed, nothing can be replied.
    fn is_transport(&self) -> bool {
        match self {
            ConnectionError::Codec(e) => !e.is_malformed(),
            ConnectionError::Handler(e) => {
                e.is::<io::Error>()
                    || e.downcast_ref::<codec::Error>()
                        .map_or(false, |e| !e.is_malformed())
            }
        }
    }

    fn reply(&self) -> Option<String> {
        if self.is_transport() {
            return None;
        }

        match self {
            ConnectionError::Codec(e) => Some(format!("ERR {}", e)),
            ConnectionError::Handler(_) => Some("ERR unknown error".to_string()),
        }
    }
}
