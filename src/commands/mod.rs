pub mod executable;
pub mod get;
pub mod set;

use futures::future::BoxFuture;
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::connection::Connection;
use crate::server::Server;
use crate::store::Store;
use crate::value::Value;
use crate::Result;

use get::Get;
use set::Set;

/// Replied when a command is called with the wrong number of arguments. The connection stays
/// open.
#[derive(Debug, PartialEq, ThisError)]
#[error("ERR wrong number of arguments for '{0}' command")]
pub struct WrongArity(pub &'static str);

/// Registers the bundled commands on `server`, all backed by `store`.
pub fn register(server: &Server, store: Store) {
    let set_store = store.clone();
    server.handle("set", move |conn, args| run::<Set>(&set_store, conn, args));
    server.handle("get", move |conn, args| run::<Get>(&store, conn, args));
}

fn run<'a, C>(
    store: &Store,
    conn: &'a mut Connection,
    args: Vec<Value>,
) -> BoxFuture<'a, Result<()>>
where
    C: Executable + TryFrom<Vec<Value>, Error = WrongArity>,
{
    let reply = match C::try_from(args) {
        Ok(cmd) => cmd.exec(store),
        Err(e) => Value::error(e),
    };

    Box::pin(async move {
        conn.write_value(reply).await?;
        Ok(())
    })
}
