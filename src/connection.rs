use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::codec::Error;
use crate::reader::Reader;
use crate::value::Value;
use crate::writer::Writer;

/// One client session. Values are decoded from the read half, replies go out through the
/// `Writer` operations this type derefs to.
pub struct Connection {
    id: Uuid,
    client_address: SocketAddr,
    reader: Reader<OwnedReadHalf>,
    writer: Writer<OwnedWriteHalf>,
}

impl Connection {
    pub fn new(stream: TcpStream, client_address: SocketAddr) -> Connection {
        let (reader, writer) = stream.into_split();

        Connection {
            id: Uuid::new_v4(),
            client_address,
            reader: Reader::new(reader),
            writer: Writer::new(writer),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn client_address(&self) -> SocketAddr {
        self.client_address
    }

    /// Reads the next value sent by the client, `None` once the client has closed the
    /// connection.
    pub async fn read_value(&mut self) -> Result<Option<Value>, Error> {
        self.reader.read().await
    }
}

impl Deref for Connection {
    type Target = Writer<OwnedWriteHalf>;

    fn deref(&self) -> &Self::Target {
        &self.writer
    }
}

impl DerefMut for Connection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.writer
    }
}
