use bytes::{BufMut, Bytes, BytesMut};
use futures::SinkExt;
use std::fmt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::codec::{Error, ValueCodec};
use crate::value::{Kind, Repr, Value};

static CRLF: &[u8; 2] = b"\r\n";

impl Value {
    /// Appends the wire representation of the value to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match &self.0 {
            Repr::Simple(text) => put_line(dst, Kind::SimpleString, text),
            Repr::Error(text) => put_line(dst, Kind::Error, text),
            Repr::Integer(i) => put_line(dst, Kind::Integer, i.to_string().as_bytes()),
            Repr::Bulk(None) => put_line(dst, Kind::BulkString, b"-1"),
            Repr::Bulk(Some(data)) => {
                put_line(dst, Kind::BulkString, data.len().to_string().as_bytes());
                dst.reserve(data.len() + CRLF.len());
                dst.put_slice(data);
                dst.put_slice(CRLF);
            }
            Repr::Array(None) => put_line(dst, Kind::Array, b"-1"),
            Repr::Array(Some(elements)) => {
                put_line(dst, Kind::Array, elements.len().to_string().as_bytes());
                for element in elements {
                    element.encode(dst);
                }
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = BytesMut::new();
        self.encode(&mut bytes);
        bytes.to_vec()
    }
}

impl From<Value> for Vec<u8> {
    fn from(value: Value) -> Self {
        value.serialize()
    }
}

// <tag><line>\r\n
fn put_line(dst: &mut BytesMut, kind: Kind, line: &[u8]) {
    dst.reserve(1 + line.len() + CRLF.len());
    dst.put_u8(u8::from(kind));
    dst.put_slice(line);
    dst.put_slice(CRLF);
}

/// Writes RESP values to an async byte sink. Every write is flushed before it returns, so a
/// reply is on the wire before the next command is read.
pub struct Writer<W> {
    inner: FramedWrite<W, ValueCodec>,
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    pub fn new(dst: W) -> Writer<W> {
        Writer {
            inner: FramedWrite::new(dst, ValueCodec::new()),
        }
    }

    pub async fn write_value(&mut self, value: Value) -> Result<(), Error> {
        self.inner.send(value).await
    }

    pub async fn write_simple_string(&mut self, s: impl AsRef<str>) -> Result<(), Error> {
        self.write_value(Value::simple_string(s)).await
    }

    pub async fn write_error(&mut self, err: impl fmt::Display) -> Result<(), Error> {
        self.write_value(Value::error(err)).await
    }

    pub async fn write_integer(&mut self, i: i64) -> Result<(), Error> {
        self.write_value(Value::integer(i)).await
    }

    pub async fn write_bulk_string(&mut self, data: impl Into<Bytes>) -> Result<(), Error> {
        self.write_value(Value::bulk_string(data)).await
    }

    pub async fn write_null_bulk_string(&mut self) -> Result<(), Error> {
        self.write_value(Value::null_bulk_string()).await
    }

    pub async fn write_array(&mut self, elements: Vec<Value>) -> Result<(), Error> {
        self.write_value(Value::array(elements)).await
    }

    pub async fn write_null_array(&mut self) -> Result<(), Error> {
        self.write_value(Value::null_array()).await
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::codec::Decoder;

    fn round_trip(value: Value) {
        let mut src = BytesMut::from(&value.serialize()[..]);

        let decoded = ValueCodec::new().decode(&mut src).unwrap();

        assert_eq!(decoded, Some(value));
        assert!(src.is_empty());
    }

    #[test]
    fn serialize_simple_string() {
        assert_eq!(Value::simple_string("OK").serialize(), b"+OK\r\n");
        assert_eq!(Value::simple_string("").serialize(), b"+\r\n");
    }

    #[test]
    fn serialize_simple_string_stays_on_one_line() {
        assert_eq!(
            Value::simple_string("two\r\nlines").serialize(),
            b"+two  lines\r\n"
        );
    }

    #[test]
    fn serialize_error() {
        assert_eq!(
            Value::error("ERR unknown command FOOP").serialize(),
            b"-ERR unknown command FOOP\r\n"
        );
    }

    #[test]
    fn serialize_integer() {
        assert_eq!(Value::integer(1000).serialize(), b":1000\r\n");
        assert_eq!(Value::integer(-1).serialize(), b":-1\r\n");
        assert_eq!(
            Value::integer(i64::MIN).serialize(),
            b":-9223372036854775808\r\n"
        );
    }

    #[test]
    fn serialize_bulk_string() {
        assert_eq!(Value::bulk_string("foobar").serialize(), b"$6\r\nfoobar\r\n");
        assert_eq!(Value::bulk_string("").serialize(), b"$0\r\n\r\n");
        assert_eq!(Value::null_bulk_string().serialize(), b"$-1\r\n");
    }

    #[test]
    fn serialize_array() {
        let value = Value::array(vec![
            Value::bulk_string("SET"),
            Value::bulk_string("x"),
            Value::bulk_string("1"),
        ]);

        assert_eq!(
            value.serialize(),
            b"*3\r\n$3\r\nSET\r\n$1\r\nx\r\n$1\r\n1\r\n"
        );
        assert_eq!(Value::array(vec![]).serialize(), b"*0\r\n");
        assert_eq!(Value::null_array().serialize(), b"*-1\r\n");
    }

    #[test]
    fn serialize_is_idempotent() {
        let value = Value::array(vec![
            Value::integer(7),
            Value::array(vec![Value::null_bulk_string(), Value::error("oops")]),
        ]);

        assert_eq!(value.serialize(), value.serialize());
        assert_eq!(Vec::<u8>::from(value.clone()), value.serialize());
    }

    #[test]
    fn round_trips() {
        round_trip(Value::simple_string("OK"));
        round_trip(Value::error("ERR something went wrong"));
        round_trip(Value::integer(0));
        round_trip(Value::integer(i64::MAX));
        round_trip(Value::bulk_string(&b"\x00\xff\r\n binary"[..]));
        round_trip(Value::bulk_string(""));
        round_trip(Value::null_bulk_string());
        round_trip(Value::array(vec![]));
        round_trip(Value::null_array());
        round_trip(Value::array(vec![
            Value::simple_string("a"),
            Value::array(vec![
                Value::integer(-5),
                Value::null_array(),
                Value::array(vec![Value::bulk_string("deep")]),
            ]),
            Value::null_bulk_string(),
        ]));
    }

    #[tokio::test]
    async fn writer_helpers() {
        let mut writer = Writer::new(Vec::new());

        writer.write_simple_string("OK").await.unwrap();
        writer.write_error("ERR nope").await.unwrap();
        writer.write_integer(42).await.unwrap();
        writer.write_bulk_string("hello").await.unwrap();
        writer.write_null_bulk_string().await.unwrap();
        writer
            .write_array(vec![Value::integer(1), Value::bulk_string("a")])
            .await
            .unwrap();
        writer.write_null_array().await.unwrap();

        assert_eq!(
            writer.get_ref().as_slice(),
            &b"+OK\r\n-ERR nope\r\n:42\r\n$5\r\nhello\r\n$-1\r\n*2\r\n:1\r\n$1\r\na\r\n*-1\r\n"[..]
        );
    }

    #[tokio::test]
    async fn writer_reports_write_failures() {
        let mock = tokio_test::io::Builder::new()
            .write_error(std::io::ErrorKind::BrokenPipe.into())
            .build();
        let mut writer = Writer::new(mock);

        let err = writer.write_simple_string("OK").await.unwrap_err();

        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }
}
