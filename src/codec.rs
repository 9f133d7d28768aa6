use bytes::BytesMut;
use std::io;
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::reader::Decoding;
use crate::value::Value;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Protocol error: unknown first byte {0:#04x}")]
    InvalidDataType(u8),
    #[error("Protocol error: {0}")]
    Protocol(&'static str),
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Malformed framing: a bad tag byte, an out of range length, too deep a nesting or a bad
    /// bulk terminator.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::InvalidDataType(_) | Error::Protocol(_))
    }

    /// The peer sent bytes that cannot be decoded, as opposed to the transport failing.
    pub fn is_malformed(&self) -> bool {
        self.is_protocol() || matches!(self, Error::InvalidInteger(_))
    }
}

/// Decodes and encodes RESP values over a byte stream.
///
/// Decoding is incremental: a value that spans several reads is picked up where the previous
/// read left it.
#[derive(Debug, Default)]
pub struct ValueCodec {
    decoding: Decoding,
}

impl ValueCodec {
    pub fn new() -> ValueCodec {
        ValueCodec::default()
    }
}

impl Decoder for ValueCodec {
    type Item = Value;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decoding.decode(src)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(value) => Ok(Some(value)),
            None if src.is_empty() && self.decoding.is_idle() => Ok(None),
            None => Err(Error::UnexpectedEof),
        }
    }
}

impl Encoder<Value> for ValueCodec {
    type Error = Error;

    fn encode(&mut self, value: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        value.encode(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_consumes_exactly_one_value() {
        let mut codec = ValueCodec::new();
        let mut src = BytesMut::from(&b"+OK\r\n:12\r\n"[..]);

        let value = codec.decode(&mut src).unwrap();

        assert_eq!(value, Some(Value::simple_string("OK")));
        assert_eq!(&src[..], b":12\r\n");

        let value = codec.decode(&mut src).unwrap();

        assert_eq!(value, Some(Value::integer(12)));
        assert!(src.is_empty());
    }

    #[test]
    fn decode_waits_for_more_data() {
        let mut codec = ValueCodec::new();
        let mut src = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$3\r\nfo"[..]);

        assert_eq!(codec.decode(&mut src).unwrap(), None);
        // Everything up to the unfinished payload is consumed.
        assert_eq!(&src[..], b"fo");

        src.extend_from_slice(b"o\r\n");

        assert_eq!(
            codec.decode(&mut src).unwrap(),
            Some(Value::array(vec![
                Value::bulk_string("GET"),
                Value::bulk_string("foo"),
            ]))
        );
    }

    #[test]
    fn decode_eof_between_values() {
        let mut codec = ValueCodec::new();
        let mut src = BytesMut::new();

        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn decode_eof_inside_a_value() {
        let mut codec = ValueCodec::new();
        let mut src = BytesMut::from(&b"$5\r\nhel"[..]);

        let err = codec.decode_eof(&mut src).unwrap_err();

        assert!(matches!(err, Error::UnexpectedEof));
        assert!(!err.is_malformed());
    }

    #[test]
    fn decode_eof_with_an_open_array() {
        let mut codec = ValueCodec::new();
        let mut src = BytesMut::from(&b"*2\r\n:1\r\n"[..]);

        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(src.is_empty());

        let err = codec.decode_eof(&mut src).unwrap_err();

        assert!(matches!(err, Error::UnexpectedEof));
    }

    #[test]
    fn encode_appends() {
        let mut codec = ValueCodec::new();
        let mut dst = BytesMut::new();

        codec.encode(Value::simple_string("OK"), &mut dst).unwrap();
        codec.encode(Value::null_bulk_string(), &mut dst).unwrap();

        assert_eq!(&dst[..], b"+OK\r\n$-1\r\n");
    }

    #[test]
    fn error_classification() {
        assert!(Error::InvalidDataType(b'x').is_protocol());
        assert!(Error::Protocol("invalid bulk length").is_protocol());
        assert!(!Error::InvalidInteger("x".to_string()).is_protocol());
        assert!(Error::InvalidInteger("x".to_string()).is_malformed());
        assert!(!Error::UnexpectedEof.is_malformed());
        assert!(!Error::Io(io::ErrorKind::BrokenPipe.into()).is_malformed());
    }

    #[test]
    fn protocol_error_messages() {
        assert_eq!(
            Error::Protocol("invalid bulk length").to_string(),
            "Protocol error: invalid bulk length"
        );
        assert_eq!(
            Error::InvalidDataType(b'!').to_string(),
            "Protocol error: unknown first byte 0x21"
        );
    }
}
