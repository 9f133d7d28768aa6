// https://redis.io/docs/reference/protocol-spec

use std::fmt;

use bytes::Bytes;
use itertools::Itertools;
use thiserror::Error as ThisError;

use crate::codec::Error;

/// A single RESP datum.
///
/// The representation is private: a `Value` is either produced by the decoder or built through
/// one of the constructors below, which keep simple strings and errors on a single line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value(pub(crate) Repr);

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Repr {
    Simple(Bytes),
    Error(Bytes),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Value>>),
}

/// The error carried by a RESP error value.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{0}")]
pub struct ReplyError(pub String);

impl Value {
    pub fn simple_string(s: impl AsRef<str>) -> Value {
        Value(Repr::Simple(single_line(s.as_ref().as_bytes())))
    }

    pub fn error(err: impl fmt::Display) -> Value {
        Value(Repr::Error(single_line(err.to_string().as_bytes())))
    }

    pub fn integer(i: i64) -> Value {
        Value(Repr::Integer(i))
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Value {
        Value(Repr::Bulk(Some(data.into())))
    }

    pub fn null_bulk_string() -> Value {
        Value(Repr::Bulk(None))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value(Repr::Array(Some(elements)))
    }

    pub fn null_array() -> Value {
        Value(Repr::Array(None))
    }

    pub fn kind(&self) -> Kind {
        match self.0 {
            Repr::Simple(_) => Kind::SimpleString,
            Repr::Error(_) => Kind::Error,
            Repr::Integer(_) => Kind::Integer,
            Repr::Bulk(_) => Kind::BulkString,
            Repr::Array(_) => Kind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.0, Repr::Bulk(None) | Repr::Array(None))
    }

    /// Returns the stored integer, or a best-effort decimal parse of the string form. Anything
    /// that does not parse is `0`.
    pub fn to_integer(&self) -> i64 {
        match self.0 {
            Repr::Integer(i) => i,
            _ => self.to_string().parse().unwrap_or(0),
        }
    }

    /// Raw bytes of textual values, the string form of everything else.
    pub fn as_bytes(&self) -> Bytes {
        match &self.0 {
            Repr::Simple(text) | Repr::Error(text) | Repr::Bulk(Some(text)) => text.clone(),
            _ => Bytes::from(self.to_string()),
        }
    }

    pub fn as_error(&self) -> Option<ReplyError> {
        match &self.0 {
            Repr::Error(text) => Some(ReplyError(String::from_utf8_lossy(text).into_owned())),
            _ => None,
        }
    }

    /// Elements of a non-null array. Any other value, including a null array, yields an empty
    /// slice.
    pub fn as_array(&self) -> &[Value] {
        match &self.0 {
            Repr::Array(Some(elements)) => elements,
            _ => &[],
        }
    }

    pub fn into_array(self) -> Vec<Value> {
        match self.0 {
            Repr::Array(Some(elements)) => elements,
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Simple(text) | Repr::Error(text) | Repr::Bulk(Some(text)) => {
                write!(f, "{}", String::from_utf8_lossy(text))
            }
            Repr::Bulk(None) => Ok(()),
            Repr::Integer(i) => write!(f, "{}", i),
            Repr::Array(elements) => {
                let elements = elements.as_deref().unwrap_or_default();
                write!(f, "[{}]", elements.iter().join(" "))
            }
        }
    }
}

// CR and LF would end the line early on the wire.
fn single_line(src: &[u8]) -> Bytes {
    src.iter()
        .map(|&b| if b == b'\r' || b == b'\n' { b' ' } else { b })
        .collect::<Vec<u8>>()
        .into()
}

/// The leading byte of every RESP-serialized value identifies its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    SimpleString, // '+'
    Error,        // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for Kind {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Kind, Error> {
        match byte {
            b'+' => Ok(Kind::SimpleString),
            b'-' => Ok(Kind::Error),
            b':' => Ok(Kind::Integer),
            b'$' => Ok(Kind::BulkString),
            b'*' => Ok(Kind::Array),
            _ => Err(Error::InvalidDataType(byte)),
        }
    }
}

impl From<Kind> for u8 {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::SimpleString => b'+',
            Kind::Error => b'-',
            Kind::Integer => b':',
            Kind::BulkString => b'$',
            Kind::Array => b'*',
        }
    }
}
