use bytes::{Buf, BytesMut};
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::{Error, ValueCodec};
use crate::value::{Kind, Repr, Value};

static CRLF: &[u8; 2] = b"\r\n";

/// Largest accepted bulk string payload.
pub const MAX_BULK_LENGTH: i64 = 512 * 1024 * 1024;

/// Largest accepted number of elements in a single array.
pub const MAX_ARRAY_LENGTH: i64 = 1024 * 1024;

/// Largest accepted number of arrays open at once, the outermost one included.
pub const MAX_DEPTH: usize = 512;

/// Decoding progress carried between reads. Every buffered byte is examined once: complete
/// headers, scalars and payloads are split off the buffer as soon as they arrive, and the
/// values built so far wait here for the rest of their enclosing arrays.
#[derive(Debug, Default)]
pub(crate) struct Decoding {
    /// Arrays still missing elements, innermost last.
    arrays: Vec<PartialArray>,
    /// Declared length of a bulk string whose header was already consumed.
    bulk: Option<usize>,
    /// Bytes of the pending line already searched for CRLF.
    scanned: usize,
}

#[derive(Debug)]
struct PartialArray {
    remaining: usize,
    elements: Vec<Value>,
}

enum Item {
    Value(Value),
    // Header of a non-empty array.
    Array(usize),
}

impl Decoding {
    /// True when no value has been started.
    pub(crate) fn is_idle(&self) -> bool {
        self.arrays.is_empty() && self.bulk.is_none()
    }

    /// Consumes whatever complete pieces `src` holds. Returns a value once its last byte has
    /// been consumed, `None` when more data is needed.
    pub(crate) fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, Error> {
        loop {
            let value = match self.next_item(src)? {
                Some(Item::Value(value)) => value,
                Some(Item::Array(length)) => {
                    // Dropping a value recurses once per level.
                    if self.arrays.len() >= MAX_DEPTH {
                        return Err(Error::Protocol("too many nested arrays"));
                    }
                    self.arrays.push(PartialArray {
                        remaining: length,
                        elements: Vec::with_capacity(length.min(1024)),
                    });
                    continue;
                }
                None => return Ok(None),
            };

            if let Some(value) = self.complete(value) {
                return Ok(Some(value));
            }
        }
    }

    /// Appends `value` to the innermost open array, closing every array it fills. Returns the
    /// outermost value once nothing is left open.
    fn complete(&mut self, mut value: Value) -> Option<Value> {
        while let Some(mut array) = self.arrays.pop() {
            array.elements.push(value);
            array.remaining -= 1;

            if array.remaining > 0 {
                self.arrays.push(array);
                return None;
            }

            value = Value::array(array.elements);
        }

        Some(value)
    }

    fn next_item(&mut self, src: &mut BytesMut) -> Result<Option<Item>, Error> {
        if let Some(length) = self.bulk {
            return self.bulk_payload(src, length);
        }

        let kind = match src.first() {
            Some(&byte) => Kind::try_from(byte)?,
            None => return Ok(None),
        };

        let line = match self.take_line(src) {
            Some(line) => line,
            None => return Ok(None),
        };

        let item = match kind {
            Kind::SimpleString => Item::Value(Value(Repr::Simple(line.freeze()))),
            Kind::Error => Item::Value(Value(Repr::Error(line.freeze()))),
            Kind::Integer => Item::Value(Value::integer(parse_integer(&line)?)),
            // $<length>\r\n<data>\r\n
            Kind::BulkString => {
                let length = parse_integer(&line)?;

                if length < 0 {
                    return Ok(Some(Item::Value(Value::null_bulk_string())));
                }

                // Checked before waiting on the payload so a bogus length never holds the
                // connection open.
                if length > MAX_BULK_LENGTH {
                    return Err(Error::Protocol("invalid bulk length"));
                }

                self.bulk = Some(length as usize);
                return self.bulk_payload(src, length as usize);
            }
            // *<number-of-elements>\r\n<element-1>...<element-n>
            Kind::Array => {
                let length = parse_integer(&line)?;

                if length < 0 {
                    Item::Value(Value::null_array())
                } else if length > MAX_ARRAY_LENGTH {
                    return Err(Error::Protocol("invalid multibulk length"));
                } else if length == 0 {
                    Item::Value(Value::array(Vec::new()))
                } else {
                    Item::Array(length as usize)
                }
            }
        };

        Ok(Some(item))
    }

    fn bulk_payload(&mut self, src: &mut BytesMut, length: usize) -> Result<Option<Item>, Error> {
        if src.len() < length + CRLF.len() {
            return Ok(None);
        }

        if &src[length..length + CRLF.len()] != CRLF {
            return Err(Error::Protocol("invalid bulk string ending"));
        }

        let data = src.split_to(length).freeze();
        src.advance(CRLF.len());
        self.bulk = None;

        Ok(Some(Item::Value(Value::bulk_string(data))))
    }

    /// Splits off the line at the front of `src`, tag byte and CRLF excluded. A lone LF is part
    /// of the line.
    fn take_line(&mut self, src: &mut BytesMut) -> Option<BytesMut> {
        // Skip the tag byte, and step back one byte in case a CR ended the previous scan.
        let start = self.scanned.max(1).min(src.len());

        match src[start..].windows(2).position(|window| window == CRLF) {
            Some(index) => {
                let end = start + index;
                let mut line = src.split_to(end + CRLF.len());
                line.truncate(end);
                line.advance(1);
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = src.len().saturating_sub(1);
                None
            }
        }
    }
}

/// Reads RESP values one at a time from an async byte source.
pub struct Reader<R> {
    inner: FramedRead<R, ValueCodec>,
}

impl<R: AsyncRead + Unpin> Reader<R> {
    pub fn new(src: R) -> Reader<R> {
        Reader {
            inner: FramedRead::new(src, ValueCodec::new()),
        }
    }

    /// Reads the next value. `Ok(None)` means the peer closed the stream between two values.
    pub async fn read(&mut self) -> Result<Option<Value>, Error> {
        self.inner.next().await.transpose()
    }

    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }
}

fn parse_integer(line: &[u8]) -> Result<i64, Error> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Error::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}
