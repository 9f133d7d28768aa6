use crate::commands::executable::Executable;
use crate::commands::WrongArity;
use crate::store::Store;
use crate::value::Value;

/// Get the value of `key`. If the key does not exist the special value `nil` is returned as a
/// null bulk string (`$-1`), not as an empty simple string.
///
/// Ref: <https://redis.io/docs/latest/commands/get/>
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Executable for Get {
    fn exec(self, store: &Store) -> Value {
        match store.get(&self.key) {
            Some(value) => Value::bulk_string(value),
            None => Value::null_bulk_string(),
        }
    }
}

impl TryFrom<Vec<Value>> for Get {
    type Error = WrongArity;

    fn try_from(args: Vec<Value>) -> Result<Self, Self::Error> {
        match <[Value; 2]>::try_from(args) {
            Ok([_, key]) => Ok(Self {
                key: key.to_string(),
            }),
            Err(_) => Err(WrongArity("get")),
        }
    }
}
