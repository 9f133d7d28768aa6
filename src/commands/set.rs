use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::WrongArity;
use crate::store::Store;
use crate::value::Value;

/// Set `key` to hold the string `value`, overwriting any previous value.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
}

impl Executable for Set {
    fn exec(self, store: &Store) -> Value {
        store.set(self.key, self.value);

        Value::simple_string("OK")
    }
}

impl TryFrom<Vec<Value>> for Set {
    type Error = WrongArity;

    fn try_from(args: Vec<Value>) -> Result<Self, Self::Error> {
        match <[Value; 3]>::try_from(args) {
            Ok([_, key, value]) => Ok(Self {
                key: key.to_string(),
                value: value.as_bytes(),
            }),
            Err(_) => Err(WrongArity("set")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_key() {
        let args = vec![
            Value::bulk_string("SET"),
            Value::bulk_string("key1"),
            Value::bulk_string("value1"),
        ];
        let cmd = Set::try_from(args).unwrap();

        assert_eq!(
            cmd,
            Set {
                key: String::from("key1"),
                value: Bytes::from("value1"),
            }
        );

        let store = Store::new();

        let result = cmd.exec(&store);

        assert_eq!(result, Value::simple_string("OK"));
        assert_eq!(store.get("key1"), Some(Bytes::from("value1")));
    }

    #[test]
    fn overwrite_key() {
        let store = Store::new();
        store.set(String::from("key1"), Bytes::from("old"));

        let args = vec![
            Value::bulk_string("set"),
            Value::bulk_string("key1"),
            Value::integer(10),
        ];
        let result = Set::try_from(args).unwrap().exec(&store);

        assert_eq!(result, Value::simple_string("OK"));
        assert_eq!(store.get("key1"), Some(Bytes::from("10")));
    }

    #[test]
    fn wrong_number_of_arguments() {
        let args = vec![Value::bulk_string("SET"), Value::bulk_string("key1")];

        let err = Set::try_from(args).unwrap_err();

        assert_eq!(
            err.to_string(),
            "ERR wrong number of arguments for 'set' command"
        );
    }
}
