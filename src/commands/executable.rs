use crate::store::Store;
use crate::value::Value;

pub trait Executable {
    fn exec(self, store: &Store) -> Value;
}
