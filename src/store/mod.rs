//! Typed property bags: an in-memory flavor for bus calls
//! ([`KeyValueStore`]) and a persistent, group-qualified flavor for
//! profile storage ([`StoreInterface`]).

mod key_value_store;
mod persistent;
mod value;

pub use key_value_store::KeyValueStore;
pub use persistent::{JsonStore, StoreInterface};
pub use value::Value;
