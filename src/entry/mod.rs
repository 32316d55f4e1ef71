pub mod store;

pub use store::{Entry, EntryStore, JsonEntryStore, NewEntry, StorageError};
