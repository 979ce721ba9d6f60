//! Storage layer for kyro-tally.
//!
//! [`RecordStore`] is the contract the engine writes through;
//! [`InMemoryRecordStore`] is the bundled thread-safe backend.

mod memory;
mod traits;

pub use memory::InMemoryRecordStore;
pub use traits::{AppliedUpdate, RecordStore, StorageError};
