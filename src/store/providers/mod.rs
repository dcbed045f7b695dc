pub mod airtable;
pub mod memory;

pub use airtable::AirtableStore;
pub use memory::MemoryRecordStore;
