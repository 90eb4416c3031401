// File: ./src/model/mod.rs
pub mod defaults;
pub mod item;

pub use defaults::{default_dataset, default_events, default_help};
pub use item::{
    ContactLink, Dataset, Event, HelpService, ItemKind, Record, RecordStatus, new_record_id,
    remove_by_id, upsert,
};
