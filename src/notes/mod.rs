//! Notes module for Notekeeper
//!
//! Provides the entry codec, the append-only JSONL store and the
//! read-only query helpers used by the tool surface.

mod entry;
mod query;
mod store;

pub use entry::{decode, encode, Entry};
pub use query::{by_id, by_kind, containing, format_many, format_one};
pub use store::{ensure_directory, NoteStore};

/// Kind tag for questions the user wants to be taught about
pub const KIND_TEACH_REQUEST: &str = "teach.request";

/// Kind tag for lessons the user wants remembered
pub const KIND_TEACH_NOTE: &str = "teach.note";
