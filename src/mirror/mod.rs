//! Local mirror of recently fetched remote records.
//!
//! Rows are keyed by entity type and a scope derived from the list filter,
//! carry their absolute list position, and a mirror-only timestamp that
//! callers compare against the freshness window.

mod storage;
mod traits;

pub use storage::SqliteMirror;
pub use traits::{MirrorCache, MirrorCount, MirrorEntry, MirrorKey};
