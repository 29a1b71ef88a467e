//! Date-keyed video archive
//!
//! One recording per calendar date, resolved by deterministic filename
//! derivation. Nothing is indexed or cached; existence is recomputed
//! against the filesystem on every query.

pub mod index;

pub use index::VideoArchive;
