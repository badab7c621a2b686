//! Transport-side adapters: JSON-lines request scripts and CSV export.

pub mod csv;
pub mod jsonl;
