//! Date extractors.
//!
//! `rules.rs` holds the ordered rule list, `helpers.rs` the capture parsing
//! shared by the productions. Order matters: the first rule (and, within a
//! rule, the first match in the text) that yields an in-range year wins.

pub mod helpers;
pub mod rules;


pub use rules::get;
