//! File system helpers.

pub mod source;
pub mod walker;
