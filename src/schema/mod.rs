//! Source table schema
//!
//! This module defines the untyped input table and the mapping from logical
//! measurement fields to its columns.

mod mapping;
mod table;

pub use mapping::*;
pub use table::*;
