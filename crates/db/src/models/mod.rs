//! Row structs and insert DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus conversions into core domain types where the row
//! stores something the engine understands.

pub mod activity;
pub mod event;
pub mod schedule_definition;
pub mod sequence_template;
