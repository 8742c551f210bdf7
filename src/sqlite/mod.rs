//! SQLite backend
//!
//! Schema introspection and read-only statement execution against an
//! existing SQLite database file. The file is never created, migrated or
//! written to.

pub mod engine;
pub mod introspect;

pub use engine::{open_read_only, SqliteBackend};
pub use introspect::{quote_identifier, read_schema};
