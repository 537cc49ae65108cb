//! Subcommands of the `fieldscan` binary.

pub mod batch;
pub mod config;
pub mod process;
pub mod schema;
pub mod source;
