//! Rows and payloads exchanged with the database

mod profile;
mod project;
mod records;

pub use profile::*;
pub use project::*;
pub use records::*;
