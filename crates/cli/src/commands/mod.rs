//! CLI command implementations

pub mod generate;
pub mod schema;
pub mod version;
