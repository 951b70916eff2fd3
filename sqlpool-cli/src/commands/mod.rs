//! CLI command implementations.

pub mod bench;
pub mod status;
pub mod version;
