//! CLI command implementations.

pub mod clean;
pub mod deps;
pub mod init;
pub mod install;
pub mod progress;
pub mod status;
