//! Installation of declared Go modules into a project or the user-wide store.
//!
//! [`Installer`] runs the batch pipeline (resolve, fetch, extract, wire,
//! lock). The functions in [`ops`] and [`status`] implement the individual
//! commands on top of it.

pub mod buildtool;
pub mod error;
pub mod imports;
pub mod ops;
pub mod orchestrator;
pub mod report;
pub mod status;

#[cfg(test)]
mod testutil;

pub use buildtool::{BuildTool, GoModTool};
pub use error::{BuildToolError, InstallError};
pub use ops::{
    add, clean, default_name, init, install_project, parse_target, remove, update, Added,
    CleanOptions, Cleaned, UpdateRow, UpdateStatus, Updated,
};
pub use orchestrator::{InstallOptions, InstallReport, Installer, ModuleReport, Outcome, Stage};
pub use report::{format_report, format_table};
pub use status::{
    check, classify, list, versions, CheckRow, CheckStatus, ListRow, ListStatus, VersionNote,
    VersionRow,
};
