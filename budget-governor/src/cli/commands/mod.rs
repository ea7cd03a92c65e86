//! CLI commands module

pub mod history;
pub mod report;
pub mod reset;
pub mod status;
pub mod watch;
