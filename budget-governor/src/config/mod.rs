//! Configuration module for the budget governor
//!
//! Configuration is read from the `[budget]` table of a TOML file. Every
//! field has a default, so an absent file or an empty table yields a working
//! governor with a $100 daily budget.

pub mod types;

pub use types::*;
