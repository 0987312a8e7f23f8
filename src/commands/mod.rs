//! CLI commands

pub mod convert;
pub mod generate;
pub mod list;
