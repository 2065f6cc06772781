//! uicheck CLI
//!
//! Command-line front end for the uicheck scenario runner.

pub mod commands;
pub mod output;
