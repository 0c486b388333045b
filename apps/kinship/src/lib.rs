//! # kinship
//!
//! Command-line front end over `kinship-core`.
//!
//! The binary in `main.rs` only installs logging and dispatches; argument
//! parsing and configuration live here so they can be tested directly.

pub mod cli;
pub mod config;
