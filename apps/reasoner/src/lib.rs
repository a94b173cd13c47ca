//! # reasoner
//!
//! Command-line front end for `reasoner-core`: file handling, configuration
//! and command dispatch. The binary in `main.rs` only initialises logging
//! and calls [`cli::execute`].

pub mod cli;
pub mod config;
