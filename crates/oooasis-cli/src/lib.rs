//! Command-line front end for OOOasis.

pub mod app;
pub mod cli;
pub mod output;

pub use cli::{Cli, Mode};
