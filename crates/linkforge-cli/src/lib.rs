//! Command-line administration for a linkforge mapping store.
//!
//! The binary parses [`cli::Cli`], opens a file-backed store and hands the
//! subcommand to [`command::execute`].

pub mod cli;
pub mod command;

pub use cli::Cli;
pub use command::execute;
