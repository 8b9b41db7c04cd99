//! Command-line interface.

pub mod args;

pub use args::{resolve_site, Args, Command, PullArgs, SearchArgs};
