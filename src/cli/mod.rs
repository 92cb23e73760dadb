// src/cli/mod.rs
pub mod args;

pub use args::{BuildArgs, Cli, ColorMode, Commands};
