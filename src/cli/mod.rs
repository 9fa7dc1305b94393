//! Command-line interface module.

mod args;
mod input;
pub mod render;
pub mod serve;

pub use args::{Cli, Commands};
pub use input::Input;
