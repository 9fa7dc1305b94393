//! Small helpers shared across commands.

pub mod browser;
pub mod hash;
pub mod html;
pub mod path;
