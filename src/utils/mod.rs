//! Utility modules for the static generator.

pub mod exec;
pub mod fs;
pub mod minify;
pub mod xml;
