//! CLI command implementations.

pub mod common;
pub mod config;
pub mod georef;
pub mod mosaic;
pub mod solve;
