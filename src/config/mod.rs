//! Configuration Module
//!
//! Loads and validates configuration from TOML files with environment
//! variable overrides.

pub mod loader;

pub use loader::{load_config, Config};
