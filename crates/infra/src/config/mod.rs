//! Configuration loading and management
//!
//! This module provides utilities for loading the portal configuration
//! from files and environment variables.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_file, probe_config_paths};
