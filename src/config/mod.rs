//! Configuration module for Shelfwatch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shelfwatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shelfwatch.toml")).unwrap();
//! println!("Pool refreshes per session: {}", config.egress.max_global_refreshes);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DatasetConfig, EgressConfig, FetchConfig, SiteConfig, SupervisorConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
