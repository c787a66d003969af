//! Configuration module for Feedvault
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use feedvault::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Archiving {} authors", config.authors.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthorEntry, Config, CrawlerConfig, CredentialsConfig, OutputConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
