//! gdbfront-config — configuration for gdbfront sessions.
//!
//! Covers the TOML configuration file (debugger binary, launch target,
//! session tuning, logging), platform directories, discovery of GDB
//! binaries on `PATH`, and init-script templates.

pub mod config;
pub mod discover;
pub mod error;
pub mod load;
pub mod merge;
pub mod paths;
pub mod templates;
pub mod validate;

pub use config::{Config, DebuggerConfig, LaunchConfig, LogConfig, LogLevel, SessionConfig};
pub use error::ConfigError;
pub use load::{load_config, load_file, load_from_str};
pub use paths::{DefaultPaths, PlatformPaths};
pub use templates::Template;
