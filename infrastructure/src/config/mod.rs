//! Configuration file loading for ratchet
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `RATCHET_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./ratchet.toml` or `./.ratchet.toml`
//! 4. Global: `$XDG_CONFIG_HOME/ratchet/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileContextConfig, FileLoggingConfig,
    FileOutputConfig, FilePlannerConfig, FileVerificationConfig,
};
pub use loader::{ConfigLoader, ConfigSource, SourceKind};
