//! Infrastructure layer for ratchet
//!
//! Adapters that implement the ports defined in the application layer:
//! configuration loading, JSONL persistence, the local workspace, the
//! tree-sitter syntax parser, the command-line toolchain and local tools.

pub mod config;
pub mod persistence;
pub mod process;
pub mod syntax;
pub mod toolchain;
pub mod tools;
pub mod workspace;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigSource, ConfigValidationError, FileAgentConfig, FileConfig,
    FileContextConfig, FileLoggingConfig, FileOutputConfig, FilePlannerConfig,
    FileVerificationConfig, SourceKind,
};
pub use persistence::JsonlPersistenceStore;
pub use syntax::TreeSitterParser;
pub use toolchain::{CommandSpec, CommandToolchain, ProjectType};
pub use tools::default_registry;
pub use workspace::LocalWorkspace;
