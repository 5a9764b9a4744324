//! Command-line toolchain adapters
//!
//! [`CommandToolchain`] implements the `Linter`, `TypeChecker` and
//! `TestRunner` ports by running the tools found on `PATH`:
//!
//! | Project | Lint | Types | Tests |
//! |---------|------|-------|-------|
//! | Rust (`Cargo.toml`) | `cargo clippy` | `cargo check` | `cargo test` |
//! | Python | `ruff check` | `mypy` | `pytest` on affected test files |
//! | Node (`package.json`) | `eslint` | `tsc --noEmit` | `npm test` |
//! | Go (`go.mod`) | `go vet` | `go build` | `go test` on changed packages |
//!
//! A missing tool yields `CheckRun::Unavailable`, which verification
//! reports as skipped rather than failed.

mod command_toolchain;
mod project;

pub use command_toolchain::CommandToolchain;
pub use project::{CommandSpec, ProjectType};
