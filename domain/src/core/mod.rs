//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelId`]: opaque model identifier handed to the gateway
//! - [`error::DomainError`]: domain-level errors
//! - [`string`]: UTF-8 safe truncation helpers

pub mod error;
pub mod model;
pub mod string;
