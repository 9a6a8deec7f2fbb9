//! # medrender config
//!
//! TOML configuration for the medrender service: browser launch, render
//! tuning, retry policy, TOC selectors and logging.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
