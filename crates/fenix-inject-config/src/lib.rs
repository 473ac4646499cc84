//! # fenix-inject Config
//!
//! Configuration schema and loader for fenix-inject: named addon sources,
//! assembly options, and device-bridge settings.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
