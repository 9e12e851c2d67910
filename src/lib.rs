//! Loads Pkl configuration modules into a layered, flat property environment.
//!
//! Modules are evaluated, then flattened into dotted/bracketed paths such as
//! `servers[0].host`, keeping explicit nulls and empty containers apart from
//! absent properties.

pub mod config;
pub mod context;
mod error;

pub use config::{Config, ConfigError, Environment};
pub use context::AppContext;
pub use error::Error;
