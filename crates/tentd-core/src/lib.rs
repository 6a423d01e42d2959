//! Core types, configuration, and errors for tentd.
//!
//! This crate holds the pieces shared by the authentication core, the HTTP
//! layer, and the server binary: environment-driven configuration, the core
//! error type, and the [`EntityRef`] identity that keypairs are bound to.

mod config;
mod error;
mod types;

pub use config::TentdConfig;
pub use error::{TentdError, TentdResult};
pub use types::EntityRef;
