//! # Vigil Core
//!
//! Shared foundation for the Vigil workspace: the error taxonomy and the
//! TOML configuration layer. Everything else (report pipeline, scheduler,
//! channels) builds on these types.

pub mod config;
pub mod error;

pub use config::VigilConfig;
pub use error::{Result, VigilError};
