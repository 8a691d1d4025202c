//! Skillbot Common - Shared configuration, logging, and error types.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Logging setup with noise filtering
//! - Error types shared across Skillbot services

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    AssistantConfig, Config, ObservabilityConfig, ServerConfig, SessionConfig,
};
pub use error::{Error, Result};
pub use logging::init_logging;
