//! Gantry Core - Core library for the Gantry task orchestrator
//!
//! This crate provides the error types and the declarative configuration
//! layer (loading, validation, defaults) shared by the orchestrator and CLI.

pub mod config;
pub mod error;

pub use config::{BuildConfiguration, Condition, Config, TaskConfig};
pub use error::{ConfigError, GantryError, Result};
