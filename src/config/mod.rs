//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, RegistryConfig, TimersConfig, NodeConfig)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that collect every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{Config, ConfigError, NodeConfig, RegistryConfig, RegistryMode, TimersConfig};
pub use validation::{ValidationError, validate};
