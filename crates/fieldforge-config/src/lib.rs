//! Configuration system for FieldForge.
//!
//! Provides the default settings applied to new Bounds Controllers, the
//! regression-harness settings, and logging settings. Everything persists to
//! disk as a RON file with forward/backward compatible serialization.

mod config;
mod error;

pub use config::{
    BoundsSettings, CONFIG_DIR_ENV, CONFIG_FILE_NAME, Config, DebugConfig, HarnessConfig,
};
pub use error::ConfigError;
