//! Shared plumbing for the ecunet tools: error type, configuration loading
//! and logging bootstrap

pub mod config_loader;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
