//! # fftiers Common Library
//!
//! Shared code for the fftiers crates:
//! - Error type and `Result` alias
//! - Configuration loading (TOML file, environment overrides, compiled defaults)

pub mod config;
pub mod error;

pub use error::{Error, Result};
