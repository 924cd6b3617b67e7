//! mmdkit Core Library
//!
//! This crate provides common types, utilities, error handling and logging
//! setup shared across all mmdkit components.

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use glam;
pub use types::*;
