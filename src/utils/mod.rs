//! Utility functions and types for the positioning service.

pub mod error;
mod logging;
pub mod types;

pub use error::Error;
pub use logging::{init_logging, LOG_ENV};
pub use types::*;
