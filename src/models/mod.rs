//! Models Module - Data Structures & Configuration
//!
//! Errors, domain records and runtime configuration shared by every layer.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
