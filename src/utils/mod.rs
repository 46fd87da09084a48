//! Utils Module - Helper Functions & Shared Utilities
//!
//! Wire-format decoding, retry timing and the constants every other module reads.

pub mod constants;
pub mod decoder;
pub mod retry;

pub use constants::*;
pub use decoder::*;
pub use retry::backoff_delay;
