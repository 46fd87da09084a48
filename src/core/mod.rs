//! Core Module - Launch Evaluation Pipeline
//!
//! Creator history, rug checks, viability scoring and the coordinator that
//! strings them together over the live feeds.

pub mod coordinator;
pub mod creator_ledger;
pub mod rug_check;
pub mod scorer;

pub use coordinator::*;
pub use creator_ledger::*;
pub use rug_check::*;
pub use scorer::*;
