//! Providers Module - External Data Sources
//!
//! Feed subscriptions over WebSocket and ledger queries over JSON-RPC.

pub mod solana;
pub mod websocket;

pub use solana::*;
pub use websocket::*;
