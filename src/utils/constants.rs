//! Constants Module
//!
//! Single source of truth for endpoints, program ids, thresholds and
//! unit conversions. Config defaults read from here.

// ============================================
// ENDPOINTS
// ============================================

/// PumpPortal token-creation feed
pub const DEFAULT_PUMP_FEED_WSS_URL: &str = "wss://pumpportal.fun/api/data";

/// Solana mainnet WebSocket (logsSubscribe)
pub const DEFAULT_SOLANA_WSS_URL: &str = "wss://api.mainnet-beta.solana.com";

/// Solana mainnet JSON-RPC (getBalance, getTokenLargestAccounts)
pub const DEFAULT_SOLANA_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// pump.fun bonding-curve program
pub const PUMP_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

pub const USER_AGENT: &str = concat!("launch_sentry/", env!("CARGO_PKG_VERSION"));

// ============================================
// WIRE FORMAT
// ============================================

/// Anchor instruction/event discriminator length
pub const DISCRIMINATOR_LEN: usize = 8;

/// Raw Solana public key length
pub const PUBKEY_LEN: usize = 32;

/// Log line prefix carrying encoded event payloads
pub const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// Method name of the PumpPortal new-token envelope
pub const NEW_TOKEN_METHOD: &str = "newToken";

// ============================================
// RISK & SCORING DEFAULTS
// ============================================

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Creators holding less than this (SOL) are treated as throwaway wallets
pub const DEFAULT_MIN_CREATOR_BALANCE_SOL: f64 = 1.0;

/// Top holder share (percent, inclusive) at which a token is a rug risk
pub const DEFAULT_MAX_TOP_HOLDER_PCT: f64 = 90.0;

pub const DEFAULT_AUTO_BUY_SCORE: f64 = 100.0;
pub const DEFAULT_HIGH_POTENTIAL_SCORE: f64 = 50.0;

/// Number of recent token names reported per creator
pub const RECENT_NAMES_LIMIT: usize = 3;

// ============================================
// RUNTIME DEFAULTS
// ============================================

pub const DEFAULT_MAX_IN_FLIGHT: usize = 50;
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_ENRICHMENT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RPC_MAX_RETRIES: u32 = 2;
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 30;

/// Base delay between JSON-RPC retries (milliseconds)
pub const RPC_RETRY_BASE_MS: u64 = 100;

/// Jitter applied to retry and reconnect delays (percent)
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Reconnection base delay (milliseconds)
pub const WS_RECONNECT_BASE_MS: u64 = 1_000;

/// Maximum reconnection delay (milliseconds)
pub const WS_RECONNECT_MAX_MS: u64 = 30_000;

/// Buffered frames per feed before the reader task waits on the dispatcher
pub const FEED_CHANNEL_CAPACITY: usize = 1_000;

/// Convert lamports to SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

/// Check if address looks like Solana (base58, 32-44 chars, no 0x prefix)
pub fn is_solana_address(address: &str) -> bool {
    !address.starts_with("0x")
        && address.len() >= 32
        && address.len() <= 44
        && address.chars().all(|c| c.is_alphanumeric())
}
