//! Centralized Error Handling Module
//!
//! Every failure the pipeline can observe carries a unique code so that
//! skipped tokens and reconnects can be audited from the logs alone.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - DECODE_xxx: malformed payloads (skip message, keep listening)
//! - ENRICH_xxx: ledger queries that failed or gave no usable data (fail-closed)
//! - TRANSPORT_xxx: feed connection problems (the only retried class)
//! - CFG_xxx: configuration errors (fatal at startup only)

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn is_decode(&self) -> bool {
        self.code.category() == ErrorCategory::Decode
    }

    pub fn is_enrichment(&self) -> bool {
        self.code.category() == ErrorCategory::Enrichment
    }

    pub fn is_transport(&self) -> bool {
        self.code.category() == ErrorCategory::Transport
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Coarse grouping used by the coordinator to pick a recovery policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Decode,
    Enrichment,
    Transport,
    Config,
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Decode Errors
    // ============================================
    /// Buffer shorter than the 8-byte discriminator
    DecodeMissingDiscriminator,
    /// A length prefix or fixed field reads past the buffer end
    DecodeTruncated,
    /// String field is not valid UTF-8
    DecodeInvalidUtf8,
    /// Program data payload is not valid base58
    DecodeInvalidBase58,
    /// Inbound frame is not valid JSON (or not the expected shape)
    DecodeMalformedJson,

    // ============================================
    // Enrichment Errors
    // ============================================
    /// Ledger RPC request failed (network, HTTP status)
    EnrichmentRpcFailed,
    /// Node answered with a JSON-RPC error object
    EnrichmentRpcError,
    /// Ledger RPC response could not be interpreted
    EnrichmentInvalidResponse,
    /// Largest-holder query returned accounts whose amounts sum to zero
    EnrichmentZeroSupply,
    /// Assessment exceeded its time budget
    EnrichmentTimeout,
    /// Assessment was cancelled by shutdown
    EnrichmentCancelled,

    // ============================================
    // Transport Errors
    // ============================================
    /// WebSocket connect or subscribe failed
    TransportConnectFailed,
    /// Feed closed by peer or dropped
    TransportClosed,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecodeMissingDiscriminator => "DECODE_MISSING_DISCRIMINATOR",
            Self::DecodeTruncated => "DECODE_TRUNCATED",
            Self::DecodeInvalidUtf8 => "DECODE_INVALID_UTF8",
            Self::DecodeInvalidBase58 => "DECODE_INVALID_BASE58",
            Self::DecodeMalformedJson => "DECODE_MALFORMED_JSON",

            Self::EnrichmentRpcFailed => "ENRICH_RPC_FAILED",
            Self::EnrichmentRpcError => "ENRICH_RPC_ERROR",
            Self::EnrichmentInvalidResponse => "ENRICH_INVALID_RESPONSE",
            Self::EnrichmentZeroSupply => "ENRICH_ZERO_SUPPLY",
            Self::EnrichmentTimeout => "ENRICH_TIMEOUT",
            Self::EnrichmentCancelled => "ENRICH_CANCELLED",

            Self::TransportConnectFailed => "TRANSPORT_CONNECT_FAILED",
            Self::TransportClosed => "TRANSPORT_CLOSED",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::DecodeMissingDiscriminator
            | Self::DecodeTruncated
            | Self::DecodeInvalidUtf8
            | Self::DecodeInvalidBase58
            | Self::DecodeMalformedJson => ErrorCategory::Decode,
            Self::EnrichmentRpcFailed
            | Self::EnrichmentRpcError
            | Self::EnrichmentInvalidResponse
            | Self::EnrichmentZeroSupply
            | Self::EnrichmentTimeout
            | Self::EnrichmentCancelled => ErrorCategory::Enrichment,
            Self::TransportConnectFailed | Self::TransportClosed => ErrorCategory::Transport,
            Self::ConfigInvalidValue => ErrorCategory::Config,
        }
    }

    /// Only transport failures are retried; everything else is recovered locally
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transport
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    pub fn missing_discriminator(len: usize) -> Self {
        Self::new(
            ErrorCode::DecodeMissingDiscriminator,
            format!("Buffer of {} bytes is shorter than the 8-byte discriminator", len),
        )
    }

    pub fn truncated(field: &str, offset: usize, needed: usize, len: usize) -> Self {
        Self::new(
            ErrorCode::DecodeTruncated,
            format!(
                "Field '{}' needs {} bytes at offset {} but buffer has {}",
                field, needed, offset, len
            ),
        )
    }

    pub fn invalid_utf8(field: &str, err: std::str::Utf8Error) -> Self {
        Self::with_source(
            ErrorCode::DecodeInvalidUtf8,
            format!("Field '{}' is not valid UTF-8", field),
            err,
        )
    }

    pub fn invalid_base58(err: bs58::decode::Error) -> Self {
        Self::with_source(ErrorCode::DecodeInvalidBase58, "Program data is not base58", err)
    }

    pub fn rpc_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EnrichmentRpcFailed, msg)
    }

    pub fn rpc_error(code: i64, msg: &str) -> Self {
        Self::new(
            ErrorCode::EnrichmentRpcError,
            format!("RPC error {}: {}", code, msg),
        )
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::EnrichmentInvalidResponse, msg)
    }

    pub fn zero_supply(mint: &str) -> Self {
        Self::new(
            ErrorCode::EnrichmentZeroSupply,
            format!("Largest holders of {} sum to zero", mint),
        )
    }

    pub fn enrichment_timeout(ms: u64) -> Self {
        Self::new(
            ErrorCode::EnrichmentTimeout,
            format!("Enrichment exceeded {}ms", ms),
        )
    }

    pub fn enrichment_cancelled() -> Self {
        Self::new(ErrorCode::EnrichmentCancelled, "Assessment cancelled by shutdown")
    }

    pub fn connect_failed(feed: &str, msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TransportConnectFailed,
            format!("{} feed: {}", feed, msg.into()),
        )
    }

    pub fn transport_closed(feed: &str) -> Self {
        Self::new(ErrorCode::TransportClosed, format!("{} feed closed", feed))
    }

    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: '{}'", key, value),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::EnrichmentTimeout, "Request timeout")
        } else {
            Self::with_source(ErrorCode::EnrichmentRpcFailed, "HTTP request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::DecodeMalformedJson, "JSON parse error", err)
    }
}
