// src/error/mod.rs
//! Error taxonomy for the routing engine.
//!
//! Constraint violations (slippage, gas, hops) are NOT errors; they are
//! normal filtering outcomes recorded on rejected candidates. Errors here
//! are the typed failures the caller can actually receive.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// All candidate paths were filtered out or none existed.
    #[error("No viable route: {reason}")]
    NoViableRoute { reason: String },

    /// The requested network is not in the supported set.
    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    /// Non-positive or non-finite trade amount.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// An upstream feed is down AND no cached or synthetic fallback exists.
    /// Feed failures with a fallback are recovered locally and never
    /// surface as this variant.
    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    /// No pool exists for the requested pair on the requested network.
    #[error("Pool not found for {token_in}/{token_out} on {network}")]
    PoolNotFound {
        token_in: String,
        token_out: String,
        network: String,
    },

    /// Malformed caller input (empty quote list, same-token pair, etc.).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RouterError {
    pub fn no_route(reason: impl Into<String>) -> Self {
        RouterError::NoViableRoute { reason: reason.into() }
    }

    /// Whether a caller-side retry with fresher quotes could succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            RouterError::NoViableRoute { .. } => true,
            RouterError::FeedUnavailable(_) => true,
            RouterError::UnsupportedNetwork(_) => false,
            RouterError::InvalidAmount(_) => false,
            RouterError::PoolNotFound { .. } => true,
            RouterError::InvalidInput(_) => false,
        }
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::InvalidInput(format!("JSON error: {}", err))
    }
}

pub type RouterResult<T> = Result<T, RouterError>;
