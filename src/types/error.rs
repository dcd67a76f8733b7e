use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmmError {
    #[error("Domain error in {op}: {message}")]
    Domain { op: &'static str, message: String },

    #[error("Fixed-point overflow in {0}")]
    Overflow(&'static str),

    #[error("Infeasible trade: {0}")]
    InfeasibleTrade(String),

    #[error("Solver did not converge after {iterations} iterations")]
    NonConvergence { iterations: u32 },

    #[error("Deposit ratio mismatch: expected {expected} (bounds {minimum}..={maximum}), got {provided}")]
    RatioMismatch {
        expected: String,
        minimum: String,
        maximum: String,
        provided: String,
    },

    #[error("Insufficient reserve: {0}")]
    InsufficientReserve(String),

    #[error("Pool has no liquidity")]
    EmptyPool,

    #[error("Insufficient liquidity tokens for {provider}: holds {held}, requested {requested}")]
    InsufficientBalance {
        provider: String,
        held: String,
        requested: String,
    },

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Event {index} failed: {source}")]
    Sequence {
        index: usize,
        #[source]
        source: Box<AmmError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decimal error: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AmmError>;

/// Stable error classification handed to UI collaborators for messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Domain,
    Overflow,
    InfeasibleTrade,
    NonConvergence,
    RatioMismatch,
    InsufficientReserve,
    EmptyPool,
    InsufficientBalance,
    InvalidEvent,
    InvalidParameters,
    Config,
    Io,
}

impl AmmError {
    pub fn domain(op: &'static str, message: impl Into<String>) -> Self {
        Self::Domain {
            op,
            message: message.into(),
        }
    }

    pub fn at_index(index: usize, source: AmmError) -> Self {
        Self::Sequence {
            index,
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AmmError::Domain { .. } => ErrorKind::Domain,
            AmmError::Overflow(_) => ErrorKind::Overflow,
            AmmError::InfeasibleTrade(_) => ErrorKind::InfeasibleTrade,
            AmmError::NonConvergence { .. } => ErrorKind::NonConvergence,
            AmmError::RatioMismatch { .. } => ErrorKind::RatioMismatch,
            AmmError::InsufficientReserve(_) => ErrorKind::InsufficientReserve,
            AmmError::EmptyPool => ErrorKind::EmptyPool,
            AmmError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            AmmError::InvalidEvent(_) => ErrorKind::InvalidEvent,
            AmmError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            AmmError::Sequence { source, .. } => source.kind(),
            AmmError::Config(_) => ErrorKind::Config,
            AmmError::Serialization(_) | AmmError::Decimal(_) => ErrorKind::InvalidEvent,
            AmmError::Io(_) => ErrorKind::Io,
        }
    }

    /// Short message suitable for end users, built from the error kind.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InfeasibleTrade | ErrorKind::InsufficientReserve | ErrorKind::EmptyPool => {
                "Insufficient liquidity for this trade"
            }
            ErrorKind::RatioMismatch => "Deposit does not match the pool ratio",
            ErrorKind::InsufficientBalance => "Insufficient liquidity token balance",
            ErrorKind::NonConvergence | ErrorKind::Domain | ErrorKind::Overflow => {
                "Price could not be computed for this amount"
            }
            ErrorKind::InvalidEvent | ErrorKind::InvalidParameters => "Invalid request",
            ErrorKind::Config | ErrorKind::Io => "Internal error",
        }
    }
}

impl From<config::ConfigError> for AmmError {
    fn from(err: config::ConfigError) -> Self {
        AmmError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for AmmError {
    fn from(err: toml::de::Error) -> Self {
        AmmError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_error_reports_inner_kind() {
        let err = AmmError::at_index(3, AmmError::InfeasibleTrade("too large".into()));
        assert_eq!(err.kind(), ErrorKind::InfeasibleTrade);
        assert_eq!(err.user_message(), "Insufficient liquidity for this trade");
        assert!(err.to_string().starts_with("Event 3 failed"));
    }

    #[test]
    fn test_domain_constructor() {
        let err = AmmError::domain("ln", "argument must be positive");
        assert_eq!(err.kind(), ErrorKind::Domain);
        assert_eq!(err.to_string(), "Domain error in ln: argument must be positive");
    }
}
