use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Session errors
    #[error("Connection to {address} failed with every address kind")]
    ConnectionFailure { address: String },

    #[error("Scan did not finish within {timeout_ms}ms")]
    ScanTimeout { timeout_ms: u64 },

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Characteristic {characteristic} cannot be subscribed: {reason}")]
    CharacteristicUnsubscribable {
        characteristic: String,
        reason: String,
    },

    // Record errors
    #[error("Scan record overflowed {capacity} bytes and was truncated")]
    BufferOverflow { capacity: usize },

    #[error("Code not found in access table: {0}")]
    LookupMiss(String),

    // Hardware errors
    #[error("Expander bus {0} is absent")]
    HardwareBusAbsent(u8),

    #[error("Hardware operation failed: {0}")]
    Hardware(String),

    // Validation errors
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
