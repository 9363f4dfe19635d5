//! Hardware error types.
//!
//! Expander failures carry the bus label so a log line says which chip went
//! quiet. Radio failures keep the stack's message as text; the session only
//! logs them and retries on its next poll.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors raised by expanders and radio links.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No link, or the link dropped.
    #[error("{link} is not connected")]
    Disconnected { link: String },

    /// The radio stack rejected an operation.
    #[error("Radio error: {message}")]
    Radio { message: String },

    /// Peer, service or characteristic missing.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Probe succeeded but the device could not be brought up.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// I2C transfer to an expander failed.
    #[error("Bus error on {bus}: {message}")]
    Bus { bus: String, message: String },
}

impl HardwareError {
    pub fn disconnected(link: impl Into<String>) -> Self {
        Self::Disconnected { link: link.into() }
    }

    pub fn radio(message: impl Into<String>) -> Self {
        Self::Radio {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    pub fn bus(bus: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Bus {
            bus: bus.into(),
            message: message.into(),
        }
    }
}

impl From<HardwareError> for ptl_core::Error {
    fn from(error: HardwareError) -> Self {
        ptl_core::Error::Hardware(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HardwareError::disconnected("scanner link"), "scanner link is not connected")]
    #[case(HardwareError::radio("peer refused"), "Radio error: peer refused")]
    #[case(HardwareError::not_found("service 0000ffe0"), "service 0000ffe0 not found")]
    #[case(HardwareError::bus("bus0", "NoAcknowledge"), "Bus error on bus0: NoAcknowledge")]
    fn test_display(#[case] error: HardwareError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_into_core_error() {
        let error: ptl_core::Error = HardwareError::bus("bus1", "arbitration lost").into();
        match error {
            ptl_core::Error::Hardware(message) => assert!(message.contains("bus1")),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
