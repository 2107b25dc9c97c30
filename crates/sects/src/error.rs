//! Error type for the compliance harness

use sects_apdu_core::StatusWord;
use sects_transport_pcsc::PcscError;
use thiserror::Error;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for harness operations
#[derive(Debug, Error)]
pub enum Error {
    /// APDU protocol or session errors
    #[error(transparent)]
    Apdu(#[from] sects_apdu_core::Error),

    /// Reader or connection errors
    #[error(transparent)]
    Pcsc(#[from] PcscError),

    /// A compliance check did not hold
    #[error("{scenario}: {reason}")]
    Scenario {
        /// Scenario that failed
        scenario: &'static str,
        /// What was observed
        reason: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),
}

impl Error {
    /// Create a scenario failure
    pub fn scenario(scenario: &'static str, reason: impl Into<String>) -> Self {
        Self::Scenario {
            scenario,
            reason: reason.into(),
        }
    }

    /// Scenario failure for a status word other than `9000`
    pub fn unexpected_sw(scenario: &'static str, apdu: &str, status: StatusWord) -> Self {
        Self::scenario(scenario, format!("Unexpected SW for {apdu}: {status}"))
    }

    /// The APDU layer error, if this is one
    pub fn as_apdu(&self) -> Option<&sects_apdu_core::Error> {
        match self {
            Self::Apdu(e) => Some(e.root()),
            _ => None,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(error: figment::Error) -> Self {
        Self::Config(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_display() {
        let err = Error::unexpected_sw("transmit_apdu", "00060000", StatusWord::new(0x6A, 0x82));
        assert_eq!(err.to_string(), "transmit_apdu: Unexpected SW for 00060000: 6A82");
    }

    #[test]
    fn test_as_apdu_strips_context() {
        let err: Error = sects_apdu_core::Error::ChannelNotOpen(2)
            .with_context("Closing channel")
            .into();
        assert_eq!(err.as_apdu(), Some(&sects_apdu_core::Error::ChannelNotOpen(2)));
        assert!(Error::scenario("x", "y").as_apdu().is_none());
    }
}
