//! Error types for PC/SC transport

use sects_apdu_core::{Error, TransportError};

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),

    /// Card was reset
    #[error("Card was reset")]
    CardReset,

    /// Card was removed
    #[error("Card was removed")]
    CardRemoved,

    /// Timed out waiting for a card
    #[error("Timed out waiting for a card in reader: {0}")]
    Timeout(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::NoCard(_) => Self::NoCard,
            PcscError::CardReset | PcscError::CardRemoved => Self::CardRemoved,
            PcscError::Timeout(_) => Self::Timeout,
            PcscError::Pcsc(pcsc::Error::NoSmartcard) => Self::NoCard,
            PcscError::Pcsc(pcsc::Error::ResetCard | pcsc::Error::RemovedCard) => {
                Self::CardRemoved
            }
            PcscError::Pcsc(pcsc::Error::Timeout) => Self::Timeout,
            PcscError::Pcsc(e) => Self::Driver(e as i32),
            other => Self::other(other.to_string()),
        }
    }
}

impl From<PcscError> for Error {
    fn from(error: PcscError) -> Self {
        Self::Transport(error.into())
    }
}
