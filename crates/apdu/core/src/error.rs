//! Core error type for all APDU operations
//!
//! Every failure the transport/session layer can report is a variant here, so
//! callers branch on the failure kind instead of parsing messages.

use crate::response::status::StatusWord;
use crate::transport::TransportError;

/// Result type used throughout the crate
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    //
    // Command related errors
    //
    /// Command APDU shorter than the 4-byte CLA/INS/P1/P2 header
    #[error("C-APDU is too short: {0} bytes, at least 4 required")]
    ApduTooShort(usize),

    /// Lc does not match the amount of data that follows it
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Command data does not fit a short Lc
    #[error("Command data is too long: {0} bytes, at most 255 allowed")]
    DataTooLong(usize),

    /// Application identifier outside the 5 to 16 byte range
    #[error("Invalid AID length: {0} bytes, expected 5 to 16")]
    InvalidAid(usize),

    /// Logical channel number outside [0, 19]
    #[error("Logical channel number is out of range: {0}")]
    InvalidChannel(i32),

    /// Hex input could not be decoded
    #[error("Invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    //
    // Response related errors
    //
    /// A control operation received something other than its success status
    #[error("Unexpected SW for {operation}: {status}")]
    UnexpectedStatus {
        /// Operation that was being performed
        operation: &'static str,
        /// Status word that was received
        status: StatusWord,
    },

    /// Response data length inconsistent with what the protocol expects
    #[error("The size of the response data for {operation} is wrong: {length} bytes")]
    MalformedResponse {
        /// Operation that was being performed
        operation: &'static str,
        /// Length of the data that was received
        length: usize,
    },

    /// Response shorter than the two status word bytes
    #[error("Incomplete response: {0} bytes")]
    IncompleteResponse(usize),

    /// Truncated or inconsistent BER-TLV structure
    #[error("Malformed TLV: {0}")]
    MalformedTlv(&'static str),

    /// The card kept answering 61xx/9Fxx beyond the configured limit
    #[error("Chain limit exceeded after {0} GET RESPONSE commands")]
    ChainLimitExceeded(usize),

    //
    // Session related errors
    //
    /// Attempt to close a channel that this session never opened
    #[error("Logical channel {0} is not open")]
    ChannelNotOpen(u8),

    /// The card handed out a channel that this session already owns
    #[error("Logical channel {0} is already open")]
    ChannelAlreadyOpen(u8),

    //
    // Transport related errors
    //
    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    //
    // General errors
    //
    /// Context error with message and source error
    #[error("{context}: {source}")]
    Context {
        /// Contextual message
        context: String,
        /// Source error
        source: Box<Self>,
    },
}

impl Error {
    /// Create a new error with context information
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a new unexpected status error
    pub const fn unexpected_status(operation: &'static str, status: StatusWord) -> Self {
        Self::UnexpectedStatus { operation, status }
    }

    /// Create a new malformed response error
    pub const fn malformed_response(operation: &'static str, length: usize) -> Self {
        Self::MalformedResponse { operation, length }
    }

    /// Strip any context layers and return the underlying error
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait for Result with APDU Errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, context: S) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context<S: Into<String>>(self, context: S) -> Self {
        self.map_err(|e| e.with_context(context))
    }
}
