use bytes::Bytes;

use super::{CardTransport, TransportError};
use crate::error::Result;

/// Scripted transport replaying canned responses
///
/// Responses are handed out in order. Once a single response remains it is
/// repeated for every further command.
#[derive(Debug, Clone)]
pub struct MockTransport {
    /// Mock responses to return
    pub responses: Vec<Bytes>,
    /// Commands that were sent
    pub commands: Vec<Bytes>,
    /// Whether the transport is connected
    pub connected: bool,
}

impl MockTransport {
    /// Create a new mock transport with the given responses
    pub const fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
            connected: true,
        }
    }

    /// Create a mock transport from hex encoded responses
    ///
    /// # Panics
    /// Panics if any response is not valid hex.
    pub fn from_hex<'a>(responses: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(
            responses
                .into_iter()
                .map(|r| Bytes::from(hex::decode(r).expect("valid hex response")))
                .collect(),
        )
    }

    /// Create a new mock transport that always returns the given response
    pub fn with_response(response: Bytes) -> Self {
        Self::new(vec![response])
    }

    /// Create a new mock transport that always returns success (90 00)
    pub fn with_success() -> Self {
        Self::with_response(Bytes::from_static(&[0x90, 0x00]))
    }

    /// Commands sent so far, hex encoded
    pub fn commands_hex(&self) -> Vec<String> {
        self.commands.iter().map(hex::encode_upper).collect()
    }
}

impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes> {
        if !self.connected {
            return Err(TransportError::Connection.into());
        }

        self.commands.push(Bytes::copy_from_slice(command));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission.into());
        }

        // Either clone the single response or take the next one
        if self.responses.len() == 1 {
            Ok(self.responses[0].clone())
        } else {
            Ok(self.responses.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<()> {
        self.connected = true;
        self.commands.clear();
        Ok(())
    }
}
