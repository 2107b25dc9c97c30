//! Card executor implementation
//!
//! [`CardExecutor`] owns a transport and turns a raw command into a complete
//! response: the command is parsed, optionally moved onto a logical channel,
//! and sent through the GET RESPONSE processor.

use std::fmt;

use bytes::Bytes;
use tracing::{Level, debug, info, instrument, warn};

use crate::channel::LogicalChannel;
use crate::command::Command;
use crate::error::{Result, ResultExt};
use crate::processor::GetResponseProcessor;
use crate::response::Response;
use crate::transport::CardTransport;

/// Card executor combining a transport with response chaining
pub struct CardExecutor<T: CardTransport> {
    /// The transport used for communication
    transport: T,
    /// Response chaining
    processor: GetResponseProcessor,
    /// The last response received
    last_response: Option<Response>,
}

impl<T: CardTransport> fmt::Debug for CardExecutor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardExecutor")
            .field("transport", &self.transport)
            .field("processor", &self.processor)
            .field("last_response", &self.last_response)
            .finish()
    }
}

impl<T: CardTransport> CardExecutor<T> {
    /// Create a new card executor with the given transport
    pub fn new(transport: T) -> Self {
        Self::with_processor(transport, GetResponseProcessor::default())
    }

    /// Create a new card executor with a custom GET RESPONSE processor
    pub const fn with_processor(transport: T, processor: GetResponseProcessor) -> Self {
        Self {
            transport,
            processor,
            last_response: None,
        }
    }

    /// Get a reference to the underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Take ownership of the transport and return it
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Get the last response received
    pub const fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// Send a raw command and collect the complete, chained response
    ///
    /// Fails with [`ApduTooShort`](crate::Error::ApduTooShort) when the
    /// command has no complete header.
    #[instrument(level = "trace", skip_all, fields(command = %hex::encode_upper(command)))]
    pub fn transmit(&mut self, command: &[u8]) -> Result<Response> {
        let command = Command::from_bytes(command)?;
        self.transmit_command(&command)
    }

    /// Hex boundary variant of [`transmit`](Self::transmit)
    pub fn transmit_hex(&mut self, command: &str) -> Result<Response> {
        let command = Command::from_hex(command)?;
        self.transmit_command(&command)
    }

    /// Send a raw command on `channel`, rewriting its class byte first
    pub fn transmit_on_channel(
        &mut self,
        channel: LogicalChannel,
        command: &[u8],
    ) -> Result<Response> {
        let command = Command::from_bytes(command)?;
        let cla = channel.apply(command.cla);
        debug!(
            channel = channel.number(),
            cla = format_args!("{:#04x}", cla),
            "Moving command onto logical channel"
        );
        self.transmit_command(&command.with_class(cla))
    }

    /// Send a parsed command and collect the complete, chained response
    pub fn transmit_command(&mut self, command: &Command) -> Result<Response> {
        let response = self.processor.process_command(command, &mut self.transport)?;
        self.record(response)
    }

    /// Send a raw command as a single exchange, without any chaining
    pub fn transmit_direct(&mut self, command: &[u8]) -> Result<Response> {
        let response = self.transport.exchange(command)?;
        self.record(response)
    }

    /// Reset the executor, including the transport
    pub fn reset(&mut self) -> Result<()> {
        self.transport
            .reset()
            .context("Failed to reset transport")?;
        self.last_response = None;
        Ok(())
    }

    /// Keep `response` as the last one and log it at the level its status calls for
    fn record(&mut self, response: Response) -> Result<Response> {
        let status = response.status();
        let meaning = status.description();
        let len = response.payload().len();
        let level = status.tracing_level();
        if level == Level::WARN {
            warn!(sw = %status, meaning, len, "Command completed");
        } else if level == Level::INFO {
            info!(sw = %status, meaning, len, "Command completed");
        } else {
            debug!(sw = %status, meaning, len, "Command completed");
        }
        self.last_response = Some(response.clone());
        Ok(response)
    }

    /// Last response as raw bytes (data followed by SW1 SW2)
    pub fn last_response_bytes(&self) -> Option<Bytes> {
        self.last_response.clone().map(Bytes::from)
    }
}
