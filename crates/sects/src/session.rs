//! Logical channel session management
//!
//! A [`ChannelSession`] owns the card executor and walks each logical channel
//! through `Closed -> Open -> (Selected)* -> Closed`. The session remembers
//! which channels it opened, so a channel can neither be handed out twice nor
//! closed without having been opened first.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;

use bytes::Bytes;
use sects_apdu_core::{
    CardExecutor, CardTransport, Command, Error, LogicalChannel, Response, Result, tlv,
};
use tracing::{debug, info, warn};

/// Interindustry class byte on the basic channel
const CLA_ISO: u8 = 0x00;

/// MANAGE CHANNEL instruction
const INS_MANAGE_CHANNEL: u8 = 0x70;

/// SELECT instruction
const INS_SELECT: u8 = 0xA4;

/// MANAGE CHANNEL P1 for closing a channel
const P1_CLOSE_CHANNEL: u8 = 0x80;

/// SELECT P1 for selection by DF name (AID)
const P1_SELECT_BY_NAME: u8 = 0x04;

/// MANAGE CHANNEL (open), letting the card assign the channel number
const OPEN_CHANNEL: [u8; 5] = [CLA_ISO, INS_MANAGE_CHANNEL, 0x00, 0x00, 0x01];

/// Smallest SELECT response that can hold an FCI template (tag and length)
pub const MIN_FCI_LEN: usize = 2;

/// Accepted application identifier lengths
pub const AID_LEN: RangeInclusive<usize> = 5..=16;

/// Logical channel session over a card executor
pub struct ChannelSession<T: CardTransport> {
    /// Executor performing the exchanges
    executor: CardExecutor<T>,
    /// Channels opened by this session and not yet closed
    open_channels: BTreeSet<LogicalChannel>,
}

impl<T: CardTransport> fmt::Debug for ChannelSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSession")
            .field("executor", &self.executor)
            .field("open_channels", &self.open_channels)
            .finish()
    }
}

impl<T: CardTransport> ChannelSession<T> {
    /// Create a session over an executor
    pub const fn new(executor: CardExecutor<T>) -> Self {
        Self {
            executor,
            open_channels: BTreeSet::new(),
        }
    }

    /// Create a session directly over a transport with default chaining
    pub fn from_transport(transport: T) -> Self {
        Self::new(CardExecutor::new(transport))
    }

    /// Get a reference to the executor
    pub const fn executor(&self) -> &CardExecutor<T> {
        &self.executor
    }

    /// Get a mutable reference to the executor
    pub const fn executor_mut(&mut self) -> &mut CardExecutor<T> {
        &mut self.executor
    }

    /// Take ownership of the executor
    pub fn into_executor(self) -> CardExecutor<T> {
        self.executor
    }

    /// Channels currently held open by this session
    pub fn open_channels(&self) -> impl Iterator<Item = LogicalChannel> + '_ {
        self.open_channels.iter().copied()
    }

    /// Whether `channel` was opened by this session and is still open
    pub fn is_open(&self, channel: LogicalChannel) -> bool {
        self.open_channels.contains(&channel)
    }

    /// Ask the card for a new logical channel
    ///
    /// The response must complete with SW1 `90` and carry exactly one byte,
    /// the number of the channel the card assigned.
    pub fn open_logical_channel(&mut self) -> Result<LogicalChannel> {
        let response = self.executor.transmit(&OPEN_CHANNEL)?;
        let status = response.status();
        if !status.is_normal_completion() {
            warn!(sw = %status, "MANAGE CHANNEL (open) rejected");
            return Err(Error::unexpected_status("MANAGE CHANNEL (open)", status));
        }

        let &[number] = &response.payload()[..] else {
            return Err(Error::malformed_response(
                "MANAGE CHANNEL (open)",
                response.payload().len(),
            ));
        };

        let channel = LogicalChannel::new(number)?;
        if !self.open_channels.insert(channel) {
            return Err(Error::ChannelAlreadyOpen(number));
        }

        info!(channel = number, "Opened logical channel");
        Ok(channel)
    }

    /// Release a channel previously returned by
    /// [`open_logical_channel`](Self::open_logical_channel)
    pub fn close_logical_channel(&mut self, channel: LogicalChannel) -> Result<()> {
        if !self.is_open(channel) {
            return Err(Error::ChannelNotOpen(channel.number()));
        }

        let command = Command::new(CLA_ISO, INS_MANAGE_CHANNEL, P1_CLOSE_CHANNEL, channel.number());
        let response = self.executor.transmit_command(&command)?;
        let status = response.status();
        if !status.is_normal_completion() {
            warn!(channel = channel.number(), sw = %status, "MANAGE CHANNEL (close) rejected");
            return Err(Error::unexpected_status("MANAGE CHANNEL (close)", status));
        }

        self.open_channels.remove(&channel);
        info!(channel = channel.number(), "Closed logical channel");
        Ok(())
    }

    /// SELECT the application `aid` on `channel`
    ///
    /// Response data is returned as is, without looking at its structure.
    /// An AID outside 5 to 16 bytes is rejected before anything is sent.
    pub fn select_application(&mut self, channel: LogicalChannel, aid: &[u8]) -> Result<Response> {
        check_aid(aid)?;
        debug!(
            channel = channel.number(),
            aid = %hex::encode_upper(aid),
            "Selecting application"
        );

        let command = Command::new_with_data(
            channel.apply(CLA_ISO),
            INS_SELECT,
            P1_SELECT_BY_NAME,
            0x00,
            Bytes::copy_from_slice(aid),
        )
        .with_le(0x00);

        let response = self.executor.transmit_command(&command)?;
        let status = response.status();
        if !status.is_normal_completion() {
            warn!(aid = %hex::encode_upper(aid), sw = %status, "SELECT rejected");
            return Err(Error::unexpected_status("SELECT", status));
        }

        Ok(response)
    }

    /// SELECT `aid` on `channel` and check that the FCI is well-formed BER-TLV
    pub fn select_application_with_check_response(
        &mut self,
        channel: LogicalChannel,
        aid: &[u8],
    ) -> Result<Response> {
        let response = self.select_application(channel, aid)?;

        let length = response.payload().len();
        if length < MIN_FCI_LEN {
            return Err(Error::malformed_response("SELECT", length));
        }

        let objects = tlv::validate_fci(response.payload())?;
        debug!(length, objects, "SELECT response is well-formed");

        Ok(response)
    }

    /// Send a raw command on `channel`, chaining the response
    ///
    /// The status word is returned to the caller as received.
    pub fn send_apdu_on_channel(
        &mut self,
        channel: LogicalChannel,
        apdu: &[u8],
    ) -> Result<Response> {
        self.executor.transmit_on_channel(channel, apdu)
    }

    /// Run `apdu` against the application `aid` in a channel of its own
    ///
    /// Opens a channel, selects `aid`, sends `apdu` and closes the channel.
    /// Once the channel is open it is closed again even if a later step
    /// fails; the error of the failing step is the one returned.
    pub fn send_apdu(&mut self, aid: &[u8], apdu: &[u8]) -> Result<Response> {
        check_aid(aid)?;
        let channel = self.open_logical_channel()?;

        let result = self
            .select_application(channel, aid)
            .and_then(|_| self.send_apdu_on_channel(channel, apdu));

        match result {
            Ok(response) => {
                self.close_logical_channel(channel)?;
                Ok(response)
            }
            Err(e) => {
                if let Err(close_error) = self.close_logical_channel(channel) {
                    warn!(
                        channel = channel.number(),
                        error = %close_error,
                        "Could not release channel after failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Hex boundary variant of [`send_apdu`](Self::send_apdu)
    pub fn send_apdu_hex(&mut self, aid: &[u8], apdu: &str) -> Result<Response> {
        let apdu = hex::decode(apdu)?;
        self.send_apdu(aid, &apdu)
    }
}

fn check_aid(aid: &[u8]) -> Result<()> {
    if AID_LEN.contains(&aid.len()) {
        Ok(())
    } else {
        Err(Error::InvalidAid(aid.len()))
    }
}
