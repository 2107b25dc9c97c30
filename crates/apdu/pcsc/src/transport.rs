//! PC/SC transport implementation

use std::ffi::CString;
use std::fmt;
use std::time::{Duration, Instant};

use bytes::Bytes;
use pcsc::{Card, Context, Disposition, ReaderState, State};
use sects_apdu_core::{CardTransport, Result as ApduResult};
use tracing::{debug, info};

use crate::{config::PcscConfig, error::PcscError, reader::card_present};

/// Receive buffer size: 256 data bytes plus SW1 SW2 (short APDUs only)
const RESPONSE_BUFFER_LEN: usize = 258;

/// Transport implementation using PC/SC
pub struct PcscTransport {
    /// PC/SC context
    context: Context,
    /// Card connection, if established
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Configuration
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    /// Create a new PC/SC transport for the specified reader
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut transport = Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
        };

        // A missing card is fine here, wait_for_card or the first transmit connects
        if let Err(e) = transport.connect_card() {
            debug!(reader = %transport.reader_name, error = %e, "Card not connected yet");
        }

        Ok(transport)
    }

    /// Try to connect to the card
    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => {
                debug!(reader = %self.reader_name, "Connected to card");
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) => Err(PcscError::NoCard(self.reader_name.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Block until a card is present in the reader, then connect to it
    ///
    /// `None` waits forever.
    pub fn wait_for_card(&mut self, timeout: Option<Duration>) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;
        let mut reader_states = [ReaderState::new(reader_cstr, State::UNAWARE)];
        let deadline = timeout.map(|t| Instant::now() + t);

        info!(reader = %self.reader_name, "Waiting for card");
        loop {
            let remaining = match deadline {
                Some(deadline) => Some(
                    deadline
                        .checked_duration_since(Instant::now())
                        .ok_or_else(|| PcscError::Timeout(self.reader_name.clone()))?,
                ),
                None => None,
            };

            match self.context.get_status_change(remaining, &mut reader_states) {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => {
                    return Err(PcscError::Timeout(self.reader_name.clone()));
                }
                Err(e) => return Err(e.into()),
            }

            let state = &mut reader_states[0];
            if card_present(state.event_state()) {
                break;
            }
            state.sync_current_state();
        }

        self.connect_card()
    }

    /// Get the ATR of the current card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        self.card.as_ref().map_or_else(
            || Err(PcscError::NoCard(self.reader_name.clone())),
            |card| {
                card.get_attribute_owned(pcsc::Attribute::AtrString)
                    .map_err(Into::into)
            },
        )
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Check if the transport is connected to a card
    pub const fn has_card(&self) -> bool {
        self.card.is_some()
    }

    /// Transmit a command to the card
    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;

        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;

        let mut response_buffer = [0u8; RESPONSE_BUFFER_LEN];

        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e) => {
                let (error, card_lost) = transmit_failure(e);
                if card_lost {
                    // The next command connects again; channels opened so far are gone
                    debug!(reader = %self.reader_name, %error, "Card connection lost");
                    self.card = None;
                }
                Err(error)
            }
        }
    }
}

/// Map a failed transmit, telling whether the card handle is no longer usable
///
/// A reset is reported to the caller and the command is never resent.
fn transmit_failure(error: pcsc::Error) -> (PcscError, bool) {
    match error {
        pcsc::Error::ResetCard => (PcscError::CardReset, true),
        pcsc::Error::RemovedCard => (PcscError::CardRemoved, true),
        e => (e.into(), false),
    }
}

impl CardTransport for PcscTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> ApduResult<Bytes> {
        self.transmit_command(command).map_err(Into::into)
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn reset(&mut self) -> ApduResult<()> {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::ResetCard) {
                debug!(error = %e, "Failed to disconnect while resetting");
            }
        }

        self.connect_card().map_err(Into::into)
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }
}
