//! TERMINAL PROFILE download
//!
//! A UICC expects the terminal to announce its capabilities before it starts
//! behaving like a handset-attached card. If the card answers with a pending
//! proactive command it is fetched and acknowledged right away.

use bytes::Bytes;
use sects_apdu_core::{CardTransport, Command, Response, Result, ResultExt};
use tracing::{debug, info};

use crate::session::ChannelSession;

/// GSM 11.11 class byte
const CLA_GSM: u8 = 0xA0;

/// TERMINAL PROFILE instruction
const INS_TERMINAL_PROFILE: u8 = 0x10;

/// FETCH instruction
const INS_FETCH: u8 = 0x12;

/// TERMINAL RESPONSE instruction
const INS_TERMINAL_RESPONSE: u8 = 0x14;

/// Profile data: the first 16 facilities advertised, everything else off
const TERMINAL_PROFILE: [u8; 17] = [
    0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00,
];

/// TERMINAL RESPONSE to a fetched proactive command, result "performed successfully"
const TERMINAL_RESPONSE: [u8; 12] = [
    0x81, 0x03, 0x01, 0x03, 0x00, 0x02, 0x02, 0x82, 0x81, 0x03, 0x01, 0x00,
];

impl<T: CardTransport> ChannelSession<T> {
    /// Send the TERMINAL PROFILE and complete a pending proactive command
    ///
    /// Returns the response to the TERMINAL RESPONSE when the card reported a
    /// proactive command (SW1 `91`), otherwise the TERMINAL PROFILE response.
    /// These commands are exchanged without response chaining.
    pub fn send_terminal_profile(&mut self) -> Result<Response> {
        let profile = Command::new_with_data(
            CLA_GSM,
            INS_TERMINAL_PROFILE,
            0x00,
            0x00,
            Bytes::from_static(&TERMINAL_PROFILE),
        );
        let response = self
            .executor_mut()
            .transmit_direct(&profile.to_bytes()?)
            .context("TERMINAL PROFILE")?;

        let status = response.status();
        if !status.is_proactive_command_pending() {
            info!(sw = %status, "Terminal profile sent");
            return Ok(response);
        }

        debug!(length = status.sw2, "Proactive command pending");
        let fetch = Command::new_with_le(CLA_GSM, INS_FETCH, 0x00, 0x00, status.sw2);
        let proactive = self
            .executor_mut()
            .transmit_direct(&fetch.to_bytes()?)
            .context("FETCH")?;
        debug!(
            command = %proactive.payload_hex(),
            sw = %proactive.status(),
            "Fetched proactive command"
        );

        let terminal_response = Command::new_with_data(
            CLA_GSM,
            INS_TERMINAL_RESPONSE,
            0x00,
            0x00,
            Bytes::from_static(&TERMINAL_RESPONSE),
        );
        let response = self
            .executor_mut()
            .transmit_direct(&terminal_response.to_bytes()?)
            .context("TERMINAL RESPONSE")?;

        info!(sw = %response.status(), "Terminal profile sent, proactive command acknowledged");
        Ok(response)
    }
}
