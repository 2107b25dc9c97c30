//! OMAPI compliance scenarios
//!
//! The scenarios drive the Android CTS test applets through full
//! open/select/transmit/close cycles and check what comes back.

use std::fmt;

use clap::ValueEnum;
use sects_apdu_core::CardTransport;
use sects_apdu_core::response::status::common as status;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AidConfig;
use crate::session::ChannelSession;
use crate::{Error, Result};

/// Case 1 and case 3 commands, answered with no data
pub const NO_DATA_APDUS: [&str; 8] = [
    "00060000",
    "80060000",
    "A0060000",
    "94060000",
    "000A000001AA",
    "800A000001AA",
    "A00A000001AA",
    "940A000001AA",
];

/// Case 2 and case 4 commands, answered with [`DATA_RESPONSE_LEN`] bytes
pub const DATA_APDUS: [&str; 8] = [
    "0008000000",
    "8008000000",
    "A008000000",
    "9408000000",
    "000C000001AA00",
    "800C000001AA00",
    "A00C000001AA00",
    "940C000001AA00",
];

/// Data returned by the applet for case 2 and case 4 commands
pub const DATA_RESPONSE_LEN: usize = 256;

/// A compliance scenario
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Transmit case 1-4 APDUs to the transmit applet
    TransmitApdu,
    /// Select the applet returning a long FCI
    LongSelectResponse,
}

impl Scenario {
    /// Every scenario, in execution order
    pub const ALL: [Self; 2] = [Self::TransmitApdu, Self::LongSelectResponse];

    /// Scenario name as used in configuration and logs
    pub const fn name(self) -> &'static str {
        match self {
            Self::TransmitApdu => "transmit_apdu",
            Self::LongSelectResponse => "long_select_response",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runner for the OMAPI scenarios over a channel session
pub struct OmapiTest<'a, T: CardTransport> {
    session: &'a mut ChannelSession<T>,
    aids: &'a AidConfig,
}

impl<T: CardTransport> fmt::Debug for OmapiTest<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OmapiTest")
            .field("session", &self.session)
            .field("aids", &self.aids)
            .finish()
    }
}

impl<'a, T: CardTransport> OmapiTest<'a, T> {
    /// Create a runner over `session` using the applets in `aids`
    pub const fn new(session: &'a mut ChannelSession<T>, aids: &'a AidConfig) -> Self {
        Self { session, aids }
    }

    /// Every case 1-4 command must come back with `9000`, with no data for
    /// cases 1 and 3 and exactly 256 bytes for cases 2 and 4
    pub fn transmit_apdu(&mut self) -> Result<()> {
        const NAME: &str = "transmit_apdu";

        for apdu in NO_DATA_APDUS {
            let response = self.session.send_apdu_hex(&self.aids.transmit, apdu)?;
            if response.status() != status::SUCCESS {
                return Err(Error::unexpected_sw(NAME, apdu, response.status()));
            }
            if !response.payload().is_empty() {
                return Err(Error::scenario(
                    NAME,
                    format!("Unexpected data for {apdu}: {}", response.payload_hex()),
                ));
            }
            debug!(apdu, "No data as expected");
        }

        for apdu in DATA_APDUS {
            let response = self.session.send_apdu_hex(&self.aids.transmit, apdu)?;
            if response.status() != status::SUCCESS {
                return Err(Error::unexpected_sw(NAME, apdu, response.status()));
            }
            if response.payload().len() != DATA_RESPONSE_LEN {
                return Err(Error::scenario(
                    NAME,
                    format!(
                        "Unexpected data length for {apdu}: {} bytes",
                        response.payload().len()
                    ),
                ));
            }
            debug!(apdu, length = DATA_RESPONSE_LEN, "Data as expected");
        }

        Ok(())
    }

    /// The long SELECT response must be reassembled into well-formed TLV
    pub fn long_select_response(&mut self) -> Result<()> {
        let channel = self.session.open_logical_channel()?;
        let selected = self
            .session
            .select_application_with_check_response(channel, &self.aids.long_select);
        let closed = self.session.close_logical_channel(channel);

        let response = selected?;
        closed?;
        debug!(
            length = response.payload().len(),
            "Long SELECT response received"
        );
        Ok(())
    }

    /// Run a single scenario
    pub fn run(&mut self, scenario: Scenario) -> Result<()> {
        info!(%scenario, "Scenario started");
        match scenario {
            Scenario::TransmitApdu => self.transmit_apdu(),
            Scenario::LongSelectResponse => self.long_select_response(),
        }?;
        info!(%scenario, "Scenario finished");
        Ok(())
    }

    /// Run `scenarios` in order, stopping at the first failure
    pub fn execute(&mut self, scenarios: &[Scenario]) -> Result<()> {
        scenarios.iter().try_for_each(|&scenario| self.run(scenario))
    }

    /// Run every scenario
    pub fn execute_all(&mut self) -> Result<()> {
        self.execute(&Scenario::ALL)
    }
}
