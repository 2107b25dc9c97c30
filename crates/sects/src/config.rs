//! Harness configuration
//!
//! Defaults are layered with an optional TOML file and `SECTS_` prefixed
//! environment variables (nested keys separated by `__`, for example
//! `SECTS_READER__INDEX=1`). Command-line flags are applied on top by the
//! binary.

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::scenario::Scenario;

/// Configuration file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "sects.toml";

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Reader to connect to
    pub reader: ReaderConfig,

    /// Send the TERMINAL PROFILE before running scenarios
    pub terminal_profile: bool,

    /// Seconds to wait for a card, forever when unset
    pub card_timeout_secs: Option<u64>,

    /// Maximum number of GET RESPONSE commands per command
    pub max_chain: usize,

    /// Applications exercised by the scenarios
    pub aids: AidConfig,

    /// Scenarios to run, in order
    pub scenarios: Vec<Scenario>,
}

/// Reader selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Position in the PC/SC reader list
    pub index: usize,

    /// Reader name, takes precedence over the index
    pub name: Option<String>,
}

/// AIDs of the OMAPI test applets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AidConfig {
    /// Applet answering the transmit cases
    #[serde(with = "hex::serde")]
    pub transmit: Vec<u8>,

    /// Applet returning a long SELECT response
    #[serde(with = "hex::serde")]
    pub long_select: Vec<u8>,
}

impl Default for AidConfig {
    fn default() -> Self {
        Self {
            // "A000000476" + "AndroidCTS1"
            transmit: vec![
                0xA0, 0x00, 0x00, 0x04, 0x76, 0x41, 0x6E, 0x64, 0x72, 0x6F, 0x69, 0x64, 0x43,
                0x54, 0x53, 0x31,
            ],
            // "A000000476" + "AndroidCTS2"
            long_select: vec![
                0xA0, 0x00, 0x00, 0x04, 0x76, 0x41, 0x6E, 0x64, 0x72, 0x6F, 0x69, 0x64, 0x43,
                0x54, 0x53, 0x32,
            ],
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            terminal_profile: true,
            card_timeout_secs: None,
            max_chain: sects_apdu_core::GetResponseProcessor::DEFAULT_MAX_CHAIN,
            aids: AidConfig::default(),
            scenarios: Scenario::ALL.to_vec(),
        }
    }
}

impl HarnessConfig {
    /// Load the configuration, reading `path` or [`DEFAULT_CONFIG_FILE`]
    ///
    /// A missing default file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Ok(Self::figment()
            .merge(Toml::file(file))
            .merge(Env::prefixed("SECTS_").split("__"))
            .extract()?)
    }

    /// Figment holding the defaults only
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    /// How long to wait for a card
    pub fn card_timeout(&self) -> Option<Duration> {
        self.card_timeout_secs.map(Duration::from_secs)
    }
}
