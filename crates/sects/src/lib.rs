//! Secure element compliance harness
//!
//! Drives OMAPI test applets on a UICC or embedded secure element through
//! logical channels, the way a handset would:
//!
//! - [`ChannelSession`]: MANAGE CHANNEL, SELECT and per-channel transmission
//! - [`ChannelSession::send_terminal_profile`]: TERMINAL PROFILE download
//! - [`OmapiTest`]: the compliance scenarios
//! - [`HarnessConfig`]: reader, applet and scenario selection
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod scenario;
pub mod session;
mod terminal;

pub use config::{AidConfig, HarnessConfig, ReaderConfig};
pub use error::{Error, Result};
pub use scenario::{OmapiTest, Scenario};
pub use session::ChannelSession;
