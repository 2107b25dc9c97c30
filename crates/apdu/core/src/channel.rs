//! Logical channel numbering and class byte encoding
//!
//! ISO/IEC 7816-4 encodes channels 0-3 in the two low bits of a first
//! interindustry CLA, and channels 4-19 in the low nibble of a further
//! interindustry CLA (offset by 4), with bit 6 set to mark the encoding.

use std::fmt;

use crate::error::{Error, Result};

/// Number of channels addressable with the first interindustry encoding
pub const BASIC_CHANNELS: u8 = 4;

/// Total number of logical channels (basic channel included)
pub const MAX_CHANNELS: u8 = 20;

/// A logical channel number in `0..20`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalChannel(u8);

impl LogicalChannel {
    /// The basic channel, always open
    pub const BASIC: Self = Self(0);

    /// Create a logical channel, checking the range
    pub const fn new(number: u8) -> Result<Self> {
        if number < MAX_CHANNELS {
            Ok(Self(number))
        } else {
            Err(Error::InvalidChannel(number as i32))
        }
    }

    /// The channel number
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Whether the channel uses the further interindustry encoding
    pub const fn is_extended(self) -> bool {
        self.0 >= BASIC_CHANNELS
    }

    /// Rewrite `cla` so it addresses this channel
    ///
    /// For channels 4-19 secure messaging is flagged (bit 6) when the
    /// incoming CLA has no secure messaging indication in bits 3-4.
    pub const fn apply(self, cla: u8) -> u8 {
        if !self.is_extended() {
            return (cla & 0xBC) | self.0;
        }

        let secure = cla & 0x0C == 0;
        let mut cla = (cla & 0xB0) | 0x40 | (self.0 - BASIC_CHANNELS);
        if secure {
            cla |= 0x20;
        }
        cla
    }
}

impl TryFrom<i32> for LogicalChannel {
    type Error = Error;

    fn try_from(number: i32) -> Result<Self> {
        u8::try_from(number)
            .map_err(|_| Error::InvalidChannel(number))
            .and_then(Self::new)
    }
}

impl TryFrom<u8> for LogicalChannel {
    type Error = Error;

    fn try_from(number: u8) -> Result<Self> {
        Self::new(number)
    }
}

impl From<LogicalChannel> for u8 {
    fn from(channel: LogicalChannel) -> Self {
        channel.0
    }
}

impl fmt::Display for LogicalChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the CLA addressing `channel`, failing for channels outside `0..20`
pub fn apply_channel(cla: u8, channel: i32) -> Result<u8> {
    LogicalChannel::try_from(channel).map(|channel| channel.apply(cla))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_channels() {
        assert_eq!(apply_channel(0x00, 0).unwrap(), 0x00);
        assert_eq!(apply_channel(0x00, 3).unwrap(), 0x03);
        assert_eq!(apply_channel(0x80, 2).unwrap(), 0x82);
        // Previous channel bits are cleared, SM bits kept
        assert_eq!(apply_channel(0x0F, 1).unwrap(), 0x0D);
        assert_eq!(apply_channel(0xA0, 1).unwrap(), 0xA1);
    }

    #[test]
    fn test_extended_channels() {
        // No SM indication: secure flag is set
        assert_eq!(apply_channel(0x00, 4).unwrap(), 0x60);
        assert_eq!(apply_channel(0x80, 5).unwrap(), 0xE1);
        assert_eq!(apply_channel(0x00, 19).unwrap() & 0x0F, 15);
        assert_eq!(apply_channel(0x00, 19).unwrap(), 0x6F);

        // SM indication present: secure flag stays clear
        assert_eq!(apply_channel(0x04, 4).unwrap(), 0x40);
        assert_eq!(apply_channel(0x94, 7).unwrap(), 0xD3);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(apply_channel(0x00, 20), Err(Error::InvalidChannel(20)));
        assert_eq!(apply_channel(0x00, -1), Err(Error::InvalidChannel(-1)));
        assert_eq!(LogicalChannel::new(255), Err(Error::InvalidChannel(255)));
    }

    #[test]
    fn test_channel_accessors() {
        let channel = LogicalChannel::new(12).unwrap();
        assert_eq!(channel.number(), 12);
        assert!(channel.is_extended());
        assert!(!LogicalChannel::BASIC.is_extended());
        assert_eq!(channel.to_string(), "12");
    }
}
