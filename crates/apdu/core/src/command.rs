//! APDU command definitions
//!
//! Commands cross the crate boundary as raw bytes (or hex). [`Command`] parses
//! the short-length ISO/IEC 7816-4 cases so the CLA can be rewritten and the Le
//! replaced without touching the rest of the encoding.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Expected length type for APDU commands (short APDUs only)
pub type ExpectedLength = u8;

/// Length of the CLA/INS/P1/P2 header
pub const HEADER_LEN: usize = 4;

/// Largest data field a short Lc can describe
pub const MAX_DATA_LEN: usize = 255;

/// Generic APDU command structure
#[derive(Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(le);
        self
    }

    /// Replace the class byte
    pub const fn with_class(mut self, cla: u8) -> Self {
        self.cla = cla;
        self
    }

    /// Command class (CLA)
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction code (INS)
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// Command payload data
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Expected response length
    pub const fn expected_length(&self) -> Option<ExpectedLength> {
        self.le
    }

    /// Parse a command from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::ApduTooShort(data.len()));
        }

        let mut command = Self::new(data[0], data[1], data[2], data[3]);

        if data.len() == HEADER_LEN + 1 {
            // Case 2: only Le present
            command.le = Some(data[4]);
        } else if data.len() > HEADER_LEN + 1 {
            // Case 3/4: Lc, data, optional Le
            let lc = data[4] as usize;
            let body_end = HEADER_LEN + 1 + lc;

            // Lc = 00 cannot be followed by anything in a short APDU
            if lc == 0 || data.len() < body_end || data.len() > body_end + 1 {
                return Err(Error::InvalidCommandLength(data.len()));
            }
            command.data = Some(Bytes::copy_from_slice(&data[HEADER_LEN + 1..body_end]));
            if data.len() == body_end + 1 {
                command.le = Some(data[body_end]);
            }
        }

        Ok(command)
    }

    /// Parse a command from a hex string
    pub fn from_hex(apdu: &str) -> Result<Self> {
        Self::from_bytes(&hex::decode(apdu)?)
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        HEADER_LEN
            + self.data.as_ref().map_or(0, |data| 1 + data.len())
            + usize::from(self.le.is_some())
    }

    /// Convert to raw APDU bytes
    ///
    /// Fails with [`Error::DataTooLong`] when the data field exceeds
    /// [`MAX_DATA_LEN`].
    pub fn to_bytes(&self) -> Result<Bytes> {
        if let Some(data) = &self.data
            && data.len() > MAX_DATA_LEN
        {
            return Err(Error::DataTooLong(data.len()));
        }

        let mut buffer = BytesMut::with_capacity(self.command_length());

        // Header: CLA, INS, P1, P2
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        // Add Lc and data if present
        if let Some(data) = &self.data {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        Ok(buffer.freeze())
    }

    /// Convert to upper-case hex
    pub fn to_hex(&self) -> Result<String> {
        self.to_bytes().map(hex::encode_upper)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("cla", &format_args!("{:#04x}", self.cla))
            .field("ins", &format_args!("{:#04x}", self.ins))
            .field("p1", &format_args!("{:#04x}", self.p1))
            .field("p2", &format_args!("{:#04x}", self.p2))
            .field("data", &self.data.as_ref().map(hex::encode_upper))
            .field("le", &self.le)
            .finish()
    }
}

impl TryFrom<&[u8]> for Command {
    type Error = Error;

    fn try_from(data: &[u8]) -> Result<Self> {
        Self::from_bytes(data)
    }
}
