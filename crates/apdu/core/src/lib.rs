//! APDU transport and session primitives for secure element testing
//!
//! This crate provides the protocol layer between a compliance harness and a
//! card reader, following ISO/IEC 7816-4:
//!
//! - [`CardTransport`]: the single blocking exchange a reader driver provides
//! - [`channel`]: logical channel numbering and CLA rewriting
//! - [`GetResponseProcessor`]: `6Cxx` resend and `61xx`/`9Fxx` GET RESPONSE chaining
//! - [`tlv`]: BER-TLV decoding used to validate SELECT responses
//! - [`CardExecutor`]: ties the above together behind one request/response call
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod card;
pub mod channel;
pub mod command;
pub mod error;
pub mod processor;
pub mod response;
pub mod tlv;
pub mod transport;

pub use card::CardExecutor;
pub use channel::{LogicalChannel, apply_channel};
pub use command::{Command, ExpectedLength};
pub use error::{Error, Result, ResultExt};
pub use processor::GetResponseProcessor;
pub use response::Response;
pub use response::status::StatusWord;
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    // Core types
    pub use crate::{Bytes, BytesMut, Error, Result, ResultExt};

    // Command and response
    pub use crate::command::{Command, ExpectedLength};
    pub use crate::response::Response;
    pub use crate::response::status::{StatusWord, common as status};

    // Transport layer
    pub use crate::transport::{CardTransport, TransportError};

    // Protocol layer
    pub use crate::card::CardExecutor;
    pub use crate::channel::LogicalChannel;
    pub use crate::processor::GetResponseProcessor;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test the basic types are re-exported correctly
    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.class(), 0x00);
        assert_eq!(cmd.instruction(), 0xA4);

        let data = Bytes::from_static(&[0x01, 0x02, 0x03]);
        let resp = Response::success(data.clone());
        assert!(resp.is_success());
        assert_eq!(resp.payload(), &data);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
        assert_eq!(apply_channel(0x00, 4), Ok(0x60));
    }
}
