//! Response chaining
//!
//! [`GetResponseProcessor`] sends a command and keeps the exchange going for
//! as long as the card says it has more to give: a single resend with the
//! corrected Le on `6Cxx`, then GET RESPONSE for every `61xx`/`9Fxx`.

use std::fmt;

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::response::Response;
use crate::transport::CardTransport;

/// GET RESPONSE instruction byte
pub const INS_GET_RESPONSE: u8 = 0xC0;

/// GET RESPONSE processor that handles automatic response chaining
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GetResponseProcessor {
    /// Maximum number of GET RESPONSE commands issued for one command
    pub max_chain: usize,
}

impl GetResponseProcessor {
    /// Default bound on chained GET RESPONSE commands
    pub const DEFAULT_MAX_CHAIN: usize = 32;

    /// Create a new GET RESPONSE processor with the given maximum chain count
    pub const fn new(max_chain: usize) -> Self {
        Self { max_chain }
    }

    /// Send `command` and collect the complete response
    ///
    /// The returned payload is every data segment in the order it was
    /// received; the status word is the one from the last exchange.
    pub fn process_command(
        &self,
        command: &Command,
        transport: &mut dyn CardTransport,
    ) -> Result<Response> {
        let mut response = transport.exchange(&command.to_bytes()?)?;

        // Wrong Le: resend once with the length the card asked for
        if let Some(le) = response.status().corrected_le() {
            debug!(le, "Wrong Le, resending with corrected length");
            let corrected = command.clone().with_le(le);
            response = transport.exchange(&corrected.to_bytes()?)?;
        }

        if !response.status().is_more_data_available() {
            return Ok(response);
        }

        let (payload, mut status) = response.into_parts();
        let mut buffer = BytesMut::from(payload.as_ref());
        let mut chains = 0;

        while let Some(remaining) = status.remaining_bytes() {
            if chains >= self.max_chain {
                return Err(Error::ChainLimitExceeded(chains));
            }

            // Stay on the same channel by reusing the command's class byte
            let get_response =
                Command::new_with_le(command.cla, INS_GET_RESPONSE, 0x00, 0x00, remaining);

            trace!(
                remaining,
                chain_count = chains + 1,
                "Sending GET RESPONSE command"
            );

            let (next_payload, next_status) = transport
                .exchange(&get_response.to_bytes()?)?
                .into_parts();
            buffer.extend_from_slice(&next_payload);
            status = next_status;
            chains += 1;
        }

        trace!(
            total_data_len = buffer.len(),
            final_sw = %status,
            "Completed response chaining"
        );

        Ok(Response::new(buffer.freeze(), status))
    }
}

impl Default for GetResponseProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_CHAIN)
    }
}

impl fmt::Debug for GetResponseProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetResponseProcessor")
            .field("max_chain", &self.max_chain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::status::StatusWord;
    use crate::transport::MockTransport;

    fn data_reply(len: usize, sw: &str) -> String {
        format!("{}{}", "AA".repeat(len), sw)
    }

    #[test]
    fn test_no_chaining() {
        let mut transport = MockTransport::from_hex(["0102039000"]);
        let command = Command::from_hex("00B0000003").unwrap();

        let response = GetResponseProcessor::default()
            .process_command(&command, &mut transport)
            .unwrap();

        assert_eq!(response.payload().as_ref(), &[0x01, 0x02, 0x03]);
        assert!(response.is_success());
        assert_eq!(transport.commands_hex(), ["00B0000003"]);
    }

    #[test]
    fn test_more_data_chaining() {
        let mut transport =
            MockTransport::from_hex(["610A", data_reply(10, "9000").as_str(), "6F00"]);
        let command = Command::from_hex("00B0000000").unwrap();

        let response = GetResponseProcessor::default()
            .process_command(&command, &mut transport)
            .unwrap();

        assert_eq!(transport.commands.len(), 2);
        assert_eq!(transport.commands_hex()[1], "00C000000A");
        assert_eq!(response.payload().len(), 10);
        assert_eq!(response.status(), StatusWord::new(0x90, 0x00));
    }

    #[test]
    fn test_9f_chaining_keeps_order_and_class() {
        let mut transport = MockTransport::from_hex(["01029F02", "03049F01", "059000", "6F00"]);
        let command = Command::from_hex("81CA00FF00").unwrap();

        let response = GetResponseProcessor::default()
            .process_command(&command, &mut transport)
            .unwrap();

        assert_eq!(response.payload().as_ref(), &[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(
            transport.commands_hex(),
            ["81CA00FF00", "81C0000002", "81C0000001"]
        );
    }

    #[test]
    fn test_wrong_le_resend() {
        let mut transport =
            MockTransport::from_hex(["6C05", data_reply(5, "9000").as_str(), "6F00"]);
        let command = Command::from_hex("00B0000000").unwrap();

        let response = GetResponseProcessor::default()
            .process_command(&command, &mut transport)
            .unwrap();

        assert_eq!(transport.commands_hex(), ["00B0000000", "00B0000005"]);
        assert_eq!(response.payload().len(), 5);
        assert!(response.is_success());
    }

    #[test]
    fn test_wrong_le_then_more_data() {
        let mut transport = MockTransport::from_hex([
            "6C10",
            data_reply(8, "6108").as_str(),
            data_reply(8, "9000").as_str(),
            "6F00",
        ]);
        let command = Command::from_hex("00CA000000").unwrap();

        let response = GetResponseProcessor::default()
            .process_command(&command, &mut transport)
            .unwrap();

        assert_eq!(
            transport.commands_hex(),
            ["00CA000000", "00CA000010", "00C0000008"]
        );
        assert_eq!(response.payload().len(), 16);
    }

    #[test]
    fn test_error_status_is_returned_verbatim() {
        let mut transport = MockTransport::from_hex(["6A82"]);
        let command = Command::from_hex("00A4040000").unwrap();

        let response = GetResponseProcessor::default()
            .process_command(&command, &mut transport)
            .unwrap();

        assert!(response.payload().is_empty());
        assert_eq!(response.status(), StatusWord::new(0x6A, 0x82));
    }

    #[test]
    fn test_data_too_long_is_not_sent() {
        let mut transport = MockTransport::from_hex(["9000"]);
        let command = Command::new_with_data(0x80, 0xE2, 0x00, 0x00, vec![0x00; 300]);

        let result = GetResponseProcessor::default().process_command(&command, &mut transport);

        assert_eq!(result, Err(Error::DataTooLong(300)));
        assert!(transport.commands.is_empty());
    }

    #[test]
    fn test_chain_limit() {
        // The single remaining response repeats forever
        let mut transport = MockTransport::from_hex(["AA6101"]);
        let command = Command::from_hex("00B0000000").unwrap();

        let result = GetResponseProcessor::new(3).process_command(&command, &mut transport);

        assert_eq!(result, Err(Error::ChainLimitExceeded(3)));
        assert_eq!(transport.commands.len(), 4);
    }
}
