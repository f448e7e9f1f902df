//! Payload encodings for lamp commands and state reports
//!
//! Two wire formats are in use by deployed lamps and neither is canonical, so
//! the format is chosen per deployment:
//!
//! - [`PayloadFormat::Boolean`]: commands are JSON booleans (`true`/`false`),
//!   reports are the strings `"true"`/`"false"`.
//! - [`PayloadFormat::Word`]: commands and reports are the exact strings
//!   `"on"`/`"off"` (case-sensitive).

use crate::gpio::PinState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Boolean,
    Word,
}

/// Errors decoding an inbound command payload
#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("Unable to decode message JSON: {0}")]
    InvalidJson(String),
    #[error("Unrecognized state command: {0:?}")]
    UnknownCommand(String),
}

impl PayloadFormat {
    /// Decode a set-state command
    pub fn decode_command(self, payload: &[u8]) -> Result<PinState, PayloadError> {
        match self {
            PayloadFormat::Boolean => serde_json::from_slice::<bool>(payload)
                .map(|on| if on { PinState::On } else { PinState::Off })
                .map_err(|_| {
                    PayloadError::InvalidJson(String::from_utf8_lossy(payload).into_owned())
                }),
            PayloadFormat::Word => match payload {
                b"on" => Ok(PinState::On),
                b"off" => Ok(PinState::Off),
                other => Err(PayloadError::UnknownCommand(
                    String::from_utf8_lossy(other).into_owned(),
                )),
            },
        }
    }

    /// Encode a state report
    pub fn encode_state(self, state: PinState) -> &'static [u8] {
        match (self, state) {
            (PayloadFormat::Boolean, PinState::On) => b"true",
            (PayloadFormat::Boolean, PinState::Off) => b"false",
            (PayloadFormat::Word, PinState::On) => b"on",
            (PayloadFormat::Word, PinState::Off) => b"off",
        }
    }
}

/// Liveness marker published on the online topic
pub fn online_payload(online: bool) -> &'static [u8] {
    if online {
        b"true"
    } else {
        b"false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boolean_commands() {
        assert_eq!(
            PayloadFormat::Boolean.decode_command(b"true"),
            Ok(PinState::On)
        );
        assert_eq!(
            PayloadFormat::Boolean.decode_command(b"false"),
            Ok(PinState::Off)
        );
        // JSON allows surrounding whitespace
        assert_eq!(
            PayloadFormat::Boolean.decode_command(b" true\n"),
            Ok(PinState::On)
        );
    }

    #[test]
    fn test_boolean_rejects_non_boolean_json() {
        for payload in [&b"\"true\""[..], b"1", b"null", b"{}", b"", b"tru"] {
            assert!(matches!(
                PayloadFormat::Boolean.decode_command(payload),
                Err(PayloadError::InvalidJson(_))
            ));
        }
    }

    #[test]
    fn test_word_commands_are_case_sensitive() {
        assert_eq!(PayloadFormat::Word.decode_command(b"on"), Ok(PinState::On));
        assert_eq!(
            PayloadFormat::Word.decode_command(b"off"),
            Ok(PinState::Off)
        );
        assert_eq!(
            PayloadFormat::Word.decode_command(b"ON"),
            Err(PayloadError::UnknownCommand("ON".to_string()))
        );
        assert!(PayloadFormat::Word.decode_command(b"on ").is_err());
        assert!(PayloadFormat::Word.decode_command(b"true").is_err());
    }

    #[test]
    fn test_encode_state() {
        assert_eq!(PayloadFormat::Boolean.encode_state(PinState::On), b"true");
        assert_eq!(PayloadFormat::Boolean.encode_state(PinState::Off), b"false");
        assert_eq!(PayloadFormat::Word.encode_state(PinState::On), b"on");
        assert_eq!(PayloadFormat::Word.encode_state(PinState::Off), b"off");
    }

    #[test]
    fn test_report_of_decoded_command_matches_command_in_word_format() {
        for state in [PinState::On, PinState::Off] {
            let encoded = PayloadFormat::Word.encode_state(state);
            assert_eq!(PayloadFormat::Word.decode_command(encoded), Ok(state));
        }
    }

    #[test]
    fn test_online_payload() {
        assert_eq!(online_payload(true), b"true");
        assert_eq!(online_payload(false), b"false");
    }

    proptest! {
        #[test]
        fn word_format_rejects_everything_but_on_off(payload in ".*") {
            prop_assume!(payload != "on" && payload != "off");
            prop_assert!(PayloadFormat::Word.decode_command(payload.as_bytes()).is_err());
        }

        #[test]
        fn boolean_format_rejects_arbitrary_bytes(payload in proptest::collection::vec(any::<u8>(), 0..32)) {
            let trimmed = String::from_utf8_lossy(&payload).trim().to_string();
            prop_assume!(trimmed != "true" && trimmed != "false");
            prop_assert!(PayloadFormat::Boolean.decode_command(&payload).is_err());
        }
    }
}
