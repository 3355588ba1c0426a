//! Sign-In with Ethereum messages: generation, parsing, validation and verification.
//!
//! The text layout follows EIP-4361 exactly, one field per line, every line terminated by
//! `\n`:
//!
//! ```text
//! https://example.com wants you to sign in with your Ethereum account:
//! 0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20
//!
//! Sign in to the example app
//!
//! URI: https://example.com/login
//! Version: 1
//! Chain ID: 480
//! Nonce: 12345678
//! Issued At: 2025-01-01T00:00:00.000Z
//! ```
//!
//! Without a statement only the statement line is dropped; both blank lines stay:
//!
//! ```text
//! https://example.com wants you to sign in with your Ethereum account:
//! 0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20
//!
//!
//! URI: https://example.com/login
//! ...
//! ```

use std::{fmt::Display, str::FromStr};

use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod verify;

#[cfg(feature = "http-client")]
mod rpc;

pub use verify::*;

#[cfg(feature = "http-client")]
pub use rpc::*;

const PREAMBLE: &str = " wants you to sign in with your Ethereum account:";
const ADDRESS_PLACEHOLDER: &str = "{address}";

const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_ID_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TIME_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";

#[derive(Debug, thiserror::Error)]
pub enum SiweError {
    #[error("Missing '{0}' in SIWE message")]
    MissingTag(&'static str),
    #[error("Unexpected line in SIWE message: '{0}'")]
    ExtraLines(String),
    #[error("Invalid chain id '{0}'")]
    InvalidChainId(String),
    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("'nonce' is required")]
    MissingNonce,
    #[error("'nonce' must be at least 8 characters")]
    NonceTooShort,
    #[error("'nonce' must be alphanumeric")]
    NonceNotAlphanumeric,
    #[error("'statement' must not contain newlines")]
    StatementHasNewline,
    #[error("'statement' must not be empty; leave it unset instead")]
    EmptyStatement,
    #[error("'expiration_time' must be in the future")]
    ExpirationInPast,
    #[error("'expiration_time' must be within 7 days")]
    ExpirationTooFar,
    #[error("'not_before' must be within 7 days")]
    NotBeforeTooFar,

    #[error("Expired message")]
    Expired,
    #[error("Message is not yet valid")]
    NotYetValid,
    #[error("Nonce mismatch. Got: {got}, Expected: {expected}")]
    NonceMismatch { got: String, expected: String },
    #[error("Statement mismatch. Got: {got:?}, Expected: {expected}")]
    StatementMismatch {
        got: Option<String>,
        expected: String,
    },
    #[error("Request ID mismatch. Got: {got:?}, Expected: {expected}")]
    RequestIdMismatch {
        got: Option<String>,
        expected: String,
    },

    #[error("SIWE verification must run on a backend, not in the browser")]
    ClientSideVerification,
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),
    #[error("Invalid signature hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("Invalid signature: {0}")]
    InvalidSignature(#[from] alloy_primitives::SignatureError),
    #[error("Signature verification failed")]
    VerificationFailed,
    #[error("Signed message not signed by wallet owner")]
    InvalidOwner,
    #[error("Contract call failed: {0}")]
    ContractCall(String),
}

/// A parsed or to-be-generated SIWE message.
///
/// Timestamps are kept as the exact strings that appear in the message, so a parsed message
/// generates back to the same text.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiweMessage {
    #[builder(into)]
    pub scheme: Option<String>,
    /// Host, including the port when it is not the scheme default.
    #[builder(into)]
    pub domain: String,
    /// `None` renders the `{address}` placeholder the host fills in before signing.
    #[builder(into)]
    pub address: Option<String>,
    #[builder(into)]
    pub statement: Option<String>,
    #[builder(into)]
    pub uri: String,
    #[builder(into, default = String::from("1"))]
    pub version: String,
    #[builder(default = crate::types::WORLD_CHAIN_ID)]
    pub chain_id: u64,
    #[builder(into)]
    pub nonce: String,
    #[builder(into)]
    pub issued_at: String,
    #[builder(into)]
    pub expiration_time: Option<String>,
    #[builder(into)]
    pub not_before: Option<String>,
    #[builder(into)]
    pub request_id: Option<String>,
}

impl Display for SiweMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        writeln!(f, "{}{PREAMBLE}", self.domain)?;
        writeln!(
            f,
            "{}",
            self.address.as_deref().unwrap_or(ADDRESS_PLACEHOLDER)
        )?;
        writeln!(f)?;

        // The statement slot is a single line; the blank line after it is always written.
        if let Some(statement) = self.statement.as_deref().filter(|s| !s.is_empty()) {
            writeln!(f, "{statement}")?;
        }
        writeln!(f)?;

        writeln!(f, "{URI_TAG}{}", self.uri)?;
        writeln!(f, "{VERSION_TAG}{}", self.version)?;
        writeln!(f, "{CHAIN_ID_TAG}{}", self.chain_id)?;
        writeln!(f, "{NONCE_TAG}{}", self.nonce)?;
        writeln!(f, "{ISSUED_AT_TAG}{}", self.issued_at)?;

        if let Some(expiration_time) = &self.expiration_time {
            writeln!(f, "{EXPIRATION_TIME_TAG}{expiration_time}")?;
        }
        if let Some(not_before) = &self.not_before {
            writeln!(f, "{NOT_BEFORE_TAG}{not_before}")?;
        }
        if let Some(request_id) = &self.request_id {
            writeln!(f, "{REQUEST_ID_TAG}{request_id}")?;
        }
        Ok(())
    }
}

impl FromStr for SiweMessage {
    type Err = SiweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Render `message` in the SIWE text format.
pub fn generate(message: &SiweMessage) -> String {
    message.to_string()
}

struct Lines<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn take_line(&mut self) -> Option<&'a str> {
        let line = self.peek();
        self.pos += 1;
        line
    }

    fn required(&mut self, tag: &'static str) -> Result<String, SiweError> {
        let value = self
            .peek()
            .and_then(|line| line.strip_prefix(tag))
            .ok_or(SiweError::MissingTag(tag.trim_end_matches([':', ' '])))?;
        self.pos += 1;
        Ok(value.to_string())
    }

    fn optional(&mut self, tag: &str) -> Option<String> {
        let value = self.peek()?.strip_prefix(tag)?;
        self.pos += 1;
        Some(value.to_string())
    }
}

/// Parse a SIWE message. Fails on a missing required field or on any unconsumed line.
pub fn parse(message: &str) -> Result<SiweMessage, SiweError> {
    let mut lines = Lines {
        lines: message.split('\n').collect(),
        pos: 0,
    };

    let origin = lines
        .take_line()
        .and_then(|line| line.strip_suffix(PREAMBLE))
        .ok_or(SiweError::MissingTag("preamble"))?;
    let (scheme, domain) = match origin.split_once("://") {
        Some((scheme, domain)) => (Some(scheme.to_string()), domain.to_string()),
        None => (None, origin.to_string()),
    };

    let address = match lines.take_line() {
        Some(ADDRESS_PLACEHOLDER) => None,
        Some(address) if !address.is_empty() => Some(address.to_string()),
        _ => return Err(SiweError::MissingTag("address")),
    };

    if lines.take_line() != Some("") {
        return Err(SiweError::MissingTag("blank line"));
    }

    let statement = match lines.take_line() {
        Some("") => None,
        Some(line) => {
            if lines.take_line() != Some("") {
                return Err(SiweError::MissingTag("blank line"));
            }
            Some(line.to_string())
        }
        None => return Err(SiweError::MissingTag("blank line")),
    };

    let uri = lines.required(URI_TAG)?;
    let version = lines.required(VERSION_TAG)?;
    let chain_id = lines.required(CHAIN_ID_TAG)?;
    let chain_id = chain_id
        .parse()
        .map_err(|_| SiweError::InvalidChainId(chain_id))?;
    let nonce = lines.required(NONCE_TAG)?;
    let issued_at = lines.required(ISSUED_AT_TAG)?;
    let expiration_time = lines.optional(EXPIRATION_TIME_TAG);
    let not_before = lines.optional(NOT_BEFORE_TAG);
    let request_id = lines.optional(REQUEST_ID_TAG);

    while let Some(line) = lines.take_line() {
        if !line.is_empty() {
            return Err(SiweError::ExtraLines(line.to_string()));
        }
    }

    Ok(SiweMessage {
        scheme,
        domain,
        address,
        statement,
        uri,
        version,
        chain_id,
        nonce,
        issued_at,
        expiration_time,
        not_before,
        request_id,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, SiweError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| SiweError::InvalidTimestamp(value.to_string()))
}

/// Check a parsed message against what the backend issued, at the current time.
pub fn validate(
    message: &SiweMessage,
    nonce: &str,
    statement: Option<&str>,
    request_id: Option<&str>,
) -> Result<(), SiweError> {
    validate_at(message, nonce, statement, request_id, Utc::now())
}

pub fn validate_at(
    message: &SiweMessage,
    nonce: &str,
    statement: Option<&str>,
    request_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), SiweError> {
    if let Some(expiration_time) = &message.expiration_time {
        if parse_timestamp(expiration_time)? < now {
            return Err(SiweError::Expired);
        }
    }

    if let Some(not_before) = &message.not_before {
        if parse_timestamp(not_before)? > now {
            return Err(SiweError::NotYetValid);
        }
    }

    if message.nonce != nonce {
        return Err(SiweError::NonceMismatch {
            got: message.nonce.clone(),
            expected: nonce.to_string(),
        });
    }

    if let Some(expected) = statement.filter(|s| message.statement.as_deref() != Some(*s)) {
        return Err(SiweError::StatementMismatch {
            got: message.statement.clone(),
            expected: expected.to_string(),
        });
    }

    if let Some(expected) = request_id.filter(|r| message.request_id.as_deref() != Some(*r)) {
        return Err(SiweError::RequestIdMismatch {
            got: message.request_id.clone(),
            expected: expected.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::types::iso_timestamp;

    const ADDRESS: &str = "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20";

    fn minimal() -> SiweMessage {
        SiweMessage::builder()
            .domain("example.com")
            .uri("https://example.com/login")
            .nonce("12345678")
            .issued_at("2025-01-01T00:00:00.000Z")
            .build()
    }

    #[test]
    fn test_minimal_layout() {
        assert_eq!(
            generate(&minimal()),
            "example.com wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             \n\
             URI: https://example.com/login\n\
             Version: 1\n\
             Chain ID: 480\n\
             Nonce: 12345678\n\
             Issued At: 2025-01-01T00:00:00.000Z\n"
        );
    }

    #[test]
    fn test_full_round_trip() {
        let message = SiweMessage::builder()
            .scheme("https")
            .domain("example.com:3000")
            .address(ADDRESS)
            .statement("Sign in to the example app")
            .uri("https://example.com:3000/login")
            .nonce("abcdef12")
            .issued_at("2025-01-01T00:00:00.000Z")
            .expiration_time("2025-01-02T00:00:00.000Z")
            .not_before("2025-01-01T00:00:00.000Z")
            .request_id("req-1")
            .build();

        let text = message.to_string();
        assert!(text.starts_with(
            "https://example.com:3000 wants you to sign in with your Ethereum account:\n"
        ));
        assert!(text.ends_with("Request ID: req-1\n"));
        assert_eq!(parse(&text).unwrap(), message);

        let minimal = minimal();
        assert_eq!(minimal.to_string().parse::<SiweMessage>().unwrap(), minimal);
    }

    #[test]
    fn test_parse_without_statement() {
        let text = "https://example.com wants you to sign in with your Ethereum account:\n\
                    0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20\n\
                    \n\
                    \n\
                    URI: https://example.com/login\n\
                    Version: 1\n\
                    Chain ID: 480\n\
                    Nonce: 12345678\n\
                    Issued At: 2025-01-01T00:00:00.000Z\n";

        let message = parse(text).unwrap();
        assert_eq!(message.statement, None);
        assert_eq!(message.address.as_deref(), Some(ADDRESS));
        assert_eq!(message.uri, "https://example.com/login");
        assert_eq!(message.to_string(), text);

        // One blank line only is not a valid layout.
        let collapsed = text.replacen("\n\n\n", "\n\n", 1);
        assert!(matches!(
            parse(&collapsed),
            Err(SiweError::MissingTag("blank line"))
        ));
    }

    #[test]
    fn test_statement_layout() {
        let message = SiweMessage {
            statement: Some("Sign in".to_string()),
            ..minimal()
        };
        assert!(
            message
                .to_string()
                .contains("{address}\n\nSign in\n\nURI: https://example.com/login\n")
        );
    }

    #[test]
    fn test_empty_statement_is_omitted() {
        let message = SiweMessage {
            statement: Some(String::new()),
            ..minimal()
        };
        let parsed = parse(&message.to_string()).unwrap();
        assert_eq!(parsed.statement, None);
    }

    #[test]
    fn test_parse_failures() {
        let text = minimal().to_string();

        let without_nonce = text.replace("Nonce: 12345678\n", "");
        assert!(matches!(
            parse(&without_nonce),
            Err(SiweError::MissingTag("Nonce"))
        ));

        let extra = format!("{text}Resources:\n");
        assert!(matches!(parse(&extra), Err(SiweError::ExtraLines(_))));

        let bad_chain = text.replace("Chain ID: 480", "Chain ID: world");
        assert!(matches!(
            parse(&bad_chain),
            Err(SiweError::InvalidChainId(_))
        ));

        assert!(matches!(
            parse("hello"),
            Err(SiweError::MissingTag("preamble"))
        ));
    }

    #[test]
    fn test_validate_expiration() {
        let now = Utc::now();
        let expiring = |at| SiweMessage {
            expiration_time: Some(iso_timestamp(at)),
            ..minimal()
        };

        let err = validate_at(&expiring(now - Duration::seconds(1)), "12345678", None, None, now)
            .unwrap_err();
        assert!(err.to_string().to_lowercase().contains("expired"));

        assert!(
            validate_at(&expiring(now + Duration::hours(1)), "12345678", None, None, now).is_ok()
        );
    }

    #[test]
    fn test_validate_not_before_and_fields() {
        let now = Utc::now();
        let message = SiweMessage {
            statement: Some("Sign in".to_string()),
            request_id: Some("req-1".to_string()),
            not_before: Some(iso_timestamp(now + Duration::minutes(5))),
            ..minimal()
        };
        assert!(matches!(
            validate_at(&message, "12345678", None, None, now),
            Err(SiweError::NotYetValid)
        ));

        let message = SiweMessage {
            not_before: None,
            ..message
        };
        assert!(matches!(
            validate_at(&message, "87654321", None, None, now),
            Err(SiweError::NonceMismatch { .. })
        ));
        assert!(matches!(
            validate_at(&message, "12345678", Some("Other"), None, now),
            Err(SiweError::StatementMismatch { .. })
        ));
        assert!(matches!(
            validate_at(&message, "12345678", None, Some("req-2"), now),
            Err(SiweError::RequestIdMismatch { .. })
        ));
        assert!(validate_at(&message, "12345678", Some("Sign in"), Some("req-1"), now).is_ok());
    }
}
