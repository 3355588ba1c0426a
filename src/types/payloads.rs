//! Command inputs and the outbound messages built from them.

use bon::Builder;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    siwe::SiweError,
    types::{AnyJson, Command},
};

/// A one-shot message sent over the webview channel. The host never acknowledges it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub command: Command,
    pub version: u32,
    pub payload: AnyJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    Orb,
    Device,
    Document,
    SecureDocument,
}

impl std::fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerificationLevel::Orb => "orb",
            VerificationLevel::Device => "device",
            VerificationLevel::Document => "document",
            VerificationLevel::SecureDocument => "secure_document",
        };
        f.write_str(s)
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyInput {
    #[builder(into)]
    pub action: String,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_level: Option<VerificationLevel>,
}

/// What is actually sent for a verify command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyCommandPayload {
    #[serde(flatten)]
    pub input: VerifyInput,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    #[serde(rename = "WLD")]
    Wld,
    #[serde(rename = "USDCE")]
    Usdc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub symbol: Token,
    /// Amount in the token's smallest unit, as a decimal string.
    pub token_amount: String,
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayInput {
    #[builder(into)]
    pub reference: String,
    #[builder(into)]
    pub to: String,
    pub tokens: Vec<TokenAmount>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[builder(into)]
    pub description: String,
}

impl PayInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.reference.is_empty() {
            return Err("'reference' is required".to_string());
        }
        if self.tokens.is_empty() {
            return Err("at least one token is required".to_string());
        }
        for token in &self.tokens {
            match token.token_amount.parse::<u128>() {
                Ok(amount) if amount > 0 => {}
                _ => {
                    return Err(format!(
                        "invalid token amount '{}' for {:?}",
                        token.token_amount, token.symbol
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Input for a wallet auth. The SIWE message itself is built by the SDK.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct WalletAuthInput {
    #[builder(into)]
    pub nonce: String,
    #[builder(into)]
    pub statement: Option<String>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub not_before: Option<DateTime<Utc>>,
    #[builder(into)]
    pub request_id: Option<String>,
}

/// Longest validity window, in days, accepted for `expiration_time` and `not_before`.
pub const MAX_AUTH_WINDOW_DAYS: i64 = 7;

impl WalletAuthInput {
    /// Check the input against the rules the host enforces on SIWE requests.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), SiweError> {
        let window_end = now + Duration::days(MAX_AUTH_WINDOW_DAYS);
        if self.nonce.is_empty() {
            return Err(SiweError::MissingNonce);
        }
        if self.nonce.len() < 8 {
            return Err(SiweError::NonceTooShort);
        }
        if !self.nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SiweError::NonceNotAlphanumeric);
        }
        if self.statement.as_deref().is_some_and(|s| s.contains('\n')) {
            return Err(SiweError::StatementHasNewline);
        }
        if self.statement.as_deref().is_some_and(str::is_empty) {
            return Err(SiweError::EmptyStatement);
        }
        if let Some(expiration) = self.expiration_time {
            if expiration <= now {
                return Err(SiweError::ExpirationInPast);
            }
            if expiration > window_end {
                return Err(SiweError::ExpirationTooFar);
            }
        }
        if self.not_before.is_some_and(|nbf| nbf > window_end) {
            return Err(SiweError::NotBeforeTooFar);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SiweError> {
        self.validate_at(Utc::now())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAuthPayload {
    pub siwe_message: String,
}

#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Contract or recipient address.
    #[builder(into)]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abi: Option<AnyJson>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<AnyJson>>,
    /// Raw calldata, used instead of `abi` + `function_name` when present.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Hex-encoded wei value.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendTransactionInput {
    pub transaction: Vec<Transaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permit2: Option<Vec<AnyJson>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignMessageInput {
    pub message: String,
}

impl SignMessageInput {
    pub fn new(message: impl Into<String>) -> Self {
        SignMessageInput {
            message: message.into(),
        }
    }
}

#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignTypedDataInput {
    pub types: AnyJson,
    #[builder(into)]
    pub primary_type: String,
    pub message: AnyJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<AnyJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

#[derive(Builder, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareContactsInput {
    #[builder(default)]
    pub is_multi_select_enabled: bool,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Notifications,
    Contacts,
    Microphone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPermissionInput {
    pub permission: Permission,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPermissionsInput {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStyle {
    Error,
    Success,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactStyle {
    Light,
    Medium,
    Heavy,
}

/// Haptic feedback request.
///
/// ```
/// use minikit::types::{HapticFeedback, ImpactStyle};
///
/// let json = serde_json::to_value(HapticFeedback::Impact { style: ImpactStyle::Heavy }).unwrap();
/// assert_eq!(json, serde_json::json!({ "hapticsType": "impact", "style": "heavy" }));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hapticsType", rename_all = "kebab-case")]
pub enum HapticFeedback {
    Notification { style: NotificationStyle },
    SelectionChanged,
    Impact { style: ImpactStyle },
}

#[derive(Builder, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareInput {
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInput {
    #[builder(into)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(nonce: &str) -> WalletAuthInput {
        WalletAuthInput::builder().nonce(nonce).build()
    }

    #[test]
    fn test_nonce_rules() {
        let now = Utc::now();

        let err = input("ab12").validate_at(now).unwrap_err();
        assert!(err.to_string().contains("at least 8 characters"));

        assert!(input("abcdef12").validate_at(now).is_ok());
        assert!(matches!(
            input("abcdef1!").validate_at(now),
            Err(SiweError::NonceNotAlphanumeric)
        ));
        assert!(matches!(
            input("").validate_at(now),
            Err(SiweError::MissingNonce)
        ));
    }

    #[test]
    fn test_statement_rules() {
        let now = Utc::now();
        let with_statement = |statement: &str| {
            WalletAuthInput::builder()
                .nonce("abcdef12")
                .statement(statement)
                .build()
        };

        assert!(matches!(
            with_statement("").validate_at(now),
            Err(SiweError::EmptyStatement)
        ));
        assert!(matches!(
            with_statement("line\nbreak").validate_at(now),
            Err(SiweError::StatementHasNewline)
        ));
        assert!(with_statement("Sign in").validate_at(now).is_ok());
    }

    #[test]
    fn test_time_window_rules() {
        let now = Utc::now();

        let past = WalletAuthInput::builder()
            .nonce("abcdef12")
            .expiration_time(now - Duration::seconds(1))
            .build();
        assert!(matches!(past.validate_at(now), Err(SiweError::ExpirationInPast)));

        let too_far = WalletAuthInput::builder()
            .nonce("abcdef12")
            .expiration_time(now + Duration::days(8))
            .build();
        assert!(matches!(too_far.validate_at(now), Err(SiweError::ExpirationTooFar)));

        let nbf = WalletAuthInput::builder()
            .nonce("abcdef12")
            .not_before(now + Duration::days(8))
            .build();
        assert!(matches!(nbf.validate_at(now), Err(SiweError::NotBeforeTooFar)));

        let ok = WalletAuthInput::builder()
            .nonce("abcdef12")
            .expiration_time(now + Duration::hours(1))
            .build();
        assert!(ok.validate_at(now).is_ok());
    }

    #[test]
    fn test_pay_validation() {
        let pay = PayInput::builder()
            .reference("ref-1")
            .to("0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20")
            .tokens(vec![TokenAmount {
                symbol: Token::Wld,
                token_amount: "0".to_string(),
            }])
            .description("coffee")
            .build();
        assert!(pay.validate().is_err());

        let pay = PayInput {
            tokens: vec![TokenAmount {
                symbol: Token::Usdc,
                token_amount: "1000000".to_string(),
            }],
            ..pay
        };
        assert!(pay.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&pay.tokens[0]).unwrap()["symbol"],
            serde_json::json!("USDCE")
        );
    }
}
