use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{
    siwe::SiweError,
    types::{Command, ResponseEvent, UnknownIdentifier},
};

/// Boxed error returned by injected collaborators (secondary wallet, username lookup, custom fallbacks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why a command could not be dispatched to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// No host is present.
    NotInWorldApp,
    /// The host is present but did not declare the command.
    OldAppVersion,
    /// The command has no capability entry at all.
    CommandNotSupported,
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnavailableReason::NotInWorldApp => "not_in_world_app",
            UnavailableReason::OldAppVersion => "old_app_version",
            UnavailableReason::CommandNotSupported => "command_not_supported",
        };
        f.write_str(s)
    }
}

/// Error types for MiniKit operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The command cannot be dispatched natively and no other tier was available.
    #[error("Command '{command}' is unavailable: {reason}")]
    CommandUnavailable {
        command: Command,
        reason: UnavailableReason,
    },

    /// The command needs a caller-supplied fallback outside of World App.
    #[error("Command '{0}' requires a fallback when running outside of World App")]
    FallbackRequired(Command),

    /// A verification is already waiting for its response.
    #[error("A verify command is already in flight")]
    VerifyInFlight,

    /// The caller-supplied deadline elapsed before the host answered.
    #[error("Timed out waiting for '{0}'")]
    ResponseTimeout(ResponseEvent),

    /// Another subscriber replaced this correlation's handler before the response arrived.
    #[error("Pending '{0}' response was superseded by another subscriber")]
    Superseded(ResponseEvent),

    /// The host delivered a payload of the wrong shape for the awaited event.
    #[error("Unexpected payload delivered for '{0}'")]
    UnexpectedPayload(ResponseEvent),

    /// The command input was rejected before anything was sent.
    #[error("Invalid '{command}' input: {reason}")]
    InvalidInput { command: Command, reason: String },

    /// The secondary wallet library failed.
    #[error("Secondary wallet error: {0}")]
    Secondary(#[source] BoxError),

    /// Raised by a caller-supplied fallback.
    #[error("Fallback error: {0}")]
    Custom(#[source] BoxError),

    /// The host called back with an event name the SDK does not know.
    #[error(transparent)]
    UnknownEvent(#[from] UnknownIdentifier),

    /// SIWE construction, parsing or validation errors.
    #[error("SIWE error: {0}")]
    Siwe(#[from] SiweError),

    /// JSON serialization/deserialization errors.
    #[error("Serde JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl Error {
    /// Wrap any error raised inside a custom fallback.
    pub fn custom(err: impl Into<BoxError>) -> Self {
        Error::Custom(err.into())
    }

    pub fn secondary(err: impl Into<BoxError>) -> Self {
        Error::Secondary(err.into())
    }

    pub(crate) fn invalid_input(command: Command, reason: impl Display) -> Self {
        Error::InvalidInput {
            command,
            reason: reason.to_string(),
        }
    }
}

/// A specialized `Result` type for MiniKit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse install-time error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallErrorCode {
    Unknown,
    AlreadyInstalled,
    OutsideOfWorldapp,
    AppOutOfDate,
}

impl InstallErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            InstallErrorCode::Unknown => "Failed to install MiniKit.",
            InstallErrorCode::AlreadyInstalled => "MiniKit is already installed.",
            InstallErrorCode::OutsideOfWorldapp => "MiniKit is not running inside of World App.",
            InstallErrorCode::AppOutOfDate => {
                "World App is out of date. Some commands may be unavailable."
            }
        }
    }
}

/// Outcome of [`MiniKit::install`](crate::MiniKit::install).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<InstallErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl InstallResult {
    pub fn success() -> Self {
        InstallResult {
            success: true,
            error_code: None,
            error_message: None,
        }
    }

    pub fn failed(code: InstallErrorCode) -> Self {
        InstallResult {
            success: false,
            error_code: Some(code),
            error_message: Some(code.message().to_string()),
        }
    }
}
