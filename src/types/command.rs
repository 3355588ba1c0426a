//! Command and response event identifiers.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// A named privileged operation requested from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    #[serde(rename = "verify")]
    Verify,
    #[serde(rename = "pay")]
    Pay,
    #[serde(rename = "wallet-auth")]
    WalletAuth,
    #[serde(rename = "send-transaction")]
    SendTransaction,
    #[serde(rename = "sign-message")]
    SignMessage,
    #[serde(rename = "sign-typed-data")]
    SignTypedData,
    #[serde(rename = "share-contacts")]
    ShareContacts,
    #[serde(rename = "request-permission")]
    RequestPermission,
    #[serde(rename = "get-permissions")]
    GetPermissions,
    #[serde(rename = "send-haptic-feedback")]
    SendHapticFeedback,
    #[serde(rename = "share")]
    Share,
    #[serde(rename = "chat")]
    Chat,
    #[serde(rename = "close-miniapp")]
    CloseMiniApp,
}

impl Command {
    /// Every command known to the SDK, in negotiation order.
    pub const ALL: [Command; 13] = [
        Command::Verify,
        Command::Pay,
        Command::WalletAuth,
        Command::SendTransaction,
        Command::SignMessage,
        Command::SignTypedData,
        Command::ShareContacts,
        Command::RequestPermission,
        Command::GetPermissions,
        Command::SendHapticFeedback,
        Command::Share,
        Command::Chat,
        Command::CloseMiniApp,
    ];

    /// The wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Verify => "verify",
            Command::Pay => "pay",
            Command::WalletAuth => "wallet-auth",
            Command::SendTransaction => "send-transaction",
            Command::SignMessage => "sign-message",
            Command::SignTypedData => "sign-typed-data",
            Command::ShareContacts => "share-contacts",
            Command::RequestPermission => "request-permission",
            Command::GetPermissions => "get-permissions",
            Command::SendHapticFeedback => "send-haptic-feedback",
            Command::Share => "share",
            Command::Chat => "chat",
            Command::CloseMiniApp => "close-miniapp",
        }
    }

    /// Protocol version the SDK requires the host to support.
    pub fn version(&self) -> u32 {
        match self {
            Command::WalletAuth => 2,
            _ => 1,
        }
    }

    /// The event the host answers on, or `None` for fire-and-forget commands.
    pub fn response_event(&self) -> Option<ResponseEvent> {
        match self {
            Command::Verify => Some(ResponseEvent::MiniAppVerifyAction),
            Command::Pay => Some(ResponseEvent::MiniAppPayment),
            Command::WalletAuth => Some(ResponseEvent::MiniAppWalletAuth),
            Command::SendTransaction => Some(ResponseEvent::MiniAppSendTransaction),
            Command::SignMessage => Some(ResponseEvent::MiniAppSignMessage),
            Command::SignTypedData => Some(ResponseEvent::MiniAppSignTypedData),
            Command::ShareContacts => Some(ResponseEvent::MiniAppShareContacts),
            Command::RequestPermission => Some(ResponseEvent::MiniAppRequestPermission),
            Command::GetPermissions => Some(ResponseEvent::MiniAppGetPermissions),
            Command::SendHapticFeedback => Some(ResponseEvent::MiniAppSendHapticFeedback),
            Command::Share => Some(ResponseEvent::MiniAppShare),
            Command::Chat => Some(ResponseEvent::MiniAppChat),
            Command::CloseMiniApp => None,
        }
    }

    /// Commands an application must handle itself when running outside the host.
    pub fn requires_fallback(&self) -> bool {
        matches!(self, Command::Verify | Command::Pay)
    }

    /// Commands that a connected secondary wallet library can serve on the web.
    pub fn has_secondary_path(&self) -> bool {
        matches!(
            self,
            Command::WalletAuth
                | Command::SendTransaction
                | Command::SignMessage
                | Command::SignTypedData
        )
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownIdentifier(s.to_string()))
    }
}

/// Identifier under which the host delivers its asynchronous reply to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseEvent {
    #[serde(rename = "miniapp-verify-action")]
    MiniAppVerifyAction,
    #[serde(rename = "miniapp-payment")]
    MiniAppPayment,
    #[serde(rename = "miniapp-wallet-auth")]
    MiniAppWalletAuth,
    #[serde(rename = "miniapp-send-transaction")]
    MiniAppSendTransaction,
    #[serde(rename = "miniapp-sign-message")]
    MiniAppSignMessage,
    #[serde(rename = "miniapp-sign-typed-data")]
    MiniAppSignTypedData,
    #[serde(rename = "miniapp-share-contacts")]
    MiniAppShareContacts,
    #[serde(rename = "miniapp-request-permission")]
    MiniAppRequestPermission,
    #[serde(rename = "miniapp-get-permissions")]
    MiniAppGetPermissions,
    #[serde(rename = "miniapp-send-haptic-feedback")]
    MiniAppSendHapticFeedback,
    #[serde(rename = "miniapp-share")]
    MiniAppShare,
    #[serde(rename = "miniapp-chat")]
    MiniAppChat,
}

impl ResponseEvent {
    pub const ALL: [ResponseEvent; 12] = [
        ResponseEvent::MiniAppVerifyAction,
        ResponseEvent::MiniAppPayment,
        ResponseEvent::MiniAppWalletAuth,
        ResponseEvent::MiniAppSendTransaction,
        ResponseEvent::MiniAppSignMessage,
        ResponseEvent::MiniAppSignTypedData,
        ResponseEvent::MiniAppShareContacts,
        ResponseEvent::MiniAppRequestPermission,
        ResponseEvent::MiniAppGetPermissions,
        ResponseEvent::MiniAppSendHapticFeedback,
        ResponseEvent::MiniAppShare,
        ResponseEvent::MiniAppChat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResponseEvent::MiniAppVerifyAction => "miniapp-verify-action",
            ResponseEvent::MiniAppPayment => "miniapp-payment",
            ResponseEvent::MiniAppWalletAuth => "miniapp-wallet-auth",
            ResponseEvent::MiniAppSendTransaction => "miniapp-send-transaction",
            ResponseEvent::MiniAppSignMessage => "miniapp-sign-message",
            ResponseEvent::MiniAppSignTypedData => "miniapp-sign-typed-data",
            ResponseEvent::MiniAppShareContacts => "miniapp-share-contacts",
            ResponseEvent::MiniAppRequestPermission => "miniapp-request-permission",
            ResponseEvent::MiniAppGetPermissions => "miniapp-get-permissions",
            ResponseEvent::MiniAppSendHapticFeedback => "miniapp-send-haptic-feedback",
            ResponseEvent::MiniAppShare => "miniapp-share",
            ResponseEvent::MiniAppChat => "miniapp-chat",
        }
    }
}

impl Display for ResponseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResponseEvent {
    type Err = UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResponseEvent::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| UnknownIdentifier(s.to_string()))
    }
}

/// A command or event name that the SDK does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown identifier '{0}'")]
pub struct UnknownIdentifier(pub String);
