//! Response payloads delivered by the host, validated at the boundary into one tagged union.

use serde::{Deserialize, Serialize};

use crate::types::{AnyJson, Permission, Record, ResponseEvent, VerificationLevel, WalletAuthVersion};

/// Error half of every response payload.
///
/// Domain errors are reported here and never thrown: the caller inspects `error_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AnyJson>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

/// A host response, discriminated by its `status` field.
///
/// ```
/// use minikit::types::{CommandResponse, SignMessageSuccess};
///
/// let response: CommandResponse<SignMessageSuccess> = serde_json::from_value(serde_json::json!({
///     "status": "error",
///     "error_code": "user_rejected",
///     "version": 1
/// })).unwrap();
///
/// assert_eq!(response.as_error().unwrap().error_code, "user_rejected");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CommandResponse<S> {
    Success(S),
    Error(CommandError),
}

impl<S> CommandResponse<S> {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResponse::Success(_))
    }

    pub fn as_success(&self) -> Option<&S> {
        match self {
            CommandResponse::Success(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&CommandError> {
        match self {
            CommandResponse::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<S, CommandError> {
        match self {
            CommandResponse::Success(s) => Ok(s),
            CommandResponse::Error(e) => Err(e),
        }
    }
}

/// One proof of a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub proof: String,
    pub merkle_root: String,
    pub nullifier_hash: String,
    pub verification_level: VerificationLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifySingleSuccess {
    #[serde(flatten)]
    pub result: VerificationResult,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyMultiSuccess {
    pub verifications: Vec<VerificationResult>,
    pub version: u32,
}

/// Successful verification, either a single proof or a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerifySuccess {
    Multi(VerifyMultiSuccess),
    Single(VerifySingleSuccess),
}

impl VerifySuccess {
    pub fn version(&self) -> u32 {
        match self {
            VerifySuccess::Multi(m) => m.version,
            VerifySuccess::Single(s) => s.version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAuthSuccess {
    pub address: String,
    pub message: String,
    pub signature: String,
    pub version: WalletAuthVersion,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaySuccess {
    pub transaction_status: String,
    pub transaction_id: String,
    pub reference: String,
    pub from: String,
    pub chain: String,
    pub timestamp: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionSuccess {
    pub transaction_status: String,
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub from: String,
    pub chain: String,
    pub timestamp: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignMessageSuccess {
    pub signature: String,
    pub address: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignTypedDataSuccess {
    pub signature: String,
    pub address: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub username: String,
    #[serde(rename = "walletAddress")]
    pub wallet_address: String,
    #[serde(rename = "profilePictureUrl", default)]
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareContactsSuccess {
    pub contacts: Vec<Contact>,
    pub timestamp: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPermissionSuccess {
    pub permission: Permission,
    pub timestamp: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPermissionsSuccess {
    pub permissions: Record<bool>,
    pub timestamp: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticFeedbackSuccess {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSuccess {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_files_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSuccess {
    pub count: u32,
    pub timestamp: String,
    pub version: u32,
}

pub type VerifyResponse = CommandResponse<VerifySuccess>;
pub type PayResponse = CommandResponse<PaySuccess>;
pub type WalletAuthResponse = CommandResponse<WalletAuthSuccess>;
pub type SendTransactionResponse = CommandResponse<SendTransactionSuccess>;
pub type SignMessageResponse = CommandResponse<SignMessageSuccess>;
pub type SignTypedDataResponse = CommandResponse<SignTypedDataSuccess>;
pub type ShareContactsResponse = CommandResponse<ShareContactsSuccess>;
pub type RequestPermissionResponse = CommandResponse<RequestPermissionSuccess>;
pub type GetPermissionsResponse = CommandResponse<GetPermissionsSuccess>;
pub type HapticFeedbackResponse = CommandResponse<HapticFeedbackSuccess>;
pub type ShareResponse = CommandResponse<ShareSuccess>;
pub type ChatResponse = CommandResponse<ChatSuccess>;

/// A response type bound to exactly one [`ResponseEvent`].
pub trait EventPayload: Sized {
    const EVENT: ResponseEvent;

    fn from_payload(payload: ResponsePayload) -> Option<Self>;

    fn into_payload(self) -> ResponsePayload;
}

macro_rules! response_payloads {
    ($($variant:ident($ty:ty) => $event:ident),* $(,)?) => {
        /// Every inbound payload, keyed by the event it arrived on.
        #[derive(Debug, Clone, PartialEq)]
        pub enum ResponsePayload {
            $($variant($ty)),*
        }

        impl ResponsePayload {
            /// The event this payload belongs to.
            pub fn event(&self) -> ResponseEvent {
                match self {
                    $(ResponsePayload::$variant(_) => ResponseEvent::$event),*
                }
            }

            /// Validate a raw payload received on `event`.
            pub fn from_value(event: ResponseEvent, value: AnyJson) -> Result<Self, serde_json::Error> {
                match event {
                    $(ResponseEvent::$event => serde_json::from_value(value).map(ResponsePayload::$variant)),*
                }
            }

            pub fn to_value(&self) -> Result<AnyJson, serde_json::Error> {
                match self {
                    $(ResponsePayload::$variant(p) => serde_json::to_value(p)),*
                }
            }
        }

        $(
            impl EventPayload for $ty {
                const EVENT: ResponseEvent = ResponseEvent::$event;

                fn from_payload(payload: ResponsePayload) -> Option<Self> {
                    match payload {
                        ResponsePayload::$variant(p) => Some(p),
                        _ => None,
                    }
                }

                fn into_payload(self) -> ResponsePayload {
                    ResponsePayload::$variant(self)
                }
            }
        )*
    };
}

response_payloads! {
    Verify(VerifyResponse) => MiniAppVerifyAction,
    Payment(PayResponse) => MiniAppPayment,
    WalletAuth(WalletAuthResponse) => MiniAppWalletAuth,
    SendTransaction(SendTransactionResponse) => MiniAppSendTransaction,
    SignMessage(SignMessageResponse) => MiniAppSignMessage,
    SignTypedData(SignTypedDataResponse) => MiniAppSignTypedData,
    ShareContacts(ShareContactsResponse) => MiniAppShareContacts,
    RequestPermission(RequestPermissionResponse) => MiniAppRequestPermission,
    GetPermissions(GetPermissionsResponse) => MiniAppGetPermissions,
    SendHapticFeedback(HapticFeedbackResponse) => MiniAppSendHapticFeedback,
    Share(ShareResponse) => MiniAppShare,
    Chat(ChatResponse) => MiniAppChat,
}

/// Envelope the host uses when it calls back into the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub event: String,
    pub payload: AnyJson,
}
