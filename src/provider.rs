//! An EIP-1193 style wallet provider over the MiniKit commands.
//!
//! Lets wallet libraries written against `request({ method, params })` talk to World App.
//! Account access goes through wallet auth; signing and transactions are routed to the
//! matching commands. Only World Chain is supported.

use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use alloy_primitives::Address;
use futures_util::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    errors::Error,
    minikit::MiniKit,
    types::{
        AnyJson, CommandError, CommandResponse, SendTransactionInput, SignMessageInput,
        SignTypedDataInput, Transaction, WORLD_CHAIN_ID, WalletAuthInput,
    },
};

/// `eth_chainId` of World Chain.
pub const CHAIN_ID_HEX: &str = "0x1e0";

const NONCE_LENGTH: usize = 16;

/// EIP-1193 provider error codes.
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        ProviderRpcError {
            code,
            message: message.into(),
        }
    }

    fn invalid_params(method: &str) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Invalid params for {method}"))
    }

    /// Map a command error reported by the host.
    fn from_command_error(error: &CommandError) -> Self {
        match error.error_code.as_str() {
            "user_rejected" | "verification_rejected" => {
                Self::new(codes::USER_REJECTED, "User rejected the request")
            }
            code => Self::new(codes::INTERNAL_ERROR, code),
        }
    }
}

impl From<Error> for ProviderRpcError {
    fn from(err: Error) -> Self {
        match err {
            Error::CommandUnavailable { .. } | Error::FallbackRequired(_) => {
                Self::new(codes::DISCONNECTED, err.to_string())
            }
            Error::InvalidInput { .. } => Self::new(codes::INVALID_PARAMS, err.to_string()),
            _ => Self::new(codes::INTERNAL_ERROR, err.to_string()),
        }
    }
}

/// Arguments of [`WorldAppProvider::request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestArguments {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<AnyJson>,
}

impl RequestArguments {
    pub fn new(method: impl Into<String>) -> Self {
        RequestArguments {
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(method: impl Into<String>, params: AnyJson) -> Self {
        RequestArguments {
            method: method.into(),
            params: Some(params),
        }
    }

    fn param(&self, index: usize) -> Option<&AnyJson> {
        self.params.as_ref()?.as_array()?.get(index)
    }

    fn str_param(&self, index: usize) -> Result<&str, ProviderRpcError> {
        self.param(index)
            .and_then(AnyJson::as_str)
            .ok_or_else(|| ProviderRpcError::invalid_params(&self.method))
    }
}

/// Provider events listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEvent {
    Connect,
    Disconnect,
    AccountsChanged,
    ChainChanged,
}

impl ProviderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::Connect => "connect",
            ProviderEvent::Disconnect => "disconnect",
            ProviderEvent::AccountsChanged => "accountsChanged",
            ProviderEvent::ChainChanged => "chainChanged",
        }
    }
}

impl FromStr for ProviderEvent {
    type Err = crate::types::UnknownIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ProviderEvent::Connect,
            ProviderEvent::Disconnect,
            ProviderEvent::AccountsChanged,
            ProviderEvent::ChainChanged,
        ]
        .into_iter()
        .find(|e| e.name() == s)
        .ok_or_else(|| crate::types::UnknownIdentifier(s.to_string()))
    }
}

pub type ProviderListener = Arc<dyn Fn(&AnyJson) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type AuthFuture = Shared<BoxFuture<'static, Result<Address, ProviderRpcError>>>;

struct ProviderInner {
    minikit: MiniKit,
    account: RwLock<Option<Address>>,
    listeners: Mutex<HashMap<ProviderEvent, Vec<(ListenerId, ProviderListener)>>>,
    next_listener: AtomicU64,
    authentication: Mutex<Option<AuthFuture>>,
}

/// EIP-1193 provider session. Clones share the cached account and listeners.
#[derive(Clone)]
pub struct WorldAppProvider {
    inner: Arc<ProviderInner>,
}

impl std::fmt::Debug for WorldAppProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldAppProvider")
            .field("account", &self.account())
            .finish_non_exhaustive()
    }
}

fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// `personal_sign` messages arrive hex-encoded; sign the text when it is valid UTF-8.
fn decode_message(message: &str) -> String {
    message
        .strip_prefix("0x")
        .and_then(|hex_str| hex::decode(hex_str).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}

impl WorldAppProvider {
    pub fn new(minikit: MiniKit) -> Self {
        WorldAppProvider {
            inner: Arc::new(ProviderInner {
                minikit,
                account: RwLock::new(None),
                listeners: Mutex::new(HashMap::new()),
                next_listener: AtomicU64::new(0),
                authentication: Mutex::new(None),
            }),
        }
    }

    /// The cached account, if a previous `eth_requestAccounts` succeeded.
    pub fn account(&self) -> Option<Address> {
        *self
            .inner
            .account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on<F>(&self, event: ProviderEvent, listener: F) -> ListenerId
    where
        F: Fn(&AnyJson) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, event: ProviderEvent, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(list) = listeners.get_mut(&event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        before != list.len()
    }

    fn emit(&self, event: ProviderEvent, value: &AnyJson) {
        let listeners: Vec<ProviderListener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(value);
        }
    }

    /// Handle one EIP-1193 request.
    pub async fn request(&self, args: RequestArguments) -> Result<AnyJson, ProviderRpcError> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Provider request '{}'", args.method);

        match args.method.as_str() {
            "eth_requestAccounts" => {
                let address = self.request_accounts().await?;
                Ok(json!([address.to_checksum(None)]))
            }
            "eth_accounts" => Ok(json!(
                self.account()
                    .map(|a| vec![a.to_checksum(None)])
                    .unwrap_or_default()
            )),
            "eth_chainId" => Ok(json!(CHAIN_ID_HEX)),
            "personal_sign" => self.sign_message(args.str_param(0)?).await,
            "eth_sign" => self.sign_message(args.str_param(1)?).await,
            "eth_signTypedData" | "eth_signTypedData_v3" | "eth_signTypedData_v4" => {
                let typed_data = match args.param(1) {
                    Some(AnyJson::String(s)) => serde_json::from_str(s)
                        .map_err(|_| ProviderRpcError::invalid_params(&args.method))?,
                    Some(value) => value.clone(),
                    None => return Err(ProviderRpcError::invalid_params(&args.method)),
                };
                self.sign_typed_data(&args.method, typed_data).await
            }
            "eth_sendTransaction" => {
                let tx = args
                    .param(0)
                    .ok_or_else(|| ProviderRpcError::invalid_params(&args.method))?;
                self.send_transaction(&args.method, tx).await
            }
            "wallet_switchEthereumChain" => {
                let chain_id = args
                    .param(0)
                    .and_then(|p| p.get("chainId"))
                    .and_then(AnyJson::as_str)
                    .and_then(|id| u64::from_str_radix(id.trim_start_matches("0x"), 16).ok());
                if chain_id == Some(WORLD_CHAIN_ID) {
                    Ok(AnyJson::Null)
                } else {
                    Err(ProviderRpcError::new(
                        codes::UNRECOGNIZED_CHAIN,
                        "Only World Chain is supported",
                    ))
                }
            }
            "wallet_addEthereumChain" => Err(ProviderRpcError::new(
                codes::UNSUPPORTED_METHOD,
                "Adding chains is not supported",
            )),
            method => Err(ProviderRpcError::new(
                codes::UNSUPPORTED_METHOD,
                format!("Method {method} is not supported"),
            )),
        }
    }

    /// Return the cached account, or run (or join) the single in-flight wallet auth.
    async fn request_accounts(&self) -> Result<Address, ProviderRpcError> {
        if let Some(address) = self.account() {
            return Ok(address);
        }

        let authentication = {
            let mut slot = self
                .inner
                .authentication
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let provider = self.clone();
                    let pending = async move {
                        let result = provider.authenticate().await;
                        *provider
                            .inner
                            .authentication
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner) = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        authentication.await
    }

    async fn authenticate(&self) -> Result<Address, ProviderRpcError> {
        let input = WalletAuthInput::builder().nonce(generate_nonce()).build();
        let result = self.inner.minikit.wallet_auth(input, None).await?;

        let success = match result.data {
            CommandResponse::Success(success) => success,
            CommandResponse::Error(error) => {
                return Err(ProviderRpcError::from_command_error(&error));
            }
        };
        let address: Address = success.address.parse().map_err(|_| {
            ProviderRpcError::new(codes::INTERNAL_ERROR, "Invalid address returned")
        })?;

        *self
            .inner
            .account
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(address);

        self.emit(
            ProviderEvent::AccountsChanged,
            &json!([address.to_checksum(None)]),
        );
        self.emit(ProviderEvent::Connect, &json!({ "chainId": CHAIN_ID_HEX }));
        Ok(address)
    }

    async fn sign_message(&self, message: &str) -> Result<AnyJson, ProviderRpcError> {
        let result = self
            .inner
            .minikit
            .sign_message(SignMessageInput::new(decode_message(message)), None)
            .await?;
        match result.data {
            CommandResponse::Success(success) => Ok(json!(success.signature)),
            CommandResponse::Error(error) => Err(ProviderRpcError::from_command_error(&error)),
        }
    }

    async fn sign_typed_data(
        &self,
        method: &str,
        typed_data: AnyJson,
    ) -> Result<AnyJson, ProviderRpcError> {
        let field = |name: &str| typed_data.get(name).cloned();
        let input = SignTypedDataInput {
            types: field("types").ok_or_else(|| ProviderRpcError::invalid_params(method))?,
            primary_type: field("primaryType")
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| ProviderRpcError::invalid_params(method))?,
            message: field("message").ok_or_else(|| ProviderRpcError::invalid_params(method))?,
            domain: field("domain"),
            chain_id: Some(WORLD_CHAIN_ID),
        };

        let result = self.inner.minikit.sign_typed_data(input, None).await?;
        match result.data {
            CommandResponse::Success(success) => Ok(json!(success.signature)),
            CommandResponse::Error(error) => Err(ProviderRpcError::from_command_error(&error)),
        }
    }

    async fn send_transaction(
        &self,
        method: &str,
        tx: &AnyJson,
    ) -> Result<AnyJson, ProviderRpcError> {
        let str_field = |name: &str| tx.get(name).and_then(AnyJson::as_str).map(str::to_string);
        let transaction = Transaction {
            address: str_field("to").ok_or_else(|| ProviderRpcError::invalid_params(method))?,
            abi: None,
            function_name: None,
            args: None,
            data: str_field("data"),
            value: str_field("value"),
        };

        let result = self
            .inner
            .minikit
            .send_transaction(
                SendTransactionInput {
                    transaction: vec![transaction],
                    permit2: None,
                },
                None,
            )
            .await?;
        match result.data {
            CommandResponse::Success(success) => Ok(json!(success.transaction_id)),
            CommandResponse::Error(error) => Err(ProviderRpcError::from_command_error(&error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::config::MiniKitConfig;

    fn provider() -> WorldAppProvider {
        MiniKit::new(
            MiniKitConfig::builder()
                .app_url(Url::parse("https://example.com").unwrap())
                .build(),
        )
        .provider()
    }

    #[tokio::test]
    async fn test_static_methods() {
        let provider = provider();

        assert_eq!(
            provider
                .request(RequestArguments::new("eth_chainId"))
                .await
                .unwrap(),
            json!("0x1e0")
        );
        assert_eq!(
            provider
                .request(RequestArguments::new("eth_accounts"))
                .await
                .unwrap(),
            json!([])
        );
    }

    #[tokio::test]
    async fn test_unsupported_methods() {
        let provider = provider();

        let err = provider
            .request(RequestArguments::new("eth_getBalance"))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::UNSUPPORTED_METHOD);

        let err = provider
            .request(RequestArguments::with_params(
                "wallet_addEthereumChain",
                json!([{ "chainId": "0x1" }]),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::UNSUPPORTED_METHOD);
    }

    #[tokio::test]
    async fn test_switch_chain() {
        let provider = provider();

        let ok = provider
            .request(RequestArguments::with_params(
                "wallet_switchEthereumChain",
                json!([{ "chainId": "0x1e0" }]),
            ))
            .await;
        assert_eq!(ok, Ok(AnyJson::Null));

        let err = provider
            .request(RequestArguments::with_params(
                "wallet_switchEthereumChain",
                json!([{ "chainId": "0x1" }]),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::UNRECOGNIZED_CHAIN);
    }

    #[tokio::test]
    async fn test_no_wallet_is_disconnected() {
        let err = provider()
            .request(RequestArguments::new("eth_requestAccounts"))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::DISCONNECTED);

        let err = provider()
            .request(RequestArguments::new("personal_sign"))
            .await
            .unwrap_err();
        assert_eq!(err.code, codes::INVALID_PARAMS);
    }

    #[test]
    fn test_decode_message() {
        assert_eq!(decode_message("0x68656c6c6f"), "hello");
        assert_eq!(decode_message("hello"), "hello");
        assert_eq!(decode_message("0xff"), "0xff");
    }

    #[test]
    fn test_listeners() {
        let provider = provider();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let id = provider.on(ProviderEvent::AccountsChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        provider.emit(ProviderEvent::AccountsChanged, &json!([]));
        assert!(provider.remove_listener(ProviderEvent::AccountsChanged, id));
        assert!(!provider.remove_listener(ProviderEvent::AccountsChanged, id));
        provider.emit(ProviderEvent::AccountsChanged, &json!([]));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            "accountsChanged".parse::<ProviderEvent>().unwrap(),
            ProviderEvent::AccountsChanged
        );
    }

    #[test]
    fn test_nonce_shape() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_LENGTH);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
