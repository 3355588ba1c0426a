//! The MiniKit context: install, dispatch, correlation and fallbacks behind one handle.

use std::sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use alloy_primitives::Address;
use chrono::Utc;
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::json;
use url::Url;

use crate::{
    capabilities::CapabilityRegistry,
    concepts::{SecondaryWallet, UsernameResolver},
    config::{HostBridge, MiniKitConfig},
    correlator::{ResponseCorrelator, SingleFlight},
    errors::{Error, InstallErrorCode, InstallResult, Result, UnavailableReason},
    events::{EventManager, SubscriptionToken},
    fallback::{CommandPlan, CommandResult, Fallback, FallbackEngine},
    provider::WorldAppProvider,
    siwe::SiweMessage,
    types::*,
};

/// Host builds above this version accept wallet auth v2.
const WALLET_AUTH_V2_MIN_APP_VERSION: u64 = 2087900;

/// Handle to one MiniKit context. Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct MiniKit {
    inner: Arc<Inner>,
}

struct Inner {
    host: Option<HostBridge>,
    app_url: Url,
    registry: CapabilityRegistry,
    events: EventManager,
    state: RwLock<MiniKitState>,
    installed: AtomicBool,
    secondary: RwLock<Option<Arc<dyn SecondaryWallet>>>,
    usernames: Option<Arc<dyn UsernameResolver>>,
    verify_flight: SingleFlight,
}

impl std::fmt::Debug for MiniKit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniKit")
            .field("in_host", &self.is_in_host())
            .field("installed", &self.is_installed())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl MiniKit {
    pub fn new(config: MiniKitConfig) -> Self {
        MiniKit {
            inner: Arc::new(Inner {
                host: config.host,
                app_url: config.app_url,
                registry: CapabilityRegistry::new(),
                events: EventManager::new(config.proof_compressor),
                state: RwLock::new(MiniKitState::default()),
                installed: AtomicBool::new(false),
                secondary: RwLock::new(config.secondary_wallet),
                usernames: config.username_resolver,
                verify_flight: SingleFlight::new(),
            }),
        }
    }

    /// Negotiate capabilities with the host and initialize the state.
    ///
    /// An `app_out_of_date` result still leaves the SDK usable; unsupported commands are
    /// gated individually.
    pub fn install(&self, app_id: impl Into<String>) -> InstallResult {
        let Some(host) = &self.inner.host else {
            #[cfg(feature = "tracing")]
            tracing::error!("{}", InstallErrorCode::OutsideOfWorldapp.message());
            return InstallResult::failed(InstallErrorCode::OutsideOfWorldapp);
        };

        if self.inner.installed.swap(true, Ordering::AcqRel) {
            return InstallResult::failed(InstallErrorCode::AlreadyInstalled);
        }

        {
            let mut state = self.write_state();
            state.app_id = Some(app_id.into());
            state.device_properties = DeviceProperties {
                safe_area_insets: host.info.safe_area_insets,
                device_os: Some(host.info.device_os.clone()),
                world_app_version: Some(host.info.world_app_version),
            };
            state.location = host
                .info
                .location
                .as_ref()
                .and_then(|l| MiniAppLaunchLocation::from_open_origin(&l.open_origin));
        }

        let all_valid = self.inner.registry.negotiate(&host.info.supported_commands);
        self.write_state().is_ready = true;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            world_app_version = host.info.world_app_version,
            device_os = %host.info.device_os,
            all_valid,
            "MiniKit installed"
        );

        if all_valid {
            InstallResult::success()
        } else {
            InstallResult::failed(InstallErrorCode::AppOutOfDate)
        }
    }

    /// Reset the state and capability table, then install again.
    pub fn reinstall(&self, app_id: impl Into<String>) -> InstallResult {
        self.inner.registry.clear();
        *self.write_state() = MiniKitState::default();
        self.inner.installed.store(false, Ordering::Release);
        self.install(app_id)
    }

    pub fn is_installed(&self) -> bool {
        self.inner.host.is_some() && self.inner.installed.load(Ordering::Acquire)
    }

    pub fn is_in_host(&self) -> bool {
        self.inner.host.is_some()
    }

    pub fn state(&self) -> MiniKitState {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, MiniKitState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_command_available(&self, command: Command) -> bool {
        self.inner.registry.is_available(command)
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.inner.registry
    }

    /// Replace the secondary wallet used outside World App.
    pub fn set_secondary_wallet(&self, wallet: Option<Arc<dyn SecondaryWallet>>) {
        *self
            .inner
            .secondary
            .write()
            .unwrap_or_else(PoisonError::into_inner) = wallet;
    }

    /// The secondary wallet, if one is configured and `command` can be served by it.
    fn secondary_wallet(&self, command: Command) -> Option<Arc<dyn SecondaryWallet>> {
        if !command.has_secondary_path() {
            return None;
        }
        self.inner
            .secondary
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn subscribe<F>(&self, event: ResponseEvent, handler: F) -> SubscriptionToken
    where
        F: Fn(ResponsePayload) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(event, handler)
    }

    pub fn unsubscribe(&self, event: ResponseEvent) {
        self.inner.events.unsubscribe(event)
    }

    /// Deliver a host response. Returns `false` if nobody was subscribed.
    pub fn trigger(&self, payload: ResponsePayload) -> bool {
        if let ResponsePayload::WalletAuth(CommandResponse::Success(success)) = &payload {
            self.write_state().user.wallet_address = Some(success.address.clone());
        }
        self.inner.events.trigger(payload)
    }

    /// Validate and deliver a raw host callback.
    pub fn trigger_raw(&self, event: &str, payload: AnyJson) -> Result<bool> {
        let event: ResponseEvent = event.parse().inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::error!("Rejected host callback: {}", _e);
        })?;
        let payload = ResponsePayload::from_value(event, payload).inspect_err(|_e| {
            #[cfg(feature = "tracing")]
            tracing::error!("Rejected '{}' payload: {}", event, _e);
        })?;
        Ok(self.trigger(payload))
    }

    pub fn trigger_message(&self, message: InboundMessage) -> Result<bool> {
        self.trigger_raw(&message.event, message.payload)
    }

    /// Version the command is sent with on this host.
    fn outbound_version(&self, command: Command) -> u32 {
        match (command, &self.inner.host) {
            (Command::WalletAuth, Some(host))
                if host.info.world_app_version > WALLET_AUTH_V2_MIN_APP_VERSION =>
            {
                2
            }
            (Command::WalletAuth, _) => 1,
            _ => command.version(),
        }
    }

    fn post<P: Serialize>(&self, command: Command, payload: &P) -> Result<AnyJson> {
        let Some(host) = &self.inner.host else {
            return Err(Error::CommandUnavailable {
                command,
                reason: UnavailableReason::NotInWorldApp,
            });
        };

        let payload = serde_json::to_value(payload)?;
        let message = OutboundMessage {
            command,
            version: self.outbound_version(command),
            payload,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Posting '{}' v{}", command, message.version);

        host.channel.post_message(&message);
        Ok(message.payload)
    }

    /// Dispatch `command` without waiting for a reply.
    ///
    /// Returns the payload that was sent, or `None` if the command is unavailable.
    pub fn send(&self, command: Command, payload: AnyJson) -> Option<AnyJson> {
        if !self.is_in_host() || !self.is_command_available(command) {
            #[cfg(feature = "tracing")]
            tracing::error!(
                "Command '{}' is unavailable: {}",
                command,
                self.inner
                    .registry
                    .unavailable_reason(command, self.is_in_host())
            );
            return None;
        }
        self.post(command, &payload).ok()
    }

    async fn native<P, F>(&self, command: Command, payload: P) -> Result<F>
    where
        P: Serialize + Send + Sync,
        F: EventPayload + Send,
    {
        let correlated = ResponseCorrelator::new(&self.inner.events)
            .await_command(|| self.post(command, &payload))
            .await?;
        Ok(correlated.final_payload)
    }

    fn engine(&self, secondary_configured: bool) -> FallbackEngine<'_> {
        FallbackEngine::new(
            &self.inner.registry,
            self.is_in_host(),
            secondary_configured,
        )
    }

    /// Run a command that only the host (or the caller's fallback) can serve.
    async fn host_only<P, F>(
        &self,
        command: Command,
        payload: P,
        fallback: Option<Fallback<'_, F>>,
    ) -> Result<CommandResult<F>>
    where
        P: Serialize + Send + Sync,
        F: EventPayload + Send,
    {
        self.engine(false)
            .execute(
                CommandPlan::builder()
                    .command(command)
                    .native(Box::pin(self.native::<P, F>(command, payload)))
                    .maybe_fallback(fallback)
                    .build(),
            )
            .await
    }

    /// Request a World ID proof. Only one verification may be pending at a time.
    pub async fn verify(
        &self,
        input: VerifyInput,
        fallback: Option<Fallback<'_, VerifyResponse>>,
    ) -> Result<CommandResult<VerifyResponse>> {
        let _flight = self
            .inner
            .verify_flight
            .try_acquire()
            .ok_or(Error::VerifyInFlight)?;

        let payload = VerifyCommandPayload {
            input,
            timestamp: iso_timestamp(Utc::now()),
        };
        self.host_only(Command::Verify, payload, fallback).await
    }

    pub async fn pay(
        &self,
        input: PayInput,
        fallback: Option<Fallback<'_, PayResponse>>,
    ) -> Result<CommandResult<PayResponse>> {
        input
            .validate()
            .map_err(|e| Error::invalid_input(Command::Pay, e))?;
        self.host_only(Command::Pay, input, fallback).await
    }

    fn siwe_message(&self, input: &WalletAuthInput, address: Option<Address>) -> SiweMessage {
        let url = &self.inner.app_url;
        let domain = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        SiweMessage {
            scheme: Some(url.scheme().to_string()),
            domain,
            address: address.map(|a| a.to_checksum(None)),
            statement: input.statement.clone(),
            uri: url.to_string(),
            version: "1".to_string(),
            chain_id: WORLD_CHAIN_ID,
            nonce: input.nonce.clone(),
            issued_at: iso_timestamp(Utc::now()),
            expiration_time: input.expiration_time.map(iso_timestamp),
            not_before: input.not_before.map(iso_timestamp),
            request_id: input.request_id.clone(),
        }
    }

    /// Sign in with the user's wallet.
    ///
    /// Inside World App the host signs the message; on the web the secondary wallet signs it
    /// with its own key and the result reports version 1.
    pub async fn wallet_auth(
        &self,
        input: WalletAuthInput,
        fallback: Option<Fallback<'_, WalletAuthResponse>>,
    ) -> Result<CommandResult<WalletAuthResponse>> {
        input
            .validate()
            .map_err(|e| Error::invalid_input(Command::WalletAuth, e))?;

        let payload = WalletAuthPayload {
            siwe_message: self.siwe_message(&input, None).to_string(),
        };

        let wallet = self.secondary_wallet(Command::WalletAuth);
        let secondary = wallet.clone().map(|wallet| {
            let input = input.clone();
            async move {
                let address = wallet.connect().await.map_err(Error::secondary)?;
                let message = self.siwe_message(&input, Some(address)).to_string();
                let signature = wallet
                    .sign_message(&message)
                    .await
                    .map_err(Error::secondary)?;
                Ok::<_, Error>(CommandResponse::Success(WalletAuthSuccess {
                    address: address.to_checksum(None),
                    message,
                    signature: signature.to_string(),
                    version: WalletAuthVersion::V1,
                }))
            }
            .boxed()
        });

        let result = self
            .engine(wallet.is_some())
            .execute(
                CommandPlan::builder()
                    .command(Command::WalletAuth)
                    .native(Box::pin(
                        self.native::<_, WalletAuthResponse>(Command::WalletAuth, payload),
                    ))
                    .maybe_secondary(secondary)
                    .maybe_fallback(fallback)
                    .build(),
            )
            .await?;

        if let CommandResponse::Success(success) = &result.data {
            self.record_user(&success.address).await;
        }
        Ok(result)
    }

    /// Store the signed-in address and look up its profile. Lookup failures are only logged.
    async fn record_user(&self, address: &str) {
        self.write_state().user.wallet_address = Some(address.to_string());

        let Some(usernames) = &self.inner.usernames else {
            return;
        };
        match usernames.resolve(address).await {
            Ok(profile) => {
                let mut state = self.write_state();
                state.user.username = profile.username;
                state.user.profile_picture_url = profile.profile_picture_url;
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to look up username for {}: {}", address, _err);
            }
        }
    }

    pub async fn send_transaction(
        &self,
        input: SendTransactionInput,
        fallback: Option<Fallback<'_, SendTransactionResponse>>,
    ) -> Result<CommandResult<SendTransactionResponse>> {
        if input.transaction.is_empty() {
            return Err(Error::invalid_input(
                Command::SendTransaction,
                "at least one transaction is required",
            ));
        }

        let wallet = self.secondary_wallet(Command::SendTransaction);
        let secondary = wallet.clone().map(|wallet| {
            let transactions = input.transaction.clone();
            async move {
                let from = wallet.connect().await.map_err(Error::secondary)?;
                let transaction_id = wallet
                    .send_transaction(&transactions)
                    .await
                    .map_err(Error::secondary)?;
                Ok::<_, Error>(CommandResponse::Success(SendTransactionSuccess {
                    transaction_status: "submitted".to_string(),
                    transaction_id,
                    reference: None,
                    from: from.to_checksum(None),
                    chain: "worldchain".to_string(),
                    timestamp: iso_timestamp(Utc::now()),
                    version: Command::SendTransaction.version(),
                }))
            }
            .boxed()
        });

        self.engine(wallet.is_some())
            .execute(
                CommandPlan::builder()
                    .command(Command::SendTransaction)
                    .native(Box::pin(
                        self.native::<_, SendTransactionResponse>(Command::SendTransaction, input),
                    ))
                    .maybe_secondary(secondary)
                    .maybe_fallback(fallback)
                    .build(),
            )
            .await
    }

    pub async fn sign_message(
        &self,
        input: SignMessageInput,
        fallback: Option<Fallback<'_, SignMessageResponse>>,
    ) -> Result<CommandResult<SignMessageResponse>> {
        if input.message.is_empty() {
            return Err(Error::invalid_input(
                Command::SignMessage,
                "'message' must not be empty",
            ));
        }

        let wallet = self.secondary_wallet(Command::SignMessage);
        let secondary = wallet.clone().map(|wallet| {
            let message = input.message.clone();
            async move {
                let address = wallet.connect().await.map_err(Error::secondary)?;
                let signature = wallet
                    .sign_message(&message)
                    .await
                    .map_err(Error::secondary)?;
                Ok::<_, Error>(CommandResponse::Success(SignMessageSuccess {
                    signature: signature.to_string(),
                    address: address.to_checksum(None),
                    version: Command::SignMessage.version(),
                }))
            }
            .boxed()
        });

        self.engine(wallet.is_some())
            .execute(
                CommandPlan::builder()
                    .command(Command::SignMessage)
                    .native(Box::pin(
                        self.native::<_, SignMessageResponse>(Command::SignMessage, input),
                    ))
                    .maybe_secondary(secondary)
                    .maybe_fallback(fallback)
                    .build(),
            )
            .await
    }

    pub async fn sign_typed_data(
        &self,
        input: SignTypedDataInput,
        fallback: Option<Fallback<'_, SignTypedDataResponse>>,
    ) -> Result<CommandResult<SignTypedDataResponse>> {
        let wallet = self.secondary_wallet(Command::SignTypedData);
        let typed_data = serde_json::to_value(&input)?;
        let secondary = wallet.clone().map(|wallet| {
            async move {
                let address = wallet.connect().await.map_err(Error::secondary)?;
                let signature = wallet
                    .sign_typed_data(&typed_data)
                    .await
                    .map_err(Error::secondary)?;
                Ok::<_, Error>(CommandResponse::Success(SignTypedDataSuccess {
                    signature: signature.to_string(),
                    address: address.to_checksum(None),
                    version: Command::SignTypedData.version(),
                }))
            }
            .boxed()
        });

        self.engine(wallet.is_some())
            .execute(
                CommandPlan::builder()
                    .command(Command::SignTypedData)
                    .native(Box::pin(
                        self.native::<_, SignTypedDataResponse>(Command::SignTypedData, input),
                    ))
                    .maybe_secondary(secondary)
                    .maybe_fallback(fallback)
                    .build(),
            )
            .await
    }

    pub async fn share_contacts(
        &self,
        input: ShareContactsInput,
        fallback: Option<Fallback<'_, ShareContactsResponse>>,
    ) -> Result<CommandResult<ShareContactsResponse>> {
        self.host_only(Command::ShareContacts, input, fallback).await
    }

    pub async fn request_permission(
        &self,
        input: RequestPermissionInput,
        fallback: Option<Fallback<'_, RequestPermissionResponse>>,
    ) -> Result<CommandResult<RequestPermissionResponse>> {
        self.host_only(Command::RequestPermission, input, fallback)
            .await
    }

    pub async fn get_permissions(
        &self,
        fallback: Option<Fallback<'_, GetPermissionsResponse>>,
    ) -> Result<CommandResult<GetPermissionsResponse>> {
        self.host_only(Command::GetPermissions, GetPermissionsInput {}, fallback)
            .await
    }

    pub async fn send_haptic_feedback(
        &self,
        input: HapticFeedback,
        fallback: Option<Fallback<'_, HapticFeedbackResponse>>,
    ) -> Result<CommandResult<HapticFeedbackResponse>> {
        self.host_only(Command::SendHapticFeedback, input, fallback)
            .await
    }

    pub async fn share(
        &self,
        input: ShareInput,
        fallback: Option<Fallback<'_, ShareResponse>>,
    ) -> Result<CommandResult<ShareResponse>> {
        self.host_only(Command::Share, input, fallback).await
    }

    pub async fn chat(
        &self,
        input: ChatInput,
        fallback: Option<Fallback<'_, ChatResponse>>,
    ) -> Result<CommandResult<ChatResponse>> {
        if input.message.is_empty() {
            return Err(Error::invalid_input(
                Command::Chat,
                "'message' must not be empty",
            ));
        }
        self.host_only(Command::Chat, input, fallback).await
    }

    /// Ask the host to close the mini app. Nothing is sent back.
    pub fn close_mini_app(&self) -> bool {
        self.send(Command::CloseMiniApp, json!({})).is_some()
    }

    /// An EIP-1193 style provider backed by this context.
    pub fn provider(&self) -> WorldAppProvider {
        WorldAppProvider::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy_primitives::Bytes;
    use futures_util::future::BoxFuture;

    use super::*;
    use crate::{concepts::WebviewChannel, errors::BoxError};

    type WalletResult<T> = std::result::Result<T, BoxError>;

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    impl WebviewChannel for RecordingChannel {
        fn post_message(&self, message: &OutboundMessage) {
            self.sent.lock().unwrap().push(message.clone());
        }
    }

    fn host_info(world_app_version: u64) -> WorldAppInfo {
        WorldAppInfo {
            world_app_version,
            device_os: "ios".to_string(),
            is_optional_analytics: false,
            supported_commands: Command::ALL
                .iter()
                .map(|c| SupportedCommand {
                    name: c.name().to_string(),
                    supported_versions: vec![c.version()],
                })
                .collect(),
            safe_area_insets: None,
            location: Some(HostLaunchLocation {
                open_origin: "chat".to_string(),
            }),
        }
    }

    fn in_host(world_app_version: u64) -> (MiniKit, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        let minikit = MiniKit::new(
            MiniKitConfig::builder()
                .host(HostBridge {
                    info: host_info(world_app_version),
                    channel: channel.clone(),
                })
                .app_url(Url::parse("https://example.com:3000/app").unwrap())
                .build(),
        );
        (minikit, channel)
    }

    #[test]
    fn test_install() {
        let (minikit, _) = in_host(2087901);
        assert_eq!(minikit.install("app_123"), InstallResult::success());
        assert!(minikit.is_installed());

        let state = minikit.state();
        assert_eq!(state.app_id.as_deref(), Some("app_123"));
        assert_eq!(state.location, Some(MiniAppLaunchLocation::Chat));
        assert_eq!(state.device_properties.device_os.as_deref(), Some("ios"));
        assert!(state.is_ready);

        assert_eq!(
            minikit.install("app_123").error_code,
            Some(InstallErrorCode::AlreadyInstalled)
        );
        assert!(minikit.reinstall("app_456").success);
        assert_eq!(minikit.state().app_id.as_deref(), Some("app_456"));
    }

    struct UnusedWallet;

    impl SecondaryWallet for UnusedWallet {
        fn connect(&self) -> BoxFuture<'_, WalletResult<Address>> {
            Box::pin(async { Err("not connected".into()) })
        }

        fn sign_message<'a>(
            &'a self,
            _message: &'a str,
        ) -> BoxFuture<'a, WalletResult<Bytes>> {
            Box::pin(async { Err("not connected".into()) })
        }

        fn sign_typed_data<'a>(
            &'a self,
            _typed_data: &'a AnyJson,
        ) -> BoxFuture<'a, WalletResult<Bytes>> {
            Box::pin(async { Err("not connected".into()) })
        }

        fn send_transaction<'a>(
            &'a self,
            _transactions: &'a [Transaction],
        ) -> BoxFuture<'a, WalletResult<String>> {
            Box::pin(async { Err("not connected".into()) })
        }
    }

    #[test]
    fn test_secondary_wallet_only_for_wallet_commands() {
        let (minikit, _) = in_host(2087901);
        minikit.set_secondary_wallet(Some(Arc::new(UnusedWallet)));

        for command in Command::ALL {
            assert_eq!(
                minikit.secondary_wallet(command).is_some(),
                command.has_secondary_path(),
                "{command}"
            );
        }
        assert!(minikit.secondary_wallet(Command::Pay).is_none());
        assert!(minikit.secondary_wallet(Command::SignMessage).is_some());
    }

    #[test]
    fn test_install_outside_host() {
        let minikit = MiniKit::new(
            MiniKitConfig::builder()
                .app_url(Url::parse("https://example.com").unwrap())
                .build(),
        );
        let result = minikit.install("app_123");
        assert_eq!(result.error_code, Some(InstallErrorCode::OutsideOfWorldapp));
        assert!(!minikit.is_installed());
        assert!(!minikit.close_mini_app());
    }

    #[test]
    fn test_wallet_auth_outbound_version() {
        let (new_app, _) = in_host(2087901);
        let (old_app, _) = in_host(2087900);
        assert_eq!(new_app.outbound_version(Command::WalletAuth), 2);
        assert_eq!(old_app.outbound_version(Command::WalletAuth), 1);
        assert_eq!(old_app.outbound_version(Command::Pay), 1);
    }

    #[test]
    fn test_siwe_message_from_app_url() {
        let (minikit, _) = in_host(2087901);
        let input = WalletAuthInput::builder()
            .nonce("abcdef12")
            .statement("Sign in")
            .build();

        let message = minikit.siwe_message(&input, None);
        assert_eq!(message.scheme.as_deref(), Some("https"));
        assert_eq!(message.domain, "example.com:3000");
        assert_eq!(message.uri, "https://example.com:3000/app");
        assert_eq!(message.chain_id, 480);
        assert!(message.to_string().contains("\n{address}\n"));
    }

    #[test]
    fn test_send_and_close() {
        let (minikit, channel) = in_host(2087901);
        assert!(!minikit.close_mini_app(), "nothing is available before install");

        minikit.install("app_123");
        assert!(minikit.close_mini_app());

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].command, Command::CloseMiniApp);
        assert_eq!(sent[0].version, 1);
    }

    #[test]
    fn test_trigger_raw_validates() {
        let (minikit, _) = in_host(2087901);
        minikit.subscribe(ResponseEvent::MiniAppWalletAuth, |_| {});

        assert!(matches!(
            minikit.trigger_raw("miniapp-unknown", json!({})),
            Err(Error::UnknownEvent(_))
        ));
        assert!(matches!(
            minikit.trigger_raw("miniapp-wallet-auth", json!({ "status": "success" })),
            Err(Error::SerdeJsonError(_))
        ));

        let delivered = minikit
            .trigger_message(InboundMessage {
                event: "miniapp-wallet-auth".to_string(),
                payload: json!({
                    "status": "success",
                    "address": "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20",
                    "message": "hello",
                    "signature": "0x00",
                    "version": 2
                }),
            })
            .unwrap();
        assert!(delivered);
        assert_eq!(
            minikit.state().user.wallet_address.as_deref(),
            Some("0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20")
        );
    }

    #[tokio::test]
    async fn test_invalid_input_sends_nothing() {
        let (minikit, channel) = in_host(2087901);
        minikit.install("app_123");

        let err = minikit
            .wallet_auth(WalletAuthInput::builder().nonce("ab12").build(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 8 characters"));

        let err = minikit
            .sign_message(SignMessageInput::new(""), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput { command: Command::SignMessage, .. }));

        assert!(channel.sent.lock().unwrap().is_empty());
    }
}
