#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use alloy::signers::{SignerSync, local::PrivateKeySigner};
use alloy_primitives::{Address, Bytes};
use futures_util::{FutureExt, future::BoxFuture};
use minikit::{
    MiniKit,
    concepts::{SecondaryWallet, WebviewChannel},
    config::{HostBridge, MiniKitConfig},
    errors::BoxError,
    types::{
        AnyJson, Command, HostLaunchLocation, OutboundMessage, SupportedCommand, Transaction,
        WorldAppInfo,
    },
};
use url::Url;

pub type Responder = Box<dyn Fn(&OutboundMessage) -> Option<(String, AnyJson)> + Send + Sync>;

/// A host that records every message and may answer synchronously, as World App can.
pub struct ScriptedHost {
    pub sent: Mutex<Vec<OutboundMessage>>,
    minikit: Mutex<Option<MiniKit>>,
    responder: Responder,
}

impl ScriptedHost {
    pub fn silent() -> Self {
        Self::replying(|_| None)
    }

    pub fn replying<F>(responder: F) -> Self
    where
        F: Fn(&OutboundMessage) -> Option<(String, AnyJson)> + Send + Sync + 'static,
    {
        ScriptedHost {
            sent: Mutex::new(Vec::new()),
            minikit: Mutex::new(None),
            responder: Box::new(responder),
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl WebviewChannel for ScriptedHost {
    fn post_message(&self, message: &OutboundMessage) {
        self.sent.lock().unwrap().push(message.clone());

        let Some((event, payload)) = (self.responder)(message) else {
            return;
        };
        let minikit = self.minikit.lock().unwrap().clone();
        if let Some(minikit) = minikit {
            minikit.trigger_raw(&event, payload).unwrap();
        }
    }
}

pub fn host_info(world_app_version: u64, commands: &[Command]) -> WorldAppInfo {
    WorldAppInfo {
        world_app_version,
        device_os: "android".to_string(),
        is_optional_analytics: false,
        supported_commands: commands
            .iter()
            .map(|c| SupportedCommand {
                name: c.name().to_string(),
                supported_versions: vec![c.version()],
            })
            .collect(),
        safe_area_insets: None,
        location: Some(HostLaunchLocation {
            open_origin: "deeplink".to_string(),
        }),
    }
}

pub fn app_url() -> Url {
    Url::parse("https://mini.example.com").unwrap()
}

/// An installed context inside World App that declares every command.
pub fn installed(host: ScriptedHost) -> (MiniKit, Arc<ScriptedHost>) {
    installed_with(host, &Command::ALL)
}

pub fn installed_with(host: ScriptedHost, commands: &[Command]) -> (MiniKit, Arc<ScriptedHost>) {
    let host = Arc::new(host);
    let minikit = MiniKit::new(
        MiniKitConfig::builder()
            .host(HostBridge {
                info: host_info(2087901, commands),
                channel: host.clone(),
            })
            .app_url(app_url())
            .build(),
    );
    *host.minikit.lock().unwrap() = Some(minikit.clone());
    minikit.install("app_test");
    (minikit, host)
}

/// A context running in a plain browser.
pub fn on_the_web(wallet: Option<Arc<dyn SecondaryWallet>>) -> MiniKit {
    MiniKit::new(
        MiniKitConfig::builder()
            .app_url(app_url())
            .maybe_secondary_wallet(wallet)
            .build(),
    )
}

/// Secondary wallet backed by a local key.
pub struct LocalWallet {
    pub signer: PrivateKeySigner,
    pub connects: AtomicUsize,
    pub sent: Mutex<Vec<Transaction>>,
}

impl LocalWallet {
    pub fn random() -> Self {
        LocalWallet {
            signer: PrivateKeySigner::random(),
            connects: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn sign(&self, message: &[u8]) -> Result<Bytes, BoxError> {
        let signature = self.signer.sign_message_sync(message)?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}

impl SecondaryWallet for LocalWallet {
    fn connect(&self) -> BoxFuture<'_, Result<Address, BoxError>> {
        async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            // Give concurrent callers a chance to pile up.
            tokio::task::yield_now().await;
            Ok(self.address())
        }
        .boxed()
    }

    fn sign_message<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<Bytes, BoxError>> {
        async move { self.sign(message.as_bytes()) }.boxed()
    }

    fn sign_typed_data<'a>(
        &'a self,
        typed_data: &'a AnyJson,
    ) -> BoxFuture<'a, Result<Bytes, BoxError>> {
        async move { self.sign(typed_data.to_string().as_bytes()) }.boxed()
    }

    fn send_transaction<'a>(
        &'a self,
        transactions: &'a [Transaction],
    ) -> BoxFuture<'a, Result<String, BoxError>> {
        async move {
            self.sent.lock().unwrap().extend_from_slice(transactions);
            Ok(format!("0x{}", "ab".repeat(32)))
        }
        .boxed()
    }
}
