use std::sync::Arc;

use bon::Builder;
use url::Url;

use crate::{
    concepts::{ProofCompressor, SecondaryWallet, UsernameResolver, WebviewChannel},
    proof::Groth16Compressor,
    types::WorldAppInfo,
};

/// The host side of the bridge: the marker object World App injects, and the channel
/// commands are posted on.
#[derive(Builder, Clone)]
pub struct HostBridge {
    pub info: WorldAppInfo,
    pub channel: Arc<dyn WebviewChannel>,
}

impl std::fmt::Debug for HostBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBridge")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Configuration of a [`MiniKit`](crate::MiniKit) instance.
///
/// Leave `host` unset when running outside World App; commands then go through the
/// secondary wallet or the caller's fallback.
#[derive(Builder, Clone)]
pub struct MiniKitConfig {
    pub host: Option<HostBridge>,
    /// URL of the mini app. Supplies the SIWE scheme, domain and URI.
    pub app_url: Url,
    pub secondary_wallet: Option<Arc<dyn SecondaryWallet>>,
    /// Profile lookup after a successful wallet auth. No lookup is made when unset.
    pub username_resolver: Option<Arc<dyn UsernameResolver>>,
    #[builder(default = Arc::new(Groth16Compressor))]
    pub proof_compressor: Arc<dyn ProofCompressor>,
}

impl std::fmt::Debug for MiniKitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniKitConfig")
            .field("host", &self.host)
            .field("app_url", &self.app_url.as_str())
            .field("secondary_wallet", &self.secondary_wallet.is_some())
            .field("username_resolver", &self.username_resolver.is_some())
            .finish_non_exhaustive()
    }
}
