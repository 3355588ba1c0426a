//! Traits at the boundary between the SDK and its external collaborators.
//!
//! The host transport, the secondary wallet library, the username service, the proof
//! compressor and the chain reader are all supplied by the embedding application. The SDK
//! only ever talks to them through these traits.

use alloy_primitives::{Address, Bytes};
use futures_util::future::BoxFuture;

use crate::{
    errors::BoxError,
    proof::ProofError,
    types::{AnyJson, OutboundMessage, Transaction, UserProfile},
};

/// One-way message channel from the SDK to the host webview.
///
/// Implementations forward the message to the native side (e.g. a `postMessage` handler)
/// and return immediately. Nothing is read back: responses arrive later through
/// [`MiniKit::trigger`](crate::MiniKit::trigger).
pub trait WebviewChannel: Send + Sync {
    fn post_message(&self, message: &OutboundMessage);
}

/// A wallet-connection library used as the secondary tier when no host is present.
pub trait SecondaryWallet: Send + Sync {
    /// Connect (or reuse the connection) and return the active account.
    fn connect(&self) -> BoxFuture<'_, Result<Address, BoxError>>;

    /// Sign `message` with an EIP-191 personal signature.
    fn sign_message<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<Bytes, BoxError>>;

    /// Sign an EIP-712 typed data document.
    fn sign_typed_data<'a>(
        &'a self,
        typed_data: &'a AnyJson,
    ) -> BoxFuture<'a, Result<Bytes, BoxError>>;

    /// Submit the transactions and return the resulting transaction hash.
    fn send_transaction<'a>(
        &'a self,
        transactions: &'a [Transaction],
    ) -> BoxFuture<'a, Result<String, BoxError>>;
}

/// Looks up the public profile behind a wallet address.
pub trait UsernameResolver: Send + Sync {
    fn resolve<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<UserProfile, BoxError>>;
}

/// Post-processes a zero-knowledge proof before it reaches the application.
pub trait ProofCompressor: Send + Sync {
    /// Compress an ABI-encoded proof and pad it back to its original width.
    fn compress_and_pad(&self, proof: &str) -> Result<String, ProofError>;
}

/// Read-only access to contract state, used by SIWE verification.
pub trait ContractReader {
    type Error: std::error::Error;

    /// Perform an `eth_call` against `to` with `data` and return the raw return data.
    fn call(&self, to: Address, data: Bytes) -> impl Future<Output = Result<Bytes, Self::Error>>;
}
