//! # MiniKit
//!
//! Bridge SDK for mini apps running inside a World App webview.
//!
//! Commands are posted to the host over a [`concepts::WebviewChannel`]; the host answers
//! asynchronously through named events which the SDK correlates back to the awaiting call.
//! Outside of World App, wallet commands can be served by a secondary wallet library and
//! every command accepts a caller-supplied fallback.
//!
//! ## Core Components Overview
//!
//! - **[`MiniKit`]**: The context handle. Install, dispatch commands, subscribe to events.
//! - **[`capabilities`]**: The table of commands the host declared at install time.
//! - **[`events`]**: Per-event subscriptions, including verify proof compression.
//! - **[`correlator`]**: Turns "post a command, wait for its event" into one future.
//! - **[`fallback`]**: Native, secondary and custom execution tiers.
//! - **[`siwe`]**: Sign-In with Ethereum messages and signature verification.
//! - **[`provider`]**: An EIP-1193 style provider for wallet libraries.
//! - **[`types`]**: Wire types of the bridge.
//!
//! ## Outside of World App
//!
//! ```
//! use minikit::{MiniKit, config::MiniKitConfig, errors::InstallErrorCode};
//! use url::Url;
//!
//! let minikit = MiniKit::new(
//!     MiniKitConfig::builder()
//!         .app_url(Url::parse("https://example.com").unwrap())
//!         .build(),
//! );
//!
//! let result = minikit.install("app_123");
//! assert_eq!(result.error_code, Some(InstallErrorCode::OutsideOfWorldapp));
//! assert!(!minikit.is_in_host());
//! ```
//!
//! ## Feature Flags
//!
//! - `tracing` (default): Log through the `tracing` crate.
//! - `http-client` (default): [`usernames::UsernamesApiClient`] and
//!   [`siwe::JsonRpcContractReader`], both over `reqwest`.

pub mod capabilities;
pub mod concepts;
pub mod config;
pub mod correlator;
pub mod errors;
pub mod events;
pub mod fallback;
pub mod minikit;
pub mod proof;
pub mod provider;
pub mod siwe;
pub mod types;

#[cfg(feature = "http-client")]
pub mod usernames;

pub use minikit::MiniKit;
