//! Miscellaneous common types used throughout the bridge.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Represents an key-value pair in a host payload. The key is a `String`.
pub type Record<V> = std::collections::HashMap<String, V>;

/// Represents any JSON value. Used for serializing/deserializing arbitrary JSON data.
pub type AnyJson = serde_json::Value;

/// Chain id of World Chain, the only chain the host wallet operates on.
pub const WORLD_CHAIN_ID: u64 = 480;

/// Signature scheme reported by the host in a wallet auth response.
///
/// Decides which verification path a backend must take for the signed SIWE message.
///
/// ```
/// use minikit::types::WalletAuthVersion;
///
/// let v: WalletAuthVersion = serde_json::from_value(serde_json::json!(2)).unwrap();
/// assert_eq!(v, WalletAuthVersion::V2);
/// assert_eq!(serde_json::to_value(v).unwrap(), serde_json::json!(2));
/// assert!(serde_json::from_value::<WalletAuthVersion>(serde_json::json!(3)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletAuthVersion {
    /// Message signed by a Safe owner key; ownership is checked on-chain.
    V1,
    /// Message signed by the Safe itself; checked through EIP-1271.
    V2,
}

impl WalletAuthVersion {
    pub fn as_u32(&self) -> u32 {
        match self {
            WalletAuthVersion::V1 => 1,
            WalletAuthVersion::V2 => 2,
        }
    }
}

impl Serialize for WalletAuthVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u32(self.as_u32())
    }
}

impl<'de> Deserialize<'de> for WalletAuthVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let v = u32::deserialize(deserializer)?;
        match v {
            1 => Ok(WalletAuthVersion::V1),
            2 => Ok(WalletAuthVersion::V2),
            _ => Err(serde::de::Error::custom(format!(
                "Unsupported wallet auth version {v}; expected 1 or 2"
            ))),
        }
    }
}

impl Display for WalletAuthVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Current time as the host expects it: RFC 3339 with millisecond precision in UTC.
pub(crate) fn iso_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
