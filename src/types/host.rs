//! Properties the host declares about itself, and the installation state derived from them.

use serde::{Deserialize, Serialize};

/// One entry of the host's capability declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedCommand {
    /// Wire name of the command, e.g. `"wallet-auth"`.
    pub name: String,
    /// Protocol versions the host accepts for this command.
    pub supported_versions: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SafeAreaInsets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Where the host opened the mini app from, as declared by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostLaunchLocation {
    pub open_origin: String,
}

/// The host marker object. Its presence means the SDK runs inside World App.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldAppInfo {
    pub world_app_version: u64,
    pub device_os: String,
    #[serde(default)]
    pub is_optional_analytics: bool,
    pub supported_commands: Vec<SupportedCommand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_area_insets: Option<SafeAreaInsets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<HostLaunchLocation>,
}

/// Launch location normalized from [`HostLaunchLocation::open_origin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniAppLaunchLocation {
    Chat,
    Home,
    AppStore,
    DeepLink,
    WalletTab,
}

impl MiniAppLaunchLocation {
    pub fn from_open_origin(origin: &str) -> Option<Self> {
        match origin {
            "chat" => Some(MiniAppLaunchLocation::Chat),
            "home" => Some(MiniAppLaunchLocation::Home),
            "app_store" => Some(MiniAppLaunchLocation::AppStore),
            "deeplink" => Some(MiniAppLaunchLocation::DeepLink),
            "wallet_tab" => Some(MiniAppLaunchLocation::WalletTab),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceProperties {
    pub safe_area_insets: Option<SafeAreaInsets>,
    pub device_os: Option<String>,
    pub world_app_version: Option<u64>,
}

/// Public profile of a World App user, as returned by a username lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

/// The user of the mini app, filled in by a successful wallet auth.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub wallet_address: Option<String>,
    pub username: Option<String>,
    pub profile_picture_url: Option<String>,
}

/// Installation state of a [`MiniKit`](crate::MiniKit) instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiniKitState {
    pub app_id: Option<String>,
    pub user: User,
    pub device_properties: DeviceProperties,
    pub location: Option<MiniAppLaunchLocation>,
    pub is_ready: bool,
}
