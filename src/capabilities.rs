//! Capability negotiation between the SDK's command set and what the host declares.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::{
    errors::UnavailableReason,
    types::{Command, SupportedCommand},
};

/// Negotiated status of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    /// Declared at the required version.
    Supported,
    /// Declared, but not at the required version. Still dispatched.
    VersionMismatch,
    /// Not declared by the host.
    Missing,
}

impl CapabilityStatus {
    pub fn is_available(&self) -> bool {
        !matches!(self, CapabilityStatus::Missing)
    }
}

/// Per-command availability, filled once per host session.
///
/// Every command is unavailable until [`negotiate`](CapabilityRegistry::negotiate) has run.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    table: RwLock<HashMap<Command, CapabilityStatus>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match every known command against the host's declaration, replacing the whole table.
    ///
    /// Returns `true` only if every command is declared at its required version. The result
    /// is only used for the coarse install-time error; individual calls are gated by
    /// [`is_available`](CapabilityRegistry::is_available).
    pub fn negotiate(&self, declared: &[SupportedCommand]) -> bool {
        let mut all_valid = true;
        let mut table = HashMap::with_capacity(Command::ALL.len());

        for command in Command::ALL {
            let status = match declared.iter().find(|c| c.name == command.name()) {
                Some(entry) if entry.supported_versions.contains(&command.version()) => {
                    CapabilityStatus::Supported
                }
                Some(_entry) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "Command '{}' version {} is not supported by the app; supported versions: {:?}. Dispatching anyway",
                        command,
                        command.version(),
                        _entry.supported_versions
                    );
                    CapabilityStatus::VersionMismatch
                }
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        "Command '{}' is not supported by the app. Try updating the app version",
                        command
                    );
                    CapabilityStatus::Missing
                }
            };

            all_valid &= status == CapabilityStatus::Supported;
            table.insert(command, status);
        }

        *self.table.write().unwrap_or_else(PoisonError::into_inner) = table;
        all_valid
    }

    /// Forget the negotiated table.
    pub fn clear(&self) {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn status(&self, command: Command) -> Option<CapabilityStatus> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&command)
            .copied()
    }

    pub fn is_available(&self, command: Command) -> bool {
        self.status(command).is_some_and(|s| s.is_available())
    }

    /// Reason to report when `command` cannot be dispatched natively.
    pub fn unavailable_reason(&self, command: Command, in_host: bool) -> UnavailableReason {
        if !in_host {
            return UnavailableReason::NotInWorldApp;
        }
        match self.status(command) {
            Some(_) => UnavailableReason::OldAppVersion,
            None => UnavailableReason::CommandNotSupported,
        }
    }
}
