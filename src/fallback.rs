//! Tiered execution of a command: native host, then secondary wallet, then a caller fallback.

use bon::Builder;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{
    capabilities::CapabilityRegistry,
    errors::{Error, Result},
    types::Command,
};

/// Which tier produced a [`CommandResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Via {
    Native,
    Secondary,
    Custom,
}

impl std::fmt::Display for Via {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Via::Native => "native",
            Via::Secondary => "secondary",
            Via::Custom => "custom",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult<T> {
    pub data: T,
    pub via: Via,
}

/// A caller-supplied last resort, either synchronous or asynchronous.
pub enum Fallback<'a, T> {
    Sync(Box<dyn FnOnce() -> Result<T> + Send + 'a>),
    Async(BoxFuture<'a, Result<T>>),
}

impl<'a, T> Fallback<'a, T> {
    pub fn sync<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<T> + Send + 'a,
    {
        Fallback::Sync(Box::new(f))
    }

    pub fn future<F>(f: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'a,
    {
        Fallback::Async(Box::pin(f))
    }

    async fn run(self) -> Result<T> {
        match self {
            Fallback::Sync(f) => f(),
            Fallback::Async(f) => f.await,
        }
    }
}

impl<T> std::fmt::Debug for Fallback<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::Sync(_) => f.write_str("Fallback::Sync"),
            Fallback::Async(_) => f.write_str("Fallback::Async"),
        }
    }
}

/// Everything the engine may run for one command invocation.
#[derive(Builder)]
pub struct CommandPlan<'a, T> {
    pub command: Command,
    pub native: BoxFuture<'a, Result<T>>,
    pub secondary: Option<BoxFuture<'a, Result<T>>>,
    pub fallback: Option<Fallback<'a, T>>,
    /// Defaults to [`Command::requires_fallback`].
    pub requires_fallback: Option<bool>,
}

/// Picks the tier a command runs on.
#[derive(Debug, Clone, Copy)]
pub struct FallbackEngine<'a> {
    pub registry: &'a CapabilityRegistry,
    pub in_host: bool,
    pub secondary_configured: bool,
}

impl<'a> FallbackEngine<'a> {
    pub fn new(registry: &'a CapabilityRegistry, in_host: bool, secondary_configured: bool) -> Self {
        FallbackEngine {
            registry,
            in_host,
            secondary_configured,
        }
    }

    /// Run the first eligible tier of `plan`.
    ///
    /// A failing native or secondary tier falls through to the caller fallback. With no
    /// fallback, the last tier error is returned; with no tier run at all, the command is
    /// reported unavailable.
    pub async fn execute<T>(&self, plan: CommandPlan<'_, T>) -> Result<CommandResult<T>> {
        let CommandPlan {
            command,
            native,
            secondary,
            fallback,
            requires_fallback,
        } = plan;

        let mut last_error = None;

        if self.in_host && self.registry.is_available(command) {
            match native.await {
                Ok(data) => {
                    return Ok(CommandResult {
                        data,
                        via: Via::Native,
                    });
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Native '{}' failed: {}", command, err);
                    last_error = Some(err);
                }
            }
        } else if let Some(secondary) =
            secondary.filter(|_| !self.in_host && self.secondary_configured)
        {
            match secondary.await {
                Ok(data) => {
                    return Ok(CommandResult {
                        data,
                        via: Via::Secondary,
                    });
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Secondary '{}' failed: {}", command, err);
                    last_error = Some(err);
                }
            }
        }

        if let Some(fallback) = fallback {
            let data = fallback.run().await?;
            return Ok(CommandResult {
                data,
                via: Via::Custom,
            });
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        if requires_fallback.unwrap_or(command.requires_fallback()) && !self.in_host {
            return Err(Error::FallbackRequired(command));
        }

        Err(Error::CommandUnavailable {
            command,
            reason: self.registry.unavailable_reason(command, self.in_host),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;
    use crate::{errors::UnavailableReason, types::SupportedCommand};

    fn negotiated(registry: &CapabilityRegistry, names: &[Command]) {
        let declared: Vec<_> = names
            .iter()
            .map(|c| SupportedCommand {
                name: c.name().to_string(),
                supported_versions: vec![c.version()],
            })
            .collect();
        registry.negotiate(&declared);
    }

    fn tier(value: &'static str, ran: Arc<AtomicBool>) -> BoxFuture<'static, Result<&'static str>> {
        Box::pin(async move {
            ran.store(true, Ordering::SeqCst);
            Ok(value)
        })
    }

    fn failing() -> BoxFuture<'static, Result<&'static str>> {
        Box::pin(async { Err(Error::secondary("wallet closed")) })
    }

    #[tokio::test]
    async fn test_native_when_available() {
        let registry = CapabilityRegistry::new();
        negotiated(&registry, &[Command::SignMessage]);
        let native_ran = Arc::new(AtomicBool::new(false));
        let secondary_ran = Arc::new(AtomicBool::new(false));

        let result = FallbackEngine::new(&registry, true, true)
            .execute(
                CommandPlan::builder()
                    .command(Command::SignMessage)
                    .native(tier("native", native_ran.clone()))
                    .secondary(tier("secondary", secondary_ran.clone()))
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(result.via, Via::Native);
        assert!(native_ran.load(Ordering::SeqCst));
        assert!(!secondary_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_native_failure_in_host_skips_secondary() {
        let registry = CapabilityRegistry::new();
        negotiated(&registry, &[Command::SignMessage]);
        let secondary_ran = Arc::new(AtomicBool::new(false));

        let err = FallbackEngine::new(&registry, true, true)
            .execute(
                CommandPlan::builder()
                    .command(Command::SignMessage)
                    .native(Box::pin(async {
                        Err::<&'static str, _>(Error::custom("host crashed"))
                    }))
                    .secondary(tier("secondary", secondary_ran.clone()))
                    .build(),
            )
            .await
            .unwrap_err();

        assert!(matches!(&err, Error::Custom(e) if e.to_string() == "host crashed"));
        assert!(!secondary_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_secondary_outside_host() {
        let registry = CapabilityRegistry::new();
        let native_ran = Arc::new(AtomicBool::new(false));

        let result = FallbackEngine::new(&registry, false, true)
            .execute(
                CommandPlan::builder()
                    .command(Command::SignMessage)
                    .native(tier("native", native_ran.clone()))
                    .secondary(tier("secondary", Arc::default()))
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(result, CommandResult { data: "secondary", via: Via::Secondary });
        assert!(!native_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_secondary_falls_through_to_custom() {
        let registry = CapabilityRegistry::new();

        let result = FallbackEngine::new(&registry, false, true)
            .execute(
                CommandPlan::builder()
                    .command(Command::SignMessage)
                    .native(tier("native", Arc::default()))
                    .secondary(failing())
                    .fallback(Fallback::sync(|| Ok("custom")))
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(result.via, Via::Custom);

        let err = FallbackEngine::new(&registry, false, true)
            .execute(
                CommandPlan::builder()
                    .command(Command::SignMessage)
                    .native(tier("native", Arc::default()))
                    .secondary(failing())
                    .build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Secondary(_)));
    }

    #[tokio::test]
    async fn test_missing_capability_uses_fallback() {
        let registry = CapabilityRegistry::new();
        negotiated(&registry, &[Command::Verify]);
        let native_ran = Arc::new(AtomicBool::new(false));

        let result = FallbackEngine::new(&registry, true, false)
            .execute(
                CommandPlan::builder()
                    .command(Command::Pay)
                    .native(tier("native", native_ran.clone()))
                    .fallback(Fallback::future(async { Ok("custom") }))
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(result.via, Via::Custom);
        assert!(!native_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unavailable_errors() {
        let registry = CapabilityRegistry::new();
        negotiated(&registry, &[Command::Verify]);

        let err = FallbackEngine::new(&registry, false, false)
            .execute(
                CommandPlan::builder()
                    .command(Command::Pay)
                    .native(tier("native", Arc::default()))
                    .build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FallbackRequired(Command::Pay)));

        let err = FallbackEngine::new(&registry, true, false)
            .execute(
                CommandPlan::builder()
                    .command(Command::Pay)
                    .native(tier("native", Arc::default()))
                    .build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CommandUnavailable {
                command: Command::Pay,
                reason: UnavailableReason::OldAppVersion
            }
        ));

        let err = FallbackEngine::new(&registry, false, false)
            .execute(
                CommandPlan::builder()
                    .command(Command::Share)
                    .native(tier("native", Arc::default()))
                    .build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CommandUnavailable {
                command: Command::Share,
                reason: UnavailableReason::NotInWorldApp
            }
        ));
    }
}
