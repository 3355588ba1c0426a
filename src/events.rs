//! Per-event handler table and delivery of host responses.
//!
//! Each response event holds at most one handler; subscribing again replaces it. Delivery
//! decorates the payload first: verify error codes are aligned to the public error set and
//! Orb proofs are compressed.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    concepts::ProofCompressor,
    proof::Groth16Compressor,
    types::{
        CommandResponse, ResponseEvent, ResponsePayload, VerificationLevel, VerificationResult,
        VerifySuccess,
    },
};

/// Handler invoked with a decorated response payload.
pub type EventHandler = Arc<dyn Fn(ResponsePayload) + Send + Sync>;

/// Verify error codes reported by the host and their public equivalent.
const VERIFY_ERROR_ALIASES: &[(&str, &str)] = &[("user_rejected", "verification_rejected")];

/// Identifies one subscription, so a subscriber can remove only its own handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

struct Subscription {
    token: SubscriptionToken,
    handler: EventHandler,
    once: bool,
}

pub struct EventManager {
    subscriptions: Mutex<HashMap<ResponseEvent, Subscription>>,
    next_token: AtomicU64,
    compressor: Arc<dyn ProofCompressor>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new(Arc::new(Groth16Compressor))
    }
}

impl std::fmt::Debug for EventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<ResponseEvent> = self.lock().keys().copied().collect();
        f.debug_struct("EventManager")
            .field("subscribed", &events)
            .finish_non_exhaustive()
    }
}

impl EventManager {
    pub fn new(compressor: Arc<dyn ProofCompressor>) -> Self {
        EventManager {
            subscriptions: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            compressor,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResponseEvent, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, event: ResponseEvent, handler: EventHandler, once: bool) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let previous = self.lock().insert(
            event,
            Subscription {
                token,
                handler,
                once,
            },
        );

        #[cfg(feature = "tracing")]
        if previous.is_some() {
            tracing::debug!("Replaced existing handler for '{}'", event);
        }
        #[cfg(not(feature = "tracing"))]
        let _ = previous;

        token
    }

    /// Register `handler` for `event`, replacing any existing handler.
    pub fn subscribe<F>(&self, event: ResponseEvent, handler: F) -> SubscriptionToken
    where
        F: Fn(ResponsePayload) + Send + Sync + 'static,
    {
        self.insert(event, Arc::new(handler), false)
    }

    /// Register a handler that is removed before its first invocation.
    pub fn subscribe_once<F>(&self, event: ResponseEvent, handler: F) -> SubscriptionToken
    where
        F: Fn(ResponsePayload) + Send + Sync + 'static,
    {
        self.insert(event, Arc::new(handler), true)
    }

    /// Remove whatever handler is registered for `event`.
    pub fn unsubscribe(&self, event: ResponseEvent) {
        self.lock().remove(&event);
    }

    /// Remove the handler for `event` only if it is still the one identified by `token`.
    pub fn unsubscribe_token(&self, event: ResponseEvent, token: SubscriptionToken) -> bool {
        let mut subscriptions = self.lock();
        match subscriptions.get(&event) {
            Some(sub) if sub.token == token => {
                subscriptions.remove(&event);
                true
            }
            _ => false,
        }
    }

    pub fn has_subscriber(&self, event: ResponseEvent) -> bool {
        self.lock().contains_key(&event)
    }

    /// Deliver `payload` to the handler of its event.
    ///
    /// Returns `false` when no handler is registered; the payload is dropped.
    pub fn trigger(&self, payload: ResponsePayload) -> bool {
        let event = payload.event();

        // The handler runs outside the lock so it may subscribe or unsubscribe.
        let handler = {
            let mut subscriptions = self.lock();
            match subscriptions.get(&event) {
                Some(sub) if sub.once => subscriptions.remove(&event).map(|s| s.handler),
                Some(sub) => Some(sub.handler.clone()),
                None => None,
            }
        };

        let Some(handler) = handler else {
            #[cfg(feature = "tracing")]
            tracing::error!("No handler for event '{}', dropping payload", event);
            return false;
        };

        handler(self.decorate(payload));
        true
    }

    fn decorate(&self, payload: ResponsePayload) -> ResponsePayload {
        match payload {
            ResponsePayload::Verify(CommandResponse::Error(mut error)) => {
                if let Some((_, public)) = VERIFY_ERROR_ALIASES
                    .iter()
                    .find(|(host, _)| *host == error.error_code)
                {
                    error.error_code = public.to_string();
                }
                ResponsePayload::Verify(CommandResponse::Error(error))
            }
            ResponsePayload::Verify(CommandResponse::Success(success)) => {
                ResponsePayload::Verify(CommandResponse::Success(self.compress_proofs(success)))
            }
            other => other,
        }
    }

    fn compress_proofs(&self, success: VerifySuccess) -> VerifySuccess {
        match success {
            VerifySuccess::Single(mut single) => {
                if single.result.verification_level != VerificationLevel::Orb {
                    return VerifySuccess::Single(single);
                }
                match self.compress_one(&single.result) {
                    Ok(proof) => single.result.proof = proof,
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            mode = "single",
                            payload_version = single.version,
                            verification_level = %single.result.verification_level,
                            item_count = 1,
                            error = %_err,
                            "Failed to compress proof, delivering it uncompressed"
                        );
                    }
                }
                VerifySuccess::Single(single)
            }
            VerifySuccess::Multi(mut multi) => {
                let compressed: Result<Vec<_>, _> = multi
                    .verifications
                    .iter()
                    .map(|v| {
                        if v.verification_level == VerificationLevel::Orb {
                            self.compress_one(v)
                        } else {
                            Ok(v.proof.clone())
                        }
                    })
                    .collect();

                match compressed {
                    Ok(proofs) => {
                        for (v, proof) in multi.verifications.iter_mut().zip(proofs) {
                            v.proof = proof;
                        }
                    }
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            mode = "multi",
                            payload_version = multi.version,
                            verification_level = "orb",
                            item_count = multi.verifications.len(),
                            error = %_err,
                            "Failed to compress proofs, delivering the batch uncompressed"
                        );
                    }
                }
                VerifySuccess::Multi(multi)
            }
        }
    }

    fn compress_one(&self, result: &VerificationResult) -> Result<String, crate::proof::ProofError> {
        self.compressor.compress_and_pad(&result.proof)
    }
}
