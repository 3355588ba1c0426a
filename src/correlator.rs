//! Turns the fire-and-forget command channel into request/response futures.
//!
//! A one-shot subscription is registered on the command's response event before the command
//! is sent, so a synchronous host reply is never missed. Correlation is by event name only.

use std::{
    pin::pin,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use futures_util::future::{Either, select};
use tokio::sync::oneshot;

use crate::{
    errors::{Error, Result},
    events::{EventManager, SubscriptionToken},
    types::{EventPayload, ResponseEvent},
};

/// The synchronous result of sending a command together with the host's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlated<C, F> {
    pub command_payload: C,
    pub final_payload: F,
}

#[derive(Debug, Clone, Copy)]
pub struct ResponseCorrelator<'a> {
    events: &'a EventManager,
}

/// Removes the correlation's handler unless it has already been consumed or replaced.
struct SubscriptionGuard<'a> {
    events: &'a EventManager,
    event: ResponseEvent,
    token: SubscriptionToken,
}

impl Drop for SubscriptionGuard<'_> {
    fn drop(&mut self) {
        self.events.unsubscribe_token(self.event, self.token);
    }
}

impl<'a> ResponseCorrelator<'a> {
    pub fn new(events: &'a EventManager) -> Self {
        ResponseCorrelator { events }
    }

    /// Subscribe to `F::EVENT`, run `send`, and wait for the reply.
    ///
    /// Never times out on its own; see [`await_command_until`](Self::await_command_until).
    pub async fn await_command<C, F, S>(&self, send: S) -> Result<Correlated<C, F>>
    where
        F: EventPayload,
        S: FnOnce() -> Result<C>,
    {
        self.await_command_until(send, std::future::pending()).await
    }

    /// Like [`await_command`](Self::await_command), failing with
    /// [`Error::ResponseTimeout`] once `deadline` completes.
    pub async fn await_command_until<C, F, S, D>(
        &self,
        send: S,
        deadline: D,
    ) -> Result<Correlated<C, F>>
    where
        F: EventPayload,
        S: FnOnce() -> Result<C>,
        D: Future<Output = ()>,
    {
        let event = F::EVENT;
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));

        let token = self.events.subscribe_once(event, move |payload| {
            if let Some(tx) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                let _ = tx.send(payload);
            }
        });
        let _guard = SubscriptionGuard {
            events: self.events,
            event,
            token,
        };

        let command_payload = send()?;

        #[cfg(feature = "tracing")]
        tracing::debug!("Awaiting '{}'", event);

        let deadline = pin!(deadline);
        match select(rx, deadline).await {
            Either::Left((Ok(payload), _)) => {
                let final_payload = F::from_payload(payload).ok_or(Error::UnexpectedPayload(event))?;
                Ok(Correlated {
                    command_payload,
                    final_payload,
                })
            }
            // The handler was dropped without firing: another subscriber replaced it.
            Either::Left((Err(_), _)) => Err(Error::Superseded(event)),
            Either::Right(_) => Err(Error::ResponseTimeout(event)),
        }
    }
}

/// Allows at most one holder at a time.
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

/// Releases its [`SingleFlight`] when dropped, on every completion path.
#[derive(Debug)]
pub struct SingleFlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<SingleFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SingleFlightGuard { flight: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for SingleFlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::Release);
    }
}
