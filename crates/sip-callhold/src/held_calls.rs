// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Held-call state per subscriber.
///
/// Tracks the call request parked while a busy subscriber decides what to
/// do with it. Each subscriber AoR owns one slot guarded by an async mutex;
/// call-control operations keep the slot locked across their whole
/// read-modify-write so two signals for the same subscriber never interleave.

use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::msg::Request;

/// What a subscriber's slot currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeldCall {
    /// Caller-side request waiting for the subscriber's decision.
    Parked(Request),
    /// REFER that moved the subscriber's previous peer to the announcement
    /// service during a hold.
    Redirected(Request),
}

impl HeldCall {
    pub fn request(&self) -> &Request {
        match self {
            HeldCall::Parked(req) | HeldCall::Redirected(req) => req,
        }
    }
}

/// Exclusive access to one subscriber's slot.
pub struct HeldCallSlot {
    guard: OwnedMutexGuard<Option<HeldCall>>,
}

impl HeldCallSlot {
    pub fn get(&self) -> Option<&HeldCall> {
        self.guard.as_ref()
    }

    /// Removes and returns the held call.
    pub fn take(&mut self) -> Option<HeldCall> {
        self.guard.take()
    }

    /// Stores `call`, returning whatever was there before.
    pub fn replace(&mut self, call: HeldCall) -> Option<HeldCall> {
        self.guard.replace(call)
    }
}

/// Registry of held calls keyed by subscriber AoR.
#[derive(Debug, Default)]
pub struct HeldCallRegistry {
    slots: DashMap<SmolStr, Arc<Mutex<Option<HeldCall>>>>,
}

impl HeldCallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the slot for `aor`, creating an empty one if needed.
    pub async fn lock(&self, aor: &str) -> HeldCallSlot {
        let slot = self
            .slots
            .entry(SmolStr::new(aor))
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        // The DashMap shard guard is gone before awaiting.
        HeldCallSlot {
            guard: slot.lock_owned().await,
        }
    }

    /// Locks the slot for `aor` only if one was ever created.
    pub async fn lock_existing(&self, aor: &str) -> Option<HeldCallSlot> {
        let slot = self.slots.get(aor).map(|entry| entry.value().clone())?;
        Some(HeldCallSlot {
            guard: slot.lock_owned().await,
        })
    }

    /// Parks `call` for `aor`; last writer wins.
    pub async fn hold(&self, aor: &str, call: HeldCall) -> Option<HeldCall> {
        self.lock(aor).await.replace(call)
    }

    /// Removes and returns the held call for `aor`.
    pub async fn take(&self, aor: &str) -> Option<HeldCall> {
        let mut slot = self.lock_existing(aor).await?;
        slot.take()
    }

    /// Snapshot of the held call for `aor`.
    pub async fn get(&self, aor: &str) -> Option<HeldCall> {
        let slot = self.lock_existing(aor).await?;
        slot.get().cloned()
    }

    /// Number of subscribers with a held call.
    pub async fn count(&self) -> usize {
        let slots: Vec<_> = self
            .slots
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let mut held = 0;
        for slot in slots {
            if slot.lock().await.is_some() {
                held += 1;
            }
        }
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{Headers, Method, RequestLine};
    use crate::platform::{LegRef, SessionId, TransactionId};
    use bytes::Bytes;
    use std::time::Duration;

    fn invite(tx: &str) -> Request {
        Request::new(
            RequestLine::new(Method::Invite, "sip:alice@acme.pt"),
            Headers::new(),
            Bytes::new(),
            LegRef::new(SessionId::new("caller"), TransactionId::new(tx)),
        )
    }

    #[tokio::test]
    async fn last_writer_wins() {
        let registry = HeldCallRegistry::new();
        assert!(registry
            .hold("alice@acme.pt", HeldCall::Parked(invite("t1")))
            .await
            .is_none());
        let previous = registry
            .hold("alice@acme.pt", HeldCall::Parked(invite("t2")))
            .await;
        assert_eq!(previous, Some(HeldCall::Parked(invite("t1"))));
        assert_eq!(
            registry.get("alice@acme.pt").await,
            Some(HeldCall::Parked(invite("t2")))
        );
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn take_empties_slot() {
        let registry = HeldCallRegistry::new();
        registry
            .hold("bob@acme.pt", HeldCall::Parked(invite("t1")))
            .await;
        assert!(registry.take("bob@acme.pt").await.is_some());
        assert!(registry.take("bob@acme.pt").await.is_none());
        assert!(registry.take("nobody@acme.pt").await.is_none());
        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn slot_lock_serializes_writers() {
        let registry = Arc::new(HeldCallRegistry::new());
        let mut slot = registry.lock("claire@acme.pt").await;

        let writer = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .hold("claire@acme.pt", HeldCall::Parked(invite("late")))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!writer.is_finished());
        slot.replace(HeldCall::Redirected(invite("refer")));
        drop(slot);

        let previous = writer.await.unwrap();
        assert_eq!(previous, Some(HeldCall::Redirected(invite("refer"))));
    }
}
