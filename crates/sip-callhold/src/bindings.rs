// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Location bindings: address-of-record to the single reachable contact.

use dashmap::DashMap;
use smol_str::SmolStr;
use tracing::info;

use crate::address::ContactBinding;

/// Outcome of applying a registration to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingChange {
    Updated { previous: Option<SmolStr> },
    Removed { previous: Option<SmolStr> },
}

/// In-memory binding registry, at most one contact per AoR.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    inner: DashMap<SmolStr, SmolStr>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the binding for `aor`.
    pub fn upsert(&self, aor: &str, contact: &str) -> Option<SmolStr> {
        self.inner.insert(SmolStr::new(aor), SmolStr::new(contact))
    }

    /// Removes the binding for `aor`; a missing binding is not an error.
    pub fn remove(&self, aor: &str) -> Option<SmolStr> {
        self.inner.remove(aor).map(|(_, contact)| contact)
    }

    pub fn lookup(&self, aor: &str) -> Option<SmolStr> {
        self.inner.get(aor).map(|entry| entry.value().clone())
    }

    /// Applies a parsed Contact: zero expiry removes, anything else upserts.
    pub fn apply(&self, aor: &str, binding: &ContactBinding) -> BindingChange {
        if binding.is_removal() {
            let previous = self.remove(aor);
            info!(aor, "binding removed");
            BindingChange::Removed { previous }
        } else {
            let previous = self.upsert(aor, binding.contact());
            info!(aor, contact = binding.contact(), "binding updated");
            BindingChange::Updated { previous }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_overwrites_previous_contact() {
        let registry = BindingRegistry::new();
        assert_eq!(registry.upsert("bob@acme.pt", "sip:bob@10.0.0.1:5080"), None);
        let previous = registry.upsert("bob@acme.pt", "sip:bob@10.0.0.2:5080");
        assert_eq!(previous.as_deref(), Some("sip:bob@10.0.0.1:5080"));
        assert_eq!(
            registry.lookup("bob@acme.pt").as_deref(),
            Some("sip:bob@10.0.0.2:5080")
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let registry = BindingRegistry::new();
        registry.upsert("bob@acme.pt", "sip:bob@10.0.0.1:5080");
        assert!(registry.remove("bob@acme.pt").is_some());
        assert!(registry.remove("bob@acme.pt").is_none());
        assert!(registry.lookup("bob@acme.pt").is_none());
    }

    #[test]
    fn apply_zero_expiry_removes_binding() {
        let registry = BindingRegistry::new();
        let add = ContactBinding::parse("<sip:bob@10.0.0.1:5080>").unwrap();
        let drop = ContactBinding::parse("<sip:bob@10.0.0.1:5080>;expires=0").unwrap();

        assert_eq!(
            registry.apply("bob@acme.pt", &add),
            BindingChange::Updated { previous: None }
        );
        assert!(matches!(
            registry.apply("bob@acme.pt", &drop),
            BindingChange::Removed { previous: Some(_) }
        ));
        assert!(registry.is_empty());
    }
}
