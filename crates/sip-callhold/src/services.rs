// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Shared service registry for handlers.
///
/// Holds the configuration, both registries and the host platform.

use std::sync::Arc;

use tracing::info;

use crate::bindings::BindingRegistry;
use crate::config::CallHoldConfig;
use crate::held_calls::HeldCallRegistry;
use crate::platform::B2buaPlatform;

/// Registry of shared state used by every handler.
///
/// Created once at startup; lives as long as the process.
pub struct ServiceRegistry {
    /// Service configuration (immutable)
    pub config: Arc<CallHoldConfig>,

    /// AoR → contact bindings
    pub bindings: BindingRegistry,

    /// Subscriber AoR → held call
    pub held_calls: HeldCallRegistry,

    /// Host B2BUA stack
    pub platform: Arc<dyn B2buaPlatform>,
}

impl ServiceRegistry {
    /// Creates the registry and seeds the announcement and conference bindings.
    pub fn new(config: CallHoldConfig, platform: Arc<dyn B2buaPlatform>) -> Self {
        let bindings = BindingRegistry::new();
        for service in [&config.announcement, &config.conference] {
            bindings.upsert(&service.aor, &service.contact);
            info!(aor = %service.aor, contact = %service.contact, "service binding installed");
        }

        Self {
            config: Arc::new(config),
            bindings,
            held_calls: HeldCallRegistry::new(),
            platform,
        }
    }
}
