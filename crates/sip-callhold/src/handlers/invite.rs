// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Initial INVITE handler (call routing).
///
/// 1. Send 100 Trying
/// 2. Look up the callee's binding
/// 3. Create and send the linked outbound INVITE, or answer 404
///
/// The final answer to the caller comes from the callee leg and is relayed
/// by the response handlers.
use anyhow::Result;
use tracing::{info, warn};

use crate::address::AddressOfRecord;
use crate::msg::{Request, Response};
use crate::services::ServiceRegistry;

pub async fn handle(request: &Request, services: &ServiceRegistry) -> Result<()> {
    let call_id = request.call_id();
    let platform = &services.platform;

    platform
        .send_response(Response::for_request(request, 100))
        .await?;

    let callee = AddressOfRecord::from_header(request.header("To"), "To")?;

    let Some(contact) = services.bindings.lookup(callee.aor()) else {
        warn!(call_id, callee = %callee, "callee not registered");
        platform
            .send_response(Response::for_request(request, 404))
            .await?;
        return Ok(());
    };

    info!(call_id, callee = %callee, contact = %contact, "routing call to bound contact");
    let outbound = platform.create_linked_call(request, &contact)?;
    platform.send_request(outbound).await?;
    Ok(())
}
