// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Response handlers.
///
/// Final responses of 300 and above pass the busy interceptor first: a 486
/// from a subscriber parks the caller and prompts the subscriber instead of
/// reaching the caller. Everything else is relayed to the linked leg.
use anyhow::Result;
use tracing::{debug, info, warn};

use crate::address::AddressOfRecord;
use crate::forward;
use crate::held_calls::HeldCall;
use crate::msg::{Method, Response};
use crate::services::ServiceRegistry;

const BUSY_HERE: u16 = 486;

/// Handles responses of 300 and above.
pub async fn handle_error(response: &Response, services: &ServiceRegistry) -> Result<()> {
    let caller = AddressOfRecord::from_header(response.header("From"), "From")?;
    let callee = AddressOfRecord::from_header(response.header("To"), "To")?;

    if response.code() == BUSY_HERE && services.config.is_subscriber(callee.username()) {
        return intercept_busy(response, &caller, &callee, services).await;
    }

    forward::forward_response(response, services).await
}

/// Handles provisional and success responses.
pub async fn handle_other(response: &Response, services: &ServiceRegistry) -> Result<()> {
    if !forward::should_mirror(response.code()) {
        debug!(call_id = response.call_id(), code = response.code(), "response not mirrored");
        return Ok(());
    }
    forward::forward_response(response, services).await
}

async fn intercept_busy(
    response: &Response,
    caller: &AddressOfRecord,
    callee: &AddressOfRecord,
    services: &ServiceRegistry,
) -> Result<()> {
    let call_id = response.call_id();
    let platform = &services.platform;

    let Some(original) = platform.linked_request(&response.leg) else {
        warn!(call_id, callee = %callee, "busy response without a linked caller request");
        return Ok(());
    };

    let replaced = services
        .held_calls
        .hold(callee.aor(), HeldCall::Parked(original))
        .await;
    if let Some(previous) = replaced {
        info!(
            call_id,
            aor = %callee,
            previous_call_id = previous.request().call_id(),
            "previous held call replaced"
        );
    }
    info!(call_id, aor = %callee, caller = %caller, "busy subscriber, call held");

    let Some(contact) = services.bindings.lookup(callee.aor()) else {
        warn!(call_id, aor = %callee, "subscriber has no binding, prompt not sent");
        return Ok(());
    };

    let mut prompt = platform.create_standalone_request(
        Method::Message,
        &services.config.service_uri,
        &contact,
    )?;
    prompt.set_body(services.config.prompt_for(caller.username()), "text/plain")?;
    platform.send_request(prompt).await?;

    info!(call_id, aor = %callee, contact = %contact, "subscriber prompted");
    Ok(())
}
