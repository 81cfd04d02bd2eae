// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// REGISTER request handler.
///
/// Applies the single Contact of the request to the binding registry:
/// `expires=0` removes the AoR's binding, anything else replaces it.
/// The request is always answered 200 OK once both headers parse.
use anyhow::Result;
use tracing::{info, warn};

use crate::address::{AddressOfRecord, ContactBinding};
use crate::bindings::BindingChange;
use crate::msg::{Request, Response};
use crate::services::ServiceRegistry;

pub async fn handle(request: &Request, services: &ServiceRegistry) -> Result<()> {
    let call_id = request.call_id();

    let parsed = AddressOfRecord::from_header(request.header("To"), "To").and_then(|aor| {
        ContactBinding::from_header(request.header("Contact")).map(|contact| (aor, contact))
    });
    let (aor, contact) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(call_id, error = %e, "REGISTER rejected");
            services
                .platform
                .send_response(Response::for_request(request, 400))
                .await?;
            return Ok(());
        }
    };

    let change = services.bindings.apply(aor.aor(), &contact);
    let mut response = Response::for_request(request, 200);
    if let BindingChange::Updated { .. } = change {
        response
            .headers
            .set("Contact", format!("<{}>", contact.contact()));
    }

    info!(call_id, aor = %aor, change = ?change, "registration processed");
    services.platform.send_response(response).await?;
    Ok(())
}
