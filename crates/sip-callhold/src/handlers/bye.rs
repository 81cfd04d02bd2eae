// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// BYE request handler.
///
/// Ends the call on the linked leg like any other request, then checks
/// whether a subscriber involved in the call had a caller parked. If so that
/// caller is accepted and referred to the now free subscriber.
use anyhow::Result;
use tracing::info;

use crate::address::AddressOfRecord;
use crate::held_calls::HeldCall;
use crate::msg::{Method, Request, Response};
use crate::services::ServiceRegistry;

use super::request as generic;

pub async fn handle(request: &Request, services: &ServiceRegistry) -> Result<()> {
    generic::handle(request, services).await?;

    let to = AddressOfRecord::from_header(request.header("To"), "To")?;
    let from = AddressOfRecord::from_header(request.header("From"), "From")?;

    for subscriber in [&to, &from] {
        let Some(mut slot) = services.held_calls.lock_existing(subscriber.aor()).await else {
            continue;
        };
        let parked = match slot.take() {
            Some(HeldCall::Parked(parked)) => parked,
            Some(other) => {
                slot.replace(other);
                continue;
            }
            None => continue,
        };

        let platform = &services.platform;
        platform
            .send_response(Response::for_request(&parked, 200))
            .await?;

        let mut refer = platform.create_request(&parked.leg.session, Method::Refer)?;
        refer.headers.set("Refer-To", subscriber.sip_uri());
        platform.send_request(refer).await?;

        info!(
            call_id = request.call_id(),
            aor = %subscriber,
            held_call_id = parked.call_id(),
            "call ended, parked caller released to subscriber"
        );
        break;
    }
    Ok(())
}
