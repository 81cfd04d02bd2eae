// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Handler for every request the service does not intercept.
///
/// The request is mirrored onto the linked leg; its answer comes back through
/// the response path. ACKs are absorbed since the service acknowledges the
/// callee leg itself.
use anyhow::Result;
use tracing::{debug, warn};

use crate::forward;
use crate::msg::{Method, Request, Response};
use crate::services::ServiceRegistry;

pub async fn handle(request: &Request, services: &ServiceRegistry) -> Result<()> {
    let call_id = request.call_id();

    if *request.method() == Method::Ack {
        debug!(call_id, "ACK absorbed");
        return Ok(());
    }

    if !forward::forward_request(request, services).await? {
        warn!(call_id, method = %request.method(), "request outside any linked call");
        services
            .platform
            .send_response(Response::for_request(request, 481))
            .await?;
    }
    Ok(())
}
