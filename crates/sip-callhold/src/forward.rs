// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leg-to-leg mirroring of requests and responses.
//!
//! Everything the call-hold logic does not intercept is copied onto the
//! linked leg so both sides of the B2BUA stay in step.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::msg::{Method, Request, Response};
use crate::services::ServiceRegistry;

/// Responses within 100 of 400 are never mirrored blindly.
///
/// The threshold is literal: 301..=499 is excluded, every other status
/// (including 300 and 500) is eligible.
pub fn should_mirror(code: u16) -> bool {
    (i32::from(code) - 400).abs() >= 100
}

/// Mirrors `request` onto the leg linked with its session.
///
/// Returns `false` when the session has no linked leg; the caller decides how
/// to answer in that case.
pub async fn forward_request(request: &Request, services: &ServiceRegistry) -> Result<bool> {
    let platform = &services.platform;
    let call_id = request.call_id();

    let Some(linked) = platform.linked_session(&request.leg.session) else {
        warn!(call_id, method = %request.method(), "no linked session to forward request");
        return Ok(false);
    };

    let mut mirrored = platform.create_linked_request(&linked, request)?;
    copy_request_body(request, &mut mirrored);

    info!(
        call_id,
        method = %request.method(),
        from = %request.leg.session,
        to = %linked,
        "forwarding request to linked leg"
    );
    platform.send_request(mirrored).await?;
    Ok(true)
}

/// Mirrors `response` onto the transaction linked with the one it answers.
///
/// A mirrored 2xx to an INVITE is acknowledged here: the core took over the
/// original transaction, so the host stack will not send that ACK itself.
pub async fn forward_response(response: &Response, services: &ServiceRegistry) -> Result<()> {
    let platform = &services.platform;
    let call_id = response.call_id();

    let Some(linked_request) = platform.linked_request(&response.leg) else {
        warn!(call_id, code = response.code(), "no linked request to forward response");
        return Ok(());
    };

    let mut mirrored =
        Response::with_reason(&linked_request, response.code(), &response.start.reason);
    copy_response_body(response, &mut mirrored);

    info!(
        call_id,
        code = response.code(),
        to = %linked_request.leg.session,
        "forwarding response to linked leg"
    );
    platform.send_response(mirrored).await?;

    if response.start.is_success() && *linked_request.method() == Method::Invite {
        let ack = platform.create_ack(response)?;
        debug!(call_id, "acknowledging forwarded 2xx");
        platform.send_request(ack).await?;
    }
    Ok(())
}

// Body copies are best effort: on failure the message goes out without one.

fn copy_request_body(from: &Request, to: &mut Request) {
    if from.body.is_empty() {
        return;
    }
    let content_type = from.content_type().unwrap_or_default();
    if let Err(e) = to.set_body(from.body.clone(), content_type) {
        debug!(call_id = from.call_id(), error = %e, "request body not copied");
    }
}

fn copy_response_body(from: &Response, to: &mut Response) {
    if from.body.is_empty() {
        return;
    }
    let content_type = from.content_type().unwrap_or_default();
    if let Err(e) = to.set_body(from.body.clone(), content_type) {
        debug!(call_id = from.call_id(), error = %e, "response body not copied");
    }
}

#[cfg(test)]
mod tests {
    use super::should_mirror;

    #[test]
    fn mirror_filter_uses_literal_threshold() {
        for code in [100, 180, 183, 200, 202, 300, 500, 503, 600, 603] {
            assert!(should_mirror(code), "{code} should be mirrored");
        }
        for code in [301, 302, 400, 404, 481, 486, 487, 499] {
            assert!(!should_mirror(code), "{code} should not be mirrored");
        }
    }
}
