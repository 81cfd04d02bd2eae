// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The three decisions a busy subscriber can take about a held call.
//!
//! Each operation locks the subscriber's held-call slot for its whole run,
//! so concurrent signals for the same subscriber are applied one at a time.

use tracing::{info, warn};

use crate::address::AddressOfRecord;
use crate::error::CallControlError;
use crate::held_calls::HeldCall;
use crate::msg::{Method, Request, Response};
use crate::platform::SessionId;
use crate::services::ServiceRegistry;

/// Control code carried in a subscriber's INFO body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Reject,
    Hold,
    Conference,
}

impl ControlSignal {
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(Self::Reject),
            2 => Some(Self::Hold),
            3 => Some(Self::Conference),
            _ => None,
        }
    }
}

/// Sends a REFER on `session` pointing at `target` and returns it.
async fn send_refer(
    services: &ServiceRegistry,
    session: &SessionId,
    target: &str,
) -> Result<Request, CallControlError> {
    let mut refer = services.platform.create_request(session, Method::Refer)?;
    refer.headers.set("Refer-To", target);
    services.platform.send_request(refer.clone()).await?;
    Ok(refer)
}

/// Turns the held call away with 486 Busy Here.
pub async fn reject(services: &ServiceRegistry, subscriber: &str) -> Result<(), CallControlError> {
    let mut slot = services.held_calls.lock(subscriber).await;

    match slot.take() {
        Some(HeldCall::Parked(incoming)) => {
            info!(aor = subscriber, call_id = incoming.call_id(), "rejecting held call");
            services
                .platform
                .send_response(Response::for_request(&incoming, 486))
                .await?;
        }
        Some(HeldCall::Redirected(refer)) => {
            warn!(
                aor = subscriber,
                call_id = refer.call_id(),
                "held slot holds an announcement transfer, nothing to reject"
            );
        }
        None => warn!(aor = subscriber, "reject requested without a held call"),
    }
    Ok(())
}

/// Parks the subscriber's current peer on the announcement service and
/// connects the held caller instead.
///
/// `info` is the control request; its session is the subscriber's leg and
/// the linked session reaches the peer of the active call.
pub async fn hold(
    services: &ServiceRegistry,
    subscriber: &str,
    info: &Request,
) -> Result<(), CallControlError> {
    let mut slot = services.held_calls.lock(subscriber).await;

    let subscriber_session = &info.leg.session;
    let active_peer = services
        .platform
        .linked_session(subscriber_session)
        .ok_or_else(|| CallControlError::NoLinkedSession(subscriber_session.to_string()))?;

    let incoming = match slot.take() {
        Some(HeldCall::Parked(incoming)) => incoming,
        Some(redirected) => {
            warn!(aor = subscriber, "call already on hold, ignoring hold request");
            slot.replace(redirected);
            return Ok(());
        }
        None => {
            warn!(aor = subscriber, "hold requested without a held call");
            return Ok(());
        }
    };

    let target = services.config.announcement.refer_target();
    let announcement = match send_refer(services, &active_peer, &target).await {
        Ok(refer) => refer,
        Err(e) => {
            // Caller stays parked so a later signal can still act on it.
            slot.replace(HeldCall::Parked(incoming));
            return Err(e);
        }
    };
    slot.replace(HeldCall::Redirected(announcement));

    services
        .platform
        .send_response(Response::for_request(&incoming, 200))
        .await?;

    let caller = AddressOfRecord::from_header(incoming.header("From"), "From")?;
    send_refer(services, subscriber_session, &caller.sip_uri()).await?;

    info!(
        aor = subscriber,
        caller = %caller,
        call_id = incoming.call_id(),
        "current call parked on announcement, held caller connected"
    );
    Ok(())
}

/// Sends the subscriber, its current peer and the held party to the
/// conference service.
///
/// The held party's REFER is addressed to whatever contact its remote AoR is
/// bound to at send time.
pub async fn conference(
    services: &ServiceRegistry,
    subscriber: &str,
    current: &Request,
) -> Result<(), CallControlError> {
    let mut slot = services.held_calls.lock(subscriber).await;
    let target = services.config.conference.refer_target();

    let session = &current.leg.session;
    let peer = services
        .platform
        .linked_session(session)
        .ok_or_else(|| CallControlError::NoLinkedSession(session.to_string()))?;

    send_refer(services, session, &target).await?;
    send_refer(services, &peer, &target).await?;

    let Some(held) = slot.take() else {
        warn!(aor = subscriber, "conference started without a held call");
        return Ok(());
    };

    let mut refer = services
        .platform
        .create_request(&held.request().leg.session, Method::Refer)?;
    refer.headers.set("Refer-To", target.as_str());

    let remote = AddressOfRecord::from_header(refer.header("To"), "To")?;
    match services.bindings.lookup(remote.aor()) {
        Some(contact) => refer.set_uri(contact),
        None => warn!(
            aor = subscriber,
            remote = %remote,
            "held party has no binding, keeping dialog target"
        ),
    }
    services.platform.send_request(refer).await?;

    info!(aor = subscriber, held = %remote, "three-way conference started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ControlSignal;

    #[test]
    fn digits_map_to_operations() {
        assert_eq!(ControlSignal::from_digit(1), Some(ControlSignal::Reject));
        assert_eq!(ControlSignal::from_digit(2), Some(ControlSignal::Hold));
        assert_eq!(ControlSignal::from_digit(3), Some(ControlSignal::Conference));
        assert_eq!(ControlSignal::from_digit(0), None);
        assert_eq!(ControlSignal::from_digit(9), None);
    }
}
