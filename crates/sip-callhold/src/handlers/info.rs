// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// INFO request handler (subscriber control signals).
///
/// INFO from a subscriber carries `Signal=N` in its body and selects what to
/// do with the held call. INFO from anyone else is acknowledged and ignored.
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::address::AddressOfRecord;
use crate::call_control::{self, ControlSignal};
use crate::error::SignalError;
use crate::msg::{Request, Response};
use crate::services::ServiceRegistry;

static SIGNAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Signal=([0-9])").expect("signal regex"));

/// Extracts the digit following `Signal=` in a control body.
pub fn parse_signal(body: &[u8]) -> Result<u8, SignalError> {
    let text = std::str::from_utf8(body).map_err(|_| SignalError::InvalidEncoding)?;
    SIGNAL_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .ok_or(SignalError::MissingSignal)
}

pub async fn handle(request: &Request, services: &ServiceRegistry) -> Result<()> {
    let call_id = request.call_id();
    let platform = &services.platform;

    let sender = AddressOfRecord::from_header(request.header("From"), "From")?;

    if services.config.is_subscriber(sender.username()) {
        let digit = match parse_signal(&request.body) {
            Ok(digit) => digit,
            Err(e) => {
                warn!(call_id, sender = %sender, error = %e, "malformed control signal");
                platform
                    .send_response(Response::for_request(request, 400))
                    .await?;
                return Ok(());
            }
        };

        let outcome = match ControlSignal::from_digit(digit) {
            Some(ControlSignal::Reject) => call_control::reject(services, sender.aor()).await,
            Some(ControlSignal::Hold) => {
                call_control::hold(services, sender.aor(), request).await
            }
            Some(ControlSignal::Conference) => {
                call_control::conference(services, sender.aor(), request).await
            }
            None => {
                info!(call_id, sender = %sender, digit, "unassigned control signal");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            warn!(call_id, sender = %sender, digit, error = %e, "call control failed");
        }
    }

    platform
        .send_response(Response::for_request(request, 200))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_digit() {
        assert_eq!(parse_signal(b"Signal=2"), Ok(2));
        assert_eq!(parse_signal(b"Signal=3\r\nDuration=250\r\n"), Ok(3));
        assert_eq!(parse_signal(b"Signal=17"), Ok(1));
    }

    #[test]
    fn rejects_missing_or_non_numeric_signal() {
        assert_eq!(parse_signal(b""), Err(SignalError::MissingSignal));
        assert_eq!(parse_signal(b"Signal=*"), Err(SignalError::MissingSignal));
        assert_eq!(parse_signal(b"signal=1"), Err(SignalError::MissingSignal));
        assert_eq!(parse_signal(&[0xff, 0xfe]), Err(SignalError::InvalidEncoding));
    }
}
