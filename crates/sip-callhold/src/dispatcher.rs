// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Event dispatcher that routes inbound SIP traffic to the handlers.
use std::sync::Arc;

use tracing::{instrument, warn};

use crate::address::{AddressOfRecord, ContactBinding};
use crate::handlers::{bye, info, invite, register, request as generic, response};
use crate::msg::{Method, Request, Response};
use crate::services::ServiceRegistry;

/// Inbound protocol event, classified by what the service does with it.
#[derive(Debug, Clone)]
pub enum SipEvent {
    Register(Request),
    NewCall(Request),
    InDialogInfo(Request),
    SessionEnd(Request),
    GenericRequest(Request),
    /// Final response of 300 or above.
    ErrorResponse(Response),
    GenericResponse(Response),
}

impl From<Request> for SipEvent {
    fn from(request: Request) -> Self {
        match request.method() {
            Method::Register => SipEvent::Register(request),
            Method::Invite if request.is_initial() => SipEvent::NewCall(request),
            Method::Info => SipEvent::InDialogInfo(request),
            Method::Bye => SipEvent::SessionEnd(request),
            _ => SipEvent::GenericRequest(request),
        }
    }
}

impl From<Response> for SipEvent {
    fn from(response: Response) -> Self {
        if response.code() >= 300 {
            SipEvent::ErrorResponse(response)
        } else {
            SipEvent::GenericResponse(response)
        }
    }
}

/// Why a request was refused before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screening {
    Malformed,
    CrossDomain,
}

impl Screening {
    fn status(self) -> u16 {
        match self {
            Screening::Malformed => 400,
            Screening::CrossDomain => 403,
        }
    }
}

/// Single entry point for everything the host stack delivers.
#[derive(Clone)]
pub struct EventDispatcher {
    services: Arc<ServiceRegistry>,
}

impl EventDispatcher {
    pub fn new(services: Arc<ServiceRegistry>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    /// Classifies and dispatches an inbound request.
    #[instrument(skip_all, fields(call_id = request.call_id(), method = %request.method()))]
    pub async fn on_request(&self, request: Request) {
        self.dispatch(SipEvent::from(request)).await;
    }

    /// Classifies and dispatches an inbound response.
    #[instrument(skip_all, fields(call_id = response.call_id(), code = response.code()))]
    pub async fn on_response(&self, response: Response) {
        self.dispatch(SipEvent::from(response)).await;
    }

    /// Runs the handler for `event`.
    ///
    /// Requests are screened first: malformed From/To/Contact headers are
    /// answered 400 and requests with either end outside the administrative
    /// domain are answered 403. Handler failures are logged, never raised.
    pub async fn dispatch(&self, event: SipEvent) {
        let services = self.services.as_ref();

        let outcome = match &event {
            SipEvent::ErrorResponse(resp) => response::handle_error(resp, services).await,
            SipEvent::GenericResponse(resp) => response::handle_other(resp, services).await,
            SipEvent::Register(req)
            | SipEvent::NewCall(req)
            | SipEvent::InDialogInfo(req)
            | SipEvent::SessionEnd(req)
            | SipEvent::GenericRequest(req) => {
                if !self.admit(req).await {
                    return;
                }
                match &event {
                    SipEvent::Register(_) => register::handle(req, services).await,
                    SipEvent::NewCall(_) => invite::handle(req, services).await,
                    SipEvent::InDialogInfo(_) => info::handle(req, services).await,
                    SipEvent::SessionEnd(_) => bye::handle(req, services).await,
                    _ => generic::handle(req, services).await,
                }
            }
        };

        if let Err(e) = outcome {
            warn!(event = event.kind(), error = %e, "handler failed to process event");
        }
    }

    /// Applies the domain policy, answering refused requests.
    async fn admit(&self, request: &Request) -> bool {
        let Err(refusal) = self.screen(request) else {
            return true;
        };

        warn!(reason = ?refusal, "request refused");
        if *request.method() == Method::Ack {
            return false;
        }
        let reply = Response::for_request(request, refusal.status());
        if let Err(e) = self.services.platform.send_response(reply).await {
            warn!(error = %e, "failed to send refusal");
        }
        false
    }

    fn screen(&self, request: &Request) -> Result<(), Screening> {
        let to = AddressOfRecord::from_header(request.header("To"), "To");
        let from = AddressOfRecord::from_header(request.header("From"), "From");
        let (Ok(to), Ok(from)) = (to, from) else {
            return Err(Screening::Malformed);
        };
        if let Some(contact) = request.header("Contact") {
            ContactBinding::parse(contact).map_err(|_| Screening::Malformed)?;
        }

        let config = &self.services.config;
        if config.is_local_domain(to.domain()) && config.is_local_domain(from.domain()) {
            Ok(())
        } else {
            Err(Screening::CrossDomain)
        }
    }
}

impl SipEvent {
    fn kind(&self) -> &'static str {
        match self {
            SipEvent::Register(_) => "register",
            SipEvent::NewCall(_) => "new-call",
            SipEvent::InDialogInfo(_) => "info",
            SipEvent::SessionEnd(_) => "session-end",
            SipEvent::GenericRequest(_) => "request",
            SipEvent::ErrorResponse(_) => "error-response",
            SipEvent::GenericResponse(_) => "response",
        }
    }
}
