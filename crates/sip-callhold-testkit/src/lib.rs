// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test harness for the call-hold service.
//!
//! Provides builders for the requests the service consumes and
//! [`RecordingPlatform`], an in-memory B2BUA host that keeps session and
//! transaction links and records everything the service sends.
//!
//! # Example
//! ```
//! use sip_callhold::Method;
//! use sip_callhold_testkit::RecordingPlatform;
//!
//! let platform = RecordingPlatform::new();
//! let caller = platform.open_session("bob@acme.pt", "dave@acme.pt");
//! let invite = platform.incoming(&caller, Method::Invite, "sip:bob@acme.pt");
//! assert!(invite.is_initial());
//! assert_eq!(invite.header("From"), Some("<sip:dave@acme.pt>;tag=s0-r"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use smol_str::SmolStr;

use sip_callhold::{
    B2buaPlatform, CallHoldConfig, EventDispatcher, Headers, LegRef, Method, PlatformError,
    Request, RequestLine, Response, ServiceRegistry, SessionId, TransactionId,
};

/// Installs a test tracing subscriber honouring `RUST_LOG`; safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Formats an AoR as an identity header value with a tag.
pub fn identity(aor: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => format!("<sip:{aor}>;tag={tag}"),
        None => format!("<sip:{aor}>"),
    }
}

/// Constructs a request with the headers the service reads.
pub fn build_request(method: Method, uri: &str, from: &str, to: &str, leg: LegRef) -> Request {
    let mut headers = Headers::new();
    headers.push(
        "Via",
        format!(
            "SIP/2.0/UDP client.acme.pt:5060;branch=z9hG4bK{}",
            leg.transaction
        ),
    );
    headers.push("From", from);
    headers.push("To", to);
    headers.push("Call-ID", format!("{}@acme.pt", leg.session));
    headers.push("CSeq", format!("1 {}", method.as_str()));
    headers.push("Max-Forwards", "70");
    headers.push("Content-Length", "0");

    Request::new(RequestLine::new(method, uri), headers, Bytes::new(), leg)
}

/// Constructs a REGISTER for `aor` binding `contact` (a full Contact header value).
pub fn build_register(aor: &str, contact: &str, leg: LegRef) -> Request {
    let mut request = build_request(
        Method::Register,
        "sip:acme.pt",
        &identity(aor, Some("reg")),
        &identity(aor, None),
        leg,
    );
    request.headers.push("Contact", contact);
    request
}

/// Constructs a response to `request` as the remote party would send it.
pub fn build_response(request: &Request, code: u16, reason: &str) -> Response {
    let mut response = Response::with_reason(request, code, reason);
    if request.is_initial() {
        if let Some(to) = request.header("To") {
            response
                .headers
                .set("To", format!("{to};tag=remote-{}", request.leg.session));
        }
    }
    response
}

#[derive(Debug, Clone)]
struct SessionInfo {
    /// AoR this side presents on requests created in the session.
    local: SmolStr,
    /// AoR of the party at the other end of the session.
    remote: SmolStr,
}

/// In-memory B2BUA host that records every message the service sends.
#[derive(Default)]
pub struct RecordingPlatform {
    next_id: AtomicU64,
    sessions: DashMap<SessionId, SessionInfo>,
    session_links: DashMap<SessionId, SessionId>,
    requests: DashMap<TransactionId, Request>,
    transaction_links: DashMap<TransactionId, TransactionId>,
    sent_requests: Mutex<Vec<Request>>,
    sent_responses: Mutex<Vec<Response>>,
    linked_calls: Mutex<Vec<Request>>,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Opens a session in which this side is `local` talking to `remote`.
    pub fn open_session(&self, local: &str, remote: &str) -> SessionId {
        let id = SessionId::new(self.next("s"));
        self.sessions.insert(
            id.clone(),
            SessionInfo {
                local: SmolStr::new(local),
                remote: SmolStr::new(remote),
            },
        );
        id
    }

    /// Links two sessions as the legs of one call.
    pub fn link_sessions(&self, a: &SessionId, b: &SessionId) {
        self.session_links.insert(a.clone(), b.clone());
        self.session_links.insert(b.clone(), a.clone());
    }

    /// Links two transactions, remembering both requests.
    pub fn link_requests(&self, a: &Request, b: &Request) {
        self.remember(a);
        self.remember(b);
        self.transaction_links
            .insert(a.leg.transaction.clone(), b.leg.transaction.clone());
        self.transaction_links
            .insert(b.leg.transaction.clone(), a.leg.transaction.clone());
    }

    /// Fresh transaction inside `session`.
    pub fn new_leg(&self, session: &SessionId) -> LegRef {
        LegRef::new(session.clone(), TransactionId::new(self.next("t")))
    }

    fn remember(&self, request: &Request) {
        self.requests
            .insert(request.leg.transaction.clone(), request.clone());
    }

    fn session(&self, id: &SessionId) -> Result<SessionInfo, PlatformError> {
        self.sessions
            .get(id)
            .map(|s| s.value().clone())
            .ok_or_else(|| PlatformError::UnknownSession(id.to_string()))
    }

    /// Builds a request arriving from the remote party of `session`.
    ///
    /// INVITEs are initial (no To tag); other methods are in-dialog.
    pub fn incoming(&self, session: &SessionId, method: Method, uri: &str) -> Request {
        let info = self
            .sessions
            .get(session)
            .map(|s| s.value().clone())
            .unwrap_or_else(|| panic!("unknown session {session}"));
        let to_tag = (method != Method::Invite).then(|| session.as_str().to_owned());
        let request = build_request(
            method,
            uri,
            &identity(&info.remote, Some(&format!("{session}-r"))),
            &identity(&info.local, to_tag.as_deref()),
            self.new_leg(session),
        );
        self.remember(&request);
        request
    }

    /// Builds an INFO control request from the remote party of `session`.
    pub fn incoming_info(&self, session: &SessionId, body: &str) -> Request {
        let mut info = self.incoming(session, Method::Info, "sip:callhold@acme.pt");
        info.set_body(body.to_owned(), "application/dtmf-relay")
            .expect("valid body");
        self.remember(&info);
        info
    }

    fn build_local(
        &self,
        session: &SessionId,
        method: Method,
        uri: &str,
    ) -> Result<Request, PlatformError> {
        let info = self.session(session)?;
        let request = build_request(
            method,
            uri,
            &identity(&info.local, Some(&format!("{session}-l"))),
            &identity(&info.remote, Some(&format!("{session}-r"))),
            self.new_leg(session),
        );
        self.remember(&request);
        Ok(request)
    }

    pub fn sent_requests(&self) -> Vec<Request> {
        self.sent_requests.lock().clone()
    }

    pub fn sent_responses(&self) -> Vec<Response> {
        self.sent_responses.lock().clone()
    }

    pub fn requests_with_method(&self, method: Method) -> Vec<Request> {
        self.sent_requests
            .lock()
            .iter()
            .filter(|r| *r.method() == method)
            .cloned()
            .collect()
    }

    pub fn responses_with_code(&self, code: u16) -> Vec<Response> {
        self.sent_responses
            .lock()
            .iter()
            .filter(|r| r.code() == code)
            .cloned()
            .collect()
    }

    /// Outbound INVITEs created through `create_linked_call`.
    pub fn linked_calls(&self) -> Vec<Request> {
        self.linked_calls.lock().clone()
    }

    /// Forgets everything sent so far.
    pub fn clear_sent(&self) {
        self.sent_requests.lock().clear();
        self.sent_responses.lock().clear();
    }
}

#[async_trait]
impl B2buaPlatform for RecordingPlatform {
    fn create_linked_call(
        &self,
        original: &Request,
        target: &str,
    ) -> Result<Request, PlatformError> {
        if !target.starts_with("sip:") {
            return Err(PlatformError::InvalidUri(target.to_owned()));
        }
        let from = original.header("From").unwrap_or_default();
        let to = original.header("To").unwrap_or_default();
        let caller = sip_callhold::AddressOfRecord::parse(from)
            .map_err(|e| PlatformError::Send(e.to_string()))?;
        let callee = sip_callhold::AddressOfRecord::parse(to)
            .map_err(|e| PlatformError::Send(e.to_string()))?;

        let session = self.open_session(caller.aor(), callee.aor());
        self.link_sessions(&original.leg.session, &session);

        let outbound = build_request(Method::Invite, target, from, to, self.new_leg(&session));
        self.link_requests(original, &outbound);
        self.linked_calls.lock().push(outbound.clone());
        Ok(outbound)
    }

    fn linked_session(&self, session: &SessionId) -> Option<SessionId> {
        self.session_links.get(session).map(|s| s.value().clone())
    }

    fn linked_request(&self, leg: &LegRef) -> Option<Request> {
        let peer = self.transaction_links.get(&leg.transaction)?.value().clone();
        self.requests.get(&peer).map(|r| r.value().clone())
    }

    fn create_linked_request(
        &self,
        session: &SessionId,
        original: &Request,
    ) -> Result<Request, PlatformError> {
        let uri = self.session(session)?.remote;
        let request = self.build_local(session, original.method().clone(), &format!("sip:{uri}"))?;
        self.link_requests(original, &request);
        Ok(request)
    }

    fn create_request(
        &self,
        session: &SessionId,
        method: Method,
    ) -> Result<Request, PlatformError> {
        let uri = self.session(session)?.remote;
        self.build_local(session, method, &format!("sip:{uri}"))
    }

    fn create_standalone_request(
        &self,
        method: Method,
        from: &str,
        to: &str,
    ) -> Result<Request, PlatformError> {
        let local = from.trim_start_matches("sip:");
        let remote = to.trim_start_matches("sip:");
        let session = self.open_session(local, remote);
        let request = build_request(
            method,
            to,
            &identity(local, Some(&format!("{session}-l"))),
            &format!("<{to}>"),
            self.new_leg(&session),
        );
        self.remember(&request);
        Ok(request)
    }

    fn create_ack(&self, response: &Response) -> Result<Request, PlatformError> {
        let original = self
            .requests
            .get(&response.leg.transaction)
            .map(|r| r.value().clone())
            .ok_or_else(|| {
                PlatformError::UnknownTransaction(response.leg.transaction.to_string())
            })?;
        let mut ack = build_request(
            Method::Ack,
            original.start.uri.as_str(),
            original.header("From").unwrap_or_default(),
            response.header("To").unwrap_or_default(),
            response.leg.clone(),
        );
        ack.headers.set("CSeq", "1 ACK");
        Ok(ack)
    }

    async fn send_request(&self, request: Request) -> Result<(), PlatformError> {
        self.sent_requests.lock().push(request);
        Ok(())
    }

    async fn send_response(&self, response: Response) -> Result<(), PlatformError> {
        self.sent_responses.lock().push(response);
        Ok(())
    }
}

/// Service wired to a [`RecordingPlatform`] with the reference configuration.
pub struct Harness {
    pub platform: Arc<RecordingPlatform>,
    pub services: Arc<ServiceRegistry>,
    pub dispatcher: EventDispatcher,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(CallHoldConfig::default())
    }

    pub fn with_config(config: CallHoldConfig) -> Self {
        init_tracing();
        let platform = Arc::new(RecordingPlatform::new());
        let services = Arc::new(ServiceRegistry::new(
            config,
            Arc::clone(&platform) as Arc<dyn B2buaPlatform>,
        ));
        let dispatcher = EventDispatcher::new(Arc::clone(&services));
        Self {
            platform,
            services,
            dispatcher,
        }
    }

    /// Registers `aor` at `contact` through the dispatcher.
    pub async fn register(&self, aor: &str, contact: &str) {
        let session = self.platform.open_session("registrar@acme.pt", aor);
        let request = build_register(aor, &format!("<{contact}>"), self.platform.new_leg(&session));
        self.dispatcher.on_request(request).await;
    }

    /// Sets up an established call: `caller` → B2BUA → `callee`.
    ///
    /// Returns the caller-side and callee-side sessions, linked together.
    pub fn established_call(&self, caller: &str, callee: &str) -> (SessionId, SessionId) {
        let caller_side = self.platform.open_session(callee, caller);
        let callee_side = self.platform.open_session(caller, callee);
        self.platform.link_sessions(&caller_side, &callee_side);
        (caller_side, callee_side)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
