// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured SIP messages as handed over by the host stack.
//!
//! Parsing and serialization live outside this crate; the types here only
//! carry what the call-hold logic reads and writes, plus the [`LegRef`] that
//! ties every message back to a session and transaction owned by the host.

use std::fmt;

use bytes::Bytes;
use smol_str::SmolStr;

use crate::error::MessageError;
use crate::platform::LegRef;

const MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Request methods the service acts on.
///
/// Everything else the host delivers is carried verbatim in `Other` and
/// only ever mirrored to the linked leg.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Invite,
    Ack,
    Bye,
    Register,
    Info,
    Message,
    Refer,
    Other(SmolStr),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Invite => "INVITE",
            Method::Ack => "ACK",
            Method::Bye => "BYE",
            Method::Register => "REGISTER",
            Method::Info => "INFO",
            Method::Message => "MESSAGE",
            Method::Refer => "REFER",
            Method::Other(token) => token.as_str(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single header field as a name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: SmolStr,
    pub value: SmolStr,
}

/// Header collection preserving insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<Header>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header to the collection.
    pub fn push(&mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        self.0.push(Header {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Replaces every header called `name` with a single value.
    pub fn set(&mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let name = name.into();
        self.remove(&name);
        self.push(name, value);
    }

    /// Drops all headers called `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|h| !h.name.eq_ignore_ascii_case(name));
        before - self.0.len()
    }

    /// Finds the first header whose name matches ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&SmolStr> {
        self.0
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| &h.value)
    }

    /// Returns all headers with the given name, preserving original order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SmolStr> + 'a {
        self.0
            .iter()
            .filter(move |h| h.name.eq_ignore_ascii_case(name))
            .map(|h| &h.value)
    }
}

/// First line of a SIP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub uri: SmolStr,
}

impl RequestLine {
    pub fn new(method: Method, uri: impl Into<SmolStr>) -> Self {
        Self {
            method,
            uri: uri.into(),
        }
    }
}

/// First line of a SIP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    pub reason: SmolStr,
}

impl StatusLine {
    pub fn new(code: u16, reason: impl Into<SmolStr>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Canonical reason phrase for the status codes this service emits.
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100 => "Trying",
        180 => "Ringing",
        200 => "OK",
        202 => "Accepted",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        481 => "Call/Transaction Does Not Exist",
        486 => "Busy Here",
        500 => "Server Internal Error",
        501 => "Not Implemented",
        _ => "Unknown",
    }
}

/// Replaces the body and its Content-Type/Content-Length headers.
fn apply_body(
    headers: &mut Headers,
    body: &mut Bytes,
    new_body: Bytes,
    content_type: &str,
) -> Result<(), MessageError> {
    if new_body.len() > MAX_BODY_SIZE {
        return Err(MessageError::BodyTooLarge {
            max: MAX_BODY_SIZE,
            actual: new_body.len(),
        });
    }
    validate_content_type(content_type)?;

    headers.set("Content-Type", content_type);
    headers.set("Content-Length", new_body.len().to_string());
    *body = new_body;
    Ok(())
}

fn validate_content_type(value: &str) -> Result<(), MessageError> {
    let media = value.split(';').next().unwrap_or_default().trim();
    let well_formed = media
        .split_once('/')
        .is_some_and(|(ty, sub)| !ty.is_empty() && !sub.is_empty());
    if !well_formed || value.chars().any(|c| c.is_control()) {
        return Err(MessageError::InvalidContentType(value.to_owned()));
    }
    Ok(())
}

/// Inbound or locally built SIP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub start: RequestLine,
    pub headers: Headers,
    pub body: Bytes,
    /// Session and transaction this request belongs to in the host stack.
    pub leg: LegRef,
}

impl Request {
    pub fn new(start: RequestLine, headers: Headers, body: Bytes, leg: LegRef) -> Self {
        Self {
            start,
            headers,
            body,
            leg,
        }
    }

    pub fn method(&self) -> &Method {
        &self.start.method
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    /// Call-ID for log correlation.
    pub fn call_id(&self) -> &str {
        self.header("Call-ID").unwrap_or("unknown")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Sets the body together with its Content-Type.
    pub fn set_body(
        &mut self,
        body: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<(), MessageError> {
        apply_body(&mut self.headers, &mut self.body, body.into(), content_type)
    }

    pub fn set_uri(&mut self, uri: impl Into<SmolStr>) {
        self.start.uri = uri.into();
    }

    /// True when the To header carries no tag, i.e. the request opens a dialog.
    pub fn is_initial(&self) -> bool {
        self.header("To")
            .map(|to| !has_tag_param(to))
            .unwrap_or(true)
    }
}

fn has_tag_param(value: &str) -> bool {
    // Parameters after the closing bracket belong to the header, not the URI.
    let params = value.rsplit_once('>').map(|(_, p)| p).unwrap_or(value);
    params
        .split(';')
        .skip(1)
        .any(|p| p.trim().to_ascii_lowercase().starts_with("tag="))
}

/// Inbound or locally built SIP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub start: StatusLine,
    pub headers: Headers,
    pub body: Bytes,
    /// Leg of the request this response answers.
    pub leg: LegRef,
}

impl Response {
    pub fn new(start: StatusLine, headers: Headers, body: Bytes, leg: LegRef) -> Self {
        Self {
            start,
            headers,
            body,
            leg,
        }
    }

    /// Builds a response to `request` on its own transaction.
    ///
    /// Via, From, To, Call-ID and CSeq are copied from the request and the
    /// canonical reason phrase for `code` is used.
    pub fn for_request(request: &Request, code: u16) -> Self {
        Self::with_reason(request, code, reason_phrase(code))
    }

    /// Like [`Response::for_request`] with an explicit reason phrase.
    pub fn with_reason(request: &Request, code: u16, reason: &str) -> Self {
        let mut headers = Headers::new();

        for via in request.headers.get_all("Via") {
            headers.push("Via", via.clone());
        }
        for name in ["From", "To", "Call-ID", "CSeq"] {
            if let Some(value) = request.headers.get(name) {
                headers.push(name, value.clone());
            }
        }
        headers.push("Content-Length", "0");

        Self::new(
            StatusLine::new(code, reason),
            headers,
            Bytes::new(),
            request.leg.clone(),
        )
    }

    pub fn code(&self) -> u16 {
        self.start.code
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|v| v.as_str())
    }

    pub fn call_id(&self) -> &str {
        self.header("Call-ID").unwrap_or("unknown")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn set_body(
        &mut self,
        body: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<(), MessageError> {
        apply_body(&mut self.headers, &mut self.body, body.into(), content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{SessionId, TransactionId};

    fn leg() -> LegRef {
        LegRef::new(SessionId::new("s1"), TransactionId::new("t1"))
    }

    fn request(to: &str) -> Request {
        let mut headers = Headers::new();
        headers.push("Via", "SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK1");
        headers.push("From", "<sip:alice@acme.pt>;tag=a1");
        headers.push("To", to);
        headers.push("Call-ID", "call-1");
        headers.push("CSeq", "1 INVITE");
        Request::new(
            RequestLine::new(Method::Invite, "sip:bob@acme.pt"),
            headers,
            Bytes::new(),
            leg(),
        )
    }

    #[test]
    fn other_methods_keep_their_token() {
        assert_eq!(Method::Other(SmolStr::new("UPDATE")).to_string(), "UPDATE");
        assert_eq!(Method::Refer.as_str(), "REFER");
    }

    #[test]
    fn headers_set_replaces_all_values() {
        let mut headers = Headers::new();
        headers.push("Refer-To", "sip:a@acme.pt");
        headers.push("refer-to", "sip:b@acme.pt");
        headers.set("Refer-To", "sip:c@acme.pt");
        assert_eq!(headers.get_all("Refer-To").count(), 1);
        assert_eq!(headers.get("REFER-TO").unwrap(), "sip:c@acme.pt");
    }

    #[test]
    fn response_copies_dialog_headers() {
        let req = request("<sip:bob@acme.pt>");
        let resp = Response::for_request(&req, 486);
        assert_eq!(resp.code(), 486);
        assert_eq!(resp.start.reason, "Busy Here");
        assert_eq!(resp.header("Call-ID"), Some("call-1"));
        assert_eq!(resp.header("CSeq"), Some("1 INVITE"));
        assert_eq!(resp.leg, req.leg);
    }

    #[test]
    fn initial_requests_have_no_to_tag() {
        assert!(request("<sip:bob@acme.pt>").is_initial());
        assert!(!request("<sip:bob@acme.pt>;tag=b7").is_initial());
    }

    #[test]
    fn set_body_rejects_bad_content_type() {
        let mut req = request("<sip:bob@acme.pt>");
        assert!(req.set_body("hello", "text").is_err());
        assert!(req.set_body("hello", "text/plain\r\nX: y").is_err());
        assert!(req.body.is_empty());

        req.set_body("hello", "text/plain").unwrap();
        assert_eq!(req.content_type(), Some("text/plain"));
        assert_eq!(req.header("Content-Length"), Some("5"));
    }
}
