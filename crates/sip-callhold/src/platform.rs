// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Capability interface onto the host B2BUA stack.
//!
//! The host owns sockets, transactions, retransmission and dialog state.
//! The call-hold service only asks it to create and send messages and to
//! answer questions about which legs are linked together.

use std::fmt;

use async_trait::async_trait;
use smol_str::SmolStr;

use crate::error::PlatformError;
use crate::msg::{Method, Request, Response};

/// Opaque identifier of a SIP session (one side of a call) in the host stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(SmolStr);

impl SessionId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a transaction in the host stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionId(SmolStr);

impl TransactionId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a message lives: its session and the transaction it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegRef {
    pub session: SessionId,
    pub transaction: TransactionId,
}

impl LegRef {
    pub fn new(session: SessionId, transaction: TransactionId) -> Self {
        Self {
            session,
            transaction,
        }
    }
}

/// Operations the call-hold service needs from the host B2BUA stack.
///
/// Every call leg has exactly one linked leg for the lifetime of the call.
/// Implementations keep that relation and assign a [`LegRef`] to each
/// request they create. Sending is fire-and-forget: the outcome of a sent
/// request arrives later as a separate inbound response.
#[async_trait]
pub trait B2buaPlatform: Send + Sync {
    /// Creates the outbound INVITE for `original`, addressed to `target` and
    /// linked to it (sessions and transactions).
    fn create_linked_call(&self, original: &Request, target: &str)
        -> Result<Request, PlatformError>;

    /// Session linked to `session`, if any.
    fn linked_session(&self, session: &SessionId) -> Option<SessionId>;

    /// Request on the peer leg linked to the transaction identified by `leg`.
    fn linked_request(&self, leg: &LegRef) -> Option<Request>;

    /// Creates a copy of `original` (same method) inside `session`, linking
    /// the two transactions. Body and Content-Type are not copied.
    fn create_linked_request(
        &self,
        session: &SessionId,
        original: &Request,
    ) -> Result<Request, PlatformError>;

    /// Creates a new in-dialog request on `session`.
    fn create_request(&self, session: &SessionId, method: Method)
        -> Result<Request, PlatformError>;

    /// Creates an out-of-dialog request in a fresh session.
    fn create_standalone_request(
        &self,
        method: Method,
        from: &str,
        to: &str,
    ) -> Result<Request, PlatformError>;

    /// Creates the ACK for a 2xx response to an INVITE sent by us.
    fn create_ack(&self, response: &Response) -> Result<Request, PlatformError>;

    async fn send_request(&self, request: Request) -> Result<(), PlatformError>;

    async fn send_response(&self, response: Response) -> Result<(), PlatformError>;
}
