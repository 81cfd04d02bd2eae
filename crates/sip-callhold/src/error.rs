// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::path::PathBuf;

use thiserror::Error;

/// Identity or contact header did not have the expected structured form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("malformed identity header: {0:?}")]
    MalformedIdentity(String),
    #[error("malformed contact header: {0:?}")]
    MalformedContact(String),
    #[error("malformed expires parameter in contact header: {0:?}")]
    MalformedExpires(String),
    #[error("missing {0} header")]
    MissingHeader(&'static str),
}

/// Control signal body could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("control signal body is not valid UTF-8")]
    InvalidEncoding,
    #[error("control signal marker \"Signal=\" followed by a digit not found")]
    MissingSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("body too large (max {max}, got {actual})")]
    BodyTooLarge { max: usize, actual: usize },
    #[error("invalid content type: {0:?}")]
    InvalidContentType(String),
}

/// Failures reported by the host B2BUA stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("unknown session {0}")]
    UnknownSession(String),
    #[error("unknown transaction {0}")]
    UnknownTransaction(String),
    #[error("invalid target URI {0:?}")]
    InvalidUri(String),
    #[error("send failed: {0}")]
    Send(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failure while running a reject, hold or conference operation.
#[derive(Debug, Error)]
pub enum CallControlError {
    #[error("no session linked to {0}")]
    NoLinkedSession(String),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}
