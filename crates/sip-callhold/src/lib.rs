// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Call-hold service for a SIP back-to-back user agent.
//!
//! Subscribers on a small allow-list who are already on a call get a text
//! prompt when somebody else calls them. Replying with an INFO carrying
//! `Signal=1`, `Signal=2` or `Signal=3` rejects the new call, parks the
//! current call on an announcement and takes the new one, or merges all
//! three parties on a conference service.
//!
//! The host B2BUA stack is reached through [`B2buaPlatform`]; it delivers
//! every inbound request and response to an [`EventDispatcher`].
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use sip_callhold::{B2buaPlatform, CallHoldConfig, EventDispatcher, ServiceRegistry};
//!
//! # fn platform() -> Arc<dyn B2buaPlatform> { unimplemented!() }
//! let services = Arc::new(ServiceRegistry::new(CallHoldConfig::default(), platform()));
//! let dispatcher = EventDispatcher::new(services);
//! # let _ = dispatcher;
//! ```

pub mod address;
pub mod bindings;
pub mod call_control;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod held_calls;
pub mod msg;
pub mod platform;
pub mod services;

pub use address::{AddressOfRecord, ContactBinding};
pub use bindings::{BindingChange, BindingRegistry};
pub use call_control::ControlSignal;
pub use config::{CallHoldConfig, ServiceBinding};
pub use dispatcher::{EventDispatcher, SipEvent};
pub use error::{
    AddressError, CallControlError, ConfigError, MessageError, PlatformError, SignalError,
};
pub use held_calls::{HeldCall, HeldCallRegistry};
pub use msg::{Header, Headers, Method, Request, RequestLine, Response, StatusLine};
pub use platform::{B2buaPlatform, LegRef, SessionId, TransactionId};
pub use services::ServiceRegistry;
