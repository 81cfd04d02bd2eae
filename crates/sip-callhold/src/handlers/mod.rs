// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Per-event handlers invoked by the dispatcher.
///
/// Each handler:
/// 1. Reads the message and any shared state it needs
/// 2. Updates the registries
/// 3. Sends its replies through the platform
///
/// Errors returned here are logged by the dispatcher; every protocol-visible
/// reply has already been sent by then.

pub mod bye;
pub mod info;
pub mod invite;
pub mod register;
pub mod request;
pub mod response;
