// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Extraction of addresses-of-record and contact bindings from header text.
//!
//! Only the bracketed `<sip:...>` forms used by the service are accepted:
//! identity headers (From/To) as `<sip:user@domain>` and contact headers as
//! `<sip:user@a.b.c.d:port>` with an optional `expires=N` parameter.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use smol_str::SmolStr;

use crate::error::AddressError;

static IDENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<sip:([^@<>]+)@([^@<>]+)>").expect("identity regex"));

static CONTACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(sip:[^@<>]+@[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}:[0-9]{1,5})>")
        .expect("contact regex")
});

static EXPIRES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"expires=([0-9]+)").expect("expires regex"));

/// Canonical `user@domain` identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressOfRecord {
    username: SmolStr,
    domain: SmolStr,
    aor: SmolStr,
}

impl AddressOfRecord {
    /// Parses an identity header value such as `"Bob" <sip:bob@acme.pt>;tag=9`.
    pub fn parse(header: &str) -> Result<Self, AddressError> {
        let caps = IDENTITY_RE
            .captures(header)
            .ok_or_else(|| AddressError::MalformedIdentity(header.to_owned()))?;
        let username = &caps[1];
        let domain = &caps[2];

        Ok(Self {
            username: SmolStr::new(username),
            domain: SmolStr::new(domain),
            aor: SmolStr::new(format!("{username}@{domain}")),
        })
    }

    /// Parses the named identity header of a message.
    pub fn from_header(value: Option<&str>, name: &'static str) -> Result<Self, AddressError> {
        value
            .ok_or(AddressError::MissingHeader(name))
            .and_then(Self::parse)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The `user@domain` key.
    pub fn aor(&self) -> &str {
        &self.aor
    }

    /// `sip:user@domain`, as used in Refer-To.
    pub fn sip_uri(&self) -> String {
        format!("sip:{}", self.aor)
    }
}

impl fmt::Display for AddressOfRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.aor)
    }
}

/// Contact URI and optional expiry taken from a Contact header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactBinding {
    contact: SmolStr,
    expires: Option<u64>,
}

impl ContactBinding {
    /// Parses a contact header value such as `<sip:bob@10.0.0.1:5080>;expires=3600`.
    ///
    /// When the text mentions `expires` at all, a numeric `expires=N` must be
    /// present.
    pub fn parse(header: &str) -> Result<Self, AddressError> {
        let caps = CONTACT_RE
            .captures(header)
            .ok_or_else(|| AddressError::MalformedContact(header.to_owned()))?;
        let contact = SmolStr::new(&caps[1]);

        let expires = if header.contains("expires") {
            let digits = EXPIRES_RE
                .captures(header)
                .ok_or_else(|| AddressError::MalformedExpires(header.to_owned()))?;
            // Only digits match, so the one failure is overflow; clamp it.
            let value = digits[1].parse::<u64>().unwrap_or(u64::MAX);
            Some(value)
        } else {
            None
        };

        Ok(Self { contact, expires })
    }

    /// Parses a message's Contact header, which must be present.
    pub fn from_header(value: Option<&str>) -> Result<Self, AddressError> {
        value
            .ok_or(AddressError::MissingHeader("Contact"))
            .and_then(Self::parse)
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn expires(&self) -> Option<u64> {
        self.expires
    }

    /// True for a zero expiry, which removes the binding.
    pub fn is_removal(&self) -> bool {
        self.expires == Some(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identity_with_display_name_and_tag() {
        let aor = AddressOfRecord::parse("\"Bob\" <sip:bob@acme.pt>;tag=7a").unwrap();
        assert_eq!(aor.username(), "bob");
        assert_eq!(aor.domain(), "acme.pt");
        assert_eq!(aor.aor(), "bob@acme.pt");
        assert_eq!(aor.sip_uri(), "sip:bob@acme.pt");
    }

    #[test]
    fn rejects_identity_without_brackets() {
        let err = AddressOfRecord::parse("sip:bob@acme.pt").unwrap_err();
        assert!(matches!(err, AddressError::MalformedIdentity(_)));
        assert!(AddressOfRecord::parse("<sip:acme.pt>").is_err());
        assert!(AddressOfRecord::parse("<tel:+351210000000>").is_err());
    }

    #[test]
    fn missing_header_is_reported() {
        let err = AddressOfRecord::from_header(None, "From").unwrap_err();
        assert_eq!(err, AddressError::MissingHeader("From"));
    }

    #[test]
    fn parses_contact_without_expiry() {
        let binding = ContactBinding::parse("<sip:bob@10.0.0.1:5080>").unwrap();
        assert_eq!(binding.contact(), "sip:bob@10.0.0.1:5080");
        assert_eq!(binding.expires(), None);
        assert!(!binding.is_removal());
    }

    #[test]
    fn parses_contact_expiry() {
        let binding = ContactBinding::parse("<sip:bob@10.0.0.1:5080>;expires=0").unwrap();
        assert_eq!(binding.expires(), Some(0));
        assert!(binding.is_removal());

        let binding = ContactBinding::parse("<sip:bob@10.0.0.1:5080>;expires=3600").unwrap();
        assert_eq!(binding.expires(), Some(3600));
    }

    #[test]
    fn contact_requires_ip_and_port() {
        assert!(ContactBinding::parse("<sip:bob@host.acme.pt:5080>").is_err());
        assert!(ContactBinding::parse("<sip:bob@10.0.0.1>").is_err());
    }

    #[test]
    fn oversized_expiry_is_kept_as_a_binding() {
        let binding = ContactBinding::parse("<sip:bob@10.0.0.1:5080>;expires=4294967296").unwrap();
        assert_eq!(binding.expires(), Some(4_294_967_296));
        assert!(!binding.is_removal());

        let huge = "<sip:bob@10.0.0.1:5080>;expires=99999999999999999999999";
        let binding = ContactBinding::parse(huge).unwrap();
        assert_eq!(binding.expires(), Some(u64::MAX));
        assert!(!binding.is_removal());
    }

    #[test]
    fn non_numeric_expires_is_rejected() {
        let err = ContactBinding::parse("<sip:bob@10.0.0.1:5080>;expires=soon").unwrap_err();
        assert!(matches!(err, AddressError::MalformedExpires(_)));
    }
}
