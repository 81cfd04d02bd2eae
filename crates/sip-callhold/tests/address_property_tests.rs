// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use proptest::prelude::*;
use sip_callhold::handlers::info::parse_signal;
use sip_callhold::{AddressOfRecord, ContactBinding};

proptest! {
    /// Identity headers parse regardless of display name and parameters.
    #[test]
    fn identity_extracts_user_and_domain(
        user in "[a-z][a-z0-9._-]{0,12}",
        domain in "[a-z]{2,10}\\.[a-z]{2,3}",
        display in proptest::option::of("[A-Za-z ]{1,12}"),
        tag in proptest::option::of("[a-zA-Z0-9]{1,10}"),
    ) {
        let display_part = display.map(|d| format!("\"{d}\" ")).unwrap_or_default();
        let tag_part = tag.map(|t| format!(";tag={t}")).unwrap_or_default();
        let header = format!("{display_part}<sip:{user}@{domain}>{tag_part}");

        let aor = AddressOfRecord::parse(&header).expect("parse");
        prop_assert_eq!(aor.username(), user.as_str());
        prop_assert_eq!(aor.domain(), domain.as_str());
        prop_assert_eq!(aor.aor(), format!("{user}@{domain}"));
    }

    /// Without angle brackets nothing is an identity.
    #[test]
    fn identity_requires_brackets(text in "[^<>]{0,40}") {
        prop_assert!(AddressOfRecord::parse(&text).is_err());
    }

    /// Contacts on an IPv4 address and port keep the URI and the expiry.
    #[test]
    fn contact_on_ipv4_with_port(
        user in "[a-z][a-z0-9]{0,8}",
        octets in prop::array::uniform4(0u8..=255),
        port in 1u16..=65535,
        expires in proptest::option::of(0u64..10_000_000_000),
    ) {
        let [a, b, c, d] = octets;
        let uri = format!("sip:{user}@{a}.{b}.{c}.{d}:{port}");
        let expires_part = expires.map(|e| format!(";expires={e}")).unwrap_or_default();
        let header = format!("<{uri}>{expires_part}");

        let binding = ContactBinding::parse(&header).expect("parse");
        prop_assert_eq!(binding.contact(), uri.as_str());
        prop_assert_eq!(binding.expires(), expires);
        prop_assert_eq!(binding.is_removal(), expires == Some(0));
    }

    /// Host names are never accepted as contacts.
    #[test]
    fn contact_rejects_host_names(
        user in "[a-z]{1,8}",
        host in "[a-z]{2,10}\\.[a-z]{2,3}",
        port in 1u16..=65535,
    ) {
        let header = format!("<sip:{user}@{host}:{port}>");
        prop_assert!(ContactBinding::parse(&header).is_err());
    }

    /// Arbitrary input never panics the parsers.
    #[test]
    fn parsers_do_not_panic(text in "\\PC{0,80}") {
        let _ = AddressOfRecord::parse(&text);
        let _ = ContactBinding::parse(&text);
        let _ = parse_signal(text.as_bytes());
    }

    /// The control digit is found wherever the marker appears in the body.
    #[test]
    fn signal_found_anywhere(
        prefix in "[a-z \\r\\n]{0,20}",
        digit in 0u8..10,
        suffix in "[a-z \\r\\n]{0,20}",
    ) {
        let body = format!("{prefix}Signal={digit}{suffix}");
        prop_assert_eq!(parse_signal(body.as_bytes()), Ok(digit));
    }
}
