// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Static configuration for the call-hold service.
///
/// Loaded once at startup and shared immutably afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::ContactBinding;
use crate::error::ConfigError;

const DEFAULT_PROMPT: &str = " is trying to reach you:\n\
                              1. Reject the new call\n\
                              2. Put the current call on hold\n\
                              3. Start a conference";

/// A media service reachable at a fixed contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    /// Address-of-record used as the REFER target (`user@domain`).
    pub aor: String,

    /// Network contact the AoR is bound to (`sip:user@ip:port`).
    pub contact: String,
}

impl ServiceBinding {
    /// `sip:` URI placed in Refer-To headers.
    pub fn refer_target(&self) -> String {
        format!("sip:{}", self.aor)
    }
}

/// Complete service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallHoldConfig {
    /// Administrative domain; requests from or to other domains are refused.
    pub domain: String,

    /// Usernames allowed to receive prompts and send control signals.
    pub subscribers: Vec<String>,

    /// Announcement service that plays to a call put on hold
    pub announcement: ServiceBinding,

    /// Conference service used to merge three parties
    pub conference: ServiceBinding,

    /// From URI of the prompt MESSAGE sent to subscribers.
    pub service_uri: String,

    /// Text appended to the caller's username in the prompt.
    pub prompt_template: String,
}

impl Default for CallHoldConfig {
    fn default() -> Self {
        Self {
            domain: "acme.pt".to_string(),
            subscribers: vec!["alice".into(), "bob".into(), "claire".into()],
            announcement: ServiceBinding {
                aor: "announcement@acme.pt".to_string(),
                contact: "sip:announcement@127.0.0.1:5080".to_string(),
            },
            conference: ServiceBinding {
                aor: "conference@acme.pt".to_string(),
                contact: "sip:conference@127.0.0.1:5090".to_string(),
            },
            service_uri: "sip:callonhold@acme.pt".to_string(),
            prompt_template: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl CallHoldConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::Invalid("domain must not be empty".into()));
        }
        if self.subscribers.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one subscriber is required".into(),
            ));
        }
        for service in [&self.announcement, &self.conference] {
            if !service.aor.contains('@') {
                return Err(ConfigError::Invalid(format!(
                    "service aor {:?} is not user@domain",
                    service.aor
                )));
            }
            ContactBinding::parse(&format!("<{}>", service.contact)).map_err(|e| {
                ConfigError::Invalid(format!("service {}: {e}", service.aor))
            })?;
        }
        Ok(())
    }

    /// Allow-list membership, the only authorization check for signals.
    pub fn is_subscriber(&self, username: &str) -> bool {
        self.subscribers.iter().any(|s| s == username)
    }

    pub fn is_local_domain(&self, domain: &str) -> bool {
        self.domain == domain
    }

    /// Prompt body for a call from `caller_username`.
    pub fn prompt_for(&self, caller_username: &str) -> String {
        format!("{caller_username}{}", self.prompt_template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_deployment() {
        let config = CallHoldConfig::default();
        config.validate().unwrap();
        assert!(config.is_subscriber("alice"));
        assert!(config.is_subscriber("claire"));
        assert!(!config.is_subscriber("dave"));
        assert_eq!(config.announcement.refer_target(), "sip:announcement@acme.pt");
        assert_eq!(config.conference.refer_target(), "sip:conference@acme.pt");
    }

    #[test]
    fn prompt_ends_with_three_options() {
        let prompt = CallHoldConfig::default().prompt_for("bob");
        assert!(prompt.starts_with("bob is trying"));
        assert!(prompt.ends_with("3. Start a conference"));
        assert_eq!(prompt.lines().count(), 4);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            CallHoldConfig::from_json_str(r#"{"domain": "example.org", "subscribers": ["zoe"]}"#)
                .unwrap();
        assert_eq!(config.domain, "example.org");
        assert!(config.is_subscriber("zoe"));
        assert!(!config.is_subscriber("alice"));
        assert_eq!(config.conference.contact, "sip:conference@127.0.0.1:5090");
    }

    #[test]
    fn invalid_service_contact_is_rejected() {
        let json =
            r#"{"announcement": {"aor": "ann@acme.pt", "contact": "sip:ann@media.acme.pt"}}"#;
        let err = CallHoldConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn empty_subscribers_are_rejected() {
        let err = CallHoldConfig::from_json_str(r#"{"subscribers": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
