// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Normalized DNS names and record-set names.
//!
//! All DNS names handled by the controller are normalized on construction:
//! lowercased with any trailing dot stripped. A [`DnsName`] is immutable once
//! built, so every comparison downstream is a plain string comparison.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced while validating a DNS name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name was empty after normalization
    #[error("DNS name is empty")]
    Empty,

    /// A label is empty, too long, or contains invalid characters
    #[error("invalid DNS name '{name}': {reason}")]
    InvalidName {
        /// The offending name as given
        name: String,
        /// Explanation of what is invalid
        reason: String,
    },
}

/// A fully qualified domain name, normalized to lowercase with the trailing
/// dot stripped.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DnsName(String);

impl DnsName {
    /// Normalize and validate a DNS name.
    ///
    /// A wildcard is accepted only as the leftmost label and only as exactly
    /// `*`. Labels are limited to 63 characters; letters, digits, hyphens and
    /// underscores are allowed (underscores occur in service and TXT names).
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the name is empty or any label is malformed.
    pub fn new(raw: &str) -> Result<Self, NameError> {
        let normalized = raw.trim().trim_end_matches('.').to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(NameError::Empty);
        }
        if normalized.len() > 253 {
            return Err(NameError::InvalidName {
                name: raw.to_string(),
                reason: "name exceeds 253 characters".to_string(),
            });
        }

        for (i, label) in normalized.split('.').enumerate() {
            if label.is_empty() {
                return Err(NameError::InvalidName {
                    name: raw.to_string(),
                    reason: "empty label".to_string(),
                });
            }
            if label.len() > 63 {
                return Err(NameError::InvalidName {
                    name: raw.to_string(),
                    reason: format!("label '{label}' exceeds 63 characters"),
                });
            }
            if label == "*" {
                if i != 0 {
                    return Err(NameError::InvalidName {
                        name: raw.to_string(),
                        reason: "wildcard label is only allowed as the leftmost label"
                            .to_string(),
                    });
                }
                continue;
            }
            if label.contains('*') {
                return Err(NameError::InvalidName {
                    name: raw.to_string(),
                    reason: "wildcard label must be exactly '*'".to_string(),
                });
            }
            if !label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(NameError::InvalidName {
                    name: raw.to_string(),
                    reason: format!("label '{label}' contains invalid characters"),
                });
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(NameError::InvalidName {
                    name: raw.to_string(),
                    reason: format!("label '{label}' starts or ends with a hyphen"),
                });
            }
        }

        Ok(Self(normalized))
    }

    /// The normalized name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the leftmost label is the wildcard label.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.starts_with("*.")
    }

    /// Whether this name equals `domain` or is a subdomain of it.
    ///
    /// Both sides are expected in normalized form; the comparison is on
    /// whole labels, so `foo-example.com` is not under `example.com`.
    #[must_use]
    pub fn is_under_domain(&self, domain: &str) -> bool {
        domain_covers(domain, &self.0)
    }
}

impl fmt::Display for DnsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether `name` equals `domain` or is a subdomain of it (label-aligned).
#[must_use]
pub fn domain_covers(domain: &str, name: &str) -> bool {
    if name == domain {
        return true;
    }
    name.len() > domain.len()
        && name.ends_with(domain)
        && name.as_bytes()[name.len() - domain.len() - 1] == b'.'
}

/// The name of one record set: a DNS name plus an optional set identifier
/// distinguishing sibling record sets under routing policies (weighted, geo,
/// latency, failover).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsSetName {
    /// The fully qualified, normalized DNS name
    pub dns_name: DnsName,

    /// Optional routing-policy set identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_identifier: Option<String>,
}

impl DnsSetName {
    /// Build a set name without a set identifier.
    #[must_use]
    pub fn simple(dns_name: DnsName) -> Self {
        Self {
            dns_name,
            set_identifier: None,
        }
    }

    /// Build a set name with a set identifier.
    #[must_use]
    pub fn with_identifier(dns_name: DnsName, set_identifier: String) -> Self {
        Self {
            dns_name,
            set_identifier: Some(set_identifier),
        }
    }
}

impl fmt::Display for DnsSetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.set_identifier {
            Some(id) => write!(f, "{}#{id}", self.dns_name),
            None => self.dns_name.fmt(f),
        }
    }
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod name_tests;
