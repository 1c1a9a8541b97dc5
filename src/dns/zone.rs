// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hosted-zone identity and discovery results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a hosted zone at a backend: the provider type plus the
/// backend's zone identifier. Private zones carry a provider-chosen prefix in
/// the identifier so that same-domain zones in different accounts stay
/// distinct.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZoneId {
    /// Provider type, e.g. `aws-route53` or `mock-inmemory`
    pub provider_type: String,

    /// Backend zone identifier, optionally prefixed for private zones
    pub id: String,
}

impl ZoneId {
    /// Build a zone id.
    #[must_use]
    pub fn new(provider_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_type, self.id)
    }
}

/// A hosted zone as discovered from a provider account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsHostedZone {
    /// The zone's identity
    pub id: ZoneId,

    /// The zone's own domain, normalized
    pub domain: String,

    /// Whether the zone is private to a network
    pub is_private: bool,

    /// Subdomains delegated away from this zone
    #[serde(default)]
    pub forwarded_subdomains: Vec<String>,
}

impl DnsHostedZone {
    /// Build a public zone without forwarded subdomains.
    #[must_use]
    pub fn public(id: ZoneId, domain: impl Into<String>) -> Self {
        Self {
            id,
            domain: domain.into(),
            is_private: false,
            forwarded_subdomains: Vec::new(),
        }
    }
}
