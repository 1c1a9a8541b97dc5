// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for external DNS management.
//!
//! This module defines all Kubernetes Custom Resource Definitions used by
//! dnsman to manage DNS records at external hosting providers declaratively.
//!
//! # Resource Types
//!
//! ## Desired DNS state
//!
//! - [`DNSEntry`] - One declared DNS record set (targets or text)
//! - [`DNSProvider`] - Binding of credentials, adapter type and zone filters
//!
//! ## Tuning and injection
//!
//! - [`DNSHostedZonePolicy`] - Per-zone cache policy (cluster-scoped)
//! - [`DNSAnnotation`] - Annotations injected onto foreign objects
//! - [`RemoteAccessCertificate`] - Declared client/server certificate material
//!
//! # Example: Declaring an entry
//!
//! ```rust,no_run
//! use dnsman::crd::DNSEntrySpec;
//!
//! let spec = DNSEntrySpec {
//!     dns_name: "e1.first.example.com".to_string(),
//!     targets: Some(vec!["1.1.1.1".to_string()]),
//!     text: None,
//!     ttl: Some(300),
//!     cname_lookup_interval: None,
//!     resolve_targets_to_addresses: None,
//!     routing_policy: None,
//!     reference: None,
//! };
//! ```

use crate::dns::RoutingPolicy;
use crate::ratelimit::RateLimitQuota;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Include/exclude name lists used for both domain and zone selection.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSpec {
    /// Names to include; an empty or absent list includes everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,

    /// Names to exclude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// Reference to a Kubernetes Secret holding provider credentials.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    /// Name of the secret
    pub name: String,

    /// Namespace of the secret; defaults to the provider's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Reference to a base `DNSEntry` from which unset fields are inherited.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryReference {
    /// Name of the referenced entry
    pub name: String,

    /// Namespace of the referenced entry; defaults to the entry's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Lifecycle state of a `DNSEntry`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum EntryState {
    /// Not yet reconciled, or waiting for the dispatcher
    Pending,
    /// The backend record matches the spec
    Ready,
    /// Reconciliation failed; see the status message
    Error,
    /// The spec is invalid and will not be retried until it changes
    Invalid,
    /// The assigned provider stopped matching; the record is left alone
    Stale,
    /// Deletion in progress, waiting for record cleanup
    Deleting,
    /// Frozen by the ignore annotation
    Ignored,
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryState::Pending => "Pending",
            EntryState::Ready => "Ready",
            EntryState::Error => "Error",
            EntryState::Invalid => "Invalid",
            EntryState::Stale => "Stale",
            EntryState::Deleting => "Deleting",
            EntryState::Ignored => "Ignored",
        };
        f.write_str(s)
    }
}

/// `DNSEntry` status as observed by the controller.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSEntryStatus {
    /// Generation of the spec this status reflects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Lifecycle state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<EntryState>,

    /// Short user-readable explanation of the state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Assigned provider as `namespace/name`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Type of the assigned provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,

    /// Backend zone identifier the record lives in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Effective targets after resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,

    /// Effective TTL in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,

    /// Effective CNAME re-resolution interval, set when targets are
    /// flattened to addresses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cname_lookup_interval: Option<i64>,

    /// Last time any observable status field changed (RFC3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
}

/// `DNSEntry` declares one DNS record set at an external provider.
///
/// Exactly one of `targets` (addresses or CNAME targets) or `text` (TXT
/// payloads) must be set. The responsible provider is chosen by the longest
/// base-domain suffix match over all ready providers.
///
/// # Example
///
/// ```yaml
/// apiVersion: dns.gardener.cloud/v1alpha1
/// kind: DNSEntry
/// metadata:
///   name: e1
///   namespace: default
/// spec:
///   dnsName: e1.first.example.com
///   targets:
///     - 1.1.1.1
///   ttl: 300
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.gardener.cloud",
    version = "v1alpha1",
    kind = "DNSEntry",
    namespaced,
    shortname = "dnse",
    doc = "DNSEntry declares a DNS record set to be kept in sync at an external DNS provider.",
    printcolumn = r#"{"name":"DNS","type":"string","jsonPath":".spec.dnsName"}"#,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".status.providerType"}"#,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".status.provider"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "DNSEntryStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSEntrySpec {
    /// Fully qualified DNS name. Normalized to lowercase without a trailing
    /// dot; immutable in effect since renaming re-creates the record.
    ///
    /// A wildcard is allowed only as the leftmost label, exactly `*`.
    pub dns_name: String,

    /// Target values: IPv4/IPv6 addresses or CNAME target names.
    ///
    /// Mutually exclusive with `text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,

    /// TXT payloads. Mutually exclusive with `targets`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,

    /// Time to live in seconds; falls back to the provider default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0, max = 2_147_483_647))]
    pub ttl: Option<i64>,

    /// Re-resolution interval in seconds for flattened CNAME targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 2_147_483_647))]
    pub cname_lookup_interval: Option<i64>,

    /// Resolve CNAME targets to A/AAAA records.
    ///
    /// Automatically enabled when more than one CNAME target is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_targets_to_addresses: Option<bool>,

    /// Routing policy, passed to the provider verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_policy: Option<RoutingPolicy>,

    /// Base entry whose fields fill in anything unset here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<EntryReference>,
}

/// Lifecycle state of a `DNSProvider`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ProviderState {
    /// Not yet validated
    Pending,
    /// Credentials validated, zones discovered and selected
    Ready,
    /// A retryable problem; see the status message
    Error,
    /// The spec or provider type is unusable until changed
    Invalid,
    /// Deletion in progress, blocked while entries remain assigned
    Deleting,
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderState::Pending => "Pending",
            ProviderState::Ready => "Ready",
            ProviderState::Error => "Error",
            ProviderState::Invalid => "Invalid",
            ProviderState::Deleting => "Deleting",
        };
        f.write_str(s)
    }
}

/// Effective include/exclude result published into provider status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectionStatus {
    /// Effectively included names
    #[serde(default)]
    pub included: Vec<String>,

    /// Effectively excluded names
    #[serde(default)]
    pub excluded: Vec<String>,
}

/// `DNSProvider` status as observed by the controller.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSProviderStatus {
    /// Generation of the spec this status reflects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Lifecycle state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ProviderState>,

    /// Short user-readable explanation of the state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Effective base domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<SelectionStatus>,

    /// Effective zone ids
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<SelectionStatus>,

    /// Effective default TTL applied to entries without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<i64>,

    /// Effective rate limit of the account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitQuota>,

    /// Last time any observable status field changed (RFC3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
}

/// `DNSProvider` binds credentials and an adapter type to a set of zones.
///
/// Providers with identical type, secret content and `providerConfig` share
/// one backend account, including its rate limiter and zone cache.
///
/// # Example
///
/// ```yaml
/// apiVersion: dns.gardener.cloud/v1alpha1
/// kind: DNSProvider
/// metadata:
///   name: p1
///   namespace: default
/// spec:
///   type: mock-inmemory
///   secretRef:
///     name: mock-credentials
///   providerConfig:
///     name: test
///     zones:
///       - dnsName: first.example.com
///       - dnsName: second.example.com
///   domains:
///     include:
///       - first.example.com
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.gardener.cloud",
    version = "v1alpha1",
    kind = "DNSProvider",
    namespaced,
    shortname = "dnspr",
    doc = "DNSProvider binds credentials for an external DNS backend and selects the hosted zones and domains it serves.",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "DNSProviderStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSProviderSpec {
    /// Provider type, e.g. `aws-route53`, `azure-dns`, `google-clouddns`,
    /// `mock-inmemory`
    pub r#type: String,

    /// Opaque adapter configuration, validated by the adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<serde_json::Value>,

    /// Secret holding the account credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,

    /// Domain include/exclude selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<SelectorSpec>,

    /// Zone include/exclude selection (by zone id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<SelectorSpec>,

    /// Per-account rate limit override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitQuota>,

    /// Default TTL for entries that do not set one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0, max = 2_147_483_647))]
    pub default_ttl: Option<i64>,
}

/// Selector choosing the hosted zones a policy applies to.
///
/// A zone matches when any of the listed dimensions intersects its identity.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZonePolicySelector {
    /// Match zones by their domain name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_names: Option<Vec<String>>,

    /// Match zones by provider type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_types: Option<Vec<String>>,

    /// Match zones by zone id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_ids: Option<Vec<String>>,
}

/// Policy values applied to matching zones.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZonePolicy {
    /// Zone-state cache TTL override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 2_147_483_647))]
    pub zone_state_cache_ttl: Option<i64>,
}

/// `DNSHostedZonePolicy` status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSHostedZonePolicyStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Number of zones the policy currently applies to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_count: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `DNSHostedZonePolicy` tunes zone-level behavior for every hosted zone
/// whose identity intersects the selector.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.gardener.cloud",
    version = "v1alpha1",
    kind = "DNSHostedZonePolicy",
    doc = "DNSHostedZonePolicy overrides zone-state cache behavior for selected hosted zones.",
    printcolumn = r#"{"name":"Zones","type":"integer","jsonPath":".status.zoneCount"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[kube(status = "DNSHostedZonePolicyStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSHostedZonePolicySpec {
    /// Which zones the policy applies to
    pub selector: ZonePolicySelector,

    /// The policy values
    pub policy: ZonePolicy,
}

/// Reference to the foreign object a `DNSAnnotation` decorates.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    /// API version of the referenced object, e.g. `networking.k8s.io/v1`
    pub api_version: String,

    /// Kind of the referenced object, e.g. `Ingress`
    pub kind: String,

    /// Name of the referenced object
    pub name: String,

    /// Namespace of the referenced object; defaults to the annotation's
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// `DNSAnnotation` status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DNSAnnotationStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Whether the annotations are currently in effect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `DNSAnnotation` attaches source-controller annotations to a referenced
/// foreign object without editing that object directly.
///
/// # Example
///
/// ```yaml
/// apiVersion: dns.gardener.cloud/v1alpha1
/// kind: DNSAnnotation
/// metadata:
///   name: ingress-names
///   namespace: default
/// spec:
///   resourceRef:
///     apiVersion: networking.k8s.io/v1
///     kind: Ingress
///     name: my-ingress
///   annotations:
///     dns.gardener.cloud/dnsnames: "*"
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.gardener.cloud",
    version = "v1alpha1",
    kind = "DNSAnnotation",
    namespaced,
    doc = "DNSAnnotation injects source-controller annotations onto a referenced foreign object.",
    printcolumn = r#"{"name":"RefKind","type":"string","jsonPath":".spec.resourceRef.kind"}"#,
    printcolumn = r#"{"name":"RefName","type":"string","jsonPath":".spec.resourceRef.name"}"#,
    printcolumn = r#"{"name":"Active","type":"boolean","jsonPath":".status.active"}"#
)]
#[kube(status = "DNSAnnotationStatus")]
#[serde(rename_all = "camelCase")]
pub struct DNSAnnotationSpec {
    /// The object to decorate
    pub resource_ref: ResourceReference,

    /// Annotations to apply
    pub annotations: BTreeMap<String, String>,
}

/// Kind of certificate a `RemoteAccessCertificate` declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CertificateType {
    /// Client certificate
    Client,
    /// Server certificate
    Server,
}

/// `RemoteAccessCertificate` status.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAccessCertificateStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Serial number of the issued certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,

    /// Issuance time (RFC3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,

    /// Expiry time (RFC3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,

    /// Set while a rotation requested via `recreate` is pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recreating: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `RemoteAccessCertificate` declares a client or server certificate whose
/// issued material is written into the referenced secret by the remote-access
/// service.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dns.gardener.cloud",
    version = "v1alpha1",
    kind = "RemoteAccessCertificate",
    namespaced,
    doc = "RemoteAccessCertificate declares certificate material for remote cluster access, issued into a referenced secret.",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Secret","type":"string","jsonPath":".spec.secretName"}"#,
    printcolumn = r#"{"name":"NotAfter","type":"string","jsonPath":".status.notAfter"}"#
)]
#[kube(status = "RemoteAccessCertificateStatus")]
#[serde(rename_all = "camelCase")]
pub struct RemoteAccessCertificateSpec {
    /// Domain name used as the certificate's common name
    pub domain_name: String,

    /// Validity in days
    #[schemars(range(min = 1, max = 36500))]
    pub days: i32,

    /// Secret the issued material is written into
    pub secret_name: String,

    /// Whether a client or server certificate is requested
    pub r#type: CertificateType,

    /// Request rotation of the issued certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recreate: Option<bool>,
}

/// `namespace/name` key of a namespaced object.
#[must_use]
pub fn object_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
