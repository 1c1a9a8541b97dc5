// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the dnsman operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for all dnsman CRDs
pub const API_GROUP: &str = "dns.gardener.cloud";

/// API version for all dnsman CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "dns.gardener.cloud/v1alpha1";

/// Kind name for `DNSEntry` resource
pub const KIND_DNS_ENTRY: &str = "DNSEntry";

/// Kind name for `DNSProvider` resource
pub const KIND_DNS_PROVIDER: &str = "DNSProvider";

/// Kind name for `DNSHostedZonePolicy` resource
pub const KIND_DNS_HOSTED_ZONE_POLICY: &str = "DNSHostedZonePolicy";

/// Kind name for `DNSAnnotation` resource
pub const KIND_DNS_ANNOTATION: &str = "DNSAnnotation";

/// Kind name for `RemoteAccessCertificate` resource
pub const KIND_REMOTE_ACCESS_CERTIFICATE: &str = "RemoteAccessCertificate";

// ============================================================================
// Annotations
// ============================================================================

/// Class annotation; objects whose class does not match the configured
/// controller class are ignored by this instance.
pub const ANNOTATION_CLASS: &str = "dns.gardener.cloud/class";

/// Ignore annotation; `reconcile` freezes the entry, `full` additionally
/// leaves the backend record in place on deletion.
pub const ANNOTATION_IGNORE: &str = "dns.gardener.cloud/ignore";

/// Operation annotation; the value `reconcile` forces an immediate
/// reconcile, bypassing the update debounce. Cleared on success.
pub const ANNOTATION_OPERATION: &str = "dns.gardener.cloud/operation";

/// Value of [`ANNOTATION_OPERATION`] requesting a forced reconcile
pub const OPERATION_RECONCILE: &str = "reconcile";

/// Ignore annotation value freezing reconciliation only
pub const IGNORE_RECONCILE: &str = "reconcile";

/// Ignore annotation value freezing reconciliation and deletion cleanup
pub const IGNORE_FULL: &str = "full";

/// Owners annotation on source-projected entries:
/// `[targetClusterID:]clusterID:group/Kind/namespace/name`
pub const ANNOTATION_OWNERS: &str = "dns.gardener.cloud/owners";

/// Annotation listing the DNS names a source object requests;
/// `*` derives the names from the object's host fields.
pub const ANNOTATION_DNSNAMES: &str = "dns.gardener.cloud/dnsnames";

/// Annotation overriding the TTL on source-projected entries
pub const ANNOTATION_TTL: &str = "dns.gardener.cloud/ttl";

/// Annotation selecting the routing policy on source-projected entries (JSON)
pub const ANNOTATION_ROUTING_POLICY: &str = "dns.gardener.cloud/routing-policy";

/// Annotation forcing address-type targets when a load balancer exposes both
/// hostname and IP (`ipv4`, `ipv6` or `dual-stack`)
pub const ANNOTATION_IP_STACK: &str = "dns.gardener.cloud/ip-stack";

// ============================================================================
// Finalizers
// ============================================================================

/// Compound finalizer placed on `DNSProvider` objects and referenced secrets
pub const FINALIZER_PROVIDER: &str = "dns.gardener.cloud/dnsman-provider";

/// Finalizer placed on `DNSEntry` objects while a backend record is owned
pub const FINALIZER_ENTRY: &str = "dns.gardener.cloud/dnsman-entry";

/// Finalizer placed on `DNSAnnotation` objects while annotations are active
pub const FINALIZER_ANNOTATION: &str = "dns.gardener.cloud/dnsman-annotation";

/// Finalizer placed on source objects while projected entries exist
pub const FINALIZER_SOURCE: &str = "dns.gardener.cloud/dnsman-source";

// ============================================================================
// Timing Defaults
// ============================================================================

/// Default zone-state cache TTL (5 minutes)
pub const DEFAULT_ZONE_CACHE_TTL_SECS: u64 = 300;

/// Default record TTL when neither entry nor provider specifies one
pub const DEFAULT_RECORD_TTL_SECS: i64 = 300;

/// Default CNAME re-resolution interval (10 minutes)
pub const DEFAULT_CNAME_LOOKUP_INTERVAL_SECS: i64 = 600;

/// Dispatcher batch coalescing window (1 second)
pub const DEFAULT_BATCH_WINDOW_MILLIS: u64 = 1000;

/// Interval of the per-zone batch timer re-diffing desired against
/// observed state (5 minutes)
pub const DISPATCH_RESYNC_INTERVAL_SECS: u64 = 300;

/// Debounce between an entry write and its next reconcile
pub const DEFAULT_RECONCILIATION_DELAY_SECS: u64 = 1;

/// Dispatcher retry backoff base interval
pub const DISPATCH_BACKOFF_BASE_SECS: u64 = 1;

/// Dispatcher retry backoff cap (10 minutes)
pub const DISPATCH_BACKOFF_CAP_SECS: u64 = 600;

/// Dispatcher retry backoff growth factor
pub const DISPATCH_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Dispatcher retry backoff jitter (±20%)
pub const DISPATCH_BACKOFF_JITTER: f64 = 0.2;

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue while waiting for a dispatcher result
pub const PENDING_REQUEUE_DURATION_SECS: u64 = 2;

/// Requeue when a provider account has no hosted zones yet (5 minutes)
pub const EMPTY_ACCOUNT_REQUEUE_SECS: u64 = 300;

/// Steady-state requeue interval for ready objects (5 minutes)
pub const REQUEUE_WHEN_READY_SECS: u64 = 300;

/// Soft deadline for a single reconcile pass
pub const RECONCILE_SOFT_DEADLINE_SECS: u64 = 120;

// ============================================================================
// Rate Limiting Defaults
// ============================================================================

/// Default per-account request quota per day when rate limiting is enabled
pub const DEFAULT_REQUESTS_PER_DAY: u32 = 86_400;

/// Default per-account burst
pub const DEFAULT_BURST: u32 = 20;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Port for the Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for the Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for the metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";

/// Provider type identifier of the built-in in-memory mock
pub const PROVIDER_TYPE_MOCK: &str = "mock-inmemory";
