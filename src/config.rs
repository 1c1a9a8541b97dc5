// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Process configuration.
//!
//! Every setting is a command-line flag with an environment-variable alias
//! (`DNSMAN_*`). Defaults match the constants module; nothing is hard-coded
//! elsewhere.

use crate::constants;
use crate::ratelimit::RateLimitQuota;
use clap::Parser;
use std::collections::BTreeSet;
use tokio::time::Duration;

/// dnsman, the external DNS management operator
#[derive(Parser, Clone, Debug)]
#[command(name = "dnsman", version, about)]
pub struct Config {
    /// Controller class; objects with a different class annotation are
    /// ignored by this instance
    #[arg(long, env = "DNSMAN_CLASS", default_value = "dnsman")]
    pub class: String,

    /// Namespace from which providers are accepted; empty accepts all
    #[arg(long, env = "DNSMAN_PROVIDER_NAMESPACE", default_value = "")]
    pub provider_namespace: String,

    /// Fallback TTL in seconds when an entry omits one
    #[arg(long, env = "DNSMAN_DEFAULT_TTL", default_value_t = constants::DEFAULT_RECORD_TTL_SECS)]
    pub default_ttl: i64,

    /// Comma-separated allow-list of provider types; empty allows all
    #[arg(long, env = "DNSMAN_ENABLED_PROVIDER_TYPES", value_delimiter = ',')]
    pub enabled_provider_types: Vec<String>,

    /// Comma-separated deny-list of provider types
    #[arg(long, env = "DNSMAN_DISABLED_PROVIDER_TYPES", value_delimiter = ',')]
    pub disabled_provider_types: Vec<String>,

    /// Default zone-state cache TTL in seconds
    #[arg(long, env = "DNSMAN_ZONE_CACHE_TTL", default_value_t = constants::DEFAULT_ZONE_CACHE_TTL_SECS)]
    pub zone_cache_ttl: u64,

    /// Enable default per-account rate limiting
    #[arg(long, env = "DNSMAN_RATE_LIMITS_ENABLED", default_value_t = false)]
    pub rate_limits_enabled: bool,

    /// Default per-account requests per day when rate limiting is enabled
    #[arg(long, env = "DNSMAN_RATE_LIMIT_QPS_DAY", default_value_t = constants::DEFAULT_REQUESTS_PER_DAY)]
    pub rate_limit_requests_per_day: u32,

    /// Default per-account burst when rate limiting is enabled
    #[arg(long, env = "DNSMAN_RATE_LIMIT_BURST", default_value_t = constants::DEFAULT_BURST)]
    pub rate_limit_burst: u32,

    /// Debounce in seconds between an entry write and its next reconcile
    #[arg(long, env = "DNSMAN_RECONCILIATION_DELAY", default_value_t = constants::DEFAULT_RECONCILIATION_DELAY_SECS)]
    pub reconciliation_delay_after_update: u64,

    /// Dispatcher batch coalescing window in milliseconds
    #[arg(long, env = "DNSMAN_BATCH_WINDOW_MILLIS", default_value_t = constants::DEFAULT_BATCH_WINDOW_MILLIS)]
    pub batch_window_millis: u64,

    /// Namespace projected entries are created in
    #[arg(long, env = "DNSMAN_SOURCE_TARGET_NAMESPACE", default_value = "")]
    pub source_target_namespace: String,

    /// Cluster id of the target cluster in owner annotations
    #[arg(long, env = "DNSMAN_SOURCE_TARGET_CLUSTER_ID", default_value = "")]
    pub source_target_cluster_id: String,

    /// Cluster id of the source cluster in owner annotations
    #[arg(long, env = "DNSMAN_SOURCE_CLUSTER_ID", default_value = "source")]
    pub source_cluster_id: String,

    /// Class written onto projected entries
    #[arg(long, env = "DNSMAN_SOURCE_TARGET_CLASS", default_value = "")]
    pub source_target_class: String,

    /// Labels (key=value, comma-separated) added to projected entries
    #[arg(long, env = "DNSMAN_SOURCE_TARGET_LABELS", value_delimiter = ',')]
    pub source_target_labels: Vec<String>,

    /// Name prefix for projected entries
    #[arg(long, env = "DNSMAN_SOURCE_TARGET_NAME_PREFIX", default_value = "")]
    pub source_target_name_prefix: String,

    /// Kubeconfig path of the target cluster for cross-cluster projection;
    /// empty projects into the local cluster
    #[arg(long, env = "DNSMAN_TARGET_KUBECONFIG", default_value = "")]
    pub target_kubeconfig: String,

    /// Watch Gateway API gateways as a source kind (requires the Gateway
    /// API CRDs on the cluster)
    #[arg(long, env = "DNSMAN_GATEWAY_SOURCE_ENABLED", default_value_t = false)]
    pub gateway_source_enabled: bool,
}

impl Config {
    /// The configured allow-list, or `None` for "all registered types".
    #[must_use]
    pub fn enabled_types(&self) -> Option<BTreeSet<String>> {
        let set: BTreeSet<String> = self
            .enabled_provider_types
            .iter()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect();
        if set.is_empty() {
            None
        } else {
            Some(set)
        }
    }

    /// The configured deny-list.
    #[must_use]
    pub fn disabled_types(&self) -> BTreeSet<String> {
        self.disabled_provider_types
            .iter()
            .filter(|t| !t.is_empty())
            .cloned()
            .collect()
    }

    /// Default account rate limit, when enabled.
    #[must_use]
    pub fn default_rate_limit(&self) -> Option<RateLimitQuota> {
        self.rate_limits_enabled.then_some(RateLimitQuota {
            requests_per_day: self.rate_limit_requests_per_day,
            burst: self.rate_limit_burst,
        })
    }

    /// Default zone-state cache TTL.
    #[must_use]
    pub fn zone_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.zone_cache_ttl)
    }

    /// Parsed `source_target_labels` as key/value pairs.
    #[must_use]
    pub fn target_labels(&self) -> Vec<(String, String)> {
        self.source_target_labels
            .iter()
            .filter_map(|pair| {
                pair.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        // Parse from an empty command line so flag defaults apply.
        Self::parse_from::<_, &str>([])
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
