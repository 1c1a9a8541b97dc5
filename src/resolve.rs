// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Target parsing and CNAME flattening.
//!
//! Entry targets are either IP literals (emitted directly as A/AAAA) or
//! hostnames. A single hostname becomes a CNAME record; multiple hostnames,
//! or an explicit `resolveTargetsToAddresses`, are flattened: every hostname
//! is looked up and the deduplicated addresses become A and AAAA records.
//! The lookup goes through [`TargetLookup`] so tests can answer statically.

use crate::dns::{quote_txt, DnsSet, DnsSetName, RecordSet, RecordType};
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use std::collections::BTreeSet;
use std::net::IpAddr;
use thiserror::Error;
use tracing::debug;

/// Errors during target resolution.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// A hostname could not be resolved
    #[error("cannot resolve target '{host}': {reason}")]
    LookupFailed {
        /// The hostname that failed
        host: String,
        /// Resolver message
        reason: String,
    },

    /// A hostname resolved to no addresses
    #[error("target '{host}' has no addresses")]
    NoAddresses {
        /// The hostname without addresses
        host: String,
    },
}

/// DNS lookup abstraction used for CNAME flattening.
#[async_trait]
pub trait TargetLookup: Send + Sync {
    /// Resolve a hostname to its IPv4 and IPv6 addresses.
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError>;
}

/// System-configured resolver.
pub struct SystemLookup {
    resolver: TokioAsyncResolver,
}

impl SystemLookup {
    /// Build a resolver from the system configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when no usable resolver configuration exists.
    pub fn from_system_conf() -> anyhow::Result<Self> {
        Ok(Self {
            resolver: TokioAsyncResolver::tokio_from_system_conf()?,
        })
    }
}

#[async_trait]
impl TargetLookup for SystemLookup {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        let response = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ResolveError::LookupFailed {
                host: host.to_string(),
                reason: e.to_string(),
            })?;
        Ok(response.iter().collect())
    }
}

/// One parsed target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// IPv4 literal
    V4(std::net::Ipv4Addr),
    /// IPv6 literal
    V6(std::net::Ipv6Addr),
    /// CNAME target hostname, normalized
    Hostname(String),
}

impl Target {
    /// Parse a target string into an address literal or hostname.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<IpAddr>() {
            Ok(IpAddr::V4(addr)) => Target::V4(addr),
            Ok(IpAddr::V6(addr)) => Target::V6(addr),
            Err(_) => Target::Hostname(
                trimmed.trim_end_matches('.').to_ascii_lowercase(),
            ),
        }
    }
}

/// Result of deriving record sets from an entry spec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTargets {
    /// Effective target strings for status projection
    pub effective_targets: Vec<String>,

    /// Whether hostname targets were flattened to addresses
    pub flattened: bool,
}

/// Derive the record sets for an entry's targets into `set`.
///
/// `ttl` is the effective TTL; `resolve_to_addresses` forces flattening for
/// a single hostname target (multiple hostnames always flatten).
///
/// # Errors
///
/// Returns [`ResolveError`] when flattening fails for any hostname.
pub async fn resolve_targets(
    name: &DnsSetName,
    targets: &[String],
    ttl: i64,
    resolve_to_addresses: bool,
    lookup: &dyn TargetLookup,
    set: &mut DnsSet,
) -> Result<ResolvedTargets, ResolveError> {
    let parsed: Vec<Target> = targets.iter().map(|t| Target::parse(t)).collect();
    let hostnames: Vec<&String> = parsed
        .iter()
        .filter_map(|t| match t {
            Target::Hostname(h) => Some(h),
            _ => None,
        })
        .collect();

    let mut v4: BTreeSet<String> = parsed
        .iter()
        .filter_map(|t| match t {
            Target::V4(a) => Some(a.to_string()),
            _ => None,
        })
        .collect();
    let mut v6: BTreeSet<String> = parsed
        .iter()
        .filter_map(|t| match t {
            Target::V6(a) => Some(a.to_string()),
            _ => None,
        })
        .collect();

    let flatten = !hostnames.is_empty() && (resolve_to_addresses || hostnames.len() > 1);

    let mut cname_host: Option<String> = None;
    if flatten {
        for host in &hostnames {
            let addrs = lookup.lookup(host).await?;
            if addrs.is_empty() {
                return Err(ResolveError::NoAddresses {
                    host: (*host).clone(),
                });
            }
            debug!(name = %name, host = %host, count = addrs.len(), "flattened CNAME target");
            for addr in addrs {
                match addr {
                    IpAddr::V4(a) => {
                        v4.insert(a.to_string());
                    }
                    IpAddr::V6(a) => {
                        v6.insert(a.to_string());
                    }
                }
            }
        }
    } else if let [host] = hostnames.as_slice() {
        set.put(RecordSet::new(
            RecordType::CNAME,
            ttl,
            vec![(*host).clone()],
        ));
        cname_host = Some((*host).clone());
    }

    // Address literals are always written out, even next to a CNAME: the
    // conflicting combination must reach the CNAME exclusivity check
    // instead of silently dropping records.
    if !v4.is_empty() {
        set.put(RecordSet::new(
            RecordType::A,
            ttl,
            v4.iter().cloned().collect(),
        ));
    }
    if !v6.is_empty() {
        set.put(RecordSet::new(
            RecordType::AAAA,
            ttl,
            v6.iter().cloned().collect(),
        ));
    }

    let mut effective: Vec<String> = v4.into_iter().collect();
    effective.extend(v6);
    if let Some(host) = cname_host {
        effective.push(host);
    }
    Ok(ResolvedTargets {
        effective_targets: effective,
        flattened: flatten,
    })
}

/// Derive the TXT record set for an entry's text payloads into `set`.
pub fn resolve_text(text: &[String], ttl: i64, set: &mut DnsSet) -> Vec<String> {
    let quoted: Vec<String> = text.iter().map(|t| quote_txt(t)).collect();
    set.put(RecordSet::new(RecordType::TXT, ttl, quoted.clone()));
    quoted
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod resolve_tests;
