// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone and domain selection for providers.
//!
//! Resolves a provider's include/exclude specifications against the zones
//! discovered in its account, computes the effective base domains each zone
//! serves, and rejects ambiguous layouts (overlapping or duplicate zones).
//! Entry-to-provider matching reuses the longest-suffix rule over the
//! selected base domains.

use crate::dns::{domain_covers, DnsHostedZone, ZoneId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Include/exclude lists as written on a provider spec.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    /// Names or zone ids to include; empty means "all"
    pub include: Vec<String>,

    /// Names or zone ids to exclude
    pub exclude: Vec<String>,
}

/// Errors making a provider's selection unusable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Every discovered zone was filtered away
    #[error("no hosted zones remain after applying the zone and domain selection")]
    NoZonesRemaining,

    /// Two selected zones serve intersecting domain trees
    #[error("zones {zone_a} and {zone_b} overlap on domain {domain}")]
    OverlappingZones {
        /// First zone id
        zone_a: ZoneId,
        /// Second zone id
        zone_b: ZoneId,
        /// A domain covered by both
        domain: String,
    },

    /// The same base domain is served by two zones of this provider
    #[error("duplicate zones for domain {domain}: {zone_a} and {zone_b}")]
    DuplicateZones {
        /// First zone id
        zone_a: ZoneId,
        /// Second zone id
        zone_b: ZoneId,
        /// The duplicated domain
        domain: String,
    },
}

/// Result of a provider's zone/domain selection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionOutcome {
    /// Zones serving at least one base domain, with their base domains
    pub zones: BTreeMap<ZoneId, BTreeSet<String>>,

    /// Zone ids discovered but not selected
    pub zones_excluded: Vec<ZoneId>,

    /// Union of all selected base domains
    pub domains_included: BTreeSet<String>,

    /// Domains dropped by the domain selection
    pub domains_excluded: BTreeSet<String>,
}

impl SelectionOutcome {
    /// The zone serving `dns_name`, chosen by longest base-domain suffix.
    #[must_use]
    pub fn zone_for_name(&self, dns_name: &str) -> Option<(&ZoneId, &str)> {
        let lookup_name = dns_name.strip_prefix("*.").unwrap_or(dns_name);
        let mut best: Option<(&ZoneId, &str)> = None;
        for (zone, domains) in &self.zones {
            for domain in domains {
                if domain_covers(domain, lookup_name)
                    && best.is_none_or(|(_, b)| domain.len() > b.len())
                {
                    best = Some((zone, domain));
                }
            }
        }
        best
    }

    /// Length of the longest selected base domain covering `dns_name`.
    #[must_use]
    pub fn match_length(&self, dns_name: &str) -> Option<usize> {
        self.zone_for_name(dns_name).map(|(_, domain)| domain.len())
    }
}

/// Run the selection algorithm over discovered zones.
///
/// # Errors
///
/// Returns a [`SelectionError`] when nothing remains selected or when the
/// selected zones are ambiguous.
pub fn select_zones(
    discovered: &[DnsHostedZone],
    zone_selector: &Selector,
    domain_selector: &Selector,
) -> Result<SelectionOutcome, SelectionError> {
    let mut outcome = SelectionOutcome::default();

    // Zone-level include/exclude.
    let mut candidates: Vec<&DnsHostedZone> = Vec::new();
    for zone in discovered {
        let included = zone_selector.include.is_empty()
            || zone_selector.include.iter().any(|id| *id == zone.id.id);
        let excluded = zone_selector.exclude.iter().any(|id| *id == zone.id.id);
        if included && !excluded {
            candidates.push(zone);
        } else {
            outcome.zones_excluded.push(zone.id.clone());
        }
    }

    // Base domains: a zone's own domain plus forwarded subdomains that are
    // not themselves served by another candidate zone.
    let candidate_domains: BTreeSet<&str> =
        candidates.iter().map(|zone| zone.domain.as_str()).collect();
    for zone in &candidates {
        let mut base: BTreeSet<String> = BTreeSet::new();
        base.insert(zone.domain.clone());
        for forwarded in &zone.forwarded_subdomains {
            if !candidate_domains.contains(forwarded.as_str()) {
                base.insert(forwarded.clone());
            }
        }

        // Domain-level include/exclude.
        base.retain(|domain| {
            let included = domain_selector.include.is_empty()
                || domain_selector
                    .include
                    .iter()
                    .any(|inc| domain_covers(inc, domain));
            let excluded = domain_selector
                .exclude
                .iter()
                .any(|exc| domain_covers(exc, domain));
            let keep = included && !excluded;
            if !keep {
                outcome.domains_excluded.insert(domain.clone());
            }
            keep
        });

        if base.is_empty() {
            outcome.zones_excluded.push(zone.id.clone());
        } else {
            outcome.domains_included.extend(base.iter().cloned());
            outcome.zones.insert(zone.id.clone(), base);
        }
    }

    if outcome.zones.is_empty() {
        return Err(SelectionError::NoZonesRemaining);
    }

    check_ambiguity(&outcome, candidates.as_slice())?;
    Ok(outcome)
}

/// Reject overlapping and duplicate base-domain sets.
fn check_ambiguity(
    outcome: &SelectionOutcome,
    candidates: &[&DnsHostedZone],
) -> Result<(), SelectionError> {
    let forwarded_of = |zone_id: &ZoneId| -> Option<&Vec<String>> {
        candidates
            .iter()
            .find(|zone| zone.id == *zone_id)
            .map(|zone| &zone.forwarded_subdomains)
    };

    let zones: Vec<(&ZoneId, &BTreeSet<String>)> = outcome.zones.iter().collect();
    for (i, (zone_a, domains_a)) in zones.iter().enumerate() {
        for (zone_b, domains_b) in zones.iter().skip(i + 1) {
            for domain_a in *domains_a {
                for domain_b in *domains_b {
                    if domain_a == domain_b {
                        return Err(SelectionError::DuplicateZones {
                            zone_a: (*zone_a).clone(),
                            zone_b: (*zone_b).clone(),
                            domain: domain_a.clone(),
                        });
                    }
                    let covers = domain_covers(domain_a, domain_b)
                        || domain_covers(domain_b, domain_a);
                    if !covers {
                        continue;
                    }
                    // A zone whose domain is a forwarded subdomain of the
                    // other holds a real delegation, not an overlap.
                    let delegated = forwarded_of(zone_a)
                        .is_some_and(|f| f.iter().any(|d| d == domain_b))
                        || forwarded_of(zone_b)
                            .is_some_and(|f| f.iter().any(|d| d == domain_a));
                    if !delegated {
                        return Err(SelectionError::OverlappingZones {
                            zone_a: (*zone_a).clone(),
                            zone_b: (*zone_b).clone(),
                            domain: if domain_a.len() > domain_b.len() {
                                domain_a.clone()
                            } else {
                                domain_b.clone()
                            },
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Pick the responsible provider for a DNS name.
///
/// `providers` pairs each provider key (`namespace/name`) with its selected
/// base domains. The longest suffix match wins; ties break on the lexically
/// smallest provider key so the choice is deterministic.
#[must_use]
pub fn match_provider<'a>(
    providers: impl IntoIterator<Item = (&'a str, &'a [String])>,
    dns_name: &str,
) -> Option<&'a str> {
    let lookup_name = dns_name.strip_prefix("*.").unwrap_or(dns_name);
    let mut best: Option<(&str, usize)> = None;
    for (provider, domains) in providers {
        for domain in domains {
            if !domain_covers(domain, lookup_name) {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_provider, best_len)) => {
                    domain.len() > best_len
                        || (domain.len() == best_len && provider < best_provider)
                }
            };
            if better {
                best = Some((provider, domain.len()));
            }
        }
    }
    best.map(|(provider, _)| provider)
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod selection_tests;
