// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record types and record sets.
//!
//! A [`RecordSet`] is the value side of one `(name, type)` pair: a TTL and an
//! ordered sequence of record values. Values are deduplicated and kept in
//! byte-wise ascending order on construction so that set equality and diff
//! output are deterministic regardless of input order.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DNS record types handled by the controller.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    AAAA,
    /// Canonical name record
    CNAME,
    /// Text record
    TXT,
    /// Nameserver record
    NS,
    /// Mail exchange record
    MX,
    /// Service locator record
    SRV,
    /// Certificate authority authorization record
    CAA,
}

impl RecordType {
    /// All record types, in diff iteration order.
    pub const ALL: [RecordType; 8] = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::CNAME,
        RecordType::TXT,
        RecordType::NS,
        RecordType::MX,
        RecordType::SRV,
        RecordType::CAA,
    ];

    /// The type as its upper-case wire mnemonic.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::TXT => "TXT",
            RecordType::NS => "NS",
            RecordType::MX => "MX",
            RecordType::SRV => "SRV",
            RecordType::CAA => "CAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::AAAA),
            "CNAME" => Ok(RecordType::CNAME),
            "TXT" => Ok(RecordType::TXT),
            "NS" => Ok(RecordType::NS),
            "MX" => Ok(RecordType::MX),
            "SRV" => Ok(RecordType::SRV),
            "CAA" => Ok(RecordType::CAA),
            other => Err(format!("unknown record type '{other}'")),
        }
    }
}

/// One record set: a type, a TTL and the deduplicated, sorted record values.
///
/// TXT values keep whatever quoting the backend provided; no unquoting is
/// attempted here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordSet {
    /// The record type of every value in this set
    pub rtype: RecordType,

    /// Time to live in seconds; zero means "use the backend default"
    pub ttl: i64,

    /// Record values, byte-wise ascending, without duplicates
    pub records: Vec<String>,
}

impl RecordSet {
    /// Build a record set, deduplicating and sorting the values.
    #[must_use]
    pub fn new(rtype: RecordType, ttl: i64, mut records: Vec<String>) -> Self {
        records.sort();
        records.dedup();
        Self {
            rtype,
            ttl,
            records,
        }
    }

    /// Whether the set carries no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of values in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ttl={} [{}]", self.rtype, self.ttl, self.records.join(", "))
    }
}

/// Quote a TXT payload the way it is written to a backend.
///
/// Values already wrapped in double quotes are passed through unchanged.
#[must_use]
pub fn quote_txt(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('"', "\\\""))
    }
}

#[cfg(test)]
#[path = "recordset_tests.rs"]
mod recordset_tests;
