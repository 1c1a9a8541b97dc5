// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The DNS value model: names, record sets, hosted zones and diffs.
//!
//! These are pure value types with deterministic equality; nothing here
//! performs I/O. The planner and the provider handlers speak exclusively in
//! terms of this module.

pub mod dnsset;
pub mod name;
pub mod recordset;
pub mod zone;

pub use dnsset::{diff, order_batch, Change, ChangeRequest, DnsSet, RoutingPolicy};
pub use name::{domain_covers, DnsName, DnsSetName, NameError};
pub use recordset::{quote_txt, RecordSet, RecordType};
pub use zone::{DnsHostedZone, ZoneId};
