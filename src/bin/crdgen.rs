// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dump the dnsman CRD manifests as YAML.
//!
//! Usage: `cargo run --bin crdgen > crds.yaml`

use dnsman::crd::{
    DNSAnnotation, DNSEntry, DNSHostedZonePolicy, DNSProvider, RemoteAccessCertificate,
};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let crds = [
        serde_yaml::to_string(&DNSEntry::crd())?,
        serde_yaml::to_string(&DNSProvider::crd())?,
        serde_yaml::to_string(&DNSHostedZonePolicy::crd())?,
        serde_yaml::to_string(&DNSAnnotation::crd())?,
        serde_yaml::to_string(&RemoteAccessCertificate::crd())?,
    ];
    print!("{}", crds.join("---\n"));
    Ok(())
}
