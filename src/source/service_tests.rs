// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the Service source

#[cfg(test)]
mod tests {
    use crate::source::service::load_balancer_targets;
    use k8s_openapi::api::core::v1::LoadBalancerIngress;

    fn ingress(ip: Option<&str>, hostname: Option<&str>) -> LoadBalancerIngress {
        LoadBalancerIngress {
            ip: ip.map(str::to_string),
            hostname: hostname.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn prefers_ips_over_hostnames() {
        let targets = load_balancer_targets(&[
            ingress(Some("10.0.0.1"), Some("lb.example.com")),
            ingress(Some("10.0.0.2"), None),
        ]);
        assert_eq!(targets, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn falls_back_to_hostnames() {
        let targets = load_balancer_targets(&[ingress(None, Some("lb.example.com"))]);
        assert_eq!(targets, vec!["lb.example.com"]);
    }

    #[test]
    fn empty_ingress_gives_no_targets() {
        assert!(load_balancer_targets(&[]).is_empty());
    }
}
