// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use clap::Parser;

    #[test]
    fn defaults_are_sane() {
        let config = Config::parse_from(["dnsman"]);
        assert_eq!(config.class, "dnsman");
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.zone_cache_ttl, 300);
        assert!(config.enabled_types().is_none());
        assert!(config.default_rate_limit().is_none());
    }

    #[test]
    fn type_lists_parse_comma_separated() {
        let config = Config::parse_from([
            "dnsman",
            "--enabled-provider-types",
            "mock-inmemory,aws-route53",
            "--disabled-provider-types",
            "azure-dns",
        ]);
        let enabled = config.enabled_types().unwrap();
        assert!(enabled.contains("mock-inmemory"));
        assert!(enabled.contains("aws-route53"));
        assert!(config.disabled_types().contains("azure-dns"));
    }

    #[test]
    fn rate_limit_requires_enable_flag() {
        let config = Config::parse_from(["dnsman", "--rate-limit-requests-per-day", "100"]);
        assert!(config.default_rate_limit().is_none());

        let config = Config::parse_from([
            "dnsman",
            "--rate-limits-enabled",
            "--rate-limit-requests-per-day",
            "100",
            "--rate-limit-burst",
            "5",
        ]);
        let quota = config.default_rate_limit().unwrap();
        assert_eq!(quota.requests_per_day, 100);
        assert_eq!(quota.burst, 5);
    }

    #[test]
    fn target_labels_parse_key_value_pairs() {
        let config = Config::parse_from([
            "dnsman",
            "--source-target-labels",
            "app=dns,team=platform",
        ]);
        assert_eq!(
            config.target_labels(),
            vec![
                ("app".to_string(), "dns".to_string()),
                ("team".to_string(), "platform".to_string()),
            ]
        );
    }
}
