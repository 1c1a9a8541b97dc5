// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `name.rs`

#[cfg(test)]
mod tests {
    use crate::dns::name::{domain_covers, DnsName, DnsSetName, NameError};

    #[test]
    fn normalizes_case_and_trailing_dot() {
        let name = DnsName::new("WWW.Example.COM.").unwrap();
        assert_eq!(name.as_str(), "www.example.com");
    }

    #[test]
    fn rejects_empty_name() {
        assert_eq!(DnsName::new(""), Err(NameError::Empty));
        assert_eq!(DnsName::new("."), Err(NameError::Empty));
    }

    #[test]
    fn rejects_empty_label() {
        assert!(matches!(
            DnsName::new("foo..example.com"),
            Err(NameError::InvalidName { .. })
        ));
    }

    #[test]
    fn accepts_leftmost_wildcard() {
        let name = DnsName::new("*.example.com").unwrap();
        assert!(name.is_wildcard());
    }

    #[test]
    fn rejects_inner_wildcard() {
        assert!(DnsName::new("foo.*.example.com").is_err());
        assert!(DnsName::new("*foo.example.com").is_err());
    }

    #[test]
    fn accepts_underscore_labels() {
        assert!(DnsName::new("_acme-challenge.example.com").is_ok());
    }

    #[test]
    fn rejects_hyphen_edges() {
        assert!(DnsName::new("-bad.example.com").is_err());
        assert!(DnsName::new("bad-.example.com").is_err());
    }

    #[test]
    fn rejects_overlong_label() {
        let label = "a".repeat(64);
        assert!(DnsName::new(&format!("{label}.example.com")).is_err());
    }

    #[test]
    fn domain_cover_is_label_aligned() {
        assert!(domain_covers("example.com", "example.com"));
        assert!(domain_covers("example.com", "www.example.com"));
        assert!(!domain_covers("example.com", "notexample.com"));
        assert!(!domain_covers("www.example.com", "example.com"));
    }

    #[test]
    fn is_under_domain() {
        let name = DnsName::new("api.first.example.com").unwrap();
        assert!(name.is_under_domain("first.example.com"));
        assert!(name.is_under_domain("example.com"));
        assert!(!name.is_under_domain("second.example.com"));
    }

    #[test]
    fn set_name_display() {
        let name = DnsName::new("www.example.com").unwrap();
        assert_eq!(DnsSetName::simple(name.clone()).to_string(), "www.example.com");
        assert_eq!(
            DnsSetName::with_identifier(name, "eu".to_string()).to_string(),
            "www.example.com#eu"
        );
    }

    #[test]
    fn set_name_ordering_groups_identifiers() {
        let name = DnsName::new("www.example.com").unwrap();
        let plain = DnsSetName::simple(name.clone());
        let eu = DnsSetName::with_identifier(name, "eu".to_string());
        assert!(plain < eu);
    }
}
