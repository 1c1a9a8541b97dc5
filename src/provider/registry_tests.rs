// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `registry.rs`

#[cfg(test)]
mod tests {
    use crate::provider::mock::InMemoryFactory;
    use crate::provider::registry::{HandlerRegistry, TypeRejection};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(InMemoryFactory::new()));
        registry
    }

    #[test]
    fn lookup_finds_registered_factory() {
        assert!(registry().lookup("mock-inmemory").is_ok());
    }

    #[test]
    fn lookup_rejects_unknown_type() {
        assert_eq!(
            registry().lookup("aws-route53").unwrap_err(),
            TypeRejection::Unsupported
        );
    }

    #[test]
    fn deny_list_disables_type() {
        let mut registry = registry();
        registry.set_disabled_types(BTreeSet::from(["mock-inmemory".to_string()]));
        assert_eq!(
            registry.lookup("mock-inmemory").unwrap_err(),
            TypeRejection::Disabled
        );
    }

    #[test]
    fn allow_list_disables_unlisted_type() {
        let mut registry = registry();
        registry.set_enabled_types(Some(BTreeSet::from(["aws-route53".to_string()])));
        assert_eq!(
            registry.lookup("mock-inmemory").unwrap_err(),
            TypeRejection::Disabled
        );
    }

    #[test]
    fn unknown_type_wins_over_disabled() {
        let mut registry = registry();
        registry.set_disabled_types(BTreeSet::from(["aws-route53".to_string()]));
        assert_eq!(
            registry.lookup("aws-route53").unwrap_err(),
            TypeRejection::Unsupported
        );
    }
}
