// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for provider reconciliation helpers

#[cfg(test)]
mod tests {
    use crate::crd::SelectorSpec;
    use crate::reconcilers::provider::selector_from_spec;

    #[test]
    fn absent_selector_selects_everything() {
        let selector = selector_from_spec(None);
        assert!(selector.include.is_empty());
        assert!(selector.exclude.is_empty());
    }

    #[test]
    fn selector_lists_carry_over() {
        let spec = SelectorSpec {
            include: Some(vec!["first.example.com".to_string()]),
            exclude: Some(vec!["second.example.com".to_string()]),
        };
        let selector = selector_from_spec(Some(&spec));
        assert_eq!(selector.include, vec!["first.example.com"]);
        assert_eq!(selector.exclude, vec!["second.example.com"]);
    }
}
