// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for reconciler helpers

#[cfg(test)]
mod tests {
    use crate::reconcilers::{should_reconcile, status_changed};

    #[test]
    fn first_reconcile_is_due() {
        assert!(should_reconcile(Some(1), None));
    }

    #[test]
    fn matching_generations_skip_work() {
        assert!(!should_reconcile(Some(3), Some(3)));
    }

    #[test]
    fn advanced_generation_is_due() {
        assert!(should_reconcile(Some(4), Some(3)));
    }

    #[test]
    fn missing_generation_skips_work() {
        assert!(!should_reconcile(None, None));
        assert!(!should_reconcile(None, Some(1)));
    }

    #[test]
    fn status_change_detection() {
        assert!(!status_changed(&Some("Ready"), &Some("Ready")));
        assert!(status_changed(&Some("Pending"), &Some("Ready")));
        assert!(status_changed(&None::<&str>, &Some("Ready")));
    }
}
