// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `recordset.rs`

#[cfg(test)]
mod tests {
    use crate::dns::recordset::{quote_txt, RecordSet, RecordType};
    use std::str::FromStr;

    #[test]
    fn record_type_round_trip() {
        for rtype in RecordType::ALL {
            assert_eq!(RecordType::from_str(rtype.as_str()).unwrap(), rtype);
        }
        assert!(RecordType::from_str("PTR").is_err());
    }

    #[test]
    fn record_type_parse_is_case_insensitive() {
        assert_eq!(RecordType::from_str("cname").unwrap(), RecordType::CNAME);
    }

    #[test]
    fn new_dedups_and_sorts() {
        let set = RecordSet::new(
            RecordType::A,
            300,
            vec![
                "2.2.2.2".to_string(),
                "1.1.1.1".to_string(),
                "2.2.2.2".to_string(),
            ],
        );
        assert_eq!(set.records, vec!["1.1.1.1", "2.2.2.2"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn equality_ignores_input_order() {
        let a = RecordSet::new(
            RecordType::A,
            300,
            vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()],
        );
        let b = RecordSet::new(
            RecordType::A,
            300,
            vec!["2.2.2.2".to_string(), "1.1.1.1".to_string()],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn ttl_is_part_of_equality() {
        let a = RecordSet::new(RecordType::A, 300, vec!["1.1.1.1".to_string()]);
        let b = RecordSet::new(RecordType::A, 600, vec!["1.1.1.1".to_string()]);
        assert_ne!(a, b);
    }

    #[test]
    fn quote_txt_wraps_bare_values() {
        assert_eq!(quote_txt("hello world"), "\"hello world\"");
    }

    #[test]
    fn quote_txt_preserves_quoted_values() {
        assert_eq!(quote_txt("\"already\""), "\"already\"");
    }

    #[test]
    fn quote_txt_escapes_embedded_quotes() {
        assert_eq!(quote_txt("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
