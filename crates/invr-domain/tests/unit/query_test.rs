//! Tests for query descriptor matching

#[cfg(test)]
mod query_tests {
    use invr_domain::value::{Row, Value};
    use invr_domain::value_objects::{
        ConditionValue, QueryCondition, QueryDescriptor, QueryOperator,
    };

    fn rate_row(category: &str, min: i64, rate: &str) -> Row {
        let mut row = Row::new();
        row.insert("category".into(), Value::from(category));
        row.insert("min_amount".into(), Value::from(min));
        row.insert("rate".into(), Value::from(rate.parse::<rust_decimal::Decimal>().unwrap()));
        row
    }

    #[test]
    fn test_equality_and_projection() {
        let rows = vec![rate_row("GENERAL", 0, "0.06"), rate_row("TRAVEL", 0, "0.09")];
        let query = QueryDescriptor::new("tax_rates", Some("rate".to_string()))
            .with_condition(QueryCondition::eq("category", "TRAVEL"));
        let row = query.select(rows.iter()).unwrap();
        assert_eq!(query.project(row).to_string(), "0.09");
    }

    #[test]
    fn test_numeric_comparisons() {
        let rows = vec![rate_row("GENERAL", 1000, "0.13"), rate_row("GENERAL", 0, "0.06")];
        let query = QueryDescriptor::new("tax_rates", Some("rate".to_string())).with_condition(
            QueryCondition::new(
                "min_amount",
                QueryOperator::Le,
                ConditionValue::Single(Value::from(500)),
            ),
        );
        let row = query.select(rows.iter()).unwrap();
        assert_eq!(query.project(row).to_string(), "0.06");
    }

    #[test]
    fn test_in_between_and_not_in() {
        let row = rate_row("TRAVEL", 200, "0.09");
        let in_list = QueryCondition::new(
            "category",
            QueryOperator::In,
            ConditionValue::List(vec![Value::from("GENERAL"), Value::from("TRAVEL")]),
        );
        let not_in = QueryCondition::new(
            "category",
            QueryOperator::NotIn,
            ConditionValue::List(vec![Value::from("TRAVEL")]),
        );
        let between = QueryCondition::new(
            "min_amount",
            QueryOperator::Between,
            ConditionValue::Range(Value::from(100), Value::from(300)),
        );
        assert!(in_list.matches(&row));
        assert!(!not_in.matches(&row));
        assert!(between.matches(&row));
    }

    #[test]
    fn test_missing_column_never_matches() {
        let row = rate_row("GENERAL", 0, "0.06");
        assert!(!QueryCondition::eq("region", "EU").matches(&row));
    }

    #[test]
    fn test_whole_row_projection() {
        let rows = vec![rate_row("GENERAL", 0, "0.06")];
        let query = QueryDescriptor::new("tax_rates", None);
        let row = query.select(rows.iter()).unwrap();
        assert!(matches!(query.project(row), Value::Map(_)));
    }

    #[test]
    fn test_cache_key_distinguishes_conditions() {
        let a = QueryDescriptor::new("companies", Some("tax_number".to_string()))
            .with_condition(QueryCondition::eq("name", "Acme"));
        let b = QueryDescriptor::new("companies", Some("tax_number".to_string()))
            .with_condition(QueryCondition::eq("name", "Other"));
        assert_ne!(a.cache_key(), b.cache_key());
    }
}
