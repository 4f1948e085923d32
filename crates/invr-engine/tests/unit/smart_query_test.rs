//! Tests for smart query parsing and execution

#[cfg(test)]
mod smart_query_tests {
    use crate::test_utils::{FailingSource, SlowSource, TableSource, dec, row};
    use invr_domain::value::Value;
    use invr_domain::value_objects::QueryOperator;
    use invr_engine::expression::Scope;
    use invr_engine::smart_query::{
        FieldDefaults, Operand, Resolution, SmartQueryEngine, ValueRef, find_queries,
        parse_condition,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn scope() -> Scope {
        Scope::new(Value::from_json(json!({
            "supplier": {"name": "Acme Co"},
            "customer": {"name": "Globex"}
        })))
    }

    #[test]
    fn test_find_query_with_field_and_condition() {
        let found = find_queries(r#"db.companies.tax_number[name="Acme Co"] != ''"#).unwrap();
        assert_eq!(found.len(), 1);
        let located = &found[0];
        assert_eq!(located.span.start, 0);
        assert_eq!(located.source, r#"db.companies.tax_number[name="Acme Co"]"#);
        let query = located.query.as_ref().unwrap();
        assert_eq!(query.table, "companies");
        assert_eq!(query.field.as_deref(), Some("tax_number"));
        assert_eq!(query.conditions.len(), 1);
        assert_eq!(
            query.conditions[0].operand,
            Operand::Single(ValueRef::Literal(Value::from("Acme Co")))
        );
    }

    #[test]
    fn test_find_skips_strings_and_member_access() {
        let found = find_queries("'db.x.y[a=1]' + mydb.x[a=1] + obj.db.t[a=1]").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_table_without_field_returns_row_query() {
        let found = find_queries("db.companies[name=$supplier.name].category").unwrap();
        let query = found[0].query.as_ref().unwrap();
        assert_eq!(query.field, None);
        assert_eq!(
            query.conditions[0].operand,
            Operand::Single(ValueRef::Variable(vec![
                "supplier".to_string(),
                "name".to_string()
            ]))
        );
    }

    #[test]
    fn test_unterminated_bracket_is_syntax_error() {
        let err = find_queries("db.companies.tax_number[name='Acme'").unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_two_character_operators_win() {
        let condition = parse_condition("amount>=10").unwrap();
        assert_eq!(condition.operator, QueryOperator::Ge);
        assert_eq!(
            condition.operand,
            Operand::Single(ValueRef::Literal(Value::from(10)))
        );
        assert_eq!(parse_condition("a<=1").unwrap().operator, QueryOperator::Le);
        assert_eq!(parse_condition("a!=1").unwrap().operator, QueryOperator::Ne);
        assert_eq!(parse_condition("a==1").unwrap().operator, QueryOperator::Eq);
        assert_eq!(parse_condition("a<1").unwrap().operator, QueryOperator::Lt);
    }

    #[test]
    fn test_word_operators_are_case_insensitive() {
        let condition = parse_condition("category not in ['A', 'B']").unwrap();
        assert_eq!(condition.operator, QueryOperator::NotIn);
        assert_eq!(
            condition.operand,
            Operand::List(vec![
                ValueRef::Literal(Value::from("A")),
                ValueRef::Literal(Value::from("B")),
            ])
        );
        assert_eq!(
            parse_condition("name like '%Acme%'").unwrap().operator,
            QueryOperator::Like
        );
        assert_eq!(
            parse_condition("code IN ('x', 'y')").unwrap().operator,
            QueryOperator::In
        );
    }

    #[test]
    fn test_between_range() {
        let condition = parse_condition("rate BETWEEN 0.03 AND 0.13").unwrap();
        assert_eq!(condition.operator, QueryOperator::Between);
        assert_eq!(
            condition.operand,
            Operand::Range(
                ValueRef::Literal(Value::from(dec("0.03"))),
                ValueRef::Literal(Value::from(dec("0.13"))),
            )
        );
        assert!(parse_condition("rate BETWEEN 1").is_err());
    }

    #[test]
    fn test_value_classification() {
        assert_eq!(
            parse_condition("flag = true").unwrap().operand,
            Operand::Single(ValueRef::Literal(Value::Bool(true)))
        );
        assert_eq!(
            parse_condition("x = None").unwrap().operand,
            Operand::Single(ValueRef::Literal(Value::Null))
        );
        assert_eq!(
            parse_condition("name = supplier.name").unwrap().operand,
            Operand::Single(ValueRef::Path(vec![
                "supplier".to_string(),
                "name".to_string()
            ]))
        );
        assert_eq!(
            parse_condition("status = active").unwrap().operand,
            Operand::Single(ValueRef::Word("active".to_string()))
        );
    }

    #[test]
    fn test_missing_operator_is_error() {
        assert!(parse_condition("name 'Acme'").is_err());
        assert!(parse_condition("= 'Acme'").is_err());
        assert!(parse_condition("name =").is_err());
    }

    #[test]
    fn test_malformed_condition_is_reported_per_query() {
        let found = find_queries("db.companies.tax_number[name 'Acme']").unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].query.is_err());
    }

    fn engine(source: impl invr_domain::ports::DataSource + 'static) -> SmartQueryEngine {
        SmartQueryEngine::new(Arc::new(source))
    }

    async fn run(engine: &SmartQueryEngine, text: &str) -> Resolution {
        let found = find_queries(text).unwrap();
        let query = found[0].query.clone().unwrap();
        engine.execute(&query, &scope()).await
    }

    #[tokio::test]
    async fn test_execute_found() {
        let engine = engine(TableSource::companies());
        let resolution = run(&engine, r#"db.companies.tax_number[name="Acme Co"]"#).await;
        assert_eq!(resolution, Resolution::Found(Value::from("123")));
    }

    #[tokio::test]
    async fn test_execute_resolves_variables_and_paths() {
        let engine = engine(TableSource::companies());
        let by_variable = run(&engine, "db.companies.tax_number[name=$customer.name]").await;
        assert_eq!(by_variable.value(), &Value::from("456"));
        let by_path = run(&engine, "db.companies.tax_number[name=supplier.name]").await;
        assert_eq!(by_path.value(), &Value::from("123"));
    }

    #[tokio::test]
    async fn test_engine_variables_take_precedence() {
        let engine = engine(TableSource::companies());
        let found = find_queries("db.companies.tax_number[name=$who]").unwrap();
        let query = found[0].query.clone().unwrap();
        let mut variables = std::collections::BTreeMap::new();
        variables.insert("who".to_string(), Value::from("Globex"));
        let scope = scope().with_variables(variables);
        assert_eq!(
            engine.execute(&query, &scope).await,
            Resolution::Found(Value::from("456"))
        );
    }

    #[tokio::test]
    async fn test_no_row_falls_back_to_default() {
        let engine = engine(TableSource::companies());
        let resolution = run(&engine, r#"db.companies.tax_number[name="Nobody"]"#).await;
        assert!(resolution.is_fallback());
        assert_eq!(resolution.value(), &Value::from(""));
    }

    #[tokio::test]
    async fn test_unbound_variable_falls_back() {
        let engine = engine(TableSource::companies());
        let resolution = run(&engine, "db.companies.category[name=$nobody.name]").await;
        assert!(resolution.is_fallback());
        assert_eq!(resolution.value(), &Value::from("GENERAL"));
    }

    #[tokio::test]
    async fn test_qualified_default_wins() {
        let source = TableSource::companies();
        let engine = engine(source).with_defaults(
            FieldDefaults::default()
                .with("companies.category", "UNKNOWN")
                .with("suppliers.rate", Value::from(dec("0.13"))),
        );
        let resolution = run(&engine, "db.companies.category[name='Nobody']").await;
        assert_eq!(resolution.value(), &Value::from("UNKNOWN"));
        let other = run(&engine, "db.others.rate[name='x']").await;
        assert_eq!(other.value(), &Value::from(dec("0.06")));
        let unknown = run(&engine, "db.others.colour[name='x']").await;
        assert_eq!(unknown.value(), &Value::Null);
    }

    #[tokio::test]
    async fn test_failing_source_falls_back() {
        let engine = engine(FailingSource);
        let resolution = run(&engine, "db.companies.tax_number[name='Acme Co']").await;
        match resolution {
            Resolution::Fallback { value, reason } => {
                assert_eq!(value, Value::from(""));
                assert!(reason.contains("connection refused"), "{reason}");
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let engine = engine(SlowSource).with_timeout(Duration::from_millis(50));
        let resolution = run(&engine, "db.companies.tax_number[name='Acme Co']").await;
        match resolution {
            Resolution::Fallback { reason, .. } => assert!(reason.contains("timed out")),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_like_prefers_exact_row() {
        let source = TableSource::default().with_table(
            "products",
            vec![
                row(&[("name", Value::from("住宿服务")), ("rate", Value::from(dec("0.06")))]),
                row(&[("name", Value::from("住宿")), ("rate", Value::from(dec("0.13")))]),
            ],
        );
        let engine = engine(source);
        let resolution = run(&engine, "db.products.rate[name LIKE '住宿']").await;
        assert_eq!(resolution, Resolution::Found(Value::from(dec("0.13"))));
    }
}
