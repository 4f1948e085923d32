//! Tests for smart query and auxiliary call substitution

#[cfg(test)]
mod preprocessor_tests {
    use crate::test_utils::{ScriptedFunctions, TableSource, dec, scripted};
    use invr_domain::ports::{DataSource, FunctionHost, NullFunctionHost};
    use invr_domain::value::Value;
    use invr_engine::expression::{Evaluator, Scope};
    use invr_engine::preprocessor::{Preprocessor, to_literal};
    use invr_engine::smart_query::SmartQueryEngine;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn preprocessor(source: Arc<dyn DataSource>, functions: Arc<dyn FunctionHost>) -> Preprocessor {
        Preprocessor::new(
            Arc::new(Evaluator::new()),
            SmartQueryEngine::new(source),
            functions,
        )
    }

    fn scope() -> Scope {
        Scope::new(Value::from_json(json!({
            "supplier": {"name": "Acme Co"},
            "items": [{"description": "住宿费"}]
        })))
    }

    #[tokio::test]
    async fn test_smart_query_resolves_to_literal() {
        let pre = preprocessor(Arc::new(TableSource::companies()), Arc::new(NullFunctionHost));
        let rewritten = pre
            .rewrite(r#"db.companies.tax_number[name="Acme Co"]"#, &scope())
            .await
            .unwrap();
        assert_eq!(rewritten.expression, r#""123""#);
        assert!(rewritten.fallbacks.is_empty());
    }

    #[tokio::test]
    async fn test_missing_row_resolves_to_declared_default() {
        let pre = preprocessor(Arc::new(TableSource::companies()), Arc::new(NullFunctionHost));
        let rewritten = pre
            .rewrite(r#"db.companies.tax_number[name="Nobody"]"#, &scope())
            .await
            .unwrap();
        assert_eq!(rewritten.expression, r#""""#);
        assert_eq!(rewritten.fallbacks.len(), 1);
        assert_eq!(
            rewritten.fallbacks[0].source,
            r#"db.companies.tax_number[name="Nobody"]"#
        );
    }

    #[tokio::test]
    async fn test_query_embedded_in_larger_expression() {
        let pre = preprocessor(Arc::new(TableSource::companies()), Arc::new(NullFunctionHost));
        let rewritten = pre
            .rewrite(
                "has(supplier.tax_no) ? supplier.tax_no : db.companies.tax_number[name=$supplier.name]",
                &scope(),
            )
            .await
            .unwrap();
        assert_eq!(
            rewritten.expression,
            r#"has(supplier.tax_no) ? supplier.tax_no : "123""#
        );
    }

    #[tokio::test]
    async fn test_malformed_condition_falls_back_instead_of_failing() {
        let pre = preprocessor(Arc::new(TableSource::companies()), Arc::new(NullFunctionHost));
        let rewritten = pre
            .rewrite("db.companies.category[name 'Acme']", &scope())
            .await
            .unwrap();
        assert_eq!(rewritten.expression, r#""GENERAL""#);
        assert_eq!(rewritten.fallbacks.len(), 1);
    }

    #[tokio::test]
    async fn test_unterminated_query_is_error() {
        let pre = preprocessor(Arc::new(TableSource::companies()), Arc::new(NullFunctionHost));
        let err = pre
            .rewrite("db.companies.category[name='Acme'", &scope())
            .await
            .unwrap_err();
        assert!(err.is_syntax());
    }

    #[tokio::test]
    async fn test_host_call_replaced_with_result() {
        let functions = scripted();
        let pre = preprocessor(Arc::new(TableSource::default()), functions.clone());
        let rewritten = pre
            .rewrite("tax_rate_for(items[0].description) * 100", &scope())
            .await
            .unwrap();
        assert_eq!(rewritten.expression, "0.13 * 100");
        assert_eq!(functions.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_nested_host_calls_run_innermost_first() {
        let functions = scripted();
        let pre = preprocessor(Arc::new(TableSource::default()), functions.clone());
        let rewritten = pre
            .rewrite("echo(tax_rate_for('住宿'))", &scope())
            .await
            .unwrap();
        assert_eq!(rewritten.expression, "0.13");
        assert_eq!(functions.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_builtins_and_methods_are_left_alone() {
        let functions = scripted();
        let pre = preprocessor(Arc::new(TableSource::default()), functions.clone());
        let source = "size(items) > 0 && supplier.name.echo('x') != ''";
        let rewritten = pre.rewrite(source, &scope()).await.unwrap();
        assert_eq!(rewritten.expression, source);
        assert_eq!(functions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_call_uses_default() {
        let pre = preprocessor(Arc::new(TableSource::default()), scripted());
        let rewritten = pre.rewrite("broken()", &scope()).await.unwrap();
        assert_eq!(rewritten.expression, r#""DEFAULT""#);
        assert_eq!(rewritten.fallbacks.len(), 1);
        assert_eq!(rewritten.fallbacks[0].source, "broken()");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_to_default() {
        let pre = preprocessor(Arc::new(TableSource::default()), scripted())
            .with_call_timeout(Duration::from_millis(20));
        let rewritten = pre.rewrite("slow()", &scope()).await.unwrap();
        assert_eq!(rewritten.expression, r#""DEFAULT""#);
        assert!(rewritten.fallbacks[0].reason.contains("timed out"));
    }

    #[tokio::test]
    async fn test_bad_argument_uses_default() {
        let pre = preprocessor(Arc::new(TableSource::default()), scripted());
        let rewritten = pre
            .rewrite("tax_rate_for(supplier.missing)", &scope())
            .await
            .unwrap();
        assert_eq!(rewritten.expression, "0.06");
        assert!(rewritten.fallbacks[0].reason.starts_with("argument error"));
    }

    #[tokio::test]
    async fn test_plain_expression_is_untouched() {
        let pre = preprocessor(
            Arc::new(TableSource::default()),
            Arc::new(ScriptedFunctions::default()),
        );
        let rewritten = pre.rewrite("total_amount * 0.06", &scope()).await.unwrap();
        assert_eq!(rewritten.expression, "total_amount * 0.06");
    }

    #[test]
    fn test_literal_serialization() {
        assert_eq!(to_literal(&Value::Null), "null");
        assert_eq!(to_literal(&Value::Bool(true)), "true");
        assert_eq!(to_literal(&Value::from(dec("1.50"))), "1.5");
        assert_eq!(to_literal(&Value::from(-5)), "(-5)");
        assert_eq!(to_literal(&Value::from("a\"b\\c")), r#""a\"b\\c""#);
        assert_eq!(
            to_literal(&Value::List(vec![Value::from(1), Value::from("x")])),
            r#"[1, "x"]"#
        );
        let map = Value::from_json(json!({"k": 2}));
        assert_eq!(to_literal(&map), r#"{"k": 2}"#);
    }
}
