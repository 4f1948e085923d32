//! Tests for the business validation pass

#[cfg(test)]
mod validation_tests {
    use crate::test_utils::{TableSource, dec, invoice_with_items, item};
    use invr_domain::Invoice;
    use invr_domain::entities::{Rule, RuleKind, RuleSet, Severity};
    use invr_domain::value_objects::TraceStatus;
    use invr_engine::RuleEngine;
    use invr_engine::constants::RULE_ERROR_PREFIX;
    use std::sync::Arc;

    fn engine() -> RuleEngine {
        RuleEngine::builder()
            .data_source(Arc::new(TableSource::companies()))
            .build()
    }

    fn rules(rules: Vec<Rule>) -> RuleSet {
        RuleSet::new(rules).unwrap()
    }

    fn positive_amounts(path: &str, expression: &str) -> Rule {
        Rule::validation(
            "positive_amounts",
            "Positive item amounts",
            path,
            expression,
            "Item amounts must be positive",
        )
    }

    #[tokio::test]
    async fn test_all_items_check_reports_one_issue() {
        let set = rules(vec![positive_amounts(
            "items",
            "items.all(item, item.amount > 0)",
        )]);
        let invoice = invoice_with_items(vec![item("a", "10"), item("b", "0"), item("c", "5")]);
        let result = engine().validate(&invoice, &set).await;
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Item amounts must be positive");
        assert_eq!(result.summary.failed, 1);
    }

    #[tokio::test]
    async fn test_collection_path_aggregates_failing_items() {
        let set = rules(vec![positive_amounts("items[].amount", "item.amount > 0")]);
        let invoice = invoice_with_items(vec![
            item("a", "-1"),
            item("b", "10"),
            item("c", "0"),
        ]);
        let result = engine().validate(&invoice, &set).await;
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].item_indices, vec![0, 2]);
        assert_eq!(result.errors[0].field_path, "items[].amount");
    }

    #[tokio::test]
    async fn test_validation_any_needs_one_passing_item() {
        let rule = Rule::validation(
            "has_lodging",
            "Has lodging line",
            "items[].description",
            "item.description.contains('住')",
            "At least one lodging line is required",
        )
        .with_kind(RuleKind::ValidationAny);
        let set = rules(vec![rule]);

        let passing = invoice_with_items(vec![item("餐饮", "10"), item("住宿", "300")]);
        assert!(engine().validate(&passing, &set).await.valid);

        let failing = invoice_with_items(vec![item("餐饮", "10"), item("交通", "30")]);
        let result = engine().validate(&failing, &set).await;
        assert!(!result.valid);
        assert_eq!(result.errors[0].item_indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_empty_or_gated_out_collection_passes() {
        let set = rules(vec![
            positive_amounts("items[].amount", "item.amount > 0").with_apply_to("item.amount != 0"),
        ]);
        let empty = invoice_with_items(Vec::new());
        let result = engine().validate(&empty, &set).await;
        assert!(result.valid);
        assert_eq!(result.summary.skipped, 1);

        let zeroes = invoice_with_items(vec![item("a", "0")]);
        assert!(engine().validate(&zeroes, &set).await.valid);
    }

    #[tokio::test]
    async fn test_gated_out_scalar_rule_is_skipped() {
        let set = rules(vec![
            Rule::validation(
                "tax_no_required",
                "Supplier tax number",
                "supplier.tax_no",
                "has(supplier.tax_no)",
                "Supplier tax number is required",
            )
            .with_apply_to("invoice_type == 'special'"),
        ]);
        let invoice = Invoice {
            invoice_type: Some("normal".to_string()),
            ..Invoice::new("INV-1")
        };
        let result = engine().validate(&invoice, &set).await;
        assert!(result.valid);
        assert_eq!(result.summary.skipped, 1);
        assert_eq!(result.summary.evaluated, 0);
    }

    #[tokio::test]
    async fn test_raising_rule_is_isolated() {
        let set = rules(vec![
            Rule::validation(
                "broken",
                "Broken rule",
                "currency",
                "currency * 2 > 0",
                "never shown",
            )
            .with_priority(90),
            Rule::validation(
                "total_positive",
                "Total positive",
                "total_amount",
                "total_amount > 0",
                "Total must be positive",
            ),
        ]);
        let invoice = Invoice {
            currency: Some("CNY".to_string()),
            total_amount: Some(dec("-1")),
            ..Invoice::new("INV-1")
        };
        let result = engine().validate(&invoice, &set).await;
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].message.starts_with(RULE_ERROR_PREFIX));
        assert_eq!(result.errors[1].message, "Total must be positive");
        assert_eq!(result.summary.errored, 1);
        assert_eq!(result.summary.failed, 2);
        assert_eq!(
            result.trace.for_rule("broken").last().unwrap().status,
            TraceStatus::Error
        );
    }

    #[tokio::test]
    async fn test_non_boolean_result_is_failure() {
        let set = rules(vec![Rule::validation(
            "not_bool",
            "Not boolean",
            "total_amount",
            "total_amount",
            "unused",
        )]);
        let invoice = Invoice {
            total_amount: Some(dec("10")),
            ..Invoice::new("INV-1")
        };
        let result = engine().validate(&invoice, &set).await;
        assert!(!result.valid);
        assert_eq!(result.summary.errored, 1);
    }

    #[tokio::test]
    async fn test_warnings_do_not_invalidate() {
        let set = rules(vec![
            Rule::validation(
                "email",
                "Supplier email",
                "supplier.email",
                "has(supplier.email)",
                "Supplier email is recommended",
            )
            .with_severity(Severity::Warning),
        ]);
        let result = engine().validate(&Invoice::new("INV-1"), &set).await;
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_validation_never_mutates() {
        let set = rules(vec![
            Rule::completion("country", "Country", "country", "'CN'"),
            Rule::validation(
                "country_set",
                "Country set",
                "country",
                "has(country)",
                "Country is required",
            ),
        ]);
        let invoice = Invoice::new("INV-1");
        let before = invoice.clone();
        let result = engine().validate(&invoice, &set).await;
        assert_eq!(invoice, before);
        assert_eq!(result.summary.total_rules, 1);
        assert_eq!(result.error_messages(), vec!["Country is required"]);
    }

    #[tokio::test]
    async fn test_smart_query_in_validation() {
        let set = rules(vec![Rule::validation(
            "known_supplier",
            "Known supplier",
            "supplier.tax_no",
            "supplier.tax_no == db.companies.tax_number[name=$supplier.name]",
            "Supplier tax number does not match the registry",
        )]);
        let mut invoice = Invoice::new("INV-1");
        invoice.supplier.name = Some("Acme Co".to_string());
        invoice.supplier.tax_no = Some("123".to_string());
        assert!(engine().validate(&invoice, &set).await.valid);

        invoice.supplier.tax_no = Some("999".to_string());
        assert!(!engine().validate(&invoice, &set).await.valid);
    }

    #[tokio::test]
    async fn test_process_validates_completed_record() {
        let set = rules(vec![
            Rule::completion("country", "Country", "country", "'CN'"),
            Rule::validation(
                "country_set",
                "Country set",
                "country",
                "has(country)",
                "Country is required",
            ),
        ]);
        let mut invoice = Invoice::new("INV-1");
        let outcome = engine()
            .process(&mut invoice, &set, &invr_engine::CancellationToken::new())
            .await;
        assert!(outcome.validation.valid);
        assert_eq!(outcome.completion.count(TraceStatus::Success), 1);
    }
}
