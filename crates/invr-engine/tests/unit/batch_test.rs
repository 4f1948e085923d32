//! Tests for batch processing

#[cfg(test)]
mod batch_tests {
    use crate::test_utils::{TableSource, dec};
    use invr_domain::Invoice;
    use invr_domain::entities::{Rule, RuleSet};
    use invr_engine::{
        BatchProcessor, CancellationToken, MergePlan, MergeStrategy, RecordOutcome, RuleEngine,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn rule_set() -> Arc<RuleSet> {
        Arc::new(
            RuleSet::new(vec![
                Rule::completion("tax", "Tax", "tax_amount", "total_amount * 0.06")
                    .with_apply_to("has(total_amount) && !has(tax_amount)"),
                Rule::validation(
                    "total_positive",
                    "Total positive",
                    "total_amount",
                    "total_amount > 0",
                    "Total must be positive",
                ),
            ])
            .unwrap(),
        )
    }

    fn invoices(totals: &[&str]) -> Vec<Invoice> {
        totals
            .iter()
            .enumerate()
            .map(|(i, total)| Invoice {
                total_amount: Some(dec(total)),
                ..Invoice::new(format!("INV-{i}"))
            })
            .collect()
    }

    fn processor() -> BatchProcessor {
        let engine = RuleEngine::builder()
            .data_source(Arc::new(TableSource::companies()))
            .build();
        BatchProcessor::new(Arc::new(engine)).with_concurrency(3)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_results_keep_input_order() {
        let totals = ["100", "-5", "200", "300", "0", "50", "10"];
        let report = processor()
            .process(invoices(&totals), rule_set(), CancellationToken::new())
            .await;

        assert_eq!(report.results.len(), totals.len());
        for (i, result) in report.results.iter().enumerate() {
            let outcome = result.as_ref().unwrap();
            assert_eq!(outcome.index, i);
            assert_eq!(
                outcome.record.invoice_number.as_deref(),
                Some(format!("INV-{i}").as_str())
            );
        }
        assert_eq!(report.valid_count(), 5);
        assert_eq!(report.failure_count(), 0);
        let first = report.results[0].as_ref().unwrap();
        assert_eq!(first.record.tax_amount, Some(dec("6")));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = processor()
            .process(Vec::<Invoice>::new(), rule_set(), CancellationToken::new())
            .await;
        assert!(report.results.is_empty());
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_batch_runs_no_rules() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = processor()
            .process(invoices(&["100", "200"]), rule_set(), cancel)
            .await;
        assert!(report.cancelled);
        for result in &report.results {
            let outcome = result.as_ref().unwrap();
            assert!(outcome.completion.cancelled);
            assert_eq!(outcome.record.tax_amount, None);
        }
    }

    #[tokio::test]
    async fn test_batches_get_distinct_ids() {
        let processor = processor();
        let a = processor
            .process(invoices(&["1"]), rule_set(), CancellationToken::new())
            .await;
        let b = processor
            .process(invoices(&["1"]), rule_set(), CancellationToken::new())
            .await;
        assert_ne!(a.batch_id, b.batch_id);
    }

    fn invoice(value: serde_json::Value) -> Invoice {
        serde_json::from_value(value).unwrap()
    }

    /// Three invoices: customers A, B, A on two dates from two suppliers
    fn mixed_invoices() -> Vec<Invoice> {
        vec![
            invoice(json!({
                "invoice_number": "INV-0",
                "issue_date": "2024-05-01",
                "currency": "CNY",
                "supplier": {"tax_no": "S1"},
                "customer": {"tax_no": "A"},
                "total_amount": 100,
                "items": [{"description": "住宿", "amount": 100}],
                "extensions": {"project": "P1"}
            })),
            invoice(json!({
                "invoice_number": "INV-1",
                "issue_date": "2024-05-02",
                "currency": "CNY",
                "supplier": {"tax_no": "S1"},
                "customer": {"tax_no": "B"},
                "total_amount": 50,
                "items": [{"description": "餐饮", "amount": 50}],
                "extensions": {"project": "P2"}
            })),
            invoice(json!({
                "invoice_number": "INV-2",
                "issue_date": "2024-05-01",
                "currency": "CNY",
                "supplier": {"tax_no": "S2"},
                "customer": {"tax_no": "A"},
                "total_amount": 200,
                "items": [{"description": "会议", "amount": 200}],
                "extensions": {"project": "P1"}
            })),
        ]
    }

    async fn run(plan: MergePlan, records: Vec<Invoice>) -> Vec<RecordOutcome<Invoice>> {
        processor()
            .with_merge(plan)
            .process(records, rule_set(), CancellationToken::new())
            .await
            .results
            .into_iter()
            .map(Result::unwrap)
            .collect()
    }

    fn sources(outcomes: &[RecordOutcome<Invoice>]) -> Vec<Vec<usize>> {
        outcomes.iter().map(|o| o.sources.clone()).collect()
    }

    #[tokio::test]
    async fn test_merge_by_customer_folds_completed_records() {
        let outcomes = run(MergePlan::new(MergeStrategy::ByCustomer), mixed_invoices()).await;

        assert_eq!(sources(&outcomes), vec![vec![0, 2], vec![1]]);
        let merged = &outcomes[0];
        assert_eq!(merged.index, 0);
        assert_eq!(merged.record.invoice_number.as_deref(), Some("INV-0"));
        assert_eq!(merged.record.total_amount, Some(dec("300")));
        // tax was completed per input before the merge: 6 + 12
        assert_eq!(merged.record.tax_amount, Some(dec("18")));
        assert_eq!(merged.record.items.len(), 2);
        assert_eq!(merged.completion.for_rule("tax").count(), 2);
        assert_eq!(outcomes[1].index, 1);
        assert_eq!(outcomes[1].record.tax_amount, Some(dec("3")));
    }

    #[tokio::test]
    async fn test_merge_by_supplier_skips_records_without_key() {
        let mut records = mixed_invoices();
        records[1].supplier.tax_no = None;
        records.push(invoice(json!({
            "invoice_number": "INV-3",
            "supplier": {"tax_no": "S1"},
            "total_amount": 10
        })));

        let outcomes = run(MergePlan::new(MergeStrategy::BySupplier), records).await;

        assert_eq!(sources(&outcomes), vec![vec![0, 3], vec![1], vec![2]]);
        assert_eq!(outcomes[0].record.total_amount, Some(dec("110")));
    }

    #[tokio::test]
    async fn test_merge_by_date() {
        let outcomes = run(MergePlan::new(MergeStrategy::ByDate), mixed_invoices()).await;

        assert_eq!(sources(&outcomes), vec![vec![0, 2], vec![1]]);
        assert_eq!(
            outcomes[0].record.customer.tax_no.as_deref(),
            Some("A"),
            "the first record keeps its parties"
        );
    }

    #[tokio::test]
    async fn test_merge_by_custom_keys() {
        let plan = MergePlan::new(MergeStrategy::Custom)
            .with_keys(["supplier.tax_no", "extensions.project"])
            .unwrap();
        let mut records = mixed_invoices();
        records[2].supplier.tax_no = Some("S1".into());

        let outcomes = run(plan, records).await;

        assert_eq!(sources(&outcomes), vec![vec![0, 2], vec![1]]);
    }

    #[tokio::test]
    async fn test_no_strategy_keeps_every_record() {
        let outcomes = run(MergePlan::new(MergeStrategy::None), mixed_invoices()).await;
        assert_eq!(sources(&outcomes), vec![vec![0], vec![1], vec![2]]);
    }

    #[tokio::test]
    async fn test_split_puts_tail_difference_on_last_part() {
        let records = vec![invoice(json!({
            "invoice_number": "INV-9",
            "total_amount": 100,
            "tax_amount": 6,
            "items": [
                {"description": "a", "amount": 1},
                {"description": "b", "amount": 1},
                {"description": "c", "amount": 1}
            ]
        }))];

        let outcomes = run(MergePlan::new(MergeStrategy::None).with_max_items(1), records).await;

        assert_eq!(sources(&outcomes), vec![vec![0], vec![0], vec![0]]);
        let numbers: Vec<_> = outcomes
            .iter()
            .map(|o| o.record.invoice_number.clone().unwrap())
            .collect();
        assert_eq!(numbers, vec!["INV-9-1", "INV-9-2", "INV-9-3"]);
        let totals: Vec<_> = outcomes.iter().map(|o| o.record.total_amount).collect();
        assert_eq!(
            totals,
            vec![Some(dec("33.33")), Some(dec("33.33")), Some(dec("33.34"))]
        );
        let taxes: Vec<_> = outcomes.iter().map(|o| o.record.tax_amount).collect();
        assert_eq!(taxes, vec![Some(dec("2")), Some(dec("2")), Some(dec("2"))]);
        assert!(outcomes.iter().all(|o| o.record.items.len() == 1));
    }

    #[tokio::test]
    async fn test_merged_record_is_split_by_line_amounts() {
        let plan = MergePlan::new(MergeStrategy::ByCustomer).with_max_items(1);
        let outcomes = run(plan, mixed_invoices()).await;

        assert_eq!(sources(&outcomes), vec![vec![0, 2], vec![0, 2], vec![1]]);
        assert_eq!(outcomes[0].record.total_amount, Some(dec("100")));
        assert_eq!(outcomes[1].record.total_amount, Some(dec("200")));
        assert_eq!(outcomes[0].record.tax_amount, Some(dec("6")));
        assert_eq!(outcomes[1].record.tax_amount, Some(dec("12")));
        let indexes: Vec<_> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_validation_runs_on_merged_record() {
        let rules = Arc::new(
            RuleSet::new(vec![Rule::validation(
                "limit",
                "Invoice limit",
                "total_amount",
                "total_amount <= 250",
                "Invoice exceeds the limit",
            )])
            .unwrap(),
        );
        let report = processor()
            .with_merge(MergePlan::new(MergeStrategy::ByCustomer))
            .process(mixed_invoices(), rules, CancellationToken::new())
            .await;

        assert_eq!(report.inputs, 3);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.valid_count(), 1);
        assert!(!report.results[0].as_ref().unwrap().validation.valid);
    }

    #[test]
    fn test_custom_strategy_needs_keys() {
        assert!(MergePlan::new(MergeStrategy::Custom).validate().is_err());
        assert!(
            MergePlan::new(MergeStrategy::Custom)
                .with_keys(["currency"])
                .unwrap()
                .validate()
                .is_ok()
        );
        assert!(
            MergePlan::new(MergeStrategy::Custom)
                .with_keys(["items[].name"])
                .is_err()
        );
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("by_customer".parse::<MergeStrategy>().unwrap(), MergeStrategy::ByCustomer);
        assert_eq!("BY_DATE".parse::<MergeStrategy>().unwrap(), MergeStrategy::ByDate);
        assert!("by_tax_party".parse::<MergeStrategy>().is_err());
        assert_eq!(MergeStrategy::BySupplier.to_string(), "by_supplier");
        assert!(MergePlan::default().is_noop());
    }
}
