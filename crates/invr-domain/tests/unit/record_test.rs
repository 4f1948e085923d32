//! Tests for path-based record access

#[cfg(test)]
mod record_tests {
    use invr_domain::entities::{Invoice, InvoiceItem};
    use invr_domain::record::Record;
    use invr_domain::value::Value;
    use rust_decimal::Decimal;

    fn path(raw: &str) -> Vec<String> {
        raw.split('.').map(str::to_string).collect()
    }

    fn sample_invoice() -> Invoice {
        let mut invoice = Invoice::new("INV-001");
        invoice.total_amount = Some(Decimal::from(2520));
        invoice.supplier.name = Some("Acme Co".to_string());
        invoice.items.push(InvoiceItem {
            description: Some("Hotel stay".to_string()),
            amount: Some(Decimal::from(800)),
            ..InvoiceItem::default()
        });
        invoice
    }

    #[test]
    fn test_get_scalar_fields() {
        let invoice = sample_invoice();
        assert_eq!(
            invoice.get_path(&path("invoice_number")),
            Some(Value::from("INV-001"))
        );
        assert_eq!(
            invoice.get_path(&path("total_amount")),
            Some(Value::from(2520))
        );
        assert_eq!(invoice.get_path(&path("country")), Some(Value::Null));
        assert_eq!(invoice.get_path(&path("no_such_field")), None);
    }

    #[test]
    fn test_get_nested_fields() {
        let invoice = sample_invoice();
        assert_eq!(
            invoice.get_path(&path("supplier.name")),
            Some(Value::from("Acme Co"))
        );
        assert_eq!(
            invoice.get_path(&path("items.0.amount")),
            Some(Value::from(800))
        );
        assert_eq!(invoice.get_path(&path("items.3.amount")), None);
    }

    #[test]
    fn test_set_typed_fields() {
        let mut invoice = sample_invoice();
        invoice
            .set_path(&path("country"), Value::from("CN"))
            .unwrap();
        invoice
            .set_path(&path("tax_amount"), Value::from("151.2"))
            .unwrap();
        invoice
            .set_path(&path("issue_date"), Value::from("2024-03-01"))
            .unwrap();

        assert_eq!(invoice.country.as_deref(), Some("CN"));
        assert_eq!(invoice.tax_amount, Some(Decimal::new(1512, 1)));
        assert_eq!(
            invoice.issue_date.map(|d| d.to_string()).as_deref(),
            Some("2024-03-01")
        );
    }

    #[test]
    fn test_set_rejects_wrong_types() {
        let mut invoice = sample_invoice();
        assert!(
            invoice
                .set_path(&path("total_amount"), Value::from("lots"))
                .is_err()
        );
        assert!(
            invoice
                .set_path(&path("issue_date"), Value::from("yesterday"))
                .is_err()
        );
        assert!(
            invoice
                .set_path(&path("unknown_field"), Value::from(1))
                .is_err()
        );
    }

    #[test]
    fn test_extension_write_creates_nested_entries() {
        let mut invoice = sample_invoice();
        let target = path("extensions.routing.region");
        assert!(!invoice.has_path(&target));

        invoice.set_path(&target, Value::from("EU")).unwrap();

        assert!(invoice.has_path(&target));
        assert_eq!(invoice.get_path(&target), Some(Value::from("EU")));
    }

    #[test]
    fn test_item_paths() {
        let mut invoice = sample_invoice();
        assert_eq!(invoice.collection_len("items"), Some(1));
        assert_eq!(invoice.collection_len("lines"), None);

        invoice
            .set_item_path("items", 0, &path("tax_rate"), Value::from("0.06"))
            .unwrap();
        invoice
            .set_item_path("items", 0, &path("extra.cost_center"), Value::from("CC-7"))
            .unwrap();

        assert_eq!(invoice.items[0].tax_rate, Some(Decimal::new(6, 2)));
        assert_eq!(
            invoice.get_item_path("items", 0, &path("extra.cost_center")),
            Some(Value::from("CC-7"))
        );
        assert!(
            invoice
                .set_item_path("items", 5, &path("tax_rate"), Value::from(1))
                .is_err()
        );
    }

    #[test]
    fn test_has_path_treats_null_as_absent() {
        let invoice = sample_invoice();
        assert!(invoice.has_path(&path("total_amount")));
        assert!(!invoice.has_path(&path("tax_amount")));
        assert!(!invoice.has_path(&path("supplier.address.city")));
    }

    #[test]
    fn test_to_value_exposes_all_fields() {
        let invoice = sample_invoice();
        let value = invoice.to_value();
        let map = value.as_map().unwrap();
        assert!(map.contains_key("extensions"));
        assert_eq!(map.get("tax_amount"), Some(&Value::Null));
        assert_eq!(
            value.get_path(&path("items.0.description")),
            Some(&Value::from("Hotel stay"))
        );
    }

    #[test]
    fn test_invoice_deserializes_numeric_strings() {
        let invoice: Invoice = serde_json::from_str(
            r#"{"invoice_number": "INV-9", "total_amount": "100.50", "items": [{"amount": 12}]}"#,
        )
        .unwrap();
        assert_eq!(invoice.total_amount, Some(Decimal::new(10050, 2)));
        assert_eq!(invoice.items[0].amount, Some(Decimal::from(12)));
    }
}
