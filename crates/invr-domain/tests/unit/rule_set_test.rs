//! Tests for rule invariants and rule set ordering

#[cfg(test)]
mod rule_set_tests {
    use invr_domain::entities::{Rule, RuleKind, RuleSet};

    fn completion(id: &str, priority: i32) -> Rule {
        Rule::completion(id, id, "country", "'CN'").with_priority(priority)
    }

    #[test]
    fn test_sorted_by_priority_descending() {
        let set = RuleSet::new(vec![
            completion("low", 10),
            completion("high", 90),
            completion("mid", 50),
        ])
        .unwrap();
        let ids: Vec<&str> = set.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_equal_priorities_keep_declaration_order() {
        let set = RuleSet::new(vec![
            completion("a", 50),
            completion("b", 50),
            completion("c", 80),
            completion("d", 50),
        ])
        .unwrap();
        let ids: Vec<&str> = set.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let set = RuleSet::new(vec![
            completion("a", 1),
            completion("b", 3),
            completion("c", 3),
            completion("d", 2),
        ])
        .unwrap();
        let resorted = RuleSet::new(set.rules().to_vec()).unwrap();
        assert_eq!(set, resorted);
    }

    #[test]
    fn test_inactive_rules_are_dropped() {
        let set = RuleSet::new(vec![completion("on", 1), completion("off", 2).inactive()])
            .unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get("off").is_none());
    }

    #[test]
    fn test_completion_rule_requires_target() {
        let mut rule = completion("r1", 1);
        rule.target_field = None;
        assert!(rule.validate().is_err());
        assert!(RuleSet::new(vec![rule]).is_err());
    }

    #[test]
    fn test_validation_rule_requires_path_and_message() {
        let rule = Rule::validation("v1", "total", "total_amount", "total_amount > 0", "");
        assert!(rule.validate().is_err());

        let mut rule = Rule::validation("v2", "total", "total_amount", "total_amount > 0", "bad");
        rule.field_path = Some("  ".to_string());
        assert!(rule.validate().is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        assert!(RuleSet::new(vec![completion("dup", 1), completion("dup", 2)]).is_err());
    }

    #[test]
    fn test_blank_gate_means_always() {
        let rule = completion("g", 1).with_apply_to("   ");
        assert!(rule.apply_to.is_none());
        assert!(rule.gate().is_none());
    }

    #[test]
    fn test_kind_partitions() {
        let set = RuleSet::new(vec![
            completion("c1", 1),
            Rule::validation("v1", "v", "items[].amount", "item.amount > 0", "bad")
                .with_kind(RuleKind::ValidationAny),
        ])
        .unwrap();
        assert_eq!(set.completion_rules().count(), 1);
        assert_eq!(set.validation_rules().count(), 1);
    }

    #[test]
    fn test_tenant_scoping() {
        let rule = completion("t", 1).with_tenant("acme");
        assert!(rule.applies_to_tenant(Some("acme")));
        assert!(!rule.applies_to_tenant(Some("other")));
        assert!(!rule.applies_to_tenant(None));
        assert!(completion("all", 1).applies_to_tenant(None));
    }
}
