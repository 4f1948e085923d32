//! Error context tests

use invr_domain::error::Error;
use invr_infrastructure::error_ext::ErrorContext;
use std::error::Error as _;

fn failing_io() -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))
}

#[test]
fn test_io_context_keeps_source() {
    let err = failing_io().io_context("Failed to read rules").unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(err.to_string().contains("Failed to read rules: gone"));
    assert!(err.source().is_some());
}

#[test]
fn test_config_and_rule_context_variants() {
    let err = failing_io().config_context("bad config").unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));

    let err = failing_io().rule_context("bad rules").unwrap_err();
    assert!(matches!(err, Error::RuleLoad { .. }));
}

#[test]
fn test_with_context_is_lazy() {
    let ok: std::io::Result<u8> = Ok(1);
    let value = ok
        .with_context(|| -> String { panic!("context built for a success") })
        .unwrap();
    assert_eq!(value, 1);

    let err = failing_io()
        .with_context(|| format!("step {}", 3))
        .unwrap_err();
    assert!(matches!(err, Error::Infrastructure { .. }));
    assert!(err.to_string().contains("step 3"));
}
