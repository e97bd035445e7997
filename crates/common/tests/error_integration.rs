//! Integration tests for `cachefront_common::error`.
//!
//! Validates classification of the errors the work queue actually returns.

#![cfg(feature = "runtime")]

use std::time::Duration;

use cachefront_common::error::{ErrorClassification, ErrorSeverity};
use cachefront_common::sync::{QueueConfig, QueueError, WorkQueue};

/// Validates the classification matrix for `QueueError`.
///
/// Assertions:
/// - Confirms `err.is_retryable()` equals `retryable`.
/// - Confirms `err.severity()` equals `severity`.
/// - No queue error is critical.
#[test]
fn classification_matrix_matches_expected_contract() {
    let cases = vec![
        (QueueError::CapacityExceeded(8), true, ErrorSeverity::Warning),
        (QueueError::ItemNotFound(3), false, ErrorSeverity::Info),
        (QueueError::ShuttingDown, false, ErrorSeverity::Info),
        (QueueError::InvalidConfig("max_capacity must be positive".into()), false, ErrorSeverity::Error),
    ];

    for (err, retryable, severity) in cases {
        assert_eq!(err.is_retryable(), retryable, "retryable mismatch for {err}");
        assert_eq!(err.severity(), severity, "severity mismatch for {err}");
        assert!(!err.is_critical(), "{err} should not be critical");
    }
}

/// Validates classification of errors raised by a live queue.
///
/// Assertions:
/// - A full queue rejects with a retryable error carrying a retry hint.
/// - A shut-down queue rejects with an info-level, non-retryable error.
/// - A zero capacity config is an error-level configuration failure.
#[test]
fn queue_failures_carry_their_classification() {
    let queue = WorkQueue::<String>::with_config(QueueConfig { max_capacity: 1, max_attempts: None })
        .unwrap();
    queue.push("k1".into()).unwrap();

    let full = queue.push("k2".into()).unwrap_err();
    assert!(full.is_retryable());
    assert_eq!(full.retry_after(), Some(Duration::from_millis(100)));

    queue.shutdown();
    let closed = queue.push("k3".into()).unwrap_err();
    assert!(matches!(closed, QueueError::ShuttingDown));
    assert_eq!(closed.severity(), ErrorSeverity::Info);
    assert_eq!(closed.retry_after(), None);

    let invalid =
        WorkQueue::<String>::with_config(QueueConfig { max_capacity: 0, max_attempts: None }).unwrap_err();
    assert_eq!(invalid.severity(), ErrorSeverity::Error);
    assert!(invalid.to_string().starts_with("Invalid queue configuration"));
}

/// Validates severity ordering and the labels used in log lines.
#[test]
fn severity_orders_and_displays() {
    let mut severities =
        vec![ErrorSeverity::Critical, ErrorSeverity::Info, ErrorSeverity::Error, ErrorSeverity::Warning];
    severities.sort();

    let labels: Vec<String> = severities.iter().map(ToString::to_string).collect();
    assert_eq!(labels, vec!["info", "warn", "error", "critical"]);
}
