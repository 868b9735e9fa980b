use std::sync::Arc;
use std::thread;

use otpgate::domain::types::{OtpKind, Validation};
use otpgate::error::OtpError;
use otpgate::manager::OtpManager;
use otpgate::notify::NotificationDispatcher;

use crate::helpers::{FailingEntropy, ManualClock, manager_with_clock, start_time, test_validity};

#[test]
fn should_generate_numeric_token_of_requested_length() {
    let (manager, _clock) = manager_with_clock();

    let record = manager
        .generate("a@x.com", OtpKind::Numeric, 6)
        .unwrap();

    assert_eq!(record.identifier, "a@x.com");
    assert_eq!(record.kind, OtpKind::Numeric);
    assert_eq!(record.token.len(), 6);
    assert!(record.token.bytes().all(|b| b.is_ascii_digit()));
    assert_eq!(manager.len(), 1);
}

#[test]
fn should_generate_alphanumeric_token_of_requested_length() {
    let (manager, _clock) = manager_with_clock();

    let record = manager
        .generate("b@x.com", OtpKind::Alphanumeric, 8)
        .unwrap();

    assert_eq!(record.token.len(), 8);
    assert!(
        record
            .token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)),
        "unexpected token {}",
        record.token
    );
}

#[test]
fn should_set_expiry_from_configured_validity() {
    let (manager, _clock) = manager_with_clock();

    let record = manager.generate("a@x.com", OtpKind::Numeric, 6).unwrap();

    assert_eq!(record.expires_at, start_time() + test_validity());
    assert_eq!(manager.validity(), test_validity());
}

#[test]
fn should_issue_and_consume_example_passcode() {
    let (manager, _clock) = manager_with_clock();

    let record = manager.generate("a@x.com", OtpKind::Numeric, 6).unwrap();

    assert_eq!(manager.validate("a@x.com", &record.token), Validation::Valid);
    assert_eq!(
        manager.validate("a@x.com", &record.token),
        Validation::NotFound
    );
}

#[test]
fn should_reject_zero_length_without_storing() {
    let (manager, _clock) = manager_with_clock();

    let result = manager.generate("a@x.com", OtpKind::Numeric, 0);

    assert!(
        matches!(result, Err(OtpError::InvalidLength { length: 0 })),
        "expected InvalidLength, got {result:?}"
    );
    assert!(manager.is_empty());
}

#[test]
fn should_reject_validity_that_overflows_expiry() {
    let clock = ManualClock::new(start_time());
    let manager = OtpManager::builder(
        chrono::Duration::days(365 * 300_000),
        NotificationDispatcher::disabled(),
    )
    .clock(clock)
    .build();

    let result = manager.generate("a@x.com", OtpKind::Numeric, 6);

    assert!(
        matches!(result, Err(OtpError::Internal(_))),
        "expected Internal, got {result:?}"
    );
    assert!(manager.is_empty());
}

#[test]
fn should_reject_non_positive_validity() {
    for validity in [chrono::Duration::zero(), chrono::Duration::minutes(-1)] {
        let manager = OtpManager::builder(validity, NotificationDispatcher::disabled())
            .clock(ManualClock::new(start_time()))
            .build();

        let result = manager.generate("a@x.com", OtpKind::Numeric, 6);

        assert!(
            matches!(result, Err(OtpError::Internal(_))),
            "expected Internal for {validity}, got {result:?}"
        );
        assert!(manager.is_empty());
    }
}

#[test]
fn should_reject_oversized_length_without_storing() {
    let (manager, _clock) = manager_with_clock();

    let result = manager.generate("a@x.com", OtpKind::Alphanumeric, 1000);

    assert!(matches!(result, Err(OtpError::InvalidLength { length: 1000 })));
    assert!(manager.is_empty());
}

#[test]
fn should_reject_unknown_kind_before_reaching_store() {
    let (manager, _clock) = manager_with_clock();

    let result = "invalid_type"
        .parse::<OtpKind>()
        .and_then(|kind| manager.generate("a@x.com", kind, 6));

    assert!(matches!(result, Err(OtpError::UnsupportedKind(_))));
    assert!(manager.is_empty());
}

#[test]
fn should_propagate_entropy_failure_without_storing() {
    let manager = OtpManager::builder(test_validity(), NotificationDispatcher::disabled())
        .entropy(Arc::new(FailingEntropy))
        .build();

    let result = manager.generate("a@x.com", OtpKind::Numeric, 6);

    assert!(
        matches!(result, Err(OtpError::RandomSource(_))),
        "expected RandomSource, got {result:?}"
    );
    assert!(manager.is_empty());
    assert_eq!(manager.dispatch_stats().dropped, 0, "no event for a failed issue");
}

#[test]
fn should_replace_previous_record_for_same_identifier() {
    let (manager, _clock) = manager_with_clock();

    let first = manager
        .generate("a@x.com", OtpKind::Alphanumeric, 32)
        .unwrap();
    let second = manager
        .generate("a@x.com", OtpKind::Alphanumeric, 32)
        .unwrap();

    assert_eq!(manager.len(), 1);
    assert_eq!(
        manager.validate("a@x.com", &first.token),
        Validation::Mismatch
    );
    assert_eq!(manager.validate("a@x.com", &second.token), Validation::Valid);
}

#[test]
fn should_keep_every_record_under_concurrent_generation() {
    let (manager, _clock) = manager_with_clock();
    let manager = Arc::new(manager);

    let records: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..100)
            .map(|i| {
                let manager = Arc::clone(&manager);
                s.spawn(move || {
                    manager.generate(&format!("user{i}@example.com"), OtpKind::Numeric, 6)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(manager.len(), 100);
    for (i, record) in records.into_iter().enumerate() {
        let record = record.expect("concurrent generate failed");
        assert_eq!(record.identifier, format!("user{i}@example.com"));
        assert_eq!(
            manager.validate(&record.identifier, &record.token),
            Validation::Valid
        );
    }
    assert!(manager.is_empty());
}
