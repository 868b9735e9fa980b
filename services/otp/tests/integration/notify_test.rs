use std::sync::Arc;

use otpgate::domain::types::OtpKind;
use otpgate::manager::OtpManager;
use otpgate::notify::{DispatchStats, NotificationDispatcher};

use crate::helpers::{
    FailingNotifier, GatedNotifier, RecordingNotifier, manager_with_recorder, test_validity,
};

#[tokio::test]
async fn should_publish_one_event_per_issue() {
    let (manager, notifier) = manager_with_recorder();

    let record = manager.generate("a@x.com", OtpKind::Numeric, 6).unwrap();
    manager.close().await;

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.identifier, "a@x.com");
    assert_eq!(event.token, record.token);
    assert_eq!(event.kind, OtpKind::Numeric);
    assert_eq!(event.expires_at, record.expires_at);

    let payload = serde_json::to_value(event).unwrap();
    assert_eq!(payload["identifier"], "a@x.com");
    assert_eq!(payload["token"], record.token.as_str());
    assert_eq!(payload["kind"], "numeric");
    assert_eq!(
        payload["expires_at"],
        otpgate_core::serde::format_rfc3339(&record.expires_at).as_str()
    );
}

#[tokio::test]
async fn should_queue_reissued_events_in_store_order() {
    let (manager, notifier) = manager_with_recorder();

    let first = manager.generate("a@x.com", OtpKind::Numeric, 6).unwrap();
    let second = manager.generate("a@x.com", OtpKind::Alphanumeric, 16).unwrap();
    manager.close().await;

    let tokens: Vec<_> = notifier.events().into_iter().map(|e| e.token).collect();
    assert_eq!(tokens, vec![first.token, second.token.clone()]);
    assert!(manager.validate("a@x.com", &second.token).is_valid());
}

#[tokio::test]
async fn should_not_publish_for_failed_issue() {
    let (manager, notifier) = manager_with_recorder();

    assert!(manager.generate("a@x.com", OtpKind::Numeric, 0).is_err());
    manager.close().await;

    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn should_close_transport_after_draining_queue() {
    let (manager, notifier) = manager_with_recorder();
    for i in 0..10 {
        manager
            .generate(&format!("user{i}@x.com"), OtpKind::Numeric, 6)
            .unwrap();
    }

    manager.close().await;

    assert!(notifier.is_closed());
    assert_eq!(notifier.events().len(), 10);
    assert_eq!(
        manager.dispatch_stats(),
        DispatchStats {
            queued: 10,
            published: 10,
            failed: 0,
            dropped: 0,
        }
    );
}

#[tokio::test]
async fn should_keep_issuing_when_transport_fails() {
    let manager = OtpManager::new(
        test_validity(),
        NotificationDispatcher::spawn(FailingNotifier, 8),
    );

    let record = manager.generate("a@x.com", OtpKind::Numeric, 6);
    assert!(record.is_ok(), "notification failure must not fail issuance");
    manager.close().await;

    let stats = manager.dispatch_stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.published, 0);
}

#[tokio::test]
async fn should_drop_events_when_queue_is_full() {
    let notifier = GatedNotifier::new();
    let manager = OtpManager::new(
        test_validity(),
        NotificationDispatcher::spawn(notifier.clone(), 1),
    );

    for i in 0..10 {
        manager
            .generate(&format!("user{i}@x.com"), OtpKind::Numeric, 6)
            .unwrap();
    }
    let stats = manager.dispatch_stats();
    assert_eq!(stats.queued + stats.dropped, 10);
    assert!(
        (1..=2).contains(&stats.queued),
        "worker holds at most one event beyond the queue: {stats:?}"
    );

    notifier.release(10);
    manager.close().await;

    assert_eq!(manager.dispatch_stats().published, stats.queued);
    assert_eq!(notifier.inner.events().len() as u64, stats.queued);
}

#[tokio::test]
async fn should_return_before_notification_is_delivered() {
    let notifier = GatedNotifier::new();
    let manager = Arc::new(OtpManager::new(
        test_validity(),
        NotificationDispatcher::spawn(notifier.clone(), 8),
    ));

    let record = manager.generate("a@x.com", OtpKind::Numeric, 6).unwrap();
    tokio::task::yield_now().await;

    assert!(notifier.inner.events().is_empty(), "publish is still gated");
    assert_eq!(
        manager.validate("a@x.com", &record.token),
        otpgate::domain::types::Validation::Valid
    );

    notifier.release(1);
    manager.close().await;
    assert_eq!(notifier.inner.events().len(), 1);
}

#[tokio::test]
async fn should_stop_publishing_after_close() {
    let (manager, notifier) = manager_with_recorder();

    manager.close().await;
    assert!(manager.is_closed());
    let record = manager.generate("late@x.com", OtpKind::Numeric, 6);

    assert!(record.is_ok(), "issuance keeps working after close");
    assert!(notifier.events().is_empty());
    assert_eq!(manager.dispatch_stats().dropped, 1);
}

#[tokio::test]
async fn should_tolerate_repeated_close() {
    let (manager, notifier) = manager_with_recorder();

    manager.close().await;
    manager.close().await;

    assert!(notifier.is_closed());
}

#[test]
fn should_count_drops_when_disabled() {
    let manager = OtpManager::new(test_validity(), NotificationDispatcher::disabled());

    manager.generate("a@x.com", OtpKind::Numeric, 6).unwrap();
    manager.generate("b@x.com", OtpKind::Numeric, 6).unwrap();

    assert_eq!(
        manager.dispatch_stats(),
        DispatchStats {
            dropped: 2,
            ..DispatchStats::default()
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_publish_every_event_under_concurrent_issue() {
    let notifier = RecordingNotifier::new();
    let manager = Arc::new(OtpManager::new(
        test_validity(),
        NotificationDispatcher::spawn(notifier.clone(), 256),
    ));

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager.generate(&format!("user{i}@example.com"), OtpKind::Numeric, 6)
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    manager.close().await;

    assert_eq!(manager.len(), 100);
    let mut identifiers: Vec<_> = notifier
        .events()
        .into_iter()
        .map(|e| e.identifier)
        .collect();
    identifiers.sort();
    identifiers.dedup();
    assert_eq!(identifiers.len(), 100);
}
