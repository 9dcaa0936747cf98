//! Integration tests for idempotent notification dispatch.
//!
//! At most one notification exists per (incident, rule, administrator), no
//! matter how often or how concurrently an incident is evaluated.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use northstar_escalation::{EscalationError, RecipientOutcome};

use common::fixtures::{new_incident, same_category_rule};
use common::{FlakyNotificationStore, TestContext};

#[tokio::test]
async fn test_second_pass_creates_nothing() {
    let ctx = TestContext::new().await;
    let tenant = ctx.tenant_a();
    let student = ctx.add_student(ctx.school_a1, "Eli", "Grant").await;
    ctx.add_admin(Some(ctx.school_a1), "Principal Diaz").await;
    ctx.add_admin(Some(ctx.school_a1), "Counselor Webb").await;

    ctx.engine
        .upsert_rule(Some(&tenant), Some(ctx.school_a1), same_category_rule(14, 1))
        .await
        .unwrap();
    let recorded = ctx
        .engine
        .record_incident(Some(&tenant), new_incident(student.id, "Tardy"))
        .await
        .unwrap();
    assert_eq!(recorded.escalation.unwrap().report().unwrap().created(), 2);

    let again = ctx
        .engine
        .on_incident_created(Some(&tenant), &recorded.incident)
        .await
        .unwrap();
    let report = again.report().unwrap();
    assert_eq!(report.created(), 0);
    assert_eq!(report.skipped(), 2);
    assert_eq!(ctx.stores.notifications.count().await, 2);
}

/// Given eight concurrent passes over the same incident
/// Then exactly one notification exists per recipient
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_passes_create_one_notification_per_recipient() {
    let ctx = TestContext::new().await;
    let tenant = ctx.tenant_a();
    let student = ctx.add_student(ctx.school_a1, "Eli", "Grant").await;
    let admins = [
        ctx.add_admin(Some(ctx.school_a1), "Principal Diaz").await,
        ctx.add_admin(Some(ctx.school_a1), "Counselor Webb").await,
        ctx.add_admin(Some(ctx.school_a1), "Dean Morales").await,
    ];

    ctx.engine
        .upsert_rule(Some(&tenant), Some(ctx.school_a1), same_category_rule(14, 1))
        .await
        .unwrap();
    let incident = ctx.seed_incident(&student, "Tardy", chrono::Utc::now()).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&ctx.engine);
        let incident = incident.clone();
        handles.push(tokio::spawn(async move {
            engine.on_incident_created(Some(&tenant), &incident).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        let outcome = handle.await.expect("task panicked").expect("pass failed");
        created += outcome.report().unwrap().created();
    }
    assert_eq!(created, admins.len());

    let stored = ctx.stores.notifications.list_for_incident(incident.id).await;
    assert_eq!(stored.len(), admins.len());

    let keys: HashSet<_> = stored.iter().map(|n| n.key()).collect();
    assert_eq!(keys.len(), stored.len());

    let recipients: HashSet<_> = stored.iter().map(|n| n.admin_id).collect();
    let expected: HashSet<_> = admins.iter().map(|a| a.id).collect();
    assert_eq!(recipients, expected);
}

#[tokio::test]
async fn test_rule_update_keeps_notification_key() {
    let ctx = TestContext::new().await;
    let tenant = ctx.tenant_a();
    let student = ctx.add_student(ctx.school_a1, "Eli", "Grant").await;
    ctx.add_admin(None, "Superintendent Hale").await;

    ctx.engine
        .upsert_rule(Some(&tenant), None, same_category_rule(14, 1))
        .await
        .unwrap();
    let recorded = ctx
        .engine
        .record_incident(Some(&tenant), new_incident(student.id, "Tardy"))
        .await
        .unwrap();

    // Updating in place keeps the rule id, so the triple is unchanged.
    ctx.engine
        .upsert_rule(Some(&tenant), None, same_category_rule(30, 1))
        .await
        .unwrap();
    let again = ctx
        .engine
        .on_incident_created(Some(&tenant), &recorded.incident)
        .await
        .unwrap();

    assert_eq!(again.report().unwrap().created(), 0);
    assert_eq!(ctx.stores.notifications.count().await, 1);
}

// ============================================================================
// Partial failure
// ============================================================================

/// Given one of three recipients cannot be written
/// Then the other two are notified and the failure is reported, not raised
#[tokio::test]
async fn test_one_failing_recipient_does_not_stop_others() {
    let flaky = Arc::new(FlakyNotificationStore::new());
    let ctx = TestContext::with_notification_store(flaky.clone()).await;
    let tenant = ctx.tenant_a();
    let student = ctx.add_student(ctx.school_a1, "Eli", "Grant").await;
    let first = ctx.add_admin(Some(ctx.school_a1), "Principal Diaz").await;
    let broken = ctx.add_admin(Some(ctx.school_a1), "Counselor Webb").await;
    let third = ctx.add_admin(Some(ctx.school_a1), "Dean Morales").await;
    flaky.fail_for(broken.id).await;

    ctx.engine
        .upsert_rule(Some(&tenant), Some(ctx.school_a1), same_category_rule(14, 1))
        .await
        .unwrap();
    let recorded = ctx
        .engine
        .record_incident(Some(&tenant), new_incident(student.id, "Tardy"))
        .await
        .expect("dispatch failures must not fail the recording");

    let outcome = recorded.escalation.expect("pass completes despite failures");
    let report = outcome.report().unwrap();
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.created(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.failure(),
        Some(EscalationError::PartialDispatchFailure {
            attempted: 3,
            failed: 1,
        })
    );

    let failed: Vec<_> = report
        .outcomes
        .iter()
        .filter(|(_, o)| matches!(o, RecipientOutcome::Failed { .. }))
        .map(|(admin_id, _)| *admin_id)
        .collect();
    assert_eq!(failed, vec![broken.id]);

    for admin in [&first, &third] {
        let unread = ctx
            .engine
            .get_unread_notifications(Some(&tenant), admin.id)
            .await
            .unwrap();
        assert_eq!(unread.len(), 1, "{} should be notified", admin.name);
    }
    assert_eq!(flaky.inner.count().await, 2);
}

/// A retry after the store recovers fills in only the missing recipient.
#[tokio::test]
async fn test_retry_after_failure_fills_gap() {
    let flaky = Arc::new(FlakyNotificationStore::new());
    let ctx = TestContext::with_notification_store(flaky.clone()).await;
    let tenant = ctx.tenant_a();
    let student = ctx.add_student(ctx.school_a1, "Eli", "Grant").await;
    ctx.add_admin(Some(ctx.school_a1), "Principal Diaz").await;
    let broken = ctx.add_admin(Some(ctx.school_a1), "Counselor Webb").await;
    flaky.fail_for(broken.id).await;

    ctx.engine
        .upsert_rule(Some(&tenant), Some(ctx.school_a1), same_category_rule(14, 1))
        .await
        .unwrap();
    let recorded = ctx
        .engine
        .record_incident(Some(&tenant), new_incident(student.id, "Tardy"))
        .await
        .unwrap();
    assert_eq!(flaky.inner.count().await, 1);

    flaky.recover(broken.id).await;
    let retry = ctx
        .engine
        .on_incident_created(Some(&tenant), &recorded.incident)
        .await
        .unwrap();

    let report = retry.report().unwrap();
    assert_eq!(report.created(), 1);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failure(), None);
    assert_eq!(flaky.inner.count().await, 2);
}
