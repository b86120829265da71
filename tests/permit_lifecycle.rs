// tests/permit_lifecycle.rs

mod common;

use std::{collections::HashSet, sync::Arc};

use chrono::{Duration, NaiveDate, Utc};
use common::{draft, member, permit_payload};
use safety_suite::{
    common::error::AppError,
    db::{MemoryPermitSequence, PermitSequence},
    models::{
        auth::Role,
        permit::{
            ActivatePermitPayload, ClosePermitPayload, PermitStatus, ReviewDecision, ReviewPermitPayload,
        },
    },
    services::permit_service::next_permit_number,
    workflow::permit as workflow,
};
use uuid::Uuid;
use validator::Validate;

fn approve() -> ReviewPermitPayload {
    ReviewPermitPayload {
        decision: ReviewDecision::Approve,
        approval_comment: "Fire watch confirmed".into(),
        rejection_reason: String::new(),
    }
}

#[test]
fn permit_runs_from_draft_to_closed() {
    let org = Uuid::new_v4();
    let contractor = member(&[Role::Contractor], org);
    let safety = member(&[Role::SafetyManager], org);
    let mut permit = draft(org, &contractor, "PTW-20260514-0001");
    assert_eq!(permit.status, PermitStatus::Draft);

    workflow::submit(&mut permit, &contractor, Utc::now()).unwrap();
    workflow::review(&mut permit, &safety, approve(), Utc::now()).unwrap();
    assert_eq!(permit.status, PermitStatus::Approved);
    assert_eq!(permit.approved_by_id, Some(safety.id));
    assert!(permit.approved_at.is_some());

    workflow::activate(&mut permit, &contractor, ActivatePermitPayload::default(), Utc::now()).unwrap();
    assert_eq!(permit.status, PermitStatus::Active);
    assert!(permit.actual_start.is_some());

    let close = ClosePermitPayload {
        actual_end: None,
        closure_comment: "Area swept".into(),
        site_restored: true,
    };
    workflow::close(&mut permit, &contractor, close, Utc::now()).unwrap();
    assert_eq!(permit.status, PermitStatus::Closed);
    assert_eq!(permit.closed_by_id, Some(contractor.id));
    assert!(permit.closed_at.is_some());
}

#[test]
fn closing_without_site_restored_is_refused() {
    let org = Uuid::new_v4();
    let manager = member(&[Role::Manager], org);
    let mut permit = draft(org, &manager, "PTW-20260514-0002");
    permit.status = PermitStatus::Active;

    let close = ClosePermitPayload { actual_end: None, closure_comment: String::new(), site_restored: false };
    let err = workflow::close(&mut permit, &manager, close, Utc::now()).unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(permit.status, PermitStatus::Active);
}

#[test]
fn contractor_cannot_approve_even_own_permit() {
    let org = Uuid::new_v4();
    let contractor = member(&[Role::Contractor, Role::Manager], org);
    let mut permit = draft(org, &contractor, "PTW-20260514-0003");
    workflow::submit(&mut permit, &contractor, Utc::now()).unwrap();

    let err = workflow::review(&mut permit, &contractor, approve(), Utc::now()).unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
}

#[test]
fn rejected_permit_is_terminal() {
    let org = Uuid::new_v4();
    let requestor = member(&[Role::Observer], org);
    let manager = member(&[Role::Manager], org);
    let mut permit = draft(org, &requestor, "PTW-20260514-0004");
    workflow::submit(&mut permit, &requestor, Utc::now()).unwrap();

    let reject = ReviewPermitPayload {
        decision: ReviewDecision::Reject,
        approval_comment: String::new(),
        rejection_reason: "No gas test".into(),
    };
    workflow::review(&mut permit, &manager, reject, Utc::now()).unwrap();
    assert_eq!(permit.status, PermitStatus::Rejected);

    assert!(workflow::submit(&mut permit, &requestor, Utc::now()).is_err());
    assert!(workflow::cancel(&mut permit, &manager, Utc::now()).is_err());
    assert!(workflow::edit(&mut permit, &manager, permit_payload(Utc::now(), 2), Utc::now()).is_err());
}

#[test]
fn contractors_only_see_their_own_permits() {
    let org = Uuid::new_v4();
    let contractor = member(&[Role::Contractor], org);
    let other = member(&[Role::Contractor], org);
    let safety = member(&[Role::SafetyManager], org);
    let permit = draft(org, &contractor, "PTW-20260514-0005");

    assert!(workflow::can_view(&permit, &contractor));
    assert!(!workflow::can_view(&permit, &other));
    assert!(workflow::can_view(&permit, &safety));
}

#[test]
fn schedule_must_end_after_it_starts() {
    let start = Utc::now();
    assert!(permit_payload(start, 4).validate().is_ok());
    assert!(permit_payload(start, 0).validate().is_err());
    assert!(permit_payload(start, -2).validate().is_err());
}

#[test]
fn derived_fields_follow_the_schedule() {
    let org = Uuid::new_v4();
    let requestor = member(&[Role::Manager], org);
    let now = Utc::now();
    let mut permit = permit_payload(now - Duration::hours(8), 6).into_draft(org, requestor.id, "PTW-X".into(), now);

    assert_eq!(permit.duration_hours(), 6.0);
    assert!(!permit.is_overdue(now));
    permit.status = PermitStatus::Active;
    assert!(permit.is_overdue(now));
}

#[tokio::test]
async fn concurrent_requests_never_share_a_permit_number() {
    let sequence = Arc::new(MemoryPermitSequence::default());
    let day = NaiveDate::from_ymd_opt(2026, 5, 14).unwrap();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let sequence = sequence.clone();
            tokio::spawn(async move { next_permit_number(sequence.as_ref(), day).await.unwrap() })
        })
        .collect();

    let mut numbers = HashSet::new();
    for handle in handles {
        numbers.insert(handle.await.unwrap());
    }
    assert_eq!(numbers.len(), 20);
    assert!(numbers.contains("PTW-20260514-0001"));
    assert!(numbers.contains("PTW-20260514-0020"));
    assert_eq!(sequence.next_value("PTW-20260514").await.unwrap(), 21);
}
