// tests/access_rules.rs

mod common;

use axum::http::Method;
use chrono::{Duration, Utc};
use common::{member, plan, subscription};
use safety_suite::{
    common::error::AppError,
    models::{auth::Role, tenancy::PlanTier},
    workflow::access::{evaluate, GateDecision, BILLING_PATH, PERMITS_PATH},
};
use uuid::Uuid;

#[test]
fn expired_subscription_sends_everything_to_billing() {
    let org = Uuid::new_v4();
    let manager = member(&[Role::Manager], org);
    let now = Utc::now();
    let mut sub = subscription(org, &plan(PlanTier::Pro, None, None, 10_000), now);
    sub.expires_at = Some(now - Duration::days(1));

    match evaluate(&manager, Some(&sub), &Method::GET, "/api/observations", now) {
        GateDecision::Redirect { to, warning } => {
            assert_eq!(to, BILLING_PATH);
            assert!(warning.is_some());
        }
        other => panic!("expected redirect, got {:?}", other),
    }

    assert!(matches!(evaluate(&manager, Some(&sub), &Method::POST, "/api/billing/orders", now), GateDecision::Allow));
    assert!(matches!(evaluate(&manager, Some(&sub), &Method::POST, "/api/auth/logout", now), GateDecision::Allow));
}

#[test]
fn subscription_without_expiry_never_redirects() {
    let org = Uuid::new_v4();
    let manager = member(&[Role::Manager], org);
    let sub = subscription(org, &plan(PlanTier::Trial, Some(3), Some(10), 0), Utc::now());

    assert!(matches!(
        evaluate(&manager, Some(&sub), &Method::GET, "/api/observations", Utc::now()),
        GateDecision::Allow
    ));
}

#[test]
fn contractor_is_kept_inside_the_permit_module() {
    let org = Uuid::new_v4();
    let contractor = member(&[Role::Contractor], org);
    let now = Utc::now();

    assert!(matches!(evaluate(&contractor, None, &Method::POST, "/api/permits", now), GateDecision::Allow));
    assert!(matches!(evaluate(&contractor, None, &Method::GET, "/api/permits/abc/pdf", now), GateDecision::Allow));
    assert!(matches!(evaluate(&contractor, None, &Method::GET, "/api/users/me", now), GateDecision::Allow));

    match evaluate(&contractor, None, &Method::GET, "/api/observations", now) {
        GateDecision::Redirect { to, warning } => {
            assert_eq!(to, PERMITS_PATH);
            assert!(warning.unwrap().contains("Safety Observations"));
        }
        other => panic!("expected redirect, got {:?}", other),
    }
    assert!(matches!(
        evaluate(&contractor, None, &Method::GET, "/api/permitsx", now),
        GateDecision::Redirect { .. }
    ));
}

#[test]
fn expired_contractor_is_logged_out() {
    let org = Uuid::new_v4();
    let mut contractor = member(&[Role::Contractor], org);
    let now = Utc::now();
    contractor.contractor_access_expiry = Some((now - Duration::days(1)).date_naive());

    match evaluate(&contractor, None, &Method::GET, "/api/permits", now) {
        GateDecision::ForceLogout(AppError::ContractorAccessExpired(date)) => {
            assert_eq!(Some(date), contractor.contractor_access_expiry);
        }
        other => panic!("expected forced logout, got {:?}", other),
    }

    // O próprio dia da expiração ainda vale
    contractor.contractor_access_expiry = Some(now.date_naive());
    assert!(matches!(evaluate(&contractor, None, &Method::GET, "/api/permits", now), GateDecision::Allow));
}
