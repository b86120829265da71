// tests/common/mod.rs

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use safety_suite::models::{
    auth::{Role, RoleSet, User},
    observation::{CreateObservationPayload, Observation},
    permit::{Permit, PermitPayload},
    tenancy::{Plan, PlanTier, Subscription},
};
use serde_json::json;
use uuid::Uuid;

pub fn member(roles: &[Role], organization_id: Uuid) -> User {
    User::new(
        &format!("{}@plant.test", Uuid::new_v4().simple()),
        "Plant Member",
        String::new(),
        Some(organization_id),
        RoleSet::of(roles),
        Utc::now(),
    )
}

pub fn plan(tier: PlanTier, max_users: Option<i32>, max_observations: Option<i32>, onetime: i64) -> Plan {
    Plan {
        id: Uuid::new_v4(),
        name: format!("{:?}", tier),
        tier,
        max_users,
        max_observations,
        price_monthly: Decimal::new(onetime / 10, 0),
        price_onetime: Decimal::new(onetime, 0),
        razorpay_plan_id: String::new(),
        active: true,
    }
}

pub fn subscription(organization_id: Uuid, plan: &Plan, now: DateTime<Utc>) -> Subscription {
    Subscription::for_new_organization(organization_id, plan, now)
}

pub fn observation(organization_id: Uuid, observer: &User, severity: &str) -> Observation {
    let payload: CreateObservationPayload = serde_json::from_value(json!({
        "locationId": Uuid::new_v4(),
        "title": "Missing guard rail",
        "description": "Guard rail removed on mezzanine stairs",
        "severity": severity,
    }))
    .unwrap();
    payload.into_observation(organization_id, observer.id, Utc::now())
}

pub fn permit_payload(start: DateTime<Utc>, hours: i64) -> PermitPayload {
    serde_json::from_value(json!({
        "workType": "hot_work",
        "title": "Weld pipe support",
        "description": "Weld new support on line 4",
        "locationId": Uuid::new_v4(),
        "plannedStart": start,
        "plannedEnd": start + Duration::hours(hours),
        "hazardsIdentified": "Sparks, fire",
        "riskControls": "Fire watch, extinguisher",
    }))
    .unwrap()
}

pub fn draft(organization_id: Uuid, requestor: &User, number: &str) -> Permit {
    let now = Utc::now();
    permit_payload(now + Duration::hours(1), 6).into_draft(organization_id, requestor.id, number.to_string(), now)
}
