// tests/billing_reconciliation.rs

mod common;

use chrono::{Duration, Utc};
use common::{plan, subscription};
use safety_suite::{
    billing::{signature, webhook::WebhookEvent},
    common::error::AppError,
    models::billing::{checkout_amount, PaymentType},
    models::tenancy::{PlanTier, SubscriptionStatus, ONETIME_ACCESS_DAYS, RENEWAL_PERIOD_DAYS},
};
use serde_json::json;
use uuid::Uuid;

const KEY_SECRET: &str = "rzp_test_secret";
const WEBHOOK_SECRET: &str = "whsec_test";

fn event(name: &str, subscription_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "entity": "event",
        "event": name,
        "payload": { "subscription": { "entity": { "id": subscription_id } } }
    }))
    .unwrap()
}

#[test]
fn checkout_signatures_bind_order_and_payment() {
    let sig = signature::sign(KEY_SECRET, b"order_9A33XWu170gUtm|pay_29QQoUBi66xm2f");

    assert!(signature::verify_order_payment(KEY_SECRET, "order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f", &sig));
    assert!(!signature::verify_order_payment(KEY_SECRET, "order_other", "pay_29QQoUBi66xm2f", &sig));
    assert!(!signature::verify_order_payment("wrong", "order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f", &sig));

    // Recorrente: ordem invertida (payment|subscription)
    let sub_sig = signature::sign(KEY_SECRET, b"pay_1|sub_1");
    assert!(signature::verify_subscription_payment(KEY_SECRET, "pay_1", "sub_1", &sub_sig));
    assert!(!signature::verify_subscription_payment(KEY_SECRET, "sub_1", "pay_1", &sub_sig));
}

#[test]
fn tampered_webhook_body_is_rejected() {
    let body = event("subscription.charged", "sub_1");
    let sig = signature::sign(WEBHOOK_SECRET, &body);
    assert!(signature::verify_webhook(WEBHOOK_SECRET, &body, &sig));

    let tampered = event("subscription.charged", "sub_2");
    assert!(!signature::verify_webhook(WEBHOOK_SECRET, &tampered, &sig));
    assert!(!signature::verify_webhook(WEBHOOK_SECRET, &body, "not-hex"));
}

#[test]
fn onetime_payment_grants_a_year_and_expiry_downgrades() {
    let org = Uuid::new_v4();
    let free = plan(PlanTier::Trial, Some(3), Some(10), 0);
    let pro = plan(PlanTier::Pro, Some(25), None, 14_990);
    let now = Utc::now();

    let mut sub = subscription(org, &free, now);
    sub.activate_onetime(&pro, now);
    assert_eq!(sub.plan_id, pro.id);
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(sub.expires_at, Some(now + Duration::days(ONETIME_ACCESS_DAYS)));

    let later = now + Duration::days(ONETIME_ACCESS_DAYS + 1);
    assert!(sub.downgrade_if_expired(&free, later));
    assert_eq!(sub.plan_id, free.id);
    assert_eq!(sub.status, SubscriptionStatus::Expired);
    assert!(!sub.is_active);

    // Segunda passada não muda nada
    assert!(!sub.downgrade_if_expired(&free, later));
}

#[test]
fn webhook_events_drive_the_recurring_subscription() {
    let org = Uuid::new_v4();
    let free = plan(PlanTier::Trial, Some(3), Some(10), 0);
    let pro = plan(PlanTier::Pro, Some(25), None, 14_990);
    let now = Utc::now();

    let mut sub = subscription(org, &free, now);
    sub.activate_recurring(&pro, "sub_1", now);
    assert_eq!(sub.expires_at, None);

    let charged = WebhookEvent::parse(&event("subscription.charged", "sub_1")).unwrap();
    charged.apply_to(&mut sub, None, now);
    assert_eq!(sub.expires_at, Some(now + Duration::days(RENEWAL_PERIOD_DAYS)));
    assert!(sub.is_active);

    let halted = WebhookEvent::parse(&event("subscription.halted", "sub_1")).unwrap();
    halted.apply_to(&mut sub, Some(&free), now);
    assert_eq!(sub.plan_id, free.id);
    assert_eq!(sub.status, SubscriptionStatus::Expired);
    assert!(!sub.is_active);

    let cancelled = WebhookEvent::parse(&event("subscription.cancelled", "sub_1")).unwrap();
    cancelled.apply_to(&mut sub, None, now);
    assert_eq!(sub.status, SubscriptionStatus::Cancelled);
}

#[test]
fn plan_prices_convert_to_paise() {
    let pro = plan(PlanTier::Pro, None, None, 14_990);
    assert_eq!(pro.onetime_paise(), 1_499_000);
    assert!(!pro.supports_recurring());
    assert!(plan(PlanTier::Trial, None, None, 0).is_free());
}

#[test]
fn checkout_needs_a_price_for_the_requested_type() {
    let mut basic = plan(PlanTier::Basic, Some(10), None, 9_990);
    assert_eq!(checkout_amount(&basic, PaymentType::Onetime).unwrap(), 999_000);

    // Sem plano no gateway
    assert!(matches!(
        checkout_amount(&basic, PaymentType::Recurring),
        Err(AppError::InvalidInput(_))
    ));

    basic.razorpay_plan_id = "plan_basic_monthly".into();
    assert_eq!(checkout_amount(&basic, PaymentType::Recurring).unwrap(), 99_900);

    // Plano no gateway, mas sem preço mensal
    basic.price_monthly = rust_decimal::Decimal::ZERO;
    assert!(matches!(
        checkout_amount(&basic, PaymentType::Recurring),
        Err(AppError::InvalidInput(_))
    ));

    let free = plan(PlanTier::Trial, None, None, 0);
    assert!(checkout_amount(&free, PaymentType::Onetime).is_err());
}
