// src/billing/signature.rs

//! Assinaturas HMAC-SHA256 (hex) usadas pelo gateway.
//!
//! - Pagamento único:      HMAC(key_secret, "order_id|payment_id")
//! - Pagamento recorrente: HMAC(key_secret, "payment_id|subscription_id")
//! - Webhook:              HMAC(webhook_secret, corpo bruto)

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], message: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(message);
    Some(mac)
}

/// Assinatura em hex (minúsculo), como o gateway envia.
pub fn sign(secret: &str, message: &[u8]) -> String {
    mac_for(secret.as_bytes(), message)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Comparação em tempo constante; hex inválido nunca confere.
pub fn verify(secret: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    if secret.is_empty() {
        return false;
    }
    mac_for(secret.as_bytes(), message)
        .map(|mac| mac.verify_slice(&signature).is_ok())
        .unwrap_or(false)
}

pub fn verify_order_payment(key_secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let message = format!("{}|{}", order_id, payment_id);
    verify(key_secret, message.as_bytes(), signature)
}

pub fn verify_subscription_payment(
    key_secret: &str,
    payment_id: &str,
    subscription_id: &str,
    signature: &str,
) -> bool {
    let message = format!("{}|{}", payment_id, subscription_id);
    verify(key_secret, message.as_bytes(), signature)
}

pub fn verify_webhook(webhook_secret: &str, raw_body: &[u8], signature: &str) -> bool {
    verify(webhook_secret, raw_body, signature)
}
