// src/billing/webhook.rs

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::tenancy::{Plan, Subscription};

/// Eventos de assinatura que sabemos tratar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Cobrança recorrente aprovada: estende o acesso.
    Charged { subscription_id: String },
    Cancelled { subscription_id: String },
    /// Falhas repetidas de cobrança: volta ao plano de entrada.
    Halted { subscription_id: String },
    /// Qualquer outro evento é apenas confirmado.
    Ignored { event: String },
}

// Envelope: { "event": "...", "payload": { "subscription": { "entity": { "id": "sub_..." } } } }
#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    subscription: Option<Wrapped>,
}

#[derive(Debug, Deserialize)]
struct Wrapped {
    entity: Entity,
}

#[derive(Debug, Deserialize)]
struct Entity {
    id: String,
}

impl WebhookEvent {
    /// Interpreta o corpo (já autenticado). Erro = corpo malformado.
    pub fn parse(raw_body: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_slice(raw_body)?;

        let subscription_id = envelope
            .payload
            .and_then(|p| p.subscription)
            .map(|s| s.entity.id);

        let event = match (envelope.event.as_str(), subscription_id) {
            ("subscription.charged", Some(subscription_id)) => WebhookEvent::Charged { subscription_id },
            ("subscription.cancelled", Some(subscription_id)) => WebhookEvent::Cancelled { subscription_id },
            ("subscription.halted", Some(subscription_id)) => WebhookEvent::Halted { subscription_id },
            _ => WebhookEvent::Ignored { event: envelope.event },
        };
        Ok(event)
    }

    pub fn subscription_id(&self) -> Option<&str> {
        match self {
            WebhookEvent::Charged { subscription_id }
            | WebhookEvent::Cancelled { subscription_id }
            | WebhookEvent::Halted { subscription_id } => Some(subscription_id),
            WebhookEvent::Ignored { .. } => None,
        }
    }

    /// Aplica o evento na assinatura vinculada. `fallback_plan` é o plano de
    /// entrada usado quando a cobrança é suspensa.
    pub fn apply_to(&self, subscription: &mut Subscription, fallback_plan: Option<&Plan>, now: DateTime<Utc>) {
        match self {
            WebhookEvent::Charged { .. } => subscription.renew(now),
            WebhookEvent::Cancelled { .. } => subscription.cancel(now),
            WebhookEvent::Halted { .. } => subscription.halt(fallback_plan, now),
            WebhookEvent::Ignored { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(event: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "entity": "event",
            "event": event,
            "payload": { "subscription": { "entity": { "id": "sub_ABC", "status": "active" } } }
        }))
        .unwrap()
    }

    #[test]
    fn recognises_subscription_events() {
        assert_eq!(
            WebhookEvent::parse(&body("subscription.charged")).unwrap(),
            WebhookEvent::Charged { subscription_id: "sub_ABC".into() }
        );
        assert_eq!(
            WebhookEvent::parse(&body("subscription.halted")).unwrap().subscription_id(),
            Some("sub_ABC")
        );
    }

    #[test]
    fn unknown_events_are_ignored_not_rejected() {
        let event = WebhookEvent::parse(&body("payment.captured")).unwrap();
        assert_eq!(event, WebhookEvent::Ignored { event: "payment.captured".into() });

        let no_payload = WebhookEvent::parse(br#"{"event":"subscription.charged"}"#).unwrap();
        assert!(matches!(no_payload, WebhookEvent::Ignored { .. }));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(WebhookEvent::parse(b"not json").is_err());
    }
}
