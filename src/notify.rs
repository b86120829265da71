// src/notify.rs

//! Notificações transacionais (e-mail). Nunca propagam erro: o envio
//! devolve `true`/`false` e quem chama decide se vira aviso.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use crate::models::observation::{ObservationStatus, Severity};

const BREVO_API: &str = "https://api.brevo.com/v3/smtp/email";
const DEFAULT_SENDER_NAME: &str = "SafetySuite";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    HighRiskAlert,
    OverdueAlert,
    Invite,
    ContractorCredentials,
}

/// O contexto de cada tipo de notificação.
#[derive(Debug, Clone)]
pub enum Notification {
    HighRiskAlert {
        recipient_name: String,
        observation_id: Uuid,
        title: String,
        location: String,
        target_date: Option<NaiveDate>,
        description: String,
        detail_url: String,
    },
    OverdueAlert {
        recipient_name: String,
        observation_id: Uuid,
        title: String,
        location: String,
        severity: Severity,
        status: ObservationStatus,
        target_date: NaiveDate,
        days_overdue: i64,
        detail_url: String,
    },
    Invite {
        organization_name: String,
        role: String,
        accept_url: String,
        expires_at: Option<DateTime<Utc>>,
    },
    ContractorCredentials {
        organization_name: String,
        full_name: String,
        email: String,
        temporary_password: String,
        access_expiry: Option<NaiveDate>,
        login_url: String,
    },
}

fn plural_days(days: i64) -> String {
    format!("{} day{}", days, if days == 1 { "" } else { "s" })
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::HighRiskAlert { .. } => NotificationKind::HighRiskAlert,
            Notification::OverdueAlert { .. } => NotificationKind::OverdueAlert,
            Notification::Invite { .. } => NotificationKind::Invite,
            Notification::ContractorCredentials { .. } => NotificationKind::ContractorCredentials,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::HighRiskAlert { title, .. } => {
                format!("HIGH Risk Observation Assigned - {}", title)
            }
            Notification::OverdueAlert { title, days_overdue, .. } => {
                format!("Overdue Observation ({}) - {}", plural_days(*days_overdue), title)
            }
            Notification::Invite { organization_name, .. } => {
                format!("You've been invited to join {} on SafetySuite", organization_name)
            }
            Notification::ContractorCredentials { organization_name, .. } => {
                format!("Your contractor access to {} on SafetySuite", organization_name)
            }
        }
    }

    pub fn html(&self) -> String {
        match self {
            Notification::HighRiskAlert {
                recipient_name,
                observation_id,
                title,
                location,
                target_date,
                description,
                detail_url,
            } => format!(
                "<p>Hi <strong>{recipient_name}</strong>,</p>\
                 <p>A <strong>HIGH severity</strong> safety observation has been reported and assigned to you. \
                 Immediate action is required.</p>\
                 <ul><li>Observation: {observation_id}</li><li>Title: {title}</li><li>Location: {location}</li>\
                 <li>Target date: {target}</li><li>Description: {description}</li></ul>\
                 <p><a href=\"{detail_url}\">View full details</a></p>",
                target = target_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "Not set".into()),
                description = truncate(description, 300),
            ),
            Notification::OverdueAlert {
                recipient_name,
                observation_id,
                title,
                location,
                severity,
                status,
                target_date,
                days_overdue,
                detail_url,
            } => format!(
                "<p>Hi <strong>{recipient_name}</strong>,</p>\
                 <p>The following safety observation assigned to you is <strong>{overdue} overdue</strong>. \
                 Please submit your rectification as soon as possible.</p>\
                 <ul><li>Observation: {observation_id}</li><li>Title: {title}</li><li>Location: {location}</li>\
                 <li>Severity: {severity:?}</li><li>Target date: {target_date}</li><li>Status: {status:?}</li></ul>\
                 <p><a href=\"{detail_url}\">Open observation</a></p>",
                overdue = plural_days(*days_overdue),
            ),
            Notification::Invite {
                organization_name,
                role,
                accept_url,
                expires_at,
            } => format!(
                "<p>You have been invited to join <strong>{organization_name}</strong> as <strong>{role}</strong>.</p>\
                 <p><a href=\"{accept_url}\">Accept invitation</a></p>{expiry}",
                expiry = expires_at
                    .map(|e| format!("<p>This link expires on {}.</p>", e.format("%d %b %Y")))
                    .unwrap_or_default(),
            ),
            Notification::ContractorCredentials {
                organization_name,
                full_name,
                email,
                temporary_password,
                access_expiry,
                login_url,
            } => format!(
                "<p>Hi <strong>{full_name}</strong>,</p>\
                 <p>You now have contractor access to <strong>{organization_name}</strong> (permits only).</p>\
                 <ul><li>Login: {email}</li><li>Temporary password: {temporary_password}</li></ul>\
                 {expiry}<p><a href=\"{login_url}\">Sign in</a> and change your password.</p>",
                expiry = access_expiry
                    .map(|d| format!("<p>Access expires: {}</p>", d.format("%d %b %Y")))
                    .unwrap_or_default(),
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Envia e devolve `true` em caso de sucesso. Nunca falha.
    async fn send_notification(&self, recipient: &str, notification: &Notification) -> bool;
}

// ---
// Brevo (e-mail transacional via HTTP)
// ---
#[derive(Clone)]
pub struct BrevoNotifier {
    client: Client,
    api_key: String,
    sender_name: String,
    sender_email: String,
}

/// "Nome <email>" ou apenas "email".
pub fn parse_sender(raw: &str) -> (String, String) {
    match raw.split_once('<') {
        Some((name, addr)) => (
            name.trim().to_string(),
            addr.trim_end_matches('>').trim().to_string(),
        ),
        None => (DEFAULT_SENDER_NAME.to_string(), raw.trim().to_string()),
    }
}

impl BrevoNotifier {
    pub fn new(api_key: String, default_from_email: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| anyhow::anyhow!("Falha ao criar o cliente HTTP de e-mail: {}", e))?;
        let (sender_name, sender_email) = parse_sender(default_from_email);

        Ok(Self { client, api_key, sender_name, sender_email })
    }
}

#[async_trait]
impl Notifier for BrevoNotifier {
    async fn send_notification(&self, recipient: &str, notification: &Notification) -> bool {
        let subject = notification.subject();
        let body = json!({
            "sender": { "name": self.sender_name, "email": self.sender_email },
            "to": [{ "email": recipient }],
            "subject": subject,
            "htmlContent": notification.html(),
        });

        let result = self
            .client
            .post(BREVO_API)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(kind = ?notification.kind(), "E-mail enviado para {} - {}", recipient, subject);
                true
            }
            Ok(response) => {
                tracing::error!(kind = ?notification.kind(), status = %response.status(), "Brevo recusou o e-mail para {}", recipient);
                false
            }
            Err(e) => {
                tracing::error!(kind = ?notification.kind(), "Falha no envio de e-mail para {}: {}", recipient, e);
                false
            }
        }
    }
}

// ---
// Sem chave configurada: só registra no log
// ---
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_notification(&self, recipient: &str, notification: &Notification) -> bool {
        tracing::info!(
            kind = ?notification.kind(),
            "📧 (sem provedor de e-mail) para {}: {}",
            recipient,
            notification.subject()
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_parsing_handles_display_name() {
        assert_eq!(
            parse_sender("Safety Team <noreply@acme.test>"),
            ("Safety Team".to_string(), "noreply@acme.test".to_string())
        );
        assert_eq!(
            parse_sender("noreply@acme.test"),
            ("SafetySuite".to_string(), "noreply@acme.test".to_string())
        );
    }

    #[test]
    fn overdue_subject_pluralises_days() {
        let mut alert = Notification::OverdueAlert {
            recipient_name: "Alice".into(),
            observation_id: Uuid::nil(),
            title: "Blocked exit".into(),
            location: "Warehouse".into(),
            severity: Severity::High,
            status: ObservationStatus::InProgress,
            target_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            days_overdue: 1,
            detail_url: "http://localhost/obs".into(),
        };
        assert_eq!(alert.subject(), "Overdue Observation (1 day) - Blocked exit");

        if let Notification::OverdueAlert { days_overdue, .. } = &mut alert {
            *days_overdue = 3;
        }
        assert!(alert.subject().contains("3 days"));
        assert_eq!(alert.kind(), NotificationKind::OverdueAlert);
    }

    #[test]
    fn credentials_email_contains_password() {
        let n = Notification::ContractorCredentials {
            organization_name: "Acme".into(),
            full_name: "Carl".into(),
            email: "carl@contractor.test".into(),
            temporary_password: "Xy12Ab34Cd56".into(),
            access_expiry: None,
            login_url: "http://localhost/login".into(),
        };
        assert!(n.html().contains("Xy12Ab34Cd56"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("ação", 2), "aç");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let n = Notification::Invite {
            organization_name: "Acme".into(),
            role: "observer".into(),
            accept_url: "http://localhost/accept".into(),
            expires_at: None,
        };
        assert!(LogNotifier.send_notification("bob@acme.com", &n).await);
    }
}
