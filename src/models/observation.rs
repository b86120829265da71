// src/models/observation.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "observation_severity", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "observation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservationStatus {
    Open,
    InProgress,
    AwaitingVerification,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    pub location_id: Uuid,
    pub observer_id: Option<Uuid>,
    pub date_observed: DateTime<Utc>,
    #[schema(example = "Missing guard rail on mezzanine")]
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub photo_before: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub status: ObservationStatus,
    pub target_date: Option<NaiveDate>,
    pub rectification_details: String,
    pub photo_after: Option<String>,
    pub date_closed: Option<DateTime<Utc>>,
    pub verification_comment: Option<String>,
    pub is_archived: bool,
}

impl Observation {
    /// Prazo vencido e ainda aberto (usado no painel).
    pub fn is_past_target(&self, today: NaiveDate) -> bool {
        self.status != ObservationStatus::Closed && self.target_date.is_some_and(|d| d < today)
    }

    /// Critério do alerta diário de atraso.
    pub fn needs_overdue_alert(&self, today: NaiveDate) -> bool {
        !self.is_archived
            && self.assigned_to_id.is_some()
            && self.target_date.is_some_and(|d| d < today)
            && !matches!(
                self.status,
                ObservationStatus::Closed | ObservationStatus::AwaitingVerification
            )
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        self.target_date
            .map(|d| (today - d).num_days())
            .unwrap_or_default()
    }
}

// Dados para criar uma observação (organização/observador vêm do contexto)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateObservationPayload {
    pub location_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "The title is required."))]
    pub title: String,
    #[validate(length(min = 1, message = "The description is required."))]
    pub description: String,
    pub severity: Severity,
    pub assigned_to_id: Option<Uuid>,
    pub target_date: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub photo_before: Option<String>,
}

impl CreateObservationPayload {
    /// Observação nova: status OPEN, observador = quem registrou.
    pub fn into_observation(self, organization_id: Uuid, observer_id: Uuid, now: DateTime<Utc>) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            organization_id,
            location_id: self.location_id,
            observer_id: Some(observer_id),
            date_observed: now,
            title: self.title.trim().to_string(),
            description: self.description,
            severity: self.severity,
            photo_before: self.photo_before,
            assigned_to_id: self.assigned_to_id,
            status: ObservationStatus::Open,
            target_date: self.target_date,
            rectification_details: String::new(),
            photo_after: None,
            date_closed: None,
            verification_comment: None,
            is_archived: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignObservationPayload {
    pub assigned_to_id: Uuid,
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RectifyObservationPayload {
    #[validate(length(min = 1, message = "Describe the rectification."))]
    pub rectification_details: String,
    #[validate(length(max = 500))]
    pub photo_after: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerificationAction {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyObservationPayload {
    pub action: VerificationAction,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationCreated {
    pub observation: Observation,
    pub warnings: Vec<String>,
}

// Linha da rotina de atraso: observação + responsável + local
#[derive(Debug, Clone, FromRow)]
pub struct OverdueObservation {
    #[sqlx(flatten)]
    pub observation: Observation,
    pub assignee_email: String,
    pub assignee_name: String,
    pub location_name: String,
}

// Contadores do painel (sem gráficos)
#[derive(Debug, Default, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationDashboard {
    pub total: i64,
    pub open: i64,
    pub closed: i64,
    pub overdue: i64,
    pub high_severity_open: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn observation(organization_id: Uuid, assigned_to_id: Option<Uuid>) -> Observation {
        Observation {
            id: Uuid::new_v4(),
            organization_id,
            location_id: Uuid::new_v4(),
            observer_id: None,
            date_observed: Utc::now(),
            title: "Oil spill near pump 4".into(),
            description: "Slippery floor".into(),
            severity: Severity::Medium,
            photo_before: None,
            assigned_to_id,
            status: ObservationStatus::Open,
            target_date: None,
            rectification_details: String::new(),
            photo_after: None,
            date_closed: None,
            verification_comment: None,
            is_archived: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdue_alert_skips_awaiting_verification_and_archived() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
        let mut obs = fixtures::observation(Uuid::new_v4(), Some(Uuid::new_v4()));
        obs.target_date = Some(today.pred_opt().unwrap());
        assert!(obs.needs_overdue_alert(today));
        assert_eq!(obs.days_overdue(today), 1);

        obs.status = ObservationStatus::AwaitingVerification;
        assert!(!obs.needs_overdue_alert(today));
        // O painel ainda conta como atrasada
        assert!(obs.is_past_target(today));

        obs.status = ObservationStatus::InProgress;
        obs.is_archived = true;
        assert!(!obs.needs_overdue_alert(today));
    }

    #[test]
    fn target_date_today_is_not_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
        let mut obs = fixtures::observation(Uuid::new_v4(), Some(Uuid::new_v4()));
        obs.target_date = Some(today);
        assert!(!obs.needs_overdue_alert(today));
    }
}
