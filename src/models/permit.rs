// src/models/permit.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Prefixo do número da licença: PTW-YYYYMMDD-NNNN
pub const PERMIT_PREFIX: &str = "PTW";

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "permit_work_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    HotWork,
    ConfinedSpace,
    Electrical,
    Excavation,
    LiftingRigging,
    WorkAtHeight,
    BreakingContainment,
    General,
}

impl WorkType {
    pub fn label(&self) -> &'static str {
        match self {
            WorkType::HotWork => "Hot Work",
            WorkType::ConfinedSpace => "Confined Space Entry",
            WorkType::Electrical => "Electrical Work",
            WorkType::Excavation => "Excavation",
            WorkType::LiftingRigging => "Lifting & Rigging",
            WorkType::WorkAtHeight => "Work at Height",
            WorkType::BreakingContainment => "Breaking Containment / Isolation",
            WorkType::General => "General High-Risk Work",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "permit_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermitStatus {
    Draft,
    Submitted,
    Approved,
    Active,
    Closed,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Permit {
    pub id: Uuid,
    #[schema(ignore)]
    pub organization_id: Uuid,
    #[schema(example = "PTW-20260514-0003")]
    pub permit_number: String,
    pub work_type: WorkType,
    pub title: String,
    pub description: String,
    pub location_id: Uuid,
    pub work_area: String,

    // Pessoas
    pub requestor_id: Uuid,
    pub contractor_name: String,
    pub contractor_contact: String,
    pub workers_count: i32,
    pub approved_by_id: Option<Uuid>,

    // Cronograma
    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,

    // Riscos e controles
    pub hazards_identified: String,
    pub risk_controls: String,
    pub ppe_required: String,
    /// Exige bloqueio/etiquetagem (LOTO)?
    pub isolation_required: bool,
    pub isolation_details: String,
    pub emergency_procedure: String,

    // Checklist pré-trabalho
    pub toolbox_talk_done: bool,
    pub area_barricaded: bool,
    pub equipment_inspected: bool,
    pub gas_test_done: bool,
    pub gas_test_result: String,

    // Aprovação / rejeição
    pub approval_comment: String,
    pub rejection_reason: String,
    pub approved_at: Option<DateTime<Utc>>,

    // Encerramento
    pub closure_comment: String,
    pub site_restored: bool,
    pub closed_by_id: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,

    pub attachment: Option<String>,

    pub status: PermitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permit {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, PermitStatus::Approved | PermitStatus::Active) && self.planned_end < now
    }

    /// Duração planejada em horas, com 1 casa decimal.
    pub fn duration_hours(&self) -> f64 {
        let seconds = (self.planned_end - self.planned_start).num_seconds() as f64;
        (seconds / 3600.0 * 10.0).round() / 10.0
    }
}

/// Número no formato PTW-YYYYMMDD-NNNN.
pub fn day_prefix(prefix: &str, day: NaiveDate) -> String {
    format!("{}-{}", prefix, day.format("%Y%m%d"))
}

pub fn format_permit_number(day_prefix: &str, sequence: i32) -> String {
    format!("{}-{:04}", day_prefix, sequence)
}

// Campos editáveis (criação e edição em DRAFT)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "check_schedule"))]
pub struct PermitPayload {
    pub work_type: WorkType,
    #[validate(length(min = 1, max = 255, message = "The title is required."))]
    pub title: String,
    #[validate(length(min = 1, message = "Describe the work to be done."))]
    pub description: String,
    pub location_id: Uuid,
    #[validate(length(max = 255))]
    #[serde(default)]
    pub work_area: String,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub contractor_name: String,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub contractor_contact: String,
    #[validate(range(min = 1, message = "At least one worker is required."))]
    #[serde(default = "default_workers")]
    pub workers_count: i32,

    pub planned_start: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,

    #[validate(length(min = 1, message = "List the foreseeable hazards."))]
    pub hazards_identified: String,
    #[validate(length(min = 1, message = "List the risk controls."))]
    pub risk_controls: String,
    #[serde(default)]
    pub ppe_required: String,
    #[serde(default)]
    pub isolation_required: bool,
    #[serde(default)]
    pub isolation_details: String,
    #[serde(default)]
    pub emergency_procedure: String,

    #[serde(default)]
    pub toolbox_talk_done: bool,
    #[serde(default)]
    pub area_barricaded: bool,
    #[serde(default)]
    pub equipment_inspected: bool,
    #[serde(default)]
    pub gas_test_done: bool,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub gas_test_result: String,

    #[validate(length(max = 500))]
    pub attachment: Option<String>,
}

fn default_workers() -> i32 {
    1
}

// Fim planejado estritamente depois do início
fn check_schedule(payload: &PermitPayload) -> Result<(), ValidationError> {
    if payload.planned_end <= payload.planned_start {
        return Err(ValidationError::new("planned_end_before_start")
            .with_message("Planned end must be after planned start.".into()));
    }
    Ok(())
}

impl PermitPayload {
    /// Aplica os campos editáveis sobre uma licença em rascunho.
    pub fn apply_to(self, permit: &mut Permit) {
        permit.work_type = self.work_type;
        permit.title = self.title;
        permit.description = self.description;
        permit.location_id = self.location_id;
        permit.work_area = self.work_area;
        permit.contractor_name = self.contractor_name;
        permit.contractor_contact = self.contractor_contact;
        permit.workers_count = self.workers_count;
        permit.planned_start = self.planned_start;
        permit.planned_end = self.planned_end;
        permit.hazards_identified = self.hazards_identified;
        permit.risk_controls = self.risk_controls;
        permit.ppe_required = self.ppe_required;
        permit.isolation_required = self.isolation_required;
        permit.isolation_details = self.isolation_details;
        permit.emergency_procedure = self.emergency_procedure;
        permit.toolbox_talk_done = self.toolbox_talk_done;
        permit.area_barricaded = self.area_barricaded;
        permit.equipment_inspected = self.equipment_inspected;
        permit.gas_test_done = self.gas_test_done;
        permit.gas_test_result = self.gas_test_result;
        permit.attachment = self.attachment;
    }

    /// Rascunho novo (id e número são definidos na persistência).
    pub fn into_draft(
        self,
        organization_id: Uuid,
        requestor_id: Uuid,
        permit_number: String,
        now: DateTime<Utc>,
    ) -> Permit {
        let mut permit = Permit {
            id: Uuid::new_v4(),
            organization_id,
            permit_number,
            work_type: self.work_type,
            title: String::new(),
            description: String::new(),
            location_id: self.location_id,
            work_area: String::new(),
            requestor_id,
            contractor_name: String::new(),
            contractor_contact: String::new(),
            workers_count: 1,
            approved_by_id: None,
            planned_start: self.planned_start,
            planned_end: self.planned_end,
            actual_start: None,
            actual_end: None,
            hazards_identified: String::new(),
            risk_controls: String::new(),
            ppe_required: String::new(),
            isolation_required: false,
            isolation_details: String::new(),
            emergency_procedure: String::new(),
            toolbox_talk_done: false,
            area_barricaded: false,
            equipment_inspected: false,
            gas_test_done: false,
            gas_test_result: String::new(),
            approval_comment: String::new(),
            rejection_reason: String::new(),
            approved_at: None,
            closure_comment: String::new(),
            site_restored: false,
            closed_by_id: None,
            closed_at: None,
            attachment: None,
            status: PermitStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        self.apply_to(&mut permit);
        permit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPermitPayload {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub approval_comment: String,
    #[serde(default)]
    pub rejection_reason: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivatePermitPayload {
    pub actual_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosePermitPayload {
    pub actual_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closure_comment: String,
    #[serde(default)]
    pub site_restored: bool,
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PermitFilter {
    pub q: Option<String>,
    pub status: Option<PermitStatus>,
    pub work_type: Option<WorkType>,
    pub page: Option<i64>,
}

// Licença + campos derivados, como o cliente vê
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermitView {
    #[serde(flatten)]
    pub permit: Permit,
    pub is_overdue: bool,
    pub duration_hours: f64,
}

impl PermitView {
    pub fn new(permit: Permit, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: permit.is_overdue(now),
            duration_hours: permit.duration_hours(),
            permit,
        }
    }
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: PermitStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkTypeCount {
    pub work_type: WorkType,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermitDashboard {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
    pub by_type: Vec<WorkTypeCount>,
    pub overdue: Vec<PermitView>,
    pub pending_approval: Vec<PermitView>,
    pub active: Vec<PermitView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn permit_number_is_zero_padded() {
        let day = NaiveDate::from_ymd_opt(2026, 5, 14).unwrap();
        let prefix = day_prefix(PERMIT_PREFIX, day);
        assert_eq!(prefix, "PTW-20260514");
        assert_eq!(format_permit_number(&prefix, 3), "PTW-20260514-0003");
        assert_eq!(format_permit_number(&prefix, 12345), "PTW-20260514-12345");
    }

    #[test]
    fn duration_is_rounded_to_one_decimal() {
        let start = Utc.with_ymd_and_hms(2026, 5, 14, 8, 0, 0).unwrap();
        let payload = sample_payload(start, start + Duration::minutes(95));
        let permit = payload.into_draft(Uuid::new_v4(), Uuid::new_v4(), "PTW-X".into(), start);
        assert_eq!(permit.duration_hours(), 1.6);
        assert_eq!(permit.status, PermitStatus::Draft);
    }

    #[test]
    fn end_before_start_fails_validation() {
        let start = Utc.with_ymd_and_hms(2026, 5, 14, 8, 0, 0).unwrap();
        assert!(sample_payload(start, start + Duration::hours(1)).validate().is_ok());
        assert!(sample_payload(start, start).validate().is_err());
        assert!(sample_payload(start, start - Duration::hours(1)).validate().is_err());
    }

    #[test]
    fn only_approved_or_active_permits_can_be_overdue() {
        let start = Utc.with_ymd_and_hms(2026, 5, 14, 8, 0, 0).unwrap();
        let payload = sample_payload(start, start + Duration::hours(2));
        let mut permit = payload.into_draft(Uuid::new_v4(), Uuid::new_v4(), "PTW-X".into(), start);
        let later = start + Duration::hours(3);

        assert!(!permit.is_overdue(later));
        permit.status = PermitStatus::Approved;
        assert!(permit.is_overdue(later));
        permit.status = PermitStatus::Active;
        assert!(permit.is_overdue(later));
        assert!(!permit.is_overdue(start));
        permit.status = PermitStatus::Closed;
        assert!(!permit.is_overdue(later));
    }

    fn sample_payload(start: DateTime<Utc>, end: DateTime<Utc>) -> PermitPayload {
        PermitPayload {
            work_type: WorkType::HotWork,
            title: "Weld flange on line 7".into(),
            description: "Replace corroded flange".into(),
            location_id: Uuid::new_v4(),
            work_area: String::new(),
            contractor_name: String::new(),
            contractor_contact: String::new(),
            workers_count: 2,
            planned_start: start,
            planned_end: end,
            hazards_identified: "Fire".into(),
            risk_controls: "Fire watch".into(),
            ppe_required: String::new(),
            isolation_required: false,
            isolation_details: String::new(),
            emergency_procedure: String::new(),
            toolbox_talk_done: true,
            area_barricaded: true,
            equipment_inspected: true,
            gas_test_done: true,
            gas_test_result: "LEL 0%".into(),
            attachment: None,
        }
    }
}
