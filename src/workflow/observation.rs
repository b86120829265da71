// src/workflow/observation.rs

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    common::error::AppError,
    models::{
        auth::{Role, RoleSet, User},
        observation::{Observation, ObservationStatus, VerificationAction},
        tenancy::Plan,
    },
};

/// Quem pode verificar, arquivar e atribuir.
const REVIEWERS: RoleSet = RoleSet::of(&[Role::SafetyManager, Role::Manager]);

pub fn ensure_observation_access(actor: &User) -> Result<(), AppError> {
    if !actor.has_observation_access() {
        return Err(AppError::Authorization(
            "Contractors have no access to observations.".into(),
        ));
    }
    Ok(())
}

fn ensure_reviewer(actor: &User, action: &str) -> Result<(), AppError> {
    ensure_observation_access(actor)?;
    if !actor.has_any(REVIEWERS) {
        return Err(AppError::Authorization(format!(
            "Only Safety Managers or Managers can {} observations.",
            action
        )));
    }
    Ok(())
}

/// Criação: qualquer membro com acesso, respeitando a cota do plano.
/// `active_count` = observações não arquivadas do tenant.
pub fn ensure_can_create(actor: &User, plan: Option<&Plan>, active_count: i64) -> Result<(), AppError> {
    ensure_observation_access(actor)?;
    let Some(plan) = plan else {
        return Ok(());
    };
    if plan.observation_quota_reached(active_count) {
        return Err(AppError::CapacityExceeded(format!(
            "Your {} plan allows up to {} observations. Upgrade to log more.",
            plan.name,
            plan.max_observations.unwrap_or_default()
        )));
    }
    Ok(())
}

/// Atribui um responsável (OPEN passa a IN_PROGRESS).
pub fn assign(
    observation: &mut Observation,
    actor: &User,
    assignee: &User,
    target_date: Option<NaiveDate>,
) -> Result<(), AppError> {
    ensure_reviewer(actor, "assign")?;

    match observation.status {
        ObservationStatus::Open | ObservationStatus::InProgress => {}
        status => {
            return Err(AppError::InvalidTransition(format!(
                "An observation in status {:?} cannot be reassigned.",
                status
            )));
        }
    }

    observation.assigned_to_id = Some(assignee.id);
    if target_date.is_some() {
        observation.target_date = target_date;
    }
    observation.status = ObservationStatus::InProgress;
    Ok(())
}

/// Retificação: somente o responsável atribuído, a partir de OPEN ou IN_PROGRESS.
pub fn rectify(
    observation: &mut Observation,
    actor: &User,
    rectification_details: String,
    photo_after: Option<String>,
) -> Result<(), AppError> {
    if observation.assigned_to_id != Some(actor.id) {
        return Err(AppError::Authorization(
            "Only the assigned action owner can submit rectification.".into(),
        ));
    }

    match observation.status {
        ObservationStatus::Open | ObservationStatus::InProgress => {}
        status => {
            return Err(AppError::InvalidTransition(format!(
                "Rectification is not possible while the observation is {:?}.",
                status
            )));
        }
    }

    observation.rectification_details = rectification_details;
    if photo_after.is_some() {
        observation.photo_after = photo_after;
    }
    observation.status = ObservationStatus::AwaitingVerification;
    Ok(())
}

/// Verificação: aprovar fecha (com data), rejeitar volta para retrabalho.
pub fn verify(
    observation: &mut Observation,
    actor: &User,
    action: VerificationAction,
    comment: String,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_reviewer(actor, "verify")?;

    if observation.status != ObservationStatus::AwaitingVerification {
        return Err(AppError::InvalidTransition(
            "Only observations awaiting verification can be verified.".into(),
        ));
    }

    match action {
        VerificationAction::Approve => {
            observation.status = ObservationStatus::Closed;
            observation.date_closed = Some(now);
        }
        VerificationAction::Reject => {
            observation.status = ObservationStatus::InProgress;
            observation.date_closed = None;
        }
    }
    observation.verification_comment = Some(comment);
    Ok(())
}

/// Arquivar / restaurar não mexe no status.
pub fn set_archived(observation: &mut Observation, actor: &User, archived: bool) -> Result<(), AppError> {
    ensure_reviewer(actor, if archived { "archive" } else { "restore" })?;
    observation.is_archived = archived;
    Ok(())
}

pub fn ensure_can_delete(actor: &User) -> Result<(), AppError> {
    ensure_observation_access(actor)?;
    if !actor.has_any(RoleSet::of(&[Role::Manager, Role::Superuser])) {
        return Err(AppError::Authorization(
            "Only managers can delete observations.".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        auth::fixtures::user,
        observation::fixtures::observation,
        tenancy::{fixtures::plan, PlanTier},
    };
    use uuid::Uuid;

    #[test]
    fn quota_blocks_creation_once_reached() {
        let org = Some(Uuid::new_v4());
        let observer = user(&[Role::Observer], org);
        let free = plan(PlanTier::Trial, Some(5), Some(50));

        assert!(ensure_can_create(&observer, Some(&free), 49).is_ok());
        assert!(matches!(
            ensure_can_create(&observer, Some(&free), 50),
            Err(AppError::CapacityExceeded(_))
        ));

        let unlimited = plan(PlanTier::Enterprise, None, None);
        assert!(ensure_can_create(&observer, Some(&unlimited), 10_000).is_ok());
    }

    #[test]
    fn contractors_cannot_create_observations() {
        let contractor = user(&[Role::Contractor], Some(Uuid::new_v4()));
        let free = plan(PlanTier::Trial, Some(5), Some(50));
        assert!(matches!(
            ensure_can_create(&contractor, Some(&free), 0),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn only_assignee_can_rectify() {
        let org = Uuid::new_v4();
        let alice = user(&[Role::ActionOwner], Some(org));
        let bob = user(&[Role::Observer, Role::Manager], Some(org));
        let mut obs = observation(org, Some(alice.id));

        let err = rectify(&mut obs, &bob, "Cleaned".into(), None).unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
        assert_eq!(obs.status, ObservationStatus::Open);

        rectify(&mut obs, &alice, "Cleaned".into(), Some("after.jpg".into())).unwrap();
        assert_eq!(obs.status, ObservationStatus::AwaitingVerification);
        assert_eq!(obs.photo_after.as_deref(), Some("after.jpg"));
    }

    #[test]
    fn open_observation_cannot_be_closed_directly() {
        let org = Uuid::new_v4();
        let safety = user(&[Role::SafetyManager], Some(org));
        let mut obs = observation(org, None);

        let err = verify(&mut obs, &safety, VerificationAction::Approve, String::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
        assert!(obs.date_closed.is_none());
    }

    #[test]
    fn approve_closes_with_date_and_reject_reopens() {
        let org = Uuid::new_v4();
        let owner = user(&[Role::ActionOwner], Some(org));
        let safety = user(&[Role::SafetyManager], Some(org));
        let mut obs = observation(org, Some(owner.id));
        let now = Utc::now();

        rectify(&mut obs, &owner, "Fixed".into(), None).unwrap();
        verify(&mut obs, &safety, VerificationAction::Reject, "Still leaking".into(), now).unwrap();
        assert_eq!(obs.status, ObservationStatus::InProgress);
        assert_eq!(obs.verification_comment.as_deref(), Some("Still leaking"));

        rectify(&mut obs, &owner, "Fixed for real".into(), None).unwrap();
        verify(&mut obs, &safety, VerificationAction::Approve, String::new(), now).unwrap();
        assert_eq!(obs.status, ObservationStatus::Closed);
        assert_eq!(obs.date_closed, Some(now));
        assert_eq!(obs.verification_comment.as_deref(), Some(""));
    }

    #[test]
    fn observer_cannot_verify_or_archive() {
        let org = Uuid::new_v4();
        let observer = user(&[Role::Observer], Some(org));
        let mut obs = observation(org, None);
        obs.status = ObservationStatus::AwaitingVerification;

        assert!(matches!(
            verify(&mut obs, &observer, VerificationAction::Approve, String::new(), Utc::now()),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            set_archived(&mut obs, &observer, true),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn archive_keeps_status() {
        let org = Uuid::new_v4();
        let manager = user(&[Role::Manager], Some(org));
        let mut obs = observation(org, None);
        obs.status = ObservationStatus::InProgress;

        set_archived(&mut obs, &manager, true).unwrap();
        assert!(obs.is_archived);
        assert_eq!(obs.status, ObservationStatus::InProgress);

        set_archived(&mut obs, &manager, false).unwrap();
        assert!(!obs.is_archived);
    }

    #[test]
    fn assign_moves_open_to_in_progress() {
        let org = Uuid::new_v4();
        let safety = user(&[Role::SafetyManager], Some(org));
        let owner = user(&[Role::ActionOwner], Some(org));
        let mut obs = observation(org, None);
        let target = NaiveDate::from_ymd_opt(2026, 6, 1);

        assign(&mut obs, &safety, &owner, target).unwrap();
        assert_eq!(obs.status, ObservationStatus::InProgress);
        assert_eq!(obs.assigned_to_id, Some(owner.id));
        assert_eq!(obs.target_date, target);

        obs.status = ObservationStatus::Closed;
        assert!(matches!(
            assign(&mut obs, &safety, &owner, None),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn delete_requires_manager_or_superuser() {
        let org = Some(Uuid::new_v4());
        assert!(ensure_can_delete(&user(&[Role::Manager], org)).is_ok());
        assert!(ensure_can_delete(&user(&[Role::Superuser], org)).is_ok());
        assert!(ensure_can_delete(&user(&[Role::SafetyManager], org)).is_err());
    }
}
