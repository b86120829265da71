// src/workflow/permit.rs

use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    models::{
        auth::{Role, User},
        permit::{
            ActivatePermitPayload, ClosePermitPayload, Permit, PermitPayload, PermitStatus,
            ReviewDecision, ReviewPermitPayload,
        },
    },
};

// --- Atores ---

fn is_requestor_or_manager(permit: &Permit, actor: &User) -> bool {
    permit.requestor_id == actor.id || actor.has(Role::Manager)
}

fn ensure_requestor_or_manager(permit: &Permit, actor: &User) -> Result<(), AppError> {
    if !is_requestor_or_manager(permit, actor) {
        return Err(AppError::Authorization(
            "Only the requestor or a manager can do this.".into(),
        ));
    }
    Ok(())
}

fn ensure_status(permit: &Permit, allowed: &[PermitStatus], message: &str) -> Result<(), AppError> {
    if !allowed.contains(&permit.status) {
        return Err(AppError::InvalidTransition(message.to_string()));
    }
    Ok(())
}

/// Terceirizados só enxergam as próprias licenças.
pub fn can_view(permit: &Permit, actor: &User) -> bool {
    !actor.is_contractor() || permit.requestor_id == actor.id
}

/// Edição: só em DRAFT, pelo solicitante ou gerente.
pub fn edit(permit: &mut Permit, actor: &User, payload: PermitPayload, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_status(permit, &[PermitStatus::Draft], "Only Draft permits can be edited.")?;
    ensure_requestor_or_manager(permit, actor)?;

    payload.apply_to(permit);
    permit.updated_at = now;
    Ok(())
}

pub fn submit(permit: &mut Permit, actor: &User, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_status(permit, &[PermitStatus::Draft], "Only Draft permits can be submitted.")?;
    ensure_requestor_or_manager(permit, actor)?;

    permit.status = PermitStatus::Submitted;
    permit.updated_at = now;
    Ok(())
}

/// Aprovação ou rejeição (gestor de segurança ou gerente).
pub fn review(
    permit: &mut Permit,
    actor: &User,
    payload: ReviewPermitPayload,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_status(
        permit,
        &[PermitStatus::Submitted],
        "Only Submitted permits can be approved or rejected.",
    )?;
    if !actor.has_permit_full_access() {
        return Err(AppError::Authorization(
            "Only Safety Managers or Managers can approve permits.".into(),
        ));
    }

    match payload.decision {
        ReviewDecision::Approve => {
            permit.status = PermitStatus::Approved;
            permit.approved_by_id = Some(actor.id);
            permit.approved_at = Some(now);
            permit.approval_comment = payload.approval_comment;
        }
        ReviewDecision::Reject => {
            let reason = payload.rejection_reason.trim();
            if reason.is_empty() {
                return Err(AppError::InvalidInput(
                    "A rejection reason is required.".into(),
                ));
            }
            permit.status = PermitStatus::Rejected;
            permit.rejection_reason = reason.to_string();
        }
    }
    permit.updated_at = now;
    Ok(())
}

pub fn activate(
    permit: &mut Permit,
    actor: &User,
    payload: ActivatePermitPayload,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_status(permit, &[PermitStatus::Approved], "Only Approved permits can be activated.")?;
    ensure_requestor_or_manager(permit, actor)?;

    permit.status = PermitStatus::Active;
    permit.actual_start = Some(payload.actual_start.unwrap_or(now));
    permit.updated_at = now;
    Ok(())
}

/// Encerramento exige a confirmação de que o local foi restaurado.
pub fn close(
    permit: &mut Permit,
    actor: &User,
    payload: ClosePermitPayload,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    ensure_status(permit, &[PermitStatus::Active], "Only Active permits can be closed.")?;
    if !(permit.requestor_id == actor.id || actor.has_permit_full_access()) {
        return Err(AppError::Authorization(
            "Only the requestor, a Safety Manager or a Manager can close this permit.".into(),
        ));
    }
    if !payload.site_restored {
        return Err(AppError::InvalidInput(
            "You must confirm the site has been cleaned and restored before closing.".into(),
        ));
    }

    permit.status = PermitStatus::Closed;
    permit.site_restored = true;
    permit.closure_comment = payload.closure_comment;
    permit.actual_end = Some(payload.actual_end.unwrap_or(now));
    permit.closed_by_id = Some(actor.id);
    permit.closed_at = Some(now);
    permit.updated_at = now;
    Ok(())
}

pub fn cancel(permit: &mut Permit, actor: &User, now: DateTime<Utc>) -> Result<(), AppError> {
    ensure_status(
        permit,
        &[PermitStatus::Draft, PermitStatus::Submitted],
        "Only Draft or Submitted permits can be cancelled.",
    )?;
    ensure_requestor_or_manager(permit, actor)?;

    permit.status = PermitStatus::Cancelled;
    permit.updated_at = now;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::fixtures::user, permit::WorkType};
    use chrono::Duration;
    use uuid::Uuid;

    fn draft(requestor: &User) -> Permit {
        let now = Utc::now();
        let payload: PermitPayload = serde_json::from_value(serde_json::json!({
            "workType": "confined_space",
            "title": "Tank entry",
            "description": "Inspect tank T-3",
            "locationId": Uuid::new_v4(),
            "plannedStart": now,
            "plannedEnd": now + Duration::hours(4),
            "hazardsIdentified": "O2 depletion",
            "riskControls": "Gas test, standby man"
        }))
        .unwrap();
        payload.into_draft(
            requestor.organization_id.unwrap(),
            requestor.id,
            "PTW-20260514-0001".into(),
            now,
        )
    }

    fn approve() -> ReviewPermitPayload {
        ReviewPermitPayload {
            decision: ReviewDecision::Approve,
            approval_comment: "OK".into(),
            rejection_reason: String::new(),
        }
    }

    #[test]
    fn approving_a_draft_is_an_invalid_transition() {
        let org = Some(Uuid::new_v4());
        let requestor = user(&[Role::Observer], org);
        let safety = user(&[Role::SafetyManager], org);
        let mut permit = draft(&requestor);
        assert_eq!(permit.work_type, WorkType::ConfinedSpace);

        let err = review(&mut permit, &safety, approve(), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));
        assert_eq!(permit.status, PermitStatus::Draft);
    }

    #[test]
    fn full_lifecycle_stamps_actors_and_times() {
        let org = Some(Uuid::new_v4());
        let requestor = user(&[Role::Observer], org);
        let safety = user(&[Role::SafetyManager], org);
        let mut permit = draft(&requestor);
        let now = Utc::now();

        submit(&mut permit, &requestor, now).unwrap();
        review(&mut permit, &safety, approve(), now).unwrap();
        assert_eq!(permit.approved_by_id, Some(safety.id));
        assert_eq!(permit.approved_at, Some(now));

        activate(&mut permit, &requestor, ActivatePermitPayload::default(), now).unwrap();
        assert_eq!(permit.actual_start, Some(now));

        let payload = ClosePermitPayload {
            actual_end: None,
            closure_comment: "Done".into(),
            site_restored: true,
        };
        close(&mut permit, &safety, payload, now).unwrap();
        assert_eq!(permit.status, PermitStatus::Closed);
        assert_eq!(permit.closed_by_id, Some(safety.id));
        assert_eq!(permit.closed_at, Some(now));
    }

    #[test]
    fn close_without_site_restored_is_rejected() {
        let org = Some(Uuid::new_v4());
        let requestor = user(&[Role::Observer], org);
        let mut permit = draft(&requestor);
        permit.status = PermitStatus::Active;

        let payload = ClosePermitPayload {
            actual_end: None,
            closure_comment: "All good".into(),
            site_restored: false,
        };
        let err = close(&mut permit, &requestor, payload, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(permit.status, PermitStatus::Active);
        assert!(permit.closed_at.is_none());
    }

    #[test]
    fn rejection_needs_a_reason_and_is_terminal() {
        let org = Some(Uuid::new_v4());
        let requestor = user(&[Role::Observer], org);
        let manager = user(&[Role::Manager], org);
        let mut permit = draft(&requestor);
        let now = Utc::now();
        submit(&mut permit, &requestor, now).unwrap();

        let mut reject = ReviewPermitPayload {
            decision: ReviewDecision::Reject,
            approval_comment: String::new(),
            rejection_reason: "   ".into(),
        };
        assert!(matches!(
            review(&mut permit, &manager, reject.clone(), now),
            Err(AppError::InvalidInput(_))
        ));

        reject.rejection_reason = "Missing gas test".into();
        review(&mut permit, &manager, reject, now).unwrap();
        assert_eq!(permit.status, PermitStatus::Rejected);

        assert!(submit(&mut permit, &requestor, now).is_err());
        assert!(cancel(&mut permit, &requestor, now).is_err());
    }

    #[test]
    fn only_requestor_or_manager_can_submit_edit_or_cancel() {
        let org = Some(Uuid::new_v4());
        let requestor = user(&[Role::Observer], org);
        let other = user(&[Role::SafetyManager], org);
        let manager = user(&[Role::Manager], org);
        let now = Utc::now();
        let mut permit = draft(&requestor);

        assert!(matches!(submit(&mut permit, &other, now), Err(AppError::Authorization(_))));
        assert!(matches!(cancel(&mut permit, &other, now), Err(AppError::Authorization(_))));

        submit(&mut permit, &manager, now).unwrap();
        cancel(&mut permit, &requestor, now).unwrap();
        assert_eq!(permit.status, PermitStatus::Cancelled);
    }

    #[test]
    fn contractor_cannot_approve_even_with_manager_flag() {
        let org = Some(Uuid::new_v4());
        let requestor = user(&[Role::Observer], org);
        let contractor = user(&[Role::Contractor, Role::Manager], org);
        let mut permit = draft(&requestor);
        permit.status = PermitStatus::Submitted;

        assert!(matches!(
            review(&mut permit, &contractor, approve(), Utc::now()),
            Err(AppError::Authorization(_))
        ));
        assert!(!can_view(&permit, &contractor));
        assert!(can_view(&permit, &requestor));
    }
}
