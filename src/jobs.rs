// src/jobs.rs

// Rotinas agendadas (cron), chamadas pelos subcomandos do binário.

use chrono::Utc;

use crate::{common::error::AppError, config::AppState, models::billing::SweepReport};

pub async fn downgrade_expired_subscriptions(app_state: &AppState) -> Result<SweepReport, AppError> {
    let report = app_state.billing_service.downgrade_expired(Utc::now()).await?;
    tracing::info!(
        total = report.total,
        downgraded = report.changed,
        "Rotina de assinaturas vencidas concluída"
    );
    Ok(report)
}

pub async fn send_overdue_alerts(app_state: &AppState, dry_run: bool) -> Result<SweepReport, AppError> {
    let today = Utc::now().date_naive();
    let report = app_state
        .observation_service
        .send_overdue_alerts(today, dry_run)
        .await?;

    if dry_run {
        tracing::info!(total = report.total, "[dry-run] nenhum alerta enviado");
    } else {
        tracing::info!(
            total = report.total,
            sent = report.changed,
            failed = report.failed,
            "Alertas de atraso enviados"
        );
    }
    Ok(report)
}
