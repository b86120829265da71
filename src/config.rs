// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    billing::gateway::RazorpayClient,
    common::i18n::I18nStore,
    db::{
        BillingRepository, InviteRepository, ObservationRepository, PermitRepository,
        PgPermitSequence, TenantRepository, UserRepository,
    },
    notify::{BrevoNotifier, LogNotifier, Notifier},
    services::{
        auth::AuthService, billing_service::BillingService, document_service::DocumentService,
        invite_service::InviteService, observation_service::ObservationService,
        permit_service::PermitService, tenancy_service::TenantService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_FROM_EMAIL: &str = "SafetySuite <noreply@safetysuite.local>";
const DEFAULT_FONTS_DIR: &str = "./fonts";

// Configuração lida do ambiente (.env)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub brevo_api_key: Option<String>,
    pub default_from_email: String,
    pub site_url: String,
    pub pdf_fonts_dir: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte de variáveis.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| optional(key).with_context(|| format!("{} deve ser definida", key));
        let or_default = |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: or_default("BIND_ADDR", DEFAULT_BIND_ADDR),
            razorpay_key_id: or_default("RAZORPAY_KEY_ID", ""),
            razorpay_key_secret: or_default("RAZORPAY_KEY_SECRET", ""),
            razorpay_webhook_secret: or_default("RAZORPAY_WEBHOOK_SECRET", ""),
            brevo_api_key: optional("BREVO_API_KEY"),
            default_from_email: or_default("DEFAULT_FROM_EMAIL", DEFAULT_FROM_EMAIL),
            site_url: or_default("SITE_URL", DEFAULT_SITE_URL).trim_end_matches('/').to_string(),
            pdf_fonts_dir: or_default("PDF_FONTS_DIR", DEFAULT_FONTS_DIR),
        };

        if config.razorpay_key_secret.is_empty() || config.razorpay_webhook_secret.is_empty() {
            tracing::warn!("Chaves do Razorpay ausentes: pagamentos e webhooks serão recusados");
        }
        Ok(config)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: I18nStore,
    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub invite_service: InviteService,
    pub observation_service: ObservationService,
    pub permit_service: PermitService,
    pub billing_service: BillingService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar no banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::assemble(config, db_pool)
    }

    // --- Monta o gráfico de dependências ---
    pub fn assemble(config: &Config, db_pool: PgPool) -> anyhow::Result<Self> {
        let i18n_store = I18nStore::load()?;

        let notifier: Arc<dyn Notifier> = match &config.brevo_api_key {
            Some(key) => Arc::new(BrevoNotifier::new(key.clone(), &config.default_from_email)?),
            None => {
                tracing::warn!("BREVO_API_KEY ausente: e-mails só serão registrados no log");
                Arc::new(LogNotifier)
            }
        };
        let gateway = Arc::new(RazorpayClient::new(
            config.razorpay_key_id.clone(),
            config.razorpay_key_secret.clone(),
        )?);

        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let invite_repo = InviteRepository::new(db_pool.clone());
        let observation_repo = ObservationRepository::new(db_pool.clone());
        let permit_repo = PermitRepository::new(db_pool.clone());
        let billing_repo = BillingRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), config.jwt_secret.clone(), db_pool.clone());
        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            user_repo.clone(),
            observation_repo.clone(),
            auth_service.clone(),
            db_pool.clone(),
        );
        let invite_service = InviteService::new(
            invite_repo,
            user_repo.clone(),
            auth_service.clone(),
            notifier.clone(),
            config.site_url.clone(),
            db_pool.clone(),
        );
        let observation_service = ObservationService::new(
            observation_repo,
            tenant_repo.clone(),
            user_repo.clone(),
            notifier,
            config.site_url.clone(),
            db_pool.clone(),
        );
        let permit_service = PermitService::new(
            permit_repo,
            tenant_repo.clone(),
            user_repo,
            Arc::new(PgPermitSequence::new(db_pool.clone())),
            DocumentService::new(config.pdf_fonts_dir.clone()),
            db_pool.clone(),
        );
        let billing_service = BillingService::new(
            billing_repo,
            tenant_repo,
            gateway,
            config.razorpay_key_secret.clone(),
            config.razorpay_webhook_secret.clone(),
            db_pool.clone(),
        );

        Ok(Self {
            db_pool,
            i18n_store,
            auth_service,
            tenant_service,
            invite_service,
            observation_service,
            permit_service,
            billing_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/safety"),
            ("JWT_SECRET", "secret"),
            ("SITE_URL", "https://safety.acme.test/"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.site_url, "https://safety.acme.test");
        assert!(config.brevo_api_key.is_none());
        assert_eq!(config.pdf_fonts_dir, DEFAULT_FONTS_DIR);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn blank_brevo_key_means_log_notifier() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/safety"),
            ("JWT_SECRET", "secret"),
            ("BREVO_API_KEY", "  "),
        ]))
        .unwrap();
        assert!(config.brevo_api_key.is_none());
    }
}
