// src/main.rs

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use safety_suite::{
    config::{AppState, Config},
    jobs, routes,
};

#[derive(Parser)]
#[command(name = "safety_suite", version, about = "Backend de observações de segurança e licenças de trabalho")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sobe a API HTTP (padrão)
    Serve,
    /// Rebaixa assinaturas vencidas para o plano gratuito
    DowngradeExpiredSubscriptions,
    /// Envia alertas de observações atrasadas
    SendOverdueAlerts {
        /// Só conta, não envia nada
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Se a configuração falhar, a aplicação não deve iniciar
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(app_state, &config.bind_addr).await,
        Command::DowngradeExpiredSubscriptions => {
            jobs::downgrade_expired_subscriptions(&app_state).await?;
            Ok(())
        }
        Command::SendOverdueAlerts { dry_run } => {
            jobs::send_overdue_alerts(&app_state, dry_run).await?;
            Ok(())
        }
    }
}

async fn serve(app_state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let app = routes::build_router(app_state);

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
