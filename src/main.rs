//src/main.rs

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

use crate::config::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG sobrescreve o filtro padrão
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pharmacy_backend=debug,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar
    let config = AppConfig::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("✅ Database migrations applied");

    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            app_state
                .auth_service
                .ensure_admin(email, password)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to seed the admin user: {}", e))?;
        }
        _ => tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; no admin will be seeded"),
    }

    let app = routes::app_router(app_state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("Axum server error")?;
    Ok(())
}
