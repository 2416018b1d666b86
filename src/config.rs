// src/config.rs

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{BillRepository, MedicineRepository, SettingsRepository, UserRepository},
    services::{
        auth::AuthService,
        billing_service::{BillingService, PgBillingStore},
        document_service::DocumentService,
        inventory_service::{InventoryService, PgInventoryStore},
        report_service::ReportService,
        settings_service::SettingsService,
    },
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub cookie_secure: bool,
    pub fonts_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Monta a configuração a partir de uma função de busca (testável sem tocar no ambiente).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{} must be set", key))
        };
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_addr = optional("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address (e.g. 0.0.0.0:3000)")?;

        let db_max_connections = match optional("DB_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            None => 5,
        };

        let cookie_secure = match optional("COOKIE_SECURE") {
            Some(value) => value
                .parse()
                .context("COOKIE_SECURE must be true or false")?,
            None => false,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr,
            db_max_connections,
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
            cookie_secure,
            fonts_dir: optional("FONTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./fonts")),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub cookie_secure: bool,
    pub auth_service: AuthService,
    pub inventory_service: InventoryService,
    pub billing_service: BillingService,
    pub report_service: ReportService,
    pub settings_service: SettingsService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Failed to connect to the database")?;

        tracing::info!("✅ Database connection established");

        Ok(Self::from_pool(config, db_pool))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_pool(config: &AppConfig, db_pool: PgPool) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let medicine_repo = MedicineRepository::new(db_pool.clone());
        let bill_repo = BillRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo, config.jwt_secret.clone());
        let inventory_store = PgInventoryStore::new(medicine_repo.clone(), settings_repo.clone());
        let inventory_service = InventoryService::new(Arc::new(inventory_store));
        let settings_service = SettingsService::new(settings_repo.clone());
        let billing_store = PgBillingStore::new(medicine_repo.clone(), bill_repo.clone(), settings_repo.clone());
        let billing_service = BillingService::new(Arc::new(billing_store));
        let report_service = ReportService::new(bill_repo, medicine_repo, settings_repo);
        let document_service = DocumentService::new(
            billing_service.clone(),
            settings_service.clone(),
            config.fonts_dir.clone(),
        );

        Self {
            db_pool,
            cookie_secure: config.cookie_secure,
            auth_service,
            inventory_service,
            billing_service,
            report_service,
            settings_service,
            document_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_values_are_missing() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pharmacy"),
            ("JWT_SECRET", "secret"),
        ]))
        .expect("config");

        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.db_max_connections, 5);
        assert!(!config.cookie_secure);
        assert_eq!(config.fonts_dir, PathBuf::from("./fonts"));
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn missing_required_value_is_named_in_the_error() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/pharmacy")]))
            .expect_err("JWT_SECRET is required");
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pharmacy"),
            ("JWT_SECRET", "secret"),
            ("DB_MAX_CONNECTIONS", "many"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pharmacy"),
            ("JWT_SECRET", "secret"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("COOKIE_SECURE", "true"),
            ("ADMIN_EMAIL", "admin@pharmacy.test"),
            ("ADMIN_PASSWORD", "changeme"),
        ]))
        .expect("config");

        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.cookie_secure);
        assert_eq!(config.admin_email.as_deref(), Some("admin@pharmacy.test"));
    }
}
