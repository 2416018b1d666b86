// src/db/settings_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres};
use crate::{
    common::error::AppError,
    models::settings::{Settings, UpdateSettingsPayload},
};

const SETTINGS_COLUMNS: &str = r#"
    shop_name, address, phone, gst_enabled, gst_number, default_gst_percent,
    invoice_footer, upi_id, low_stock_threshold, expiry_alert_days, updated_at
"#;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Busca o documento único, criando-o com os valores padrão na primeira leitura.
    /// Dentro de uma transação, passe `&mut tx`.
    pub async fn get_or_create(&self, conn: &mut PgConnection) -> Result<Settings, AppError> {
        // Idempotente: se já existe, não faz nada
        sqlx::query("INSERT INTO settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(&mut *conn)
            .await?;

        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM settings WHERE id = 1");
        let settings = sqlx::query_as::<_, Settings>(&sql)
            .fetch_one(&mut *conn)
            .await?;

        Ok(settings)
    }

    /// `get_or_create` numa conexão própria do pool.
    pub async fn load(&self) -> Result<Settings, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.get_or_create(&mut conn).await
    }

    pub async fn update<'e, E>(&self, executor: E, input: &UpdateSettingsPayload) -> Result<Settings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Campos ausentes mantêm o valor atual. A linha já deve existir (get_or_create).
        let sql = format!(
            r#"
            UPDATE settings SET
                shop_name = COALESCE($1, shop_name),
                address = COALESCE($2, address),
                phone = COALESCE($3, phone),
                gst_enabled = COALESCE($4, gst_enabled),
                gst_number = COALESCE($5, gst_number),
                default_gst_percent = COALESCE($6, default_gst_percent),
                invoice_footer = COALESCE($7, invoice_footer),
                upi_id = COALESCE($8, upi_id),
                low_stock_threshold = COALESCE($9, low_stock_threshold),
                expiry_alert_days = COALESCE($10, expiry_alert_days),
                updated_at = NOW()
            WHERE id = 1
            RETURNING {SETTINGS_COLUMNS}
            "#
        );
        let settings = sqlx::query_as::<_, Settings>(&sql)
            .bind(input.shop_name.as_deref())
            .bind(input.address.as_deref())
            .bind(input.phone.as_deref())
            .bind(input.gst_enabled)
            .bind(input.gst_number.as_deref())
            .bind(input.default_gst_percent)
            .bind(input.invoice_footer.as_deref())
            .bind(input.upi_id.as_deref())
            .bind(input.low_stock_threshold)
            .bind(input.expiry_alert_days)
            .fetch_one(executor)
            .await?;

        Ok(settings)
    }
}
