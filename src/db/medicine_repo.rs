// src/db/medicine_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::medicine::{CreateMedicinePayload, Medicine, MedicineChanges},
};

const MEDICINE_COLUMNS: &str = r#"
    id, name, brand, batch_number, expiry_date, stock, tablets_per_strip,
    total_tablets_in_stock, buying_price, selling_price, gst_percent,
    rack_location, composition, created_at, updated_at
"#;

#[derive(Clone)]
pub struct MedicineRepository {
    pool: PgPool,
}

impl MedicineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ---
    // Leitura
    // ---

    pub async fn list<'e, E>(&self, executor: E, search: Option<&str>) -> Result<Vec<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {MEDICINE_COLUMNS} FROM medicines
            WHERE $1::TEXT IS NULL
               OR name ILIKE '%' || $1 || '%'
               OR brand ILIKE '%' || $1 || '%'
               OR composition ILIKE '%' || $1 || '%'
            ORDER BY name ASC, expiry_date ASC
            "#
        );
        let medicines = sqlx::query_as::<_, Medicine>(&sql)
            .bind(search)
            .fetch_all(executor)
            .await?;
        Ok(medicines)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE id = $1");
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(medicine)
    }

    /// Procura outro lote com o mesmo par (nome, lote), sem diferenciar maiúsculas.
    pub async fn find_by_name_and_batch<'e, E>(
        &self,
        executor: E,
        name: &str,
        batch_number: &str,
    ) -> Result<Option<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE LOWER(name) = LOWER($1) AND LOWER(batch_number) = LOWER($2)"
        );
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(name)
            .bind(batch_number)
            .fetch_optional(executor)
            .await?;
        Ok(medicine)
    }

    pub async fn low_stock<'e, E>(&self, executor: E, threshold: Decimal) -> Result<Vec<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE stock <= $1 ORDER BY stock ASC, name ASC"
        );
        let medicines = sqlx::query_as::<_, Medicine>(&sql)
            .bind(threshold)
            .fetch_all(executor)
            .await?;
        Ok(medicines)
    }

    /// Lotes vencidos ou vencendo até `until` (inclusive).
    pub async fn expiring_before<'e, E>(&self, executor: E, until: NaiveDate) -> Result<Vec<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE expiry_date <= $1 ORDER BY expiry_date ASC, name ASC"
        );
        let medicines = sqlx::query_as::<_, Medicine>(&sql)
            .bind(until)
            .fetch_all(executor)
            .await?;
        Ok(medicines)
    }

    // ---
    // Escrita
    // ---

    pub async fn create<'e, E>(&self, executor: E, input: &CreateMedicinePayload) -> Result<Medicine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total_tablets = Medicine::total_tablets_for(input.stock, input.tablets_per_strip);
        let sql = format!(
            r#"
            INSERT INTO medicines (
                name, brand, batch_number, expiry_date, stock, tablets_per_strip,
                total_tablets_in_stock, buying_price, selling_price, gst_percent,
                rack_location, composition
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {MEDICINE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Medicine>(&sql)
            .bind(input.name.trim())
            .bind(input.brand.trim())
            .bind(input.batch_number.trim())
            .bind(input.expiry_date)
            .bind(input.stock)
            .bind(input.tablets_per_strip)
            .bind(total_tablets)
            .bind(input.buying_price)
            .bind(input.selling_price)
            .bind(input.gst_percent)
            .bind(input.rack_location.as_deref())
            .bind(input.composition.as_deref())
            .fetch_one(executor)
            .await
            .map_err(|e| duplicate_batch_or(e, &input.name, &input.batch_number))
    }

    /// Estoque só é escrito quando a edição traz `stock`, para não sobrescrever vendas concorrentes.
    pub async fn update<'e, E>(&self, executor: E, id: Uuid, changes: &MedicineChanges) -> Result<Option<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE medicines SET
                name = $2, brand = $3, batch_number = $4, expiry_date = $5,
                stock = COALESCE($6, stock),
                total_tablets_in_stock = COALESCE($6 * tablets_per_strip, total_tablets_in_stock),
                buying_price = $7, selling_price = $8, gst_percent = $9,
                rack_location = $10, composition = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING {MEDICINE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Medicine>(&sql)
            .bind(id)
            .bind(changes.name.trim())
            .bind(changes.brand.trim())
            .bind(changes.batch_number.trim())
            .bind(changes.expiry_date)
            .bind(changes.stock)
            .bind(changes.buying_price)
            .bind(changes.selling_price)
            .bind(changes.gst_percent)
            .bind(changes.rack_location.as_deref())
            .bind(changes.composition.as_deref())
            .fetch_optional(executor)
            .await
            .map_err(|e| duplicate_batch_or(e, &changes.name, &changes.batch_number))
    }

    /// Soma `delta` cartelas ao estoque numa única instrução.
    /// Retorna `None` se o lote não existe ou se o estoque ficaria negativo.
    pub async fn adjust_stock<'e, E>(&self, executor: E, id: Uuid, delta: Decimal) -> Result<Option<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = move_tablets_sql("$2 * tablets_per_strip");
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(id)
            .bind(delta)
            .fetch_optional(executor)
            .await?;
        Ok(medicine)
    }

    /// Mesmo contrato de `adjust_stock`, com o delta em comprimidos (vendas e estornos).
    pub async fn adjust_tablets<'e, E>(&self, executor: E, id: Uuid, tablets: Decimal) -> Result<Option<Medicine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = move_tablets_sql("$2");
        let medicine = sqlx::query_as::<_, Medicine>(&sql)
            .bind(id)
            .bind(tablets)
            .fetch_optional(executor)
            .await?;
        Ok(medicine)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM medicines WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Comprimidos são a contagem exata; cartelas derivam dela
fn move_tablets_sql(tablets: &str) -> String {
    format!(
        r#"
        UPDATE medicines SET
            total_tablets_in_stock = total_tablets_in_stock + {tablets},
            stock = (total_tablets_in_stock + {tablets}) / tablets_per_strip,
            updated_at = NOW()
        WHERE id = $1 AND total_tablets_in_stock + {tablets} >= 0
        RETURNING {MEDICINE_COLUMNS}
        "#
    )
}

// Violação do índice único (nome, lote) vira erro de negócio
fn duplicate_batch_or(e: sqlx::Error, name: &str, batch_number: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::DuplicateBatch {
                name: name.trim().to_string(),
                batch_number: batch_number.trim().to_string(),
            };
        }
    }
    e.into()
}
