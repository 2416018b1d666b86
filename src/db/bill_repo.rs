// src/db/bill_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::bill::{Bill, NewBill},
};

const BILL_COLUMNS: &str = r#"
    id, bill_number, customer_name, items, subtotal, discount_percent,
    discount_amount, gst_percent, gst_amount, grand_total, is_printed,
    created_at, updated_at
"#;

#[derive(Clone)]
pub struct BillRepository {
    pool: PgPool,
}

impl BillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create<'e, E>(&self, executor: E, bill: &NewBill) -> Result<Bill, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO bills (
                customer_name, items, subtotal, discount_percent, discount_amount,
                gst_percent, gst_amount, grand_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BILL_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Bill>(&sql)
            .bind(bill.customer_name.as_deref())
            .bind(Json(&bill.items))
            .bind(bill.subtotal)
            .bind(bill.discount_percent)
            .bind(bill.discount_amount)
            .bind(bill.gst_percent)
            .bind(bill.gst_amount)
            .bind(bill.grand_total)
            .fetch_one(executor)
            .await?;
        Ok(created)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Bill>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {BILL_COLUMNS} FROM bills WHERE id = $1");
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(bill)
    }

    /// Notas com `created_at` em [from, to). Sem limites, traz tudo.
    pub async fn list_between<'e, E>(
        &self,
        executor: E,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bill>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {BILL_COLUMNS} FROM bills
            WHERE ($1::TIMESTAMPTZ IS NULL OR created_at >= $1)
              AND ($2::TIMESTAMPTZ IS NULL OR created_at < $2)
            ORDER BY created_at DESC
            "#
        );
        let bills = sqlx::query_as::<_, Bill>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(executor)
            .await?;
        Ok(bills)
    }

    // Única mutação permitida numa nota
    pub async fn set_printed<'e, E>(&self, executor: E, id: Uuid, is_printed: bool) -> Result<Option<Bill>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE bills SET is_printed = $2, updated_at = NOW() WHERE id = $1 RETURNING {BILL_COLUMNS}"
        );
        let bill = sqlx::query_as::<_, Bill>(&sql)
            .bind(id)
            .bind(is_printed)
            .fetch_optional(executor)
            .await?;
        Ok(bill)
    }
}
