// src/services/billing_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        money::{percent_of, round2},
    },
    db::{BillRepository, MedicineRepository, SettingsRepository},
    models::{
        bill::{Bill, BillItem, CartItem, CreateBillPayload, NewBill},
        medicine::Medicine,
        settings::Settings,
    },
};

// ---
// Acesso a dados usado pelo faturamento
// ---
#[async_trait]
pub trait BillingStore: Send + Sync {
    async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>, AppError>;

    /// Baixa condicional em comprimidos: só debita se houver estoque suficiente.
    /// `None` quando o lote sumiu ou o estoque não cobre a quantidade.
    async fn deduct_tablets(&self, id: Uuid, tablets: Decimal) -> Result<Option<Medicine>, AppError>;

    /// Devolve ao estoque comprimidos debitados anteriormente.
    async fn restore_tablets(&self, id: Uuid, tablets: Decimal) -> Result<(), AppError>;

    async fn settings(&self) -> Result<Settings, AppError>;

    async fn insert_bill(&self, bill: &NewBill) -> Result<Bill, AppError>;
    async fn find_bill(&self, id: Uuid) -> Result<Option<Bill>, AppError>;
    async fn list_bills(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bill>, AppError>;
    async fn set_printed(&self, id: Uuid, is_printed: bool) -> Result<Option<Bill>, AppError>;
}

// --- Implementação Postgres ---
#[derive(Clone)]
pub struct PgBillingStore {
    medicine_repo: MedicineRepository,
    bill_repo: BillRepository,
    settings_repo: SettingsRepository,
}

impl PgBillingStore {
    pub fn new(
        medicine_repo: MedicineRepository,
        bill_repo: BillRepository,
        settings_repo: SettingsRepository,
    ) -> Self {
        Self { medicine_repo, bill_repo, settings_repo }
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>, AppError> {
        self.medicine_repo.find_by_id(self.medicine_repo.pool(), id).await
    }

    async fn deduct_tablets(&self, id: Uuid, tablets: Decimal) -> Result<Option<Medicine>, AppError> {
        self.medicine_repo.adjust_tablets(self.medicine_repo.pool(), id, -tablets).await
    }

    async fn restore_tablets(&self, id: Uuid, tablets: Decimal) -> Result<(), AppError> {
        self.medicine_repo
            .adjust_tablets(self.medicine_repo.pool(), id, tablets)
            .await?
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("medicine {} disappeared before its stock could be restored", id).into())
    }

    async fn settings(&self) -> Result<Settings, AppError> {
        self.settings_repo.load().await
    }

    async fn insert_bill(&self, bill: &NewBill) -> Result<Bill, AppError> {
        self.bill_repo.create(self.bill_repo.pool(), bill).await
    }

    async fn find_bill(&self, id: Uuid) -> Result<Option<Bill>, AppError> {
        self.bill_repo.find_by_id(self.bill_repo.pool(), id).await
    }

    async fn list_bills(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bill>, AppError> {
        self.bill_repo.list_between(self.bill_repo.pool(), from, to).await
    }

    async fn set_printed(&self, id: Uuid, is_printed: bool) -> Result<Option<Bill>, AppError> {
        self.bill_repo.set_printed(self.bill_repo.pool(), id, is_printed).await
    }
}

/// Estoque de um lote antes da baixa feita por esta venda.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSnapshot {
    pub medicine_id: Uuid,
    pub stock: Decimal,
    pub total_tablets_in_stock: Decimal,
    pub tablets: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub gst_amount: Decimal,
    pub grand_total: Decimal,
}

fn amount_too_large() -> AppError {
    AppError::BadRequest("Bill amounts are too large.".to_string())
}

/// Desconto sobre o subtotal, GST sobre o subtotal com desconto.
/// Só desconto, GST e total são arredondados; linhas e subtotal ficam como estão.
pub fn compute_totals(
    items: &[BillItem],
    discount_percent: Decimal,
    gst_percent: Decimal,
) -> Result<BillTotals, AppError> {
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.total))
        .ok_or_else(amount_too_large)?;
    let discount_amount = round2(percent_of(subtotal, discount_percent).ok_or_else(amount_too_large)?);
    let taxable = subtotal.checked_sub(discount_amount).ok_or_else(amount_too_large)?;
    let gst_amount = round2(percent_of(taxable, gst_percent).ok_or_else(amount_too_large)?);
    let grand_total = round2(taxable.checked_add(gst_amount).ok_or_else(amount_too_large)?);

    Ok(BillTotals { subtotal, discount_amount, gst_amount, grand_total })
}

// Cartelas na mensagem de erro, com 4 casas
fn insufficient_stock(medicine: &Medicine, requested: Decimal) -> AppError {
    AppError::InsufficientStock {
        name: medicine.name.clone(),
        batch_number: medicine.batch_number.clone(),
        available: medicine.stock.round_dp(4).normalize(),
        requested: requested.round_dp(4).normalize(),
    }
}

// Nome e lote vêm sempre do cadastro, nunca do cliente
fn bill_item(medicine: &Medicine, line: &CartItem) -> Result<BillItem, AppError> {
    let selling_price = line
        .selling_price
        .unwrap_or_else(|| medicine.unit_price(line.unit_type));
    let total = selling_price
        .checked_mul(Decimal::from(line.qty))
        .ok_or_else(amount_too_large)?;

    Ok(BillItem {
        medicine_id: medicine.id,
        name: medicine.name.clone(),
        batch_number: medicine.batch_number.clone(),
        unit_type: line.unit_type,
        quantity: line.qty,
        strips_deducted: medicine.strips_for(line.unit_type, line.qty),
        selling_price,
        cost_price: medicine.unit_cost(line.unit_type),
        total,
    })
}

#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn BillingStore>,
}

impl BillingService {
    pub fn new(store: Arc<dyn BillingStore>) -> Self {
        Self { store }
    }

    // --- CREATE BILL (VENDA) ---
    pub async fn create_bill(&self, payload: CreateBillPayload) -> Result<Bill, AppError> {
        let mut snapshots: Vec<StockSnapshot> = Vec::with_capacity(payload.items.len());

        match self.try_create_bill(&payload, &mut snapshots).await {
            Ok(bill) => {
                tracing::info!(
                    "🧾 Bill {} created: {} item(s), grand total {}",
                    bill.invoice_number(),
                    bill.items.len(),
                    bill.grand_total
                );
                Ok(bill)
            }
            Err(err) => {
                if !snapshots.is_empty() {
                    tracing::warn!("Billing failed ({}), restoring {} stock deduction(s)", err, snapshots.len());
                    self.rollback(&snapshots).await;
                }
                Err(err)
            }
        }
    }

    async fn try_create_bill(
        &self,
        payload: &CreateBillPayload,
        snapshots: &mut Vec<StockSnapshot>,
    ) -> Result<Bill, AppError> {
        let settings = self.store.settings().await?;
        let mut items = Vec::with_capacity(payload.items.len());

        for line in &payload.items {
            // 1. Carrega o lote
            let medicine = self
                .store
                .find_medicine(line.medicine_id)
                .await?
                .ok_or(AppError::UnknownMedicine(line.medicine_id))?;

            // 2. Linha da nota (valores conferidos antes de mexer no estoque)
            let item = bill_item(&medicine, line)?;

            // 3. Valida o saldo em comprimidos
            let tablets = medicine.tablets_for(line.unit_type, line.qty);
            if medicine.total_tablets_in_stock < tablets {
                return Err(insufficient_stock(&medicine, item.strips_deducted));
            }

            // 4. Baixa atômica (perder a corrida dá o mesmo erro de saldo)
            let updated = self
                .store
                .deduct_tablets(medicine.id, tablets)
                .await?
                .ok_or_else(|| insufficient_stock(&medicine, item.strips_deducted))?;

            snapshots.push(StockSnapshot {
                medicine_id: medicine.id,
                stock: medicine.stock,
                total_tablets_in_stock: medicine.total_tablets_in_stock,
                tablets,
            });
            tracing::debug!("Stock of {} ({}) now {} strips", updated.name, updated.batch_number, updated.stock);

            items.push(item);
        }

        let discount_percent = payload.discount_percent.unwrap_or(Decimal::ZERO);
        let gst_percent = settings.effective_gst_percent(payload.gst_enabled, payload.gst_percent);
        let totals = compute_totals(&items, discount_percent, gst_percent)?;

        let new_bill = NewBill {
            customer_name: payload
                .customer_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            items,
            subtotal: totals.subtotal,
            discount_percent,
            discount_amount: totals.discount_amount,
            gst_percent,
            gst_amount: totals.gst_amount,
            grand_total: totals.grand_total,
        };

        self.store.insert_bill(&new_bill).await
    }

    /// Estorno compensatório: devolve o que foi debitado, do último para o primeiro.
    /// Falhas aqui só são logadas; o estoque pode ficar debitado sem nota.
    async fn rollback(&self, snapshots: &[StockSnapshot]) {
        for snapshot in snapshots.iter().rev() {
            if let Err(e) = self.store.restore_tablets(snapshot.medicine_id, snapshot.tablets).await {
                tracing::error!(
                    "🔥 Failed to restore {} tablets of medicine {} (stock before sale: {} strips): {}",
                    snapshot.tablets,
                    snapshot.medicine_id,
                    snapshot.stock,
                    e
                );
            }
        }
    }

    pub async fn list_bills(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bill>, AppError> {
        self.store.list_bills(from, to).await
    }

    pub async fn get_bill(&self, id: Uuid) -> Result<Bill, AppError> {
        self.store.find_bill(id).await?.ok_or(AppError::NotFound("Bill"))
    }

    pub async fn set_printed(&self, id: Uuid, is_printed: bool) -> Result<Bill, AppError> {
        self.store
            .set_printed(id, is_printed)
            .await?
            .ok_or(AppError::NotFound("Bill"))
    }
}
