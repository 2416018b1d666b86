// src/services/inventory_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{MedicineRepository, SettingsRepository},
    models::{
        medicine::{CreateMedicinePayload, ExpiryEntry, Medicine, MedicineChanges, UpdateMedicinePayload},
        settings::Settings,
    },
};

// ---
// Acesso a dados usado pelo estoque
// ---
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list_medicines(&self, search: Option<&str>) -> Result<Vec<Medicine>, AppError>;
    async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>, AppError>;

    /// Lote com o mesmo par (nome, lote), sem diferenciar maiúsculas.
    async fn find_lot(&self, name: &str, batch_number: &str) -> Result<Option<Medicine>, AppError>;

    async fn insert_medicine(&self, input: &CreateMedicinePayload) -> Result<Medicine, AppError>;
    async fn update_medicine(&self, id: Uuid, changes: &MedicineChanges) -> Result<Option<Medicine>, AppError>;

    /// Soma `delta` cartelas; `None` se o lote não existe ou ficaria negativo.
    async fn adjust_stock(&self, id: Uuid, delta: Decimal) -> Result<Option<Medicine>, AppError>;

    async fn delete_medicine(&self, id: Uuid) -> Result<bool, AppError>;
    async fn low_stock(&self, threshold: Decimal) -> Result<Vec<Medicine>, AppError>;
    async fn expiring_before(&self, until: NaiveDate) -> Result<Vec<Medicine>, AppError>;
    async fn settings(&self) -> Result<Settings, AppError>;
}

// --- Implementação Postgres ---
#[derive(Clone)]
pub struct PgInventoryStore {
    medicine_repo: MedicineRepository,
    settings_repo: SettingsRepository,
}

impl PgInventoryStore {
    pub fn new(medicine_repo: MedicineRepository, settings_repo: SettingsRepository) -> Self {
        Self { medicine_repo, settings_repo }
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn list_medicines(&self, search: Option<&str>) -> Result<Vec<Medicine>, AppError> {
        self.medicine_repo.list(self.medicine_repo.pool(), search).await
    }

    async fn find_medicine(&self, id: Uuid) -> Result<Option<Medicine>, AppError> {
        self.medicine_repo.find_by_id(self.medicine_repo.pool(), id).await
    }

    async fn find_lot(&self, name: &str, batch_number: &str) -> Result<Option<Medicine>, AppError> {
        self.medicine_repo
            .find_by_name_and_batch(self.medicine_repo.pool(), name, batch_number)
            .await
    }

    async fn insert_medicine(&self, input: &CreateMedicinePayload) -> Result<Medicine, AppError> {
        self.medicine_repo.create(self.medicine_repo.pool(), input).await
    }

    async fn update_medicine(&self, id: Uuid, changes: &MedicineChanges) -> Result<Option<Medicine>, AppError> {
        self.medicine_repo.update(self.medicine_repo.pool(), id, changes).await
    }

    async fn adjust_stock(&self, id: Uuid, delta: Decimal) -> Result<Option<Medicine>, AppError> {
        self.medicine_repo.adjust_stock(self.medicine_repo.pool(), id, delta).await
    }

    async fn delete_medicine(&self, id: Uuid) -> Result<bool, AppError> {
        self.medicine_repo.delete(self.medicine_repo.pool(), id).await
    }

    async fn low_stock(&self, threshold: Decimal) -> Result<Vec<Medicine>, AppError> {
        self.medicine_repo.low_stock(self.medicine_repo.pool(), threshold).await
    }

    async fn expiring_before(&self, until: NaiveDate) -> Result<Vec<Medicine>, AppError> {
        self.medicine_repo.expiring_before(self.medicine_repo.pool(), until).await
    }

    async fn settings(&self) -> Result<Settings, AppError> {
        self.settings_repo.load().await
    }
}

// Mesma regra do índice único: compara sem diferenciar maiúsculas
fn same_lot(a_name: &str, a_batch: &str, b_name: &str, b_batch: &str) -> bool {
    a_name.trim().eq_ignore_ascii_case(b_name.trim()) && a_batch.trim().eq_ignore_ascii_case(b_batch.trim())
}

fn duplicate_batch(name: &str, batch_number: &str) -> AppError {
    AppError::DuplicateBatch {
        name: name.trim().to_string(),
        batch_number: batch_number.trim().to_string(),
    }
}

#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Medicine>, AppError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.store.list_medicines(search).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Medicine, AppError> {
        self.store
            .find_medicine(id)
            .await?
            .ok_or(AppError::NotFound("Medicine"))
    }

    // --- CREATE (ENTRADA DE LOTE) ---
    pub async fn create(&self, payload: CreateMedicinePayload) -> Result<Medicine, AppError> {
        // Checagem amigável; o índice único cobre a corrida
        let existing = self
            .store
            .find_lot(payload.name.trim(), payload.batch_number.trim())
            .await?;
        if existing.is_some() {
            return Err(duplicate_batch(&payload.name, &payload.batch_number));
        }

        let medicine = self.store.insert_medicine(&payload).await?;
        tracing::info!("📦 Medicine {} ({}) added with {} strips", medicine.name, medicine.batch_number, medicine.stock);
        Ok(medicine)
    }

    // --- UPDATE ---
    pub async fn update(&self, id: Uuid, payload: UpdateMedicinePayload) -> Result<Medicine, AppError> {
        let current = self.get(id).await?;

        // tabletsPerStrip imutável: falha antes de qualquer escrita
        let changes = payload.apply_to(&current)?;

        if !same_lot(&changes.name, &changes.batch_number, &current.name, &current.batch_number) {
            let clash = self
                .store
                .find_lot(changes.name.trim(), changes.batch_number.trim())
                .await?;
            if clash.is_some_and(|other| other.id != id) {
                return Err(duplicate_batch(&changes.name, &changes.batch_number));
            }
        }

        self.store
            .update_medicine(id, &changes)
            .await?
            .ok_or(AppError::NotFound("Medicine"))
    }

    // --- AJUSTE DE ESTOQUE ---
    pub async fn adjust_stock(&self, id: Uuid, delta: Decimal, reason: Option<&str>) -> Result<Medicine, AppError> {
        if delta.is_zero() {
            return Err(AppError::BadRequest("Stock adjustment cannot be zero.".to_string()));
        }

        match self.store.adjust_stock(id, delta).await? {
            Some(medicine) => {
                tracing::info!(
                    "Stock of {} ({}) adjusted by {} strips: {}",
                    medicine.name,
                    medicine.batch_number,
                    delta,
                    reason.unwrap_or("no reason given")
                );
                Ok(medicine)
            }
            None => {
                // Ou não existe, ou o ajuste deixaria o estoque negativo
                let current = self.get(id).await?;
                Err(AppError::InsufficientStock {
                    name: current.name,
                    batch_number: current.batch_number,
                    available: current.stock.round_dp(4).normalize(),
                    requested: (-delta).normalize(),
                })
            }
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete_medicine(id).await? {
            return Err(AppError::NotFound("Medicine"));
        }
        tracing::info!("🗑️ Medicine {} deleted", id);
        Ok(())
    }

    // --- ALERTAS ---

    pub async fn low_stock(&self, threshold: Option<u32>) -> Result<Vec<Medicine>, AppError> {
        let threshold = match threshold {
            Some(t) => Decimal::from(t),
            None => self.store.settings().await?.low_stock_threshold,
        };
        self.store.low_stock(threshold).await
    }

    pub async fn expiring(&self, days: Option<i64>, today: NaiveDate) -> Result<Vec<ExpiryEntry>, AppError> {
        let days = match days {
            Some(d) if d < 0 => {
                return Err(AppError::BadRequest("days cannot be negative.".to_string()));
            }
            Some(d) => d,
            None => i64::from(self.store.settings().await?.expiry_alert_days),
        };

        let until = TimeDelta::try_days(days)
            .and_then(|window| today.checked_add_signed(window))
            .ok_or_else(|| AppError::BadRequest("days is out of range.".to_string()))?;
        let medicines = self.store.expiring_before(until).await?;

        Ok(medicines
            .into_iter()
            .map(|medicine| ExpiryEntry::new(medicine, today))
            .collect())
    }
}
