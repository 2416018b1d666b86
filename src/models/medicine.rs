// src/models/medicine.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};
use utoipa::{IntoParams, ToSchema};

use crate::{common::error::AppError, models::bill::UnitType};

// ---
// Validações customizadas
// ---
pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("Value cannot be negative.".into());
        return Err(err);
    }
    Ok(())
}

// Teto das colunas NUMERIC(12, 2): 9_999_999_999.99
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

pub fn validate_price(val: &Decimal) -> Result<(), ValidationError> {
    if (val.is_sign_negative() && !val.is_zero()) || *val > MAX_PRICE {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.add_param("max".into(), &9_999_999_999.99);
        err.message = Some("Price must be between 0 and 9999999999.99.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_percent(val: &Decimal) -> Result<(), ValidationError> {
    if (val.is_sign_negative() && !val.is_zero()) || *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.add_param("max".into(), &100.0);
        err.message = Some("Percentage must be between 0 and 100.".into());
        return Err(err);
    }
    Ok(())
}

// --- Lote de remédio em estoque ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub batch_number: String,
    pub expiry_date: NaiveDate,

    // Estoque em cartelas (pode ser fracionado por vendas de comprimidos)
    pub stock: Decimal,
    pub tablets_per_strip: i32,
    // Vendas e estornos movem comprimidos; stock = total_tablets_in_stock / tablets_per_strip
    pub total_tablets_in_stock: Decimal,

    pub buying_price: Decimal,  // custo por cartela
    pub selling_price: Decimal, // preço por cartela
    pub gst_percent: Decimal,

    pub rack_location: Option<String>,
    pub composition: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medicine {
    pub fn total_tablets_for(stock: Decimal, tablets_per_strip: i32) -> Decimal {
        stock * Decimal::from(tablets_per_strip)
    }

    /// Comprimidos que uma linha de venda retira do estoque (valor exato).
    pub fn tablets_for(&self, unit_type: UnitType, qty: i32) -> Decimal {
        match unit_type {
            UnitType::Strip => Decimal::from(qty) * Decimal::from(self.tablets_per_strip),
            UnitType::Tablet => Decimal::from(qty),
        }
    }

    /// Converte uma quantidade vendida em cartelas equivalentes.
    pub fn strips_for(&self, unit_type: UnitType, qty: i32) -> Decimal {
        match unit_type {
            UnitType::Strip => Decimal::from(qty),
            UnitType::Tablet => Decimal::from(qty) / Decimal::from(self.tablets_per_strip),
        }
    }

    pub fn unit_cost(&self, unit_type: UnitType) -> Decimal {
        match unit_type {
            UnitType::Strip => self.buying_price,
            UnitType::Tablet => self.buying_price / Decimal::from(self.tablets_per_strip),
        }
    }

    pub fn unit_price(&self, unit_type: UnitType) -> Decimal {
        match unit_type {
            UnitType::Strip => self.selling_price,
            UnitType::Tablet => self.selling_price / Decimal::from(self.tablets_per_strip),
        }
    }

    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }
}

// ---
// Payload: entrada de um novo lote
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicinePayload {
    #[validate(length(min = 1, message = "Name is required."))]
    #[schema(example = "Paracetamol 500mg")]
    pub name: String,

    #[validate(length(min = 1, message = "Brand is required."))]
    #[schema(example = "Calpol")]
    pub brand: String,

    #[validate(length(min = 1, message = "Batch number is required."))]
    #[schema(example = "PCM2407")]
    pub batch_number: String,

    #[schema(example = "2026-07-31")]
    pub expiry_date: NaiveDate,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub stock: Decimal,

    #[validate(range(min = 1, message = "Tablets per strip must be at least 1."))]
    #[schema(example = 10)]
    pub tablets_per_strip: i32,

    #[validate(custom(function = "validate_price"))]
    pub buying_price: Decimal,

    #[validate(custom(function = "validate_price"))]
    pub selling_price: Decimal,

    #[validate(custom(function = "validate_percent"))]
    #[serde(default)]
    pub gst_percent: Decimal,

    pub rack_location: Option<String>,
    pub composition: Option<String>,
}

// ---
// Payload: edição parcial
// ---
// Sem `totalTabletsInStock`: o campo é derivado e chaves desconhecidas são ignoradas.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMedicinePayload {
    #[validate(length(min = 1, message = "Name cannot be empty."))]
    pub name: Option<String>,

    #[validate(length(min = 1, message = "Brand cannot be empty."))]
    pub brand: Option<String>,

    #[validate(length(min = 1, message = "Batch number cannot be empty."))]
    pub batch_number: Option<String>,

    pub expiry_date: Option<NaiveDate>,

    #[validate(custom(function = "validate_not_negative"))]
    pub stock: Option<Decimal>,

    pub tablets_per_strip: Option<i32>,

    #[validate(custom(function = "validate_price"))]
    pub buying_price: Option<Decimal>,

    #[validate(custom(function = "validate_price"))]
    pub selling_price: Option<Decimal>,

    #[validate(custom(function = "validate_percent"))]
    pub gst_percent: Option<Decimal>,

    pub rack_location: Option<String>,
    pub composition: Option<String>,
}

/// Estado final de um lote depois de aplicar uma edição.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicineChanges {
    pub name: String,
    pub brand: String,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    // Só presente quando a edição traz `stock`; senão o estoque gravado não é tocado
    pub stock: Option<Decimal>,
    pub buying_price: Decimal,
    pub selling_price: Decimal,
    pub gst_percent: Decimal,
    pub rack_location: Option<String>,
    pub composition: Option<String>,
}

impl UpdateMedicinePayload {
    pub fn apply_to(self, current: &Medicine) -> Result<MedicineChanges, AppError> {
        if let Some(tps) = self.tablets_per_strip {
            if tps != current.tablets_per_strip {
                return Err(AppError::ImmutableField("tabletsPerStrip"));
            }
        }

        Ok(MedicineChanges {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            brand: self.brand.unwrap_or_else(|| current.brand.clone()),
            batch_number: self.batch_number.unwrap_or_else(|| current.batch_number.clone()),
            expiry_date: self.expiry_date.unwrap_or(current.expiry_date),
            stock: self.stock,
            buying_price: self.buying_price.unwrap_or(current.buying_price),
            selling_price: self.selling_price.unwrap_or(current.selling_price),
            gst_percent: self.gst_percent.unwrap_or(current.gst_percent),
            rack_location: self.rack_location.or_else(|| current.rack_location.clone()),
            composition: self.composition.or_else(|| current.composition.clone()),
        })
    }
}

// --- Ajuste manual de estoque (contagem, avaria, devolução) ---
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    // Positivo entra, negativo sai (em cartelas)
    pub delta: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InventoryQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LowStockQuery {
    pub threshold: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiringQuery {
    pub days: Option<i64>,
}

// --- Alerta de validade ---
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryEntry {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub days_to_expiry: i64,
    pub expired: bool,
}

impl ExpiryEntry {
    pub fn new(medicine: Medicine, today: NaiveDate) -> Self {
        let days_to_expiry = medicine.days_to_expiry(today);
        Self {
            medicine,
            days_to_expiry,
            expired: days_to_expiry < 0,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_medicine(name: &str, stock: i64, tablets_per_strip: i32) -> Medicine {
        let now = Utc::now();
        let stock = Decimal::from(stock);
        Medicine {
            id: Uuid::new_v4(),
            name: name.to_string(),
            brand: "Cipla".to_string(),
            batch_number: format!("{}-B1", name.to_uppercase()),
            expiry_date: NaiveDate::from_ymd_opt(2030, 1, 31).expect("valid date"),
            stock,
            tablets_per_strip,
            total_tablets_in_stock: Medicine::total_tablets_for(stock, tablets_per_strip),
            buying_price: Decimal::new(40, 0),
            selling_price: Decimal::new(50, 0),
            gst_percent: Decimal::new(12, 0),
            rack_location: Some("A1".to_string()),
            composition: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tablet_sales_convert_to_fractional_strips() {
        let med = sample_medicine("Paracetamol", 10, 10);
        assert_eq!(med.strips_for(UnitType::Strip, 2), Decimal::from(2));
        assert_eq!(med.strips_for(UnitType::Tablet, 5), Decimal::new(5, 1));
        assert_eq!(med.tablets_for(UnitType::Strip, 2), Decimal::from(20));
        assert_eq!(med.tablets_for(UnitType::Tablet, 5), Decimal::from(5));
        assert_eq!(med.unit_cost(UnitType::Tablet), Decimal::from(4));
        assert_eq!(med.unit_price(UnitType::Tablet), Decimal::from(5));
    }

    #[test]
    fn update_rejects_tablets_per_strip_change() {
        let med = sample_medicine("Paracetamol", 10, 10);
        let patch = UpdateMedicinePayload {
            tablets_per_strip: Some(15),
            stock: Some(Decimal::from(3)),
            ..Default::default()
        };
        assert!(matches!(patch.apply_to(&med), Err(AppError::ImmutableField("tabletsPerStrip"))));
    }

    #[test]
    fn update_with_same_tablets_per_strip_is_allowed() {
        let med = sample_medicine("Paracetamol", 10, 10);
        let patch = UpdateMedicinePayload {
            tablets_per_strip: Some(10),
            ..Default::default()
        };
        let changes = patch.apply_to(&med).expect("same value is not a change");
        assert_eq!(changes.stock, None);
        assert_eq!(changes.name, med.name);
    }

    #[test]
    fn update_carries_only_an_explicit_stock() {
        let med = sample_medicine("Amoxicillin", 10, 6);
        let patch = UpdateMedicinePayload {
            stock: Some(Decimal::new(25, 1)),
            name: Some("Amoxicillin 500".into()),
            ..Default::default()
        };
        let changes = patch.apply_to(&med).expect("valid patch");
        assert_eq!(changes.stock, Some(Decimal::new(25, 1)));
        assert_eq!(changes.name, "Amoxicillin 500");
        assert_eq!(changes.batch_number, med.batch_number);
    }

    #[test]
    fn expiry_entry_flags_expired_lots() {
        let med = sample_medicine("Cetirizine", 1, 10);
        let after = med.expiry_date + chrono::Duration::days(3);
        let entry = ExpiryEntry::new(med, after);
        assert!(entry.expired);
        assert_eq!(entry.days_to_expiry, -3);
    }

    #[test]
    fn percent_validation_bounds() {
        assert!(validate_percent(&Decimal::ZERO).is_ok());
        assert!(validate_percent(&Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_percent(&Decimal::new(1001, 1)).is_err());
        assert!(validate_percent(&Decimal::from(-1)).is_err());
        assert!(validate_not_negative(&Decimal::from(-1)).is_err());
    }

    #[test]
    fn price_validation_follows_the_column_limit() {
        assert_eq!(MAX_PRICE, Decimal::new(999_999_999_999, 2));
        assert!(validate_price(&MAX_PRICE).is_ok());
        assert!(validate_price(&(MAX_PRICE + Decimal::new(1, 2))).is_err());
        assert!(validate_price(&Decimal::MAX).is_err());
        assert!(validate_price(&Decimal::new(-1, 2)).is_err());
    }
}
