// src/models/bill.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;
use utoipa::{IntoParams, ToSchema};

use crate::models::medicine::{validate_percent, validate_price};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Strip,
    Tablet,
}

// --- Linha da nota (snapshot do remédio no momento da venda) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub medicine_id: Uuid,
    pub name: String,
    pub batch_number: String,
    pub unit_type: UnitType,
    pub quantity: i32,
    pub strips_deducted: Decimal,
    pub selling_price: Decimal, // por unidade vendida
    pub cost_price: Decimal,    // por unidade vendida
    pub total: Decimal,         // selling_price * quantity, sem arredondar
}

impl BillItem {
    pub fn cost_total(&self) -> Decimal {
        self.cost_price * Decimal::from(self.quantity)
    }
}

// --- Nota fiscal (imutável, exceto a flag de impressão) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: Uuid,
    pub bill_number: i64,
    pub customer_name: Option<String>,
    #[sqlx(json)]
    pub items: Vec<BillItem>,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub gst_percent: Decimal,
    pub gst_amount: Decimal,
    pub grand_total: Decimal,
    pub is_printed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    pub fn invoice_number(&self) -> String {
        format!("INV-{:06}", self.bill_number)
    }

    pub fn cost_total(&self) -> Decimal {
        self.items.iter().map(BillItem::cost_total).sum()
    }

    /// Lucro bruto: subtotal com desconto menos o custo. GST é repasse, não entra.
    pub fn profit(&self) -> Decimal {
        self.subtotal - self.discount_amount - self.cost_total()
    }
}

/// Nota pronta para ser gravada.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub customer_name: Option<String>,
    pub items: Vec<BillItem>,
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub gst_percent: Decimal,
    pub gst_amount: Decimal,
    pub grand_total: Decimal,
}

// ---
// Payload: carrinho
// ---
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub medicine_id: Uuid,
    pub unit_type: UnitType,

    #[validate(range(min = 1, message = "Quantity must be at least 1."))]
    pub qty: i32,

    // Se ausente, usa o preço de tabela do remédio
    #[validate(custom(function = "validate_price"))]
    pub selling_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillPayload {
    #[validate(length(min = 1, message = "The cart is empty."), nested)]
    pub items: Vec<CartItem>,

    #[validate(custom(function = "validate_percent"))]
    pub discount_percent: Option<Decimal>,

    // Sobrescrevem a configuração da loja
    pub gst_enabled: Option<bool>,
    #[validate(custom(function = "validate_percent"))]
    pub gst_percent: Option<Decimal>,

    pub customer_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillPayload {
    pub is_printed: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart_line(qty: i32, selling_price: Option<Decimal>) -> CartItem {
        CartItem {
            medicine_id: Uuid::new_v4(),
            unit_type: UnitType::Strip,
            qty,
            selling_price,
        }
    }

    fn payload(items: Vec<CartItem>) -> CreateBillPayload {
        CreateBillPayload {
            items,
            discount_percent: None,
            gst_enabled: None,
            gst_percent: None,
            customer_name: None,
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let errors = payload(Vec::new()).validate().expect_err("empty cart");
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn cart_lines_are_validated() {
        assert!(payload(vec![cart_line(1, Some(Decimal::from(50)))]).validate().is_ok());
        assert!(payload(vec![cart_line(0, None)]).validate().is_err());
        assert!(payload(vec![cart_line(2, Some(Decimal::MAX))]).validate().is_err());
        assert!(payload(vec![cart_line(2, Some(Decimal::from(-5)))]).validate().is_err());
    }

    #[test]
    fn cart_line_deserializes_from_camel_case() {
        let line: CartItem = serde_json::from_value(serde_json::json!({
            "medicineId": "6f1c0c6e-2f0e-4c53-9f1e-6d1e2f3a4b5c",
            "unitType": "tablet",
            "qty": 3
        }))
        .expect("valid line");
        assert_eq!(line.unit_type, UnitType::Tablet);
        assert_eq!(line.selling_price, None);
    }
}
