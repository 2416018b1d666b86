// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;
use utoipa::ToSchema;

use crate::models::medicine::{validate_not_negative, validate_percent};

// Documento único de configuração da loja
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub shop_name: String,
    pub address: String,
    pub phone: Option<String>,
    pub gst_enabled: bool,
    pub gst_number: Option<String>,
    pub default_gst_percent: Decimal,
    pub invoice_footer: String,
    pub upi_id: Option<String>,
    pub low_stock_threshold: Decimal,
    pub expiry_alert_days: i32,
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    /// Percentual de GST efetivo, considerando a sobrescrita vinda do carrinho.
    pub fn effective_gst_percent(
        &self,
        enabled_override: Option<bool>,
        percent_override: Option<Decimal>,
    ) -> Decimal {
        if enabled_override.unwrap_or(self.gst_enabled) {
            percent_override.unwrap_or(self.default_gst_percent)
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsPayload {
    #[validate(length(min = 1, message = "Shop name cannot be empty."))]
    #[schema(example = "Sai Medical Store")]
    pub shop_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub gst_enabled: Option<bool>,
    pub gst_number: Option<String>,

    #[validate(custom(function = "validate_percent"))]
    pub default_gst_percent: Option<Decimal>,

    pub invoice_footer: Option<String>,
    #[schema(example = "saimedical@okaxis")]
    pub upi_id: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub low_stock_threshold: Option<Decimal>,

    #[validate(range(min = 0, message = "Expiry alert days cannot be negative."))]
    pub expiry_alert_days: Option<i32>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn default_settings() -> Settings {
        Settings {
            shop_name: "My Pharmacy".into(),
            address: String::new(),
            phone: None,
            gst_enabled: false,
            gst_number: None,
            default_gst_percent: Decimal::from(12),
            invoice_footer: "Thank you for your purchase!".into(),
            upi_id: None,
            low_stock_threshold: Decimal::from(10),
            expiry_alert_days: 30,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn gst_follows_settings_unless_overridden() {
        let mut settings = default_settings();
        assert_eq!(settings.effective_gst_percent(None, None), Decimal::ZERO);
        assert_eq!(settings.effective_gst_percent(Some(true), None), Decimal::from(12));
        assert_eq!(
            settings.effective_gst_percent(Some(true), Some(Decimal::from(5))),
            Decimal::from(5)
        );

        settings.gst_enabled = true;
        assert_eq!(settings.effective_gst_percent(None, None), Decimal::from(12));
        assert_eq!(settings.effective_gst_percent(Some(false), Some(Decimal::from(5))), Decimal::ZERO);
    }
}
