// src/models/reports.rs

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::common::error::AppError;

// Vendas agregadas de um remédio (agrupado por id, nome/lote do snapshot)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicineSales {
    pub medicine_id: Uuid,
    pub name: String,
    pub batch_number: String,
    pub strips_sold: Decimal,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: Decimal,
    pub bills: i64,
}

// GET /api/sales-report
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_sales: Decimal,
    pub total_bills: i64,
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub total_gst: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub average_bill_value: Decimal,
    pub most_sold: Vec<MedicineSales>,
    pub least_sold: Vec<MedicineSales>,
    pub daily_sales: Vec<DailySales>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AnalyticsRange {
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl AnalyticsRange {
    pub fn days(self) -> i64 {
        match self {
            AnalyticsRange::Day => 1,
            AnalyticsRange::Week => 7,
            AnalyticsRange::Month => 30,
        }
    }

    /// Primeiro dia da janela (a janela inclui hoje).
    pub fn start_from(self, today: NaiveDate) -> NaiveDate {
        today - chrono::Duration::days(self.days() - 1)
    }
}

impl FromStr for AnalyticsRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(AnalyticsRange::Day),
            "7d" => Ok(AnalyticsRange::Week),
            "30d" => Ok(AnalyticsRange::Month),
            other => Err(AppError::BadRequest(format!(
                "Invalid range '{}'. Expected one of 1d, 7d, 30d.",
                other
            ))),
        }
    }
}

#[derive(Debug, serde::Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_medicines: i64,
    pub low_stock_count: i64,
    pub expiring_soon_count: i64,
    pub expired_count: i64,
    pub inventory_value: Decimal,
}

// GET /api/dashboard-analytics
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub range: AnalyticsRange,
    pub total_revenue: Decimal,
    pub total_bills: i64,
    pub total_profit: Decimal,
    pub average_bill_value: Decimal,
    pub top_medicines: Vec<MedicineSales>,
    pub sales_series: Vec<DailySales>,
    pub inventory: InventoryStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_parsing() {
        assert_eq!("1d".parse::<AnalyticsRange>().ok(), Some(AnalyticsRange::Day));
        assert_eq!("30d".parse::<AnalyticsRange>().ok(), Some(AnalyticsRange::Month));
        assert!(matches!("90d".parse::<AnalyticsRange>(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn window_includes_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date");
        assert_eq!(AnalyticsRange::Day.start_from(today), today);
        assert_eq!(
            AnalyticsRange::Week.start_from(today),
            NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date")
        );
    }
}
