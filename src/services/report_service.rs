// src/services/report_service.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::round2},
    db::{BillRepository, MedicineRepository, SettingsRepository},
    models::{
        bill::Bill,
        medicine::Medicine,
        reports::{
            AnalyticsRange, DailySales, DashboardAnalytics, InventoryStats, MedicineSales, SalesReport,
        },
        settings::Settings,
    },
};

const RANKING_SIZE: usize = 5;

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// [start 00:00, end+1 00:00) em UTC.
pub fn day_bounds(start: NaiveDate, end: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let next_day = end
        .succ_opt()
        .ok_or_else(|| AppError::BadRequest("endDate is out of range.".to_string()))?;
    Ok((start_of_day(start), start_of_day(next_day)))
}

fn average(total: Decimal, count: i64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        round2(total / Decimal::from(count))
    }
}

/// Agrupa as linhas vendidas por remédio (id), somando cartelas e receita.
pub fn aggregate_medicine_sales(bills: &[Bill]) -> Vec<MedicineSales> {
    let mut by_medicine: HashMap<Uuid, MedicineSales> = HashMap::new();

    for item in bills.iter().flat_map(|bill| bill.items.iter()) {
        let entry = by_medicine.entry(item.medicine_id).or_insert_with(|| MedicineSales {
            medicine_id: item.medicine_id,
            name: item.name.clone(),
            batch_number: item.batch_number.clone(),
            strips_sold: Decimal::ZERO,
            revenue: Decimal::ZERO,
        });
        entry.strips_sold += item.strips_deducted;
        entry.revenue += item.total;
    }

    by_medicine.into_values().collect()
}

pub fn most_sold(sales: &[MedicineSales], limit: usize) -> Vec<MedicineSales> {
    let mut ranked = sales.to_vec();
    ranked.sort_by(|a, b| {
        b.strips_sold
            .cmp(&a.strips_sold)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

pub fn least_sold(sales: &[MedicineSales], limit: usize) -> Vec<MedicineSales> {
    let mut ranked = sales.to_vec();
    ranked.sort_by(|a, b| {
        a.strips_sold
            .cmp(&b.strips_sold)
            .then_with(|| a.revenue.cmp(&b.revenue))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

fn daily_totals(bills: &[Bill]) -> BTreeMap<NaiveDate, DailySales> {
    let mut days: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    for bill in bills {
        let date = bill.created_at.date_naive();
        let day = days.entry(date).or_insert(DailySales {
            date,
            total: Decimal::ZERO,
            bills: 0,
        });
        day.total += bill.grand_total;
        day.bills += 1;
    }
    days
}

/// Relatório de vendas de um período, em uma passada por métrica.
pub fn summarize_sales(bills: &[Bill], start_date: NaiveDate, end_date: NaiveDate) -> SalesReport {
    let total_bills = bills.len() as i64;
    let total_sales: Decimal = bills.iter().map(|b| b.grand_total).sum();
    let subtotal: Decimal = bills.iter().map(|b| b.subtotal).sum();
    let total_discount: Decimal = bills.iter().map(|b| b.discount_amount).sum();
    let total_gst: Decimal = bills.iter().map(|b| b.gst_amount).sum();
    let total_cost: Decimal = bills.iter().map(Bill::cost_total).sum();
    let total_profit: Decimal = bills.iter().map(Bill::profit).sum();

    let sales = aggregate_medicine_sales(bills);

    SalesReport {
        start_date,
        end_date,
        total_sales,
        total_bills,
        subtotal: round2(subtotal),
        total_discount,
        total_gst,
        total_cost: round2(total_cost),
        total_profit: round2(total_profit),
        average_bill_value: average(total_sales, total_bills),
        most_sold: most_sold(&sales, RANKING_SIZE),
        least_sold: least_sold(&sales, RANKING_SIZE),
        daily_sales: daily_totals(bills).into_values().collect(),
    }
}

pub fn inventory_stats(medicines: &[Medicine], settings: &Settings, today: NaiveDate) -> InventoryStats {
    let alert_until = today
        .checked_add_signed(TimeDelta::days(i64::from(settings.expiry_alert_days)))
        .unwrap_or(NaiveDate::MAX);

    InventoryStats {
        total_medicines: medicines.len() as i64,
        low_stock_count: medicines
            .iter()
            .filter(|m| m.stock <= settings.low_stock_threshold)
            .count() as i64,
        expiring_soon_count: medicines
            .iter()
            .filter(|m| m.expiry_date >= today && m.expiry_date <= alert_until)
            .count() as i64,
        expired_count: medicines.iter().filter(|m| m.expiry_date < today).count() as i64,
        inventory_value: round2(medicines.iter().map(|m| m.stock * m.buying_price).sum()),
    }
}

/// Painel: `bills` já filtradas para a janela do `range`.
pub fn build_dashboard(
    range: AnalyticsRange,
    today: NaiveDate,
    bills: &[Bill],
    medicines: &[Medicine],
    settings: &Settings,
) -> DashboardAnalytics {
    let total_bills = bills.len() as i64;
    let total_revenue: Decimal = bills.iter().map(|b| b.grand_total).sum();
    let total_profit: Decimal = bills.iter().map(Bill::profit).sum();

    // Um ponto por dia da janela, inclusive os dias sem venda
    let mut days = daily_totals(bills);
    let sales_series = range
        .start_from(today)
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| {
            days.remove(&date).unwrap_or(DailySales {
                date,
                total: Decimal::ZERO,
                bills: 0,
            })
        })
        .collect();

    DashboardAnalytics {
        range,
        total_revenue,
        total_bills,
        total_profit: round2(total_profit),
        average_bill_value: average(total_revenue, total_bills),
        top_medicines: most_sold(&aggregate_medicine_sales(bills), RANKING_SIZE),
        sales_series,
        inventory: inventory_stats(medicines, settings, today),
    }
}

#[derive(Clone)]
pub struct ReportService {
    bill_repo: BillRepository,
    medicine_repo: MedicineRepository,
    settings_repo: SettingsRepository,
}

impl ReportService {
    pub fn new(
        bill_repo: BillRepository,
        medicine_repo: MedicineRepository,
        settings_repo: SettingsRepository,
    ) -> Self {
        Self { bill_repo, medicine_repo, settings_repo }
    }

    pub async fn sales_report(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<SalesReport, AppError> {
        let (Some(start_date), Some(end_date)) = (start_date, end_date) else {
            return Err(AppError::BadRequest("startDate and endDate are required (YYYY-MM-DD).".to_string()));
        };
        if start_date > end_date {
            return Err(AppError::BadRequest("startDate must not be after endDate.".to_string()));
        }

        let (from, to) = day_bounds(start_date, end_date)?;
        let bills = self
            .bill_repo
            .list_between(self.bill_repo.pool(), Some(from), Some(to))
            .await?;

        Ok(summarize_sales(&bills, start_date, end_date))
    }

    pub async fn dashboard(&self, range: AnalyticsRange, today: NaiveDate) -> Result<DashboardAnalytics, AppError> {
        let (from, to) = day_bounds(range.start_from(today), today)?;

        let bills = self
            .bill_repo
            .list_between(self.bill_repo.pool(), Some(from), Some(to))
            .await?;
        let medicines = self.medicine_repo.list(self.medicine_repo.pool(), None).await?;
        let settings = self.settings_repo.load().await?;

        Ok(build_dashboard(range, today, &bills, &medicines, &settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        bill::{BillItem, UnitType},
        medicine::tests::sample_medicine,
        settings::tests::default_settings,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn item(medicine_id: Uuid, name: &str, strips: i64, price: i64, cost: i64) -> BillItem {
        BillItem {
            medicine_id,
            name: name.to_string(),
            batch_number: "B1".to_string(),
            unit_type: UnitType::Strip,
            quantity: strips as i32,
            strips_deducted: Decimal::from(strips),
            selling_price: Decimal::from(price),
            cost_price: Decimal::from(cost),
            total: Decimal::from(strips * price),
        }
    }

    fn bill(on: NaiveDate, items: Vec<BillItem>, discount: Decimal, gst: Decimal) -> Bill {
        let subtotal: Decimal = items.iter().map(|i| i.total).sum();
        let created_at = start_of_day(on) + chrono::Duration::hours(10);
        Bill {
            id: Uuid::new_v4(),
            bill_number: 1,
            customer_name: None,
            items,
            subtotal,
            discount_percent: Decimal::ZERO,
            discount_amount: discount,
            gst_percent: Decimal::ZERO,
            gst_amount: gst,
            grand_total: subtotal - discount + gst,
            is_printed: false,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn day_bounds_cover_the_whole_end_day() {
        let (from, to) = day_bounds(date(2024, 1, 1), date(2024, 1, 31)).expect("bounds");
        assert_eq!(from.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2024-02-01T00:00:00+00:00");
    }

    #[test]
    fn last_calendar_day_has_no_upper_bound() {
        let result = day_bounds(date(2024, 1, 1), NaiveDate::MAX);
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn huge_alert_window_does_not_overflow() {
        let mut settings = default_settings();
        settings.expiry_alert_days = i32::MAX;
        let stats = inventory_stats(&[sample_medicine("Paracetamol", 50, 10)], &settings, date(2024, 3, 10));
        assert_eq!(stats.expiring_soon_count, 1);
    }

    #[test]
    fn sales_report_totals_and_profit() {
        let para = Uuid::new_v4();
        let cetz = Uuid::new_v4();
        let bills = vec![
            bill(date(2024, 1, 1), vec![item(para, "Paracetamol", 2, 50, 40)], Decimal::from(10), Decimal::ZERO),
            bill(
                date(2024, 1, 2),
                vec![item(para, "Paracetamol", 1, 50, 40), item(cetz, "Cetirizine", 3, 20, 10)],
                Decimal::ZERO,
                Decimal::new(1320, 2),
            ),
        ];

        let report = summarize_sales(&bills, date(2024, 1, 1), date(2024, 1, 2));

        assert_eq!(report.total_bills, 2);
        assert_eq!(report.total_sales, Decimal::new(21320, 2)); // 90 + 123.20
        assert_eq!(report.total_discount, Decimal::from(10));
        assert_eq!(report.total_gst, Decimal::new(1320, 2));
        assert_eq!(report.total_cost, Decimal::from(150)); // 80 + 40 + 30
        assert_eq!(report.total_profit, Decimal::from(50)); // (100 - 10 - 80) + (110 - 70)
        assert_eq!(report.average_bill_value, Decimal::new(10660, 2));

        assert_eq!(report.most_sold[0].name, "Paracetamol");
        assert_eq!(report.most_sold[0].strips_sold, Decimal::from(3));
        assert_eq!(report.least_sold[0].name, "Cetirizine");

        assert_eq!(report.daily_sales.len(), 2);
        assert_eq!(report.daily_sales[0].date, date(2024, 1, 1));
        assert_eq!(report.daily_sales[0].total, Decimal::from(90));
    }

    #[test]
    fn same_name_different_lots_stay_separate() {
        let lot_a = Uuid::new_v4();
        let lot_b = Uuid::new_v4();
        let bills = vec![bill(
            date(2024, 1, 1),
            vec![item(lot_a, "Paracetamol", 1, 50, 40), item(lot_b, "Paracetamol", 2, 50, 30)],
            Decimal::ZERO,
            Decimal::ZERO,
        )];

        let sales = aggregate_medicine_sales(&bills);
        assert_eq!(sales.len(), 2);

        let report = summarize_sales(&bills, date(2024, 1, 1), date(2024, 1, 1));
        assert_eq!(report.total_cost, Decimal::from(100));
    }

    #[test]
    fn empty_period_has_zero_average() {
        let report = summarize_sales(&[], date(2024, 1, 1), date(2024, 1, 7));
        assert_eq!(report.total_bills, 0);
        assert_eq!(report.average_bill_value, Decimal::ZERO);
        assert!(report.most_sold.is_empty());
    }

    #[test]
    fn dashboard_series_is_zero_filled() {
        let today = date(2024, 3, 10);
        let med = Uuid::new_v4();
        let bills = vec![
            bill(date(2024, 3, 8), vec![item(med, "Paracetamol", 1, 50, 40)], Decimal::ZERO, Decimal::ZERO),
            bill(today, vec![item(med, "Paracetamol", 2, 50, 40)], Decimal::ZERO, Decimal::ZERO),
        ];

        let dashboard = build_dashboard(AnalyticsRange::Week, today, &bills, &[], &default_settings());

        assert_eq!(dashboard.sales_series.len(), 7);
        assert_eq!(dashboard.sales_series[0].date, date(2024, 3, 4));
        assert_eq!(dashboard.sales_series[4].total, Decimal::from(50));
        assert_eq!(dashboard.sales_series[5].bills, 0);
        assert_eq!(dashboard.sales_series[6].total, Decimal::from(100));
        assert_eq!(dashboard.total_revenue, Decimal::from(150));
        assert_eq!(dashboard.total_profit, Decimal::from(30));
        assert_eq!(dashboard.top_medicines.len(), 1);
    }

    #[test]
    fn inventory_counters() {
        let today = date(2024, 3, 10);
        let mut expired = sample_medicine("Expired", 20, 10);
        expired.expiry_date = date(2024, 3, 1);
        let mut soon = sample_medicine("Soon", 5, 10);
        soon.expiry_date = date(2024, 3, 25);
        let fine = sample_medicine("Fine", 50, 10);

        let stats = inventory_stats(&[expired, soon, fine], &default_settings(), today);

        assert_eq!(stats.total_medicines, 3);
        assert_eq!(stats.low_stock_count, 1);
        assert_eq!(stats.expiring_soon_count, 1);
        assert_eq!(stats.expired_count, 1);
        assert_eq!(stats.inventory_value, Decimal::from(3000)); // 75 cartelas * 40
    }
}
