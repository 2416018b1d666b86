// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::middleware::auth::AUTH_COOKIE;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::check,

        // --- Inventory ---
        handlers::inventory::list_medicines,
        handlers::inventory::create_medicine,
        handlers::inventory::get_medicine,
        handlers::inventory::update_medicine,
        handlers::inventory::delete_medicine,
        handlers::inventory::adjust_stock,
        handlers::inventory::low_stock,
        handlers::inventory::expiring,

        // --- Billing ---
        handlers::billing::list_bills,
        handlers::billing::create_bill,
        handlers::billing::get_bill,
        handlers::billing::update_bill,
        handlers::documents::invoice_pdf,

        // --- Reports ---
        handlers::reports::sales_report,
        handlers::reports::dashboard_analytics,

        // --- Settings ---
        handlers::settings::get_settings,
        handlers::settings::update_settings,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::LoginPayload,
            models::auth::SessionUser,
            models::auth::LoginResponse,
            models::auth::AuthCheckResponse,

            // --- Inventory ---
            models::medicine::Medicine,
            models::medicine::CreateMedicinePayload,
            models::medicine::UpdateMedicinePayload,
            models::medicine::AdjustStockPayload,
            models::medicine::ExpiryEntry,

            // --- Billing ---
            models::bill::UnitType,
            models::bill::BillItem,
            models::bill::Bill,
            models::bill::CartItem,
            models::bill::CreateBillPayload,
            models::bill::UpdateBillPayload,

            // --- Reports ---
            models::reports::MedicineSales,
            models::reports::DailySales,
            models::reports::SalesReport,
            models::reports::AnalyticsRange,
            models::reports::InventoryStats,
            models::reports::DashboardAnalytics,

            // --- Settings ---
            models::settings::Settings,
            models::settings::UpdateSettingsPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Login do administrador e sessão"),
        (name = "Inventory", description = "Lotes de remédios, ajustes e alertas"),
        (name = "Billing", description = "Vendas, notas e impressão"),
        (name = "Reports", description = "Relatório de vendas e painel"),
        (name = "Settings", description = "Configurações da Loja")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
        // O navegador usa o cookie HttpOnly definido no login
        components.add_security_scheme(
            "session_cookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(AUTH_COOKIE))),
        );
    }
}
