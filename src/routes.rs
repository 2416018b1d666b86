// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;
use utoipa::OpenApi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn app_router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route(
            "/check",
            get(handlers::auth::check).layer(axum_middleware::from_fn_with_state(
                app_state.clone(),
                auth_guard,
            )),
        );

    let inventory_routes = Router::new()
        .route(
            "/",
            get(handlers::inventory::list_medicines).post(handlers::inventory::create_medicine),
        )
        .route("/low-stock", get(handlers::inventory::low_stock))
        .route("/expiring", get(handlers::inventory::expiring))
        .route(
            "/{id}",
            get(handlers::inventory::get_medicine)
                .put(handlers::inventory::update_medicine)
                .delete(handlers::inventory::delete_medicine),
        )
        .route("/{id}/adjust-stock", post(handlers::inventory::adjust_stock));

    let billing_routes = Router::new()
        .route(
            "/",
            get(handlers::billing::list_bills).post(handlers::billing::create_bill),
        )
        .route(
            "/{id}",
            get(handlers::billing::get_bill).put(handlers::billing::update_bill),
        )
        .route("/{id}/invoice", get(handlers::documents::invoice_pdf));

    // Tudo que não é /auth passa pelo guard
    let protected_routes = Router::new()
        .nest("/inventory", inventory_routes)
        .nest("/billing", billing_routes)
        .route("/sales-report", get(handlers::reports::sales_report))
        .route("/dashboard-analytics", get(handlers::reports::dashboard_analytics))
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        models::auth::SessionUser,
        services::auth::ADMIN_ROLE,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    // Estado sem banco: as rotas testadas aqui nunca abrem conexão
    fn test_state() -> AppState {
        let config = AppConfig::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/pharmacy_test".to_string()),
            "JWT_SECRET" => Some("test-secret".to_string()),
            _ => None,
        })
        .expect("config");
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("valid url");
        AppState::from_pool(&config, pool)
    }

    fn admin_token(state: &AppState) -> String {
        state
            .auth_service
            .create_token(&SessionUser {
                email: "admin@pharmacy.test".into(),
                role: ADMIN_ROLE.into(),
            })
            .expect("token")
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app_router(test_state());
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_lists_the_routes() {
        let response = app_router(test_state())
            .oneshot(Request::get("/api/docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["paths"]["/api/billing"].is_object());
        assert!(body["paths"]["/api/inventory/{id}/adjust-stock"].is_object());
        assert!(body["components"]["securitySchemes"]["session_cookie"].is_object());
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let app = app_router(test_state());
        let response = app
            .oneshot(Request::get("/api/inventory").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid or missing authentication token.");
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let state = test_state();
        let token = format!("{}x", admin_token(&state));
        let response = app_router(state)
            .oneshot(
                Request::get("/api/settings")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn check_accepts_the_session_cookie() {
        let state = test_state();
        let token = admin_token(&state);
        let response = app_router(state)
            .oneshot(
                Request::get("/api/auth/check")
                    .header(header::COOKIE, format!("token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user"]["email"], "admin@pharmacy.test");
        assert_eq!(body["user"]["role"], "admin");
    }

    #[tokio::test]
    async fn check_without_cookie_is_unauthorized() {
        let response = app_router(test_state())
            .oneshot(Request::get("/api/auth/check").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_the_cookie() {
        let response = app_router(test_state())
            .oneshot(Request::post("/api/auth/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("Max-Age=0"));

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn malformed_login_body_is_a_bad_request() {
        let response = app_router(test_state())
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{\"email\": 42}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    async fn authorized_get(state: AppState, uri: &str) -> axum::response::Response {
        let token = admin_token(&state);
        app_router(state)
            .oneshot(
                Request::get(uri)
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_id_answers_with_the_error_body() {
        for uri in ["/api/inventory/not-a-uuid", "/api/billing/42", "/api/billing/42/invoice"] {
            let response = authorized_get(test_state(), uri).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert!(body_json(response).await["error"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn expiry_window_beyond_the_calendar_is_a_bad_request() {
        let response = authorized_get(test_state(), "/api/inventory/expiring?days=9999999999999").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn sales_report_on_the_last_calendar_day_is_a_bad_request() {
        let response = authorized_get(
            test_state(),
            "/api/sales-report?startDate=2024-01-01&endDate=%2B262142-12-31",
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "endDate is out of range.");
    }

    #[tokio::test]
    async fn invalid_dashboard_range_is_a_bad_request() {
        let state = test_state();
        let token = admin_token(&state);
        let response = app_router(state)
            .oneshot(
                Request::get("/api/dashboard-analytics?range=90d")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
