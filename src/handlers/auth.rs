// src/handlers/auth.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::{AuthenticatedUser, AUTH_COOKIE},
    models::auth::{AuthCheckResponse, LoginPayload, LoginResponse, SessionUser},
    services::auth::TOKEN_TTL_HOURS,
};

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::hours(TOKEN_TTL_HOURS))
        .build()
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Sessão iniciada (cookie `token`)", body = LoginResponse),
        (status = 401, description = "Email ou senha inválidos")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let (token, user) = app_state
        .auth_service
        .login_user(payload.email.trim(), &payload.password)
        .await?;

    tracing::info!("🔑 {} logged in", user.email);

    let jar = jar.add(session_cookie(token, app_state.cookie_secure));
    Ok((jar, Json(LoginResponse { success: true, user })))
}

// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Cookie de sessão removido")
    )
)]
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));
    (jar, Json(json!({ "success": true })))
}

// GET /api/auth/check (rota protegida pelo guard)
#[utoipa::path(
    get,
    path = "/api/auth/check",
    tag = "Auth",
    responses(
        (status = 200, description = "Sessão válida", body = AuthCheckResponse),
        (status = 401, description = "Sem sessão")
    ),
    security(("api_jwt" = []), ("session_cookie" = []))
)]
pub async fn check(AuthenticatedUser(claims): AuthenticatedUser) -> Json<AuthCheckResponse> {
    Json(AuthCheckResponse {
        authenticated: true,
        user: SessionUser::from(&claims),
    })
}
