// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, SessionUser},
};

pub const ADMIN_ROLE: &str = "admin";
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    /// Cria o administrador na primeira inicialização (tabela vazia).
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.user_repo.count().await? > 0 {
            return Ok(());
        }

        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;

        let pool = self.user_repo.pool().clone();
        let admin = self
            .user_repo
            .create_user(&pool, email, &hashed_password, ADMIN_ROLE)
            .await?;
        tracing::info!("👤 Admin user {} created", admin.email);
        Ok(())
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<(String, SessionUser), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // bcrypt é pesado: roda fora do executor assíncrono
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            tracing::warn!("Failed login attempt for {}", email);
            return Err(AppError::InvalidCredentials);
        }

        let session = SessionUser {
            email: user.email,
            role: user.role,
        };
        let token = self.create_token(&session)?;
        Ok((token, session))
    }

    /// Só verifica assinatura e expiração; não consulta o banco.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }

    pub fn create_token(&self, user: &SessionUser) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(TOKEN_TTL_HOURS);

        let claims = Claims {
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        // Pool preguiçoso: nenhum teste aqui chega a abrir conexão
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/pharmacy_test")
            .expect("valid url");
        AuthService::new(UserRepository::new(pool), secret.to_string())
    }

    fn admin() -> SessionUser {
        SessionUser {
            email: "admin@pharmacy.test".into(),
            role: ADMIN_ROLE.into(),
        }
    }

    #[tokio::test]
    async fn token_round_trip_carries_email_and_role() {
        let auth = service("secret");
        let token = auth.create_token(&admin()).expect("token");
        let claims = auth.validate_token(&token).expect("valid token");

        assert_eq!(SessionUser::from(&claims), admin());
        assert_eq!(claims.exp - claims.iat, (TOKEN_TTL_HOURS * 3600) as usize);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let token = service("other").create_token(&admin()).expect("token");
        assert!(matches!(service("secret").validate_token(&token), Err(AppError::InvalidToken)));
        assert!(matches!(service("secret").validate_token("garbage"), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = service("secret");
        let long_ago = (Utc::now() - chrono::Duration::hours(48)).timestamp() as usize;
        let claims = Claims {
            email: "admin@pharmacy.test".into(),
            role: ADMIN_ROLE.into(),
            iat: long_ago,
            exp: long_ago + 3600,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).expect("token");

        assert!(matches!(auth.validate_token(&token), Err(AppError::InvalidToken)));
    }
}
