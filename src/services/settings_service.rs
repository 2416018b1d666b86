// src/services/settings_service.rs

use crate::{
    common::error::AppError,
    db::SettingsRepository,
    models::settings::{Settings, UpdateSettingsPayload},
};

#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository) -> Self {
        Self { repo }
    }

    pub async fn get(&self) -> Result<Settings, AppError> {
        self.repo.load().await
    }

    pub async fn update(&self, payload: UpdateSettingsPayload) -> Result<Settings, AppError> {
        let mut tx = self.repo.pool().begin().await?;

        // Garante que o documento existe antes do UPDATE
        self.repo.get_or_create(&mut tx).await?;
        let settings = self.repo.update(&mut *tx, &payload).await?;

        tx.commit().await?;
        tracing::info!("⚙️ Shop settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn assert_send<T: Send>(_: &T) {}

    // Handlers do axum exigem futures `Send`
    #[tokio::test]
    async fn service_futures_are_send() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/pharmacy_test")
            .expect("valid url");
        let service = SettingsService::new(SettingsRepository::new(pool));

        let update = service.update(UpdateSettingsPayload::default());
        assert_send(&update);
        let get = service.get();
        assert_send(&get);
    }
}
