use std::sync::Arc;

use crate::{
    auth::jwt::JwtKeys,
    books::repo::BookRepository,
    config::AppConfig,
    db::{self, PgStore},
    users::repo::UserRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub keys: JwtKeys,
    pub users: Arc<dyn UserRepository>,
    pub books: Arc<dyn BookRepository>,
}

impl AppState {
    /// Connects to PostgreSQL, applies migrations and wires the repositories.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = db::connect(&config).await?;
        db::migrate(&pool).await?;
        let store = Arc::new(PgStore::new(pool));
        Ok(Self::from_parts(&config, store.clone(), store))
    }

    pub fn from_parts(
        config: &AppConfig,
        users: Arc<dyn UserRepository>,
        books: Arc<dyn BookRepository>,
    ) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        Self {
            keys,
            users,
            books,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let store = Arc::new(crate::memory::MemoryStore::default());
        Self::from_parts(&AppConfig::for_tests(), store.clone(), store)
    }
}
