//! Pooled SQLite connection

use crate::config::AppConfig;
use crate::core::error::StoreError;
use di::{Ref, inject, injectable};
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Pool handed to every DI-created connection once installed.
static INSTALLED_POOL: Mutex<Option<SqlitePool>> = Mutex::new(None);

pub struct DatabaseConnection {
    connection: SqlitePool,
}

#[injectable]
impl DatabaseConnection {
    #[inject]
    pub fn create(config: Ref<AppConfig>) -> DatabaseConnection {
        if let Some(pool) = INSTALLED_POOL.lock().ok().and_then(|guard| guard.clone()) {
            return DatabaseConnection { connection: pool };
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_lazy(&config.database_url)
            .expect("DATABASE_URL must be a valid sqlite url");

        DatabaseConnection { connection: pool }
    }
}

impl DatabaseConnection {
    /// Connects to `url` and brings the schema up to date.
    pub async fn open(url: &str) -> Result<SqlitePool, StoreError> {
        let options = if url.contains(":memory:") {
            // every connection to an in-memory database sees a fresh database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = options.connect(url).await?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;
        info!("equipment store ready at {url}");
        Ok(pool)
    }

    /// Makes every DI-created connection share `pool`.
    pub fn install(pool: SqlitePool) {
        if let Ok(mut guard) = INSTALLED_POOL.lock() {
            *guard = Some(pool);
        }
    }

    pub fn uninstall() {
        if let Ok(mut guard) = INSTALLED_POOL.lock() {
            *guard = None;
        }
    }
}

impl Deref for DatabaseConnection {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for DatabaseConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
