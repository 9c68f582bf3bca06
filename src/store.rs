use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use log::debug;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use time::OffsetDateTime;

use crate::structures::{
    errors::CarbonError,
    model::{OptionModel, TransientModel},
};

/// Short-lived values that disappear on their own.
pub trait TransientStore {
    async fn get_transient<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, CarbonError>;

    async fn set_transient<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CarbonError>;

    async fn delete_transient(&self, name: &str) -> Result<(), CarbonError>;
}

/// Values kept until overwritten or deleted.
pub trait OptionStore {
    async fn get_option<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CarbonError>;

    async fn update_option<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CarbonError>;

    async fn delete_option(&self, name: &str) -> Result<(), CarbonError>;
}

/// Both store kinds behind one handle, which is how the admin service wires them.
pub trait Store: TransientStore + OptionStore + Clone + Send + Sync + 'static {}

impl<S: TransientStore + OptionStore + Clone + Send + Sync + 'static> Store for S {}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, CarbonError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::migrate!().run(&pool).await?;
        Ok(Self { pool })
    }
}

impl TransientStore for PgStore {
    async fn get_transient<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, CarbonError> {
        sqlx::query("DELETE FROM transients WHERE name = $1 AND expires_at <= now()")
            .bind(name)
            .execute(&self.pool)
            .await?;
        let row: Option<TransientModel> =
            sqlx::query_as("SELECT name, value, expires_at FROM transients WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(row) => {
                debug!("transient {} valid until {}", row.name, row.expires_at);
                Ok(Some(serde_json::from_value(row.value)?))
            }
            None => Ok(None),
        }
    }

    async fn set_transient<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CarbonError> {
        let value = serde_json::to_value(value)?;
        sqlx::query(
            "INSERT INTO transients (name, value, expires_at) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
        )
        .bind(name)
        .bind(value)
        .bind(OffsetDateTime::now_utc() + ttl)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_transient(&self, name: &str) -> Result<(), CarbonError> {
        sqlx::query("DELETE FROM transients WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl OptionStore for PgStore {
    async fn get_option<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CarbonError> {
        let row: Option<OptionModel> =
            sqlx::query_as("SELECT name, value FROM options WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(row) => {
                debug!("loaded option {}", row.name);
                Ok(Some(serde_json::from_value(row.value)?))
            }
            None => Ok(None),
        }
    }

    async fn update_option<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CarbonError> {
        let value = serde_json::to_value(value)?;
        sqlx::query(
            "INSERT INTO options (name, value) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_option(&self, name: &str) -> Result<(), CarbonError> {
        sqlx::query("DELETE FROM options WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Process-local store, used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    transients: Arc<Mutex<HashMap<String, (Value, OffsetDateTime)>>>,
    options: Arc<Mutex<HashMap<String, Value>>>,
    #[cfg(test)]
    option_writes: Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl MemoryStore {
    /// Number of `update_option` and `delete_option` calls so far.
    pub fn option_writes(&self) -> usize {
        self.option_writes
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    fn count_option_write(&self) {
        self.option_writes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(not(test))]
impl MemoryStore {
    fn count_option_write(&self) {}
}

impl TransientStore for MemoryStore {
    async fn get_transient<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, CarbonError> {
        let mut transients = self
            .transients
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some((value, expires_at)) = transients.get(name).cloned() else {
            return Ok(None);
        };
        if expires_at <= OffsetDateTime::now_utc() {
            debug!("transient {} expired at {}", name, expires_at);
            transients.remove(name);
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn set_transient<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CarbonError> {
        let value = serde_json::to_value(value)?;
        self.transients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), (value, OffsetDateTime::now_utc() + ttl));
        Ok(())
    }

    async fn delete_transient(&self, name: &str) -> Result<(), CarbonError> {
        self.transients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

impl OptionStore for MemoryStore {
    async fn get_option<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CarbonError> {
        let value = self
            .options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        Ok(value.map(serde_json::from_value).transpose()?)
    }

    async fn update_option<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CarbonError> {
        let value = serde_json::to_value(value)?;
        self.count_option_write();
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
        Ok(())
    }

    async fn delete_option(&self, name: &str) -> Result<(), CarbonError> {
        self.count_option_write();
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn transient_round_trip_and_delete() {
        let store = MemoryStore::default();
        store
            .set_transient("flag", &1, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(store.get_transient::<i32>("flag").await.unwrap(), Some(1));

        store.delete_transient("flag").await.unwrap();
        assert_eq!(store.get_transient::<i32>("flag").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn expired_transient_is_gone() {
        let store = MemoryStore::default();
        store
            .set_transient("flag", &1, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.get_transient::<i32>("flag").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn options_survive_until_deleted() {
        let store = MemoryStore::default();
        assert_eq!(store.get_option::<String>("name").await.unwrap(), None);

        store.update_option("name", &"first").await.unwrap();
        store.update_option("name", &"second").await.unwrap();
        assert_eq!(
            store.get_option::<String>("name").await.unwrap().as_deref(),
            Some("second")
        );

        store.delete_option("name").await.unwrap();
        assert_eq!(store.get_option::<String>("name").await.unwrap(), None);
        assert_eq!(store.option_writes(), 3);
    }

    #[actix_web::test]
    async fn clones_share_state() {
        let store = MemoryStore::default();
        let other = store.clone();
        store.update_option("shared", &true).await.unwrap();
        assert_eq!(other.get_option::<bool>("shared").await.unwrap(), Some(true));
    }
}
