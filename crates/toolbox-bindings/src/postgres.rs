use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use toolbox_core::error::Error;
use toolbox_core::traits::{BlobStore, CounterStore, KvStore, RowStore};

/// Postgres-backed implementation of the storage capabilities.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new `PgStore` with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail to apply.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Delete KV entries whose TTL has passed. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Database`] if the delete fails.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Database(e.to_string())
}

/// Absolute expiry for a TTL counted from `now`.
fn expires_at(now: DateTime<Utc>, ttl: Option<Duration>) -> Result<Option<DateTime<Utc>>, Error> {
    let Some(ttl) = ttl else {
        return Ok(None);
    };
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|_| Error::InvalidInput(format!("ttl out of range: {}s", ttl.as_secs())))?;
    now.checked_add_signed(ttl)
        .map(Some)
        .ok_or_else(|| Error::InvalidInput("ttl out of range".to_string()))
}

#[async_trait]
impl KvStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        sqlx::query_scalar::<_, String>(
            r"
            SELECT value FROM kv_entries
            WHERE key = $1 AND (expires_at IS NULL OR expires_at > NOW())
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), Error> {
        let expires_at = expires_at(Utc::now(), ttl)?;

        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    expires_at = EXCLUDED.expires_at,
                    updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let purged = self.purge_expired().await?;
        tracing::debug!(
            key,
            ttl_secs = ttl.map(|t| t.as_secs()),
            purged,
            "kv entry written"
        );
        Ok(())
    }
}

#[async_trait]
impl RowStore for PgStore {
    async fn now(&self) -> Result<String, Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT to_char(NOW() AT TIME ZONE 'UTC', 'YYYY-MM-DD HH24:MI:SS')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl BlobStore for PgStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT bytes FROM blobs WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), Error> {
        sqlx::query(
            r"
            INSERT INTO blobs (key, bytes)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE
                SET bytes = EXCLUDED.bytes,
                    updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        tracing::debug!(key, size = bytes.len(), "blob written");
        Ok(())
    }
}

#[async_trait]
impl CounterStore for PgStore {
    async fn get(&self, name: &str) -> Result<i64, Error> {
        let value = sqlx::query_scalar::<_, i64>("SELECT value FROM counters WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(value.unwrap_or(0))
    }

    async fn increment(&self, name: &str) -> Result<i64, Error> {
        sqlx::query_scalar::<_, i64>(
            r"
            INSERT INTO counters (name, value)
            VALUES ($1, 1)
            ON CONFLICT (name) DO UPDATE
                SET value = counters.value + 1
            RETURNING value
            ",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ttl_never_expires() {
        assert_eq!(expires_at(Utc::now(), None).unwrap(), None);
    }

    #[test]
    fn ttl_is_added_to_now() {
        let now = Utc::now();
        let at = expires_at(now, Some(Duration::from_secs(3600)))
            .unwrap()
            .unwrap();
        assert_eq!((at - now).num_seconds(), 3600);
    }

    #[test]
    fn absurd_ttl_is_rejected() {
        let err = expires_at(Utc::now(), Some(Duration::from_secs(u64::MAX))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[sqlx::test(migrations = "../../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn writes_purge_expired_entries(pool: PgPool) {
        sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES ('stale', 'x', NOW() - INTERVAL '1 minute')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let store = PgStore::new(pool.clone());
        KvStore::put(&store, "fresh", "y", Some(Duration::from_secs(60)))
            .await
            .unwrap();

        let keys: Vec<String> = sqlx::query_scalar("SELECT key FROM kv_entries ORDER BY key")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(keys, vec!["fresh".to_string()]);
    }
}
