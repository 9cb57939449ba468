use super::schema::SQLITE_INIT;
use super::{RecordRef, SharedRecord, SharedRecordStore};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::collections::BTreeMap;
use std::{str::FromStr, time::Duration};
use tracing::info;

/// Shared record store on a SQLite database file reachable by all replicas.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Opens (creating if missing) the database at `database_url` and applies the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let store = Self::from_pool(pool).await?;
        info!(database_url, "shared record store initialized");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        apply_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn fetch(&self, location: &RecordRef) -> Result<Option<(String, i64)>, StoreError> {
        let row = sqlx::query_as::<_, (String, i64)>(
            r#"
        SELECT data, version
        FROM shared_records
        WHERE namespace = ? AND name = ?
        "#,
        )
        .bind(&location.namespace)
        .bind(&location.name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl SharedRecordStore for SqliteRecordStore {
    async fn get_or_create(&self, location: &RecordRef) -> Result<SharedRecord, StoreError> {
        let now = Utc::now();
        sqlx::query(
            r#"
        INSERT INTO shared_records (namespace, name, data, version, created_at, updated_at)
        VALUES (?, ?, '{}', 0, ?, ?)
        ON CONFLICT(namespace, name) DO NOTHING
        "#,
        )
        .bind(&location.namespace)
        .bind(&location.name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let (data, version) = self.fetch(location).await?.ok_or_else(|| StoreError::NotFound {
            namespace: location.namespace.clone(),
            name: location.name.clone(),
        })?;

        Ok(SharedRecord {
            namespace: location.namespace.clone(),
            name: location.name.clone(),
            data: serde_json::from_str::<BTreeMap<String, String>>(&data)?,
            version: version_from_db(version),
        })
    }

    async fn update(&self, record: &SharedRecord) -> Result<SharedRecord, StoreError> {
        let data = serde_json::to_string(&record.data)?;
        let expected = i64::try_from(record.version).unwrap_or(i64::MAX);

        let result = sqlx::query(
            r#"
        UPDATE shared_records
        SET data = ?, version = version + 1, updated_at = ?
        WHERE namespace = ? AND name = ? AND version = ?
        "#,
        )
        .bind(data)
        .bind(Utc::now())
        .bind(&record.namespace)
        .bind(&record.name)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let location = record.location();
            return Err(match self.fetch(&location).await? {
                Some(_) => StoreError::Conflict {
                    namespace: location.namespace,
                    name: location.name,
                    expected: record.version,
                },
                None => StoreError::NotFound {
                    namespace: location.namespace,
                    name: location.name,
                },
            });
        }

        Ok(SharedRecord {
            version: record.version + 1,
            ..record.clone()
        })
    }
}

fn version_from_db(version: i64) -> u64 {
    u64::try_from(version).unwrap_or_default()
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }
    Ok(())
}
