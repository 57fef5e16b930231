use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay::CounterStore;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredCounter {
    pub name: String,
    pub value: i64,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);

        // Every connection to an in-memory url opens its own empty database.
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply storage migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn counter(&self, name: &str) -> Result<Option<StoredCounter>> {
        let row = sqlx::query(
            "SELECT name, value, updated_at FROM persisted_counters WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to read counter '{name}'"))?;

        Ok(row.map(|row| StoredCounter {
            name: row.get::<String, _>("name"),
            value: row.get::<i64, _>("value"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        }))
    }

    pub async fn list_counters(&self) -> Result<Vec<StoredCounter>> {
        let rows = sqlx::query("SELECT name, value, updated_at FROM persisted_counters ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("failed to list counters")?;

        Ok(rows
            .into_iter()
            .map(|row| StoredCounter {
                name: row.get::<String, _>("name"),
                value: row.get::<i64, _>("value"),
                updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
            })
            .collect())
    }
}

/// Directory under the user's local data dir that holds launcher state.
pub const DATA_DIR_NAME: &str = "vkb_launcher";

pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|base| base.join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// The counter database inside `data_dir`.
pub fn database_url_in(data_dir: &Path) -> String {
    format!(
        "sqlite://{}",
        data_dir.join("launcher.db").to_string_lossy().replace('\\', "/")
    )
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl CounterStore for Storage {
    async fn load_counter(&self, key: &str) -> Result<Option<i64>> {
        let row = sqlx::query("SELECT value FROM persisted_counters WHERE name = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    async fn allocate_counter(&self, key: &str) -> Result<i64> {
        // One statement, so SQLite's write lock covers the read and the increment.
        let allocated: Option<i64> = sqlx::query_scalar(
            "INSERT INTO persisted_counters (name, value, updated_at) VALUES (?, 1, ?)
             ON CONFLICT(name) DO UPDATE SET
                 value = persisted_counters.value + 1,
                 updated_at = excluded.updated_at
             WHERE persisted_counters.value < ?
             RETURNING value - 1",
        )
        .bind(key)
        .bind(Utc::now())
        .bind(i64::MAX)
        .fetch_optional(&self.pool)
        .await?;
        allocated.ok_or_else(|| anyhow!("counter '{key}' overflowed"))
    }

    async fn raise_counter(&self, key: &str, value: i64) -> Result<i64> {
        let raised: Option<i64> = sqlx::query_scalar(
            "INSERT INTO persisted_counters (name, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at
             WHERE excluded.value >= persisted_counters.value
             RETURNING value",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        match raised {
            Some(value) => Ok(value),
            None => self
                .load_counter(key)
                .await?
                .ok_or_else(|| anyhow!("counter '{key}' vanished while advancing")),
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
