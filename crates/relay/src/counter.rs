use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Key under which notification ids are persisted.
pub const NOTIFICATION_COUNTER_KEY: &str = "NOTIFICATION_KEY";

/// Durable backing for [`PersistedCounter`].
///
/// Both writes must be atomic against the backing store itself, not just
/// against one handle: several handles, or several processes, may share it.
/// Neither may return before the new value is durable.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn load_counter(&self, key: &str) -> Result<Option<i64>>;

    /// Returns the current value (0 if never written) and persists
    /// `current + 1` in one step.
    async fn allocate_counter(&self, key: &str) -> Result<i64>;

    /// Sets the value to `value` unless it is already higher. Returns the
    /// persisted value afterwards.
    async fn raise_counter(&self, key: &str, value: i64) -> Result<i64>;
}

#[async_trait]
impl<S: CounterStore + ?Sized> CounterStore for std::sync::Arc<S> {
    async fn load_counter(&self, key: &str) -> Result<Option<i64>> {
        (**self).load_counter(key).await
    }

    async fn allocate_counter(&self, key: &str) -> Result<i64> {
        (**self).allocate_counter(key).await
    }

    async fn raise_counter(&self, key: &str, value: i64) -> Result<i64> {
        (**self).raise_counter(key, value).await
    }
}

/// Monotonic id source that survives restarts.
///
/// The store makes each allocation atomic; the lock additionally serializes
/// callers sharing this handle.
pub struct PersistedCounter<S: CounterStore> {
    key: String,
    store: S,
    lock: Mutex<()>,
}

impl<S: CounterStore> PersistedCounter<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, NOTIFICATION_COUNTER_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the current value and persists `value + 1`.
    pub async fn next(&self) -> Result<i64> {
        let _guard = self.lock.lock().await;
        let current = self
            .store
            .allocate_counter(&self.key)
            .await
            .with_context(|| format!("failed to allocate from counter '{}'", self.key))?;
        tracing::debug!(key = %self.key, value = current, "allocated counter value");
        Ok(current)
    }

    /// The value the next call to [`next`](Self::next) would return.
    pub async fn peek(&self) -> Result<i64> {
        let _guard = self.lock.lock().await;
        let current = self
            .store
            .load_counter(&self.key)
            .await
            .with_context(|| format!("failed to read counter '{}'", self.key))?;
        Ok(current.unwrap_or(0))
    }

    /// Moves the counter forward to `value`. Refuses to move it back, since
    /// that would hand out ids again.
    pub async fn advance_to(&self, value: i64) -> Result<()> {
        if value < 0 {
            bail!("counter '{}' cannot be set to negative value {value}", self.key);
        }
        let _guard = self.lock.lock().await;
        let persisted = self
            .store
            .raise_counter(&self.key, value)
            .await
            .with_context(|| format!("failed to advance counter '{}'", self.key))?;
        if persisted != value {
            bail!(
                "counter '{}' is already at {persisted}; refusing to move it back to {value}",
                self.key
            );
        }
        tracing::info!(key = %self.key, value, "counter advanced");
        Ok(())
    }
}
