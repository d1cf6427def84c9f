use crate::config::{Config, SyncPolicy};
use crate::db::sqlite::UserStorage;
use crate::error::AuthError;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::{error, info, warn};

/// Public reason reported for a degraded startup; details stay in the log.
pub const SYNC_FAILED_REASON: &str = "schema synchronization failed";

/// Outcome of the storage phase, carried into the router state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    Ready,
    /// Synchronization failed and the policy allowed startup to continue.
    Degraded(String),
}

impl SchemaStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaStatus::Ready)
    }
}

#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub policy: SyncPolicy,
    /// Extra attempts after the first failure.
    pub retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            policy: SyncPolicy::default(),
            retries: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(3),
        }
    }
}

impl From<&Config> for StartupOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            policy: cfg.on_sync_failure,
            retries: cfg.sync_retries,
            ..Self::default()
        }
    }
}

/// Storage phase of startup: synchronize the schema, retrying transient
/// failures, then apply the configured failure policy.
///
/// Under `SyncPolicy::Abort` the final error is returned and the caller must
/// not start serving. Under `SyncPolicy::Degrade` the error is logged and
/// `SchemaStatus::Degraded` is returned instead.
pub async fn prepare_storage(
    storage: &UserStorage,
    opts: &StartupOptions,
) -> Result<SchemaStatus, AuthError> {
    let retry_policy = ExponentialBuilder::default()
        .with_min_delay(opts.min_delay)
        .with_max_delay(opts.max_delay)
        .with_max_times(opts.retries)
        .with_jitter();

    let result = (|| async { storage.synchronize().await })
        .retry(retry_policy)
        // a mismatched table will not fix itself
        .when(|e| !matches!(e, AuthError::SchemaConflict { .. }))
        .notify(|e, delay| {
            warn!(error = %e, retry_in = ?delay, "schema synchronization failed; retrying");
        })
        .await;

    match result {
        Ok(()) => {
            info!("Users table has been synced");
            Ok(SchemaStatus::Ready)
        }
        Err(e) => {
            error!(error = %e, "schema synchronization failed");
            match opts.policy {
                SyncPolicy::Abort => Err(e),
                SyncPolicy::Degrade => {
                    warn!("continuing without a verified users table");
                    Ok(SchemaStatus::Degraded(SYNC_FAILED_REASON.to_string()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::connect_lazy;

    fn fast(policy: SyncPolicy) -> StartupOptions {
        StartupOptions {
            policy,
            retries: 1,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn unreachable_storage() -> UserStorage {
        // create_if_missing does not create parent directories
        let pool = connect_lazy("sqlite:///nonexistent-dir/for/auth/tests.db").unwrap();
        UserStorage::new(pool)
    }

    #[tokio::test]
    async fn ready_when_backend_is_available() {
        let storage = UserStorage::new(connect_lazy("sqlite::memory:").unwrap());
        let status = prepare_storage(&storage, &fast(SyncPolicy::Abort))
            .await
            .unwrap();
        assert_eq!(status, SchemaStatus::Ready);
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn degrade_policy_swallows_unreachable_backend() {
        let status = prepare_storage(&unreachable_storage(), &fast(SyncPolicy::Degrade))
            .await
            .unwrap();
        assert_eq!(status, SchemaStatus::Degraded(SYNC_FAILED_REASON.to_string()));
    }

    #[tokio::test]
    async fn abort_policy_surfaces_unreachable_backend() {
        let err = prepare_storage(&unreachable_storage(), &fast(SyncPolicy::Abort))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn unconstrained_existing_table_is_not_ready() {
        let storage = UserStorage::new(connect_lazy("sqlite::memory:").unwrap());
        sqlx::query(
            "CREATE TABLE Users (
                id INTEGER PRIMARY KEY,
                username TEXT,
                password TEXT,
                createdAt TEXT,
                updatedAt TEXT
            )",
        )
        .execute(storage.pool())
        .await
        .unwrap();

        let status = prepare_storage(&storage, &fast(SyncPolicy::Degrade))
            .await
            .unwrap();
        assert!(!status.is_ready());

        let err = prepare_storage(&storage, &fast(SyncPolicy::Abort))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SchemaConflict { .. }));
    }

    #[test]
    fn options_follow_config() {
        let cfg = Config {
            on_sync_failure: SyncPolicy::Abort,
            sync_retries: 7,
            ..Config::default()
        };
        let opts = StartupOptions::from(&cfg);
        assert_eq!(opts.policy, SyncPolicy::Abort);
        assert_eq!(opts.retries, 7);
    }
}
