use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::access::{Clock, Evaluator, PlanTable};
use crate::error::Result;
use crate::store::models::{BatchUpdate, Field, Partition};
use crate::store::repository::UserStore;

/// A soon-to-expire grant surfaced by the informational scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingExpiration {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub expiration: String,
    pub days_left: i64,
}

/// Converts "is expired" findings into persisted `has_access = false` flags.
///
/// A sweep reads both partitions, stages one `hasAccess`/`updatedAt` pair per
/// lapsed record, and submits everything as a single batched write. The only
/// field it ever touches is the access flag; plan and expiration are left for
/// the edit workflow. Re-running a sweep is harmless.
pub struct Sweeper {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    evaluator: Evaluator,
    dry_run: bool,
}

impl Sweeper {
    pub fn new(store: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        let evaluator = Evaluator::new(clock.clone(), PlanTable::default());
        Self {
            store,
            clock,
            evaluator,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// One full deactivation pass. Returns the number of records staged for
    /// deactivation. Store failures are logged and yield 0; the next
    /// scheduled cycle re-evaluates full current state, so nothing is lost.
    pub async fn sweep(&self) -> usize {
        match self.try_sweep().await {
            Ok(count) => count,
            Err(e) => {
                error!("Erro ao verificar acessos expirados: {}", e);
                0
            }
        }
    }

    async fn try_sweep(&self) -> Result<usize> {
        debug!("Iniciando verificação de acessos expirados");

        let now = self.clock.now().to_rfc3339();
        let mut batch = BatchUpdate::new();
        let mut expired = 0usize;

        for partition in Partition::ALL {
            let users = self.store.read_all(partition).await?;
            for (id, user) in &users {
                // Only records still flagged get staged, so a repeat sweep
                // with no time change deactivates nothing.
                if user.has_access
                    && self.evaluator.is_expired(user.access_expiration.as_deref())
                {
                    batch.stage(partition, id, Field::HasAccess, json!(false));
                    batch.stage(partition, id, Field::UpdatedAt, json!(now.clone()));
                    expired += 1;
                }
            }
        }

        if batch.is_empty() {
            debug!("Nenhum acesso expirado encontrado");
            return Ok(0);
        }

        if self.dry_run {
            info!(
                "DRY RUN: {} acessos expirados seriam desativados",
                expired
            );
            return Ok(expired);
        }

        self.store.batch_update(batch).await?;
        info!(
            "{} acessos expirados foram desativados automaticamente",
            expired
        );
        Ok(expired)
    }

    /// Records in the primary partition with access that lapses within the
    /// horizon. Informational only, no mutation; failures degrade to an
    /// empty list.
    pub async fn upcoming_expirations(&self, horizon_days: i64) -> Vec<UpcomingExpiration> {
        match self.try_upcoming(horizon_days).await {
            Ok(upcoming) => upcoming,
            Err(e) => {
                error!("Erro ao verificar expirações próximas: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_upcoming(&self, horizon_days: i64) -> Result<Vec<UpcomingExpiration>> {
        let now = self.clock.now();
        let horizon = now + chrono::Duration::days(horizon_days);

        let users = self.store.read_all(Partition::Primary).await?;
        let mut upcoming = Vec::new();

        for (id, user) in users {
            if !user.has_access {
                continue;
            }
            let raw = match user.access_expiration.as_deref() {
                Some(raw) => raw,
                None => continue,
            };
            if self.evaluator.is_expired(Some(raw)) {
                continue;
            }
            let exp = match crate::access::status::parse_timestamp(raw) {
                Some(exp) => exp,
                None => continue,
            };
            if exp <= horizon {
                let remaining = (exp - now).num_seconds();
                upcoming.push(UpcomingExpiration {
                    id,
                    name: user.name,
                    email: user.email,
                    expiration: raw.to_string(),
                    days_left: (remaining + 86400 - 1) / 86400,
                });
            }
        }

        Ok(upcoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::FixedClock;
    use crate::store::memory::MemoryStore;
    use crate::store::models::UserRecord;
    use crate::store::repository::MockUserStore;
    use chrono::{DateTime, Duration, Utc};

    fn record(
        id: &str,
        partition: Partition,
        has_access: bool,
        expiration: Option<String>,
    ) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: id.to_string(),
            partition,
            name: Some("Teste".to_string()),
            email: format!("{}@example.com", id),
            access_plan: Some("7".to_string()),
            access_expiration: expiration,
            has_access,
            created_at: now,
            updated_at: now,
            last_access: None,
        }
    }

    fn sweeper_at(store: Arc<dyn UserStore>, now: DateTime<Utc>) -> Sweeper {
        Sweeper::new(store, Arc::new(FixedClock(now)))
    }

    #[tokio::test]
    async fn test_sweep_deactivates_only_expired() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .seed(record(
                "a",
                Partition::Primary,
                true,
                Some((now - Duration::hours(1)).to_rfc3339()),
            ))
            .await;
        store
            .seed(record(
                "b",
                Partition::Primary,
                true,
                Some((now + Duration::hours(1)).to_rfc3339()),
            ))
            .await;

        let sweeper = sweeper_at(store.clone(), now);
        assert_eq!(sweeper.sweep().await, 1);

        let users = store.read_all(Partition::Primary).await.unwrap();
        assert!(!users["a"].has_access);
        assert!(users["b"].has_access);
    }

    #[tokio::test]
    async fn test_sweep_covers_both_partitions() {
        let now = Utc::now();
        let past = Some((now - Duration::days(1)).to_rfc3339());
        let store = Arc::new(MemoryStore::new());
        store
            .seed(record("old", Partition::Legacy, true, past.clone()))
            .await;
        store
            .seed(record("new", Partition::Primary, true, past))
            .await;

        let sweeper = sweeper_at(store.clone(), now);
        assert_eq!(sweeper.sweep().await, 2);
        assert!(!store.read_all(Partition::Legacy).await.unwrap()["old"].has_access);
        assert!(!store.read_all(Partition::Primary).await.unwrap()["new"].has_access);
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .seed(record(
                "a",
                Partition::Primary,
                true,
                Some((now - Duration::hours(2)).to_rfc3339()),
            ))
            .await;

        let sweeper = sweeper_at(store.clone(), now);
        assert_eq!(sweeper.sweep().await, 1);
        // Already flagged off: nothing left to deactivate.
        assert_eq!(sweeper.sweep().await, 0);

        let users = store.read_all(Partition::Primary).await.unwrap();
        assert!(!users["a"].has_access);
    }

    #[tokio::test]
    async fn test_sweep_skips_malformed_expirations() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .seed(record(
                "bad",
                Partition::Primary,
                true,
                Some("garbage-timestamp".to_string()),
            ))
            .await;

        let sweeper = sweeper_at(store.clone(), now);
        assert_eq!(sweeper.sweep().await, 0);
        assert!(store.read_all(Partition::Primary).await.unwrap()["bad"].has_access);
    }

    #[tokio::test]
    async fn test_sweep_returns_zero_on_store_failure() {
        let mut store = MockUserStore::new();
        store.expect_read_all().returning(|_| {
            Err(crate::error::WardenError::Store(
                "connection refused".to_string(),
            ))
        });

        let sweeper = sweeper_at(Arc::new(store), Utc::now());
        assert_eq!(sweeper.sweep().await, 0);
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_writing() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .seed(record(
                "a",
                Partition::Primary,
                true,
                Some((now - Duration::hours(1)).to_rfc3339()),
            ))
            .await;

        let sweeper = sweeper_at(store.clone(), now).with_dry_run(true);
        assert_eq!(sweeper.sweep().await, 1);
        assert!(store.read_all(Partition::Primary).await.unwrap()["a"].has_access);
    }

    #[tokio::test]
    async fn test_upcoming_expirations_horizon() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .seed(record(
                "soon",
                Partition::Primary,
                true,
                Some((now + Duration::days(2)).to_rfc3339()),
            ))
            .await;
        store
            .seed(record(
                "later",
                Partition::Primary,
                true,
                Some((now + Duration::days(10)).to_rfc3339()),
            ))
            .await;
        store
            .seed(record("revoked", Partition::Primary, false, None))
            .await;
        // Legacy partition is not scanned for warnings.
        store
            .seed(record(
                "legacy",
                Partition::Legacy,
                true,
                Some((now + Duration::days(1)).to_rfc3339()),
            ))
            .await;

        let sweeper = sweeper_at(store, now);
        let upcoming = sweeper.upcoming_expirations(3).await;

        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, "soon");
        assert_eq!(upcoming[0].days_left, 2);
    }

    #[tokio::test]
    async fn test_upcoming_excludes_already_expired() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::new());
        store
            .seed(record(
                "gone",
                Partition::Primary,
                true,
                Some((now - Duration::hours(1)).to_rfc3339()),
            ))
            .await;

        let sweeper = sweeper_at(store, now);
        assert!(sweeper.upcoming_expirations(3).await.is_empty());
    }
}
