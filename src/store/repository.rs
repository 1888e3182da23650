use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::Result;
use crate::store::models::{BatchUpdate, FieldUpdates, Partition, UserRecord};

/// What the core requires from the backing document store: read a whole
/// partition, patch fields on one record, and submit a multi-path batch
/// assembled across both partitions in one call.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All records in one partition, keyed by id.
    async fn read_all(&self, partition: Partition) -> Result<HashMap<String, UserRecord>>;

    /// Patch a subset of fields on a single record.
    async fn update_fields(
        &self,
        partition: Partition,
        id: &str,
        updates: FieldUpdates,
    ) -> Result<()>;

    /// Submit staged field writes across partitions together.
    async fn batch_update(&self, updates: BatchUpdate) -> Result<()>;

    /// Lookup by the email uniqueness key within one partition.
    async fn find_by_email(&self, partition: Partition, email: &str)
        -> Result<Option<UserRecord>>;

    /// Insert a new record. New records always target `Partition::Primary`;
    /// the partition argument exists so fixtures can seed the legacy side.
    async fn insert(&self, partition: Partition, record: &UserRecord) -> Result<()>;
}
