use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::store::models::{BatchUpdate, Field, FieldUpdates, Partition, UserRecord};
use crate::store::repository::UserStore;

/// In-memory store, used by tests and dry runs. Both partitions live behind
/// one lock so a batch submit applies as a unit, like the sqlite transaction.
#[derive(Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<Partition, HashMap<String, UserRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing validation. Test fixture helper.
    pub async fn seed(&self, record: UserRecord) {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(record.partition)
            .or_default()
            .insert(record.id.clone(), record);
    }

    fn apply_field(record: &mut UserRecord, field: Field, value: &Value) {
        match field {
            Field::Name => record.name = value.as_str().map(str::to_string),
            Field::AccessPlan => record.access_plan = value.as_str().map(str::to_string),
            Field::AccessExpiration => {
                record.access_expiration = value.as_str().map(str::to_string)
            }
            Field::HasAccess => record.has_access = value.as_bool().unwrap_or(false),
            Field::UpdatedAt => {
                if let Some(dt) = value.as_str().and_then(parse_dt) {
                    record.updated_at = dt;
                }
            }
            Field::LastAccess => record.last_access = value.as_str().and_then(parse_dt),
        }
    }
}

fn parse_dt(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn read_all(&self, partition: Partition) -> Result<HashMap<String, UserRecord>> {
        let partitions = self.partitions.read().await;
        Ok(partitions.get(&partition).cloned().unwrap_or_default())
    }

    async fn update_fields(
        &self,
        partition: Partition,
        id: &str,
        updates: FieldUpdates,
    ) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        if let Some(record) = partitions.entry(partition).or_default().get_mut(id) {
            for (field, value) in updates.entries() {
                Self::apply_field(record, *field, value);
            }
        }
        Ok(())
    }

    async fn batch_update(&self, updates: BatchUpdate) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        for (path, value) in updates.entries() {
            if let Some(record) = partitions
                .entry(path.partition)
                .or_default()
                .get_mut(&path.id)
            {
                Self::apply_field(record, path.field, value);
            }
        }
        Ok(())
    }

    async fn find_by_email(
        &self,
        partition: Partition,
        email: &str,
    ) -> Result<Option<UserRecord>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(&partition)
            .and_then(|records| records.values().find(|r| r.email == email))
            .cloned())
    }

    async fn insert(&self, partition: Partition, record: &UserRecord) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(partition)
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
