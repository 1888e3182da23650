use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::store::models::{BatchUpdate, Field, FieldUpdates, Partition, UserRecord};
use crate::store::repository::UserStore;

/// Local store backing the admin console. One table holds both partitions;
/// the partition tag is just a column, mirroring the two-collection layout of
/// the upstream document store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                origin TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT,
                email TEXT NOT NULL,
                access_plan TEXT,
                access_expiration TEXT,
                has_access INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_access TEXT,
                PRIMARY KEY (origin, id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)",
            [],
        )?;

        Ok(())
    }

    fn column_for(field: Field) -> &'static str {
        match field {
            Field::Name => "name",
            Field::AccessPlan => "access_plan",
            Field::AccessExpiration => "access_expiration",
            Field::HasAccess => "has_access",
            Field::UpdatedAt => "updated_at",
            Field::LastAccess => "last_access",
        }
    }

    fn to_sql(value: &Value) -> rusqlite::types::Value {
        match value {
            Value::Null => rusqlite::types::Value::Null,
            Value::Bool(b) => rusqlite::types::Value::Integer(*b as i64),
            Value::Number(n) if n.is_i64() => {
                rusqlite::types::Value::Integer(n.as_i64().unwrap_or_default())
            }
            Value::String(s) => rusqlite::types::Value::Text(s.clone()),
            other => rusqlite::types::Value::Text(other.to_string()),
        }
    }

    fn row_to_record(row: &rusqlite::Row<'_>, partition: Partition) -> rusqlite::Result<UserRecord> {
        Ok(UserRecord {
            partition,
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            access_plan: row.get(3)?,
            access_expiration: row.get(4)?,
            has_access: row.get::<_, i64>(5)? != 0,
            created_at: parse_dt(6, row.get(6)?)?,
            updated_at: parse_dt(7, row.get(7)?)?,
            last_access: row
                .get::<_, Option<String>>(8)?
                .map(|s| parse_dt(8, s))
                .transpose()?,
        })
    }
}

fn parse_dt(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

const RECORD_COLUMNS: &str =
    "id, name, email, access_plan, access_expiration, has_access, created_at, updated_at, last_access";

#[async_trait]
impl UserStore for SqliteStore {
    async fn read_all(&self, partition: Partition) -> Result<HashMap<String, UserRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE origin = ?1",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map([partition.as_str()], |row| Self::row_to_record(row, partition))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records.into_iter().map(|r| (r.id.clone(), r)).collect())
    }

    async fn update_fields(
        &self,
        partition: Partition,
        id: &str,
        updates: FieldUpdates,
    ) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let conn = self.conn.lock().await;
        for (field, value) in updates.entries() {
            conn.execute(
                &format!(
                    "UPDATE users SET {} = ?1 WHERE origin = ?2 AND id = ?3",
                    Self::column_for(*field)
                ),
                params![Self::to_sql(value), partition.as_str(), id],
            )?;
        }
        Ok(())
    }

    async fn batch_update(&self, updates: BatchUpdate) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for (path, value) in updates.entries() {
            tx.execute(
                &format!(
                    "UPDATE users SET {} = ?1 WHERE origin = ?2 AND id = ?3",
                    Self::column_for(path.field)
                ),
                params![Self::to_sql(value), path.partition.as_str(), path.id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn find_by_email(
        &self,
        partition: Partition,
        email: &str,
    ) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE origin = ?1 AND email = ?2",
            RECORD_COLUMNS
        ))?;

        let mut rows = stmt.query_map(params![partition.as_str(), email], |row| {
            Self::row_to_record(row, partition)
        })?;

        Ok(rows.next().transpose()?)
    }

    async fn insert(&self, partition: Partition, record: &UserRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO users
             (origin, id, name, email, access_plan, access_expiration,
              has_access, created_at, updated_at, last_access)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                partition.as_str(),
                record.id,
                record.name,
                record.email,
                record.access_plan,
                record.access_expiration,
                record.has_access as i64,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
                record.last_access.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, partition: Partition, email: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: id.to_string(),
            partition,
            name: Some("Teste".to_string()),
            email: email.to_string(),
            access_plan: Some("7".to_string()),
            access_expiration: Some((now + chrono::Duration::days(7)).to_rfc3339()),
            has_access: true,
            created_at: now,
            updated_at: now,
            last_access: None,
        }
    }

    fn open_temp() -> (tempfile::NamedTempFile, SqliteStore) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let store = SqliteStore::new(file.path().to_str().unwrap()).unwrap();
        (file, store)
    }

    #[tokio::test]
    async fn test_insert_and_read_all_by_partition() {
        let (_file, store) = open_temp();

        store
            .insert(Partition::Primary, &record("u1", Partition::Primary, "a@b.com"))
            .await
            .unwrap();
        store
            .insert(Partition::Legacy, &record("u2", Partition::Legacy, "c@d.com"))
            .await
            .unwrap();

        let primary = store.read_all(Partition::Primary).await.unwrap();
        assert_eq!(primary.len(), 1);
        assert!(primary.contains_key("u1"));

        let legacy = store.read_all(Partition::Legacy).await.unwrap();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy["u2"].email, "c@d.com");
    }

    #[tokio::test]
    async fn test_find_by_email() {
        let (_file, store) = open_temp();
        store
            .insert(Partition::Primary, &record("u1", Partition::Primary, "a@b.com"))
            .await
            .unwrap();

        let found = store
            .find_by_email(Partition::Primary, "a@b.com")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "u1");

        let missing = store
            .find_by_email(Partition::Legacy, "a@b.com")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_fields() {
        let (_file, store) = open_temp();
        store
            .insert(Partition::Primary, &record("u1", Partition::Primary, "a@b.com"))
            .await
            .unwrap();

        let updates = FieldUpdates::new()
            .set(Field::HasAccess, json!(false))
            .set(Field::AccessPlan, Value::Null);
        store
            .update_fields(Partition::Primary, "u1", updates)
            .await
            .unwrap();

        let all = store.read_all(Partition::Primary).await.unwrap();
        assert!(!all["u1"].has_access);
        assert!(all["u1"].access_plan.is_none());
    }

    #[tokio::test]
    async fn test_batch_update_spans_partitions() {
        let (_file, store) = open_temp();
        store
            .insert(Partition::Primary, &record("u1", Partition::Primary, "a@b.com"))
            .await
            .unwrap();
        store
            .insert(Partition::Legacy, &record("u2", Partition::Legacy, "c@d.com"))
            .await
            .unwrap();

        let mut batch = BatchUpdate::new();
        batch.stage(Partition::Primary, "u1", Field::HasAccess, json!(false));
        batch.stage(Partition::Legacy, "u2", Field::HasAccess, json!(false));
        store.batch_update(batch).await.unwrap();

        assert!(!store.read_all(Partition::Primary).await.unwrap()["u1"].has_access);
        assert!(!store.read_all(Partition::Legacy).await.unwrap()["u2"].has_access);
    }
}
