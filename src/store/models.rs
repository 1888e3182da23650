use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two storage collections holding user records. Same record shape in
/// both; the split is historical. Partition identity only matters when
/// qualifying writes and when choosing where new records go (always
/// `Primary`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Legacy,
    Primary,
}

impl Partition {
    pub const ALL: [Partition; 2] = [Partition::Legacy, Partition::Primary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Legacy => "legacy",
            Partition::Primary => "primary",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One principal's access grant.
///
/// `access_expiration` is kept in its raw stored form: evaluation parses it
/// leniently, and a malformed value must read as "never expires" instead of
/// failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub partition: Partition,
    pub name: Option<String>,
    pub email: String,
    pub access_plan: Option<String>,
    pub access_expiration: Option<String>,
    pub has_access: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_access: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Whether the record carries a usable display name.
    pub fn has_valid_name(&self) -> bool {
        matches!(&self.name, Some(n) if !n.trim().is_empty() && n != "N/A")
    }

    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(n) if self.has_valid_name() => n,
            _ => "Sem nome",
        }
    }
}

/// Updatable document fields, by their document-store names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    AccessPlan,
    AccessExpiration,
    HasAccess,
    UpdatedAt,
    LastAccess,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::AccessPlan => "accessPlan",
            Field::AccessExpiration => "accessExpiration",
            Field::HasAccess => "hasAccess",
            Field::UpdatedAt => "updatedAt",
            Field::LastAccess => "lastAccess",
        }
    }
}

/// Field-level update for a single record.
#[derive(Debug, Clone, Default)]
pub struct FieldUpdates {
    entries: Vec<(Field, Value)>,
}

impl FieldUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: Field, value: Value) -> Self {
        self.entries.push((field, value));
        self
    }

    pub fn entries(&self) -> &[(Field, Value)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fully-qualified path of one field write: `partition/id/field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub partition: Partition,
    pub id: String,
    pub field: Field,
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.partition, self.id, self.field.as_str())
    }
}

/// Multi-path write assembled across partitions and submitted as one unit.
/// Atomicity is whatever the backing store provides; the point is to minimize
/// the partial-update window.
#[derive(Debug, Clone, Default)]
pub struct BatchUpdate {
    entries: Vec<(FieldPath, Value)>,
}

impl BatchUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, partition: Partition, id: &str, field: Field, value: Value) {
        self.entries.push((
            FieldPath {
                partition,
                id: id.to_string(),
                field,
            },
            value,
        ));
    }

    pub fn entries(&self) -> &[(FieldPath, Value)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_display() {
        let path = FieldPath {
            partition: Partition::Primary,
            id: "user_abc".to_string(),
            field: Field::HasAccess,
        };
        assert_eq!(path.to_string(), "primary/user_abc/hasAccess");
    }

    #[test]
    fn test_display_name_fallback() {
        let now = Utc::now();
        let mut user = UserRecord {
            id: "u1".to_string(),
            partition: Partition::Legacy,
            name: None,
            email: "a@b.com".to_string(),
            access_plan: None,
            access_expiration: None,
            has_access: false,
            created_at: now,
            updated_at: now,
            last_access: None,
        };

        assert_eq!(user.display_name(), "Sem nome");
        user.name = Some("N/A".to_string());
        assert_eq!(user.display_name(), "Sem nome");
        user.name = Some("Maria Silva".to_string());
        assert_eq!(user.display_name(), "Maria Silva");
    }
}
