use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::{AccessStatus, Clock, Evaluator, PlanTable};
use crate::error::{Result, WardenError};
use crate::store::models::{Field, FieldUpdates, Partition, UserRecord};
use crate::store::repository::UserStore;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email.trim())
}

/// Input for creating a new access record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub plan: String,
}

/// Aggregate counts over all records, recomputed from raw fields on demand.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub no_access: usize,
    pub premium: usize,
}

/// User-record directory spanning both partitions. New records always land in
/// the primary partition; the legacy one is read and written in place only.
pub struct Directory {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    evaluator: Evaluator,
}

impl Directory {
    pub fn new(store: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        let evaluator = Evaluator::new(clock.clone(), PlanTable::default());
        Self {
            store,
            clock,
            evaluator,
        }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// All records across both partitions. The partitions are disjoint, so
    /// they are read concurrently and in no particular order.
    pub async fn list_all(&self) -> Result<Vec<UserRecord>> {
        let (legacy, primary) = futures::try_join!(
            self.store.read_all(Partition::Legacy),
            self.store.read_all(Partition::Primary),
        )?;

        let mut users: Vec<UserRecord> = legacy.into_values().collect();
        users.extend(primary.into_values());
        debug!("{} usuários carregados", users.len());
        Ok(users)
    }

    /// First match for an email across both partitions.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.trim().to_lowercase();
        let (legacy, primary) = futures::try_join!(
            self.store.find_by_email(Partition::Legacy, &email),
            self.store.find_by_email(Partition::Primary, &email),
        )?;

        Ok(legacy.or(primary))
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    /// Create a record in the primary partition with access granted and an
    /// expiration computed from the plan.
    pub async fn create_user(&self, input: NewUser) -> Result<UserRecord> {
        let email = input.email.trim().to_lowercase();
        let name = input.name.trim().to_string();

        if !is_valid_email(&email) {
            return Err(WardenError::Validation("Email inválido".to_string()));
        }
        if name.is_empty() {
            return Err(WardenError::Validation("Nome é obrigatório".to_string()));
        }
        if self.evaluator.plans().get(&input.plan).is_none() {
            let known: Vec<&str> = self.evaluator.plans().codes().collect();
            return Err(WardenError::Validation(format!(
                "Plano desconhecido: {} (válidos: {})",
                input.plan,
                known.join(", ")
            )));
        }
        if self.email_taken(&email).await? {
            return Err(WardenError::Validation(
                "Já existe um usuário com este email".to_string(),
            ));
        }

        let now = self.clock.now();
        let record = UserRecord {
            id: format!("user_{}", Uuid::new_v4().simple()),
            partition: Partition::Primary,
            name: Some(name),
            email,
            access_expiration: self
                .evaluator
                .expiration_for(Some(&input.plan))
                .map(|dt| dt.to_rfc3339()),
            access_plan: Some(input.plan),
            has_access: true,
            created_at: now,
            updated_at: now,
            last_access: Some(now),
        };

        self.store.insert(Partition::Primary, &record).await?;
        info!("Usuário {} criado em {}", record.id, record.partition);
        Ok(record)
    }

    /// Point a record at a new plan: recompute expiration and reset the
    /// access flag together, so a pushed-out expiration can't coexist with a
    /// stale `has_access = false`.
    pub async fn grant_plan(&self, user: &UserRecord, plan: &str) -> Result<()> {
        if self.evaluator.plans().get(plan).is_none() {
            let known: Vec<&str> = self.evaluator.plans().codes().collect();
            return Err(WardenError::Validation(format!(
                "Plano desconhecido: {} (válidos: {})",
                plan,
                known.join(", ")
            )));
        }

        let now = self.clock.now().to_rfc3339();
        let expiration = self
            .evaluator
            .expiration_for(Some(plan))
            .map(|dt| json!(dt.to_rfc3339()))
            .unwrap_or(Value::Null);

        let updates = FieldUpdates::new()
            .set(Field::AccessPlan, json!(plan))
            .set(Field::AccessExpiration, expiration)
            .set(Field::HasAccess, json!(true))
            .set(Field::UpdatedAt, json!(now.clone()))
            .set(Field::LastAccess, json!(now));

        self.store
            .update_fields(user.partition, &user.id, updates)
            .await?;
        info!("Acesso de {} atualizado para o plano {}", user.email, plan);
        Ok(())
    }

    /// Null out plan and expiration and drop the access flag.
    pub async fn revoke_access(&self, user: &UserRecord) -> Result<()> {
        let updates = FieldUpdates::new()
            .set(Field::AccessPlan, Value::Null)
            .set(Field::AccessExpiration, Value::Null)
            .set(Field::HasAccess, json!(false))
            .set(Field::UpdatedAt, json!(self.clock.now().to_rfc3339()));

        self.store
            .update_fields(user.partition, &user.id, updates)
            .await?;
        info!("Acesso de {} removido", user.email);
        Ok(())
    }

    pub async fn rename(&self, user: &UserRecord, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WardenError::Validation(
                "Digite um nome válido".to_string(),
            ));
        }

        let updates = FieldUpdates::new()
            .set(Field::Name, json!(name))
            .set(Field::UpdatedAt, json!(self.clock.now().to_rfc3339()));

        self.store
            .update_fields(user.partition, &user.id, updates)
            .await
    }

    /// Status counts over the whole directory. Premium means an active
    /// record on the permanent or 30-day plan.
    pub async fn stats(&self) -> Result<DirectoryStats> {
        let users = self.list_all().await?;
        let mut stats = DirectoryStats {
            total: users.len(),
            ..Default::default()
        };

        for user in &users {
            match self.evaluator.status(user) {
                AccessStatus::Active => {
                    stats.active += 1;
                    if matches!(user.access_plan.as_deref(), Some("permanent") | Some("30")) {
                        stats.premium += 1;
                    }
                }
                AccessStatus::Expired => stats.expired += 1,
                AccessStatus::NoAccess => stats.no_access += 1,
            }
        }

        Ok(stats)
    }
}
