use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::access::clock::Clock;
use crate::access::plans::PlanTable;
use crate::store::models::UserRecord;

/// Classification of one access record. Never stored, always recomputed from
/// `(has_access, access_expiration)` against the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStatus {
    Active,
    Expired,
    NoAccess,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::Active => "active",
            AccessStatus::Expired => "expired",
            AccessStatus::NoAccess => "no_access",
        }
    }
}

/// Remaining validity of an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaysRemaining {
    Permanent,
    Expired,
    Days(i64),
}

impl fmt::Display for DaysRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaysRemaining::Permanent => write!(f, "Permanente"),
            DaysRemaining::Expired => write!(f, "Expirado"),
            DaysRemaining::Days(n) => write!(f, "{} dias", n),
        }
    }
}

/// Lenient timestamp parse for raw stored values. Accepts RFC 3339; anything
/// else is `None` so callers fall back to the fail-open default.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Pure access-state evaluator. Stateless apart from the injected clock and
/// plan table, so there is no stored status that can drift from reality.
pub struct Evaluator {
    clock: Arc<dyn Clock>,
    plans: PlanTable,
}

impl Evaluator {
    pub fn new(clock: Arc<dyn Clock>, plans: PlanTable) -> Self {
        Self { clock, plans }
    }

    pub fn plans(&self) -> &PlanTable {
        &self.plans
    }

    /// True iff the stored expiration is present, parseable, and strictly in
    /// the past. An absent or malformed timestamp is treated as not-expired:
    /// bad data must not lock a user out.
    pub fn is_expired(&self, expiration: Option<&str>) -> bool {
        match expiration.and_then(parse_timestamp) {
            Some(exp) => self.clock.now() > exp,
            None => false,
        }
    }

    /// Classify a record. Expiration dominates when present: a record with
    /// `has_access=false` but an expired timestamp is `Expired`, not
    /// `NoAccess`.
    pub fn status(&self, user: &UserRecord) -> AccessStatus {
        let expired = self.is_expired(user.access_expiration.as_deref());

        if user.has_access && !expired {
            AccessStatus::Active
        } else if expired {
            AccessStatus::Expired
        } else {
            AccessStatus::NoAccess
        }
    }

    /// Remaining days until expiration, ceiling-rounded. Absent or malformed
    /// expirations read as permanent.
    pub fn days_remaining(&self, expiration: Option<&str>) -> DaysRemaining {
        let exp = match expiration.and_then(parse_timestamp) {
            Some(exp) => exp,
            None => return DaysRemaining::Permanent,
        };

        let remaining = (exp - self.clock.now()).num_seconds();
        if remaining <= 0 {
            return DaysRemaining::Expired;
        }
        DaysRemaining::Days((remaining + 86400 - 1) / 86400)
    }

    /// Expiration timestamp for a plan code, evaluated at the clock's now.
    pub fn expiration_for(&self, plan_code: Option<&str>) -> Option<DateTime<Utc>> {
        self.plans.expiration_for(plan_code, self.clock.now())
    }

    /// Human status line for tables and reports.
    pub fn status_text(&self, user: &UserRecord) -> String {
        match self.status(user) {
            AccessStatus::Active => {
                if user.access_plan.as_deref() == Some("permanent") {
                    "Ativo - Permanente".to_string()
                } else {
                    format!(
                        "Ativo - {}",
                        self.days_remaining(user.access_expiration.as_deref())
                    )
                }
            }
            AccessStatus::Expired => "Expirado".to_string(),
            AccessStatus::NoAccess => "Sem acesso".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::clock::FixedClock;
    use crate::store::models::Partition;
    use chrono::Duration;

    fn evaluator_at(now: DateTime<Utc>) -> Evaluator {
        Evaluator::new(Arc::new(FixedClock(now)), PlanTable::default())
    }

    fn user(has_access: bool, expiration: Option<String>) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: "user_test".to_string(),
            partition: Partition::Primary,
            name: Some("Teste".to_string()),
            email: "teste@example.com".to_string(),
            access_plan: Some("7".to_string()),
            access_expiration: expiration,
            has_access,
            created_at: now,
            updated_at: now,
            last_access: Some(now),
        }
    }

    #[test]
    fn test_absent_expiration_never_expires() {
        let now = Utc::now();
        let eval = evaluator_at(now);

        assert!(!eval.is_expired(None));
        assert_ne!(eval.status(&user(true, None)), AccessStatus::Expired);
        assert_ne!(eval.status(&user(false, None)), AccessStatus::Expired);
    }

    #[test]
    fn test_malformed_expiration_fails_open() {
        let eval = evaluator_at(Utc::now());

        assert!(!eval.is_expired(Some("not-a-date")));
        assert_eq!(
            eval.days_remaining(Some("not-a-date")),
            DaysRemaining::Permanent
        );
    }

    #[test]
    fn test_active_with_future_expiration() {
        let now = Utc::now();
        let eval = evaluator_at(now);
        let u = user(true, Some((now + Duration::hours(1)).to_rfc3339()));

        assert_eq!(eval.status(&u), AccessStatus::Active);
    }

    #[test]
    fn test_past_expiration_dominates_has_access() {
        let now = Utc::now();
        let eval = evaluator_at(now);
        let past = Some((now - Duration::hours(1)).to_rfc3339());

        assert_eq!(eval.status(&user(true, past.clone())), AccessStatus::Expired);
        assert_eq!(eval.status(&user(false, past)), AccessStatus::Expired);
    }

    #[test]
    fn test_no_access_without_expiration() {
        let eval = evaluator_at(Utc::now());
        assert_eq!(eval.status(&user(false, None)), AccessStatus::NoAccess);
    }

    #[test]
    fn test_days_remaining_ceiling() {
        let now = Utc::now();
        let eval = evaluator_at(now);

        let half_day = Some((now + Duration::hours(12)).to_rfc3339());
        assert_eq!(eval.days_remaining(half_day.as_deref()), DaysRemaining::Days(1));

        let two_days = Some((now + Duration::days(2)).to_rfc3339());
        assert_eq!(eval.days_remaining(two_days.as_deref()), DaysRemaining::Days(2));

        let gone = Some((now - Duration::minutes(5)).to_rfc3339());
        assert_eq!(eval.days_remaining(gone.as_deref()), DaysRemaining::Expired);
    }

    #[test]
    fn test_status_text() {
        let now = Utc::now();
        let eval = evaluator_at(now);

        let mut permanent = user(true, None);
        permanent.access_plan = Some("permanent".to_string());
        assert_eq!(eval.status_text(&permanent), "Ativo - Permanente");

        let expired = user(true, Some((now - Duration::days(1)).to_rfc3339()));
        assert_eq!(eval.status_text(&expired), "Expirado");

        let revoked = user(false, None);
        assert_eq!(eval.status_text(&revoked), "Sem acesso");
    }
}
