use chrono::{DateTime, Duration, Utc};

/// A single access plan: human label plus duration in whole days.
/// `days == None` means the plan never expires.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDefinition {
    pub code: &'static str,
    pub name: &'static str,
    pub days: Option<i64>,
}

/// Static table of the plan codes the system sells. Configuration, not
/// runtime data.
#[derive(Debug, Clone)]
pub struct PlanTable {
    plans: Vec<PlanDefinition>,
}

impl Default for PlanTable {
    fn default() -> Self {
        Self {
            plans: vec![
                PlanDefinition { code: "1", name: "1 Dia", days: Some(1) },
                PlanDefinition { code: "3", name: "3 Dias", days: Some(3) },
                PlanDefinition { code: "7", name: "1 Semana", days: Some(7) },
                PlanDefinition { code: "14", name: "2 Semanas", days: Some(14) },
                PlanDefinition { code: "30", name: "1 Mês", days: Some(30) },
                PlanDefinition { code: "permanent", name: "Permanente", days: None },
            ],
        }
    }
}

impl PlanTable {
    pub fn get(&self, code: &str) -> Option<&PlanDefinition> {
        self.plans.iter().find(|p| p.code == code)
    }

    /// Display name for a plan code, falling back to the raw code for
    /// anything not in the table.
    pub fn plan_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.get(code).map(|p| p.name).unwrap_or(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plans.iter().map(|p| p.code)
    }

    /// Compute the expiration timestamp for a plan code.
    ///
    /// Fail-open policy: `permanent`, an empty/absent code, or a code that
    /// does not parse as a positive day count all yield `None` (no expiry)
    /// rather than an error. Malformed plan data must never lock a user out.
    pub fn expiration_for(&self, code: Option<&str>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let code = code?.trim();
        if code.is_empty() || code == "permanent" {
            return None;
        }

        match code.parse::<i64>() {
            // Day counts past chrono's range fall open too: no panic on
            // absurd input, the grant just never expires.
            Ok(days) if days > 0 => Duration::try_days(days)
                .and_then(|span| now.checked_add_signed(span)),
            _ => None,
        }
    }
}

/// Commercial tier a plan code maps to, used for badges and stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTier {
    Free,
    Standard,
    Enterprise,
    Premium,
}

impl PlanTier {
    pub fn label(&self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Standard => "Standard",
            PlanTier::Enterprise => "Enterprise",
            PlanTier::Premium => "Premium",
        }
    }
}

/// Classify a plan code into a tier. Unknown or absent codes degrade to
/// `Free`, never an error.
pub fn tier_for(code: Option<&str>) -> PlanTier {
    match code {
        None => PlanTier::Free,
        Some("permanent") => PlanTier::Premium,
        Some("30") | Some("enterprise") => PlanTier::Enterprise,
        Some("1") | Some("3") | Some("7") | Some("14") | Some("standard") => PlanTier::Standard,
        Some(_) => PlanTier::Free,
    }
}

/// Tier label for a plan code.
pub fn plan_label(code: Option<&str>) -> &'static str {
    tier_for(code).label()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_expiration_for_permanent_and_empty() {
        let table = PlanTable::default();
        let now = Utc::now();

        assert_eq!(table.expiration_for(Some("permanent"), now), None);
        assert_eq!(table.expiration_for(Some(""), now), None);
        assert_eq!(table.expiration_for(None, now), None);
    }

    #[test]
    fn test_expiration_for_seven_days() {
        let table = PlanTable::default();
        let now = Utc::now();

        let expiration = table.expiration_for(Some("7"), now).unwrap();
        let delta = (expiration - now).num_seconds();
        assert!((delta - 7 * 86400).abs() <= 1);
    }

    #[test]
    fn test_expiration_for_fails_open() {
        let table = PlanTable::default();
        let now = Utc::now();

        assert_eq!(table.expiration_for(Some("abc"), now), None);
        assert_eq!(table.expiration_for(Some("0"), now), None);
        assert_eq!(table.expiration_for(Some("-3"), now), None);
    }

    #[test]
    fn test_expiration_for_huge_day_count_does_not_panic() {
        let table = PlanTable::default();
        let now = Utc::now();

        assert_eq!(table.expiration_for(Some("200000000000"), now), None);
        assert_eq!(
            table.expiration_for(Some(&i64::MAX.to_string()), now),
            None
        );
    }

    #[test]
    fn test_plan_names() {
        let table = PlanTable::default();
        assert_eq!(table.plan_name("30"), "1 Mês");
        assert_eq!(table.plan_name("permanent"), "Permanente");
        assert_eq!(table.plan_name("weird"), "weird");
    }

    #[test]
    fn test_tier_classification() {
        assert_eq!(plan_label(Some("30")), "Enterprise");
        assert_eq!(plan_label(Some("permanent")), "Premium");
        assert_eq!(plan_label(Some("7")), "Standard");
        assert_eq!(plan_label(Some("unknown_code")), "Free");
        assert_eq!(plan_label(None), "Free");
    }
}
