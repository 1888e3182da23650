pub mod clock;
pub mod plans;
pub mod status;

pub use clock::{Clock, FixedClock, SystemClock};
pub use plans::{plan_label, tier_for, PlanDefinition, PlanTable, PlanTier};
pub use status::{parse_timestamp, AccessStatus, DaysRemaining, Evaluator};
