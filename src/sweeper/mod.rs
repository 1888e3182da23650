pub mod engine;
pub mod service;

pub use engine::{Sweeper, UpcomingExpiration};
pub use service::{Schedule, SweepHandle, SweepService};
