//! Periodic expiry sweeps.

pub mod error;
pub mod scheduler;


pub use crate::cache::SweepReport;
pub use error::{MaintenanceError, MaintenanceResult};
pub use scheduler::MaintenanceScheduler;
