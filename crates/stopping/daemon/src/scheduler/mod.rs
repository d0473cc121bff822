//! Reconciliation loop and stop protocols
//!
//! The scheduler is responsible for:
//! - Periodically stopping instances past their end date
//! - Healing records whose pod has disappeared
//! - Stopping instances whose pod terminated on its own

mod monitor;
mod reconciler;

pub use monitor::Scheduler;
pub use reconciler::{MarkOutcome, PassReport, Reconciler, StopOutcome};
