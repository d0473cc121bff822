//! Stopping Daemon library
//!
//! This module provides the core components for the stopping daemon:
//! - Reconciliation loop stopping expired and errored instances
//! - Manual control REST API
//! - Instance store backends
//! - Downstream notifications
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod control;
pub mod error;
pub mod notify;
pub mod scheduler;
pub mod server;
pub mod storage;

pub use config::DaemonConfig;
pub use control::ManualControl;
pub use error::{ApiError, DaemonError, NotifyError, StopError, StorageError};
pub use notify::{HttpNotifier, Notifier, RecordingNotifier};
pub use scheduler::{PassReport, Reconciler, Scheduler, StopOutcome};
pub use server::Server;
pub use storage::{InMemoryInstanceStore, InstanceStore, PostgresInstanceStore};
