//! Instance store for stopping-daemon
//!
//! Holds the authoritative instance records the reconciliation loop reads and
//! writes back.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryInstanceStore;
pub use postgres::PostgresInstanceStore;
pub use traits::{InstanceStore, StorageResult};
