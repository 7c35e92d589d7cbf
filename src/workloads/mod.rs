//! Built-in workloads.
//!
//! Each routine performs exactly one invocation worth of work. Timing and
//! repetition belong to the runner.

pub mod cpu;
pub mod db;
pub mod disk;

use crate::workload::{WorkloadId, WorkloadRegistry};

#[cfg(feature = "sqlite")]
pub use db::SqliteExecutor;

/// Register the CPU, disk and database workloads on `registry`.
pub fn register_builtin(registry: &mut WorkloadRegistry) {
    registry
        .register(WorkloadId::Cpu, |_| cpu::run_once())
        .register(WorkloadId::Disk, |_| disk::run_once())
        .register(WorkloadId::Db, db::run_once);
}
