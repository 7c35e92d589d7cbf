//! Workload identifiers, parameters and the registry that resolves them.

use crate::error::{BoxError, MeterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Closed set of benchmark workloads understood by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadId {
    Cpu,
    Disk,
    Db,
}

impl WorkloadId {
    /// Every valid workload, in reporting order.
    pub const ALL: [WorkloadId; 3] = [WorkloadId::Cpu, WorkloadId::Disk, WorkloadId::Db];

    /// Wire name of the workload.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadId::Cpu => "cpu",
            WorkloadId::Disk => "disk",
            WorkloadId::Db => "db",
        }
    }

    /// One-line description used by `--list`.
    pub fn description(self) -> &'static str {
        match self {
            WorkloadId::Cpu => "arithmetic, allocation and JSON serialization of 1024 floats",
            WorkloadId::Disk => "1 MiB temp file write, seek and 1 KiB read back",
            WorkloadId::Db => "scratch table create/insert/select/update/delete/drop",
        }
    }

    /// Whether the workload needs [`WorkloadParams::Db`] to run.
    pub fn needs_executor(self) -> bool {
        self == WorkloadId::Db
    }
}

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadId {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(WorkloadId::Cpu),
            "disk" => Ok(WorkloadId::Disk),
            "db" => Ok(WorkloadId::Db),
            other => Err(MeterError::UnknownWorkload(other.to_string())),
        }
    }
}

/// Capability to run SQL against a live connection owned by the caller.
pub trait QueryExecutor {
    /// Execute one statement, consuming any rows it produces.
    fn execute(&mut self, sql: &str) -> std::result::Result<(), BoxError>;
}

/// Parameters for the database workload.
pub struct DbParams<'a> {
    /// Executor borrowed from the caller for the duration of the run.
    pub executor: &'a mut dyn QueryExecutor,
    /// Prepended to the scratch table name.
    pub table_prefix: String,
}

/// Typed parameters handed to each workload invocation.
#[derive(Default)]
pub enum WorkloadParams<'a> {
    #[default]
    None,
    Db(DbParams<'a>),
}

impl<'a> WorkloadParams<'a> {
    /// Database parameters around `executor` with the given table prefix.
    pub fn db(executor: &'a mut dyn QueryExecutor, table_prefix: impl Into<String>) -> Self {
        WorkloadParams::Db(DbParams {
            executor,
            table_prefix: table_prefix.into(),
        })
    }
}

impl fmt::Debug for WorkloadParams<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadParams::None => f.write_str("None"),
            WorkloadParams::Db(p) => f
                .debug_struct("Db")
                .field("table_prefix", &p.table_prefix)
                .finish_non_exhaustive(),
        }
    }
}

/// A single unit of benchmark work.
pub type WorkloadFn =
    Box<dyn Fn(&mut WorkloadParams<'_>) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Maps each [`WorkloadId`] to the routine that performs one invocation.
pub struct WorkloadRegistry {
    entries: HashMap<WorkloadId, WorkloadFn>,
}

impl WorkloadRegistry {
    /// Registry with no workloads. Every lookup fails until one is registered.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the built-in CPU, disk and database workloads.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        crate::workloads::register_builtin(&mut registry);
        registry
    }

    /// Register (or replace) the routine for `id`.
    pub fn register<F>(&mut self, id: WorkloadId, f: F) -> &mut Self
    where
        F: Fn(&mut WorkloadParams<'_>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.entries.insert(id, Box::new(f));
        self
    }

    /// Look up a registered workload.
    pub fn get(&self, id: WorkloadId) -> Result<&WorkloadFn> {
        self.entries
            .get(&id)
            .ok_or_else(|| MeterError::UnknownWorkload(id.as_str().to_string()))
    }

    /// Resolve a workload by wire name. Names outside the closed set are
    /// rejected here, before anything runs.
    pub fn resolve(&self, name: &str) -> Result<(WorkloadId, &WorkloadFn)> {
        let id: WorkloadId = name.parse()?;
        Ok((id, self.get(id)?))
    }

    /// Registered workload ids, in reporting order.
    pub fn ids(&self) -> Vec<WorkloadId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for WorkloadRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for WorkloadRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadRegistry")
            .field("workloads", &self.ids())
            .finish()
    }
}
