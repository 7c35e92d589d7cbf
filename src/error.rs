//! Error taxonomy for the benchmark harness.
//!
//! Every failure is a returned value. Callers decide whether to skip a
//! benchmark, abort the report cycle, or log and continue.

use crate::workload::WorkloadId;

/// Boxed error produced by workloads and query executors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the registry, runner, stats builder and report assembler.
#[derive(Debug, thiserror::Error)]
pub enum MeterError {
    #[error("unknown workload: {0:?}")]
    UnknownWorkload(String),

    #[error("workload fault in {workload}: {source}")]
    WorkloadFault {
        workload: WorkloadId,
        #[source]
        source: BoxError,
    },

    #[error("invalid stats record: {0}")]
    InvalidStatsRecord(String),

    #[error("incomplete or invalid report: {0}")]
    IncompleteReport(String),
}

impl MeterError {
    /// Whether the error happened while a workload was executing.
    ///
    /// Only faults leave side effects behind (files, scratch tables); all
    /// other variants are raised before any work starts.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::WorkloadFault { .. })
    }
}

/// Rejected configuration: plan entries, agent, host key or table prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("expected name:seconds:iterations, got {0:?}")]
    MalformedPlanEntry(String),

    #[error("unknown workload {name:?} in {entry:?}")]
    UnknownWorkload { name: String, entry: String },

    #[error("invalid duration {value:?} in {entry:?}")]
    InvalidDuration { value: String, entry: String },

    #[error("invalid iteration cap {value:?} in {entry:?}")]
    InvalidIterations { value: String, entry: String },

    #[error("agent must be 1..={max} bytes, got {len}")]
    AgentLength { len: usize, max: usize },

    #[error("host key is not set")]
    MissingHostKey,

    #[error("benchmark plan is empty")]
    EmptyPlan,

    #[error("table prefix {0:?} may only contain ASCII letters, digits and '_'")]
    InvalidTablePrefix(String),
}

/// Convenience alias used across the library.
pub type Result<T, E = MeterError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_unknown_workload_with_name() {
        let err = MeterError::UnknownWorkload("bogus".into());
        assert_eq!(err.to_string(), "unknown workload: \"bogus\"");
        assert!(!err.is_fault());
    }

    #[test]
    fn should_name_offending_entry_in_config_errors() {
        let err = ConfigError::InvalidDuration {
            value: "soon".into(),
            entry: "cpu:soon:10".into(),
        };
        assert_eq!(err.to_string(), "invalid duration \"soon\" in \"cpu:soon:10\"");
    }

    #[test]
    fn should_expose_source_when_fault() {
        let err = MeterError::WorkloadFault {
            workload: WorkloadId::Disk,
            source: "disk full".into(),
        };
        assert!(err.is_fault());
        assert!(err.to_string().contains("disk"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk full"));
    }
}
