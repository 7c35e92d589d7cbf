//! The bounded benchmark runner.

use crate::error::{ConfigError, MeterError, Result};
use crate::progress::Reporter;
use crate::result::{unix_timestamp, BenchmarkOutcome, StatsRecord};
use crate::workload::{DbParams, WorkloadId, WorkloadParams, WorkloadRegistry};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One entry of a benchmark plan: which workload, and its caps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedBenchmark {
    pub workload: WorkloadId,
    pub max_duration: Duration,
    pub max_iterations: u64,
}

impl PlannedBenchmark {
    pub fn new(workload: WorkloadId, max_duration: Duration, max_iterations: u64) -> Self {
        Self {
            workload,
            max_duration,
            max_iterations,
        }
    }
}

impl fmt::Display for PlannedBenchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.workload,
            self.max_duration.as_secs_f64(),
            self.max_iterations
        )
    }
}

/// Parses `name:seconds:iterations`, e.g. `disk:1:1000` or `cpu:0.5:200`.
impl FromStr for PlannedBenchmark {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let entry = s.trim();
        let parts: Vec<&str> = entry.split(':').collect();
        let [name, secs, iters] = parts.as_slice() else {
            return Err(ConfigError::MalformedPlanEntry(entry.to_string()));
        };
        let workload: WorkloadId = name.parse().map_err(|_| ConfigError::UnknownWorkload {
            name: name.to_string(),
            entry: entry.to_string(),
        })?;
        let max_duration = secs
            .parse::<f64>()
            .ok()
            .and_then(|v| Duration::try_from_secs_f64(v).ok())
            .ok_or_else(|| ConfigError::InvalidDuration {
                value: secs.to_string(),
                entry: entry.to_string(),
            })?;
        let max_iterations: u64 = iters.parse().map_err(|_| ConfigError::InvalidIterations {
            value: iters.to_string(),
            entry: entry.to_string(),
        })?;
        Ok(Self::new(workload, max_duration, max_iterations))
    }
}

/// A benchmark from a plan that did not produce a record.
#[derive(Debug)]
pub struct PlanFailure {
    pub workload: WorkloadId,
    pub error: MeterError,
}

/// Records and failures gathered by [`BenchmarkRunner::run_plan`].
#[derive(Debug, Default)]
pub struct PlanReport {
    pub records: Vec<StatsRecord>,
    pub failures: Vec<PlanFailure>,
}

impl PlanReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs workloads in a bounded loop.
///
/// Each run invokes the workload repeatedly until either the duration cap or
/// the iteration cap is reached, both checked after every invocation. The
/// first invocation always happens, so every successful outcome has at
/// least one iteration, even with a zero duration cap or an iteration cap
/// of 0 or 1.
///
/// # Example
///
/// ```rust,no_run
/// use stability_meter::{BenchmarkRunner, WorkloadParams};
/// use std::time::Duration;
///
/// let runner = BenchmarkRunner::new();
/// let outcome = runner
///     .run("disk", Duration::from_secs(1), 1000, WorkloadParams::None)
///     .unwrap();
/// assert!(outcome.iterations() >= 1);
/// ```
pub struct BenchmarkRunner {
    registry: WorkloadRegistry,
    reporters: Vec<Box<dyn Reporter>>,
}

impl BenchmarkRunner {
    /// Runner over the built-in workloads, with no reporters.
    pub fn new() -> Self {
        Self::with_registry(WorkloadRegistry::builtin())
    }

    pub fn with_registry(registry: WorkloadRegistry) -> Self {
        Self {
            registry,
            reporters: Vec::new(),
        }
    }

    pub fn registry(&self) -> &WorkloadRegistry {
        &self.registry
    }

    /// Add an additional reporter.
    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) -> &mut Self {
        self.reporters.push(reporter);
        self
    }

    /// Run the workload named `name` under both caps.
    ///
    /// Unknown names are rejected before the clock starts.
    pub fn run(
        &self,
        name: &str,
        max_duration: Duration,
        max_iterations: u64,
        params: WorkloadParams<'_>,
    ) -> Result<BenchmarkOutcome> {
        let (id, _) = self.registry.resolve(name)?;
        self.run_workload(id, max_duration, max_iterations, params)
    }

    /// Run a workload by id under both caps.
    pub fn run_workload(
        &self,
        id: WorkloadId,
        max_duration: Duration,
        max_iterations: u64,
        mut params: WorkloadParams<'_>,
    ) -> Result<BenchmarkOutcome> {
        let workload = self.registry.get(id)?;

        debug!(
            workload = %id,
            max_duration_secs = max_duration.as_secs_f64(),
            max_iterations,
            "starting benchmark"
        );

        let start = Instant::now();
        let mut iterations: u64 = 0;
        loop {
            workload(&mut params).map_err(|source| {
                warn!(workload = %id, iterations, error = %source, "workload fault");
                MeterError::WorkloadFault {
                    workload: id,
                    source,
                }
            })?;
            iterations += 1;

            let elapsed = start.elapsed();
            if !within_caps(elapsed, iterations, max_duration, max_iterations) {
                info!(
                    workload = %id,
                    iterations,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "benchmark finished"
                );
                return Ok(BenchmarkOutcome::new(iterations, elapsed));
            }
        }
    }

    /// Run every planned benchmark in order and build a record for each
    /// success.
    ///
    /// A failed benchmark is reported and skipped; the rest of the plan still
    /// runs. `db` carries the executor for database entries. Without it those
    /// entries fail with a workload fault.
    pub fn run_plan(&self, plan: &[PlannedBenchmark], mut db: Option<DbParams<'_>>) -> PlanReport {
        for r in &self.reporters {
            r.plan_start(plan);
        }

        let mut report = PlanReport::default();
        for planned in plan {
            for r in &self.reporters {
                r.bench_start(planned);
            }

            let params = match db.as_mut() {
                Some(p) if planned.workload.needs_executor() => {
                    WorkloadParams::db(&mut *p.executor, p.table_prefix.clone())
                }
                _ => WorkloadParams::None,
            };

            let result = self
                .run_workload(
                    planned.workload,
                    planned.max_duration,
                    planned.max_iterations,
                    params,
                )
                .and_then(|outcome| {
                    StatsRecord::from_outcome(unix_timestamp(), planned.workload, &outcome)
                        .map(|record| (outcome, record))
                });

            match result {
                Ok((outcome, record)) => {
                    for r in &self.reporters {
                        r.bench_end(planned.workload, &outcome);
                    }
                    report.records.push(record);
                }
                Err(error) => {
                    warn!(workload = %planned.workload, %error, "benchmark skipped");
                    for r in &self.reporters {
                        r.bench_failed(planned.workload, &error);
                    }
                    report.failures.push(PlanFailure {
                        workload: planned.workload,
                        error,
                    });
                }
            }
        }

        for r in &self.reporters {
            r.plan_end(&report);
        }
        report
    }
}

impl Default for BenchmarkRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Loop guard, evaluated after each invocation.
fn within_caps(elapsed: Duration, iterations: u64, max_duration: Duration, max_iterations: u64) -> bool {
    elapsed < max_duration && iterations < max_iterations
}
