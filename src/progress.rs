//! Pluggable progress reporters for benchmark plans.

use crate::error::MeterError;
use crate::result::BenchmarkOutcome;
use crate::runner::{PlanReport, PlannedBenchmark};
use crate::workload::WorkloadId;
use std::io::Write;
use std::time::Duration;

/// Hooks called by [`crate::BenchmarkRunner::run_plan`].
pub trait Reporter: Send + Sync {
    /// Called before the first benchmark of a plan.
    fn plan_start(&self, _plan: &[PlannedBenchmark]) {}

    /// Called when a benchmark starts.
    fn bench_start(&self, _planned: &PlannedBenchmark) {}

    /// Called when a benchmark completes.
    fn bench_end(&self, _workload: WorkloadId, _outcome: &BenchmarkOutcome) {}

    /// Called when a benchmark is rejected or faults.
    fn bench_failed(&self, _workload: WorkloadId, _error: &MeterError) {}

    /// Called after the last benchmark of a plan.
    fn plan_end(&self, _report: &PlanReport) {}
}

/// Console reporter that prints progress to stderr.
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn format_duration(d: Duration) -> String {
        if d.as_secs() > 0 {
            format!("{:.2}s", d.as_secs_f64())
        } else if d.as_millis() > 0 {
            format!("{:.2}ms", d.as_secs_f64() * 1000.0)
        } else {
            format!("{:.2}µs", d.as_secs_f64() * 1_000_000.0)
        }
    }

    fn format_rate(outcome: &BenchmarkOutcome) -> String {
        match outcome.ops_per_sec() {
            Some(ops) if ops > 1_000_000.0 => format!(" ({:.2}M ops/s)", ops / 1_000_000.0),
            Some(ops) if ops > 1000.0 => format!(" ({:.2}K ops/s)", ops / 1000.0),
            Some(ops) => format!(" ({:.0} ops/s)", ops),
            None => String::new(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for ConsoleReporter {
    fn plan_start(&self, plan: &[PlannedBenchmark]) {
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("  Stability benchmarks: {}", plan.len());
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    fn bench_start(&self, planned: &PlannedBenchmark) {
        eprint!(
            "  {} (≤{}, ≤{} runs) ... ",
            planned.workload,
            Self::format_duration(planned.max_duration),
            planned.max_iterations
        );
        std::io::stderr().flush().ok();
    }

    fn bench_end(&self, _workload: WorkloadId, outcome: &BenchmarkOutcome) {
        eprintln!(
            "{} runs in {}, {} each{}",
            outcome.iterations(),
            Self::format_duration(outcome.elapsed()),
            Self::format_duration(outcome.mean_iteration()),
            Self::format_rate(outcome)
        );
    }

    fn bench_failed(&self, _workload: WorkloadId, error: &MeterError) {
        eprintln!("failed: {}", error);
    }

    fn plan_end(&self, report: &PlanReport) {
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!(
            "  Completed {} benchmarks, {} failed",
            report.records.len(),
            report.failures.len()
        );
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}

/// Reporter that emits structured `tracing` events instead of console lines.
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn plan_start(&self, plan: &[PlannedBenchmark]) {
        tracing::info!(benchmarks = plan.len(), "benchmark plan started");
    }

    fn bench_end(&self, workload: WorkloadId, outcome: &BenchmarkOutcome) {
        tracing::info!(
            workload = %workload,
            iterations = outcome.iterations(),
            elapsed_secs = outcome.elapsed_seconds(),
            ops_per_sec = outcome.ops_per_sec().unwrap_or_default(),
            "benchmark recorded"
        );
    }

    fn bench_failed(&self, workload: WorkloadId, error: &MeterError) {
        tracing::error!(workload = %workload, %error, "benchmark failed");
    }

    fn plan_end(&self, report: &PlanReport) {
        tracing::info!(
            records = report.records.len(),
            failures = report.failures.len(),
            "benchmark plan finished"
        );
    }
}

/// Combines multiple reporters.
pub struct MultiReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl MultiReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for MultiReporter {
    fn plan_start(&self, plan: &[PlannedBenchmark]) {
        for r in &self.reporters {
            r.plan_start(plan);
        }
    }

    fn bench_start(&self, planned: &PlannedBenchmark) {
        for r in &self.reporters {
            r.bench_start(planned);
        }
    }

    fn bench_end(&self, workload: WorkloadId, outcome: &BenchmarkOutcome) {
        for r in &self.reporters {
            r.bench_end(workload, outcome);
        }
    }

    fn bench_failed(&self, workload: WorkloadId, error: &MeterError) {
        for r in &self.reporters {
            r.bench_failed(workload, error);
        }
    }

    fn plan_end(&self, report: &PlanReport) {
        for r in &self.reporters {
            r.plan_end(report);
        }
    }
}
