//! # stability-meter
//!
//! Measures how stable a host's performance is by running short, bounded
//! micro-benchmarks (CPU, disk and optionally a database) and reporting the
//! results together with static host facts to a remote collector.
//!
//! Every benchmark runs under two caps, a duration and an iteration count,
//! and always performs at least one invocation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stability_meter::{
//!     assemble, host_hash, BenchmarkRunner, HostFactsProvider, HostIdentity,
//!     HttpTransport, MeterConfig, ProcHostFacts, Transport,
//! };
//!
//! let config = MeterConfig::from_env();
//! let runner = BenchmarkRunner::new();
//! let report = runner.run_plan(&config.plan, None);
//!
//! let identity = HostIdentity {
//!     hostname: "web-01.example.com".into(),
//!     ip: "203.0.113.7".into(),
//!     host_hash: host_hash("web-01.example.com", "my-private-key"),
//!     agent: config.agent.clone(),
//! };
//! let payload = assemble(&identity, &report.records, &ProcHostFacts::new().host_facts())?;
//!
//! let transport = HttpTransport::new(
//!     &config.endpoint,
//!     config.timeout,
//!     config.max_redirects,
//!     &config.agent,
//! );
//! transport.send(&payload)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - **`sqlite`** (default): [`SqliteExecutor`], a query executor for the
//!   database workload backed by SQLite

mod config;
mod error;
mod hostinfo;
mod identity;
mod progress;
mod report;
mod result;
mod runner;
mod transport;
mod workload;

pub mod workloads;

pub use config::{default_agent, default_plan, parse_plan, MeterConfig, MAX_AGENT_LEN};
pub use error::{BoxError, ConfigError, MeterError, Result};
pub use hostinfo::{
    parse_cpuinfo, parse_meminfo, HostFacts, HostFactsProvider, ProcHostFacts, StaticHostFacts,
    PLATFORM_SECTION,
};
pub use identity::{detect_hostname, host_hash, is_public_ip, resolve_public_ip, HostIdentity};
pub use progress::{ConsoleReporter, MultiReporter, Reporter, TracingReporter};
pub use report::{assemble, ReportPayload};
pub use result::{unix_timestamp, BenchmarkOutcome, StatsRecord};
pub use runner::{BenchmarkRunner, PlanFailure, PlanReport, PlannedBenchmark};
pub use transport::{HttpTransport, Transport, TransportError, DEFAULT_ENDPOINT};
pub use workload::{
    DbParams, QueryExecutor, WorkloadFn, WorkloadId, WorkloadParams, WorkloadRegistry,
};

#[cfg(feature = "sqlite")]
pub use workloads::SqliteExecutor;
