//! stability-meter: run the benchmark plan and report it to the collector.
//!
//! Run it at most once an hour; the collector ignores more frequent reports.
//!
//! ```text
//! stability-meter --host-key SECRET                 # cpu + disk, send
//! stability-meter --host-key SECRET --dry-run       # print the payload
//! stability-meter --host-key SECRET --sqlite db.sq  # include the db workload
//! stability-meter --test cpu:0.5:200 --test disk:1:1000 --host-key SECRET
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use stability_meter::{
    assemble, detect_hostname, host_hash, resolve_public_ip, BenchmarkRunner,
    ConsoleReporter, DbParams, HostFactsProvider, HostIdentity, HttpTransport, MeterConfig,
    PlannedBenchmark, ProcHostFacts, QueryExecutor, Reporter, TracingReporter, Transport,
    WorkloadId,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "stability-meter",
    version,
    about = "Benchmark this host and report its performance stability"
)]
struct Cli {
    /// Private key mixed into the host hash; keep it constant between runs
    #[arg(long, env = "METER_HOST_KEY", hide_env_values = true)]
    host_key: Option<String>,

    /// Hostname to report (detected when omitted)
    #[arg(long)]
    hostname: Option<String>,

    /// Public IP to report (resolved from the hostname when omitted)
    #[arg(long)]
    ip: Option<String>,

    /// Client identifier, at most 32 bytes
    #[arg(long)]
    agent: Option<String>,

    /// Collector URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Benchmark to run as NAME:SECONDS:ITERATIONS (repeatable)
    #[arg(long = "test", value_name = "SPEC")]
    tests: Vec<PlannedBenchmark>,

    /// SQLite database to run the db workload against
    #[arg(long, value_name = "PATH")]
    sqlite: Option<PathBuf>,

    /// Prefix for the db workload's scratch table
    #[arg(long)]
    db_prefix: Option<String>,

    /// Transport timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the payload as JSON instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// List available workloads and exit
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Quiet mode (errors and warnings only)
    #[arg(long, short = 'q')]
    quiet: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.list {
        for id in BenchmarkRunner::new().registry().ids() {
            println!("{:<6} {}", id.as_str(), id.description());
        }
        return Ok(());
    }

    let config = build_config(&cli)?;
    run_cycle(&cli, &config)
}

fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, then command-line flags on top.
fn build_config(cli: &Cli) -> Result<MeterConfig> {
    let mut config = MeterConfig::from_env();

    if let Some(key) = &cli.host_key {
        config = config.host_key(key);
    }
    if let Some(hostname) = &cli.hostname {
        config = config.hostname(hostname);
    }
    if let Some(ip) = &cli.ip {
        config = config.ip(ip);
    }
    if let Some(agent) = &cli.agent {
        config = config.agent(agent);
    }
    if let Some(endpoint) = &cli.endpoint {
        config = config.endpoint(endpoint);
    }
    if let Some(prefix) = &cli.db_prefix {
        config = config.db_prefix(prefix);
    }
    if let Some(secs) = cli.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    if !cli.tests.is_empty() {
        config = config.plan(cli.tests.clone());
    } else if cli.sqlite.is_some() && !config.plan.iter().any(|p| p.workload == WorkloadId::Db) {
        let mut plan = config.plan.clone();
        plan.push(PlannedBenchmark::new(WorkloadId::Db, Duration::from_secs(1), 1000));
        config = config.plan(plan);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_cycle(cli: &Cli, config: &MeterConfig) -> Result<()> {
    let identity = resolve_identity(config)?;
    tracing::info!(hostname = %identity.hostname, ip = %identity.ip, "host identity resolved");

    let mut runner = BenchmarkRunner::new();
    let reporter: Box<dyn Reporter> = if cli.quiet {
        Box::new(TracingReporter)
    } else {
        Box::new(ConsoleReporter::new())
    };
    runner.add_reporter(reporter);

    let mut executor = open_executor(cli)?;
    let db = executor.as_deref_mut().map(|executor| DbParams {
        executor,
        table_prefix: config.db_prefix.clone(),
    });
    let report = runner.run_plan(&config.plan, db);

    for failure in &report.failures {
        tracing::warn!(workload = %failure.workload, error = %failure.error, "not reported");
    }

    let facts = ProcHostFacts::new().host_facts();
    let payload = assemble(&identity, &report.records, &facts).context("Failed to assemble report")?;

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let transport = HttpTransport::new(
        &config.endpoint,
        config.timeout,
        config.max_redirects,
        &config.agent,
    );
    let reply = transport
        .send(&payload)
        .with_context(|| format!("Failed to send report to {}", config.endpoint))?;
    print!("{}", reply);
    Ok(())
}

fn resolve_identity(config: &MeterConfig) -> Result<HostIdentity> {
    let hostname = match &config.hostname {
        Some(h) => h.clone(),
        None => detect_hostname().context("Could not detect hostname; pass --hostname")?,
    };

    let ip = match &config.ip {
        Some(ip) => ip.clone(),
        None => resolve_public_ip(&hostname)
            .with_context(|| {
                format!("{hostname} does not resolve to a public IP address; pass --ip")
            })?
            .to_string(),
    };

    let Some(key) = config.host_key.as_deref() else {
        bail!("Host key is not set; pass --host-key or METER_HOST_KEY");
    };

    Ok(HostIdentity {
        host_hash: host_hash(&hostname, key),
        hostname,
        ip,
        agent: config.agent.clone(),
    })
}

#[cfg(feature = "sqlite")]
fn open_executor(cli: &Cli) -> Result<Option<Box<dyn QueryExecutor>>> {
    match &cli.sqlite {
        Some(path) => {
            let exec = stability_meter::SqliteExecutor::open(path)
                .with_context(|| format!("Failed to open SQLite database {}", path.display()))?;
            Ok(Some(Box::new(exec)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_executor(cli: &Cli) -> Result<Option<Box<dyn QueryExecutor>>> {
    if cli.sqlite.is_some() {
        bail!("--sqlite requires the `sqlite` feature");
    }
    Ok(None)
}
