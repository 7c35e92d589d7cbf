//! Configuration for a reporting cycle.

use crate::error::ConfigError;
use crate::runner::PlannedBenchmark;
use crate::transport::DEFAULT_ENDPOINT;
use crate::workload::WorkloadId;
use crate::workloads::db::is_valid_table_prefix;
use std::time::Duration;

/// Longest agent string the collector accepts, in bytes.
pub const MAX_AGENT_LEN: usize = 32;

/// Configuration for a reporting cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterConfig {
    /// Collector URL.
    pub endpoint: String,
    /// Client identifier, at most [`MAX_AGENT_LEN`] bytes.
    pub agent: String,
    /// Hostname to report. Detected when unset.
    pub hostname: Option<String>,
    /// Private key mixed into the host hash. Must stay constant between runs.
    pub host_key: Option<String>,
    /// Public address to report. Resolved from the hostname when unset.
    pub ip: Option<String>,
    /// Prefix for the database workload's scratch table.
    pub db_prefix: String,
    /// Request timeout for the transport.
    pub timeout: Duration,
    /// Redirects the transport may follow.
    pub max_redirects: u32,
    /// Benchmarks to run, in order.
    pub plan: Vec<PlannedBenchmark>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            agent: default_agent(),
            hostname: None,
            host_key: None,
            ip: None,
            db_prefix: String::new(),
            timeout: Duration::from_secs(10),
            max_redirects: 2,
            plan: default_plan(),
        }
    }
}

/// `rust-cli-<crate version>`.
pub fn default_agent() -> String {
    format!("rust-cli-{}", env!("CARGO_PKG_VERSION"))
}

/// One second or 1000 runs each of the CPU and disk workloads.
pub fn default_plan() -> Vec<PlannedBenchmark> {
    vec![
        PlannedBenchmark::new(WorkloadId::Cpu, Duration::from_secs(1), 1000),
        PlannedBenchmark::new(WorkloadId::Disk, Duration::from_secs(1), 1000),
    ]
}

/// Parse a comma-separated list of `name:seconds:iterations` entries.
pub fn parse_plan(s: &str) -> Result<Vec<PlannedBenchmark>, ConfigError> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse::<PlannedBenchmark>)
        .collect()
}

impl MeterConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from environment variables.
    ///
    /// Supported variables:
    /// - `METER_ENDPOINT`: collector URL
    /// - `METER_AGENT`: client identifier
    /// - `METER_HOSTNAME`: hostname to report
    /// - `METER_HOST_KEY`: private key for the host hash
    /// - `METER_IP`: public address to report
    /// - `METER_DB_PREFIX`: scratch table prefix
    /// - `METER_TIMEOUT_SECS`: transport timeout (default: 10)
    /// - `METER_MAX_REDIRECTS`: redirect limit (default: 2)
    /// - `METER_TESTS`: plan, e.g. `cpu:1:1000,disk:1:1000`
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("METER_ENDPOINT") {
            cfg.endpoint = v;
        }
        if let Ok(v) = std::env::var("METER_AGENT") {
            cfg.agent = v;
        }
        if let Ok(v) = std::env::var("METER_HOSTNAME") {
            cfg.hostname = Some(v);
        }
        if let Ok(v) = std::env::var("METER_HOST_KEY") {
            cfg.host_key = Some(v);
        }
        if let Ok(v) = std::env::var("METER_IP") {
            cfg.ip = Some(v);
        }
        if let Ok(v) = std::env::var("METER_DB_PREFIX") {
            cfg.db_prefix = v;
        }
        if let Ok(v) = std::env::var("METER_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                cfg.timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(v) = std::env::var("METER_MAX_REDIRECTS") {
            if let Ok(n) = v.parse() {
                cfg.max_redirects = n;
            }
        }
        if let Ok(v) = std::env::var("METER_TESTS") {
            match parse_plan(&v) {
                Ok(plan) if !plan.is_empty() => cfg.plan = plan,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "ignoring METER_TESTS"),
            }
        }

        cfg
    }

    /// Check the settings the collector enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.is_empty() || self.agent.len() > MAX_AGENT_LEN {
            return Err(ConfigError::AgentLength {
                len: self.agent.len(),
                max: MAX_AGENT_LEN,
            });
        }
        if self.host_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::MissingHostKey);
        }
        if self.plan.is_empty() {
            return Err(ConfigError::EmptyPlan);
        }
        if !is_valid_table_prefix(&self.db_prefix) {
            return Err(ConfigError::InvalidTablePrefix(self.db_prefix.clone()));
        }
        Ok(())
    }

    /// Set the collector URL.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    /// Set the agent string.
    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn host_key(mut self, key: impl Into<String>) -> Self {
        self.host_key = Some(key.into());
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn db_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.db_prefix = prefix.into();
        self
    }

    /// Set the transport timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn max_redirects(mut self, n: u32) -> Self {
        self.max_redirects = n;
        self
    }

    /// Replace the benchmark plan.
    pub fn plan(mut self, plan: Vec<PlannedBenchmark>) -> Self {
        self.plan = plan;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_use_defaults_when_env_not_set() {
        let cfg = MeterConfig::default();
        assert_eq!(cfg.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_redirects, 2);
        assert_eq!(cfg.plan, default_plan());
        assert!(cfg.agent.starts_with("rust-cli-"));
    }

    #[test]
    fn should_build_config_with_builder() {
        let cfg = MeterConfig::new()
            .agent("probe")
            .host_key("k")
            .ip("8.8.8.8")
            .db_prefix("wp_")
            .timeout(Duration::from_secs(3))
            .plan(vec![PlannedBenchmark::new(
                WorkloadId::Db,
                Duration::from_secs(1),
                10,
            )]);

        assert_eq!(cfg.agent, "probe");
        assert_eq!(cfg.ip.as_deref(), Some("8.8.8.8"));
        assert_eq!(cfg.db_prefix, "wp_");
        assert_eq!(cfg.plan.len(), 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn should_reject_when_agent_too_long_or_key_missing() {
        let cfg = MeterConfig::new().host_key("k").agent("x".repeat(33));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::AgentLength { len: 33, max: 32 })
        );

        let cfg = MeterConfig::new();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingHostKey));
    }

    #[test]
    fn should_reject_when_db_prefix_not_identifier_safe() {
        let cfg = MeterConfig::new().host_key("k").db_prefix("x; DROP TABLE t; --");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidTablePrefix(_))
        ));
        assert!(MeterConfig::new().host_key("k").db_prefix("wp_").validate().is_ok());
    }

    #[test]
    fn should_parse_plan_list() {
        let plan = parse_plan("cpu:1:1000, disk:0.25:10,").unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].max_duration, Duration::from_millis(250));
        assert!(matches!(
            parse_plan("cpu:1:1000,gpu:1:1"),
            Err(ConfigError::UnknownWorkload { .. })
        ));
    }
}
