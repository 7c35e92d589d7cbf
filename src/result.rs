//! Benchmark outcomes and the validated stats records built from them.

use crate::error::{MeterError, Result};
use crate::workload::WorkloadId;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Result of one bounded benchmark run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkOutcome {
    iterations: u64,
    elapsed: Duration,
}

impl BenchmarkOutcome {
    pub(crate) fn new(iterations: u64, elapsed: Duration) -> Self {
        Self {
            iterations,
            elapsed,
        }
    }

    /// Number of workload invocations performed. Always at least 1.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Wall-clock time from loop start to the last post-invocation sample.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Invocations per second.
    pub fn ops_per_sec(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (secs > 0.0).then(|| self.iterations as f64 / secs)
    }

    /// Mean wall-clock time of one invocation.
    pub fn mean_iteration(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed.as_secs_f64() / self.iterations.max(1) as f64)
    }
}

/// Canonical record of one completed benchmark.
///
/// On the wire a record is a positional array
/// `[timestamp, testName, testCount, durationSeconds]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "StatsWire", try_from = "RawStats")]
pub struct StatsRecord {
    timestamp: u64,
    test_name: WorkloadId,
    test_count: u64,
    duration_seconds: f64,
}

#[derive(Serialize)]
struct StatsWire(u64, WorkloadId, u64, f64);

#[derive(Deserialize)]
struct RawStats(i64, String, i64, f64);

impl StatsRecord {
    /// Validate raw field values into a record.
    ///
    /// Rejects a negative timestamp, a name outside the workload set, a count
    /// below 1, and a negative or non-finite duration.
    pub fn build(
        timestamp_unix: i64,
        test_name: &str,
        test_count: i64,
        duration_seconds: f64,
    ) -> Result<Self> {
        let timestamp = u64::try_from(timestamp_unix).map_err(|_| {
            MeterError::InvalidStatsRecord(format!("negative timestamp {timestamp_unix}"))
        })?;
        let test_name: WorkloadId = test_name.parse().map_err(|_| {
            MeterError::InvalidStatsRecord(format!("unknown test name {test_name:?}"))
        })?;
        if test_count < 1 {
            return Err(MeterError::InvalidStatsRecord(format!(
                "test count {test_count} is below 1"
            )));
        }
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(MeterError::InvalidStatsRecord(format!(
                "duration {duration_seconds} is not a non-negative number"
            )));
        }

        Ok(Self {
            timestamp,
            test_name,
            test_count: test_count as u64,
            duration_seconds,
        })
    }

    /// Build the record for a completed run captured at `timestamp_unix`.
    pub fn from_outcome(
        timestamp_unix: i64,
        workload: WorkloadId,
        outcome: &BenchmarkOutcome,
    ) -> Result<Self> {
        let count = i64::try_from(outcome.iterations()).map_err(|_| {
            MeterError::InvalidStatsRecord(format!(
                "test count {} overflows",
                outcome.iterations()
            ))
        })?;
        Self::build(
            timestamp_unix,
            workload.as_str(),
            count,
            outcome.elapsed_seconds(),
        )
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn test_name(&self) -> WorkloadId {
        self.test_name
    }

    pub fn test_count(&self) -> u64 {
        self.test_count
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }
}

impl From<StatsRecord> for StatsWire {
    fn from(r: StatsRecord) -> Self {
        StatsWire(r.timestamp, r.test_name, r.test_count, r.duration_seconds)
    }
}

impl TryFrom<RawStats> for StatsRecord {
    type Error = MeterError;

    fn try_from(raw: RawStats) -> Result<Self> {
        StatsRecord::build(raw.0, &raw.1, raw.2, raw.3)
    }
}

/// Current time as whole seconds since the Unix epoch.
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_build_record_when_fields_valid() {
        let r = StatsRecord::build(1_600_000_000, "disk", 42, 0.75).unwrap();
        assert_eq!(r.timestamp(), 1_600_000_000);
        assert_eq!(r.test_name(), WorkloadId::Disk);
        assert_eq!(r.test_count(), 42);
        assert_eq!(r.duration_seconds(), 0.75);
    }

    #[test]
    fn should_accept_zero_duration_and_timestamp() {
        assert!(StatsRecord::build(0, "cpu", 1, 0.0).is_ok());
    }

    #[test]
    fn should_reject_when_count_below_one() {
        assert!(matches!(
            StatsRecord::build(1, "cpu", 0, 1.0),
            Err(MeterError::InvalidStatsRecord(_))
        ));
        assert!(StatsRecord::build(1, "cpu", -3, 1.0).is_err());
    }

    #[test]
    fn should_reject_when_duration_negative_or_nan() {
        assert!(StatsRecord::build(1, "cpu", 1, -0.001).is_err());
        assert!(StatsRecord::build(1, "cpu", 1, f64::NAN).is_err());
        assert!(StatsRecord::build(1, "cpu", 1, f64::INFINITY).is_err());
    }

    #[test]
    fn should_reject_when_timestamp_negative() {
        assert!(StatsRecord::build(-1, "cpu", 1, 1.0).is_err());
    }

    #[test]
    fn should_reject_when_name_unknown() {
        let err = StatsRecord::build(1, "gpu", 1, 1.0).unwrap_err();
        assert!(matches!(err, MeterError::InvalidStatsRecord(_)));
    }

    #[test]
    fn should_serialize_as_positional_array() {
        let r = StatsRecord::build(1_700_000_000, "cpu", 1000, 0.5).unwrap();
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"[1700000000,"cpu",1000,0.5]"#);
    }

    #[test]
    fn should_validate_when_decoding() {
        let r: StatsRecord = serde_json::from_str(r#"[5,"db",3,1.25]"#).unwrap();
        assert_eq!(r.test_name(), WorkloadId::Db);
        assert!(serde_json::from_str::<StatsRecord>(r#"[5,"db",0,1.25]"#).is_err());
        assert!(serde_json::from_str::<StatsRecord>(r#"[-5,"db",1,1.25]"#).is_err());
    }

    #[test]
    fn should_build_from_outcome() {
        let outcome = BenchmarkOutcome::new(17, Duration::from_millis(250));
        let r = StatsRecord::from_outcome(10, WorkloadId::Cpu, &outcome).unwrap();
        assert_eq!(r.test_count(), 17);
        assert_eq!(r.duration_seconds(), 0.25);
    }

    #[test]
    fn should_compute_throughput_when_elapsed_positive() {
        let outcome = BenchmarkOutcome::new(100, Duration::from_secs(2));
        assert_eq!(outcome.ops_per_sec(), Some(50.0));
        assert_eq!(outcome.mean_iteration(), Duration::from_millis(20));
        assert_eq!(BenchmarkOutcome::new(1, Duration::ZERO).ops_per_sec(), None);
    }
}
