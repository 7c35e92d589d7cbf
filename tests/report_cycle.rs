//! End-to-end reporting cycle with an in-process transport.

use stability_meter::{
    assemble, host_hash, BenchmarkRunner, DbParams, HostFacts, HostFactsProvider, HostIdentity,
    MeterError, PlannedBenchmark, ReportPayload, StaticHostFacts, Transport, TransportError,
    WorkloadId, WorkloadParams,
};
use std::cell::RefCell;
use std::time::Duration;

#[derive(Default)]
struct RecordingTransport {
    sent: RefCell<Vec<Vec<(String, String)>>>,
}

impl Transport for RecordingTransport {
    fn send(&self, payload: &ReportPayload) -> Result<String, TransportError> {
        let fields = payload
            .form_fields()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.sent.borrow_mut().push(fields);
        Ok("OK".to_string())
    }
}

fn identity() -> HostIdentity {
    HostIdentity {
        hostname: "web-01.example.com".into(),
        ip: "8.8.8.8".into(),
        host_hash: host_hash("web-01.example.com", "secret"),
        agent: "rust-cli-test".into(),
    }
}

fn facts() -> HostFacts {
    let mut facts = HostFacts::new();
    facts.insert("os", "name", "linux");
    facts.insert("cpu", "vendor_id", "GenuineIntel");
    facts.insert("mem", "total", "7852640 kB");
    facts
}

#[test]
fn should_deliver_cpu_and_disk_records() {
    let runner = BenchmarkRunner::new();
    let plan = [
        PlannedBenchmark::new(WorkloadId::Cpu, Duration::from_millis(100), 50),
        PlannedBenchmark::new(WorkloadId::Disk, Duration::from_millis(100), 20),
    ];

    let report = runner.run_plan(&plan, None);
    assert!(report.is_clean());

    let provider = StaticHostFacts(facts());
    let payload = assemble(&identity(), &report.records, &provider.host_facts()).unwrap();

    let transport = RecordingTransport::default();
    assert_eq!(transport.send(&payload).unwrap(), "OK");

    let sent = transport.sent.borrow();
    let fields = &sent[0];
    let names: Vec<_> = fields.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(names, ["hostname", "ip", "hosthash", "agent", "stats", "hostinfo"]);

    let stats: serde_json::Value = serde_json::from_str(&fields[4].1).unwrap();
    let rows = stats.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][1], "cpu");
    assert_eq!(rows[1][1], "disk");
    assert!(rows[0][2].as_u64().unwrap() >= 1);
    assert!(rows[0][2].as_u64().unwrap() <= 50);

    let decoded = payload.decode_stats().unwrap();
    assert_eq!(decoded, report.records);
    assert_eq!(payload.decode_host_facts().unwrap(), facts());
}

#[test]
fn should_not_build_payload_for_private_address() {
    let runner = BenchmarkRunner::new();
    let outcome = runner
        .run("cpu", Duration::ZERO, 10, WorkloadParams::None)
        .unwrap();
    assert_eq!(outcome.iterations(), 1);

    let mut id = identity();
    id.ip = "192.168.1.1".into();
    let err = assemble(&id, &[], &facts()).unwrap_err();
    assert!(matches!(err, MeterError::IncompleteReport(_)));
}

#[test]
fn should_reject_bogus_workload() {
    let runner = BenchmarkRunner::new();
    let err = runner
        .run("bogus", Duration::from_secs(1), 100, WorkloadParams::None)
        .unwrap_err();
    assert!(matches!(err, MeterError::UnknownWorkload(_)));
}

#[cfg(feature = "sqlite")]
#[test]
fn should_report_db_workload_against_sqlite() {
    let mut exec = stability_meter::SqliteExecutor::open_in_memory().unwrap();
    let runner = BenchmarkRunner::new();
    let plan = [PlannedBenchmark::new(WorkloadId::Db, Duration::from_millis(200), 5)];

    let report = runner.run_plan(
        &plan,
        Some(DbParams {
            executor: &mut exec,
            table_prefix: "it_".into(),
        }),
    );

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.records[0].test_name(), WorkloadId::Db);
    assert!((1..=5).contains(&report.records[0].test_count()));

    let payload = assemble(&identity(), &report.records, &HostFacts::new()).unwrap();
    assert!(payload.stats_json().contains("\"db\""));
}
