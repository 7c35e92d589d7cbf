//! Assembly of the outbound report payload.

use crate::error::{MeterError, Result};
use crate::hostinfo::HostFacts;
use crate::identity::{is_public_ip, HostIdentity};
use crate::result::StatsRecord;
use serde::Serialize;
use std::net::IpAddr;

/// Wire names of the payload fields, in send order.
pub const FIELD_HOSTNAME: &str = "hostname";
pub const FIELD_IP: &str = "ip";
pub const FIELD_HOSTHASH: &str = "hosthash";
pub const FIELD_AGENT: &str = "agent";
pub const FIELD_STATS: &str = "stats";
pub const FIELD_HOSTINFO: &str = "hostinfo";

/// Validated bundle sent to the collector once per reporting cycle.
///
/// Only [`assemble`] constructs it; there are no setters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload {
    hostname: String,
    ip: String,
    #[serde(rename = "hosthash")]
    host_hash: String,
    agent: String,
    stats: String,
    hostinfo: String,
}

impl ReportPayload {
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn host_hash(&self) -> &str {
        &self.host_hash
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// JSON array of `[timestamp, testName, testCount, durationSeconds]`.
    pub fn stats_json(&self) -> &str {
        &self.stats
    }

    /// JSON object of host facts.
    pub fn host_info_json(&self) -> &str {
        &self.hostinfo
    }

    /// Field name/value pairs in wire order, ready for form encoding.
    pub fn form_fields(&self) -> [(&'static str, &str); 6] {
        [
            (FIELD_HOSTNAME, &self.hostname),
            (FIELD_IP, &self.ip),
            (FIELD_HOSTHASH, &self.host_hash),
            (FIELD_AGENT, &self.agent),
            (FIELD_STATS, &self.stats),
            (FIELD_HOSTINFO, &self.hostinfo),
        ]
    }

    /// Decode the stats encoding back into records.
    pub fn decode_stats(&self) -> serde_json::Result<Vec<StatsRecord>> {
        serde_json::from_str(&self.stats)
    }

    /// Decode the host facts encoding.
    pub fn decode_host_facts(&self) -> serde_json::Result<HostFacts> {
        serde_json::from_str(&self.hostinfo)
    }
}

/// Validate the identity and merge it with the records and host facts.
///
/// All checks run before anything is returned: every identity field must be
/// non-empty and `ip` must be a public address. No partial payload is ever
/// produced.
pub fn assemble(
    identity: &HostIdentity,
    records: &[StatsRecord],
    facts: &HostFacts,
) -> Result<ReportPayload> {
    let mut problems = Vec::new();

    for (name, value) in [
        (FIELD_HOSTNAME, &identity.hostname),
        (FIELD_IP, &identity.ip),
        (FIELD_HOSTHASH, &identity.host_hash),
        (FIELD_AGENT, &identity.agent),
    ] {
        if value.trim().is_empty() {
            problems.push(format!("{name} is empty"));
        }
    }

    if !identity.ip.trim().is_empty() {
        match identity.ip.parse::<IpAddr>() {
            Ok(addr) if is_public_ip(addr) => {}
            Ok(addr) => problems.push(format!("ip {addr} is not a public address")),
            Err(_) => problems.push(format!("ip {:?} is not an IP address", identity.ip)),
        }
    }

    if !problems.is_empty() {
        return Err(MeterError::IncompleteReport(problems.join(", ")));
    }

    let stats = serde_json::to_string(records)
        .map_err(|e| MeterError::IncompleteReport(format!("stats encoding failed: {e}")))?;
    let hostinfo = serde_json::to_string(facts)
        .map_err(|e| MeterError::IncompleteReport(format!("hostinfo encoding failed: {e}")))?;

    Ok(ReportPayload {
        hostname: identity.hostname.clone(),
        ip: identity.ip.clone(),
        host_hash: identity.host_hash.clone(),
        agent: identity.agent.clone(),
        stats,
        hostinfo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity(ip: &str) -> HostIdentity {
        HostIdentity {
            hostname: "web-01.example.com".into(),
            ip: ip.into(),
            host_hash: "0123456789abcdef0123456789abcdef".into(),
            agent: "rust-cli-0.1".into(),
        }
    }

    fn facts() -> HostFacts {
        let mut facts = HostFacts::new();
        facts.insert("os", "name", "linux");
        facts.insert("cpu", "cores", "4");
        facts.insert("mem", "total", "7852640 kB");
        facts
    }

    fn records() -> Vec<StatsRecord> {
        vec![
            StatsRecord::build(1_700_000_000, "cpu", 1000, 0.123456789).unwrap(),
            StatsRecord::build(1_700_000_001, "disk", 37, 1.0000042).unwrap(),
        ]
    }

    #[test]
    fn should_assemble_when_identity_valid() {
        let payload = assemble(&identity("8.8.8.8"), &records(), &facts()).unwrap();
        assert_eq!(payload.ip(), "8.8.8.8");
        let names: Vec<_> = payload.form_fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, ["hostname", "ip", "hosthash", "agent", "stats", "hostinfo"]);
    }

    #[test]
    fn should_reject_when_agent_empty() {
        let mut id = identity("8.8.8.8");
        id.agent = String::new();
        let err = assemble(&id, &records(), &facts()).unwrap_err();
        assert!(matches!(err, MeterError::IncompleteReport(msg) if msg.contains("agent")));
    }

    #[test]
    fn should_reject_private_ip() {
        for ip in [
            "192.168.1.1",
            "10.0.0.8",
            "127.0.0.1",
            "169.254.3.4",
            "::1",
            "::192.168.1.1",
            "2002:c0a8:101::1",
            "not-an-ip",
        ] {
            assert!(
                assemble(&identity(ip), &records(), &facts()).is_err(),
                "{ip} should be rejected"
            );
        }
    }

    #[test]
    fn should_report_every_problem_at_once() {
        let id = HostIdentity {
            hostname: String::new(),
            ip: "192.168.1.1".into(),
            host_hash: String::new(),
            agent: "a".into(),
        };
        let err = assemble(&id, &[], &HostFacts::new()).unwrap_err().to_string();
        assert!(err.contains("hostname"));
        assert!(err.contains("hosthash"));
        assert!(err.contains("192.168.1.1"));
    }

    #[test]
    fn should_allow_empty_records_and_facts() {
        let payload = assemble(&identity("1.1.1.1"), &[], &HostFacts::new()).unwrap();
        assert_eq!(payload.stats_json(), "[]");
        assert_eq!(payload.host_info_json(), "{}");
    }

    #[test]
    fn should_round_trip_records_and_facts() {
        let recs = records();
        let f = facts();
        let payload = assemble(&identity("8.8.8.8"), &recs, &f).unwrap();

        assert_eq!(payload.decode_stats().unwrap(), recs);
        assert_eq!(payload.decode_host_facts().unwrap(), f);

        let raw: serde_json::Value = serde_json::from_str(payload.stats_json()).unwrap();
        assert_eq!(raw[1], json!([1_700_000_001u64, "disk", 37, 1.0000042]));
    }
}
