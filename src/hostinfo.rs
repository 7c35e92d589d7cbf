//! Best-effort host facts: OS, CPU and memory.
//!
//! Providers never fail. Missing or unreadable sources simply leave their
//! section out of the mapping.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Free-form nested mapping of `section -> key -> value`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostFacts(Map<String, Value>);

impl HostFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `section.key`, creating the section if needed.
    pub fn insert(&mut self, section: &str, key: &str, value: impl Into<Value>) {
        let entry = self
            .0
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value.into());
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.0.get(section)?.get(key)
    }

    pub fn section(&self, section: &str) -> Option<&Map<String, Value>> {
        self.0.get(section)?.as_object()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Source of host facts.
pub trait HostFactsProvider {
    fn host_facts(&self) -> HostFacts;
}

/// Fixed facts, for callers that gather them elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticHostFacts(pub HostFacts);

impl HostFactsProvider for StaticHostFacts {
    fn host_facts(&self) -> HostFacts {
        self.0.clone()
    }
}

/// Reads `/proc`-style files on Unix-like systems.
#[derive(Debug, Clone)]
pub struct ProcHostFacts {
    cpuinfo: PathBuf,
    meminfo: PathBuf,
    osrelease: PathBuf,
    osversion: PathBuf,
}

impl Default for ProcHostFacts {
    fn default() -> Self {
        Self {
            cpuinfo: PathBuf::from("/proc/cpuinfo"),
            meminfo: PathBuf::from("/proc/meminfo"),
            osrelease: PathBuf::from("/proc/sys/kernel/osrelease"),
            osversion: PathBuf::from("/proc/sys/kernel/version"),
        }
    }
}

impl ProcHostFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read everything from `root` instead of the real `/proc`, using the same
    /// relative layout (`cpuinfo`, `meminfo`, `sys/kernel/osrelease`,
    /// `sys/kernel/version`).
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            cpuinfo: root.join("cpuinfo"),
            meminfo: root.join("meminfo"),
            osrelease: root.join("sys/kernel/osrelease"),
            osversion: root.join("sys/kernel/version"),
        }
    }
}

/// Section holding the OS name and `uname`-style release, version and
/// machine, under the keys the collector reads.
pub const PLATFORM_SECTION: &str = "php";

impl HostFactsProvider for ProcHostFacts {
    fn host_facts(&self) -> HostFacts {
        let mut facts = HostFacts::new();
        facts.insert(PLATFORM_SECTION, "os", platform_os_name());

        let mut uname = Map::new();
        if let Some(release) = read_trimmed(&self.osrelease) {
            uname.insert("r".to_string(), release.into());
        }
        if let Some(version) = read_trimmed(&self.osversion) {
            uname.insert("v".to_string(), version.into());
        }
        uname.insert("m".to_string(), std::env::consts::ARCH.into());
        facts.insert(PLATFORM_SECTION, "uname", uname);

        if cfg!(windows) {
            return facts;
        }

        if let Some(total) = read_source(&self.meminfo).and_then(|s| parse_meminfo(&s)) {
            facts.insert("mem", "total", total);
        }
        if let Some(text) = read_source(&self.cpuinfo) {
            for (key, value) in parse_cpuinfo(&text) {
                facts.insert("cpu", key, value);
            }
        }
        facts
    }
}

/// Kernel name as `uname -s` spells it.
fn platform_os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "WINNT",
        "freebsd" => "FreeBSD",
        "netbsd" => "NetBSD",
        "openbsd" => "OpenBSD",
        other => other,
    }
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "host facts source unavailable");
            None
        }
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    read_source(path)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn tag_and_value(line: &str) -> Option<(String, &str)> {
    let (tag, value) = line.trim().split_once(':')?;
    Some((tag.trim().to_lowercase(), value.trim()))
}

/// Value of the `MemTotal` line, e.g. `7852640 kB`.
pub fn parse_meminfo(text: &str) -> Option<String> {
    text.lines()
        .filter_map(tag_and_value)
        .find(|(tag, _)| tag == "memtotal")
        .map(|(_, value)| value.to_string())
}

/// CPU attributes from the first processor block that carries them.
///
/// Each key keeps its first occurrence; scanning stops once all are found.
pub fn parse_cpuinfo(text: &str) -> Vec<(&'static str, String)> {
    const KEYS: [(&str, &str); 6] = [
        ("vendor_id", "vendor_id"),
        ("cpu family", "family"),
        ("model", "model"),
        ("model name", "model_name"),
        ("cpu cores", "cores"),
        ("bogomips", "bogomips"),
    ];

    let mut found: Vec<(&'static str, String)> = Vec::new();
    for (tag, value) in text.lines().filter_map(tag_and_value) {
        let Some((_, key)) = KEYS.iter().find(|(t, _)| *t == tag) else {
            continue;
        };
        if found.iter().any(|(k, _)| k == key) {
            continue;
        }
        found.push((*key, value.to_string()));
        if found.len() == KEYS.len() {
            break;
        }
    }
    found
}
