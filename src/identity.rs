//! Host identity fields and address classification.

use md5::{Digest, Md5};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

/// Identity sent alongside every report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostIdentity {
    pub hostname: String,
    pub ip: String,
    pub host_hash: String,
    pub agent: String,
}

/// Lowercase hex MD5 of `hostname` followed by the private host key.
///
/// The collector uses it to tell reports from this host apart from reports
/// claiming the same address, and matches it against earlier reports from
/// other clients. Both inputs must stay constant between runs.
pub fn host_hash(hostname: &str, host_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(hostname.as_bytes());
    hasher.update(host_key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether `addr` is routable on the public internet.
///
/// Rejects unspecified, loopback, private, shared (CGNAT), link-local,
/// documentation, benchmarking, multicast, broadcast and reserved ranges.
/// IPv6 addresses that embed an IPv4 address (mapped, compatible, 6to4,
/// NAT64) are judged by the embedded address.
pub fn is_public_ip(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match embedded_v4(v6) {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

/// IPv4 address carried by `::ffff:0:0/96`, `::/96`, `64:ff9b::/96` or
/// `2002::/16`. `::` and `::1` are left to the IPv6 checks.
fn embedded_v4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    let seg = ip.segments();
    let v4 = |hi: u16, lo: u16| Ipv4Addr::from((u32::from(hi) << 16) | u32::from(lo));

    if let Some(mapped) = ip.to_ipv4_mapped() {
        return Some(mapped);
    }
    if seg[..6] == [0; 6] && !ip.is_unspecified() && !ip.is_loopback() {
        return Some(v4(seg[6], seg[7]));
    }
    if seg[..6] == [0x64, 0xff9b, 0, 0, 0, 0] {
        return Some(v4(seg[6], seg[7]));
    }
    if seg[0] == 0x2002 {
        return Some(v4(seg[1], seg[2]));
    }
    None
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, c, _] = ip.octets();
    let reserved = a == 0
        || (a == 100 && (64..128).contains(&b))
        || (a == 192 && b == 0 && c == 0)
        || (a == 198 && (b == 18 || b == 19))
        || a >= 240;

    !(reserved
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast())
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let seg = ip.segments();
    let unique_local = (seg[0] & 0xfe00) == 0xfc00;
    let link_local = (seg[0] & 0xffc0) == 0xfe80;
    let site_local = (seg[0] & 0xffc0) == 0xfec0;
    let documentation = seg[0] == 0x2001 && seg[1] == 0x0db8;
    let discard_only = seg[..4] == [0x0100, 0, 0, 0];
    let protocol_assignments = seg[0] == 0x2001 && seg[1] < 0x0200;
    let reserved = seg[0] < 0x0100;

    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_multicast()
        || unique_local
        || link_local
        || site_local
        || documentation
        || discard_only
        || protocol_assignments
        || reserved)
}

/// Best-effort local hostname.
pub fn detect_hostname() -> Option<String> {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .filter_map(|p| std::fs::read_to_string(p).ok())
        .chain(["HOSTNAME", "COMPUTERNAME"].iter().filter_map(|v| std::env::var(v).ok()))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

/// First public address `hostname` resolves to.
pub fn resolve_public_ip(hostname: &str) -> Option<IpAddr> {
    let addrs = match (hostname, 0).to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            tracing::debug!(hostname, error = %e, "hostname did not resolve");
            return None;
        }
    };
    addrs.map(|a| a.ip()).find(|ip| is_public_ip(*ip))
}
