//! SSRF protection: refuses to touch hosts that live on private or internal
//! networks.
//!
//! The guard is fail-closed: a host that cannot be resolved, or whose answer
//! contains any blocked address, is treated as blocked. It runs on the
//! original URL and again on every hop of a redirect chain, so a public
//! short-link cannot bounce a request onto an internal address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use hickory_resolver::TokioAsyncResolver;
use log::debug;

/// Resolves hosts and decides whether they are safe to contact.
pub struct SsrfGuard {
    resolver: Arc<TokioAsyncResolver>,
    enabled: bool,
}

impl SsrfGuard {
    /// Creates a guard. With `enabled` false every host passes; the toggle
    /// exists for configurations that terminate in a trusted egress proxy.
    pub fn new(resolver: Arc<TokioAsyncResolver>, enabled: bool) -> Self {
        SsrfGuard { resolver, enabled }
    }

    /// Returns true when the host must not be contacted.
    ///
    /// IP literals are checked directly; domain names are resolved and every
    /// returned address is checked. Resolution failure and empty answers
    /// block the host.
    pub async fn is_blocked(&self, ascii_host: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let bare = ascii_host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return is_private_ip(ip);
        }
        match self.resolver.lookup_ip(bare).await {
            Ok(lookup) => {
                let mut saw_address = false;
                for ip in lookup.iter() {
                    saw_address = true;
                    if is_private_ip(ip) {
                        debug!("Host {bare} resolves to blocked address {ip}");
                        return true;
                    }
                }
                // An empty answer is as suspicious as a failed one.
                !saw_address
            }
            Err(e) => {
                debug!("Failed to resolve {bare}, treating as blocked: {e}");
                true
            }
        }
    }
}

/// Checks whether an address belongs to a blocked range.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// Blocked IPv4 ranges:
/// - 127.0.0.0/8 (loopback)
/// - 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16 (RFC 1918)
/// - 169.254.0.0/16 (link-local)
/// - 0.0.0.0/8 (this network / unspecified)
/// - 224.0.0.0/4 (multicast), 240.0.0.0/4 (reserved)
fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();

    // 127.0.0.0/8 (loopback)
    if octets[0] == 127 {
        return true;
    }

    // 10.0.0.0/8
    if octets[0] == 10 {
        return true;
    }

    // 172.16.0.0/12
    if octets[0] == 172 && (16..=31).contains(&octets[1]) {
        return true;
    }

    // 192.168.0.0/16
    if octets[0] == 192 && octets[1] == 168 {
        return true;
    }

    // 169.254.0.0/16 (link-local)
    if octets[0] == 169 && octets[1] == 254 {
        return true;
    }

    // 0.0.0.0/8 (this network)
    if octets[0] == 0 {
        return true;
    }

    // 224.0.0.0/4 (multicast)
    if (224..=239).contains(&octets[0]) {
        return true;
    }

    // 240.0.0.0/4 (reserved)
    if octets[0] >= 240 {
        return true;
    }

    false
}

/// Blocked IPv6 ranges:
/// - :: and ::1 (unspecified, loopback)
/// - fc00::/7 (unique local)
/// - fe80::/10 (link-local)
/// - ff00::/8 (multicast)
/// - IPv4-mapped addresses whose embedded IPv4 is blocked
fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() {
        return true;
    }

    // A mapped address smuggling 127.0.0.1 must not pass as "IPv6 public".
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }

    let segments = ip.segments();

    // fc00::/7 (unique local addresses)
    if (segments[0] & 0xfe00) == 0xfc00 {
        return true;
    }

    // fe80::/10 (link-local)
    if (segments[0] & 0xffc0) == 0xfe80 {
        return true;
    }

    // ff00::/8 (multicast)
    if segments[0] & 0xff00 == 0xff00 {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::init_resolver;

    #[test]
    fn test_is_private_ipv4() {
        // Blocked ranges
        assert!(is_private_ipv4(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(172, 31, 255, 255)));
        assert!(is_private_ipv4(Ipv4Addr::new(192, 168, 1, 5)));
        assert!(is_private_ipv4(Ipv4Addr::new(169, 254, 1, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(0, 0, 0, 0)));
        assert!(is_private_ipv4(Ipv4Addr::new(224, 0, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(255, 255, 255, 255)));

        // Public addresses (RFC 5737 test nets and real resolvers)
        assert!(!is_private_ipv4(Ipv4Addr::new(192, 0, 2, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(198, 51, 100, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(203, 0, 113, 1)));
        assert!(!is_private_ipv4(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(!is_private_ipv4(Ipv4Addr::new(172, 32, 0, 1)));
    }

    #[test]
    fn test_is_private_ipv6() {
        assert!(is_private_ipv6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0)));
        assert!(is_private_ipv6(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)));
        assert!(is_private_ipv6(Ipv6Addr::new(0xff00, 0, 0, 0, 0, 0, 0, 1)));

        assert!(!is_private_ipv6(Ipv6Addr::new(
            0x2001, 0xdb8, 0, 0, 0, 0, 0, 1
        )));
    }

    #[test]
    fn test_ipv4_mapped_ipv6_is_checked() {
        let mapped_loopback: Ipv6Addr = "::ffff:127.0.0.1".parse().unwrap();
        assert!(is_private_ipv6(mapped_loopback));
        let mapped_public: Ipv6Addr = "::ffff:8.8.8.8".parse().unwrap();
        assert!(!is_private_ipv6(mapped_public));
    }

    #[tokio::test]
    async fn test_guard_blocks_ip_literals_without_dns() {
        let guard = SsrfGuard::new(init_resolver().unwrap(), true);
        assert!(guard.is_blocked("127.0.0.1").await);
        assert!(guard.is_blocked("10.1.2.3").await);
        assert!(guard.is_blocked("192.168.1.5").await);
        assert!(guard.is_blocked("0.0.0.0").await);
        assert!(guard.is_blocked("[::1]").await);
        assert!(!guard.is_blocked("192.0.2.1").await);
    }

    #[tokio::test]
    async fn test_disabled_guard_passes_everything() {
        let guard = SsrfGuard::new(init_resolver().unwrap(), false);
        assert!(!guard.is_blocked("127.0.0.1").await);
        assert!(!guard.is_blocked("[::1]").await);
    }
}
