use crate::error::ResolveError;
use if_addrs::{get_if_addrs, IfAddr};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::lookup_host;

/// The local machine as shown before scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHost {
    pub hostname: String,
    pub ip: Ipv4Addr,
}

/// Resolve `domain` to its first IPv4 address. IPv4 literals resolve to themselves.
pub async fn resolve_domain(domain: &str) -> Result<Ipv4Addr, ResolveError> {
    let domain = domain.trim();
    if let Ok(ip) = domain.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    let addrs = lookup_host((domain, 0))
        .await
        .map_err(|source| ResolveError::Lookup {
            domain: domain.to_string(),
            source,
        })?;
    first_ipv4(addrs).ok_or_else(|| ResolveError::NoIpv4(domain.to_string()))
}

/// Pick the first IPv4 address out of a lookup answer, skipping IPv6 entries.
pub fn first_ipv4(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<Ipv4Addr> {
    addrs.into_iter().find_map(|sa| match sa.ip() {
        IpAddr::V4(v4) => Some(v4),
        IpAddr::V6(_) => None,
    })
}

/// First non-loopback IPv4 address bound to a local interface, if any.
pub fn local_ipv4() -> Result<Option<Ipv4Addr>, ResolveError> {
    let ifaces = get_if_addrs().map_err(ResolveError::Interfaces)?;
    let ips = ifaces.into_iter().filter_map(|iface| match iface.addr {
        IfAddr::V4(v4) => Some(v4.ip),
        IfAddr::V6(_) => None,
    });
    Ok(pick_non_loopback(ips))
}

/// Hostname plus local IPv4. Falls back to resolving the hostname when no
/// interface carries a non-loopback IPv4 address.
pub async fn local_host_info() -> Result<LocalHost, ResolveError> {
    let hostname = sys_info::hostname().map_err(|e| ResolveError::Hostname(e.to_string()))?;
    let ip = match local_ipv4()? {
        Some(ip) => ip,
        None => resolve_domain(&hostname).await?,
    };
    Ok(LocalHost { hostname, ip })
}

fn pick_non_loopback(ips: impl IntoIterator<Item = Ipv4Addr>) -> Option<Ipv4Addr> {
    ips.into_iter().find(|ip| !ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv6Addr, SocketAddrV6};

    #[test]
    fn first_ipv4_skips_v6() {
        let addrs = vec![
            SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 0, 0, 0)),
            SocketAddr::from((Ipv4Addr::new(93, 184, 216, 34), 0)),
            SocketAddr::from((Ipv4Addr::new(10, 0, 0, 1), 0)),
        ];
        assert_eq!(first_ipv4(addrs), Some(Ipv4Addr::new(93, 184, 216, 34)));
    }

    #[test]
    fn first_ipv4_none_when_only_v6() {
        let addrs = vec![SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::LOCALHOST, 0, 0, 0))];
        assert_eq!(first_ipv4(addrs), None);
    }

    #[test]
    fn loopback_is_skipped() {
        let ips = vec![Ipv4Addr::LOCALHOST, Ipv4Addr::new(192, 168, 1, 42)];
        assert_eq!(pick_non_loopback(ips), Some(Ipv4Addr::new(192, 168, 1, 42)));
        assert_eq!(pick_non_loopback(vec![Ipv4Addr::LOCALHOST]), None);
    }

    #[tokio::test]
    async fn literal_resolves_to_itself() {
        let ip = resolve_domain(" 127.0.0.1 ").await.unwrap();
        assert_eq!(ip, Ipv4Addr::LOCALHOST);
    }
}
