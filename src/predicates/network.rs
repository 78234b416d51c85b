//! Address and DNS predicates

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs, UdpSocket};
use tracing::debug;

use super::PredicateLibrary;

const LOOPBACK_FALLBACK: &str = "127.0.0.1";

impl PredicateLibrary {
    /// `isResolvable(host)`: lookup failures are an answer, not an error
    pub fn is_resolvable(&self, host: &str) -> bool {
        let resolvable = !lookup(host).is_empty();
        if !resolvable {
            debug!(host = %host, "Host name not resolvable");
        }
        resolvable
    }

    pub fn is_resolvable_ex(&self, host: &str) -> bool {
        self.is_resolvable(host)
    }

    /// `isInNet(host, pattern, mask)` on dotted-quad IPv4 text.
    ///
    /// The pattern is compared as given, not masked; anything that is not a
    /// dotted quad never matches.
    pub fn is_in_net(&self, host: &str, pattern: &str, mask: &str) -> bool {
        match (parse_ipv4(host), parse_ipv4(pattern), parse_ipv4(mask)) {
            (Some(host), Some(pattern), Some(mask)) => (host & mask) == pattern,
            _ => false,
        }
    }

    /// `isInNetEx(address, prefix)`: CIDR prefixes are not supported
    pub fn is_in_net_ex(&self, _address: &str, _prefix: &str) -> bool {
        false
    }

    /// First resolved address, preferring IPv4; empty when lookup fails
    pub fn dns_resolve(&self, host: &str) -> String {
        let addresses = lookup(host);
        addresses
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addresses.first())
            .map(|ip| ip.to_string())
            .unwrap_or_default()
    }

    /// Every resolved address joined with `"; "`; empty when lookup fails
    pub fn dns_resolve_ex(&self, host: &str) -> String {
        lookup(host)
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn my_ip_address(&self) -> String {
        match self.local_ip_override() {
            Some(ip) => ip.to_string(),
            None => local_address(),
        }
    }

    pub fn my_ip_address_ex(&self) -> String {
        match self.local_ip_override() {
            Some(ip) => ip.to_string(),
            None => self.dns_resolve_ex("localhost"),
        }
    }

    /// Returned unchanged; sorting is not implemented
    pub fn sort_ip_address_list(&self, list: &str) -> String {
        if list.trim().is_empty() {
            String::new()
        } else {
            list.to_string()
        }
    }
}

fn parse_ipv4(text: &str) -> Option<u32> {
    text.trim().parse::<Ipv4Addr>().ok().map(u32::from)
}

fn lookup(host: &str) -> Vec<IpAddr> {
    let host = host.trim();
    if host.is_empty() {
        return Vec::new();
    }

    match (host, 0).to_socket_addrs() {
        Ok(addrs) => {
            let mut resolved: Vec<IpAddr> = Vec::new();
            for addr in addrs {
                if !resolved.contains(&addr.ip()) {
                    resolved.push(addr.ip());
                }
            }
            resolved
        }
        Err(e) => {
            debug!(host = %host, error = %e, "DNS lookup failed");
            Vec::new()
        }
    }
}

/// Address of this machine as seen by the network
fn local_address() -> String {
    let by_name = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| lookup(&name))
        .unwrap_or_default();

    if let Some(ip) = by_name.iter().find(|ip| ip.is_ipv4() && !ip.is_loopback()) {
        return ip.to_string();
    }

    // Ask the OS which source address routes outward; connect() on UDP sends nothing.
    let routed = UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:53")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .ok()
        .filter(|ip| !ip.is_unspecified());

    match routed.or_else(|| by_name.first().copied()) {
        Some(ip) => ip.to_string(),
        None => LOOPBACK_FALLBACK.to_string(),
    }
}
