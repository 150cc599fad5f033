//! Helper functions for address conversion and family detection

use crate::constants::V4_MAPPED_PREFIX;
use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[inline]
pub fn v4_key(addr: Ipv4Addr) -> u32 {
    u32::from(addr)
}

#[inline]
pub fn v6_key(addr: Ipv6Addr) -> u128 {
    u128::from(addr)
}

/// `::ffff:a.b.c.d` → `a.b.c.d`. Plain IPv6 (including `::a.b.c.d`) stays IPv6.
#[inline]
pub fn unmap_v4(addr: Ipv6Addr) -> Option<Ipv4Addr> {
    addr.to_ipv4_mapped()
}

/// An IPv4-mapped IPv6 network whose prefix covers the whole `::ffff:0:0/96`
/// block, rewritten as the equivalent IPv4 network.
pub fn unmap_v4_net(net: Ipv6Net) -> Option<Ipv4Net> {
    if net.prefix_len() < V4_MAPPED_PREFIX {
        return None;
    }
    let v4 = unmap_v4(net.network())?;
    Ipv4Net::new(v4, net.prefix_len() - V4_MAPPED_PREFIX).ok()
}

/// Address family of a parsed address, with IPv4-mapped IPv6 folded into IPv4.
pub fn normalize(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match unmap_v4(v6) {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}
