//! CIDR parsing and normalisation into integer ranges.

use crate::constants::{V4_BITS, V6_BITS};
use crate::errors::ParseError;
use crate::helpers::{unmap_v4_net, v4_key, v6_key};
use crate::key::PrefixKey;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::fmt;
use std::net::IpAddr;

/// Inclusive address range covered by one CIDR block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Range<K> {
    pub first: K,
    pub last: K,
    pub prefix_len: u8,
}

impl<K: PrefixKey> Range<K> {
    /// `first = network & mask`, `last = first | !mask`.
    pub fn new(network: K, prefix_len: u8) -> Self {
        let prefix_len = prefix_len.min(K::WIDTH);
        let first = network.canonical(prefix_len);
        Self {
            first,
            last: first.fill_host(prefix_len),
            prefix_len,
        }
    }

    #[inline]
    pub fn contains(&self, addr: K) -> bool {
        self.first <= addr && addr <= self.last
    }
}

impl From<Ipv4Net> for Range<u32> {
    fn from(net: Ipv4Net) -> Self {
        Range::new(v4_key(net.addr()), net.prefix_len())
    }
}

impl From<Ipv6Net> for Range<u128> {
    fn from(net: Ipv6Net) -> Self {
        Range::new(v6_key(net.addr()), net.prefix_len())
    }
}

/// A parsed CIDR, already routed to its address family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Cidr {
    V4(Ipv4Net),
    V6(Ipv6Net),
}

impl Cidr {
    /// IPv4-mapped IPv6 networks with a prefix of at least /96 become IPv4.
    pub fn from_net(net: IpNet) -> Self {
        match net {
            IpNet::V4(v4) => Cidr::V4(v4),
            IpNet::V6(v6) => match unmap_v4_net(v6) {
                Some(v4) => Cidr::V4(v4),
                None => Cidr::V6(v6),
            },
        }
    }

    pub fn prefix_len(&self) -> u8 {
        match self {
            Cidr::V4(n) => n.prefix_len(),
            Cidr::V6(n) => n.prefix_len(),
        }
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cidr::V4(n) => write!(f, "{n}"),
            Cidr::V6(n) => write!(f, "{n}"),
        }
    }
}

/// Parse `a.b.c.d/n` or `ipv6/n`. Surrounding whitespace is trimmed. Host
/// bits past the prefix are allowed and masked off later by [`Range::new`].
pub fn parse_cidr(text: &str) -> Result<Cidr, ParseError> {
    let s = text.trim();
    let (addr_s, plen_s) = s
        .split_once('/')
        .ok_or_else(|| ParseError::new(text, "missing '/prefix-length'"))?;

    let addr: IpAddr = addr_s
        .parse()
        .map_err(|_| ParseError::new(text, format!("invalid address {addr_s:?}")))?;

    if plen_s.is_empty() || !plen_s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::new(
            text,
            format!("invalid prefix length {plen_s:?}"),
        ));
    }
    let max = if addr.is_ipv4() { V4_BITS } else { V6_BITS };
    let prefix_len = plen_s
        .parse::<u8>()
        .ok()
        .filter(|p| *p <= max)
        .ok_or_else(|| {
            ParseError::new(
                text,
                format!("prefix length {plen_s} out of range 0..={max}"),
            )
        })?;

    let net = IpNet::new(addr, prefix_len)
        .map_err(|e| ParseError::new(text, e.to_string()))?;
    Ok(Cidr::from_net(net))
}

/// Anything that can be turned into a [`Cidr`]: raw text or an already-parsed network.
pub trait IntoCidr {
    fn into_cidr(self) -> Result<Cidr, ParseError>;

    /// Text used to identify the entry in error reports.
    fn describe(&self) -> String;
}

impl IntoCidr for &str {
    fn into_cidr(self) -> Result<Cidr, ParseError> {
        parse_cidr(self)
    }

    fn describe(&self) -> String {
        (*self).to_owned()
    }
}

impl IntoCidr for String {
    fn into_cidr(self) -> Result<Cidr, ParseError> {
        parse_cidr(&self)
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

impl IntoCidr for &String {
    fn into_cidr(self) -> Result<Cidr, ParseError> {
        parse_cidr(self)
    }

    fn describe(&self) -> String {
        (*self).clone()
    }
}

impl IntoCidr for Cidr {
    fn into_cidr(self) -> Result<Cidr, ParseError> {
        Ok(self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl IntoCidr for IpNet {
    fn into_cidr(self) -> Result<Cidr, ParseError> {
        Ok(Cidr::from_net(self))
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl IntoCidr for Ipv4Net {
    fn into_cidr(self) -> Result<Cidr, ParseError> {
        Ok(Cidr::V4(self))
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl IntoCidr for Ipv6Net {
    fn into_cidr(self) -> Result<Cidr, ParseError> {
        Ok(Cidr::from_net(IpNet::V6(self)))
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}
