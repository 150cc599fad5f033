//! Family dispatcher: one IPv4 trie and one IPv6 trie behind a single LPM surface.

use crate::errors::ParseError;
use crate::helpers::{normalize, v4_key, v6_key};
use crate::range::{Cidr, IntoCidr, Range};
use crate::trie::{Ipv4Trie, Ipv6Trie};
use log::debug;
use std::net::IpAddr;
use std::sync::Arc;

/// Prefix and node counts for one built index.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub v4_prefixes: usize,
    pub v6_prefixes: usize,
    pub v4_nodes: usize,
    pub v6_nodes: usize,
}

impl IndexStats {
    pub fn prefixes(&self) -> usize {
        self.v4_prefixes + self.v6_prefixes
    }
}

pub struct IpIndex<T> {
    v4: Ipv4Trie<T>,
    v6: Ipv6Trie<T>,
}

impl<T> Default for IpIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IpIndex<T> {
    pub fn new() -> Self {
        Self {
            v4: Ipv4Trie::new(),
            v6: Ipv6Trie::new(),
        }
    }

    /// Parse `cidr` and store `payload` under it in the matching family's trie.
    pub fn insert<C: IntoCidr>(&mut self, cidr: C, payload: T) -> Result<(), ParseError> {
        let cidr = cidr.into_cidr()?;
        self.insert_cidr(cidr, Arc::new(payload));
        Ok(())
    }

    pub fn insert_cidr(&mut self, cidr: Cidr, payload: Arc<T>) {
        match cidr {
            Cidr::V4(net) => self.v4.insert(Range::from(net), payload),
            Cidr::V6(net) => self.v6.insert(Range::from(net), payload),
        }
    }

    /// LPM lookup of textual address. Surrounding whitespace is ignored;
    /// unparsable text is a miss.
    pub fn search(&self, addr: &str) -> Option<&Arc<T>> {
        match addr.trim().parse::<IpAddr>() {
            Ok(ip) => self.search_addr(ip),
            Err(_) => {
                debug!("[SEARCH] unparsable address {addr:?}");
                None
            }
        }
    }

    pub fn search_addr(&self, addr: IpAddr) -> Option<&Arc<T>> {
        match normalize(addr) {
            IpAddr::V4(v4) => self.v4.search(v4_key(v4)),
            IpAddr::V6(v6) => self.v6.search(v6_key(v6)),
        }
    }

    pub fn v4(&self) -> &Ipv4Trie<T> {
        &self.v4
    }

    pub fn v6(&self) -> &Ipv6Trie<T> {
        &self.v6
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            v4_prefixes: self.v4.len(),
            v6_prefixes: self.v6.len(),
            v4_nodes: self.v4.node_count(),
            v6_nodes: self.v6.node_count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }
}
