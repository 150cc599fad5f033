//! Binary prefix trie with longest-prefix-match search.
//!
//! One level per address bit, MSB first. A node at depth `d` stands for the
//! `d`-bit prefix spelled by the path from the root, so the deepest terminal
//! node seen on a walk is the longest matching prefix.

use crate::key::PrefixKey;
use crate::range::Range;
use log::trace;
use std::sync::Arc;

pub struct TrieNode<K, T> {
    pub is_terminal: bool,
    pub payload: Option<Arc<T>>,
    pub children: [Option<Box<TrieNode<K, T>>>; 2],
    /// Ranges ending at this node, sorted ascending by `last`.
    pub overflow_ranges: Vec<(Range<K>, Arc<T>)>,
}

impl<K, T> TrieNode<K, T> {
    fn new() -> Self {
        Self {
            is_terminal: false,
            payload: None,
            children: [None, None],
            overflow_ranges: Vec::new(),
        }
    }
}

impl<K: PrefixKey, T> TrieNode<K, T> {
    /// Interval lookup over `overflow_ranges`: the smallest `last >= addr`,
    /// accepted only if its `first <= addr`.
    pub fn range_fallback(&self, addr: K) -> Option<&Arc<T>> {
        if self.overflow_ranges.is_empty() {
            return None;
        }
        let idx = self
            .overflow_ranges
            .partition_point(|(range, _)| range.last < addr);
        match self.overflow_ranges.get(idx) {
            Some((range, payload)) if range.first <= addr => Some(payload),
            _ => None,
        }
    }

    /// Record `(range, payload)`. A node's path fixes its range, so every
    /// insert through [`BitTrie::insert`] carries the same range and the list
    /// never grows past one entry.
    fn push_overflow(&mut self, range: Range<K>, payload: Arc<T>) {
        match self.overflow_ranges.iter_mut().find(|(r, _)| *r == range) {
            Some(slot) => slot.1 = payload,
            None => self.overflow_ranges.push((range, payload)),
        }
    }
}

/// Bit trie over `K::WIDTH`-wide addresses.
pub struct BitTrie<K, T> {
    root: TrieNode<K, T>,
    prefixes: usize,
    nodes: usize,
}

pub type Ipv4Trie<T> = BitTrie<u32, T>;
pub type Ipv6Trie<T> = BitTrie<u128, T>;

impl<K: PrefixKey, T> Default for BitTrie<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PrefixKey, T> BitTrie<K, T> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            prefixes: 0,
            nodes: 1,
        }
    }

    pub fn root(&self) -> &TrieNode<K, T> {
        &self.root
    }

    /// Number of distinct prefixes stored.
    pub fn len(&self) -> usize {
        self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes == 0
    }

    /// Allocated nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Insert `range`; re-inserting an identical prefix replaces its payload.
    pub fn insert(&mut self, range: Range<K>, payload: Arc<T>) {
        trace!(
            "[INSERT] first={:x} last={:x} prefix_len={}",
            range.first,
            range.last,
            range.prefix_len
        );
        debug_assert!(range.prefix_len <= K::WIDTH);

        let nodes = &mut self.nodes;
        let mut node = &mut self.root;
        for depth in 0..range.prefix_len {
            let bit = range.first.bit(depth);
            node = &mut **node.children[bit].get_or_insert_with(|| {
                *nodes += 1;
                Box::new(TrieNode::new())
            });
        }

        if !node.is_terminal {
            self.prefixes += 1;
        }
        node.is_terminal = true;
        node.payload = Some(Arc::clone(&payload));

        if range.prefix_len < K::WIDTH {
            node.push_overflow(range, payload);
        }
    }

    /// Longest-prefix match for `addr`.
    pub fn search(&self, addr: K) -> Option<&Arc<T>> {
        let mut node = &self.root;
        let mut best = if node.is_terminal { Some(node) } else { None };

        for depth in 0..K::WIDTH {
            match node.children[addr.bit(depth)].as_deref() {
                Some(child) => node = child,
                None => break,
            }
            if node.is_terminal {
                best = Some(node);
            }
        }

        if let Some(payload) = best.and_then(|n| n.payload.as_ref()) {
            return Some(payload);
        }
        node.range_fallback(addr)
    }
}
