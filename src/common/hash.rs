//! Consistent hashing for shardcache
//!
//! - SHA-256 ring positions (first 4 bytes, big-endian)
//! - Virtual nodes per physical node to smooth load
//! - `SharedRing` for lookups concurrent with membership changes

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

/// Ring positions owned by each node unless configured otherwise.
pub const DEFAULT_VIRTUAL_NODES: usize = 150;

/// Hash a string onto the ring: SHA-256, first 4 bytes big-endian.
pub fn ring_hash(input: &str) -> u32 {
    let digest = Sha256::digest(input.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

fn virtual_key(node: &str, replica: usize) -> String {
    format!("{}:{}", node, replica)
}

/// Consistent hash ring mapping keys to node names.
///
/// Entries are kept sorted by `(position, node)`. If two nodes land on the
/// same position both entries stay, and the smaller node name wins lookups at
/// that position, so the ring never depends on insertion order.
#[derive(Debug, Clone)]
pub struct HashRing {
    entries: Vec<(u32, Arc<str>)>,
    nodes: BTreeSet<Arc<str>>,
    virtual_nodes: usize,
}

impl HashRing {
    pub fn new() -> Self {
        Self::with_virtual_nodes(DEFAULT_VIRTUAL_NODES)
    }

    pub fn with_virtual_nodes(virtual_nodes: usize) -> Self {
        Self {
            entries: Vec::new(),
            nodes: BTreeSet::new(),
            virtual_nodes,
        }
    }

    /// Build a ring from a node list (duplicates ignored).
    pub fn from_nodes<I, S>(nodes: I, virtual_nodes: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ring = Self::with_virtual_nodes(virtual_nodes);
        for node in nodes {
            ring.add_node(node.as_ref());
        }
        ring
    }

    /// Add a node and its virtual replicas. No-op if already present.
    pub fn add_node(&mut self, node: &str) {
        if self.nodes.contains(node) {
            return;
        }

        let name: Arc<str> = Arc::from(node);
        self.nodes.insert(name.clone());
        self.entries.reserve(self.virtual_nodes);
        for i in 0..self.virtual_nodes {
            let pos = ring_hash(&virtual_key(node, i));
            self.entries.push((pos, name.clone()));
        }
        self.entries.sort_unstable();

        tracing::debug!(node, entries = self.entries.len(), "added node to ring");
    }

    /// Remove a node and all its virtual replicas. No-op if absent.
    pub fn remove_node(&mut self, node: &str) {
        if !self.nodes.remove(node) {
            return;
        }

        self.entries.retain(|(_, owner)| owner.as_ref() != node);

        tracing::debug!(node, entries = self.entries.len(), "removed node from ring");
    }

    /// Owner of `key`: first position >= hash(key), wrapping to the start.
    /// `None` when the ring is empty.
    pub fn get_node(&self, key: &str) -> Option<&str> {
        self.owner(key).map(|node| node.as_ref())
    }

    fn owner(&self, key: &str) -> Option<&Arc<str>> {
        if self.entries.is_empty() {
            return None;
        }

        let hash = ring_hash(key);
        let idx = self.entries.partition_point(|(pos, _)| *pos < hash);
        let idx = if idx == self.entries.len() { 0 } else { idx };
        Some(&self.entries[idx].1)
    }

    /// Known node names in lexicographic order.
    pub fn nodes(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.to_string()).collect()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total number of ring entries (virtual nodes).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn virtual_nodes(&self) -> usize {
        self.virtual_nodes
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to a ring guarded by a read/write lock.
///
/// Lookups take the read lock and run concurrently; membership changes take
/// the write lock.
#[derive(Debug, Clone, Default)]
pub struct SharedRing {
    inner: Arc<RwLock<HashRing>>,
}

impl SharedRing {
    pub fn new(ring: HashRing) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ring)),
        }
    }

    // A panic mid-mutation cannot leave entries and node set disagreeing in a
    // way lookups care about, so poisoning is ignored.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashRing> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashRing> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_node(&self, node: &str) {
        self.write().add_node(node);
    }

    pub fn remove_node(&self, node: &str) {
        self.write().remove_node(node);
    }

    pub fn get_node(&self, key: &str) -> Option<Arc<str>> {
        self.read().owner(key).cloned()
    }

    pub fn nodes(&self) -> Vec<String> {
        self.read().nodes()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.read().contains(node)
    }

    pub fn node_count(&self) -> usize {
        self.read().node_count()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Copy of the current ring state.
    pub fn snapshot(&self) -> HashRing {
        self.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn three_nodes() -> HashRing {
        HashRing::from_nodes(["node1", "node2", "node3"], DEFAULT_VIRTUAL_NODES)
    }

    #[test]
    fn test_ring_hash_is_sha256_prefix() {
        // sha256("") = e3b0c442...
        assert_eq!(ring_hash(""), 0xe3b0_c442);
        assert_eq!(ring_hash("node1:0"), ring_hash("node1:0"));
        assert_ne!(ring_hash("node1:0"), ring_hash("node1:1"));
    }

    #[test]
    fn test_empty_ring() {
        let ring = HashRing::new();
        assert_eq!(ring.get_node("test-key"), None);
        assert!(ring.nodes().is_empty());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_single_node() {
        let mut ring = HashRing::new();
        ring.add_node("node1");

        for key in ["key1", "key2", "key3", "key4", "key5"] {
            assert_eq!(ring.get_node(key), Some("node1"));
        }
        assert_eq!(ring.nodes(), vec!["node1"]);
        assert_eq!(ring.len(), DEFAULT_VIRTUAL_NODES);
    }

    #[test]
    fn test_nodes_sorted() {
        let ring = HashRing::from_nodes(["node3", "node1", "node2"], DEFAULT_VIRTUAL_NODES);
        assert_eq!(ring.nodes(), vec!["node1", "node2", "node3"]);
        assert_eq!(ring.len(), 3 * DEFAULT_VIRTUAL_NODES);
    }

    #[test]
    fn test_key_consistency() {
        let ring = three_nodes();
        let first = ring.get_node("consistent-test-key").map(str::to_owned);
        for _ in 0..10 {
            assert_eq!(
                ring.get_node("consistent-test-key").map(str::to_owned),
                first
            );
        }
    }

    #[test]
    fn test_insertion_order_independent() {
        let a = HashRing::from_nodes(["node1", "node2", "node3"], DEFAULT_VIRTUAL_NODES);
        let b = HashRing::from_nodes(["node3", "node2", "node1"], DEFAULT_VIRTUAL_NODES);

        assert_eq!(a.entries, b.entries);
        for i in 0..500 {
            let key = format!("key-{}", i);
            assert_eq!(a.get_node(&key), b.get_node(&key));
        }
    }

    #[test]
    fn test_rebuild_after_remove_matches_fresh_ring() {
        let mut ring = three_nodes();
        ring.add_node("node4");
        ring.remove_node("node4");

        let fresh = three_nodes();
        for i in 0..500 {
            let key = format!("key-{}", i);
            assert_eq!(ring.get_node(&key), fresh.get_node(&key));
        }
    }

    #[test]
    fn test_node_removal() {
        let mut ring = three_nodes();
        ring.remove_node("node2");

        assert_eq!(ring.nodes(), vec!["node1", "node3"]);
        assert_eq!(ring.len(), 2 * DEFAULT_VIRTUAL_NODES);
        for i in 0..1000 {
            let node = ring.get_node(&format!("key-{}", i)).unwrap();
            assert!(node == "node1" || node == "node3", "mapped to {}", node);
        }
    }

    #[test]
    fn test_removal_only_moves_keys_of_removed_node() {
        let before = three_nodes();
        let mut after = three_nodes();
        after.remove_node("node2");

        for i in 0..1000 {
            let key = format!("key-{}", i);
            let old = before.get_node(&key).unwrap();
            if old != "node2" {
                assert_eq!(after.get_node(&key), Some(old));
            }
        }
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut ring = HashRing::new();
        ring.add_node("node1");
        ring.add_node("node1");

        assert_eq!(ring.nodes(), vec!["node1"]);
        assert_eq!(ring.len(), DEFAULT_VIRTUAL_NODES);
    }

    #[test]
    fn test_remove_nonexistent_is_noop() {
        let mut ring = HashRing::new();
        ring.add_node("node1");
        let before = ring.entries.clone();

        ring.remove_node("nonexistent");

        assert_eq!(ring.nodes(), vec!["node1"]);
        assert_eq!(ring.entries, before);
    }

    #[test]
    fn test_remove_last_node_empties_ring() {
        let mut ring = HashRing::new();
        ring.add_node("node1");
        ring.remove_node("node1");

        assert_eq!(ring.get_node("x"), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_wraps_past_highest_position() {
        let ring = HashRing::from_nodes(["a", "b"], 4);
        let lowest = ring.entries.first().unwrap().1.clone();
        let highest = ring.entries.last().unwrap().0;

        // Find a key hashing beyond every position; it must wrap to the start.
        let key = (0..100_000)
            .map(|i| format!("wrap-{}", i))
            .find(|k| ring_hash(k) > highest)
            .expect("some key hashes past the last position");
        assert_eq!(ring.get_node(&key), Some(lowest.as_ref()));
    }

    #[test]
    fn test_exact_position_returns_its_owner() {
        let ring = HashRing::from_nodes(["a", "b", "c"], 8);
        // "b:3" hashes exactly onto one of b's positions.
        assert_eq!(ring.get_node("b:3"), Some("b"));
    }

    #[test]
    fn test_custom_virtual_nodes() {
        let ring = HashRing::from_nodes(["node1", "node2"], 10);
        assert_eq!(ring.virtual_nodes(), 10);
        assert_eq!(ring.len(), 20);
    }

    #[test]
    fn test_distribution() {
        let ring = three_nodes();
        let total = 1000;
        let mut counts: HashMap<String, usize> = HashMap::new();

        for i in 0..total {
            let node = ring.get_node(&format!("key-{}", i)).unwrap();
            *counts.entry(node.to_string()).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for (node, count) in counts {
            let pct = count as f64 / total as f64 * 100.0;
            assert!(
                (10.0..=60.0).contains(&pct),
                "poor distribution for {}: {:.2}%",
                node,
                pct
            );
        }
    }

    #[test]
    fn test_shared_ring_concurrent_lookups() {
        let ring = SharedRing::new(three_nodes());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ring = ring.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        assert!(ring.get_node(&format!("key-{}-{}", t, i)).is_some());
                    }
                })
            })
            .collect();

        ring.add_node("node4");
        ring.remove_node("node4");

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(ring.node_count(), 3);
        assert_eq!(ring.len(), 3 * DEFAULT_VIRTUAL_NODES);
    }
}
