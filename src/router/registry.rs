//! Node name → client binding

use crate::backend::DynBackend;
use std::collections::HashMap;
use std::fmt;

/// Clients keyed by node name.
///
/// Built once before the router is constructed; the router only ever reads it.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    clients: HashMap<String, DynBackend>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `node` to `client`, replacing any previous binding.
    pub fn with(mut self, node: impl Into<String>, client: DynBackend) -> Self {
        self.insert(node, client);
        self
    }

    pub fn insert(&mut self, node: impl Into<String>, client: DynBackend) {
        self.clients.insert(node.into(), client);
    }

    pub fn get(&self, node: &str) -> Option<&DynBackend> {
        self.clients.get(node)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.clients.contains_key(node)
    }

    /// Bound node names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynBackend)> {
        self.clients.iter().map(|(name, client)| (name.as_str(), client))
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, DynBackend)> for NodeRegistry {
    fn from_iter<I: IntoIterator<Item = (S, DynBackend)>>(iter: I) -> Self {
        let mut registry = Self::new();
        for (node, client) in iter {
            registry.insert(node, client);
        }
        registry
    }
}

impl fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort();
        f.debug_struct("NodeRegistry").field("nodes", &names).finish()
    }
}
