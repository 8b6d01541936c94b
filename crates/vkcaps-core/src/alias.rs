//! Alias chains as an explicit directed graph
//!
//! Each alias name has one outgoing edge to the name it stands for. Resolving
//! a name walks edges until a node carrying the wanted value is found. A walk
//! that revisits a node, or runs off the end of the graph, is `Unresolved`.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Outcome of resolving a name through its alias chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resolution<T> {
    Resolved(T),
    Unresolved,
}

impl<T> Resolution<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Resolution::Resolved(v) => Some(v),
            Resolution::Unresolved => None,
        }
    }

    pub fn as_ref(&self) -> Resolution<&T> {
        match self {
            Resolution::Resolved(v) => Resolution::Resolved(v),
            Resolution::Unresolved => Resolution::Unresolved,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AliasGraph {
    edges: HashMap<String, String>,
    order: Vec<String>,
}

impl AliasGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut graph = Self::new();
        for (alias, target) in pairs {
            graph.insert(alias, target);
        }
        graph
    }

    /// Add an edge. The first declaration of an alias wins.
    pub fn insert(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        let alias = alias.into();
        if !self.edges.contains_key(&alias) {
            self.order.push(alias.clone());
            self.edges.insert(alias, target.into());
        }
    }

    pub fn target(&self, name: &str) -> Option<&str> {
        self.edges.get(name).map(String::as_str)
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.edges.contains_key(name)
    }

    /// Alias names in insertion order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Walk from `name` until `lookup` yields a value. `name` itself is
    /// checked first, so a non-alias name resolves to its own value.
    pub fn resolve<T>(&self, name: &str, lookup: impl Fn(&str) -> Option<T>) -> Resolution<T> {
        let mut visited = HashSet::new();
        let mut current = name;
        loop {
            if !visited.insert(current) {
                return Resolution::Unresolved;
            }
            if let Some(value) = lookup(current) {
                return Resolution::Resolved(value);
            }
            match self.edges.get(current) {
                Some(next) => current = next.as_str(),
                None => return Resolution::Unresolved,
            }
        }
    }

    /// Last name on the chain: the name that is not itself an alias
    pub fn root<'a>(&'a self, name: &'a str) -> Resolution<&'a str> {
        let mut visited = HashSet::new();
        let mut current = name;
        while let Some(next) = self.edges.get(current) {
            if !visited.insert(current) {
                return Resolution::Unresolved;
            }
            current = next.as_str();
        }
        Resolution::Resolved(current)
    }

    /// Resolve every alias name at once. Results of shared chain suffixes
    /// are memoized, so each edge is walked once.
    pub fn resolve_all<T: Clone>(&self, lookup: impl Fn(&str) -> Option<T>) -> HashMap<String, Resolution<T>> {
        let mut memo: HashMap<String, Resolution<T>> = HashMap::new();
        for alias in &self.order {
            if memo.contains_key(alias) {
                continue;
            }
            let mut path: Vec<&str> = Vec::new();
            let mut on_path = HashSet::new();
            let mut current = alias.as_str();
            let result = loop {
                if let Some(known) = memo.get(current) {
                    break known.clone();
                }
                if !on_path.insert(current) {
                    break Resolution::Unresolved;
                }
                path.push(current);
                if let Some(value) = lookup(current) {
                    break Resolution::Resolved(value);
                }
                match self.edges.get(current) {
                    Some(next) => current = next.as_str(),
                    None => break Resolution::Unresolved,
                }
            };
            for node in path {
                memo.insert(node.to_string(), result.clone());
            }
        }
        memo.retain(|name, _| self.edges.contains_key(name));
        memo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(name: &str) -> Option<String> {
        match name {
            "VkPhysicalDeviceFoo" => Some("TAG_FOO".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_resolve_chain() {
        let graph = AliasGraph::from_pairs([
            ("VkPhysicalDeviceFooEXT", "VkPhysicalDeviceFooKHR"),
            ("VkPhysicalDeviceFooKHR", "VkPhysicalDeviceFoo"),
        ]);
        assert_eq!(
            graph.resolve("VkPhysicalDeviceFooEXT", values),
            Resolution::Resolved("TAG_FOO".to_string())
        );
        assert_eq!(graph.root("VkPhysicalDeviceFooEXT"), Resolution::Resolved("VkPhysicalDeviceFoo"));
    }

    #[test]
    fn test_resolution_matches_manual_hops() {
        let graph = AliasGraph::from_pairs([("A", "B"), ("B", "C"), ("C", "VkPhysicalDeviceFoo")]);
        let mut current = "A";
        while let Some(next) = graph.target(current) {
            current = next;
        }
        assert_eq!(graph.resolve("A", values).ok(), values(current));
        let all = graph.resolve_all(values);
        for alias in ["A", "B", "C"] {
            assert_eq!(all[alias], Resolution::Resolved("TAG_FOO".to_string()));
        }
    }

    #[test]
    fn test_cycle_is_unresolved() {
        let graph = AliasGraph::from_pairs([("A", "B"), ("B", "C"), ("C", "A")]);
        assert_eq!(graph.resolve("A", values), Resolution::Unresolved);
        assert_eq!(graph.root("B"), Resolution::Unresolved);
        let all = graph.resolve_all(values);
        assert_eq!(all.len(), 3);
        assert!(all.values().all(|r| *r == Resolution::Unresolved));
    }

    #[test]
    fn test_dangling_chain_is_unresolved() {
        let graph = AliasGraph::from_pairs([("A", "Missing")]);
        assert_eq!(graph.resolve("A", values), Resolution::Unresolved);
        assert_eq!(graph.root("A"), Resolution::Resolved("Missing"));
    }

    #[test]
    fn test_first_declaration_wins() {
        let mut graph = AliasGraph::new();
        graph.insert("A", "B");
        graph.insert("A", "C");
        assert_eq!(graph.target("A"), Some("B"));
        assert_eq!(graph.len(), 1);
    }
}
