//! Probability mass over terminal nodes.

use std::collections::BTreeMap;

use crate::registry::NodeId;

/// Mapping from terminal node to the probability of ending there.
///
/// Stored in a `BTreeMap` so iteration order, and therefore every sum taken
/// over a distribution, is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    masses: BTreeMap<NodeId, f64>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// All mass on `node`.
    pub fn point(node: NodeId) -> Self {
        let mut masses = BTreeMap::new();
        masses.insert(node, 1.0);
        Self { masses }
    }

    /// Add `mass` to `node`, creating the entry if needed.
    #[inline]
    pub fn add(&mut self, node: NodeId, mass: f64) {
        *self.masses.entry(node).or_insert(0.0) += mass;
    }

    /// Add `scale` times every entry of `other`.
    pub fn add_scaled(&mut self, other: &Distribution, scale: f64) {
        for (&node, &mass) in &other.masses {
            self.add(node, scale * mass);
        }
    }

    /// Mass on `node`, zero if absent.
    pub fn get(&self, node: NodeId) -> f64 {
        self.masses.get(&node).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.masses.contains_key(&node)
    }

    pub fn total(&self) -> f64 {
        self.masses.values().sum()
    }

    /// Number of terminals carrying an entry, zero-mass entries included.
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.masses.iter().map(|(&node, &mass)| (node, mass))
    }

    /// Total mass on nodes accepted by `pred`.
    pub fn mass_where<F>(&self, mut pred: F) -> f64
    where
        F: FnMut(NodeId) -> bool,
    {
        self.masses
            .iter()
            .filter(|(node, _)| pred(**node))
            .map(|(_, mass)| mass)
            .sum()
    }

    /// Entries by descending mass, ties by ascending node id.
    pub fn sorted_desc(&self) -> Vec<(NodeId, f64)> {
        let mut out: Vec<(NodeId, f64)> = self.iter().collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }

    /// The `n` heaviest entries.
    pub fn top(&self, n: usize) -> Vec<(NodeId, f64)> {
        let mut out = self.sorted_desc();
        out.truncate(n);
        out
    }
}

impl FromIterator<(NodeId, f64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (NodeId, f64)>>(iter: I) -> Self {
        let mut dist = Self::new();
        for (node, mass) in iter {
            dist.add(node, mass);
        }
        dist
    }
}
