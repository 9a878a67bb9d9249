//! A single knapsack instance together with its graph and engine.

use std::sync::Arc;

use crate::distribution::Distribution;
use crate::engine::DistributionEngine;
use crate::error::Result;
use crate::graph::SearchGraph;
use crate::item::{Item, ItemId};
use crate::params::{BehavioralParams, ProblemVariant};
use crate::registry::NodeId;
use crate::report::{self, DistributionReport};

/// Owns one search graph, its root, and a distribution engine bound to it.
#[derive(Debug)]
pub struct Analysis {
    graph: SearchGraph,
    root: NodeId,
    items: Vec<ItemId>,
    engine: DistributionEngine,
}

impl Analysis {
    /// Build the full search graph for `items` under `capacity`.
    pub fn new(items: Vec<Item>, capacity: u64) -> Result<Self> {
        let ids = items.iter().map(Item::id).collect();
        let mut graph = SearchGraph::new();
        let root = graph.build_root(items, capacity)?;
        Ok(Self {
            graph,
            root,
            items: ids,
            engine: DistributionEngine::new(),
        })
    }

    pub fn from_pairs(pairs: &[(u64, u64)], capacity: u64) -> Result<Self> {
        Self::new(Item::from_pairs(pairs)?, capacity)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn graph(&self) -> &SearchGraph {
        &self.graph
    }

    /// Item ids in the order they were supplied.
    pub fn items(&self) -> &[ItemId] {
        &self.items
    }

    pub fn engine(&self) -> &DistributionEngine {
        &self.engine
    }

    /// Terminal distribution from the root.
    pub fn distribution(
        &mut self,
        params: BehavioralParams,
        variant: ProblemVariant,
    ) -> Result<Arc<Distribution>> {
        self.engine
            .get_distribution(&self.graph, self.root, params, variant)
    }

    /// Terminal distribution from any node of this instance.
    pub fn distribution_at(
        &mut self,
        node: NodeId,
        params: BehavioralParams,
        variant: ProblemVariant,
    ) -> Result<Arc<Distribution>> {
        self.engine.get_distribution(&self.graph, node, params, variant)
    }

    /// Probability of reaching at least `threshold` in the decision variant.
    pub fn solve_decision(&mut self, params: BehavioralParams, threshold: u64) -> Result<f64> {
        self.engine
            .solve_decision(&self.graph, self.root, params, threshold)
    }

    /// Evaluate several parameter tuples from the root on the rayon pool.
    #[cfg(feature = "parallel")]
    pub fn par_distributions(
        &self,
        queries: &[(BehavioralParams, ProblemVariant)],
    ) -> Result<Vec<Arc<Distribution>>> {
        DistributionEngine::par_distributions(&self.graph, self.root, queries)
    }

    /// Report over `dist`, which must come from this instance's root.
    pub fn report<'a>(&'a self, dist: &'a Distribution) -> DistributionReport<'a> {
        DistributionReport::new(&self.graph, self.root, dist)
    }

    /// Inclusion vector of `terminal` over the supplied item order.
    pub fn inclusion_vector(&self, terminal: NodeId) -> Result<Vec<bool>> {
        report::inclusion_vector(&self.graph, self.root, terminal)
    }

    /// Drop every memoized distribution.
    pub fn clear_memo(&mut self) {
        self.engine.clear();
    }
}
