//! Memoized distribution engine.
//!
//! For a node and a parameter tuple the engine computes the probability of
//! ending in each terminal node below it. Mass is placed in three parts:
//! 1. Brute-force search over the full terminal set, weighted by (1 − δ).
//! 2. Brute-force search over the non-dominated terminals, weighted by δ.
//! 3. Whatever is left is passed on to the children by adding one item and
//!    continuing, in proportion to each item's transformed weight.
//!
//! Evaluation walks the reachable sub-DAG in post-order (deepest nodes first)
//! so every child distribution is already memoized when its parent needs it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::distribution::Distribution;
use crate::error::{ModelError, Result};
use crate::graph::SearchGraph;
use crate::params::{BehavioralParams, ParamsKey, ProblemVariant};
use crate::registry::{NodeId, SearchNode};
use crate::utils::{is_unit_mass, log_normaliser, log_transformed_weight, search_exponent};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Memo key: a node under one parameter tuple and one problem variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct DistributionKey {
    node: NodeId,
    params: ParamsKey,
    variant: ProblemVariant,
}

impl DistributionKey {
    fn new(node: NodeId, params: &BehavioralParams, variant: ProblemVariant) -> Self {
        Self {
            node,
            params: params.key(),
            variant,
        }
    }
}

/// Computes and caches terminal distributions over a [`SearchGraph`].
///
/// The memo is keyed by node id, so an engine must only ever be used with the
/// graph it was first used with. [`crate::Analysis`] pairs the two.
///
/// ```
/// use knapsack_choice::{AnalysisBuilder, BehavioralParams, ProblemVariant};
///
/// let mut analysis = AnalysisBuilder::new()
///     .items(&[(12, 7), (8, 5), (14, 8), (9, 4)])
///     .capacity(16)
///     .build()
///     .unwrap();
/// let params = BehavioralParams::new(0.7, 0.75, 0.4, 0.5).unwrap();
/// let dist = analysis.distribution(params, ProblemVariant::Optimisation).unwrap();
/// assert_eq!(dist.len(), 4);
/// assert!((dist.total() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Default)]
pub struct DistributionEngine {
    memo: HashMap<DistributionKey, Arc<Distribution>>,
}

impl DistributionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Terminal distribution of `node` under `params` for `variant`.
    ///
    /// A terminal node returns all mass on itself. Results for non-terminal
    /// nodes are memoized, and repeated calls return the same `Arc`.
    ///
    /// # Errors
    /// Parameter validation against the variant, an unknown node, or a node
    /// where every candidate item has zero transformed weight.
    ///
    /// # Panics
    /// Panics if a computed distribution does not sum to one within
    /// [`crate::utils::MASS_TOLERANCE`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, graph, node), fields(node = %node))
    )]
    pub fn get_distribution(
        &mut self,
        graph: &SearchGraph,
        node: NodeId,
        params: BehavioralParams,
        variant: ProblemVariant,
    ) -> Result<Arc<Distribution>> {
        params.validate_for(variant)?;
        if graph.node(node)?.is_terminal() {
            return Ok(Arc::new(Distribution::point(node)));
        }

        let key = DistributionKey::new(node, &params, variant);
        if let Some(hit) = self.memo.get(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!("memo hit");
            return Ok(Arc::clone(hit));
        }

        if let ProblemVariant::Decision { .. } = variant {
            if params.alpha() != 0.0 {
                for delta in [0.0, 1.0] {
                    self.evaluate(graph, node, BehavioralParams::baseline(delta), variant)?;
                }
            }
        }
        self.evaluate(graph, node, params, variant)
    }

    /// Probability of finishing with accumulated value at least `threshold`
    /// when solving the decision variant from `node`.
    pub fn solve_decision(
        &mut self,
        graph: &SearchGraph,
        node: NodeId,
        params: BehavioralParams,
        threshold: u64,
    ) -> Result<f64> {
        let variant = ProblemVariant::Decision { threshold };
        let dist = self.get_distribution(graph, node, params, variant)?;
        Ok(witness_mass(graph, &dist, threshold))
    }

    /// Evaluate many parameter tuples for `node` concurrently.
    ///
    /// Each worker owns a private memo, so no state is shared between tuples.
    /// Results come back in the order of `queries`.
    #[cfg(feature = "parallel")]
    pub fn par_distributions(
        graph: &SearchGraph,
        node: NodeId,
        queries: &[(BehavioralParams, ProblemVariant)],
    ) -> Result<Vec<Arc<Distribution>>> {
        #[cfg(feature = "tracing")]
        let span = tracing::info_span!("par_distributions", queries = queries.len());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        queries
            .par_iter()
            .map(|&(params, variant)| {
                DistributionEngine::new().get_distribution(graph, node, params, variant)
            })
            .collect()
    }

    /// Number of memoized (node, parameters, variant) entries.
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    pub fn clear(&mut self) {
        self.memo.clear();
    }

    /// Fill the memo for every non-terminal node reachable from `start`.
    fn evaluate(
        &mut self,
        graph: &SearchGraph,
        start: NodeId,
        params: BehavioralParams,
        variant: ProblemVariant,
    ) -> Result<Arc<Distribution>> {
        let order = graph.post_order(start)?;

        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "evaluate",
            node = %start,
            nodes = order.len(),
            alpha = params.alpha(),
            delta = params.delta()
        );
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        for id in order {
            let key = DistributionKey::new(id, &params, variant);
            if self.memo.contains_key(&key) {
                continue;
            }
            let dist = self.node_distribution(graph, graph.node(id)?, &params, variant)?;
            self.memo.insert(key, Arc::new(dist));
        }

        let key = DistributionKey::new(start, &params, variant);
        Ok(Arc::clone(self.memoized(&key)))
    }

    fn node_distribution(
        &self,
        graph: &SearchGraph,
        node: &SearchNode,
        params: &BehavioralParams,
        variant: ProblemVariant,
    ) -> Result<Distribution> {
        let mut dist = Distribution::new();
        match variant {
            ProblemVariant::Optimisation => search_for_optimum(&mut dist, node, params),
            ProblemVariant::Decision { threshold } => {
                if params.alpha() != 0.0 {
                    self.search_for_witness(&mut dist, graph, node, params, variant, threshold);
                }
            }
        }

        let residual = 1.0 - dist.total();
        if residual != 0.0 {
            self.continue_search(&mut dist, graph, node, params, variant, residual)?;
        }

        let total = dist.total();
        if !is_unit_mass(total) {
            panic!("distribution at node {} sums to {total}, not 1", node.id());
        }
        Ok(dist)
    }

    /// Brute-force placement for the decision variant, scaled from the
    /// success rate of an unbiased item-by-item searcher.
    fn search_for_witness(
        &self,
        dist: &mut Distribution,
        graph: &SearchGraph,
        node: &SearchNode,
        params: &BehavioralParams,
        variant: ProblemVariant,
        threshold: u64,
    ) {
        let exponent = search_exponent(params.alpha());
        let parts = [(1.0 - params.delta(), 0.0), (params.delta(), 1.0)];
        for (share, baseline_delta) in parts {
            let key = DistributionKey::new(node.id(), &BehavioralParams::baseline(baseline_delta), variant);
            let baseline = self.memoized(&key);
            let success = witness_mass(graph, baseline, threshold);
            if success <= 0.0 {
                continue;
            }
            let placed = share * success.powf(exponent);
            for (terminal, mass) in baseline.iter() {
                if reaches(graph, terminal, threshold) {
                    dist.add(terminal, placed * mass / success);
                }
            }
        }
    }

    /// Hand `residual` to the children in proportion to transformed weight.
    fn continue_search(
        &self,
        dist: &mut Distribution,
        graph: &SearchGraph,
        node: &SearchNode,
        params: &BehavioralParams,
        variant: ProblemVariant,
        residual: f64,
    ) -> Result<()> {
        let non_dominated = &node.summary().non_dominated_items;
        let mut weighted = Vec::with_capacity(node.children().len());
        for &(item_id, child) in node.children() {
            let item = graph.item(item_id)?;
            let log_weight = log_transformed_weight(
                item.density(),
                item.weight() as f64,
                params.beta(),
                params.gamma(),
            );
            weighted.push((child, log_weight, non_dominated.contains(&item_id)));
        }

        let delta = params.delta();
        let degenerate = || ModelError::DegenerateWeights(node.id());
        let among_all = if delta < 1.0 {
            Some(log_normaliser(weighted.iter().map(|&(_, log, _)| log)).ok_or_else(degenerate)?)
        } else {
            None
        };
        let among_non_dominated = if delta > 0.0 {
            Some(
                log_normaliser(weighted.iter().filter(|entry| entry.2).map(|&(_, log, _)| log))
                    .ok_or_else(degenerate)?,
            )
        } else {
            None
        };

        for (child, log_weight, is_non_dominated) in weighted {
            let mut scale = 0.0;
            if let Some((max, sum)) = among_all {
                scale += residual * (1.0 - delta) * (log_weight - max).exp() / sum;
            }
            if let (true, Some((max, sum))) = (is_non_dominated, among_non_dominated) {
                scale += residual * delta * (log_weight - max).exp() / sum;
            }
            self.push_child(dist, graph, child, params, variant, scale);
        }
        Ok(())
    }

    fn push_child(
        &self,
        dist: &mut Distribution,
        graph: &SearchGraph,
        child: NodeId,
        params: &BehavioralParams,
        variant: ProblemVariant,
        scale: f64,
    ) {
        let is_terminal = graph.node(child).map_or(true, SearchNode::is_terminal);
        if is_terminal {
            dist.add(child, scale);
        } else {
            let key = DistributionKey::new(child, params, variant);
            dist.add_scaled(self.memoized(&key), scale);
        }
    }

    /// # Panics
    /// Panics if `key` has not been evaluated, which would mean the
    /// post-order was violated.
    fn memoized(&self, key: &DistributionKey) -> &Arc<Distribution> {
        self.memo
            .get(key)
            .unwrap_or_else(|| panic!("node {} evaluated before its descendants", key.node))
    }
}

/// Brute-force placement for the optimisation variant.
fn search_for_optimum(dist: &mut Distribution, node: &SearchNode, params: &BehavioralParams) {
    let summary = node.summary();
    let exponent = search_exponent(params.alpha());
    spread_evenly(
        dist,
        &summary.optimal_terminal_nodes,
        (1.0 - params.delta()) * ((1.0 - summary.terminal_nodes.len() as f64) * exponent).exp(),
    );
    spread_evenly(
        dist,
        &summary.non_dominated_optimal_terminal_nodes,
        params.delta()
            * ((1.0 - summary.non_dominated_terminal_nodes.len() as f64) * exponent).exp(),
    );
}

fn spread_evenly(dist: &mut Distribution, targets: &BTreeSet<NodeId>, mass: f64) {
    if targets.is_empty() {
        return;
    }
    let each = mass / targets.len() as f64;
    for &target in targets {
        dist.add(target, each);
    }
}

fn reaches(graph: &SearchGraph, node: NodeId, threshold: u64) -> bool {
    graph
        .node(node)
        .map_or(false, |n| n.standing_value() >= threshold)
}

/// Mass of `dist` on terminals whose accumulated value reaches `threshold`.
pub fn witness_mass(graph: &SearchGraph, dist: &Distribution, threshold: u64) -> f64 {
    dist.mass_where(|node| reaches(graph, node, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;

    fn paper_graph() -> (SearchGraph, NodeId) {
        let mut graph = SearchGraph::new();
        let items = Item::from_pairs(&[(12, 7), (8, 5), (14, 8), (9, 4)]).unwrap();
        let root = graph.build_root(items, 16).unwrap();
        (graph, root)
    }

    fn params(a: f64, b: f64, g: f64, d: f64) -> BehavioralParams {
        BehavioralParams::new(a, b, g, d).unwrap()
    }

    #[test]
    fn terminal_node_is_a_point_mass() {
        let mut graph = SearchGraph::new();
        let items = Item::from_pairs(&[(3, 5), (4, 6)]).unwrap();
        let root = graph.build_root(items, 4).unwrap();
        let mut engine = DistributionEngine::new();
        let dist = engine
            .get_distribution(&graph, root, params(0.5, 0.0, 0.0, 0.0), ProblemVariant::Optimisation)
            .unwrap();
        assert_eq!(*dist, Distribution::point(root));
        assert_eq!(engine.memo_len(), 0);
    }

    #[test]
    fn paper_instance_optimum_mass() {
        let (graph, root) = paper_graph();
        let mut engine = DistributionEngine::new();
        let dist = engine
            .get_distribution(&graph, root, params(0.7, 0.75, 0.4, 0.5), ProblemVariant::Optimisation)
            .unwrap();
        let top = dist.top(4);
        let expected = [
            0.7487276377548032,
            0.1534085161146231,
            0.08380264655104012,
            0.014061199579533638,
        ];
        for ((_, mass), want) in top.iter().zip(expected) {
            assert!((mass - want).abs() < 1e-12, "{mass} != {want}");
        }
        let optimal = graph.node(root).unwrap().summary().optimal_terminal_nodes.clone();
        assert!(optimal.contains(&top[0].0));
    }

    #[test]
    fn memo_hit_returns_same_arc() {
        let (graph, root) = paper_graph();
        let mut engine = DistributionEngine::new();
        let p = params(0.6, 0.2, 0.2, 0.3);
        let first = engine.get_distribution(&graph, root, p, ProblemVariant::Optimisation).unwrap();
        let entries = engine.memo_len();
        let second = engine.get_distribution(&graph, root, p, ProblemVariant::Optimisation).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(engine.memo_len(), entries);
        engine.clear();
        assert_eq!(engine.memo_len(), 0);
    }

    #[test]
    fn full_search_without_rationality_hits_the_optimum() {
        let (graph, root) = paper_graph();
        let mut engine = DistributionEngine::new();
        let dist = engine
            .get_distribution(&graph, root, params(1.0, 0.3, 0.3, 0.0), ProblemVariant::Optimisation)
            .unwrap();
        let optimal = &graph.node(root).unwrap().summary().optimal_terminal_nodes;
        let on_optimum = dist.mass_where(|node| optimal.contains(&node));
        assert!((on_optimum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn decision_matches_known_witness_rate() {
        let (graph, root) = paper_graph();
        let mut engine = DistributionEngine::new();
        let p = engine
            .solve_decision(&graph, root, params(0.7, 0.75, 0.4, 0.5), 27)
            .unwrap();
        assert!((p - 0.9001191238392088).abs() < 1e-12, "{p}");
    }

    #[test]
    fn zero_threshold_is_always_met() {
        let (graph, root) = paper_graph();
        let mut engine = DistributionEngine::new();
        for alpha in [0.0, 0.4, 1.0] {
            let p = engine
                .solve_decision(&graph, root, params(alpha, 0.5, 0.5, 0.5), 0)
                .unwrap();
            assert!((p - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn optimisation_rejects_zero_alpha() {
        let (graph, root) = paper_graph();
        let mut engine = DistributionEngine::new();
        let err = engine
            .get_distribution(&graph, root, params(0.0, 0.0, 0.0, 0.0), ProblemVariant::Optimisation)
            .unwrap_err();
        assert!(matches!(err, ModelError::ParameterOutOfRange { name: "alpha", .. }));
    }

    #[test]
    fn zero_value_items_with_density_preference_are_degenerate() {
        let mut graph = SearchGraph::new();
        let items = Item::from_pairs(&[(0, 1), (0, 2), (0, 3)]).unwrap();
        let root = graph.build_root(items, 10).unwrap();
        let mut engine = DistributionEngine::new();
        let err = engine
            .get_distribution(
                &graph,
                root,
                params(0.0, 0.5, 0.0, 0.0),
                ProblemVariant::Decision { threshold: 1 },
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::DegenerateWeights(_)));
    }

    #[test]
    fn strong_density_preference_keeps_unit_mass() {
        let mut graph = SearchGraph::new();
        let items = Item::from_pairs(&[(100, 1), (50, 1), (3, 1)]).unwrap();
        let root = graph.build_root(items, 2).unwrap();
        let mut engine = DistributionEngine::new();
        let dist = engine
            .get_distribution(&graph, root, params(0.5, 0.996, 0.0, 0.0), ProblemVariant::Optimisation)
            .unwrap();
        assert!((dist.total() - 1.0).abs() < 1e-9);
        let (best, mass) = dist.top(1)[0];
        assert_eq!(graph.node(best).unwrap().standing_value(), 150);
        assert!(mass > 0.999, "{mass}");
    }

    #[test]
    fn strong_weight_preference_keeps_unit_mass() {
        let mut graph = SearchGraph::new();
        let items = Item::from_pairs(&[(10, 20), (10, 30), (10, 40)]).unwrap();
        let root = graph.build_root(items, 60).unwrap();
        let mut engine = DistributionEngine::new();
        for delta in [0.0, 0.5, 1.0] {
            let dist = engine
                .get_distribution(&graph, root, params(0.5, 0.0, 0.995, delta), ProblemVariant::Optimisation)
                .unwrap();
            assert!((dist.total() - 1.0).abs() < 1e-9);
            assert!(dist.iter().all(|(_, mass)| mass.is_finite() && mass >= 0.0));
        }
    }
}
