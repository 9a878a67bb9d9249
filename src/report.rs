//! Human-readable rendering of a terminal distribution.
//!
//! Terminals are shown as 0/1 inclusion vectors over the items in the order
//! they were supplied to the root. Items left out of a terminal are matched to
//! root positions by (value, weight), earliest unused position first, so two
//! terminals that differ only in which copy of a repeated item they hold
//! render identically.

use std::fmt::{self, Write as _};

use crate::distribution::Distribution;
use crate::error::{ModelError, Result};
use crate::graph::SearchGraph;
use crate::params::{BehavioralParams, ProblemVariant};
use crate::registry::NodeId;
use crate::utils::is_unit_mass;

/// Terminals with mass at or below this are left out by default.
pub const DEFAULT_PRINT_THRESHOLD: f64 = 0.0001;

const SEPARATOR: &str = "-------------------------------------";

/// Which root items a terminal holds, in root order.
///
/// The terminal's remaining items are matched to root positions by
/// (value, weight); every unmatched position counts as included.
pub fn inclusion_vector(graph: &SearchGraph, root: NodeId, terminal: NodeId) -> Result<Vec<bool>> {
    let root_node = graph.node(root)?;
    let root_keys = root_node
        .remaining()
        .iter()
        .map(|&id| graph.item(id).map(|item| item.structural_key()))
        .collect::<Result<Vec<_>>>()?;

    let mut included = vec![true; root_keys.len()];
    for &id in graph.node(terminal)?.remaining() {
        let key = graph.item(id)?.structural_key();
        if let Some(slot) = root_keys
            .iter()
            .zip(included.iter())
            .position(|(&root_key, &inc)| inc && root_key == key)
        {
            included[slot] = false;
        }
    }
    Ok(included)
}

/// One printed terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeReport {
    pub node: NodeId,
    pub inclusion: Vec<bool>,
    pub value: u64,
    pub weight: u64,
    pub capacity: u64,
    pub mass: f64,
    pub optimal: bool,
}

impl NodeReport {
    pub fn new(graph: &SearchGraph, root: NodeId, terminal: NodeId, mass: f64) -> Result<Self> {
        let root_node = graph.node(root)?;
        let node = graph.node(terminal)?;
        Ok(Self {
            node: terminal,
            inclusion: inclusion_vector(graph, root, terminal)?,
            value: node.standing_value(),
            weight: root_node.capacity().saturating_sub(node.capacity()),
            capacity: root_node.capacity(),
            mass,
            optimal: root_node.summary().optimal_terminal_nodes.contains(&terminal),
        })
    }
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, &inc) in self.inclusion.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(if inc { "1" } else { "0" })?;
        }
        write!(
            f,
            "] - Σv: {}, Σw: {} / {} - {:.3}%",
            self.value,
            self.weight,
            self.capacity,
            100.0 * self.mass
        )?;
        if self.optimal {
            f.write_str(" ***")?;
        }
        Ok(())
    }
}

/// Full report for a root and a distribution computed from it.
#[derive(Debug, Clone)]
pub struct DistributionReport<'a> {
    graph: &'a SearchGraph,
    root: NodeId,
    dist: &'a Distribution,
    params: Option<BehavioralParams>,
    variant: ProblemVariant,
    print_threshold: f64,
}

impl<'a> DistributionReport<'a> {
    pub fn new(graph: &'a SearchGraph, root: NodeId, dist: &'a Distribution) -> Self {
        Self {
            graph,
            root,
            dist,
            params: None,
            variant: ProblemVariant::Optimisation,
            print_threshold: DEFAULT_PRINT_THRESHOLD,
        }
    }

    pub fn with_params(mut self, params: BehavioralParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_variant(mut self, variant: ProblemVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Only terminals with mass strictly above `threshold` are listed.
    pub fn with_print_threshold(mut self, threshold: f64) -> Self {
        self.print_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.print_threshold > 0.0 && self.print_threshold <= 1.0) {
            return Err(ModelError::InvalidPrintThreshold(self.print_threshold));
        }
        let total = self.dist.total();
        if !is_unit_mass(total) {
            return Err(ModelError::InvalidDistribution(total));
        }
        Ok(())
    }

    /// Listed terminals, heaviest first.
    pub fn rows(&self) -> Result<Vec<NodeReport>> {
        self.validate()?;
        self.dist
            .sorted_desc()
            .into_iter()
            .filter(|&(_, mass)| mass > self.print_threshold)
            .map(|(node, mass)| NodeReport::new(self.graph, self.root, node, mass))
            .collect()
    }

    pub fn render(&self) -> Result<String> {
        let rows = self.rows()?;
        let root = self.graph.node(self.root)?;
        let items = root
            .remaining()
            .iter()
            .map(|&id| self.graph.item(id).map(ToString::to_string))
            .collect::<Result<Vec<_>>>()?;

        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_into(&mut out, &rows, &items, root.capacity());
        Ok(out)
    }

    fn write_into(
        &self,
        out: &mut String,
        rows: &[NodeReport],
        items: &[String],
        capacity: u64,
    ) -> fmt::Result {
        writeln!(out, "Inputs\n")?;
        if let Some(params) = &self.params {
            writeln!(out, "Parameters: {params}\n")?;
        }
        writeln!(out, "Knapsack Problem Variant: {}\n", self.variant)?;
        writeln!(out, "Items: {}\n", items.join(", "))?;
        writeln!(out, "Budget: {capacity}\n")?;
        writeln!(out, "{SEPARATOR}\n")?;
        writeln!(out, "Output\n")?;
        writeln!(out, "Terminal Nodes (*** for optimal):")?;
        for row in rows {
            writeln!(out, "{row}")?;
        }
        writeln!(out, "\nTotal Distribution: {:?}\n", self.dist.total())?;
        writeln!(out, "Number of Terminal Nodes: {}\n", self.dist.len())
    }
}
