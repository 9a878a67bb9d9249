//! Error taxonomy for model construction and evaluation.
//!
//! Every variant is a caller-side fault: malformed input, a parameter outside
//! its declared range, or a call made in the wrong order. Internal
//! consistency faults (probability mass not summing to one, a child whose
//! optimal value exceeds its parent's) are not represented here; they panic,
//! because they can only arise from a defect in the crate itself.

use thiserror::Error;

use crate::item::ItemId;
use crate::registry::NodeId;

/// Errors surfaced by the knapsack choice model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("item value must be non-negative, is {0}")]
    NegativeValue(i64),

    #[error("item weight must be strictly positive, is {0}")]
    InvalidWeight(i64),

    #[error("knapsack capacity must be non-negative, is {0}")]
    NegativeCapacity(i64),

    #[error("length of values and weights must be equal, got {values} (values) and {weights} (weights)")]
    LengthMismatch { values: usize, weights: usize },

    #[error("parameter `{name}` must be {expected}, is {value}")]
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("parameter `{name}` must be a finite number, is {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    #[error("total item value overflows u64")]
    ValueOverflow,

    #[error("a value threshold is required for the decision problem")]
    MissingThreshold,

    #[error("a value threshold must not be given for the optimisation problem")]
    UnexpectedThreshold,

    #[error("value threshold must be non-negative, is {0}")]
    NegativeThreshold(i64),

    #[error("item {0} cannot be dominated by itself")]
    SelfDominance(ItemId),

    #[error("dominating items of item {0} have not been set yet")]
    DominanceNotSet(ItemId),

    #[error("item {0} is not registered with this search graph")]
    UnknownItem(ItemId),

    #[error("node {0} is not registered with this search graph")]
    UnknownNode(NodeId),

    #[error("every feasible item at node {0} has zero transformed weight")]
    DegenerateWeights(NodeId),

    #[error("print threshold must be in (0, 1], is {0}")]
    InvalidPrintThreshold(f64),

    #[error("distribution must sum to 1, sums to {0}")]
    InvalidDistribution(f64),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ModelError>;
