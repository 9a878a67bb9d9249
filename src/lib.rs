//! Knapsack Choice
//!
//! This crate models how a boundedly rational decision-maker picks items for
//! a 0/1 knapsack, and computes the probability of ending at each feasible
//! terminal selection.
//!
//! ## Core idea
//! 1. Every reachable state (remaining items, remaining capacity, value so
//!    far, items chosen) is a node of a deduplicated DAG grown from the root.
//! 2. Each node records its terminal descendants, its optimum, and which
//!    items and terminals survive dominance filtering.
//! 3. The [`DistributionEngine`] mixes two search strategies per node:
//!    a brute-force jump to the answer, whose success decays with the size of
//!    the search space, and item-by-item continuation biased by density and
//!    weight preferences.
//!
//! Four parameters steer the mix: α (brute-force propensity), β (density
//! preference), γ (weight preference) and δ (how often dominated items are
//! ignored).
//!
//! ## Quick start
//! ```
//! use knapsack_choice::{AnalysisBuilder, BehavioralParams, ProblemVariant};
//!
//! let mut analysis = AnalysisBuilder::new()
//!     .items(&[(12, 7), (8, 5), (14, 8), (9, 4)])
//!     .capacity(16)
//!     .build()
//!     .unwrap();
//!
//! let params = BehavioralParams::new(0.7, 0.75, 0.4, 0.5).unwrap();
//! let dist = analysis.distribution(params, ProblemVariant::Optimisation).unwrap();
//! let (best, mass) = dist.top(1)[0];
//! assert!((mass - 0.7487276377548032).abs() < 1e-12);
//! assert_eq!(analysis.inclusion_vector(best).unwrap(), vec![true, true, false, true]);
//!
//! let witness = analysis.solve_decision(params, 27).unwrap();
//! assert!(witness > 0.9);
//! ```
//!
//! ## Problem variants
//! - [`ProblemVariant::Optimisation`]: find the best selection (α > 0).
//! - [`ProblemVariant::Decision`]: reach a value threshold. α = 0 gives a
//!   pure item-by-item searcher.

pub mod analysis;
pub mod builder;
pub mod distribution;
pub mod dominance;
pub mod engine;
pub mod error;
pub mod graph;
pub mod item;
pub mod params;
pub mod registry;
pub mod report;
pub mod utils;

pub use crate::analysis::Analysis;
pub use crate::builder::AnalysisBuilder;
pub use crate::distribution::Distribution;
pub use crate::engine::DistributionEngine;
pub use crate::error::{ModelError, Result};
pub use crate::graph::{NodeSpec, SearchGraph};
pub use crate::item::{InstanceKey, Item, ItemId, StructuralKey};
pub use crate::params::{BehavioralParams, ProblemVariant, VariantKind};
pub use crate::registry::{NodeId, SearchNode};
pub use crate::report::DistributionReport;
