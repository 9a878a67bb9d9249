//! Behavioral parameters and problem variants.
//!
//! - α: propensity to solve the remaining problem by exhaustive search.
//! - β: preference for high-density items.
//! - γ: preference for (or aversion to) heavy items.
//! - δ: item-level rationality, i.e. how often dominated items are discarded.

use std::fmt;

use crate::error::{ModelError, Result};

/// Which knapsack problem the decision-maker is solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemVariant {
    /// Find the highest-value feasible selection.
    Optimisation,
    /// Find any feasible selection whose value reaches `threshold`.
    Decision { threshold: u64 },
}

/// Variant tag without its threshold, as supplied by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantKind {
    Optimisation,
    Decision,
}

impl ProblemVariant {
    /// Combine a variant tag with an optional signed threshold.
    ///
    /// The decision variant requires a non-negative threshold; the
    /// optimisation variant must not be given one.
    pub fn from_parts(kind: VariantKind, threshold: Option<i64>) -> Result<Self> {
        match (kind, threshold) {
            (VariantKind::Optimisation, None) => Ok(Self::Optimisation),
            (VariantKind::Optimisation, Some(_)) => Err(ModelError::UnexpectedThreshold),
            (VariantKind::Decision, None) => Err(ModelError::MissingThreshold),
            (VariantKind::Decision, Some(t)) if t < 0 => Err(ModelError::NegativeThreshold(t)),
            (VariantKind::Decision, Some(t)) => Ok(Self::Decision { threshold: t as u64 }),
        }
    }

    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Optimisation => VariantKind::Optimisation,
            Self::Decision { .. } => VariantKind::Decision,
        }
    }

    pub fn threshold(&self) -> Option<u64> {
        match self {
            Self::Optimisation => None,
            Self::Decision { threshold } => Some(*threshold),
        }
    }
}

impl fmt::Display for ProblemVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimisation => f.write_str("Optimisation"),
            Self::Decision { threshold } => write!(f, "Decision (target {threshold})"),
        }
    }
}

/// The four behavioral parameters (α, β, γ, δ).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehavioralParams {
    alpha: f64,
    beta: f64,
    gamma: f64,
    delta: f64,
}

impl BehavioralParams {
    /// Validate ranges common to both variants: α ∈ [0, 1], β ∈ [0, 1),
    /// γ ∈ [0, 1), δ ∈ [0, 1]. Use [`validate_for`](Self::validate_for) to
    /// apply the variant-specific bound on α.
    pub fn new(alpha: f64, beta: f64, gamma: f64, delta: f64) -> Result<Self> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma), ("delta", delta)] {
            if !value.is_finite() {
                return Err(ModelError::NonFiniteParameter { name, value });
            }
        }
        check(
            "beta",
            beta,
            (0.0..1.0).contains(&beta),
            "greater than or equal to 0.0 and less than 1.0",
        )?;
        check(
            "gamma",
            gamma,
            (0.0..1.0).contains(&gamma),
            "greater than or equal to 0.0 and less than 1.0",
        )?;
        check(
            "delta",
            delta,
            (0.0..=1.0).contains(&delta),
            "greater than or equal to 0.0 and less than or equal to 1.0",
        )?;
        check(
            "alpha",
            alpha,
            (0.0..=1.0).contains(&alpha),
            "greater than or equal to 0.0 and less than or equal to 1.0",
        )?;
        Ok(Self {
            alpha,
            beta,
            gamma,
            delta,
        })
    }

    /// Validate and check α against `variant` in one step.
    pub fn for_variant(
        alpha: f64,
        beta: f64,
        gamma: f64,
        delta: f64,
        variant: ProblemVariant,
    ) -> Result<Self> {
        let params = Self::new(alpha, beta, gamma, delta)?;
        params.validate_for(variant)?;
        Ok(params)
    }

    /// The optimisation variant needs α > 0; α = 0 is only meaningful for the
    /// decision variant, where it disables the brute-force search.
    pub fn validate_for(&self, variant: ProblemVariant) -> Result<()> {
        match variant {
            ProblemVariant::Optimisation => check(
                "alpha",
                self.alpha,
                self.alpha > 0.0 && self.alpha <= 1.0,
                "greater than 0.0 and less than or equal to 1.0 for the optimisation problem",
            ),
            ProblemVariant::Decision { .. } => Ok(()),
        }
    }

    /// Unbiased item-by-item searcher: no brute force, no density or weight
    /// preference, and the given rationality.
    pub(crate) fn baseline(delta: f64) -> Self {
        Self {
            alpha: 0.0,
            beta: 0.0,
            gamma: 0.0,
            delta,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Bit-exact key for memoization.
    pub fn key(&self) -> ParamsKey {
        ParamsKey([
            canonical_bits(self.alpha),
            canonical_bits(self.beta),
            canonical_bits(self.gamma),
            canonical_bits(self.delta),
        ])
    }
}

impl fmt::Display for BehavioralParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "α = {:?}, β = {:?}, γ = {:?}, δ = {:?}",
            self.alpha, self.beta, self.gamma, self.delta
        )
    }
}

/// Hashable form of [`BehavioralParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamsKey([u64; 4]);

fn canonical_bits(x: f64) -> u64 {
    // -0.0 and 0.0 describe the same searcher.
    if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}

fn check(name: &'static str, value: f64, ok: bool, expected: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ModelError::ParameterOutOfRange {
            name,
            value,
            expected,
        })
    }
}
