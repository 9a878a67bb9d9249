//! Numeric helpers shared by the engine and the report renderer.

/// Relative tolerance for "a distribution sums to one".
pub const MASS_TOLERANCE: f64 = 1e-9;

/// Whether `total` equals 1 within [`MASS_TOLERANCE`], relative to the larger
/// of the two magnitudes.
#[inline]
pub fn is_unit_mass(total: f64) -> bool {
    (total - 1.0).abs() <= MASS_TOLERANCE * total.abs().max(1.0)
}

/// Exponent `(1 − α) / α` applied to search success terms.
///
/// Only meaningful for α > 0.
#[inline]
pub fn search_exponent(alpha: f64) -> f64 {
    (1.0 - alpha) / alpha
}

/// Natural log of an item's attractiveness for incremental search,
/// `ln(density^(β/(1−β)) · weight^(γ/(1−γ)))`.
///
/// Working in log space keeps strong preferences (β or γ close to 1) finite.
/// A zero exponent contributes nothing, so with β = γ = 0 every item scores
/// 0, including zero-density items. Zero density under β > 0 scores −∞.
#[inline]
pub fn log_transformed_weight(density: f64, weight: f64, beta: f64, gamma: f64) -> f64 {
    let density_exponent = beta / (1.0 - beta);
    let weight_exponent = gamma / (1.0 - gamma);
    let mut log = 0.0;
    if density_exponent != 0.0 {
        log += density_exponent * density.ln();
    }
    if weight_exponent != 0.0 {
        log += weight_exponent * weight.ln();
    }
    log
}

/// Largest of `logs` and the sum of `exp(log − max)` over them.
///
/// `None` when every entry is −∞ or there are none, i.e. nothing carries
/// weight.
pub fn log_normaliser<I>(logs: I) -> Option<(f64, f64)>
where
    I: Iterator<Item = f64> + Clone,
{
    let max = logs.clone().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return None;
    }
    Some((max, logs.map(|log| (log - max).exp()).sum()))
}
