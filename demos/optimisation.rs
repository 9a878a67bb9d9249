//! Example: terminal distribution for the optimisation variant.
//!
//! Run with:
//! `cargo run --example optimisation --features tracing`

use knapsack_choice::{AnalysisBuilder, BehavioralParams, ProblemVariant, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut analysis = AnalysisBuilder::new()
        .items(&[(12, 7), (8, 5), (14, 8), (9, 4)])
        .capacity(16)
        .build()?;

    let params = BehavioralParams::new(0.7, 0.75, 0.4, 0.5)?;
    let dist = analysis.distribution(params, ProblemVariant::Optimisation)?;

    let report = analysis
        .report(&dist)
        .with_params(params)
        .with_print_threshold(0.01)
        .render()?;
    print!("{report}");
    Ok(())
}
