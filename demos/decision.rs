//! Example: probability of reaching a value target.
//!
//! Run with:
//! `cargo run --release --example decision`

use knapsack_choice::{AnalysisBuilder, BehavioralParams, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut analysis = AnalysisBuilder::new()
        .items(&[
            (535, 236),
            (214, 113),
            (152, 96),
            (342, 220),
            (259, 172),
            (268, 212),
            (246, 220),
            (137, 158),
            (148, 184),
            (24, 46),
            (23, 64),
            (47, 189),
        ])
        .capacity(957)
        .build()?;
    println!("Search graph: {} nodes", analysis.graph().len());

    let target = 1562;
    let params = BehavioralParams::new(0.7, 0.6, 0.4, 0.6)?;
    let witness = analysis.solve_decision(params, target)?;
    println!(
        "The probability of finding a witness is: {:.2}%.",
        witness * 100.0
    );

    // Item-by-item search only.
    let naive = BehavioralParams::new(0.0, 0.0, 0.0, 0.0)?;
    let baseline = analysis.solve_decision(naive, target)?;
    println!("Unbiased item-by-item searcher: {:.2}%.", baseline * 100.0);
    Ok(())
}
