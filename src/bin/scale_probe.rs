//! Grows deterministic knapsack instances and records, per scenario and item
//! count, wall time, resident memory delta and whether the result checks out.
//!
//! Rows go to stdout as CSV, progress to stderr.
//!
//! ```text
//! cargo run --release --bin scale_probe -- --verify-limit 10
//! ```

use std::env;
use std::time::Instant;

use knapsack_choice::utils::is_unit_mass;
use knapsack_choice::{Analysis, BehavioralParams, ModelError, ProblemVariant};
use sysinfo::{get_current_pid, ProcessRefreshKind, System};

const SIZES: &[usize] = &[4, 6, 8, 10, 12, 14];
const SCENARIOS: &[&str] = &["graph", "optimisation", "decision"];

fn main() {
    let verify_limit = match parse_verify_limit(env::args().skip(1)) {
        Ok(limit) => limit,
        Err(err) => {
            eprintln!("scale_probe: {err}");
            eprintln!("usage: scale_probe [--verify-limit <N>]");
            std::process::exit(2);
        }
    };

    let params = match BehavioralParams::new(0.6, 0.7, 0.2, 0.5) {
        Ok(params) => params,
        Err(err) => {
            eprintln!("scale_probe: {err}");
            std::process::exit(2);
        }
    };

    let mut sys = System::new();
    let mut failures = 0;
    println!("scenario,items,nodes,wall_s,rss_delta_kib,status,detail");
    for &scenario in SCENARIOS {
        for &n in SIZES {
            let row = measure(&mut sys, || run(scenario, n, params, verify_limit));
            eprintln!(
                "{scenario:>12} items={n:<3} {:>8.3}s  {}",
                row.wall_s,
                row.outcome.status()
            );
            if matches!(row.outcome, Outcome::Failed(_)) {
                failures += 1;
            }
            println!(
                "{scenario},{n},{},{:.3},{},{},\"{}\"",
                row.nodes,
                row.wall_s,
                row.rss_delta_kib,
                row.outcome.status(),
                row.outcome.detail().replace('"', "'")
            );
        }
    }

    if failures > 0 {
        eprintln!("scale_probe: {failures} check(s) failed");
        std::process::exit(1);
    }
}

fn parse_verify_limit<I: Iterator<Item = String>>(mut args: I) -> Result<usize, String> {
    let mut limit = 16;
    while let Some(arg) = args.next() {
        let value = match arg.strip_prefix("--verify-limit=") {
            Some(value) => value.to_string(),
            None if arg == "--verify-limit" => args
                .next()
                .ok_or_else(|| "missing value after --verify-limit".to_string())?,
            None => return Err(format!("unrecognized argument '{arg}'")),
        };
        limit = value
            .parse()
            .map_err(|_| format!("invalid verify limit '{value}'"))?;
    }
    Ok(limit)
}

enum Outcome {
    Passed,
    Failed(String),
    NotChecked,
}

impl Outcome {
    fn status(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed(_) => "failed",
            Outcome::NotChecked => "not_checked",
        }
    }

    fn detail(&self) -> &str {
        match self {
            Outcome::Failed(detail) => detail,
            _ => "",
        }
    }

    fn check(ok: bool, detail: impl FnOnce() -> String) -> Self {
        if ok {
            Outcome::Passed
        } else {
            Outcome::Failed(detail())
        }
    }
}

struct Row {
    nodes: usize,
    wall_s: f64,
    rss_delta_kib: u64,
    outcome: Outcome,
}

fn measure<F>(sys: &mut System, compute: F) -> Row
where
    F: FnOnce() -> (usize, Outcome),
{
    let before = rss_kib(sys);
    let start = Instant::now();
    let (nodes, outcome) = compute();
    let wall_s = start.elapsed().as_secs_f64();
    Row {
        nodes,
        wall_s,
        rss_delta_kib: rss_kib(sys).saturating_sub(before),
        outcome,
    }
}

/// One scenario on the `n`-item instance. Returns the graph size alongside
/// the check result.
fn run(scenario: &str, n: usize, params: BehavioralParams, verify_limit: usize) -> (usize, Outcome) {
    let (pairs, capacity) = deterministic_instance(n);
    let mut analysis = match Analysis::from_pairs(&pairs, capacity) {
        Ok(analysis) => analysis,
        Err(err) => return (0, Outcome::Failed(err.to_string())),
    };
    let nodes = analysis.graph().len();
    let outcome = match check_scenario(scenario, &mut analysis, &pairs, capacity, params, verify_limit) {
        Ok(outcome) => outcome,
        Err(err) => Outcome::Failed(err.to_string()),
    };
    (nodes, outcome)
}

fn check_scenario(
    scenario: &str,
    analysis: &mut Analysis,
    pairs: &[(u64, u64)],
    capacity: u64,
    params: BehavioralParams,
    verify_limit: usize,
) -> Result<Outcome, ModelError> {
    let optimum = analysis.graph().node(analysis.root())?.optimal_value();
    Ok(match scenario {
        "graph" if pairs.len() > verify_limit => Outcome::NotChecked,
        "graph" => {
            let expected = enumerate_optimum(pairs, capacity);
            Outcome::check(optimum == expected, || {
                format!("optimum {optimum}, enumeration {expected}")
            })
        }
        "optimisation" => {
            let total = analysis
                .distribution(params, ProblemVariant::Optimisation)?
                .total();
            Outcome::check(is_unit_mass(total), || format!("mass sums to {total}"))
        }
        _ => {
            let witness = analysis.solve_decision(params, optimum * 9 / 10)?;
            let trivial = analysis.solve_decision(params, 0)?;
            Outcome::check(
                (0.0..=1.0 + 1e-9).contains(&witness) && is_unit_mass(trivial),
                || format!("witness {witness}, trivial {trivial}"),
            )
        }
    })
}

fn rss_kib(sys: &mut System) -> u64 {
    sys.refresh_processes_specifics(ProcessRefreshKind::new());
    get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map_or(0, |process| process.memory() / 1024)
}

/// `n` items with spread-out values and weights, capacity half the total weight.
fn deterministic_instance(n: usize) -> (Vec<(u64, u64)>, u64) {
    let pairs: Vec<(u64, u64)> = (0..n as u64)
        .map(|i| (1 + (i * 37 + 11) % 50, 1 + (i * 53 + 7) % 40))
        .collect();
    let capacity = pairs.iter().map(|&(_, w)| w).sum::<u64>() / 2;
    (pairs, capacity)
}

/// Best value over feasible selections that leave at least one item out.
///
/// A state with a single remaining item is terminal, so the full set is never
/// reached by the search when there is more than one item.
fn enumerate_optimum(pairs: &[(u64, u64)], capacity: u64) -> u64 {
    let max_size = pairs.len().saturating_sub(1);
    (0u32..(1u32 << pairs.len()))
        .filter(|mask| mask.count_ones() as usize <= max_size)
        .filter_map(|mask| {
            let (value, weight) = pairs
                .iter()
                .enumerate()
                .filter(|&(i, _)| mask & (1 << i) != 0)
                .fold((0, 0), |(v, w), (_, &(iv, iw))| (v + iv, w + iw));
            (weight <= capacity).then_some(value)
        })
        .max()
        .unwrap_or(0)
}
