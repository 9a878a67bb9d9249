use knapsack_choice::{AnalysisBuilder, BehavioralParams, ProblemVariant};

const PAPER_ITEMS: &[(i64, i64)] = &[(12, 7), (8, 5), (14, 8), (9, 4)];

fn params(a: f64, b: f64, g: f64, d: f64) -> BehavioralParams {
    BehavioralParams::new(a, b, g, d).unwrap()
}

fn bits(v: &[u8]) -> Vec<bool> {
    v.iter().map(|&b| b == 1).collect()
}

#[test]
fn paper_instance_distribution() {
    let mut analysis = AnalysisBuilder::new()
        .items(PAPER_ITEMS)
        .capacity(16)
        .build()
        .unwrap();
    assert_eq!(analysis.graph().len(), 12);

    let dist = analysis
        .distribution(params(0.7, 0.75, 0.4, 0.5), ProblemVariant::Optimisation)
        .unwrap();
    assert_eq!(dist.len(), 4);

    let expected = [
        (bits(&[1, 1, 0, 1]), 0.7487276377548032),
        (bits(&[1, 0, 1, 0]), 0.1534085161146231),
        (bits(&[0, 0, 1, 1]), 0.08380264655104012),
        (bits(&[0, 1, 1, 0]), 0.014061199579533638),
    ];
    for ((node, mass), (inclusion, want)) in dist.sorted_desc().into_iter().zip(expected) {
        assert_eq!(analysis.inclusion_vector(node).unwrap(), inclusion);
        assert!((mass - want).abs() < 1e-12, "{mass} != {want}");
    }
}

#[test]
fn five_item_instance_top_terminals() {
    let mut analysis = AnalysisBuilder::new()
        .items(&[(100, 50), (50, 30), (30, 60), (140, 120), (40, 25)])
        .capacity(100)
        .build()
        .unwrap();
    let dist = analysis
        .distribution(params(0.75, 0.6, 0.2, 0.6), ProblemVariant::Optimisation)
        .unwrap();

    let expected = [
        (bits(&[1, 1, 0, 0, 0]), 0.776998932560427),
        (bits(&[1, 0, 0, 0, 1]), 0.162691836871925),
        (bits(&[0, 1, 0, 0, 1]), 0.0440568067760513),
        (bits(&[0, 1, 1, 0, 0]), 0.0129266429474177),
        (bits(&[0, 0, 1, 0, 1]), 0.00332578084417862),
    ];
    for ((node, mass), (inclusion, want)) in dist.top(5).into_iter().zip(expected) {
        assert_eq!(analysis.inclusion_vector(node).unwrap(), inclusion);
        assert!((mass - want).abs() < 1e-12, "{mass} != {want}");
    }
}

#[test]
fn identical_items_taken_in_either_order_are_distinct_terminals() {
    let mut analysis = AnalysisBuilder::new()
        .items(&[(5, 2), (12, 8), (5, 2)])
        .capacity(19)
        .build()
        .unwrap();
    assert_eq!(analysis.graph().len(), 8);

    let dist = analysis
        .distribution(params(0.3, 0.0, 0.0495, 0.0), ProblemVariant::Optimisation)
        .unwrap();
    assert_eq!(dist.len(), 4);

    let expected = [
        (17, 0.35858708754295565),
        (17, 0.35858708754295565),
        (10, 0.1414129124570443),
        (10, 0.1414129124570443),
    ];
    for ((node, mass), (value, want)) in dist.sorted_desc().into_iter().zip(expected) {
        assert_eq!(analysis.graph().node(node).unwrap().standing_value(), value);
        assert!((mass - want).abs() < 1e-12, "{mass} != {want}");
    }
}

#[test]
fn report_matches_reference_layout() {
    let mut analysis = AnalysisBuilder::new()
        .items(PAPER_ITEMS)
        .capacity(16)
        .build()
        .unwrap();
    let p = params(0.7, 0.75, 0.4, 0.5);
    let dist = analysis.distribution(p, ProblemVariant::Optimisation).unwrap();
    let text = analysis
        .report(&dist)
        .with_params(p)
        .with_print_threshold(0.01)
        .render()
        .unwrap();

    let expected = "Inputs\n\n\
Parameters: α = 0.7, β = 0.75, γ = 0.4, δ = 0.5\n\n\
Knapsack Problem Variant: Optimisation\n\n\
Items: (v: 12, w: 7), (v: 8, w: 5), (v: 14, w: 8), (v: 9, w: 4)\n\n\
Budget: 16\n\n\
-------------------------------------\n\n\
Output\n\n\
Terminal Nodes (*** for optimal):\n\
[1, 1, 0, 1] - Σv: 29, Σw: 16 / 16 - 74.873% ***\n\
[1, 0, 1, 0] - Σv: 26, Σw: 15 / 16 - 15.341%\n\
[0, 0, 1, 1] - Σv: 23, Σw: 12 / 16 - 8.380%\n\
[0, 1, 1, 0] - Σv: 22, Σw: 13 / 16 - 1.406%\n\
\n\
TOTAL\n\
\n\
Number of Terminal Nodes: 4\n\n";

    let got: Vec<&str> = text.lines().collect();
    let want: Vec<&str> = expected.lines().collect();
    assert_eq!(got.len(), want.len(), "{text}");
    for (g, w) in got.iter().zip(&want) {
        if *w == "TOTAL" {
            let total: f64 = g
                .strip_prefix("Total Distribution: ")
                .expect("total line")
                .parse()
                .unwrap();
            assert!((total - 1.0).abs() < 1e-9);
        } else {
            assert_eq!(g, w);
        }
    }
    assert!(text.ends_with("Number of Terminal Nodes: 4\n\n"));
}

#[test]
fn print_threshold_hides_light_terminals() {
    let mut analysis = AnalysisBuilder::new()
        .items(PAPER_ITEMS)
        .capacity(16)
        .build()
        .unwrap();
    let dist = analysis
        .distribution(params(0.7, 0.75, 0.4, 0.5), ProblemVariant::Optimisation)
        .unwrap();
    let rows = analysis.report(&dist).with_print_threshold(0.1).rows().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].mass >= rows[1].mass);
}

#[test]
fn full_search_puts_everything_on_the_optimum() {
    let mut analysis = AnalysisBuilder::new()
        .items(PAPER_ITEMS)
        .capacity(16)
        .build()
        .unwrap();
    let dist = analysis
        .distribution(params(1.0, 0.0, 0.0, 0.0), ProblemVariant::Optimisation)
        .unwrap();
    let root = analysis.graph().node(analysis.root()).unwrap();
    let optimal = &root.summary().optimal_terminal_nodes;
    assert_eq!(optimal.len(), 1);
    let best = *optimal.iter().next().unwrap();
    assert!((dist.get(best) - 1.0).abs() < 1e-12);
}
