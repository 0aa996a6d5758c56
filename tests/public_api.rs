use rusevall::{
    evaluate, evaluate_all, EvallConfig, EvallConfigBuilder, FormatErrorKind, Hierarchy,
    Instance, MetricKind, PreconditionKind, RankingOrder, Report, ReportFormat, Status,
};
use serde_jsonlines::json_lines;
use std::fs::read_to_string;

pub trait CloseEnough {
    fn are_close(&self, other: &Self, eps: f64) -> bool;
}

impl CloseEnough for Option<f64> {
    fn are_close(&self, other: &Self, eps: f64) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => f64::abs(a - b) < eps,
            (None, None) => true,
            _ => false,
        }
    }
}

fn load(path: &str) -> Vec<Instance> {
    json_lines::<Instance, _>(path)
        .unwrap_or_else(|_| panic!("file {} not found in test directory", path))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn average(report: &Report, kind: MetricKind) -> Option<f64> {
    report.metric(kind).unwrap().results.average_per_test_case
}

#[test]
fn identical_monolabel_predictions() {
    let gold = vec![Instance::new("tc1", "id1", "A"), Instance::new("tc1", "id2", "B")];
    let report = evaluate(
        gold.clone(),
        gold,
        &["Accuracy", "Kappa"],
        &EvallConfig::default(),
    )
    .unwrap();
    assert_eq!(average(&report, MetricKind::Accuracy), Some(1.0));
    assert_eq!(average(&report, MetricKind::Kappa), Some(1.0));
    assert_eq!(report.metric(MetricKind::Kappa).unwrap().status, Status::Ok);
}

#[test]
fn monolabel_test_cases_from_files() {
    let gold = load("tests/data/monolabel_gold.jsonl");
    let pred = load("tests/data/monolabel_pred.jsonl");
    let report = evaluate(gold, pred, &["Acc", "SP", "Pr", "Re"], &EvallConfig::default()).unwrap();
    let accuracy = report.metric(MetricKind::Accuracy).unwrap();
    assert_eq!(accuracy.test_case("T1").unwrap().average, Some(1.0));
    assert_eq!(accuracy.test_case("T2").unwrap().average, Some(0.5));
    assert_eq!(accuracy.results.average_per_test_case, Some(0.75));
    let recall = report.metric(MetricKind::Recall).unwrap();
    let classes = recall.test_case("T2").unwrap().classes.as_ref().unwrap();
    assert_eq!(classes["A"], Some(0.5));
    assert_eq!(classes["B"], Some(0.0));
    assert_eq!(classes["C"], Some(1.0));
    assert!(report.errors.is_empty());
}

#[test]
fn ranking_r_precision() {
    let gold = load("tests/data/ranking_gold.jsonl");
    let pred = load("tests/data/ranking_pred.jsonl");
    let report = evaluate(
        gold,
        pred,
        &["RPrecision", "MRR", "P@k"],
        &EvallConfig::default(),
    )
    .unwrap();
    assert_eq!(average(&report, MetricKind::RPrecision), Some(0.5));
    assert_eq!(average(&report, MetricKind::MRR), Some(0.5));
    assert_eq!(average(&report, MetricKind::PrecisionAtK), Some(0.2));
}

#[test]
fn ranking_scores_in_descending_order() {
    let gold = load("tests/data/ranking_gold.jsonl");
    let pred = load("tests/data/ranking_pred.jsonl");
    let config = EvallConfigBuilder::default()
        .ranking_order(RankingOrder::Descending)
        .precision_at_k(1)
        .build();
    let report = evaluate(gold, pred, &["MRR", "P@k"], &config).unwrap();
    assert_eq!(average(&report, MetricKind::MRR), Some(1.0));
    assert_eq!(average(&report, MetricKind::PrecisionAtK), Some(1.0));
}

#[test]
fn multilabel_precision_and_recall() {
    let gold = vec![Instance::new("tc1", "id1", ["A", "B"])];
    let pred = vec![Instance::new("tc1", "id1", ["A"])];
    let report = evaluate(gold, pred, &["Precision", "Recall"], &EvallConfig::default()).unwrap();
    let precision = report.metric(MetricKind::Precision).unwrap();
    let precision_classes = precision.test_case("tc1").unwrap().classes.as_ref().unwrap();
    assert_eq!(precision_classes["A"], Some(1.0));
    let recall = report.metric(MetricKind::Recall).unwrap();
    let recall_classes = recall.test_case("tc1").unwrap().classes.as_ref().unwrap();
    assert_eq!(recall_classes["B"], Some(0.0));
}

#[test]
fn soft_cross_entropy() {
    let gold = vec![Instance::new("tc1", "id1", [("A", 1.0), ("B", 0.0)])];
    let pred = vec![Instance::new("tc1", "id1", [("A", 0.6), ("B", 0.4)])];
    let report = evaluate(gold, pred, &["CE"], &EvallConfig::default()).unwrap();
    assert!(average(&report, MetricKind::CrossEntropy).are_close(&Some(0.7376), 1e-3));
}

#[test]
fn hierarchical_icm() {
    let hierarchy: Hierarchy = read_to_string("tests/data/sexism_hierarchy.json")
        .unwrap()
        .parse()
        .unwrap();
    let config = EvallConfigBuilder::default().hierarchy(hierarchy).build();
    let gold = load("tests/data/sexism_gold.jsonl");
    let pred = load("tests/data/sexism_pred.jsonl");
    let report = evaluate(
        gold.clone(),
        pred,
        &["ICM", "ICM-Norm", "Recall"],
        &config,
    )
    .unwrap();
    assert!(average(&report, MetricKind::ICM).are_close(&Some(1.25), 1e-9));
    assert!(average(&report, MetricKind::ICMNorm).are_close(&Some(0.8125), 1e-9));
    let recall = report.metric(MetricKind::Recall).unwrap();
    assert_eq!(recall.status, Status::Warning);
    assert_eq!(
        recall.preconditions[0].kind,
        PreconditionKind::HierarchyNotValidForMetric
    );
    let perfect = evaluate(gold.clone(), gold, &["ICMNorm"], &config).unwrap();
    assert!(average(&perfect, MetricKind::ICMNorm).are_close(&Some(1.0), 1e-9));
}

#[test]
fn flat_multilabel_icm_is_not_implemented() {
    let gold = load("tests/data/sexism_gold.jsonl");
    let report = evaluate(gold.clone(), gold, &["ICM"], &EvallConfig::default()).unwrap();
    let icm = report.metric(MetricKind::ICM).unwrap();
    assert_eq!(icm.status, Status::Fail);
    assert_eq!(
        icm.preconditions[0].kind,
        PreconditionKind::NotImplementedContext
    );
    assert_eq!(icm.results.average_per_test_case, None);
}

#[test]
fn unknown_metric_is_reported() {
    let gold = load("tests/data/monolabel_gold.jsonl");
    let pred = load("tests/data/monolabel_pred.jsonl");
    let report = evaluate(gold, pred, &["Accuracy", "UNKNOWN"], &EvallConfig::default()).unwrap();
    assert_eq!(report.metrics.len(), 2);
    assert_eq!(report.metrics[1].status, Status::Fail);
    assert_eq!(report.metrics[1].errors, vec!["METRIC_UNKONW_METRIC_ERROR"]);
}

#[test]
fn gold_and_pred_of_different_types() {
    let gold = load("tests/data/monolabel_gold.jsonl");
    let pred = load("tests/data/ranking_pred.jsonl")
        .into_iter()
        .map(|i| Instance::new("T1", &i.id, i.value))
        .collect();
    let report = evaluate(gold, pred, &["Accuracy"], &EvallConfig::default()).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, FormatErrorKind::DifferentValuesGoldAndPred);
    assert_eq!(report.errors[0].test_case, "T1");
}

#[test]
fn evaluate_all_and_render() {
    let gold = load("tests/data/ranking_gold.jsonl");
    // Relevance judgments read as scores give the perfect ranking
    let config = EvallConfigBuilder::default()
        .ranking_order(RankingOrder::Descending)
        .build();
    let report = evaluate_all(gold.clone(), gold, &config).unwrap();
    assert_eq!(report.metrics.len(), MetricKind::all().len());
    assert!(average(&report, MetricKind::nDCG).are_close(&Some(1.0), 1e-9));
    assert_eq!(report.metric(MetricKind::Accuracy).unwrap().status, Status::Fail);
    let table = report.render(ReportFormat::Table).unwrap();
    assert!(table.starts_with("Metric, Test case, Class, Value\n"));
    assert!(table.contains("nDCG, Q1, Average, 1\n"));
    let json_config = EvallConfigBuilder::default()
        .report_format(ReportFormat::Json)
        .build();
    let json = report.render(json_config.report_format()).unwrap();
    let deserialized: Report = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, report);
}
