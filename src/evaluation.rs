/**
This module evaluates a system output against a gold standard. The instances are split by test
case, every test case is checked for structural consistency and then evaluated by every requested
metric. The values of the test cases are averaged into the value of the metric.
*/
use crate::comparator::Comparator;
use crate::config::EvallConfig;
use crate::dataset::{partition, Dataset, DatasetShape, Instance};
use crate::hierarchy::HierarchyError;
use crate::metrics::{mean, MetricKind};
use crate::preconditions::Preconditions;
use crate::reporter::{
    FormatErrorKind, FormatErrorRecord, MetricReport, MetricResults, Report, TestCaseResult,
};
use std::error::Error;
use std::fmt::Display;

/// Errors preventing the whole evaluation. Problems restricted to a test case or a metric are
/// recorded in the report instead.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The gold standard or the predictions contain no instance.
    EmptyInput(String),
    Hierarchy(HierarchyError),
    Serialization(String),
}

impl Display for EvaluationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput(s) => write!(f, "The {} contains no instance to evaluate", s),
            Self::Hierarchy(e) => write!(f, "{}", e),
            Self::Serialization(s) => write!(f, "Impossible to serialize the report: {}", s),
        }
    }
}

impl Error for EvaluationError {}

impl From<HierarchyError> for EvaluationError {
    fn from(value: HierarchyError) -> Self {
        Self::Hierarchy(value)
    }
}

impl From<serde_json::Error> for EvaluationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// Returns the first structural problem of the test case, if any.
fn check_consistency(gold: &Dataset, pred: &Dataset) -> Option<FormatErrorKind> {
    let gold_shape = match gold.shape() {
        DatasetShape::Mixed(_) => return Some(FormatErrorKind::MixedValuesInGold),
        DatasetShape::Uniform(shape) => Some(shape),
        DatasetShape::Empty => None,
    };
    let pred_shape = match pred.shape() {
        DatasetShape::Mixed(_) => return Some(FormatErrorKind::MixedValuesInPred),
        DatasetShape::Uniform(shape) => Some(shape),
        DatasetShape::Empty => None,
    };
    if gold_shape != pred_shape {
        return Some(FormatErrorKind::DifferentValuesGoldAndPred);
    }
    None
}

fn evaluate_metric(
    kind: MetricKind,
    comparators: &[Comparator],
    config: &EvallConfig,
) -> MetricReport {
    log::info!("Evaluating the metric {}", kind.name());
    let metric = kind.metric(config);
    let mut preconditions = Preconditions::new();
    let test_cases: Vec<TestCaseResult> = comparators
        .iter()
        .map(|comparator| {
            let outcome = metric.evaluate(comparator, &mut preconditions);
            log::debug!(
                "{} of the test case {}: {:?}",
                kind,
                comparator.test_case(),
                outcome.as_ref().and_then(|o| o.average)
            );
            TestCaseResult::new(comparator.test_case(), outcome)
        })
        .collect();
    let average_per_test_case = mean(test_cases.iter().filter_map(|t| t.average));
    MetricReport::new(
        kind,
        MetricResults {
            test_cases,
            average_per_test_case,
        },
        preconditions.into_records(),
    )
}

/// Evaluates the predictions `pred` against the gold standard `gold` with every metric of
/// `metrics`. The metrics are designated by their identifier or their acronym, ignoring the case.
/// An unknown metric does not stop the evaluation: it is reported with a `FAIL` status.
///
/// * `gold`: Instances of the gold standard.
/// * `pred`: Instances produced by the evaluated system.
/// * `metrics`: Names of the metrics to compute, such as `"Accuracy"`, `"ICM"` or `"nDCG"`.
/// * `config`: Hierarchy of classes and parameters of the metrics.
///
/// # Example
///
/// ```rust
/// use rusevall::{evaluate, EvallConfig, Instance, MetricKind};
///
/// let gold = vec![
///     Instance::new("T1", "1", 1u64),
///     Instance::new("T1", "2", 0u64),
///     Instance::new("T1", "3", 1u64),
/// ];
/// let pred = vec![
///     Instance::new("T1", "2", 1u64),
///     Instance::new("T1", "1", 2u64),
///     Instance::new("T1", "3", 3u64),
/// ];
/// let report = evaluate(gold, pred, &["RPrecision"], &EvallConfig::default()).unwrap();
/// let value = report.metric(MetricKind::RPrecision).unwrap().results.average_per_test_case;
/// assert_eq!(value, Some(0.5));
/// ```
pub fn evaluate<S: AsRef<str>>(
    gold: Vec<Instance>,
    pred: Vec<Instance>,
    metrics: &[S],
    config: &EvallConfig,
) -> Result<Report, EvaluationError> {
    if gold.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("gold standard")));
    }
    if pred.is_empty() {
        return Err(EvaluationError::EmptyInput(String::from("predictions")));
    }
    let gold_datasets = partition(gold);
    let pred_datasets = partition(pred);
    let mut errors: Vec<FormatErrorRecord> = Vec::new();
    let mut comparators: Vec<Comparator> = Vec::with_capacity(gold_datasets.len());
    for gold_dataset in gold_datasets.iter() {
        let test_case = gold_dataset.test_case();
        let Some(pred_dataset) = pred_datasets.iter().find(|p| p.test_case() == test_case) else {
            log::warn!("The test case {} has no prediction, it is skipped", test_case);
            continue;
        };
        if let Some(kind) = check_consistency(gold_dataset, pred_dataset) {
            log::warn!("The test case {} is skipped: {}", test_case, kind);
            errors.push(FormatErrorRecord {
                kind,
                test_case: String::from(test_case),
            });
            continue;
        }
        comparators.push(Comparator::new(
            gold_dataset,
            pred_dataset,
            config.hierarchy(),
            config.ranking_order(),
        ));
    }
    let reports = metrics
        .iter()
        .map(|name| match name.as_ref().parse::<MetricKind>() {
            Ok(kind) => evaluate_metric(kind, &comparators, config),
            Err(e) => {
                log::warn!("{}", e);
                MetricReport::unknown(name.as_ref(), &e)
            }
        })
        .collect();
    Ok(Report {
        metrics: reports,
        errors,
    })
}

/// Evaluates the predictions with every metric of the library. The metrics that can't evaluate
/// the kind of values of the inputs are reported with a `FAIL` status.
pub fn evaluate_all(
    gold: Vec<Instance>,
    pred: Vec<Instance>,
    config: &EvallConfig,
) -> Result<Report, EvaluationError> {
    let metrics: Vec<&str> = MetricKind::all().iter().map(|k| k.identifier()).collect();
    evaluate(gold, pred, &metrics, config)
}
