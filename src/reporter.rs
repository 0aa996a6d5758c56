/**
This modules holds the report of an evaluation and the tools to prettyprint it or serialize it.
*/
use crate::config::ReportFormat;
use crate::evaluation::EvaluationError;
use crate::metrics::{MetricKind, MetricOutcome, UnknownMetricError};
use crate::preconditions::{PreconditionRecord, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// The report holds, for every requested metric, its value on every test case and the average
/// over the test cases, along with the structural errors found in the inputs. It can be displayed
/// as a dataframe or serialized to JSON. The report is built by the `evaluate` function.
///
/// # Example
///
/// ```rust
/// use rusevall::{evaluate, EvallConfig, Instance};
///
/// let gold = vec![Instance::new("T1", "1", "A"), Instance::new("T1", "2", "B")];
/// let pred = vec![Instance::new("T1", "1", "A"), Instance::new("T1", "2", "A")];
///
/// let report = evaluate(gold, pred, &["Accuracy"], &EvallConfig::default()).unwrap();
///
/// let expected_report = "Metric, Test case, Class, Value
/// Accuracy, T1, Average, 0.5
/// Accuracy, Overall, Average, 0.5\n";
///
/// assert_eq!(expected_report, report.to_string());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Report {
    pub metrics: Vec<MetricReport>,
    pub errors: Vec<FormatErrorRecord>,
}

impl Report {
    /// Report of the metric `kind`, if it was requested.
    pub fn metric(&self, kind: MetricKind) -> Option<&MetricReport> {
        self.metrics
            .iter()
            .find(|m| m.metric == kind.identifier())
    }

    pub fn to_json(&self) -> Result<String, EvaluationError> {
        serde_json::to_string_pretty(self).map_err(EvaluationError::from)
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, EvaluationError> {
        match format {
            ReportFormat::Table => Ok(self.to_string()),
            ReportFormat::Json => self.to_json(),
        }
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::from("-"),
    }
}

/// The Report struct acts as a dataframe when displayed.
impl Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Metric, Test case, Class, Value")?;
        for metric in self.metrics.iter() {
            write!(f, "{}", metric)?
        }
        Ok(())
    }
}

/// Values of a metric over every test case.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricResults {
    pub test_cases: Vec<TestCaseResult>,
    /// Mean of the defined averages of the test cases.
    pub average_per_test_case: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub name: String,
    pub average: Option<f64>,
    pub classes: Option<BTreeMap<String, Option<f64>>>,
}

impl TestCaseResult {
    pub(crate) fn new(name: &str, outcome: Option<MetricOutcome>) -> Self {
        let outcome = outcome.unwrap_or_default();
        Self {
            name: String::from(name),
            average: outcome.average,
            classes: outcome.classes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    /// Identifier of the metric, or the requested name for an unknown metric.
    pub metric: String,
    pub name: String,
    pub acronym: String,
    pub status: Status,
    pub results: MetricResults,
    pub preconditions: Vec<PreconditionRecord>,
    pub errors: Vec<String>,
}

impl MetricReport {
    pub(crate) fn new(
        kind: MetricKind,
        results: MetricResults,
        preconditions: Vec<PreconditionRecord>,
    ) -> Self {
        let status = preconditions
            .iter()
            .map(|r| r.status)
            .max()
            .unwrap_or_default();
        Self {
            metric: String::from(kind.identifier()),
            name: String::from(kind.name()),
            acronym: String::from(kind.acronym()),
            status,
            results,
            preconditions,
            errors: vec![],
        }
    }

    pub(crate) fn unknown(requested: &str, error: &UnknownMetricError) -> Self {
        Self {
            metric: String::from(requested),
            name: String::from(requested),
            acronym: String::from(requested),
            status: Status::Fail,
            results: MetricResults::default(),
            preconditions: vec![],
            errors: vec![String::from(error.code())],
        }
    }

    pub fn test_case(&self, name: &str) -> Option<&TestCaseResult> {
        self.results.test_cases.iter().find(|t| t.name == name)
    }
}

/// Every line of the metric in the dataframe: one per test case, one per class of every test case
/// and one for the average over the test cases.
impl Display for MetricReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for test_case in self.results.test_cases.iter() {
            writeln!(
                f,
                "{}, {}, Average, {}",
                self.metric,
                test_case.name,
                fmt_value(test_case.average)
            )?;
            for (class, value) in test_case.classes.iter().flatten() {
                writeln!(
                    f,
                    "{}, {}, {}, {}",
                    self.metric,
                    test_case.name,
                    class,
                    fmt_value(*value)
                )?
            }
        }
        writeln!(
            f,
            "{}, Overall, Average, {}",
            self.metric,
            fmt_value(self.results.average_per_test_case)
        )
    }
}

/// Structural inconsistencies preventing the evaluation of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatErrorKind {
    /// The gold standard of the test case mixes several kinds of values.
    MixedValuesInGold,
    /// The predictions of the test case mix several kinds of values.
    MixedValuesInPred,
    /// Gold standard and predictions hold different kinds of values.
    DifferentValuesGoldAndPred,
}

impl FormatErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MixedValuesInGold | Self::MixedValuesInPred => {
                "FORMAT_DIFFERENTE_TYPES_IN_VALUE_FIELD_ERROR"
            }
            Self::DifferentValuesGoldAndPred => "FORMAT_DIFFERENT_TYPES_IN_VALUE_GOLD_AND_PRED",
        }
    }
}

impl Display for FormatErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatErrorRecord {
    pub kind: FormatErrorKind,
    pub test_case: String,
}
