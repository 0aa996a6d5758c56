/**
This module holds the conditions a metric imposes on its inputs. A failed precondition prevents
the computation of the metric for a test case, while a warning only annotates the result.
*/
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Status of a metric or of a precondition. The ordering goes from the least to the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "FAIL")]
    Fail,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str_content = match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Fail => "FAIL",
        };
        write!(f, "{}", str_content)
    }
}

/// Every condition a metric can check before computing its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
pub enum PreconditionKind {
    /// The shape of the values can't be evaluated with this metric.
    #[serde(rename = "METRIC_PRECONDITION_NOT_VALID_FORMAT_FOR_CONTEXT_EVALUATION")]
    NotValidFormatForContext,
    /// Gold and predictions only contain one and the same class over the same instances.
    #[serde(rename = "METRIC_PRECONDITION_1_CLASS_GOLDANDPRED_AND_SAME_INSTANCES_ERROR")]
    SingleClassSameInstances,
    /// The metric has no definition for this context, such as a flat multilabel ICM.
    #[serde(rename = "METRIC_PRECONDITION_NOT_IMPLEMENTED_EVALUATION_CONTEXT")]
    NotImplementedContext,
    /// A hierarchy was given but the metric ignores it.
    #[serde(rename = "METRIC_PRECONDITION_HIERARCHY_NOT_VALID_FOR_METRIC")]
    HierarchyNotValidForMetric,
    /// Several predictions share the same ranking value.
    #[serde(rename = "METRIC_PRECONDITION_DUPLICATED_VALUES_RANKING")]
    DuplicatedValuesRanking,
}

impl PreconditionKind {
    pub fn status(&self) -> Status {
        match self {
            Self::NotValidFormatForContext
            | Self::SingleClassSameInstances
            | Self::NotImplementedContext => Status::Fail,
            Self::HierarchyNotValidForMetric | Self::DuplicatedValuesRanking => Status::Warning,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotValidFormatForContext => {
                "METRIC_PRECONDITION_NOT_VALID_FORMAT_FOR_CONTEXT_EVALUATION"
            }
            Self::SingleClassSameInstances => {
                "METRIC_PRECONDITION_1_CLASS_GOLDANDPRED_AND_SAME_INSTANCES_ERROR"
            }
            Self::NotImplementedContext => "METRIC_PRECONDITION_NOT_IMPLEMENTED_EVALUATION_CONTEXT",
            Self::HierarchyNotValidForMetric => "METRIC_PRECONDITION_HIERARCHY_NOT_VALID_FOR_METRIC",
            Self::DuplicatedValuesRanking => "METRIC_PRECONDITION_DUPLICATED_VALUES_RANKING",
        }
    }
}

impl Display for PreconditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A precondition fired by a metric, with every test case where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreconditionRecord {
    pub kind: PreconditionKind,
    pub status: Status,
    pub test_cases: Vec<String>,
}

/// Accumulates the preconditions fired by one metric over every test case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preconditions {
    records: Vec<PreconditionRecord>,
}

impl Preconditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `kind` for `test_case`. Returns `true` if the precondition prevents the
    /// computation.
    pub fn fire(&mut self, kind: PreconditionKind, test_case: &str) -> bool {
        match self.records.iter_mut().find(|r| r.kind == kind) {
            Some(record) => record.test_cases.push(String::from(test_case)),
            None => self.records.push(PreconditionRecord {
                kind,
                status: kind.status(),
                test_cases: vec![String::from(test_case)],
            }),
        }
        kind.status() == Status::Fail
    }

    /// The most severe status among the records, `Ok` when nothing was fired.
    pub fn status(&self) -> Status {
        self.records
            .iter()
            .map(|r| r.status)
            .max()
            .unwrap_or_default()
    }

    pub fn records(&self) -> &[PreconditionRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<PreconditionRecord> {
        self.records
    }
}
