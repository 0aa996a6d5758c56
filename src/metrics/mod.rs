/**
This module holds the catalogue of metrics. Every metric implements the `Metric` trait: it checks
its preconditions against a `Comparator` and computes its value for one test case. Metrics are
stateless, every table they need is built for the duration of a single call.
*/
use crate::comparator::Comparator;
use crate::config::EvallConfig;
use crate::preconditions::{PreconditionKind, Preconditions};
use enum_iterator::{all, Sequence};
use ndarray::Array1;
use num::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

mod classification;
mod icm;
mod ranking;
mod soft;

pub use classification::{Accuracy, FMeasure, Kappa, Precision, Recall, SystemPrecision};
pub use icm::{Icm, IcmNorm};
pub use ranking::{Dcg, ExpectedReciprocalRank, Map, Mrr, Ndcg, PrecisionAtK, RPrecision, Rbp};
pub use soft::{CrossEntropy, IcmSoft, IcmSoftNorm, Mae};

/// Value of a metric for one test case. `None` means the value is undefined, most often because of
/// a division by zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricOutcome {
    pub average: Option<f64>,
    pub classes: Option<BTreeMap<String, Option<f64>>>,
}

impl MetricOutcome {
    pub fn average(average: Option<f64>) -> Self {
        Self {
            average,
            classes: None,
        }
    }

    pub fn per_class(classes: BTreeMap<String, Option<f64>>, average: Option<f64>) -> Self {
        Self {
            average,
            classes: Some(classes),
        }
    }
}

pub trait Metric {
    fn kind(&self) -> MetricKind;

    /// Checks the preconditions of the metric and computes its value on the test case held by
    /// `comparator`. Returns `None` when a failing precondition was fired in `preconditions`.
    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome>;
}

/// Every metric known to the library.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
pub enum MetricKind {
    Accuracy,
    SystemPrecision,
    Kappa,
    Precision,
    Recall,
    FMeasure,
    ICM,
    ICMNorm,
    ICMSoft,
    ICMSoftNorm,
    CrossEntropy,
    MAE,
    PrecisionAtK,
    RPrecision,
    MRR,
    MAP,
    DCG,
    nDCG,
    ERR,
    RBP,
}

impl MetricKind {
    /// Stable identifier of the metric, used in reports.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Accuracy => "Accuracy",
            Self::SystemPrecision => "SystemPrecision",
            Self::Kappa => "Kappa",
            Self::Precision => "Precision",
            Self::Recall => "Recall",
            Self::FMeasure => "FMeasure",
            Self::ICM => "ICM",
            Self::ICMNorm => "ICMNorm",
            Self::ICMSoft => "ICMSoft",
            Self::ICMSoftNorm => "ICMSoftNorm",
            Self::CrossEntropy => "CrossEntropy",
            Self::MAE => "MAE",
            Self::PrecisionAtK => "PrecisionAtK",
            Self::RPrecision => "RPrecision",
            Self::MRR => "MRR",
            Self::MAP => "MAP",
            Self::DCG => "DCG",
            Self::nDCG => "nDCG",
            Self::ERR => "ERR",
            Self::RBP => "RBP",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Accuracy => "Accuracy",
            Self::SystemPrecision => "System Precision",
            Self::Kappa => "Cohen's Kappa",
            Self::Precision => "Precision",
            Self::Recall => "Recall",
            Self::FMeasure => "F-Measure",
            Self::ICM => "Information Contrast Model",
            Self::ICMNorm => "Normalized Information Contrast Model",
            Self::ICMSoft => "Information Contrast Model Soft",
            Self::ICMSoftNorm => "Normalized Information Contrast Model Soft",
            Self::CrossEntropy => "Cross Entropy",
            Self::MAE => "Mean Absolute Error",
            Self::PrecisionAtK => "Precision at k",
            Self::RPrecision => "R Precision",
            Self::MRR => "Mean Reciprocal Rank",
            Self::MAP => "Mean Average Precision",
            Self::DCG => "Discounted Cumulative Gain",
            Self::nDCG => "Normalized Discounted Cumulative Gain",
            Self::ERR => "Expected Reciprocal Rank",
            Self::RBP => "Rank Biased Precision",
        }
    }

    pub fn acronym(&self) -> &'static str {
        match self {
            Self::Accuracy => "Acc",
            Self::SystemPrecision => "SP",
            Self::Kappa => "Kappa",
            Self::Precision => "Pr",
            Self::Recall => "Re",
            Self::FMeasure => "F1",
            Self::ICM => "ICM",
            Self::ICMNorm => "ICM-Norm",
            Self::ICMSoft => "ICM-Soft",
            Self::ICMSoftNorm => "ICM-Soft-Norm",
            Self::CrossEntropy => "CE",
            Self::MAE => "MAE",
            Self::PrecisionAtK => "P@k",
            Self::RPrecision => "RPre",
            Self::MRR => "MRR",
            Self::MAP => "MAP",
            Self::DCG => "DCG",
            Self::nDCG => "nDCG",
            Self::ERR => "ERR",
            Self::RBP => "RBP",
        }
    }

    /// Every metric, in catalogue order.
    pub fn all() -> Vec<MetricKind> {
        all::<MetricKind>().collect()
    }

    /// Metrics evaluating monolabel or multilabel classification.
    pub fn classification() -> Vec<MetricKind> {
        vec![
            Self::Accuracy,
            Self::SystemPrecision,
            Self::Kappa,
            Self::Precision,
            Self::Recall,
            Self::FMeasure,
            Self::ICM,
            Self::ICMNorm,
        ]
    }

    /// Metrics evaluating soft labels.
    pub fn lewidi() -> Vec<MetricKind> {
        vec![
            Self::ICMSoft,
            Self::ICMSoftNorm,
            Self::CrossEntropy,
            Self::MAE,
        ]
    }

    pub fn ranking() -> Vec<MetricKind> {
        vec![
            Self::PrecisionAtK,
            Self::RPrecision,
            Self::MRR,
            Self::MAP,
            Self::DCG,
            Self::nDCG,
            Self::ERR,
            Self::RBP,
        ]
    }

    /// Builds the metric, with its parameters taken from `config`.
    pub fn metric(&self, config: &EvallConfig) -> Box<dyn Metric> {
        match self {
            Self::Accuracy => Box::new(Accuracy),
            Self::SystemPrecision => Box::new(SystemPrecision),
            Self::Kappa => Box::new(Kappa),
            Self::Precision => Box::new(Precision),
            Self::Recall => Box::new(Recall),
            Self::FMeasure => Box::new(FMeasure::new(config.fmeasure_alpha)),
            Self::ICM => Box::new(Icm),
            Self::ICMNorm => Box::new(IcmNorm),
            Self::ICMSoft => Box::new(IcmSoft),
            Self::ICMSoftNorm => Box::new(IcmSoftNorm),
            Self::CrossEntropy => Box::new(CrossEntropy),
            Self::MAE => Box::new(Mae),
            Self::PrecisionAtK => Box::new(PrecisionAtK::new(config.precision_at_k)),
            Self::RPrecision => Box::new(RPrecision),
            Self::MRR => Box::new(Mrr),
            Self::MAP => Box::new(Map::new(config.map_cutoff)),
            Self::DCG => Box::new(Dcg),
            Self::nDCG => Box::new(Ndcg),
            Self::ERR => Box::new(ExpectedReciprocalRank),
            Self::RBP => Box::new(Rbp::new(config.rbp_persistence)),
        }
    }
}

impl Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetricError(String);

impl UnknownMetricError {
    pub fn code(&self) -> &'static str {
        "METRIC_UNKONW_METRIC_ERROR"
    }
}

impl Display for UnknownMetricError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Impossible to parse the string ({}) into a MetricKind",
            self.0
        )
    }
}
impl Error for UnknownMetricError {}

/// Accepts the identifier or the acronym of a metric, ignoring the case.
impl FromStr for MetricKind {
    type Err = UnknownMetricError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowercase = s.to_lowercase();
        all::<MetricKind>()
            .find(|kind| {
                kind.identifier().to_lowercase() == lowercase
                    || kind.acronym().to_lowercase() == lowercase
            })
            .ok_or_else(|| UnknownMetricError(String::from(s)))
    }
}

/// Division returning `None` when the denominator is zero.
pub(crate) fn ratio<N: ToPrimitive + Zero>(numerator: N, denominator: N) -> Option<f64> {
    if denominator.is_zero() {
        return None;
    }
    Some(numerator.to_f64()? / denominator.to_f64()?)
}

/// Arithmetic mean, `None` for an empty input.
pub(crate) fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    Array1::from_iter(values).mean()
}

/// Fires `NotValidFormatForContext` when the values of the test case can't be evaluated by the
/// metric. Returns `true` if the evaluation can go on.
pub(crate) fn check_format(
    comparator: &Comparator,
    preconditions: &mut Preconditions,
    accepted: bool,
) -> bool {
    accepted
        || !preconditions.fire(
            PreconditionKind::NotValidFormatForContext,
            comparator.test_case(),
        )
}

/// Warns that the hierarchy given with the test case plays no role in the metric.
pub(crate) fn warn_ignored_hierarchy(comparator: &Comparator, preconditions: &mut Preconditions) {
    if comparator.hierarchy().is_some() {
        preconditions.fire(
            PreconditionKind::HierarchyNotValidForMetric,
            comparator.test_case(),
        );
    }
}
