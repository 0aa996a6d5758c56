/*!
This library evaluates the output of a system against a gold standard, for classification,
soft-label and ranking tasks. It computes the classical metrics (accuracy, precision, recall,
F-measure, Cohen's Kappa, nDCG, MAP, ...) along with the Information Contrast Model (ICM) family,
which takes into account the hierarchy of the classes and their frequency.

# Inputs
The gold standard and the predictions are lists of `Instance`. An instance belongs to a test case,
has an id and a value. The kind of value decides the task being evaluated:
* A single class (`"A"`): monolabel classification.
* A set of classes (`["A", "B"]`): multilabel classification.
* A weight for every class (`{"A": 0.7, "B": 0.3}`): soft labels (learning with disagreements).
* An integer: the relevance of the item in the gold standard (0 is not relevant) and its position
    in the ranking for the predictions.

Every test case is evaluated independently and the values of the test cases are averaged.

# Terminology
* A class is a label such as 'SEXIST' or 'NO'. Classes can be organized into a `Hierarchy`, which
    only the ICM family takes into account.
* A precondition is a condition a metric imposes on a test case. A failed precondition prevents the
    computation on the test case, a warning only annotates the result.
* A value is undefined (`None`) when its computation would divide by zero.
*/

mod comparator;
mod config;
mod dataset;
mod evaluation;
mod hierarchy;
mod metrics;
mod preconditions;
mod reporter;

// The public api starts here
pub use comparator::{ClassificationView, Comparator, Properties, RankingView};

pub use config::{
    EvallConfig, EvallConfigBuilder, RankingOrder, RankingOrderParsingError, ReportFormat,
    ReportFormatParsingError,
};

pub use dataset::{partition, Dataset, DatasetShape, Instance, Value, ValueShape};

pub use evaluation::{evaluate, evaluate_all, EvaluationError};

pub use hierarchy::{Hierarchy, HierarchyError, HierarchyNode};

pub use metrics::{
    Accuracy, CrossEntropy, Dcg, ExpectedReciprocalRank, FMeasure, Icm, IcmNorm, IcmSoft,
    IcmSoftNorm, Kappa, Mae, Map, Metric, MetricKind, MetricOutcome, Mrr, Ndcg, Precision,
    PrecisionAtK, RPrecision, Rbp, Recall, SystemPrecision, UnknownMetricError,
};

pub use preconditions::{PreconditionKind, PreconditionRecord, Preconditions, Status};

pub use reporter::{
    FormatErrorKind, FormatErrorRecord, MetricReport, MetricResults, Report, TestCaseResult,
};
