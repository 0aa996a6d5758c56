/*
 * This modules contains the configuration of an evaluation. Most importantly, it contains the
 * `EvallConfig` struct, which implements the default trait, and its builder. The config can be
 * passed to the `evaluate` function to simplify its arguments.
*/
use crate::hierarchy::Hierarchy;
use either::Either as LeftOrRight;
use std::error::Error;
use std::fmt::{Debug, Display};
use std::str::FromStr;

/// How the values of the ranking predictions must be read. With `Ascending`, the values are rank
/// positions and the item with the smallest value is the top of the ranking. With `Descending`,
/// the values are scores and the item with the highest value is the top of the ranking. Ties are
/// always broken by the order of the predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RankingOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingOrderParsingError(String);

impl Display for RankingOrderParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Impossible to parse the string ({}) into a RankingOrder",
            self.0
        )
    }
}
impl Error for RankingOrderParsingError {}

impl FromStr for RankingOrder {
    type Err = RankingOrderParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ascending" | "asc" | "rank" => Ok(RankingOrder::Ascending),
            "descending" | "desc" | "score" => Ok(RankingOrder::Descending),
            _ => Err(RankingOrderParsingError(String::from(s))),
        }
    }
}

/// Output format used by `Report::render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFormatParsingError(String);

impl Display for ReportFormatParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Impossible to parse the string ({}) into a ReportFormat",
            self.0
        )
    }
}
impl Error for ReportFormatParsingError {}

impl FromStr for ReportFormat {
    type Err = ReportFormatParsingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "dataframe" => Ok(ReportFormat::Table),
            "json" | "embedded" => Ok(ReportFormat::Json),
            _ => Err(ReportFormatParsingError(String::from(s))),
        }
    }
}

/// Config struct used to simplify the inputs of `evaluate`. It implements the default trait.
#[derive(Clone, Debug, PartialEq)]
pub struct EvallConfig {
    /// Optional hierarchy of classes. Only the ICM family takes it into account; the other
    /// classification metrics emit a warning when it is given.
    pub(crate) hierarchy: Option<Hierarchy>,
    /// How to read the values of the ranking predictions.
    pub(crate) ranking_order: RankingOrder,
    /// Cutoff of the `PrecisionAtK` metric.
    pub(crate) precision_at_k: usize,
    /// Maximal number of ranked predictions considered by `MAP`.
    pub(crate) map_cutoff: usize,
    /// Persistence parameter of `RBP`.
    pub(crate) rbp_persistence: f64,
    /// Weight of the precision in the F-measure. `0.5` gives the F1 score.
    pub(crate) fmeasure_alpha: f64,
    pub(crate) report_format: ReportFormat,
}

impl EvallConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn hierarchy(&self) -> Option<&Hierarchy> {
        self.hierarchy.as_ref()
    }
    pub fn ranking_order(&self) -> RankingOrder {
        self.ranking_order
    }
    pub fn report_format(&self) -> ReportFormat {
        self.report_format
    }
}

impl Default for EvallConfig {
    fn default() -> Self {
        Self {
            hierarchy: None,
            ranking_order: RankingOrder::Ascending,
            precision_at_k: 10,
            map_cutoff: 1000,
            rbp_persistence: 0.8,
            fmeasure_alpha: 0.5,
            report_format: ReportFormat::Table,
        }
    }
}

impl Display for EvallConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let string = format!("Hierarchy: {:?}\n Ranking order: {:?}\n Precision at k: {}\n MAP cutoff: {}\n RBP persistence: {}\n F-measure alpha: {}\n Report format: {:?}", self.hierarchy, self.ranking_order, self.precision_at_k, self.map_cutoff, self.rbp_persistence, self.fmeasure_alpha, self.report_format);
        write!(f, "{}", string)
    }
}

impl<Order> From<EvallConfigBuilder<Order>> for EvallConfig
where
    Order: Into<RankingOrder>,
{
    fn from(value: EvallConfigBuilder<Order>) -> Self {
        Self {
            hierarchy: value.hierarchy,
            ranking_order: value.ranking_order.either_into(),
            precision_at_k: value.precision_at_k,
            map_cutoff: value.map_cutoff,
            rbp_persistence: value.rbp_persistence,
            fmeasure_alpha: value.fmeasure_alpha,
            report_format: value.report_format,
        }
    }
}

/// This builder can be used to build and customize an `EvallConfig` structure.
pub struct EvallConfigBuilder<Order = RankingOrder>
where
    Order: Into<RankingOrder>,
{
    hierarchy: Option<Hierarchy>,
    ranking_order: LeftOrRight<Order, RankingOrder>,
    precision_at_k: usize,
    map_cutoff: usize,
    rbp_persistence: f64,
    fmeasure_alpha: f64,
    report_format: ReportFormat,
}

impl Default for EvallConfigBuilder<RankingOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Order> EvallConfigBuilder<Order>
where
    Order: Into<RankingOrder>,
{
    pub fn hierarchy(mut self, hierarchy: Hierarchy) -> Self {
        self.hierarchy = Some(hierarchy);
        self
    }
    pub fn ranking_order(mut self, ranking_order: Order) -> Self {
        self.ranking_order = LeftOrRight::Left(ranking_order);
        self
    }
    pub fn precision_at_k(mut self, k: usize) -> Self {
        self.precision_at_k = k;
        self
    }
    pub fn map_cutoff(mut self, cutoff: usize) -> Self {
        self.map_cutoff = cutoff;
        self
    }
    pub fn rbp_persistence(mut self, persistence: f64) -> Self {
        self.rbp_persistence = persistence;
        self
    }
    pub fn fmeasure_alpha(mut self, alpha: f64) -> Self {
        self.fmeasure_alpha = alpha;
        self
    }
    pub fn report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }
    pub fn new() -> Self {
        let default = EvallConfig::default();
        Self {
            hierarchy: default.hierarchy,
            ranking_order: LeftOrRight::Right(default.ranking_order),
            precision_at_k: default.precision_at_k,
            map_cutoff: default.map_cutoff,
            rbp_persistence: default.rbp_persistence,
            fmeasure_alpha: default.fmeasure_alpha,
            report_format: default.report_format,
        }
    }
    pub fn build(self) -> EvallConfig {
        EvallConfig::from(self)
    }
}
