/*!
Ranking metrics. The gold standard gives the relevance of every item (0 meaning not relevant) and
the predictions give their position in the ranking, see `RankingOrder`. Every metric is undefined
when the gold standard has no relevant item.
*/
use super::{check_format, ratio, Metric, MetricKind, MetricOutcome};
use crate::comparator::{Comparator, RankingView};
use crate::preconditions::{PreconditionKind, Preconditions};

/// Returns the ranking view of the test case, after checking the format and warning about
/// predictions sharing the same value.
fn ranking_view<'c>(
    comparator: &'c Comparator,
    preconditions: &mut Preconditions,
) -> Option<&'c RankingView> {
    if !check_format(comparator, preconditions, comparator.properties().ranking) {
        return None;
    }
    let view = comparator.ranking()?;
    if view.has_duplicate_values() {
        preconditions.fire(
            PreconditionKind::DuplicatedValuesRanking,
            comparator.test_case(),
        );
    }
    Some(view)
}

/// Exponential gain of a relevance level: `2^rel - 1`.
#[inline]
fn gain(relevance: u64) -> f64 {
    2f64.powf(relevance as f64) - 1.0
}

/// Logarithmic discount of a 0-based position.
#[inline]
fn discount(index: usize) -> f64 {
    (index as f64 + 2.0).log2()
}

fn dcg(view: &RankingView, ids: &[String]) -> f64 {
    ids.iter()
        .enumerate()
        .filter_map(|(k, id)| Some(gain(view.gold_relevance(id)?) / discount(k)))
        .sum()
}

/// Proportion of relevant items among the first `k` predictions.
#[derive(Debug, Clone, Copy)]
pub struct PrecisionAtK {
    k: usize,
}

impl PrecisionAtK {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl Default for PrecisionAtK {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Metric for PrecisionAtK {
    fn kind(&self) -> MetricKind {
        MetricKind::PrecisionAtK
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        let precision = ratio(view.first_k_relevant(self.k), self.k);
        Some(MetricOutcome::average(precision))
    }
}

/// Precision at R, where R is the number of relevant items in the gold standard.
#[derive(Debug, Clone, Copy, Default)]
pub struct RPrecision;

impl Metric for RPrecision {
    fn kind(&self) -> MetricKind {
        MetricKind::RPrecision
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        let r = view.relevant_count();
        Some(MetricOutcome::average(ratio(view.first_k_relevant(r), r)))
    }
}

/// Inverse of the position of the first relevant item.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mrr;

impl Metric for Mrr {
    fn kind(&self) -> MetricKind {
        MetricKind::MRR
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        if view.relevant_count() == 0 {
            return Some(MetricOutcome::average(None));
        }
        let reciprocal_rank = view
            .position_of_first_relevant()
            .map(|position| 1.0 / position as f64)
            .unwrap_or(0.0);
        Some(MetricOutcome::average(Some(reciprocal_rank)))
    }
}

/// Mean of the precisions at the position of every relevant prediction, within a cutoff.
#[derive(Debug, Clone, Copy)]
pub struct Map {
    cutoff: usize,
}

impl Map {
    pub fn new(cutoff: usize) -> Self {
        Self { cutoff }
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl Metric for Map {
    fn kind(&self) -> MetricKind {
        MetricKind::MAP
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        let ids = view.sorted_ids();
        let precision_sum: f64 = ids
            .iter()
            .take(self.cutoff)
            .enumerate()
            .filter(|(_, id)| view.is_relevant(id))
            .map(|(k, _)| view.first_k_relevant(k + 1) as f64 / (k + 1) as f64)
            .sum();
        let average_precision = ratio(precision_sum, view.relevant_count() as f64);
        Some(MetricOutcome::average(average_precision))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dcg;

impl Metric for Dcg {
    fn kind(&self) -> MetricKind {
        MetricKind::DCG
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        if view.relevant_count() == 0 {
            return Some(MetricOutcome::average(None));
        }
        Some(MetricOutcome::average(Some(dcg(view, view.sorted_ids()))))
    }
}

/// DCG divided by the DCG of the perfect ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ndcg;

impl Metric for Ndcg {
    fn kind(&self) -> MetricKind {
        MetricKind::nDCG
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        let actual = dcg(view, view.sorted_ids());
        let ideal = dcg(view, view.perfect_ranking());
        log::debug!(
            "DCG of the test case {}: {} (ideal: {})",
            comparator.test_case(),
            actual,
            ideal
        );
        Some(MetricOutcome::average(ratio(actual, ideal)))
    }
}

/// Expected reciprocal rank: the user goes down the ranking and stops at an item with a
/// probability growing with its relevance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectedReciprocalRank;

impl Metric for ExpectedReciprocalRank {
    fn kind(&self) -> MetricKind {
        MetricKind::ERR
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        if view.relevant_count() == 0 {
            return Some(MetricOutcome::average(None));
        }
        let max_relevance = view.max_gold_relevance();
        let max_gain = if max_relevance > 0 {
            2f64.powf(max_relevance as f64)
        } else {
            0.0
        };
        let stop_probability = |id: &str| -> f64 {
            match view.gold_relevance(id) {
                Some(relevance) if max_gain > 0.0 => gain(relevance) / max_gain,
                _ => 0.0,
            }
        };
        let mut err = 0.0;
        let mut continue_probability = 1.0;
        for (k, id) in view.sorted_ids().iter().enumerate() {
            let r = stop_probability(id.as_str());
            err += continue_probability * r / (k + 1) as f64;
            continue_probability *= 1.0 - r;
        }
        Some(MetricOutcome::average(Some(err)))
    }
}

/// Rank biased precision, for a user going to the next item with probability `persistence`.
#[derive(Debug, Clone, Copy)]
pub struct Rbp {
    persistence: f64,
}

impl Rbp {
    pub fn new(persistence: f64) -> Self {
        Self { persistence }
    }
}

impl Default for Rbp {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl Metric for Rbp {
    fn kind(&self) -> MetricKind {
        MetricKind::RBP
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        let view = ranking_view(comparator, preconditions)?;
        if view.relevant_count() == 0 {
            return Some(MetricOutcome::average(None));
        }
        let sum: f64 = view
            .sorted_ids()
            .iter()
            .enumerate()
            .filter_map(|(k, id)| {
                let relevance = view.gold_relevance(id)?;
                Some(relevance as f64 * self.persistence.powi(k as i32))
            })
            .sum();
        Some(MetricOutcome::average(Some((1.0 - self.persistence) * sum)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::tests::dataset;
    use crate::config::RankingOrder;
    use crate::dataset::{Dataset, Instance};
    use crate::metrics::tests::CloseEnough;
    use crate::preconditions::Status;
    use quickcheck::{QuickCheck, TestResult};
    use rstest::rstest;

    fn run<M: Metric>(metric: M, gold: &Dataset, pred: &Dataset) -> Option<f64> {
        let comparator = Comparator::new(gold, pred, None, RankingOrder::Ascending);
        metric
            .evaluate(&comparator, &mut Preconditions::new())
            .and_then(|o| o.average)
    }

    fn gold() -> Dataset {
        dataset(&[("id1", 1u64), ("id2", 0u64), ("id3", 1u64)])
    }

    fn pred() -> Dataset {
        dataset(&[("id1", 2u64), ("id2", 1u64), ("id3", 3u64)])
    }

    #[rstest]
    #[case(Box::new(RPrecision) as Box<dyn Metric>, Some(0.5))]
    #[case(Box::new(PrecisionAtK::new(2)) as Box<dyn Metric>, Some(0.5))]
    #[case(Box::new(PrecisionAtK::default()) as Box<dyn Metric>, Some(0.2))]
    #[case(Box::new(Mrr) as Box<dyn Metric>, Some(0.5))]
    #[case(Box::new(Map::default()) as Box<dyn Metric>, Some((0.5 + 2.0 / 3.0) / 2.0))]
    #[case(Box::new(Map::new(2)) as Box<dyn Metric>, Some(0.25))]
    #[case(Box::new(Dcg) as Box<dyn Metric>, Some(1.0 / 3f64.log2() + 0.5))]
    #[case(Box::new(Ndcg) as Box<dyn Metric>, Some((1.0 / 3f64.log2() + 0.5) / (1.0 + 1.0 / 3f64.log2())))]
    #[case(Box::new(ExpectedReciprocalRank) as Box<dyn Metric>, Some(0.5 / 2.0 + 0.5 * 0.5 / 3.0))]
    #[case(Box::new(Rbp::default()) as Box<dyn Metric>, Some(0.2 * (0.8 + 0.64)))]
    fn test_ranking_metrics(#[case] metric: Box<dyn Metric>, #[case] expected: Option<f64>) {
        let gold = gold();
        let pred = pred();
        let comparator = Comparator::new(&gold, &pred, None, RankingOrder::Ascending);
        let actual = metric
            .evaluate(&comparator, &mut Preconditions::new())
            .and_then(|o| o.average);
        assert!(actual.are_close(&expected, 1e-9), "{:?} != {:?}", actual, expected);
    }

    #[rstest]
    #[case(Box::new(RPrecision) as Box<dyn Metric>)]
    #[case(Box::new(Mrr) as Box<dyn Metric>)]
    #[case(Box::new(Map::default()) as Box<dyn Metric>)]
    #[case(Box::new(Dcg) as Box<dyn Metric>)]
    #[case(Box::new(Ndcg) as Box<dyn Metric>)]
    #[case(Box::new(ExpectedReciprocalRank) as Box<dyn Metric>)]
    #[case(Box::new(Rbp::default()) as Box<dyn Metric>)]
    fn test_undefined_without_relevant_items(#[case] metric: Box<dyn Metric>) {
        let gold = dataset(&[("a", 0u64), ("b", 0u64)]);
        let pred = dataset(&[("a", 1u64), ("b", 2u64)]);
        let comparator = Comparator::new(&gold, &pred, None, RankingOrder::Ascending);
        let outcome = metric.evaluate(&comparator, &mut Preconditions::new());
        assert_eq!(outcome, Some(MetricOutcome::average(None)));
    }

    #[test]
    fn test_mrr_without_relevant_predictions() {
        let gold = dataset(&[("a", 1u64), ("b", 0u64)]);
        let pred = dataset(&[("b", 1u64), ("c", 2u64)]);
        assert_eq!(run(Mrr, &gold, &pred), Some(0.0));
    }

    #[test]
    fn test_perfect_ranking() {
        let gold = dataset(&[("a", 3u64), ("b", 2u64), ("c", 0u64), ("d", 1u64)]);
        let pred = dataset(&[("a", 1u64), ("b", 2u64), ("d", 3u64), ("c", 4u64)]);
        assert!(run(Ndcg, &gold, &pred).are_close(&Some(1.0), 1e-9));
        assert!(run(Map::default(), &gold, &pred).are_close(&Some(1.0), 1e-9));
        assert_eq!(run(Mrr, &gold, &pred), Some(1.0));
        assert_eq!(run(RPrecision, &gold, &pred), Some(1.0));
    }

    #[test]
    fn test_descending_order() {
        let gold = gold();
        let scores = dataset(&[("id1", 5u64), ("id2", 9u64), ("id3", 1u64)]);
        let comparator = Comparator::new(&gold, &scores, None, RankingOrder::Descending);
        let outcome = Mrr.evaluate(&comparator, &mut Preconditions::new());
        assert_eq!(outcome.and_then(|o| o.average), Some(0.5));
    }

    #[test]
    fn test_duplicated_values_warning() {
        let gold = gold();
        let pred = dataset(&[("id1", 1u64), ("id2", 1u64), ("id3", 2u64)]);
        let comparator = Comparator::new(&gold, &pred, None, RankingOrder::Ascending);
        let mut preconditions = Preconditions::new();
        let outcome = RPrecision.evaluate(&comparator, &mut preconditions);
        assert_eq!(outcome.and_then(|o| o.average), Some(0.5));
        assert_eq!(preconditions.status(), Status::Warning);
        assert_eq!(
            preconditions.records()[0].kind,
            PreconditionKind::DuplicatedValuesRanking
        );
    }

    #[test]
    fn test_ranking_metrics_reject_labels() {
        let gold = dataset(&[("a", "A")]);
        let comparator = Comparator::new(&gold, &gold, None, RankingOrder::Ascending);
        let mut preconditions = Preconditions::new();
        assert_eq!(Ndcg.evaluate(&comparator, &mut preconditions), None);
        assert_eq!(preconditions.status(), Status::Fail);
    }

    #[test]
    fn test_property_ndcg_is_bounded() {
        fn bounded(relevances: Vec<u8>, positions: Vec<u16>) -> TestResult {
            if relevances.is_empty() {
                return TestResult::discard();
            }
            let gold = Dataset::new(
                "T1",
                relevances
                    .iter()
                    .enumerate()
                    .map(|(i, r)| Instance::new("T1", &i.to_string(), (r % 4) as u64))
                    .collect(),
            );
            let pred = Dataset::new(
                "T1",
                positions
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Instance::new("T1", &i.to_string(), *p as u64))
                    .collect(),
            );
            match run(Ndcg, &gold, &pred) {
                Some(ndcg) if !(0.0..=1.0 + 1e-9).contains(&ndcg) => TestResult::failed(),
                _ => TestResult::passed(),
            }
        }
        let mut qc = QuickCheck::new().tests(1000);
        qc.quickcheck(bounded as fn(Vec<u8>, Vec<u16>) -> TestResult)
    }
}
