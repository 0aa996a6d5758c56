use super::{check_format, mean, ratio, warn_ignored_hierarchy, Metric, MetricKind, MetricOutcome};
use crate::comparator::Comparator;
use crate::preconditions::{PreconditionKind, Preconditions};
use std::collections::BTreeMap;

/// Proportion of gold instances predicted with their gold class.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accuracy;

impl Metric for Accuracy {
    fn kind(&self) -> MetricKind {
        MetricKind::Accuracy
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !check_format(comparator, preconditions, comparator.properties().monolabel) {
            return None;
        }
        warn_ignored_hierarchy(comparator, preconditions);
        let accuracy = ratio(comparator.trace(), comparator.gold_len());
        Some(MetricOutcome::average(accuracy))
    }
}

/// Proportion of the predictions that are correct.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPrecision;

impl Metric for SystemPrecision {
    fn kind(&self) -> MetricKind {
        MetricKind::SystemPrecision
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !check_format(comparator, preconditions, comparator.properties().monolabel) {
            return None;
        }
        warn_ignored_hierarchy(comparator, preconditions);
        let precision = ratio(comparator.trace(), comparator.pred_len());
        Some(MetricOutcome::average(precision))
    }
}

/// Cohen's Kappa: accuracy corrected by the agreement expected by chance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kappa;

impl Metric for Kappa {
    fn kind(&self) -> MetricKind {
        MetricKind::Kappa
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !check_format(comparator, preconditions, comparator.properties().monolabel) {
            return None;
        }
        warn_ignored_hierarchy(comparator, preconditions);
        if comparator.is_single_class_same_instances()
            && preconditions.fire(
                PreconditionKind::SingleClassSameInstances,
                comparator.test_case(),
            )
        {
            return None;
        }
        let view = comparator.classification()?;
        let total = comparator.gold_len();
        let chance: f64 = view
            .classes()
            .iter()
            .filter_map(|class| {
                let in_gold = comparator.count_gold_for_class(class);
                if in_gold == 0 {
                    return None;
                }
                Some(ratio(view.predicted_in_matrix(class), total)? * ratio(in_gold, total)?)
            })
            .sum();
        let kappa = ratio(comparator.trace(), total)
            .and_then(|accuracy| ratio(accuracy - chance, 1.0 - chance));
        log::debug!(
            "Kappa of the test case {}: chance agreement {}",
            comparator.test_case(),
            chance
        );
        Some(MetricOutcome::average(kappa))
    }
}

fn precision_per_class(comparator: &Comparator) -> BTreeMap<String, Option<f64>> {
    comparator
        .classes_in_gold()
        .into_iter()
        .map(|class| {
            let precision = comparator
                .count_pred_for_class(class)
                .and_then(|predicted| ratio(comparator.true_positives(class), predicted));
            (String::from(class), precision)
        })
        .collect()
}

fn recall_per_class(comparator: &Comparator) -> BTreeMap<String, Option<f64>> {
    comparator
        .classes_in_gold()
        .into_iter()
        .map(|class| {
            let recall = ratio(
                comparator.true_positives(class),
                comparator.count_gold_for_class(class),
            );
            (String::from(class), recall)
        })
        .collect()
}

fn classification_is_valid(comparator: &Comparator, preconditions: &mut Preconditions) -> bool {
    let properties = comparator.properties();
    if !check_format(
        comparator,
        preconditions,
        properties.monolabel || properties.multilabel,
    ) {
        return false;
    }
    warn_ignored_hierarchy(comparator, preconditions);
    true
}

/// Precision of every gold class. The average only considers the classes with a defined
/// precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct Precision;

impl Metric for Precision {
    fn kind(&self) -> MetricKind {
        MetricKind::Precision
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !classification_is_valid(comparator, preconditions) {
            return None;
        }
        let classes = precision_per_class(comparator);
        let average = mean(classes.values().flatten().copied());
        Some(MetricOutcome::per_class(classes, average))
    }
}

/// Recall of every gold class.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recall;

impl Metric for Recall {
    fn kind(&self) -> MetricKind {
        MetricKind::Recall
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !classification_is_valid(comparator, preconditions) {
            return None;
        }
        let classes = recall_per_class(comparator);
        let average = mean(classes.values().flatten().copied());
        Some(MetricOutcome::per_class(classes, average))
    }
}

/// Weighted harmonic mean of the precision and the recall of every gold class. An `alpha` of
/// `0.5` gives the F1 score.
#[derive(Debug, Clone, Copy)]
pub struct FMeasure {
    alpha: f64,
}

impl FMeasure {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }
}

impl Default for FMeasure {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Metric for FMeasure {
    fn kind(&self) -> MetricKind {
        MetricKind::FMeasure
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !classification_is_valid(comparator, preconditions) {
            return None;
        }
        let precisions = precision_per_class(comparator);
        let recalls = recall_per_class(comparator);
        let classes: BTreeMap<String, Option<f64>> = precisions
            .into_iter()
            .map(|(class, precision)| {
                let recall = recalls.get(&class).copied().flatten();
                let f_measure = match (precision, recall) {
                    (Some(p), Some(r)) if p > 0.0 && r > 0.0 => {
                        1.0 / (self.alpha / p + (1.0 - self.alpha) / r)
                    }
                    _ => 0.0,
                };
                (class, Some(f_measure))
            })
            .collect();
        let average = mean(classes.values().flatten().copied());
        Some(MetricOutcome::per_class(classes, average))
    }
}
