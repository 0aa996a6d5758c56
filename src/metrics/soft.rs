/*!
Metrics for soft labels, where every instance carries a weight for each class (learning with
disagreements). The soft ICM estimates, for every class, a normal distribution of the gold weights
and measures the information of a weight as the log of its upper tail.
*/
use super::{check_format, warn_ignored_hierarchy, Metric, MetricKind, MetricOutcome};
use crate::comparator::Comparator;
use crate::dataset::Value;
use crate::hierarchy::Hierarchy;
use crate::metrics::icm::normalize;
use crate::preconditions::Preconditions;
use ahash::HashMap as AHashMap;
use ndarray::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use std::borrow::Cow;

const ALPHA_PRED: f64 = 2.0;
const ALPHA_GOLD: f64 = 2.0;
const BETA: f64 = 3.0;
/// Weight given to the classes with a null or negative weight before computing the entropy.
const SMOOTHING_WEIGHT: f64 = 0.001;

type WeightedClasses = Vec<(String, f64)>;

fn soft_weights(value: &Value) -> AHashMap<String, f64> {
    match value {
        Value::Soft(weights) => weights.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        _ => AHashMap::default(),
    }
}

fn weighted_classes(value: &Value) -> WeightedClasses {
    match value {
        Value::Soft(weights) => weights.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        _ => vec![],
    }
}

/// One row per instance, one column per class. Absent classes get a weight of 0.
fn weights_table(rows: &[AHashMap<String, f64>], classes: &[String]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), classes.len()), |(i, j)| {
        rows[i].get(&classes[j]).copied().unwrap_or(0.0)
    })
}

/// Union of weighted classes keeping the maximum weight of every class, in the order of `first`
/// then `second`.
fn soft_union(first: &[(String, f64)], second: &[(String, f64)]) -> WeightedClasses {
    let mut union: WeightedClasses = first.to_vec();
    for (class, weight) in second {
        match union.iter_mut().find(|(c, _)| c == class) {
            Some((_, w)) => *w = w.max(*weight),
            None => union.push((class.clone(), *weight)),
        }
    }
    union
}

/// Distribution of the gold weights of every class, for a single soft ICM computation.
#[derive(Debug)]
pub(crate) struct SoftContext<'a> {
    gold_len: usize,
    hierarchy: Option<Cow<'a, Hierarchy>>,
    index: AHashMap<String, usize>,
    means: Array1<f64>,
    deviations: Array1<f64>,
}

impl<'a> SoftContext<'a> {
    pub(crate) fn new(comparator: &Comparator<'a>) -> Self {
        let gold = comparator.gold();
        let gold_len = gold.len();
        let hierarchy: Option<Cow<'a, Hierarchy>> = comparator
            .hierarchy()
            .map(|h| Cow::Owned(h.with_missing_roots(gold.distinct_labels())));
        let classes: Vec<String> = match &hierarchy {
            Some(h) => h.classes().into_iter().map(String::from).collect(),
            None => gold
                .distinct_labels()
                .into_iter()
                .map(String::from)
                .collect(),
        };
        let rows: Vec<AHashMap<String, f64>> = gold
            .instances()
            .iter()
            .map(|instance| {
                let mut weights = soft_weights(&instance.value);
                if let Some(h) = &hierarchy {
                    h.propagate_max(&mut weights);
                }
                weights
            })
            .collect();
        let table = weights_table(&rows, &classes);
        let means = table
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(classes.len()));
        let deviations = (&table - &means)
            .mapv(f64::abs)
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(classes.len()));
        let index = classes
            .into_iter()
            .enumerate()
            .map(|(i, c)| (c, i))
            .collect();
        Self {
            gold_len,
            hierarchy,
            index,
            means,
            deviations,
        }
    }

    fn unseen_information(&self) -> f64 {
        -(1.0 / self.gold_len as f64).log2()
    }

    /// Information of a class with a given weight: the less likely it is to find a gold weight as
    /// high, the more informative.
    fn weighted_information(&self, class: &str, weight: f64) -> f64 {
        let Some(j) = self.index.get(class) else {
            return self.unseen_information();
        };
        if weight == 0.0 {
            return 0.0;
        }
        let (mean, deviation) = (self.means[*j], self.deviations[*j]);
        let tail = if deviation == 0.0 {
            // Degenerate distribution: every gold weight equals the mean
            if weight < mean {
                1.0
            } else {
                0.0
            }
        } else {
            match Normal::new(mean, deviation) {
                Ok(normal) => 1.0 - normal.cdf(weight),
                Err(_) => 0.0,
            }
        };
        if tail == 0.0 {
            self.unseen_information()
        } else {
            -tail.log2()
        }
    }

    /// Deepest common ancestor of `class` with every class of `others`, weighted by the smallest
    /// of the two weights.
    fn deepest_common_ancestors(
        &self,
        (class, weight): &(String, f64),
        others: &[(String, f64)],
    ) -> WeightedClasses {
        let Some(hierarchy) = self.hierarchy.as_deref() else {
            return vec![];
        };
        let Some(chain) = hierarchy.ancestors(class) else {
            return vec![];
        };
        let mut common: WeightedClasses = Vec::new();
        for (other, other_weight) in others {
            let Some(other_chain) = hierarchy.ancestors(other) else {
                continue;
            };
            let deepest = chain
                .iter()
                .zip(other_chain.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .last();
            if let Some(deepest) = deepest {
                common = soft_union(
                    &common,
                    &[(String::from(deepest), weight.min(*other_weight))],
                );
            }
        }
        common
    }

    fn information_content(&self, classes: &[(String, f64)]) -> f64 {
        let Some((first, rest)) = classes.split_first() else {
            return 0.0;
        };
        let common = self.deepest_common_ancestors(first, rest);
        self.weighted_information(&first.0, first.1) + self.information_content(rest)
            - self.information_content(&common)
    }

    fn instance_score(&self, pred: &[(String, f64)], gold: &[(String, f64)]) -> f64 {
        let union = soft_union(gold, pred);
        ALPHA_PRED * self.information_content(pred) + ALPHA_GOLD * self.information_content(gold)
            - BETA * self.information_content(&union)
    }
}

/// Soft ICM averaged over the gold instances. The scores use the weights as given, the
/// propagated weights only shape the distributions.
fn icm_soft(comparator: &Comparator) -> f64 {
    let context = SoftContext::new(comparator);
    let gold = comparator.gold();
    let pred = comparator.pred();
    let total: f64 = gold
        .instances()
        .iter()
        .map(|instance| {
            let gold_classes = weighted_classes(&instance.value);
            let pred_classes = pred
                .get(&instance.id)
                .map(|p| weighted_classes(&p.value))
                .unwrap_or_default();
            context.instance_score(&pred_classes, &gold_classes)
        })
        .sum();
    total / gold.len() as f64
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IcmSoft;

impl Metric for IcmSoft {
    fn kind(&self) -> MetricKind {
        MetricKind::ICMSoft
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !check_format(comparator, preconditions, comparator.properties().lewidi) {
            return None;
        }
        Some(MetricOutcome::average(Some(icm_soft(comparator))))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IcmSoftNorm;

impl Metric for IcmSoftNorm {
    fn kind(&self) -> MetricKind {
        MetricKind::ICMSoftNorm
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !check_format(comparator, preconditions, comparator.properties().lewidi) {
            return None;
        }
        let value = icm_soft(comparator);
        let reference = Comparator::new(
            comparator.gold(),
            comparator.gold(),
            comparator.hierarchy(),
            comparator.ranking_order(),
        );
        let reference_value = icm_soft(&reference);
        log::debug!(
            "Soft ICM of the test case {}: {} (gold against itself: {})",
            comparator.test_case(),
            value,
            reference_value
        );
        Some(MetricOutcome::average(normalize(value, reference_value)))
    }
}

/// Smooths the null weights and rescales the weights so that they sum to 1.
fn probabilities(value: &Value) -> AHashMap<String, f64> {
    let mut weights = soft_weights(value);
    for w in weights.values_mut() {
        if *w <= 0.0 {
            *w = SMOOTHING_WEIGHT
        }
    }
    let sum: f64 = weights.values().sum();
    for w in weights.values_mut() {
        *w /= sum
    }
    weights
}

/// Cross entropy, in bits, of the predicted distributions relative to the gold distributions.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropy;

impl Metric for CrossEntropy {
    fn kind(&self) -> MetricKind {
        MetricKind::CrossEntropy
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !check_format(comparator, preconditions, comparator.properties().lewidi) {
            return None;
        }
        warn_ignored_hierarchy(comparator, preconditions);
        let gold = comparator.gold();
        let pred = comparator.pred();
        let total: f64 = gold
            .instances()
            .iter()
            .filter_map(|instance| {
                let predicted = probabilities(&pred.get(&instance.id)?.value);
                let expected = probabilities(&instance.value);
                let entropy: f64 = expected
                    .iter()
                    .filter_map(|(class, g)| Some(g * predicted.get(class)?.log2()))
                    .sum();
                Some(-entropy)
            })
            .sum();
        Some(MetricOutcome::average(Some(total / gold.len() as f64)))
    }
}

/// Mean absolute error between gold and predicted weights, over the classes of the gold
/// standard.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mae;

impl Metric for Mae {
    fn kind(&self) -> MetricKind {
        MetricKind::MAE
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !check_format(comparator, preconditions, comparator.properties().lewidi) {
            return None;
        }
        warn_ignored_hierarchy(comparator, preconditions);
        let gold = comparator.gold();
        let pred = comparator.pred();
        let classes: Vec<String> = comparator
            .classes_in_gold()
            .into_iter()
            .map(String::from)
            .collect();
        let (gold_rows, pred_rows): (Vec<_>, Vec<_>) = gold
            .instances()
            .iter()
            .map(|instance| {
                let predicted = pred
                    .get(&instance.id)
                    .map(|p| soft_weights(&p.value))
                    .unwrap_or_default();
                (soft_weights(&instance.value), predicted)
            })
            .unzip();
        let errors = (weights_table(&gold_rows, &classes) - weights_table(&pred_rows, &classes))
            .mapv(f64::abs);
        let mae = errors
            .mean_axis(Axis(1))
            .and_then(|per_instance| per_instance.mean());
        Some(MetricOutcome::average(mae))
    }
}
