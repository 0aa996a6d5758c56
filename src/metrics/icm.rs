/*!
Information Contrast Model. The ICM of an instance rewards the information shared by the predicted
and the gold classes and penalizes the information of their union:
`ICM = α1·IC(pred) + α2·IC(gold) − β·IC(pred ∪ gold)`. The information content of a set of
classes takes the hierarchy into account through the deepest common ancestors of its classes.
*/
use super::{check_format, Metric, MetricKind, MetricOutcome};
use crate::comparator::Comparator;
use crate::hierarchy::Hierarchy;
use crate::preconditions::{PreconditionKind, Preconditions};
use ahash::HashMap as AHashMap;
use std::borrow::Cow;

const ALPHA_PRED: f64 = 2.0;
const ALPHA_GOLD: f64 = 2.0;
const BETA: f64 = 3.0;

/// Tables of a single ICM computation. The probabilities are estimated from the gold standard of
/// one test case and completed as unseen classes are queried.
#[derive(Debug)]
pub(crate) struct IcmContext<'a> {
    gold_len: usize,
    hierarchy: Option<Cow<'a, Hierarchy>>,
    probabilities: AHashMap<String, f64>,
}

impl<'a> IcmContext<'a> {
    pub(crate) fn new(comparator: &Comparator<'a>) -> Self {
        let gold = comparator.gold();
        let gold_len = gold.len();
        let properties = comparator.properties();
        let (hierarchy, frequencies) = match comparator.hierarchy() {
            Some(hierarchy) if properties.multilabel => {
                let extended = hierarchy.with_missing_roots(gold.distinct_labels());
                let frequencies: AHashMap<String, usize> = extended
                    .classes()
                    .into_iter()
                    .map(|class| {
                        let frequency = gold
                            .instances()
                            .iter()
                            .filter(|i| {
                                i.value.labels().into_iter().any(|label| {
                                    label == class || extended.is_descendant(class, label)
                                })
                            })
                            .count();
                        (String::from(class), frequency)
                    })
                    .collect();
                (Some(Cow::Owned(extended)), frequencies)
            }
            hierarchy => {
                let mut frequencies: AHashMap<String, usize> = gold
                    .distinct_labels()
                    .into_iter()
                    .map(|class| (String::from(class), gold.count_label(class)))
                    .collect();
                if let Some(hierarchy) = hierarchy {
                    hierarchy.propagate_frequency(&mut frequencies);
                }
                (hierarchy.map(Cow::Borrowed), frequencies)
            }
        };
        let probabilities = frequencies
            .into_iter()
            .map(|(class, frequency)| (class, frequency as f64 / gold_len as f64))
            .collect();
        Self {
            gold_len,
            hierarchy,
            probabilities,
        }
    }

    /// Probability of `class`. A class never seen in the gold standard gets the probability of a
    /// single instance.
    fn probability(&mut self, class: &str) -> f64 {
        match self.probabilities.get(class) {
            Some(p) if *p > 0.0 => *p,
            _ => {
                let p = 1.0 / self.gold_len as f64;
                self.probabilities.insert(String::from(class), p);
                p
            }
        }
    }

    /// Deepest common ancestor of `class` with every class of `others`, without repetition.
    fn deepest_common_ancestors(&self, class: &str, others: &[String]) -> Vec<String> {
        let Some(hierarchy) = self.hierarchy.as_deref() else {
            return vec![];
        };
        let Some(chain) = hierarchy.ancestors(class) else {
            return vec![];
        };
        let mut common: Vec<String> = Vec::new();
        for other in others {
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
                if !common.iter().any(|c| c == deepest) {
                    common.push(String::from(deepest))
                }
            }
        }
        common
    }

    pub(crate) fn information_content(&mut self, classes: &[String]) -> f64 {
        let Some((first, rest)) = classes.split_first() else {
            return 0.0;
        };
        let common = self.deepest_common_ancestors(first, rest);
        -self.probability(first).log2() + self.information_content(rest)
            - self.information_content(&common)
    }

    pub(crate) fn instance_score(&mut self, pred: &[String], gold: &[String]) -> f64 {
        let mut union: Vec<String> = pred.to_vec();
        for class in gold {
            if !union.contains(class) {
                union.push(class.clone())
            }
        }
        ALPHA_PRED * self.information_content(pred) + ALPHA_GOLD * self.information_content(gold)
            - BETA * self.information_content(&union)
    }
}

fn icm_is_valid(comparator: &Comparator, preconditions: &mut Preconditions) -> bool {
    let properties = comparator.properties();
    if !check_format(
        comparator,
        preconditions,
        properties.monolabel || properties.multilabel,
    ) {
        return false;
    }
    if properties.multilabel
        && comparator.hierarchy().is_none()
        && preconditions.fire(
            PreconditionKind::NotImplementedContext,
            comparator.test_case(),
        )
    {
        return false;
    }
    true
}

fn owned_labels(labels: Vec<&str>) -> Vec<String> {
    labels.into_iter().map(String::from).collect()
}

/// ICM averaged over the instances of the gold standard. A gold instance without prediction is
/// scored against an empty set of classes.
pub(crate) fn icm(comparator: &Comparator) -> f64 {
    let mut context = IcmContext::new(comparator);
    let gold = comparator.gold();
    let pred = comparator.pred();
    let total: f64 = gold
        .instances()
        .iter()
        .map(|instance| {
            let gold_classes = owned_labels(instance.value.labels());
            let pred_classes = pred
                .get(&instance.id)
                .map(|p| owned_labels(p.value.labels()))
                .unwrap_or_default();
            context.instance_score(&pred_classes, &gold_classes)
        })
        .sum();
    total / gold.len() as f64
}

/// Maps an ICM to [0, 1] with the ICM of the gold standard against itself: the worst system gets
/// 0 and a perfect system gets 1.
pub(crate) fn normalize(value: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }
    Some(((value + reference) / (2.0 * reference)).max(0.0))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Icm;

impl Metric for Icm {
    fn kind(&self) -> MetricKind {
        MetricKind::ICM
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !icm_is_valid(comparator, preconditions) {
            return None;
        }
        Some(MetricOutcome::average(Some(icm(comparator))))
    }
}

/// ICM normalized by the ICM of the gold standard against itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcmNorm;

impl Metric for IcmNorm {
    fn kind(&self) -> MetricKind {
        MetricKind::ICMNorm
    }

    fn evaluate(
        &self,
        comparator: &Comparator,
        preconditions: &mut Preconditions,
    ) -> Option<MetricOutcome> {
        if !icm_is_valid(comparator, preconditions) {
            return None;
        }
        let value = icm(comparator);
        let reference = Comparator::new(
            comparator.gold(),
            comparator.gold(),
            comparator.hierarchy(),
            comparator.ranking_order(),
        );
        let reference_value = icm(&reference);
        log::debug!(
            "ICM of the test case {}: {} (gold against itself: {})",
            comparator.test_case(),
            value,
            reference_value
        );
        Some(MetricOutcome::average(normalize(value, reference_value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::tests::dataset;
    use crate::config::RankingOrder;
    use crate::dataset::Dataset;
    use crate::hierarchy::HierarchyNode;
    use crate::metrics::tests::CloseEnough;
    use rstest::rstest;

    fn build_hierarchy() -> Hierarchy {
        Hierarchy::new(vec![
            HierarchyNode::node(
                "SEXIST",
                vec![
                    HierarchyNode::node(
                        "IDEOLOGICAL",
                        vec![HierarchyNode::leaf("I1"), HierarchyNode::leaf("I2")],
                    ),
                    HierarchyNode::leaf("STEREOTYPING"),
                ],
            ),
            HierarchyNode::leaf("NO"),
        ])
    }

    fn run<M: Metric>(
        metric: M,
        gold: &Dataset,
        pred: &Dataset,
        hierarchy: Option<&Hierarchy>,
    ) -> Option<f64> {
        let comparator = Comparator::new(gold, pred, hierarchy, RankingOrder::Ascending);
        metric
            .evaluate(&comparator, &mut Preconditions::new())
            .and_then(|o| o.average)
    }

    #[rstest]
    #[case(&[("0", "A"), ("1", "B")], Some(1.0), Some(1.0))]
    #[case(&[("0", "B"), ("1", "A")], Some(-2.0), Some(0.0))]
    #[case(&[("0", "A")], Some(0.0), Some(0.5))]
    fn test_flat_monolabel(
        #[case] predictions: &[(&str, &str)],
        #[case] expected_icm: Option<f64>,
        #[case] expected_norm: Option<f64>,
    ) {
        let gold = dataset(&[("0", "A"), ("1", "B")]);
        let pred = dataset(predictions);
        assert!(run(Icm, &gold, &pred, None).are_close(&expected_icm, 1e-9));
        assert!(run(IcmNorm, &gold, &pred, None).are_close(&expected_norm, 1e-9));
    }

    #[test]
    fn test_hierarchical_multilabel() {
        let hierarchy = build_hierarchy();
        let gold = dataset(&[
            ("0", vec!["I1"]),
            ("1", vec!["NO"]),
            ("2", vec!["STEREOTYPING"]),
            ("3", vec!["I2"]),
        ]);
        let pred = dataset(&[
            ("0", vec!["I2"]),
            ("1", vec!["NO"]),
            ("2", vec!["STEREOTYPING"]),
            ("3", vec!["I2"]),
        ]);
        assert!(run(Icm, &gold, &gold, Some(&hierarchy)).are_close(&Some(2.0), 1e-9));
        assert!(run(IcmNorm, &gold, &gold, Some(&hierarchy)).are_close(&Some(1.0), 1e-9));
        // The siblings I1 and I2 share the information of IDEOLOGICAL
        assert!(run(Icm, &gold, &pred, Some(&hierarchy)).are_close(&Some(1.25), 1e-9));
    }

    #[test]
    fn test_multilabel_frequencies_count_descendants() {
        let hierarchy = build_hierarchy();
        let gold = dataset(&[
            ("0", vec!["I1"]),
            ("1", vec!["NO", "OTHER"]),
            ("2", vec!["STEREOTYPING", "I2"]),
            ("3", vec!["I2"]),
        ]);
        let comparator = Comparator::new(&gold, &gold, Some(&hierarchy), RankingOrder::Ascending);
        let mut context = IcmContext::new(&comparator);
        assert_eq!(context.probability("SEXIST"), 0.75);
        assert_eq!(context.probability("IDEOLOGICAL"), 0.75);
        assert_eq!(context.probability("OTHER"), 0.25);
        assert_eq!(context.probability("UNSEEN"), 0.25);
    }

    #[test]
    fn test_monolabel_frequencies_are_propagated() {
        let hierarchy = build_hierarchy();
        let gold = dataset(&[("0", "I1"), ("1", "I2"), ("2", "NO"), ("3", "SEXIST")]);
        let comparator = Comparator::new(&gold, &gold, Some(&hierarchy), RankingOrder::Ascending);
        let mut context = IcmContext::new(&comparator);
        assert_eq!(context.probability("SEXIST"), 0.75);
        assert_eq!(context.probability("IDEOLOGICAL"), 0.5);
        assert_eq!(context.probability("STEREOTYPING"), 0.25);
    }

    #[test]
    fn test_deepest_common_ancestors() {
        let hierarchy = build_hierarchy();
        let gold = dataset(&[("0", "I1")]);
        let comparator = Comparator::new(&gold, &gold, Some(&hierarchy), RankingOrder::Ascending);
        let context = IcmContext::new(&comparator);
        let others = vec![
            String::from("I2"),
            String::from("STEREOTYPING"),
            String::from("NO"),
            String::from("IDEOLOGICAL"),
        ];
        assert_eq!(
            context.deepest_common_ancestors("I1", &others),
            vec![String::from("IDEOLOGICAL"), String::from("SEXIST")]
        );
    }

    #[test]
    fn test_flat_multilabel_is_not_implemented() {
        let gold = dataset(&[("0", vec!["A", "B"])]);
        let comparator = Comparator::new(&gold, &gold, None, RankingOrder::Ascending);
        let mut preconditions = Preconditions::new();
        assert_eq!(Icm.evaluate(&comparator, &mut preconditions), None);
        assert_eq!(
            preconditions.records()[0].kind,
            PreconditionKind::NotImplementedContext
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(1.0, 0.0), None);
        assert_eq!(normalize(-5.0, 1.0), Some(0.0));
        assert_eq!(normalize(1.0, 1.0), Some(1.0));
    }
}
