/**
This module builds, for one test case, the views shared by every metric: the confusion structure
of classification tasks and the sorted predictions of ranking tasks. The views are built lazily,
the first time a metric asks for them, and are then reused by every other metric of the test case.
*/
use crate::config::RankingOrder;
use crate::dataset::{Dataset, DatasetShape, Value, ValueShape};
use crate::hierarchy::Hierarchy;
use ahash::HashMap as AHashMap;
use itertools::Itertools;
use ndarray::prelude::*;
use ndarray_stats::QuantileExt;
use std::cell::OnceCell;

/// Task inferred from the values of the gold standard. At most one of the classification flags is
/// set; `ranking` is independent from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Properties {
    pub classification: bool,
    pub monolabel: bool,
    pub multilabel: bool,
    pub lewidi: bool,
    pub ranking: bool,
}

impl From<Option<ValueShape>> for Properties {
    fn from(value: Option<ValueShape>) -> Self {
        match value {
            Some(ValueShape::MonoLabel) => Self {
                classification: true,
                monolabel: true,
                ..Default::default()
            },
            Some(ValueShape::MultiLabel) => Self {
                classification: true,
                multilabel: true,
                ..Default::default()
            },
            Some(ValueShape::Soft) => Self {
                classification: true,
                lewidi: true,
                ..Default::default()
            },
            Some(ValueShape::Rank) => Self {
                ranking: true,
                ..Default::default()
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Confusion {
    /// Square matrix indexed by (gold class, predicted class).
    MonoLabel(Array2<usize>),
    /// One 2x2 table per class, indexed by (class in gold, class in prediction).
    MultiLabel(Vec<Array2<usize>>),
}

/// Confusion structure of a monolabel or multilabel test case. Only the classes of the gold
/// standard are indexed: a predicted label never seen in the gold standard is not counted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationView {
    classes: Vec<String>,
    index: AHashMap<String, usize>,
    confusion: Confusion,
}

impl ClassificationView {
    fn build(gold: &Dataset, pred: &Dataset, properties: Properties) -> Option<Self> {
        if !(properties.monolabel || properties.multilabel) {
            return None;
        }
        log::debug!(
            "Generating confusion matrix for the test case {}",
            gold.test_case()
        );
        let classes: Vec<String> = gold
            .distinct_labels()
            .into_iter()
            .map(String::from)
            .collect();
        let index: AHashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        let size = classes.len();
        let confusion = if properties.monolabel {
            let mut matrix = Array2::<usize>::zeros((size, size));
            for instance in gold.instances() {
                let (Value::MonoLabel(gold_label), Some(predicted)) =
                    (&instance.value, pred.get(&instance.id))
                else {
                    continue;
                };
                let Value::MonoLabel(pred_label) = &predicted.value else {
                    continue;
                };
                if let (Some(g), Some(p)) = (index.get(gold_label), index.get(pred_label)) {
                    matrix[[*g, *p]] += 1;
                }
            }
            Confusion::MonoLabel(matrix)
        } else {
            let mut tables = vec![Array2::<usize>::zeros((2, 2)); size];
            for instance in gold.instances() {
                let Some(predicted) = pred.get(&instance.id) else {
                    continue;
                };
                for (class, table) in classes.iter().zip(tables.iter_mut()) {
                    let in_gold = instance.value.has_label(class) as usize;
                    let in_pred = predicted.value.has_label(class) as usize;
                    table[[in_gold, in_pred]] += 1;
                }
            }
            Confusion::MultiLabel(tables)
        };
        Some(Self {
            classes,
            index,
            confusion,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Monolabel confusion matrix, rows are gold classes and columns predicted classes.
    pub fn matrix(&self) -> Option<&Array2<usize>> {
        match &self.confusion {
            Confusion::MonoLabel(m) => Some(m),
            Confusion::MultiLabel(_) => None,
        }
    }

    /// Multilabel table of `class`: `[[TN, FP], [FN, TP]]`.
    pub fn table(&self, class: &str) -> Option<&Array2<usize>> {
        match &self.confusion {
            Confusion::MultiLabel(tables) => self.index.get(class).map(|i| &tables[*i]),
            Confusion::MonoLabel(_) => None,
        }
    }

    pub fn true_positives(&self, class: &str) -> usize {
        let Some(i) = self.index.get(class) else {
            return 0;
        };
        match &self.confusion {
            Confusion::MonoLabel(m) => m[[*i, *i]],
            Confusion::MultiLabel(tables) => tables[*i][[1, 1]],
        }
    }

    /// Sum of the diagonal of the monolabel matrix, or of the true positives of every class.
    pub fn trace(&self) -> usize {
        match &self.confusion {
            Confusion::MonoLabel(m) => m.diag().sum(),
            Confusion::MultiLabel(tables) => tables.iter().map(|t| t[[1, 1]]).sum(),
        }
    }

    /// Number of instances predicted as `class` in the confusion matrix (sum of its column).
    pub fn predicted_in_matrix(&self, class: &str) -> usize {
        let Some(i) = self.index.get(class) else {
            return 0;
        };
        match &self.confusion {
            Confusion::MonoLabel(m) => m.column(*i).sum(),
            Confusion::MultiLabel(tables) => tables[*i].column(1).sum(),
        }
    }
}

/// Predictions of a ranking test case sorted from the top of the ranking, along with the
/// relevance judgments of the gold standard.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingView {
    sorted: Vec<String>,
    relevance: AHashMap<String, u64>,
    perfect: Vec<String>,
    duplicates: bool,
}

impl RankingView {
    fn build(gold: &Dataset, pred: &Dataset, order: RankingOrder) -> Option<Self> {
        let ranked = |dataset: &Dataset| -> Vec<(String, u64)> {
            dataset
                .instances()
                .iter()
                .filter_map(|i| match i.value {
                    Value::Rank(v) => Some((i.id.clone(), v)),
                    _ => None,
                })
                .collect()
        };
        let gold_values = ranked(gold);
        if gold_values.len() != gold.len() {
            return None;
        }
        let pred_values = ranked(pred);
        let duplicates = pred_values.iter().map(|(_, v)| v).duplicates().next().is_some();
        // Both sorts are stable: ties keep the order of the file
        let sorted = match order {
            RankingOrder::Ascending => pred_values
                .into_iter()
                .sorted_by(|a, b| a.1.cmp(&b.1))
                .map(|(id, _)| id)
                .collect(),
            RankingOrder::Descending => pred_values
                .into_iter()
                .sorted_by(|a, b| b.1.cmp(&a.1))
                .map(|(id, _)| id)
                .collect(),
        };
        let perfect = gold_values
            .iter()
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .map(|(id, _)| id.clone())
            .collect();
        let mut relevance: AHashMap<String, u64> = AHashMap::default();
        for (id, v) in gold_values {
            relevance.entry(id).or_insert(v);
        }
        Some(Self {
            sorted,
            relevance,
            perfect,
            duplicates,
        })
    }

    /// Ids of the predictions, from the top of the ranking.
    pub fn sorted_ids(&self) -> &[String] {
        &self.sorted
    }

    /// Ids of the gold standard sorted by decreasing relevance.
    pub fn perfect_ranking(&self) -> &[String] {
        &self.perfect
    }

    pub fn gold_relevance(&self, id: &str) -> Option<u64> {
        self.relevance.get(id).copied()
    }

    pub fn is_relevant(&self, id: &str) -> bool {
        self.gold_relevance(id).is_some_and(|v| v > 0)
    }

    /// Number of gold instances with a relevance above 0.
    pub fn relevant_count(&self) -> usize {
        self.relevance.values().filter(|v| **v > 0).count()
    }

    /// Number of relevant items among the first `k` predictions.
    pub fn first_k_relevant(&self, k: usize) -> usize {
        let k = k.min(self.sorted.len());
        self.sorted[..k]
            .iter()
            .filter(|id| self.is_relevant(id))
            .count()
    }

    /// 1-based position of the first relevant prediction.
    pub fn position_of_first_relevant(&self) -> Option<usize> {
        self.sorted
            .iter()
            .position(|id| self.is_relevant(id))
            .map(|p| p + 1)
    }

    pub fn has_duplicate_values(&self) -> bool {
        self.duplicates
    }

    pub fn max_gold_relevance(&self) -> u64 {
        let values: Array1<u64> = self.relevance.values().copied().collect();
        values.max().copied().unwrap_or(0)
    }
}

/// Holds the gold standard and the predictions of one test case and the views built from them.
#[derive(Debug)]
pub struct Comparator<'a> {
    gold: &'a Dataset,
    pred: &'a Dataset,
    hierarchy: Option<&'a Hierarchy>,
    ranking_order: RankingOrder,
    properties: Properties,
    classification: OnceCell<Option<ClassificationView>>,
    ranking: OnceCell<Option<RankingView>>,
}

impl<'a> Comparator<'a> {
    pub fn new(
        gold: &'a Dataset,
        pred: &'a Dataset,
        hierarchy: Option<&'a Hierarchy>,
        ranking_order: RankingOrder,
    ) -> Self {
        let shape = match gold.shape() {
            DatasetShape::Uniform(shape) => Some(shape),
            DatasetShape::Empty | DatasetShape::Mixed(_) => None,
        };
        Self {
            gold,
            pred,
            hierarchy,
            ranking_order,
            properties: Properties::from(shape),
            classification: OnceCell::new(),
            ranking: OnceCell::new(),
        }
    }

    pub fn test_case(&self) -> &str {
        self.gold.test_case()
    }

    pub fn gold(&self) -> &'a Dataset {
        self.gold
    }

    pub fn pred(&self) -> &'a Dataset {
        self.pred
    }

    pub fn hierarchy(&self) -> Option<&'a Hierarchy> {
        self.hierarchy
    }

    pub fn ranking_order(&self) -> RankingOrder {
        self.ranking_order
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn gold_len(&self) -> usize {
        self.gold.len()
    }

    pub fn pred_len(&self) -> usize {
        self.pred.len()
    }

    /// Confusion structure of the test case, `None` unless it is a monolabel or multilabel task.
    pub fn classification(&self) -> Option<&ClassificationView> {
        self.classification
            .get_or_init(|| ClassificationView::build(self.gold, self.pred, self.properties))
            .as_ref()
    }

    /// Sorted predictions of the test case, `None` unless it is a ranking task.
    pub fn ranking(&self) -> Option<&RankingView> {
        self.ranking
            .get_or_init(|| {
                if !self.properties.ranking {
                    return None;
                }
                log::debug!("Sorting predictions of the test case {}", self.test_case());
                RankingView::build(self.gold, self.pred, self.ranking_order)
            })
            .as_ref()
    }

    /// Distinct classes of the gold standard, in first-seen order.
    pub fn classes_in_gold(&self) -> Vec<&'a str> {
        self.gold.distinct_labels()
    }

    pub fn count_gold_for_class(&self, class: &str) -> usize {
        self.gold.count_label(class)
    }

    /// Number of predictions containing `class`. Returns `None` when there are no predictions at
    /// all, which differs from a class that was never predicted.
    pub fn count_pred_for_class(&self, class: &str) -> Option<usize> {
        if self.pred.is_empty() {
            return None;
        }
        Some(self.pred.count_label(class))
    }

    pub fn true_positives(&self, class: &str) -> usize {
        self.classification()
            .map(|v| v.true_positives(class))
            .unwrap_or(0)
    }

    pub fn trace(&self) -> usize {
        self.classification().map(|v| v.trace()).unwrap_or(0)
    }

    /// Do gold and predictions contain a single class, the same one, over the same instances?
    pub fn is_single_class_same_instances(&self) -> bool {
        let gold_values = self.gold.distinct_values();
        let pred_values = self.pred.distinct_values();
        gold_values.len() == 1
            && pred_values.len() == 1
            && gold_values[0] == pred_values[0]
            && self.gold.ids() == self.pred.ids()
    }
}
