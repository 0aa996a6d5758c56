/*!
Data model of the evaluation: instances, their polymorphic values and the per test case datasets
built from them.
*/
use ahash::{HashMap as AHashMap, HashSet as AHashSet};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Value of an instance. The variant decides the kind of task being evaluated: a single class
/// (monolabel), a set of classes (multilabel), a relevance or rank (ranking) or a distribution of
/// weights over classes (soft labels, LeWiDi).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    MonoLabel(String),
    MultiLabel(BTreeSet<String>),
    Rank(u64),
    Soft(BTreeMap<String, f64>),
}

impl Value {
    pub fn shape(&self) -> ValueShape {
        match self {
            Self::MonoLabel(_) => ValueShape::MonoLabel,
            Self::MultiLabel(_) => ValueShape::MultiLabel,
            Self::Rank(_) => ValueShape::Rank,
            Self::Soft(_) => ValueShape::Soft,
        }
    }

    /// Classes contained in the value. Ranks have no class.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Self::MonoLabel(label) => vec![label.as_str()],
            Self::MultiLabel(labels) => labels.iter().map(String::as_str).collect(),
            Self::Soft(weights) => weights.keys().map(String::as_str).collect(),
            Self::Rank(_) => vec![],
        }
    }

    /// Membership test used for counting instances of a class.
    pub fn has_label(&self, class: &str) -> bool {
        match self {
            Self::MonoLabel(label) => label == class,
            Self::MultiLabel(labels) => labels.contains(class),
            Self::Soft(weights) => weights.contains_key(class),
            Self::Rank(_) => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::MonoLabel(String::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Rank(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Self::MultiLabel(value.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(value: [&str; N]) -> Self {
        Self::MultiLabel(value.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Value {
    fn from(value: [(&str, f64); N]) -> Self {
        Self::Soft(value.into_iter().map(|(k, v)| (String::from(k), v)).collect())
    }
}

/// Discriminant of a `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueShape {
    MonoLabel,
    MultiLabel,
    Rank,
    Soft,
}

impl Display for ValueShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One labeled unit of a gold standard or of a system output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub test_case: String,
    pub id: String,
    pub value: Value,
}

impl Instance {
    pub fn new<V: Into<Value>>(test_case: &str, id: &str, value: V) -> Self {
        Self {
            test_case: String::from(test_case),
            id: String::from(id),
            value: value.into(),
        }
    }
}

/// Shape of a whole dataset. A dataset mixing several shapes can't be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetShape {
    Empty,
    Uniform(ValueShape),
    Mixed(Vec<ValueShape>),
}

/// Ordered instances sharing one test case.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    test_case: String,
    instances: Vec<Instance>,
    positions: AHashMap<String, usize>,
}

impl Dataset {
    pub fn new(test_case: &str, instances: Vec<Instance>) -> Self {
        let mut positions = AHashMap::with_capacity_and_hasher(instances.len(), Default::default());
        for (i, instance) in instances.iter().enumerate() {
            // The first occurrence of an id is the one being evaluated
            positions.entry(instance.id.clone()).or_insert(i);
        }
        Self {
            test_case: String::from(test_case),
            instances,
            positions,
        }
    }

    pub fn test_case(&self) -> &str {
        &self.test_case
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Instance> {
        self.positions.get(id).map(|i| &self.instances[*i])
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn ids(&self) -> AHashSet<&str> {
        self.instances.iter().map(|i| i.id.as_str()).collect()
    }

    pub fn shape(&self) -> DatasetShape {
        let shapes: Vec<ValueShape> = self
            .instances
            .iter()
            .map(|i| i.value.shape())
            .unique()
            .collect();
        match shapes.len() {
            0 => DatasetShape::Empty,
            1 => DatasetShape::Uniform(shapes[0]),
            _ => DatasetShape::Mixed(shapes),
        }
    }

    /// Distinct values of the dataset, in first-seen order.
    pub fn distinct_values(&self) -> Vec<&Value> {
        let mut distinct: Vec<&Value> = Vec::new();
        for instance in self.instances.iter() {
            if !distinct.contains(&&instance.value) {
                distinct.push(&instance.value)
            }
        }
        distinct
    }

    /// Distinct classes of the dataset, flattening label sets and soft distributions, in
    /// first-seen order.
    pub fn distinct_labels(&self) -> Vec<&str> {
        self.instances
            .iter()
            .flat_map(|i| i.value.labels())
            .unique()
            .collect()
    }

    /// Number of instances whose value contains `class`.
    pub fn count_label(&self, class: &str) -> usize {
        self.instances
            .iter()
            .filter(|i| i.value.has_label(class))
            .count()
    }
}

/// Groups the instances by test case. The datasets are returned in the order in which their test
/// case first appears.
pub fn partition(instances: Vec<Instance>) -> Vec<Dataset> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: AHashMap<String, Vec<Instance>> = AHashMap::default();
    for instance in instances {
        match groups.get_mut(&instance.test_case) {
            Some(group) => group.push(instance),
            None => {
                order.push(instance.test_case.clone());
                groups.insert(instance.test_case.clone(), vec![instance]);
            }
        }
    }
    order
        .into_iter()
        .map(|tc| {
            let group = groups.remove(&tc).unwrap_or_default();
            Dataset::new(&tc, group)
        })
        .collect()
}
