/*!
Hierarchies of classes. A hierarchy is a forest: each root is either a leaf or a node owning an
ordered list of subtrees. Every hierarchical reasoning of the metrics (ancestor chains, frequency
propagation, weight propagation) is a recursive function over this tree.
*/
use ahash::HashMap as AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyNode {
    Leaf(String),
    Node(String, Vec<HierarchyNode>),
}

impl HierarchyNode {
    pub fn leaf(name: &str) -> Self {
        Self::Leaf(String::from(name))
    }

    pub fn node(name: &str, children: Vec<HierarchyNode>) -> Self {
        if children.is_empty() {
            Self::Leaf(String::from(name))
        } else {
            Self::Node(String::from(name), children)
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(name) | Self::Node(name, _) => name,
        }
    }

    pub fn children(&self) -> &[HierarchyNode] {
        match self {
            Self::Leaf(_) => &[],
            Self::Node(_, children) => children,
        }
    }

    fn ancestors<'a>(&'a self, class: &str, chain: &mut Vec<&'a str>) -> bool {
        chain.push(self.name());
        if self.name() == class {
            return true;
        }
        for child in self.children() {
            if child.ancestors(class, chain) {
                return true;
            }
        }
        chain.pop();
        false
    }

    fn contains(&self, class: &str) -> bool {
        self.name() == class || self.children().iter().any(|c| c.contains(class))
    }

    fn collect<'a>(&'a self, classes: &mut Vec<&'a str>) {
        classes.push(self.name());
        for child in self.children() {
            child.collect(classes)
        }
    }

    fn propagate_frequency(&self, frequencies: &mut AHashMap<String, usize>) -> usize {
        let own = frequencies.get(self.name()).copied().unwrap_or(0);
        let total = own
            + self
                .children()
                .iter()
                .map(|c| c.propagate_frequency(frequencies))
                .sum::<usize>();
        frequencies.insert(String::from(self.name()), total);
        total
    }

    fn propagate_max(&self, weights: &mut AHashMap<String, f64>) -> f64 {
        let own = weights.get(self.name()).copied().unwrap_or(0.0);
        let max = self
            .children()
            .iter()
            .map(|c| c.propagate_max(weights))
            .fold(own, f64::max);
        weights.insert(String::from(self.name()), max);
        max
    }
}

/// A forest of classes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hierarchy {
    roots: Vec<HierarchyNode>,
}

impl Hierarchy {
    pub fn new(roots: Vec<HierarchyNode>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[HierarchyNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Chain of classes going from the root down to `class`, both included. Returns `None` if the
    /// class is not part of the hierarchy.
    pub fn ancestors(&self, class: &str) -> Option<Vec<&str>> {
        let mut chain = Vec::new();
        for root in self.roots.iter() {
            if root.ancestors(class, &mut chain) {
                return Some(chain);
            }
        }
        None
    }

    pub fn contains(&self, class: &str) -> bool {
        self.roots.iter().any(|r| r.contains(class))
    }

    /// Is `class` strictly below `ancestor`?
    pub fn is_descendant(&self, ancestor: &str, class: &str) -> bool {
        self.ancestors(class)
            .map(|chain| chain[..chain.len() - 1].contains(&ancestor))
            .unwrap_or(false)
    }

    /// Every class of the hierarchy, in pre-order.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes = Vec::new();
        for root in self.roots.iter() {
            root.collect(&mut classes)
        }
        classes
    }

    /// Returns a copy of the hierarchy where every class absent from the tree is added as a root
    /// leaf.
    pub fn with_missing_roots<'a, I>(&self, classes: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut extended = self.clone();
        for class in classes {
            if !extended.contains(class) {
                extended.roots.push(HierarchyNode::leaf(class))
            }
        }
        extended
    }

    /// Adds to the frequency of every node the frequencies of all of its descendants. Every class
    /// of the hierarchy ends up in `frequencies`, possibly with a frequency of 0.
    pub fn propagate_frequency(&self, frequencies: &mut AHashMap<String, usize>) {
        for root in self.roots.iter() {
            root.propagate_frequency(frequencies);
        }
    }

    /// Gives to every node the maximum weight found in its subtree. Every class of the hierarchy
    /// ends up in `weights`, possibly with a weight of 0.
    pub fn propagate_max(&self, weights: &mut AHashMap<String, f64>) {
        for root in self.roots.iter() {
            root.propagate_max(weights);
        }
    }

    fn parse_children(value: JsonValue) -> Result<Vec<HierarchyNode>, HierarchyError> {
        match value {
            JsonValue::Object(map) => map
                .into_iter()
                .map(|(name, sub)| -> Result<HierarchyNode, HierarchyError> {
                    Ok(HierarchyNode::node(&name, Self::parse_children(sub)?))
                })
                .collect(),
            JsonValue::Array(values) => {
                let mut nodes = Vec::with_capacity(values.len());
                for v in values {
                    match v {
                        JsonValue::String(name) => nodes.push(HierarchyNode::Leaf(name)),
                        obj @ JsonValue::Object(_) => nodes.extend(Self::parse_children(obj)?),
                        other => return Err(HierarchyError(other.to_string())),
                    }
                }
                Ok(nodes)
            }
            JsonValue::String(name) => Ok(vec![HierarchyNode::Leaf(name)]),
            other => Err(HierarchyError(other.to_string())),
        }
    }
}

/// Builds a hierarchy out of nested JSON: an object maps classes to their subtree and an array
/// lists sibling leaves. Empty objects or arrays make their key a leaf.
impl TryFrom<JsonValue> for Hierarchy {
    type Error = HierarchyError;
    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        Ok(Self::new(Self::parse_children(value)?))
    }
}

impl std::str::FromStr for Hierarchy {
    type Err = HierarchyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let json: JsonValue =
            serde_json::from_str(s).map_err(|e| HierarchyError(e.to_string()))?;
        Self::try_from(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyError(String);

impl Display for HierarchyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Impossible to build a hierarchy of classes out of: {}",
            self.0
        )
    }
}
impl Error for HierarchyError {}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[rstest]
    #[case("SEXIST", Some(vec!["SEXIST"]))]
    #[case("I2", Some(vec!["SEXIST", "IDEOLOGICAL", "I2"]))]
    #[case("STEREOTYPING", Some(vec!["SEXIST", "STEREOTYPING"]))]
    #[case("NO", Some(vec!["NO"]))]
    #[case("UNKNOWN", None)]
    fn test_ancestors(#[case] class: &str, #[case] expected: Option<Vec<&str>>) {
        assert_eq!(build_hierarchy().ancestors(class), expected)
    }

    #[rstest]
    #[case("SEXIST", "I1", true)]
    #[case("IDEOLOGICAL", "I1", true)]
    #[case("I1", "I1", false)]
    #[case("NO", "I1", false)]
    #[case("STEREOTYPING", "UNKNOWN", false)]
    fn test_is_descendant(#[case] ancestor: &str, #[case] class: &str, #[case] expected: bool) {
        assert_eq!(build_hierarchy().is_descendant(ancestor, class), expected)
    }

    #[test]
    fn test_classes_pre_order() {
        assert_eq!(
            build_hierarchy().classes(),
            vec!["SEXIST", "IDEOLOGICAL", "I1", "I2", "STEREOTYPING", "NO"]
        )
    }

    #[test]
    fn test_with_missing_roots_does_not_modify_the_original() {
        let hierarchy = build_hierarchy();
        let extended = hierarchy.with_missing_roots(["I1", "OTHER"]);
        assert!(!hierarchy.contains("OTHER"));
        assert_eq!(extended.ancestors("OTHER"), Some(vec!["OTHER"]));
        assert_eq!(extended.roots().len(), 3);
    }

    #[test]
    fn test_propagate_frequency() {
        let mut freq: AHashMap<String, usize> = AHashMap::default();
        freq.insert(String::from("I1"), 2);
        freq.insert(String::from("I2"), 1);
        freq.insert(String::from("SEXIST"), 1);
        freq.insert(String::from("NO"), 4);
        build_hierarchy().propagate_frequency(&mut freq);
        assert_eq!(freq["IDEOLOGICAL"], 3);
        assert_eq!(freq["STEREOTYPING"], 0);
        assert_eq!(freq["SEXIST"], 4);
        assert_eq!(freq["NO"], 4);
    }

    #[test]
    fn test_propagate_max() {
        let mut weights: AHashMap<String, f64> = AHashMap::default();
        weights.insert(String::from("I1"), 0.2);
        weights.insert(String::from("I2"), 0.7);
        weights.insert(String::from("SEXIST"), 0.1);
        build_hierarchy().propagate_max(&mut weights);
        assert_eq!(weights["IDEOLOGICAL"], 0.7);
        assert_eq!(weights["SEXIST"], 0.7);
        assert_eq!(weights["STEREOTYPING"], 0.0);
        assert_eq!(weights["NO"], 0.0);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{"SEXIST": {"IDEOLOGICAL": ["I1", "I2"], "STEREOTYPING": []}, "NO": []}"#;
        let hierarchy: Hierarchy = json.parse().unwrap();
        assert_eq!(hierarchy, build_hierarchy());
    }

    #[test]
    fn test_from_json_list_of_leaves() {
        let hierarchy: Hierarchy = r#"["A", "B", {"C": ["D"]}]"#.parse().unwrap();
        assert_eq!(hierarchy.classes(), vec!["A", "B", "C", "D"]);
        assert_eq!(hierarchy.ancestors("D"), Some(vec!["C", "D"]));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!("{\"A\": 3}".parse::<Hierarchy>().is_err());
        assert!("not json".parse::<Hierarchy>().is_err());
    }
}
