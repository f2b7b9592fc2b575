//! Grouping of multi-class labels into a present ("1") / absent ("0") split.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const PRESENT: &str = "1";
pub const ABSENT: &str = "0";

/// The JSON form of a binary map: `{ "presentLabels": [...], "absentLabels": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryMapSpec {
    #[serde(default)]
    pub present_labels: Vec<String>,
    #[serde(default)]
    pub absent_labels: Vec<String>,
}

/// Maps raw labels to "1" (present) or "0" (absent).
///
/// Labels listed in both groups end up absent, as the absent list is applied last.
/// Insertion order is kept so that sibling lists are reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryClassificationMap {
    map: IndexMap<String, &'static str>,
}

impl BinaryClassificationMap {
    pub fn new<P, A>(present_labels: P, absent_labels: A) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let mut map = IndexMap::new();
        for label in present_labels {
            map.insert(label.into(), PRESENT);
        }
        for label in absent_labels {
            map.insert(label.into(), ABSENT);
        }
        Self { map }
    }

    /// Map a label to "1" or "0"; labels outside the map pass through unchanged.
    ///
    /// # Example
    ///
    /// ```
    /// use imaging_eval::binary_map::BinaryClassificationMap;
    ///
    /// let map = BinaryClassificationMap::new(["1", "2"], ["3", "4"]);
    /// assert_eq!(map.map_label("2"), "1");
    /// assert_eq!(map.map_label("4"), "0");
    /// assert_eq!(map.map_label("9"), "9");
    /// ```
    pub fn map_label<'a>(&self, label: &'a str) -> &'a str {
        match self.map.get(label) {
            Some(mapped) => *mapped,
            None => label,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(label)
    }

    pub fn is_present(&self, label: &str) -> bool {
        self.map.get(label).is_some_and(|mapped| *mapped == PRESENT)
    }

    /// Every label that maps to the same side as `label`, `label` included.
    /// Empty when `label` is not mapped.
    pub fn sibling_labels(&self, label: &str) -> Vec<&str> {
        let Some(side) = self.map.get(label) else {
            return Vec::new();
        };
        self.map
            .iter()
            .filter(|(_, mapped)| *mapped == side)
            .map(|(label, _)| label.as_str())
            .collect()
    }

    /// The labels mapped to "1".
    pub fn present_labels(&self) -> Vec<&str> {
        self.map
            .iter()
            .filter(|(_, mapped)| **mapped == PRESENT)
            .map(|(label, _)| label.as_str())
            .collect()
    }
}

impl From<BinaryMapSpec> for BinaryClassificationMap {
    fn from(spec: BinaryMapSpec) -> Self {
        Self::new(spec.present_labels, spec.absent_labels)
    }
}

impl From<&BinaryClassificationMap> for BinaryMapSpec {
    fn from(map: &BinaryClassificationMap) -> Self {
        let mut spec = BinaryMapSpec::default();
        for (label, mapped) in &map.map {
            if *mapped == PRESENT {
                spec.present_labels.push(label.clone());
            } else {
                spec.absent_labels.push(label.clone());
            }
        }
        spec
    }
}
