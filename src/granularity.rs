//! Granularity keys: a single opaque key for a (study, series, instance, frame) tuple.
//!
//! Ground truth and model output are parsed independently, so the only way to
//! pair a prediction with its annotation is to hash the identifying fields the
//! same way on both sides.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// Opaque, fixed-length (64 hex chars) key for one annotation level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GranularityKey(String);

impl GranularityKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GranularityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identifying fields behind a [`GranularityKey`].
///
/// Absent fields are empty strings. A study-level annotation has only
/// `study_instance_uid` set, a frame-level one has all four.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Granularity {
    pub study_instance_uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub series_instance_uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sop_instance_uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub frame_index: String,
}

impl Granularity {
    pub fn study(study_instance_uid: impl Into<String>) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
            ..Self::default()
        }
    }

    pub fn new(
        study_instance_uid: impl Into<String>,
        series_instance_uid: impl Into<String>,
        sop_instance_uid: impl Into<String>,
        frame_index: impl Into<String>,
    ) -> Self {
        Self {
            study_instance_uid: study_instance_uid.into(),
            series_instance_uid: series_instance_uid.into(),
            sop_instance_uid: sop_instance_uid.into(),
            frame_index: frame_index.into(),
        }
    }

    /// A copy of this granularity one level deeper.
    pub fn with_series(&self, series_instance_uid: impl Into<String>) -> Self {
        Self {
            series_instance_uid: series_instance_uid.into(),
            ..self.clone()
        }
    }

    pub fn with_instance(&self, sop_instance_uid: impl Into<String>) -> Self {
        Self {
            sop_instance_uid: sop_instance_uid.into(),
            ..self.clone()
        }
    }

    pub fn with_frame(&self, frame_index: impl Into<String>) -> Self {
        Self {
            frame_index: frame_index.into(),
            ..self.clone()
        }
    }

    /// Hash this tuple into its key.
    pub fn key(&self) -> GranularityKey {
        hash(
            &self.study_instance_uid,
            &self.series_instance_uid,
            &self.sop_instance_uid,
            &self.frame_index,
        )
    }

    /// Ancestors from the most specific (the tuple itself) up to study level.
    ///
    /// Levels that are empty in this tuple are skipped, so a series-level
    /// tuple yields itself then its study.
    pub fn lineage(&self) -> Vec<Granularity> {
        let mut lineage = vec![self.clone()];
        let mut current = self.clone();
        for _ in 0..3 {
            if !current.frame_index.is_empty() {
                current.frame_index.clear();
            } else if !current.sop_instance_uid.is_empty() {
                current.sop_instance_uid.clear();
            } else if !current.series_instance_uid.is_empty() {
                current.series_instance_uid.clear();
            } else {
                break;
            }
            lineage.push(current.clone());
        }
        lineage
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.study_instance_uid)?;
        for part in [&self.series_instance_uid, &self.sop_instance_uid, &self.frame_index] {
            if !part.is_empty() {
                write!(f, "/{part}")?;
            }
        }
        Ok(())
    }
}

/// Hash four identifying fields into a [`GranularityKey`].
///
/// # Example
///
/// ```
/// use imaging_eval::granularity::hash;
///
/// let a = hash("1.2.3", "", "", "");
/// let b = hash("1.2.3", "", "", "");
/// assert_eq!(a, b);
/// assert_ne!(a, hash("1.2.3", "4", "", ""));
/// ```
pub fn hash(study: &str, series: &str, instance: &str, frame: &str) -> GranularityKey {
    let mut hasher = Sha256::new();
    // Each field is length-prefixed so no identifier can shift a field boundary.
    for field in [study, series, instance, frame] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    GranularityKey(format!("{:x}", hasher.finalize()))
}

/// Render a JSON identifier (string or number) as text; null and absent become "".
pub fn identifier_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Reverse lookup from [`GranularityKey`] to the tuple that produced it.
#[derive(Debug, Clone, Default)]
pub struct GranularityIndex {
    entries: HashMap<GranularityKey, Granularity>,
}

impl GranularityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `granularity` and remember the tuple. The first writer wins.
    pub fn record(&mut self, granularity: &Granularity) -> GranularityKey {
        let key = granularity.key();
        self.entries
            .entry(key.clone())
            .or_insert_with(|| granularity.clone());
        key
    }

    pub fn get(&self, key: &GranularityKey) -> Option<&Granularity> {
        self.entries.get(key)
    }

    /// Resolve a key for reporting, falling back to an empty study tuple
    /// carrying the raw key when it was never recorded.
    pub fn resolve(&self, key: &GranularityKey) -> Granularity {
        self.get(key)
            .cloned()
            .unwrap_or_else(|| Granularity::study(key.as_str()))
    }

    /// Fold another index into this one, keeping existing entries.
    pub fn merge(&mut self, other: GranularityIndex) {
        for (key, granularity) in other.entries {
            self.entries.entry(key).or_insert(granularity);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
