//! Inventory Item Models
//!
//! `CandidateItem` is the untrusted record handed in by upstream analysis;
//! `ResolvedItem` is one surviving candidate after matching or estimation;
//! `CanonicalItem` is the merged row handed back to the caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "Misc";

/// Untrusted item description from an external analysis step.
///
/// Every field may be missing on the wire; defaults are applied by
/// [`CandidateItem::validate`], never inside the matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl CandidateItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Convert one raw JSON record. Fields of the wrong type are reported as
    /// an anomaly for this record alone.
    pub fn from_record(record: &serde_json::Value) -> Result<Self, AnomalyKind> {
        CandidateItem::deserialize(record).map_err(|e| AnomalyKind::InvalidRecord {
            message: e.to_string(),
        })
    }

    /// Apply boundary defaults and reject records the pipeline cannot use.
    pub fn validate(&self) -> Result<ValidCandidate, AnomalyKind> {
        let name = self.name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            return Err(AnomalyKind::EmptyName);
        }

        let quantity = self.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(AnomalyKind::NonPositiveQuantity { quantity });
        }

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string();

        Ok(ValidCandidate {
            name,
            quantity,
            category,
            tags: self.tags.clone(),
            confidence: clamp_confidence(self.confidence),
        })
    }
}

fn clamp_confidence(confidence: Option<f64>) -> f64 {
    match confidence {
        Some(c) if c.is_nan() => 0.0,
        Some(c) => c.clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Candidate with every default applied; whitespace in the name is collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCandidate {
    pub name: String,
    pub quantity: i64,
    pub category: String,
    pub tags: Vec<String>,
    pub confidence: f64,
}

/// Why a candidate was skipped as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum AnomalyKind {
    EmptyName,
    NonPositiveQuantity { quantity: i64 },
    /// Record could not be read as a candidate at all
    InvalidRecord { message: String },
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::EmptyName => write!(f, "empty name"),
            AnomalyKind::NonPositiveQuantity { quantity } => {
                write!(f, "non-positive quantity {}", quantity)
            }
            AnomalyKind::InvalidRecord { message } => write!(f, "invalid record: {}", message),
        }
    }
}

/// How a final name was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemSource {
    Catalog,
    Estimated,
}

/// One surviving candidate, named and stat-filled, before merging.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub name: String,
    pub source_name: String,
    pub source: ItemSource,
    pub quantity: i64,
    pub volume_cu_ft: f64,
    pub weight_lbs: f64,
    pub category: String,
    pub tags: Vec<String>,
    pub confidence: f64,
}

/// Canonical inventory row: one per distinct final name per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: i64,
    pub volume_cu_ft: f64,
    pub weight_lbs: f64,
    pub category: String,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub source: ItemSource,
    /// Distinct candidate names merged into this row, first-seen order
    pub source_names: Vec<String>,
}

impl CanonicalItem {
    /// Total volume for the row (per-item volume times quantity).
    pub fn total_volume_cu_ft(&self) -> f64 {
        self.volume_cu_ft * self.quantity as f64
    }

    pub fn total_weight_lbs(&self) -> f64 {
        self.weight_lbs * self.quantity as f64
    }
}
