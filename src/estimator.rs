//! Local Estimator
//!
//! Deterministic fallback for candidates with no catalog entry. Estimates
//! are keyed on simple name rules first, then on the candidate's category,
//! and always sit at the high end of what the item plausibly weighs so a
//! quote is never too low. No randomness and no external calls: the same
//! name and category always produce the same figures.

use serde::Serialize;

/// Volume/weight estimate with the fixed label it is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub label: &'static str,
    pub volume_cu_ft: f64,
    pub weight_lbs: f64,
}

impl Estimate {
    const fn new(label: &'static str, volume_cu_ft: f64, weight_lbs: f64) -> Self {
        Self {
            label,
            volume_cu_ft,
            weight_lbs,
        }
    }

    pub fn stats(&self) -> (f64, f64) {
        (self.volume_cu_ft, self.weight_lbs)
    }
}

/// Name rule: all of `required` must appear in the name, plus at least
/// one of `any_of` when that list is non-empty.
#[derive(Debug, Clone, Copy)]
struct NameRule {
    any_of: &'static [&'static str],
    required: &'static [&'static str],
    estimate: Estimate,
}

impl NameRule {
    fn matches(&self, lowered: &str) -> bool {
        let any = self.any_of.is_empty() || self.any_of.iter().any(|needle| lowered.contains(needle));
        any && self.required.iter().all(|needle| lowered.contains(needle))
    }
}

// Evaluated top to bottom; the first hit wins
const NAME_RULES: &[NameRule] = &[
    NameRule {
        any_of: &["sofa", "couch"],
        required: &[],
        estimate: Estimate::new("Sofa (Estimated)", 50.0, 200.0),
    },
    NameRule {
        any_of: &["king"],
        required: &["bed"],
        estimate: Estimate::new("Bed, King (Estimated)", 70.0, 200.0),
    },
    NameRule {
        any_of: &["queen"],
        required: &["bed"],
        estimate: Estimate::new("Bed, Queen (Estimated)", 60.0, 170.0),
    },
    NameRule {
        any_of: &[],
        required: &["bed"],
        estimate: Estimate::new("Bed (Estimated)", 50.0, 150.0),
    },
    NameRule {
        any_of: &[],
        required: &["table"],
        estimate: Estimate::new("Table (Estimated)", 30.0, 100.0),
    },
    NameRule {
        any_of: &["dresser", "chest"],
        required: &[],
        estimate: Estimate::new("Dresser (Estimated)", 40.0, 150.0),
    },
    NameRule {
        any_of: &[],
        required: &["desk"],
        estimate: Estimate::new("Desk (Estimated)", 35.0, 120.0),
    },
];

const BOX_DEFAULT: Estimate = Estimate::new("Box (Estimated)", 4.5, 50.0);
const FURNITURE_DEFAULT: Estimate = Estimate::new("Furniture (Estimated)", 30.0, 100.0);
const APPLIANCE_DEFAULT: Estimate = Estimate::new("Appliance (Estimated)", 40.0, 200.0);
const ELECTRONICS_DEFAULT: Estimate = Estimate::new("Electronics (Estimated)", 10.0, 50.0);
const GENERIC_DEFAULT: Estimate = Estimate::new("Item (Estimated)", 10.0, 40.0);

/// Broad category buckets used for fallback estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Box,
    Furniture,
    Appliance,
    Electronics,
    General,
}

impl CategoryKind {
    /// Classify free-text categories ("Boxes", "box", "Carton", ...).
    pub fn classify(category: &str) -> Self {
        let lowered = category.trim().to_lowercase();
        if ["box", "carton", "tote"].iter().any(|k| lowered.contains(k)) {
            CategoryKind::Box
        } else if lowered.contains("furniture") {
            CategoryKind::Furniture
        } else if lowered.contains("appliance") {
            CategoryKind::Appliance
        } else if lowered.contains("electronic") {
            CategoryKind::Electronics
        } else {
            CategoryKind::General
        }
    }

    fn default_estimate(self) -> Estimate {
        match self {
            CategoryKind::Box => BOX_DEFAULT,
            CategoryKind::Furniture => FURNITURE_DEFAULT,
            CategoryKind::Appliance => APPLIANCE_DEFAULT,
            CategoryKind::Electronics => ELECTRONICS_DEFAULT,
            CategoryKind::General => GENERIC_DEFAULT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEstimator;

impl LocalEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate an unmatched item. Total: every input gets an answer.
    pub fn estimate(&self, name: &str, category: &str) -> Estimate {
        let lowered = name.to_lowercase();
        NAME_RULES
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.estimate)
            .unwrap_or_else(|| CategoryKind::classify(category).default_estimate())
    }

    /// Estimate previously emitted under `label`. Labels are output names,
    /// so feeding one back in must reproduce the same row.
    pub fn by_label(&self, label: &str) -> Option<Estimate> {
        all_estimates().find(|estimate| estimate.label.eq_ignore_ascii_case(label))
    }

    /// Every label the estimator can emit.
    pub fn labels() -> impl Iterator<Item = &'static str> {
        all_estimates().map(|estimate| estimate.label)
    }
}

fn all_estimates() -> impl Iterator<Item = Estimate> {
    NAME_RULES.iter().map(|rule| rule.estimate).chain([
        BOX_DEFAULT,
        FURNITURE_DEFAULT,
        APPLIANCE_DEFAULT,
        ELECTRONICS_DEFAULT,
        GENERIC_DEFAULT,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_name_rules() {
        let estimator = LocalEstimator::new();
        assert_eq!(estimator.estimate("Old Couch", "Misc").label, "Sofa (Estimated)");
        assert_eq!(estimator.estimate("King Size Bed Frame", "Misc").label, "Bed, King (Estimated)");
        assert_eq!(estimator.estimate("queen bed", "Furniture").label, "Bed, Queen (Estimated)");
        assert_eq!(estimator.estimate("Daybed", "Furniture").label, "Bed (Estimated)");
        assert_eq!(estimator.estimate("Folding Table", "Misc").label, "Table (Estimated)");
        assert_eq!(estimator.estimate("Hope Chest", "Misc").label, "Dresser (Estimated)");
        assert_eq!(estimator.estimate("Standing Desk", "Misc").label, "Desk (Estimated)");
    }

    #[test]
    fn test_rule_order() {
        let estimator = LocalEstimator::new();
        // Sofa rules come before bed rules
        assert_eq!(estimator.estimate("Sofa Bed", "Furniture").label, "Sofa (Estimated)");
        // A king-size name without "bed" falls through to the category
        assert_eq!(estimator.estimate("King Cobra Statue", "Misc").label, "Item (Estimated)");
    }

    #[test]
    fn test_category_defaults() {
        let estimator = LocalEstimator::new();
        assert_eq!(estimator.estimate("Mystery", "Boxes").stats(), (4.5, 50.0));
        assert_eq!(estimator.estimate("Mystery", "Furniture").label, "Furniture (Estimated)");
        assert_eq!(estimator.estimate("Mystery", "Appliances").label, "Appliance (Estimated)");
        assert_eq!(estimator.estimate("Mystery", "electronics").label, "Electronics (Estimated)");
        assert_eq!(estimator.estimate("Mystery", "Misc").label, "Item (Estimated)");
        assert_eq!(estimator.estimate("Mystery", "").label, "Item (Estimated)");
    }

    #[test]
    fn test_estimates_are_deterministic() {
        let estimator = LocalEstimator::new();
        let first = estimator.estimate("Weird Antique Hutch", "Furniture");
        let second = estimator.estimate("Weird Antique Hutch", "Furniture");
        assert_eq!(first.volume_cu_ft.to_bits(), second.volume_cu_ft.to_bits());
        assert_eq!(first.weight_lbs.to_bits(), second.weight_lbs.to_bits());
    }

    #[test]
    fn test_labels_unique_and_stats_valid() {
        let labels: Vec<&str> = LocalEstimator::labels().collect();
        let unique: HashSet<&str> = labels.iter().copied().collect();
        assert_eq!(labels.len(), unique.len());

        let estimator = LocalEstimator::new();
        for name in ["sofa", "king bed", "queen bed", "bed", "table", "dresser", "desk", "x"] {
            for category in ["Box", "Furniture", "Appliance", "Electronics", "Misc"] {
                let (volume, weight) = estimator.estimate(name, category).stats();
                assert!(volume.is_finite() && volume >= 0.0);
                assert!(weight.is_finite() && weight >= 0.0);
            }
        }
    }

    #[test]
    fn test_by_label_returns_emitted_estimate() {
        let estimator = LocalEstimator::new();
        let original = estimator.estimate("Weird Antique Hutch", "Furniture");
        assert_eq!(estimator.by_label(original.label), Some(original));
        assert_eq!(
            estimator.by_label("bed, king (estimated)").map(|e| e.stats()),
            Some((70.0, 200.0))
        );
        assert_eq!(estimator.by_label("Bed, King"), None);
        for label in LocalEstimator::labels() {
            assert_eq!(estimator.by_label(label).map(|e| e.label), Some(label));
        }
    }
}
