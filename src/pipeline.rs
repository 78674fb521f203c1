//! Inventory Pipeline
//!
//! Runs a batch of candidates through validation, catalog matching, the
//! forbidden filter, local estimation, and aggregation:
//!
//! ```text
//! Candidate -> [catalog hit | forbidden => dropped | estimated] -> Resolved -> Aggregated
//! ```
//!
//! The pipeline owns its catalog and disallow-list and never mutates them,
//! so one instance can serve any number of threads at once.

use crate::aggregate::Aggregator;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::estimator::LocalEstimator;
use crate::forbidden::DisallowList;
use crate::fuzzy_matcher::{FuzzyMatcher, MatchStrategy};
use crate::models::{AnomalyKind, CandidateItem, CanonicalItem, ItemSource, ResolvedItem, ValidCandidate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Malformed candidate that was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    /// Position in the input batch
    pub index: usize,
    pub name: String,
    #[serde(flatten)]
    pub kind: AnomalyKind,
}

/// Unmatched candidate dropped by the disallow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForbiddenDrop {
    pub index: usize,
    pub name: String,
    pub term: String,
}

/// Per-run accounting handed back alongside the items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub catalog_version: String,
    pub received: usize,
    pub emitted: usize,
    pub skipped_malformed: usize,
    pub dropped_forbidden: usize,
    pub catalog_hits: usize,
    pub estimated: usize,
    /// Sum of volume times quantity over the emitted rows
    pub total_volume_cu_ft: f64,
    pub total_weight_lbs: f64,
    pub matches_by_strategy: BTreeMap<MatchStrategy, usize>,
    pub anomalies: Vec<Anomaly>,
    pub forbidden: Vec<ForbiddenDrop>,
    pub processed_at: DateTime<Utc>,
}

impl PipelineReport {
    fn new(catalog_version: &str, received: usize) -> Self {
        Self {
            catalog_version: catalog_version.to_string(),
            received,
            emitted: 0,
            skipped_malformed: 0,
            dropped_forbidden: 0,
            catalog_hits: 0,
            estimated: 0,
            total_volume_cu_ft: 0.0,
            total_weight_lbs: 0.0,
            matches_by_strategy: BTreeMap::new(),
            anomalies: Vec::new(),
            forbidden: Vec::new(),
            processed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub items: Vec<CanonicalItem>,
    pub report: PipelineReport,
}

/// Outcome for one valid candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched {
        item: ResolvedItem,
        strategy: MatchStrategy,
        score: f64,
    },
    Estimated(ResolvedItem),
    Forbidden { term: String },
}

#[derive(Debug, Clone)]
pub struct InventoryPipeline {
    catalog: Catalog,
    disallow: DisallowList,
    matcher: FuzzyMatcher,
    estimator: LocalEstimator,
    aggregator: Aggregator,
}

impl InventoryPipeline {
    pub fn new(catalog: Catalog, disallow: DisallowList) -> Self {
        Self {
            catalog,
            disallow,
            matcher: FuzzyMatcher::default(),
            estimator: LocalEstimator::new(),
            aggregator: Aggregator::new(),
        }
    }

    /// Pipeline over the catalog and disallow-list compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Ok(Self::new(Catalog::embedded()?, DisallowList::embedded()?))
    }

    pub fn with_matcher(mut self, matcher: FuzzyMatcher) -> Result<Self> {
        matcher.validate()?;
        self.matcher = matcher;
        Ok(self)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn disallow_list(&self) -> &DisallowList {
        &self.disallow
    }

    pub fn matcher(&self) -> &FuzzyMatcher {
        &self.matcher
    }

    /// Resolve one validated candidate without aggregating.
    pub fn resolve(&self, candidate: &ValidCandidate) -> Resolution {
        // An earlier run's estimate label resolves to the same estimate
        if self.catalog.get(&candidate.name).is_none() {
            if let Some(estimate) = self.estimator.by_label(&candidate.name) {
                return Resolution::Estimated(resolved_item(
                    candidate,
                    estimate.label.to_string(),
                    ItemSource::Estimated,
                    estimate.volume_cu_ft,
                    estimate.weight_lbs,
                ));
            }
        }

        if let Some(hit) = self.matcher.find_match(&self.catalog, &candidate.name) {
            return Resolution::Matched {
                item: resolved_item(
                    candidate,
                    hit.entry.name.clone(),
                    ItemSource::Catalog,
                    hit.entry.volume_cu_ft,
                    hit.entry.weight_lbs,
                ),
                strategy: hit.strategy,
                score: hit.score,
            };
        }

        // Catalog membership is authoritative; the filter only sees misses
        if let Some(term) = self.disallow.find_term(&candidate.name) {
            return Resolution::Forbidden {
                term: term.to_string(),
            };
        }

        let estimate = self.estimator.estimate(&candidate.name, &candidate.category);
        debug!(
            "Estimated '{}' as '{}' ({} cu ft, {} lbs)",
            candidate.name, estimate.label, estimate.volume_cu_ft, estimate.weight_lbs
        );
        Resolution::Estimated(resolved_item(
            candidate,
            estimate.label.to_string(),
            ItemSource::Estimated,
            estimate.volume_cu_ft,
            estimate.weight_lbs,
        ))
    }

    /// Process a batch. Bad entries are skipped and reported; they never
    /// affect their siblings.
    pub fn run(&self, candidates: &[CandidateItem]) -> PipelineOutput {
        self.run_batch(candidates.len(), candidates.iter().map(Ok))
    }

    /// Process raw JSON records as they arrive from upstream. A record that
    /// cannot be read as a candidate is reported like any other malformed
    /// entry.
    pub fn run_records(&self, records: &[serde_json::Value]) -> PipelineOutput {
        let parsed: Vec<std::result::Result<CandidateItem, (String, AnomalyKind)>> = records
            .iter()
            .map(|record| {
                CandidateItem::from_record(record).map_err(|kind| (record_name(record), kind))
            })
            .collect();
        self.run_batch(
            records.len(),
            parsed.iter().map(|entry| entry.as_ref().map_err(Clone::clone)),
        )
    }

    fn run_batch<'a, I>(&self, received: usize, candidates: I) -> PipelineOutput
    where
        I: Iterator<Item = std::result::Result<&'a CandidateItem, (String, AnomalyKind)>>,
    {
        let mut report = PipelineReport::new(self.catalog.version(), received);
        let mut resolved = Vec::with_capacity(received);

        for (index, entry) in candidates.enumerate() {
            let checked = entry.and_then(|candidate| {
                candidate
                    .validate()
                    .map_err(|kind| (candidate.name.clone(), kind))
            });
            let valid = match checked {
                Ok(valid) => valid,
                Err((name, kind)) => {
                    warn!("Skipping candidate #{} '{}': {}", index, name, kind);
                    report.skipped_malformed += 1;
                    report.anomalies.push(Anomaly { index, name, kind });
                    continue;
                }
            };

            match self.resolve(&valid) {
                Resolution::Matched { item, strategy, .. } => {
                    report.catalog_hits += 1;
                    *report.matches_by_strategy.entry(strategy).or_insert(0) += 1;
                    resolved.push(item);
                }
                Resolution::Estimated(item) => {
                    report.estimated += 1;
                    resolved.push(item);
                }
                Resolution::Forbidden { term } => {
                    debug!("Dropping candidate #{} '{}' (term '{}')", index, valid.name, term);
                    report.dropped_forbidden += 1;
                    report.forbidden.push(ForbiddenDrop {
                        index,
                        name: valid.name,
                        term,
                    });
                }
            }
        }

        let items = self.aggregator.aggregate(resolved);
        report.emitted = items.len();
        report.total_volume_cu_ft = items.iter().map(CanonicalItem::total_volume_cu_ft).sum();
        report.total_weight_lbs = items.iter().map(CanonicalItem::total_weight_lbs).sum();

        info!(
            "Normalized {} candidates into {} items ({} catalog, {} estimated, {} forbidden, {} malformed)",
            report.received,
            report.emitted,
            report.catalog_hits,
            report.estimated,
            report.dropped_forbidden,
            report.skipped_malformed
        );

        PipelineOutput { items, report }
    }
}

/// Best-effort name for a record that failed to deserialize.
fn record_name(record: &serde_json::Value) -> String {
    record
        .get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn resolved_item(
    candidate: &ValidCandidate,
    name: String,
    source: ItemSource,
    volume_cu_ft: f64,
    weight_lbs: f64,
) -> ResolvedItem {
    ResolvedItem {
        name,
        source_name: candidate.name.clone(),
        source,
        quantity: candidate.quantity,
        volume_cu_ft,
        weight_lbs,
        category: candidate.category.clone(),
        tags: candidate.tags.clone(),
        confidence: candidate.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;

    fn pipeline() -> InventoryPipeline {
        let catalog = Catalog::from_entries(
            "test",
            vec![
                CatalogEntry::new("Chair, Dining", 12.0, 25.0),
                CatalogEntry::new("Bookcase", 20.0, 70.0),
            ],
        )
        .unwrap();
        InventoryPipeline::new(catalog, DisallowList::new(["book", "novel"]).unwrap())
    }

    fn valid(name: &str, category: &str) -> ValidCandidate {
        CandidateItem::new(name)
            .with_category(category)
            .validate()
            .unwrap()
    }

    #[test]
    fn test_resolve_catalog_hit() {
        match pipeline().resolve(&valid("dining chair", "Furniture")) {
            Resolution::Matched { item, strategy, .. } => {
                assert_eq!(item.name, "Chair, Dining");
                assert_eq!(item.source, ItemSource::Catalog);
                assert_eq!(strategy, MatchStrategy::CanonicalSimilarity);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_catalog_hit_beats_disallow_list() {
        // "Bookcase" contains "book" but is a catalog key
        match pipeline().resolve(&valid("Bookcase", "Furniture")) {
            Resolution::Matched { item, .. } => assert_eq!(item.name, "Bookcase"),
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_forbidden() {
        assert_eq!(
            pipeline().resolve(&valid("Paperback Novel", "Misc")),
            Resolution::Forbidden {
                term: "novel".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_estimated() {
        match pipeline().resolve(&valid("Weird Antique Hutch", "Furniture")) {
            Resolution::Estimated(item) => {
                assert_eq!(item.name, "Furniture (Estimated)");
                assert_eq!(item.source_name, "Weird Antique Hutch");
                assert_eq!(item.source, ItemSource::Estimated);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_report_counts() {
        let output = pipeline().run(&[
            CandidateItem::new("Chair, Dining").with_quantity(2),
            CandidateItem::new(""),
            CandidateItem::new("Lamp").with_quantity(0),
            CandidateItem::new("Paperback Book"),
            CandidateItem::new("Mystery Crate").with_category("Boxes"),
        ]);

        let report = &output.report;
        assert_eq!(report.catalog_version, "test");
        assert_eq!(report.received, 5);
        assert_eq!(report.emitted, 2);
        assert_eq!(report.catalog_hits, 1);
        assert_eq!(report.estimated, 1);
        assert_eq!(report.dropped_forbidden, 1);
        assert_eq!(report.skipped_malformed, 2);
        assert_eq!(report.matches_by_strategy.get(&MatchStrategy::Exact), Some(&1));
        assert_eq!(report.anomalies[0].index, 1);
        assert_eq!(report.anomalies[0].kind, AnomalyKind::EmptyName);
        assert_eq!(
            report.anomalies[1].kind,
            AnomalyKind::NonPositiveQuantity { quantity: 0 }
        );
        assert_eq!(report.forbidden[0].index, 3);
        assert_eq!(report.forbidden[0].term, "book");
    }

    #[test]
    fn test_invalid_matcher_config_rejected() {
        assert!(pipeline().with_matcher(FuzzyMatcher::new(2.0)).is_err());
        assert!(pipeline().with_matcher(FuzzyMatcher::new(0.9)).is_ok());
    }

    #[test]
    fn test_pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InventoryPipeline>();
    }

    #[test]
    fn test_resolve_estimate_label() {
        // "Bed, King (Estimated)" would otherwise fuzzy-match a catalog row
        let catalog = Catalog::from_entries("test", vec![CatalogEntry::new("Bed, King", 70.0, 200.0)]).unwrap();
        let pipeline = InventoryPipeline::new(catalog, DisallowList::new(["book"]).unwrap());

        match pipeline.resolve(&valid("Bed, King (Estimated)", "Misc")) {
            Resolution::Estimated(item) => {
                assert_eq!(item.name, "Bed, King (Estimated)");
                assert_eq!((item.volume_cu_ft, item.weight_lbs), (70.0, 200.0));
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
        match pipeline.resolve(&valid("Furniture (Estimated)", "Misc")) {
            Resolution::Estimated(item) => {
                assert_eq!(item.name, "Furniture (Estimated)");
                assert_eq!((item.volume_cu_ft, item.weight_lbs), (30.0, 100.0));
            }
            other => panic!("unexpected resolution: {:?}", other),
        }
    }

    #[test]
    fn test_run_records_skips_unreadable_records() {
        let records: Vec<serde_json::Value> = serde_json::from_str(
            r#"[
                {"name": "Chair, Dining", "quantity": 2},
                {"name": "Chair, Dining", "quantity": 2.5},
                {"name": "Lamp", "quantity": "3"},
                {"name": 7},
                {"name": "Mystery Crate", "category": "Boxes"}
            ]"#,
        )
        .unwrap();

        let output = pipeline().run_records(&records);
        assert_eq!(output.report.received, 5);
        assert_eq!(output.report.skipped_malformed, 3);
        assert_eq!(output.items.len(), 2);
        assert_eq!(output.items[0].name, "Chair, Dining");
        assert_eq!(output.items[0].quantity, 2);
        assert_eq!(output.items[1].name, "Box (Estimated)");

        let anomalies = &output.report.anomalies;
        assert_eq!(anomalies[0].index, 1);
        assert_eq!(anomalies[0].name, "Chair, Dining");
        assert!(matches!(anomalies[0].kind, AnomalyKind::InvalidRecord { .. }));
        assert_eq!(anomalies[1].name, "Lamp");
        assert_eq!(anomalies[2].index, 3);
        assert_eq!(anomalies[2].name, "");
    }

    #[test]
    fn test_report_totals() {
        let output = pipeline().run(&[
            CandidateItem::new("Chair, Dining").with_quantity(4),
            CandidateItem::new("Mystery Crate").with_category("Boxes").with_quantity(2),
        ]);
        assert_eq!(output.report.total_volume_cu_ft, 4.0 * 12.0 + 2.0 * 4.5);
        assert_eq!(output.report.total_weight_lbs, 4.0 * 25.0 + 2.0 * 50.0);
    }
}
