//! Aggregation of resolved items into canonical rows
//!
//! Items are grouped by exact equality of their resolved name. Within a
//! group quantities are summed, the highest confidence is kept, and tags and
//! source names are unioned. Stats are a pure function of the resolved name,
//! so they are taken from the first item of each group. Groups come out in
//! first-seen order.

use crate::models::{CanonicalItem, ResolvedItem};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(&self, items: Vec<ResolvedItem>) -> Vec<CanonicalItem> {
        let mut rows: Vec<CanonicalItem> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for item in items {
            match index.get(&item.name) {
                Some(&idx) => merge_into(&mut rows[idx], item),
                None => {
                    index.insert(item.name.clone(), rows.len());
                    rows.push(new_row(item));
                }
            }
        }

        rows
    }
}

fn new_row(item: ResolvedItem) -> CanonicalItem {
    let mut tags: Vec<String> = Vec::with_capacity(item.tags.len());
    for tag in item.tags {
        push_unique(&mut tags, tag);
    }

    CanonicalItem {
        id: Uuid::new_v4(),
        name: item.name,
        quantity: item.quantity,
        volume_cu_ft: item.volume_cu_ft,
        weight_lbs: item.weight_lbs,
        category: item.category,
        tags,
        confidence: item.confidence,
        source: item.source,
        source_names: vec![item.source_name],
    }
}

fn merge_into(row: &mut CanonicalItem, item: ResolvedItem) {
    row.quantity = row.quantity.saturating_add(item.quantity);
    row.confidence = row.confidence.max(item.confidence);
    for tag in item.tags {
        push_unique(&mut row.tags, tag);
    }
    push_unique(&mut row.source_names, item.source_name);
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}
