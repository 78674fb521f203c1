use crate::canonicalize::{canonicalize, strip_quantity_prefix, tokenize};
use crate::catalog::{Catalog, CatalogEntry};
use crate::error::{NormalizeError, Result};
use crate::similarity::similarity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Catalog matcher: an ordered cascade of strategies, first success wins.
///
/// 1. exact name
/// 2. case-insensitive name
/// 3. similarity of canonical (sorted-token) forms
/// 4. similarity of raw lowercased forms (the higher of 3 and 4 decides)
/// 5. token overlap with a bounded token-set size difference
/// 6. single-token containment for one-word candidates
///
/// The thresholds were tuned against real quotes; changing them changes
/// prices, so they are configuration rather than code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyMatcher {
    /// A similarity score must be strictly above this to be accepted
    pub similarity_threshold: f64,
    /// Minimum shared tokens for the overlap strategy
    pub min_token_overlap: usize,
    /// Largest allowed difference in token-set size for the overlap strategy
    pub max_token_set_diff: usize,
    /// Tokens shorter than this are ignored by the token strategies
    pub min_token_len: usize,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.82,
            min_token_overlap: 2,
            max_token_set_diff: 1,
            min_token_len: 3,
        }
    }
}

/// Which cascade step produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    Exact,
    CaseInsensitive,
    CanonicalSimilarity,
    RawSimilarity,
    TokenOverlap,
    SingleTokenContainment,
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::CaseInsensitive => "case-insensitive",
            MatchStrategy::CanonicalSimilarity => "canonical similarity",
            MatchStrategy::RawSimilarity => "raw similarity",
            MatchStrategy::TokenOverlap => "token overlap",
            MatchStrategy::SingleTokenContainment => "single-token containment",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogMatch<'c> {
    pub entry: &'c CatalogEntry,
    pub strategy: MatchStrategy,
    /// 1.0 for exact steps, similarity for steps 3-4, overlap ratio otherwise
    pub score: f64,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            similarity_threshold: threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(NormalizeError::Config(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.min_token_overlap == 0 {
            return Err(NormalizeError::Config(
                "min_token_overlap must be at least 1".to_string(),
            ));
        }
        if self.min_token_len == 0 {
            return Err(NormalizeError::Config(
                "min_token_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve `name` against the catalog. `None` is the normal outcome
    /// for names the catalog does not know.
    pub fn find_match<'c>(&self, catalog: &'c Catalog, name: &str) -> Option<CatalogMatch<'c>> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(entry) = catalog.get(trimmed) {
            return Some(self.hit(name, entry, MatchStrategy::Exact, 1.0));
        }

        if let Some(entry) = catalog.get_ignore_case(trimmed) {
            return Some(self.hit(name, entry, MatchStrategy::CaseInsensitive, 1.0));
        }

        // Fuzzy steps ignore a leading count ("4 Dining Chairs")
        let subject = strip_quantity_prefix(trimmed);

        self.similarity_match(catalog, subject)
            .or_else(|| self.token_match(catalog, subject))
            .map(|m| self.hit(name, m.entry, m.strategy, m.score))
            .or_else(|| {
                debug!("No catalog match for '{}'", name);
                None
            })
    }

    fn hit<'c>(
        &self,
        name: &str,
        entry: &'c CatalogEntry,
        strategy: MatchStrategy,
        score: f64,
    ) -> CatalogMatch<'c> {
        debug!(
            "Matched '{}' -> '{}' via {} (score {:.3})",
            name, entry.name, strategy, score
        );
        CatalogMatch {
            entry,
            strategy,
            score,
        }
    }

    fn similarity_match<'c>(&self, catalog: &'c Catalog, subject: &str) -> Option<CatalogMatch<'c>> {
        let canonical = canonicalize(subject);
        let raw = subject.to_lowercase();

        // Strict comparisons keep the first key in catalog order on ties
        let mut best_canonical: Option<(&'c CatalogEntry, f64)> = None;
        let mut best_raw: Option<(&'c CatalogEntry, f64)> = None;

        for key in catalog.keys() {
            let canonical_score = similarity(&canonical, &key.canonical);
            if best_canonical.map_or(true, |(_, best)| canonical_score > best) {
                best_canonical = Some((&key.entry, canonical_score));
            }

            let raw_score = similarity(&raw, &key.lowercase);
            if best_raw.map_or(true, |(_, best)| raw_score > best) {
                best_raw = Some((&key.entry, raw_score));
            }
        }

        let (entry, score, strategy) = match (best_canonical, best_raw) {
            (Some((_, c)), Some((raw_entry, r))) if r > c => {
                (raw_entry, r, MatchStrategy::RawSimilarity)
            }
            (Some((entry, c)), _) => (entry, c, MatchStrategy::CanonicalSimilarity),
            _ => return None,
        };

        if score > self.similarity_threshold {
            Some(CatalogMatch {
                entry,
                strategy,
                score,
            })
        } else {
            debug!(
                "Best similarity for '{}' was '{}' at {:.3}, below threshold",
                subject, entry.name, score
            );
            None
        }
    }

    fn token_match<'c>(&self, catalog: &'c Catalog, subject: &str) -> Option<CatalogMatch<'c>> {
        let tokens = tokenize(subject, self.min_token_len);
        let candidate: HashSet<&str> = tokens.iter().map(String::as_str).collect();
        if candidate.is_empty() {
            return None;
        }

        // (entry, overlap, size difference, key set size)
        let mut best: Option<(&'c CatalogEntry, usize, usize, usize)> = None;
        for key in catalog.keys() {
            let key_tokens = self.key_tokens(&key.words);
            let overlap = candidate.intersection(&key_tokens).count();
            if overlap == 0 {
                continue;
            }
            let diff = candidate.len().abs_diff(key_tokens.len());
            let better = match best {
                None => true,
                Some((_, best_overlap, best_diff, _)) => {
                    overlap > best_overlap || (overlap == best_overlap && diff < best_diff)
                }
            };
            if better {
                best = Some((&key.entry, overlap, diff, key_tokens.len()));
            }
        }

        let (entry, overlap, diff, key_len) = best?;

        if overlap >= self.min_token_overlap && diff <= self.max_token_set_diff {
            return Some(CatalogMatch {
                entry,
                strategy: MatchStrategy::TokenOverlap,
                score: overlap as f64 / candidate.len().max(key_len) as f64,
            });
        }

        if candidate.len() == 1 && overlap == 1 {
            return self.single_token_match(catalog, tokens[0].as_str());
        }

        None
    }

    /// One-word candidates resolve to the first key that leads with that
    /// word, so "Sofa" finds "Sofa, 3 Cushion" while "Table" skips "Pool Table".
    fn single_token_match<'c>(&self, catalog: &'c Catalog, token: &str) -> Option<CatalogMatch<'c>> {
        catalog
            .keys()
            .iter()
            .find(|key| {
                key.words.iter().any(|word| word == token) && key.lowercase.starts_with(token)
            })
            .map(|key| {
                let key_len = self.key_tokens(&key.words).len().max(1);
                CatalogMatch {
                    entry: &key.entry,
                    strategy: MatchStrategy::SingleTokenContainment,
                    score: 1.0 / key_len as f64,
                }
            })
    }

    fn key_tokens<'w>(&self, words: &'w [String]) -> HashSet<&'w str> {
        words
            .iter()
            .filter(|word| word.chars().count() >= self.min_token_len)
            .map(String::as_str)
            .collect()
    }
}
