//! Forbidden Filter
//!
//! Disallow-list of lowercase substrings naming loose clutter and
//! structural fixtures that must never become standalone inventory lines.
//! Only consulted for candidates the matcher could not resolve.

use crate::error::{NormalizeError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const EMBEDDED_DISALLOW_LIST: &str = include_str!("../data/disallow.json");

#[derive(Debug, Deserialize)]
struct DisallowFile {
    #[serde(default)]
    version: Option<String>,
    terms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DisallowList {
    terms: Vec<String>,
}

impl DisallowList {
    /// Terms are trimmed and lowercased; a blank term would match every
    /// name and is rejected.
    pub fn new<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if term.is_empty() {
                return Err(NormalizeError::Disallow("blank disallow term".to_string()));
            }
            if !normalized.contains(&term) {
                normalized.push(term);
            }
        }
        Ok(Self { terms: normalized })
    }

    /// The disallow-list compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(EMBEDDED_DISALLOW_LIST)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: DisallowFile = serde_json::from_str(json)?;
        if let Some(version) = &file.version {
            debug!("Disallow-list version {}", version);
        }
        Self::new(file.terms)
    }

    /// One term per line; blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Result<Self> {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Load a `.json` disallow file, or a plain-text file with one term per line.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        let list = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_lines(&content)?
        };

        info!("Loaded {} disallow terms from {:?}", list.len(), path);
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// First disallowed term contained in `name`, case-insensitively.
    pub fn find_term(&self, name: &str) -> Option<&str> {
        let lowered = name.to_lowercase();
        self.terms
            .iter()
            .find(|term| lowered.contains(term.as_str()))
            .map(String::as_str)
    }

    pub fn is_forbidden(&self, name: &str) -> bool {
        self.find_term(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_forbidden() {
        let list = DisallowList::new(["book", "novel"]).unwrap();
        assert!(list.is_forbidden("Paperback Book"));
        assert!(list.is_forbidden("PAPERBACK NOVEL"));
        assert!(!list.is_forbidden("Weird Antique Hutch"));
        assert_eq!(list.find_term("Notebook"), Some("book"));
    }

    #[test]
    fn test_terms_are_normalized() {
        let list = DisallowList::new(["  Book ", "book", "TOY"]).unwrap();
        assert_eq!(list.terms(), &["book".to_string(), "toy".to_string()]);
    }

    #[test]
    fn test_blank_term_rejected() {
        assert!(DisallowList::new(["book", "   "]).is_err());
    }

    #[test]
    fn test_from_lines() {
        let list = DisallowList::from_lines("# clutter\nbook\n\n  cable \n").unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.is_forbidden("HDMI Cable"));
    }

    #[test]
    fn test_embedded_list() {
        let list = DisallowList::embedded().unwrap();
        assert!(list.is_forbidden("Paperback Book"));
        assert!(list.is_forbidden("Paperback Novel"));
        assert!(!list.is_forbidden("Weird Antique Hutch"));
    }

    #[test]
    fn test_embedded_list_keeps_movable_items() {
        let list = DisallowList::embedded().unwrap();
        for name in [
            "Record Player",
            "Accordion",
            "Window Air Conditioner",
            "Shoe Rack",
            "Toy Chest",
            "Wall Unit",
            "Food Processor",
            "Dish Cabinet",
            "Paper Shredder",
            "Clothes Dryer",
            "Trash Can",
        ] {
            assert_eq!(list.find_term(name), None, "{} should not be disallowed", name);
        }
        assert!(list.is_forbidden("Box of Loose Clothes"));
        assert!(list.is_forbidden("Power Cord"));
    }
}
