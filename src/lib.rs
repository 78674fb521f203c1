pub mod aggregate;
pub mod canonicalize;
pub mod catalog;
pub mod config;
pub mod error;
pub mod estimator;
pub mod forbidden;
pub mod fuzzy_matcher;
pub mod models;
pub mod pipeline;
pub mod similarity;

pub use catalog::{Catalog, CatalogEntry};
pub use config::EngineConfig;
pub use error::{NormalizeError, Result};
pub use forbidden::DisallowList;
pub use fuzzy_matcher::{CatalogMatch, FuzzyMatcher, MatchStrategy};
pub use models::{CandidateItem, CanonicalItem, ItemSource};
pub use pipeline::{InventoryPipeline, PipelineOutput, PipelineReport, Resolution};
