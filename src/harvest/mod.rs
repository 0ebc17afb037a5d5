//! Harvest module - the per-repository collection pipeline.
//!
//! This module provides the stages that turn one repository's search
//! results into metric observations:
//! - **Scanner**: cursor-paginated search via [`IssueScanner`]
//! - **Title parser**: structured facts from PR titles via [`TitleParser`]
//! - **Pipeline**: scanner → parser → metric set via [`RepoCollector`]

pub mod pipeline;
pub mod scanner;
pub mod title;

// Re-export commonly used types
pub use pipeline::{CollectStats, RepoCollector};
pub use scanner::{IssueScanner, SearchQuery, SEARCH_PER_PAGE};
pub use title::{TitleParser, DEFAULT_LANGUAGE_LABELS};
