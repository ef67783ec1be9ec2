//! Chart source abstraction
//!
//! The importer only needs two things from a repository: its index and the
//! bytes of one chart archive. Keeping them behind a trait lets the import
//! pipeline run against an in-memory source in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::index::{ChartVersionEntry, RepositoryIndex};

/// Where charts are imported from
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Repository base URL (for display)
    fn url(&self) -> &str;

    /// Fetch and decode the repository index
    async fn fetch_index(&self) -> Result<RepositoryIndex>;

    /// Download one chart archive
    async fn fetch_chart(&self, entry: &ChartVersionEntry) -> Result<Vec<u8>>;
}
