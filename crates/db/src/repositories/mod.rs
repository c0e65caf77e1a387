use async_trait::async_trait;
use thiserror::Error;

use mealdesk_core::analytics::{AnalysisKind, SourceError};

pub mod analysis_result;
pub mod memory;
pub mod record_source;

pub use analysis_result::{AnalysisResultRecord, SqlAnalysisResultRepository};
pub use memory::{InMemoryAnalysisResultRepository, InMemoryRecordSource};
pub use record_source::SqlRecordSource;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

impl From<RepositoryError> for SourceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Database(error) => SourceError::Unavailable(error.to_string()),
            RepositoryError::Decode(reason) | RepositoryError::Encode(reason) => {
                SourceError::Inconsistent(reason)
            }
        }
    }
}

/// Storage for finished analysis reports.
#[async_trait]
pub trait AnalysisResultRepository: Send + Sync {
    async fn save(&self, record: AnalysisResultRecord) -> Result<(), RepositoryError>;

    /// Newest first; `kind = None` lists every analysis type.
    async fn list_recent(
        &self,
        kind: Option<AnalysisKind>,
        limit: u32,
    ) -> Result<Vec<AnalysisResultRecord>, RepositoryError>;
}
