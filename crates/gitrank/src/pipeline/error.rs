use std::path::PathBuf;

use sea_orm::DbErr;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::delta::DeltaError;
use crate::github::{FetchError, GitHubError};
use crate::store::StoreError;

use super::types::Stage;

/// A run halted at `stage`.
#[derive(Debug, Error)]
#[error("Stage {stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: StageError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: impl Into<StageError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Client(#[from] GitHubError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error("All {failed} artifact tasks failed")]
    Artifacts { failed: usize },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
