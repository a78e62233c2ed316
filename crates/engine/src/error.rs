use colloboque_core::{BaseTxnId, CoreError, ProjectRefid};
use colloboque_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Empty transactions not allowed")]
    EmptyTransaction,

    #[error("Invalid transaction id {claimed} for project {project}")]
    StaleVersion {
        project: ProjectRefid,
        claimed: BaseTxnId,
        /// `None` when the project was never initialized.
        current: Option<BaseTxnId>,
    },

    #[error("Failed to commit transaction: {source}")]
    ExecutionFailure {
        project: ProjectRefid,
        #[source]
        source: StorageError,
    },

    #[error("Failed to init project {project}: {source}")]
    InitFailure {
        project: ProjectRefid,
        #[source]
        source: StorageError,
    },

    #[error("invalid commit request: {0}")]
    InvalidRequest(#[from] CoreError),

    #[error("commit sequencer has stopped")]
    SequencerStopped,

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to start commit worker: {0}")]
    Spawn(#[source] std::io::Error),
}
