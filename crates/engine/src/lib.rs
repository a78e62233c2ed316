pub mod applier;
pub mod config;
pub mod error;
pub mod registry;
pub mod sequencer;

pub use applier::TransactionApplier;
pub use config::ServerConfig;
pub use error::EngineError;
pub use registry::VersionRegistry;
pub use sequencer::CommitSequencer;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use colloboque_core::{BaseTxnId, CommitRequest, CommitResponse, ProjectRefid};
use colloboque_storage::{ConnectionFactory, DocumentLoader, ProjectInitializer, StorageError};
use tracing::{info, warn};

/// Commit service for collaboratively edited projects.
///
/// Commits go through [`submit`](Self::submit) and are applied by a single
/// worker; their outcomes arrive on the receiver returned by [`new`](Self::new).
/// [`init`](Self::init) and [`get_current_version`](Self::get_current_version)
/// run on the caller's thread.
pub struct ColloboqueServer {
    initializer: Arc<dyn ProjectInitializer>,
    connections: Arc<dyn ConnectionFactory>,
    loader: Arc<dyn DocumentLoader>,
    registry: VersionRegistry,
    sequencer: CommitSequencer,
}

impl ColloboqueServer {
    pub fn new(
        config: ServerConfig,
        initializer: Arc<dyn ProjectInitializer>,
        connections: Arc<dyn ConnectionFactory>,
        loader: Arc<dyn DocumentLoader>,
    ) -> Result<(Self, Receiver<CommitResponse>), EngineError> {
        let registry = VersionRegistry::new();
        let (responses, response_rx) = mpsc::channel();
        let applier = TransactionApplier::new(Arc::clone(&connections), registry.clone());
        let sequencer = CommitSequencer::spawn(&config, applier, responses)?;
        let server = Self {
            initializer,
            connections,
            loader,
            registry,
            sequencer,
        };
        Ok((server, response_rx))
    }

    /// Prepares storage for `project`, optionally seeds it from `document`, and
    /// registers it at the initial version.
    ///
    /// Must complete before commits for `project` are submitted.
    pub fn init(
        &self,
        project: impl Into<ProjectRefid>,
        document: Option<&str>,
    ) -> Result<BaseTxnId, EngineError> {
        let project = project.into();
        self.prepare(&project, document)
            .map_err(|source| EngineError::InitFailure {
                project: project.clone(),
                source,
            })?;

        let token = BaseTxnId::initial();
        if let Some(previous) = self.registry.init(project.clone(), token.clone()) {
            warn!(project = %project, previous = %previous, "re-initialized project");
        }
        info!(project = %project, base_txn_id = %token, seeded = document.is_some(), "initialized project");
        Ok(token)
    }

    fn prepare(&self, project: &ProjectRefid, document: Option<&str>) -> Result<(), StorageError> {
        self.initializer.init_project(project)?;
        let mut conn = self.connections.connect(project)?;
        if let Some(document) = document {
            let tx = conn.transaction()?;
            self.loader.load(document, &tx)?;
            tx.commit()?;
        }
        Ok(())
    }

    pub fn get_current_version(&self, project: &ProjectRefid) -> Option<BaseTxnId> {
        self.registry.get(project)
    }

    pub fn submit(&self, request: CommitRequest) -> Result<(), EngineError> {
        self.sequencer.submit(request)
    }

    /// Decodes a wire request and queues it.
    pub fn submit_json(&self, json: &str) -> Result<(), EngineError> {
        self.submit(CommitRequest::from_json(json)?)
    }

    /// Drains queued requests and stops the commit worker.
    pub fn shutdown(self) {
        self.sequencer.shutdown();
    }
}
