use std::error::Error;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use colloboque_core::{BaseTxnId, CommitRequest, CommitResponse, Operation, ProjectRefid};
use colloboque_engine::{ColloboqueServer, EngineError, ServerConfig};
use colloboque_storage::{
    ConnectionFactory, DocumentLoader, ProjectInitializer, SqliteConnectionFactory,
    SqliteProjectInitializer, StorageError, StoreConfig,
};
use tempfile::TempDir;

use crate::faults::SqlScriptLoader;
use crate::store::{count_rows, read_tasks};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

fn plain(connections: SqliteConnectionFactory) -> Arc<dyn ConnectionFactory> {
    Arc::new(connections)
}

/// A running server over SQLite project stores in a temporary directory.
pub struct TestServer {
    pub server: ColloboqueServer,
    pub responses: Receiver<CommitResponse>,
    pub connections: SqliteConnectionFactory,
    _dir: TempDir,
}

impl TestServer {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::build(ServerConfig::default(), plain, None)
    }

    pub fn with_config(config: ServerConfig) -> Result<Self, Box<dyn Error>> {
        Self::build(config, plain, None)
    }

    /// Lets a test wrap the SQLite connection factory the worker uses.
    pub fn with_connections(
        wrap: impl FnOnce(SqliteConnectionFactory) -> Arc<dyn ConnectionFactory>,
    ) -> Result<Self, Box<dyn Error>> {
        Self::build(ServerConfig::default(), wrap, None)
    }

    pub fn with_initializer(
        initializer: Arc<dyn ProjectInitializer>,
    ) -> Result<Self, Box<dyn Error>> {
        Self::build(ServerConfig::default(), plain, Some(initializer))
    }

    fn build(
        config: ServerConfig,
        wrap: impl FnOnce(SqliteConnectionFactory) -> Arc<dyn ConnectionFactory>,
        initializer: Option<Arc<dyn ProjectInitializer>>,
    ) -> Result<Self, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let connections = SqliteConnectionFactory::new(StoreConfig::with_data_dir(dir.path()))?;
        let initializer: Arc<dyn ProjectInitializer> = match initializer {
            Some(initializer) => initializer,
            None => Arc::new(SqliteProjectInitializer::new(connections.clone())),
        };
        let loader: Arc<dyn DocumentLoader> = Arc::new(SqlScriptLoader);
        let (server, responses) =
            ColloboqueServer::new(config, initializer, wrap(connections.clone()), loader)?;
        Ok(Self {
            server,
            responses,
            connections,
            _dir: dir,
        })
    }

    pub fn init(&self, project: &str) -> Result<BaseTxnId, EngineError> {
        self.server.init(project, None)
    }

    pub fn init_with_document(&self, project: &str, document: &str) -> Result<BaseTxnId, EngineError> {
        self.server.init(project, Some(document))
    }

    pub fn submit_ops(
        &self,
        project: &str,
        base_txn_id: &BaseTxnId,
        operations: Vec<Operation>,
    ) -> Result<(), EngineError> {
        self.server
            .submit(CommitRequest::operations(project, base_txn_id.clone(), operations))
    }

    pub fn submit_raw(
        &self,
        project: &str,
        base_txn_id: &BaseTxnId,
        statements: &[&str],
    ) -> Result<(), EngineError> {
        self.server.submit(CommitRequest::raw(
            project,
            base_txn_id.clone(),
            statements.iter().map(|s| s.to_string()).collect(),
        ))
    }

    pub fn next_response(&self) -> Result<CommitResponse, RecvTimeoutError> {
        self.responses.recv_timeout(RESPONSE_TIMEOUT)
    }

    /// Submits operations and waits for their outcome.
    pub fn commit_ops(
        &self,
        project: &str,
        base_txn_id: &BaseTxnId,
        operations: Vec<Operation>,
    ) -> Result<CommitResponse, Box<dyn Error>> {
        self.submit_ops(project, base_txn_id, operations)?;
        Ok(self.next_response()?)
    }

    pub fn version(&self, project: &str) -> Option<BaseTxnId> {
        self.server.get_current_version(&ProjectRefid::from(project))
    }

    pub fn tasks(&self, project: &str) -> Result<Vec<(String, String)>, StorageError> {
        read_tasks(&self.connections, project)
    }

    pub fn count(&self, project: &str, table: &str) -> Result<i64, StorageError> {
        count_rows(&self.connections, project, table)
    }
}
