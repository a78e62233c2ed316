use std::sync::Arc;

use colloboque_core::{BaseTxnId, ProjectRefid};
use colloboque_engine::{TransactionApplier, VersionRegistry};
use colloboque_storage::{
    ConnectionFactory, ProjectInitializer, SqliteConnectionFactory, SqliteProjectInitializer,
    StorageError, StoreConfig,
};
use tempfile::TempDir;

/// Project stores in a temporary directory plus a synchronous applier over
/// them. The directory lives as long as the store.
pub struct TestStore {
    pub connections: SqliteConnectionFactory,
    pub registry: VersionRegistry,
    pub applier: TransactionApplier,
    _dir: TempDir,
}

impl TestStore {
    /// Creates the tables of each project and registers it at the initial token.
    pub fn new(projects: &[&str]) -> Result<Self, StorageError> {
        let dir = tempfile::tempdir()?;
        let connections = SqliteConnectionFactory::new(StoreConfig::with_data_dir(dir.path()))?;
        let initializer = SqliteProjectInitializer::new(connections.clone());
        for project in projects {
            initializer.init_project(&ProjectRefid::from(*project))?;
        }
        let registry: VersionRegistry = projects
            .iter()
            .map(|project| (ProjectRefid::from(*project), BaseTxnId::initial()))
            .collect();
        let applier = TransactionApplier::new(Arc::new(connections.clone()), registry.clone());
        Ok(Self {
            connections,
            registry,
            applier,
            _dir: dir,
        })
    }

    pub fn tasks(&self, project: &str) -> Result<Vec<(String, String)>, StorageError> {
        read_tasks(&self.connections, project)
    }

    pub fn count(&self, project: &str, table: &str) -> Result<i64, StorageError> {
        count_rows(&self.connections, project, table)
    }

    pub fn version(&self, project: &str) -> Option<BaseTxnId> {
        self.registry.get(&ProjectRefid::from(project))
    }
}

/// Owned `(id, name)` rows for comparing against [`read_tasks`].
pub fn rows(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect()
}

/// `(id, name)` of every task ordered by id.
pub fn read_tasks(
    connections: &dyn ConnectionFactory,
    project: &str,
) -> Result<Vec<(String, String)>, StorageError> {
    let conn = connections.connect(&ProjectRefid::from(project))?;
    let mut stmt = conn.prepare("SELECT id, name FROM task ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_rows(
    connections: &dyn ConnectionFactory,
    project: &str,
    table: &str,
) -> Result<i64, StorageError> {
    let conn = connections.connect(&ProjectRefid::from(project))?;
    let sql = format!("SELECT COUNT(*) FROM {}", colloboque_storage::condition::quote_ident(table));
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}
