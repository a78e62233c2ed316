use std::path::PathBuf;

use colloboque_core::ProjectRefid;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::StorageError;
use crate::schema;
use crate::traits::{ConnectionFactory, ProjectInitializer};

/// One SQLite database file per project under `data_dir`.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    config: StoreConfig,
}

impl SqliteConnectionFactory {
    pub fn new(config: StoreConfig) -> Result<Self, StorageError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn database_path(&self, project: &ProjectRefid) -> Result<PathBuf, StorageError> {
        validate_project_ref(project)?;
        Ok(self.config.data_dir.join(format!("{}.sqlite", project.as_str())))
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    fn connect(&self, project: &ProjectRefid) -> Result<Connection, StorageError> {
        let path = self.database_path(project)?;
        let conn = Connection::open(&path)?;
        schema::configure_connection(&conn, &self.config)?;
        debug!(project = %project, path = %path.display(), "opened project store");
        Ok(conn)
    }
}

/// Creates the data directory and the project tables.
#[derive(Debug, Clone)]
pub struct SqliteProjectInitializer {
    connections: SqliteConnectionFactory,
}

impl SqliteProjectInitializer {
    pub fn new(connections: SqliteConnectionFactory) -> Self {
        Self { connections }
    }
}

impl ProjectInitializer for SqliteProjectInitializer {
    fn init_project(&self, project: &ProjectRefid) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.connections.config().data_dir)?;
        let conn = self.connections.connect(project)?;
        schema::apply_project_schema(&conn)?;
        info!(project = %project, "provisioned project store");
        Ok(())
    }
}

/// Project refs become file names, so they must be one plain path component.
fn validate_project_ref(project: &ProjectRefid) -> Result<(), StorageError> {
    let s = project.as_str();
    let valid = !s.is_empty()
        && s.len() <= 128
        && !s.starts_with('.')
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidProjectRef(s.to_string()))
    }
}
