use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use colloboque_core::ProjectRefid;
use colloboque_storage::{ConnectionFactory, DocumentLoader, ProjectInitializer, StorageError};
use rusqlite::Connection;

/// Treats the seed document as a SQL script.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlScriptLoader;

impl DocumentLoader for SqlScriptLoader {
    fn load(&self, document: &str, conn: &Connection) -> Result<(), StorageError> {
        conn.execute_batch(document)?;
        Ok(())
    }
}

/// Panics when asked for a connection to one particular project once that
/// project has been handed `spared` connections.
pub struct PanickingConnections {
    inner: Arc<dyn ConnectionFactory>,
    poisoned: ProjectRefid,
    spared: usize,
    connects: AtomicUsize,
}

impl PanickingConnections {
    pub fn new(
        inner: Arc<dyn ConnectionFactory>,
        poisoned: impl Into<ProjectRefid>,
        spared: usize,
    ) -> Self {
        Self {
            inner,
            poisoned: poisoned.into(),
            spared,
            connects: AtomicUsize::new(0),
        }
    }
}

impl ConnectionFactory for PanickingConnections {
    fn connect(&self, project: &ProjectRefid) -> Result<Connection, StorageError> {
        if *project == self.poisoned && self.connects.fetch_add(1, Ordering::SeqCst) >= self.spared {
            panic!("connection pool exploded for {project}");
        }
        self.inner.connect(project)
    }
}

/// Fails every provisioning attempt and counts them.
#[derive(Debug, Default)]
pub struct FailingInitializer {
    attempts: AtomicUsize,
}

impl FailingInitializer {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ProjectInitializer for FailingInitializer {
    fn init_project(&self, project: &ProjectRefid) -> Result<(), StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Io(std::io::Error::other(format!(
            "no space left for {project}"
        ))))
    }
}
