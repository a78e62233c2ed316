use colloboque_core::ProjectRefid;
use rusqlite::Connection;

use crate::error::StorageError;

/// Hands out connections to a project's backing store.
///
/// The connection is released when dropped, so a caller holds it exactly for
/// the scope it works in.
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self, project: &ProjectRefid) -> Result<Connection, StorageError>;
}

/// Provisions backing storage for a project before its first use.
pub trait ProjectInitializer: Send + Sync {
    fn init_project(&self, project: &ProjectRefid) -> Result<(), StorageError>;
}

/// Populates a fresh project's rows from a serialized project document.
///
/// Called inside an open transaction; an error discards everything loaded.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, document: &str, conn: &Connection) -> Result<(), StorageError>;
}

/// Loader for deployments that never seed projects from documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDocumentLoader;

impl DocumentLoader for NoDocumentLoader {
    fn load(&self, _document: &str, _conn: &Connection) -> Result<(), StorageError> {
        Err(StorageError::Document("document loading is not configured".into()))
    }
}
