use std::collections::HashMap;
use std::sync::Arc;

use colloboque_core::{BaseTxnId, ProjectRefid};
use parking_lot::RwLock;

/// Current version token of every initialized project.
///
/// Cloning yields another handle to the same map. Only the transaction
/// applier advances an entry; the server's `init` registers a project.
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    inner: Arc<RwLock<HashMap<ProjectRefid, BaseTxnId>>>,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, project: &ProjectRefid) -> Option<BaseTxnId> {
        self.inner.read().get(project).cloned()
    }

    /// Registers `project` at `token`, returning the token it replaced.
    pub(crate) fn init(&self, project: ProjectRefid, token: BaseTxnId) -> Option<BaseTxnId> {
        self.inner.write().insert(project, token)
    }

    pub(crate) fn set(&self, project: &ProjectRefid, token: BaseTxnId) {
        self.inner.write().insert(project.clone(), token);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Seeds a registry before any applier holds it.
impl FromIterator<(ProjectRefid, BaseTxnId)> for VersionRegistry {
    fn from_iter<I: IntoIterator<Item = (ProjectRefid, BaseTxnId)>>(iter: I) -> Self {
        Self {
            inner: Arc::new(RwLock::new(iter.into_iter().collect())),
        }
    }
}
