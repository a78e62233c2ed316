use std::sync::Arc;

use colloboque_core::{BaseTxnId, CommitRequest, CommitResponse, Operation, ProjectRefid};
use colloboque_storage::{ConnectionFactory, StorageError, apply_operation, execute_raw};
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::error::EngineError;
use crate::registry::VersionRegistry;

/// Validates a claimed base version and applies a transaction atomically.
///
/// Not synchronized: the commit sequencer is the only caller in a running
/// server, which is what makes check-then-commit race free.
pub struct TransactionApplier {
    connections: Arc<dyn ConnectionFactory>,
    registry: VersionRegistry,
}

impl TransactionApplier {
    pub fn new(connections: Arc<dyn ConnectionFactory>, registry: VersionRegistry) -> Self {
        Self {
            connections,
            registry,
        }
    }

    /// Applies structured operations in order. Returns the new version token.
    pub fn apply_transaction(
        &self,
        project: &ProjectRefid,
        claimed: &BaseTxnId,
        operations: &[Operation],
    ) -> Result<BaseTxnId, EngineError> {
        self.commit(project, claimed, operations.len(), |conn| {
            for operation in operations {
                apply_operation(conn, operation)?;
            }
            Ok(())
        })
    }

    /// Same contract as [`apply_transaction`](Self::apply_transaction) for
    /// store-native statements, executed verbatim.
    pub fn apply_raw_transaction(
        &self,
        project: &ProjectRefid,
        claimed: &BaseTxnId,
        statements: &[String],
    ) -> Result<BaseTxnId, EngineError> {
        self.commit(project, claimed, statements.len(), |conn| {
            for statement in statements {
                execute_raw(conn, statement)?;
            }
            Ok(())
        })
    }

    fn commit<F>(
        &self,
        project: &ProjectRefid,
        claimed: &BaseTxnId,
        op_count: usize,
        execute: F,
    ) -> Result<BaseTxnId, EngineError>
    where
        F: FnOnce(&Connection) -> Result<(), StorageError>,
    {
        if op_count == 0 {
            warn!(project = %project, base_txn_id = %claimed, "rejected empty transaction");
            return Err(EngineError::EmptyTransaction);
        }
        let current = self.registry.get(project);
        if current.as_ref() != Some(claimed) {
            warn!(
                project = %project,
                base_txn_id = %claimed,
                current = ?current,
                "rejected stale transaction"
            );
            return Err(EngineError::StaleVersion {
                project: project.clone(),
                claimed: claimed.clone(),
                current,
            });
        }

        let new_txn_id = self
            .execute_atomically(project, execute)
            .map_err(|source| {
                error!(project = %project, base_txn_id = %claimed, error = %source, "failed to commit");
                EngineError::ExecutionFailure {
                    project: project.clone(),
                    source,
                }
            })?;

        self.registry.set(project, new_txn_id.clone());
        info!(
            project = %project,
            base_txn_id = %claimed,
            new_txn_id = %new_txn_id,
            op_count,
            "committed transaction"
        );
        Ok(new_txn_id)
    }

    /// Dropping an uncommitted `rusqlite::Transaction` rolls it back, so every
    /// early return here leaves the store as it was.
    fn execute_atomically<F>(&self, project: &ProjectRefid, execute: F) -> Result<BaseTxnId, StorageError>
    where
        F: FnOnce(&Connection) -> Result<(), StorageError>,
    {
        let mut conn = self.connections.connect(project)?;
        let tx = conn.transaction()?;
        execute(&tx)?;
        let new_txn_id = BaseTxnId::generate();
        tx.commit()?;
        Ok(new_txn_id)
    }

    /// Runs one request to completion and describes the outcome.
    pub fn process(&self, request: &CommitRequest) -> CommitResponse {
        let project = request.project_refid();
        let claimed = request.base_txn_id();
        let result = match request {
            CommitRequest::Operations(input) => {
                self.apply_transaction(project, claimed, &input.operations)
            }
            CommitRequest::Xlog(input) => match input.transactions.first() {
                Some(record) => self.apply_raw_transaction(project, claimed, &record.sql_statements),
                None => Err(EngineError::EmptyTransaction),
            },
        };
        match result {
            Ok(new_base_txn_id) => CommitResponse::Committed {
                old_base_txn_id: claimed.clone(),
                new_base_txn_id,
                project_refid: project.clone(),
            },
            Err(e) => CommitResponse::Rejected {
                base_txn_id: claimed.clone(),
                project_refid: project.clone(),
                message: e.to_string(),
            },
        }
    }
}
