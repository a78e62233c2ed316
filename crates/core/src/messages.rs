use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{BaseTxnId, ProjectRefid};
use crate::operations::Operation;

/// A client transaction made of store-native SQL statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XlogRecord {
    pub sql_statements: Vec<String>,
}

/// Commit request carrying raw statements. Only the first transaction of
/// the batch is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputXlog {
    pub project_refid: ProjectRefid,
    pub base_txn_id: BaseTxnId,
    pub transactions: Vec<XlogRecord>,
}

/// Commit request carrying structured operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputOperations {
    pub project_refid: ProjectRefid,
    pub base_txn_id: BaseTxnId,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommitRequest {
    Operations(InputOperations),
    Xlog(InputXlog),
}

impl CommitRequest {
    pub fn raw(
        project_refid: impl Into<ProjectRefid>,
        base_txn_id: impl Into<BaseTxnId>,
        sql_statements: Vec<String>,
    ) -> Self {
        Self::Xlog(InputXlog {
            project_refid: project_refid.into(),
            base_txn_id: base_txn_id.into(),
            transactions: vec![XlogRecord { sql_statements }],
        })
    }

    pub fn operations(
        project_refid: impl Into<ProjectRefid>,
        base_txn_id: impl Into<BaseTxnId>,
        operations: Vec<Operation>,
    ) -> Self {
        Self::Operations(InputOperations {
            project_refid: project_refid.into(),
            base_txn_id: base_txn_id.into(),
            operations,
        })
    }

    pub fn project_refid(&self) -> &ProjectRefid {
        match self {
            Self::Operations(input) => &input.project_refid,
            Self::Xlog(input) => &input.project_refid,
        }
    }

    pub fn base_txn_id(&self) -> &BaseTxnId {
        match self {
            Self::Operations(input) => &input.base_txn_id,
            Self::Xlog(input) => &input.base_txn_id,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

pub const SERVER_COMMIT_RESPONSE_TYPE: &str = "commit-response";
pub const SERVER_COMMIT_ERROR_TYPE: &str = "commit-error";

/// Outcome of one commit request, as sent back to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CommitResponse {
    #[serde(rename = "commit-response", rename_all = "camelCase")]
    Committed {
        old_base_txn_id: BaseTxnId,
        new_base_txn_id: BaseTxnId,
        project_refid: ProjectRefid,
    },
    #[serde(rename = "commit-error", rename_all = "camelCase")]
    Rejected {
        base_txn_id: BaseTxnId,
        project_refid: ProjectRefid,
        message: String,
    },
}

impl CommitResponse {
    pub fn project_refid(&self) -> &ProjectRefid {
        match self {
            Self::Committed { project_refid, .. } | Self::Rejected { project_refid, .. } => {
                project_refid
            }
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// The token the project is at after a successful commit.
    pub fn new_base_txn_id(&self) -> Option<&BaseTxnId> {
        match self {
            Self::Committed { new_base_txn_id, .. } => Some(new_base_txn_id),
            Self::Rejected { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}
