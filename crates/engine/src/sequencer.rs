use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

use colloboque_core::{CommitRequest, CommitResponse};
use tracing::{debug, error, info, warn};

use crate::applier::TransactionApplier;
use crate::config::ServerConfig;
use crate::error::EngineError;

enum RequestSender {
    Unbounded(Sender<CommitRequest>),
    Bounded(SyncSender<CommitRequest>),
}

impl RequestSender {
    fn send(&self, request: CommitRequest) -> Result<(), EngineError> {
        let sent = match self {
            Self::Unbounded(tx) => tx.send(request).is_ok(),
            Self::Bounded(tx) => tx.send(request).is_ok(),
        };
        if sent { Ok(()) } else { Err(EngineError::SequencerStopped) }
    }
}

/// The single commit worker.
///
/// Requests are applied one at a time in arrival order and every request
/// yields exactly one response, in the same order, on the response channel.
pub struct CommitSequencer {
    requests: Option<RequestSender>,
    worker: Option<JoinHandle<()>>,
}

impl CommitSequencer {
    pub fn spawn(
        config: &ServerConfig,
        applier: TransactionApplier,
        responses: Sender<CommitResponse>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let (requests, inbox) = match config.queue_capacity {
            Some(capacity) => {
                let (tx, rx) = mpsc::sync_channel(capacity);
                (RequestSender::Bounded(tx), rx)
            }
            None => {
                let (tx, rx) = mpsc::channel();
                (RequestSender::Unbounded(tx), rx)
            }
        };
        let worker = thread::Builder::new()
            .name(config.worker_name.clone())
            .spawn(move || run(applier, inbox, responses))
            .map_err(EngineError::Spawn)?;
        Ok(Self {
            requests: Some(requests),
            worker: Some(worker),
        })
    }

    /// Queues a request and returns without waiting for its outcome.
    pub fn submit(&self, request: CommitRequest) -> Result<(), EngineError> {
        match &self.requests {
            Some(requests) => requests.send(request),
            None => Err(EngineError::SequencerStopped),
        }
    }

    /// Stops accepting requests, lets the worker drain the queue, and waits for it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("commit worker terminated abnormally");
            }
        }
    }
}

impl Drop for CommitSequencer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    applier: TransactionApplier,
    inbox: Receiver<CommitRequest>,
    responses: Sender<CommitResponse>,
) {
    info!("commit worker started");
    let mut receiver_gone = false;
    for request in inbox {
        debug!(
            project = %request.project_refid(),
            base_txn_id = %request.base_txn_id(),
            "applying commit request"
        );
        let response = process_isolated(&applier, &request);
        if responses.send(response).is_err() && !receiver_gone {
            receiver_gone = true;
            warn!("commit response receiver dropped; outcomes are no longer delivered");
        }
    }
    info!("commit worker stopped");
}

/// A panic while handling one request is reported as that request's failure.
/// The open SQLite transaction rolls back while unwinding and the registry is
/// only written after a successful commit, so no partial state survives.
fn process_isolated(applier: &TransactionApplier, request: &CommitRequest) -> CommitResponse {
    match panic::catch_unwind(AssertUnwindSafe(|| applier.process(request))) {
        Ok(response) => response,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(
                project = %request.project_refid(),
                base_txn_id = %request.base_txn_id(),
                reason = %reason,
                "commit request panicked"
            );
            CommitResponse::Rejected {
                base_txn_id: request.base_txn_id().clone(),
                project_refid: request.project_refid().clone(),
                message: format!("Failed to commit transaction: internal error: {reason}"),
            }
        }
    }
}
