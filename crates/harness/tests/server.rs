use std::sync::Arc;

use colloboque_core::operations::columns;
use colloboque_core::{
    BaseTxnId, BinaryCondition, CommitRequest, CommitResponse, InputXlog, Operation, XlogRecord,
};
use colloboque_engine::{EngineError, ServerConfig};
use colloboque_harness::{FailingInitializer, PanickingConnections, TestServer, rows};
use colloboque_storage::ConnectionFactory;

fn insert_task(id: &str, name: &str) -> Operation {
    Operation::Insert {
        table: "task".into(),
        values: columns([("id", id), ("name", name)]),
    }
}

fn rename_task(id: &str, name: &str) -> Operation {
    Operation::Update {
        table: "task".into(),
        binary_conditions: vec![BinaryCondition::equals("id", id)],
        range_conditions: vec![],
        new_values: columns([("name", name)]),
    }
}

fn expect_committed(response: &CommitResponse) -> BaseTxnId {
    match response {
        CommitResponse::Committed {
            new_base_txn_id, ..
        } => new_base_txn_id.clone(),
        other => panic!("expected commit, got {other:?}"),
    }
}

fn expect_rejected(response: &CommitResponse) -> &str {
    match response {
        CommitResponse::Rejected { message, .. } => message,
        other => panic!("expected rejection, got {other:?}"),
    }
}

// ============================================================================
// Init / version queries
// ============================================================================

#[test]
fn init_registers_initial_version() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    assert_eq!(ts.version("p"), None);
    let v0 = ts.init("p")?;
    assert_eq!(v0, BaseTxnId::initial());
    assert_eq!(ts.version("p"), Some(v0));
    assert_eq!(ts.count("p", "task")?, 0);
    Ok(())
}

#[test]
fn init_seeds_rows_from_document() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    ts.init_with_document(
        "p",
        "INSERT INTO task (id, name) VALUES ('1', 'Foo'); INSERT INTO task (id, name) VALUES ('2', 'Bar');",
    )?;
    assert_eq!(
        ts.tasks("p")?,
        rows(&[("1", "Foo"), ("2", "Bar")])
    );
    Ok(())
}

#[test]
fn broken_document_loads_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let err = ts
        .init_with_document(
            "p",
            "INSERT INTO task (id, name) VALUES ('1', 'Foo'); INSERT INTO nowhere VALUES (1);",
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::InitFailure { ref project, .. } if project.as_str() == "p"));
    assert!(err.to_string().contains("Failed to init project p"));
    assert_eq!(ts.version("p"), None);
    assert_eq!(ts.count("p", "task")?, 0);
    Ok(())
}

#[test]
fn initializer_failure_is_init_failure() -> Result<(), Box<dyn std::error::Error>> {
    let initializer = Arc::new(FailingInitializer::default());
    let ts = TestServer::with_initializer(initializer.clone())?;
    let err = ts.init("p").unwrap_err();
    assert!(matches!(err, EngineError::InitFailure { .. }));
    assert_eq!(initializer.attempts(), 1);
    assert_eq!(ts.version("p"), None);
    Ok(())
}

#[test]
fn invalid_project_ref_fails_init() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    assert!(matches!(
        ts.init("../etc").unwrap_err(),
        EngineError::InitFailure { .. }
    ));
    Ok(())
}

// ============================================================================
// Commit flow
// ============================================================================

#[test]
fn commit_response_reports_old_and_new_version() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    let response = ts.commit_ops("p", &v0, vec![insert_task("1", "Foo")])?;
    match &response {
        CommitResponse::Committed {
            old_base_txn_id,
            new_base_txn_id,
            project_refid,
        } => {
            assert_eq!(old_base_txn_id, &v0);
            assert_ne!(new_base_txn_id, &v0);
            assert_eq!(project_refid.as_str(), "p");
            assert_eq!(ts.version("p").as_ref(), Some(new_base_txn_id));
        }
        other => panic!("expected commit, got {other:?}"),
    }
    assert_eq!(ts.tasks("p")?, rows(&[("1", "Foo")]));
    Ok(())
}

#[test]
fn stale_commit_gets_error_response() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    ts.init("p")?;
    let response = ts.commit_ops("p", &"999".into(), vec![insert_task("1", "Foo")])?;
    match &response {
        CommitResponse::Rejected {
            base_txn_id,
            project_refid,
            message,
        } => {
            assert_eq!(base_txn_id.as_str(), "999");
            assert_eq!(project_refid.as_str(), "p");
            assert!(message.contains("Invalid transaction id 999"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(ts.count("p", "task")?, 0);
    assert_eq!(ts.version("p"), Some(BaseTxnId::initial()));
    Ok(())
}

#[test]
fn chained_commits_each_build_on_predecessor() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    let first = ts.commit_ops("p", &v0, vec![insert_task("1", "Foo")])?;
    let v1 = expect_committed(&first);

    // Each request claims the version reported for its predecessor.
    let mut version = v1;
    for name in ["a", "b", "c"] {
        let response = ts.commit_ops("p", &version, vec![rename_task("1", name)])?;
        version = expect_committed(&response);
    }
    assert_eq!(ts.version("p"), Some(version));
    assert_eq!(ts.tasks("p")?, rows(&[("1", "c")]));
    Ok(())
}

#[test]
fn concurrent_commits_on_same_base_yield_one_winner() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    ts.submit_ops("p", &v0, vec![insert_task("1", "from r1")])?;
    ts.submit_ops("p", &v0, vec![insert_task("2", "from r2")])?;

    let r1 = ts.next_response()?;
    let r2 = ts.next_response()?;
    let v1 = expect_committed(&r1);
    assert!(expect_rejected(&r2).contains("Invalid transaction id"));
    assert_eq!(ts.version("p"), Some(v1));
    assert_eq!(ts.tasks("p")?, rows(&[("1", "from r1")]));
    Ok(())
}

#[test]
fn concurrent_producers_never_both_win() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    let server = &ts.server;
    std::thread::scope(|scope| {
        for i in 0..8 {
            let v0 = v0.clone();
            scope.spawn(move || {
                let id = i.to_string();
                server
                    .submit(CommitRequest::operations("p", v0, vec![insert_task(&id, "racer")]))
                    .unwrap();
            });
        }
    });

    let responses: Vec<CommitResponse> = (0..8)
        .map(|_| ts.next_response())
        .collect::<Result<_, _>>()?;
    let winners = responses.iter().filter(|r| r.is_committed()).count();
    assert_eq!(winners, 1);
    assert_eq!(ts.count("p", "task")?, 1);
    Ok(())
}

#[test]
fn responses_follow_submission_order() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("a")?;
    ts.init("b")?;
    ts.submit_ops("a", &v0, vec![insert_task("1", "x")])?;
    ts.submit_ops("b", &"bogus".into(), vec![insert_task("1", "x")])?;
    ts.submit_ops("b", &v0, vec![])?;
    ts.submit_ops("b", &v0, vec![insert_task("1", "y")])?;

    let order: Vec<(String, bool)> = (0..4)
        .map(|_| {
            ts.next_response()
                .map(|r| (r.project_refid().to_string(), r.is_committed()))
        })
        .collect::<Result<_, _>>()?;
    assert_eq!(
        order,
        vec![
            ("a".into(), true),
            ("b".into(), false),
            ("b".into(), false),
            ("b".into(), true)
        ]
    );
    Ok(())
}

#[test]
fn failed_commit_does_not_stop_worker() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    let failed = ts.commit_ops("p", &v0, vec![insert_task("1", "a"), insert_task("1", "b")])?;
    assert!(expect_rejected(&failed).starts_with("Failed to commit transaction"));
    assert_eq!(ts.version("p"), Some(v0.clone()));

    let ok = ts.commit_ops("p", &v0, vec![insert_task("1", "c")])?;
    expect_committed(&ok);
    assert_eq!(ts.tasks("p")?, rows(&[("1", "c")]));
    Ok(())
}

#[test]
fn empty_operation_list_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    let response = ts.commit_ops("p", &v0, vec![])?;
    assert_eq!(expect_rejected(&response), "Empty transactions not allowed");
    assert_eq!(ts.version("p"), Some(v0));
    Ok(())
}

#[test]
fn panic_in_one_request_is_isolated() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::with_connections(|sqlite| {
        let inner: Arc<dyn ConnectionFactory> = Arc::new(sqlite);
        // init opens one connection; the commit's connect panics.
        Arc::new(PanickingConnections::new(inner, "cursed", 1))
    })?;
    let v0 = ts.init("p")?;
    ts.init("cursed")?;

    ts.submit_ops("cursed", &v0, vec![insert_task("1", "never")])?;
    ts.submit_ops("p", &v0, vec![insert_task("1", "fine")])?;

    let crashed = ts.next_response()?;
    assert!(expect_rejected(&crashed).contains("connection pool exploded"));
    assert_eq!(crashed.project_refid().as_str(), "cursed");
    expect_committed(&ts.next_response()?);
    assert_eq!(ts.tasks("p")?, rows(&[("1", "fine")]));
    assert_eq!(ts.version("cursed"), Some(BaseTxnId::initial()));
    Ok(())
}

#[test]
fn raw_request_applies_first_transaction_only() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    let statement = |sql: &str| XlogRecord {
        sql_statements: vec![sql.to_string()],
    };
    ts.server.submit(CommitRequest::Xlog(InputXlog {
        project_refid: "p".into(),
        base_txn_id: v0,
        transactions: vec![
            statement("INSERT INTO task (id, name) VALUES ('1', 'first')"),
            statement("INSERT INTO task (id, name) VALUES ('2', 'second')"),
        ],
    }))?;
    expect_committed(&ts.next_response()?);
    assert_eq!(ts.tasks("p")?, rows(&[("1", "first")]));
    Ok(())
}

#[test]
fn raw_request_without_transactions_is_empty() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    ts.server.submit(CommitRequest::Xlog(InputXlog {
        project_refid: "p".into(),
        base_txn_id: v0,
        transactions: vec![],
    }))?;
    assert_eq!(
        expect_rejected(&ts.next_response()?),
        "Empty transactions not allowed"
    );
    Ok(())
}

// ============================================================================
// Queue configuration / lifecycle
// ============================================================================

#[test]
fn bounded_queue_processes_every_request() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::with_config(ServerConfig {
        queue_capacity: Some(1),
        ..ServerConfig::default()
    })?;
    let v0 = ts.init("p")?;
    let first = ts.commit_ops("p", &v0, vec![insert_task("1", "a")])?;
    let mut version = expect_committed(&first);
    for i in 2..6 {
        let id = i.to_string();
        let response = ts.commit_ops("p", &version, vec![insert_task(&id, "n")])?;
        version = expect_committed(&response);
    }
    assert_eq!(ts.count("p", "task")?, 5);
    Ok(())
}

#[test]
fn shutdown_drains_queued_requests() -> Result<(), Box<dyn std::error::Error>> {
    let ts = TestServer::new()?;
    let v0 = ts.init("p")?;
    ts.submit_ops("p", &v0, vec![insert_task("1", "a")])?;
    ts.submit_ops("p", &"stale".into(), vec![insert_task("2", "b")])?;

    let TestServer {
        server,
        responses,
        connections,
        ..
    } = ts;
    server.shutdown();
    let drained: Vec<CommitResponse> = responses.iter().collect();
    assert_eq!(drained.len(), 2);
    assert!(drained[0].is_committed());
    assert!(!drained[1].is_committed());
    assert_eq!(
        colloboque_harness::store::count_rows(&connections, "p", "task")?,
        1
    );
    Ok(())
}
