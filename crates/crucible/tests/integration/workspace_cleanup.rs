use std::time::Duration;

use crucible::types::{ExecutionLimits, ExecutionRequest, OutcomeStatus};
use crucible::Executor;

use super::{
    fixture_source, leftover_workspaces, surviving_processes, test_config, test_executor,
};

#[tokio::test]
async fn test_no_workspace_left_after_each_outcome() {
    let (_tmp, executor) = test_executor();
    let requests = [
        ExecutionRequest::new(fixture_source("hello.py"), "py"),
        ExecutionRequest::new(fixture_source("crash.py"), "py"),
        ExecutionRequest::new(fixture_source("hello.cpp"), "cpp"),
        ExecutionRequest::new(fixture_source("syntax_error.cpp"), "cpp"),
    ];

    for request in &requests {
        executor.execute(request).await.expect("Execution failed");
        assert_eq!(leftover_workspaces(&executor), 0, "{}", request.language);
    }
}

#[tokio::test]
async fn test_cancelled_execution_removes_workspace() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config =
        test_config(tmp.path()).with_limits(ExecutionLimits::new().with_timeout_secs(30.0));
    let executor = Executor::new(config);
    let request = ExecutionRequest::new(
        "import subprocess, time\nsubprocess.Popen(['sleep', '4242'])\ntime.sleep(30)",
        "py",
    );

    let cancelled = tokio::time::timeout(Duration::from_millis(500), executor.execute(&request)).await;
    assert!(cancelled.is_err());

    assert_eq!(leftover_workspaces(&executor), 0);
    // Neither the interpreter nor the program it spawned outlives the request
    assert_eq!(surviving_processes("sleep 4242").await, 0);
    let root = tmp.path().to_string_lossy();
    assert_eq!(surviving_processes(&root).await, 0);
}

#[tokio::test]
async fn test_timeout_leaves_no_workspace() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config =
        test_config(tmp.path()).with_limits(ExecutionLimits::new().with_timeout_secs(0.5));
    let executor = Executor::new(config);
    let request = ExecutionRequest::new("while True:\n    pass", "py");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert_eq!(outcome.status, OutcomeStatus::Timeout);
    assert_eq!(leftover_workspaces(&executor), 0);
}
