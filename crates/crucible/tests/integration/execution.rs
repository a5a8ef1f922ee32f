use crucible::types::{ExecutionLimits, ExecutionRequest, OutcomeStatus};
use crucible::Executor;
use crucible::runner::SUCCESS_MESSAGE;

use super::{fixture_source, leftover_workspaces, test_config, test_executor};

#[tokio::test]
async fn test_python_echoes_stdin() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("echo.py"), "py").with_stdin("42");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert!(outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.stdout, "42\n");
    assert_eq!(outcome.message, SUCCESS_MESSAGE);
    assert_eq!(outcome.language, "py");
    assert!(outcome.memory_kb > 0);
}

#[tokio::test]
async fn test_python_runtime_error() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("crash.py"), "py");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert!(!outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::RuntimeError);
    assert_eq!(outcome.exit_code, Some(3));
    assert!(outcome.stderr.contains("boom"));
    assert!(outcome.stdout.is_empty());
}

#[tokio::test]
async fn test_python_syntax_error_is_runtime_error() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("syntax_error.py"), "py");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert_eq!(outcome.status, OutcomeStatus::RuntimeError);
    assert!(outcome.stderr.contains("SyntaxError"));
}

#[tokio::test]
async fn test_cpp_full_program() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("hello.cpp"), "cpp");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.stdout.trim(), "Hello, World!");
}

#[tokio::test]
async fn test_cpp_snippet_is_wrapped() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("snippet.cpp"), "cpp");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.stdout.trim(), "Hello, World!");
}

#[tokio::test]
async fn test_cpp_compile_error() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("syntax_error.cpp"), "cpp");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert!(!outcome.success);
    assert_eq!(outcome.status, OutcomeStatus::CompileError);
    assert!(outcome.stderr.contains("error"));
    assert!(outcome.stdout.is_empty());
    assert_eq!(leftover_workspaces(&executor), 0);
}

#[tokio::test]
async fn test_cpp_infinite_loop_times_out() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("spin.cpp"), "cpp");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert_eq!(outcome.status, OutcomeStatus::Timeout);
    assert_eq!(outcome.message, "Execution timed out after 10 seconds");
    assert!(outcome.execution_time_ms >= 10_000);
    assert!(outcome.execution_time_ms < 12_000);
    assert_eq!(leftover_workspaces(&executor), 0);
}

#[tokio::test]
async fn test_output_flood_is_capped() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(tmp.path())
        .with_limits(ExecutionLimits::new().with_max_output_bytes(64 * 1024));
    let executor = Executor::new(config);
    let request = ExecutionRequest::new(fixture_source("flood.py"), "py");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert_eq!(outcome.status, OutcomeStatus::OutputLimitExceeded);
    assert!(outcome.stdout.is_empty());
    assert!(outcome.execution_time_ms < 10_000);
}

#[tokio::test]
async fn test_empty_stdin_is_end_of_file() {
    let (_tmp, executor) = test_executor();
    let code = "import sys\nprint(len(sys.stdin.read()))";
    let request = ExecutionRequest::new(code, "py").with_stdin("");

    let outcome = executor.execute(&request).await.expect("Execution failed");
    assert_eq!(outcome.stdout, "0\n");
}

#[tokio::test]
async fn test_concurrent_executions() {
    let (_tmp, executor) = test_executor();
    let requests: Vec<_> = (0..8)
        .map(|i| ExecutionRequest::new(fixture_source("echo.py"), "py").with_stdin(i.to_string()))
        .collect();

    let outcomes =
        futures::future::join_all(requests.iter().map(|request| executor.execute(request))).await;

    for (i, outcome) in outcomes.into_iter().enumerate() {
        let outcome = outcome.expect("Execution failed");
        assert_eq!(outcome.stdout, format!("{i}\n"));
    }
    assert_eq!(leftover_workspaces(&executor), 0);
}
