use crucible::types::{OutcomeStatus, TestCase};

use super::{fixture_source, test_harness};

fn sum_cases() -> Vec<TestCase> {
    vec![
        TestCase::new("2 3", "5"),
        TestCase::new("10 -4", "6\n"),
        TestCase::new("1 1", "3"),
        TestCase::new("0 0", "0 "),
    ]
}

#[tokio::test]
async fn test_judges_each_case_in_order() {
    let (_tmp, harness) = test_harness(1);
    let cases = sum_cases();

    let run = harness
        .run_all(&fixture_source("sum.py"), "py", &cases)
        .await
        .expect("Test run failed");

    assert_eq!(run.results.len(), cases.len());
    for (case, result) in cases.iter().zip(&run.results) {
        assert_eq!(result.input, case.input);
        assert_eq!(result.expected_output, case.expected_output);
    }
    let verdicts: Vec<_> = run.results.iter().map(|r| r.passed).collect();
    assert_eq!(verdicts, vec![true, true, false, true]);
    assert_eq!(run.results[2].actual_output, "2");
    assert!(run.results.iter().all(|r| !r.error));

    assert_eq!(run.summary.total, 4);
    assert_eq!(run.summary.passed, 3);
    assert_eq!(run.summary.failed, 1);
    assert!(!run.summary.all_passed());
}

#[tokio::test]
async fn test_parallel_cases_keep_order() {
    let (_tmp, harness) = test_harness(4);
    let cases: Vec<_> = (0..12)
        .map(|i| TestCase::new(format!("{i} {i}"), (2 * i).to_string()))
        .collect();

    let run = harness
        .run_all(&fixture_source("sum.py"), "py", &cases)
        .await
        .expect("Test run failed");

    assert!(run.summary.all_passed());
    for (i, result) in run.results.iter().enumerate() {
        assert_eq!(result.input, format!("{i} {i}"));
    }
    let slowest = run.results.iter().map(|r| r.execution_time_ms).max().unwrap();
    assert!(run.summary.total_time_ms >= slowest);
}

#[tokio::test]
async fn test_failed_executions_are_errors() {
    let (_tmp, harness) = test_harness(1);
    let cases = [TestCase::new("", ""), TestCase::new("x", "")];

    let run = harness
        .run_all(&fixture_source("crash.py"), "py", &cases)
        .await
        .expect("Test run failed");

    for result in &run.results {
        assert!(result.error);
        assert!(!result.passed);
        assert_eq!(result.status, OutcomeStatus::RuntimeError);
    }
    assert_eq!(run.summary.failed, 2);
}

#[tokio::test]
async fn test_compile_error_fails_every_case() {
    let (_tmp, harness) = test_harness(2);
    let cases = [TestCase::new("1", "1"), TestCase::new("2", "2")];

    let run = harness
        .run_all(&fixture_source("syntax_error.cpp"), "cpp", &cases)
        .await
        .expect("Test run failed");

    assert_eq!(run.results.len(), 2);
    assert!(
        run.results
            .iter()
            .all(|r| r.status == OutcomeStatus::CompileError && r.error)
    );
}
