use crucible::types::ExecutionRequest;

use super::{fixture_source, test_executor};

async fn assert_hello(fixture: &str, language: &str) {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source(fixture), language);

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert!(outcome.success, "{language}: {outcome:?}");
    assert_eq!(outcome.stdout.trim(), "Hello, World!", "{language}");
}

#[tokio::test]
async fn test_python_hello() {
    assert_hello("hello.py", "py").await;
}

#[tokio::test]
async fn test_c_snippet() {
    assert_hello("snippet.c", "c").await;
}

#[tokio::test]
#[ignore = "requires node"]
async fn test_javascript_hello() {
    assert_hello("hello.js", "js").await;
}

#[tokio::test]
#[ignore = "requires a JDK"]
async fn test_java_snippet() {
    assert_hello("snippet.java", "java").await;
}

#[tokio::test]
#[ignore = "requires a JDK"]
async fn test_java_named_public_class() {
    let (_tmp, executor) = test_executor();
    let request = ExecutionRequest::new(fixture_source("Solution.java"), "java").with_stdin("4 5");

    let outcome = executor.execute(&request).await.expect("Execution failed");

    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.stdout.trim(), "9");
}

#[tokio::test]
#[ignore = "requires go"]
async fn test_go_snippet() {
    assert_hello("snippet.go", "go").await;
}

#[tokio::test]
#[ignore = "requires rustc"]
async fn test_rust_snippet() {
    assert_hello("snippet.rs", "rs").await;
}

#[tokio::test]
#[ignore = "requires php"]
async fn test_php_snippet() {
    assert_hello("snippet.php", "php").await;
}

#[tokio::test]
#[ignore = "requires ruby"]
async fn test_ruby_hello() {
    assert_hello("hello.rb", "rb").await;
}
