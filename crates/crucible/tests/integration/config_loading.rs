use crucible::Config;

use super::FIXTURES_PATH;

#[test]
fn test_load_valid_config() {
    let path = format!("{FIXTURES_PATH}/configs/valid.toml");
    let config = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(config.max_parallel_cases, 3);
    assert_eq!(config.limits.timeout_secs, 5.0);
    assert_eq!(config.limits.max_output_bytes, 65536);
}

#[test]
fn test_load_invalid_timeout() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_timeout.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_invalid_parallelism() {
    let path = format!("{FIXTURES_PATH}/configs/invalid_parallel.toml");
    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_load_missing_file() {
    let path = format!("{FIXTURES_PATH}/configs/does_not_exist.toml");
    assert!(Config::from_file(&path).is_err());
}
