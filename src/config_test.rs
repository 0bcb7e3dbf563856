use super::*;

#[test]
fn new_trims_trailing_slash_and_applies_defaults() {
    let cfg = ClientConfig::new("https://api.example.test/").unwrap();
    assert_eq!(cfg.api_base_url, "https://api.example.test");
    assert_eq!(cfg.timeouts, HttpTimeouts { connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS, request_secs: None });
    assert_eq!(cfg.cookie_max_age_secs, 3600);
    assert_eq!(cfg.init_wait(), Duration::from_millis(100));
    assert_eq!(cfg.cookie_max_age(), time::Duration::hours(1));
}

#[test]
fn new_rejects_empty_base_url() {
    let err = ClientConfig::new("   ").unwrap_err();
    assert!(matches!(err, ConfigError::MissingBaseUrl { var: API_URL_VAR }));
}

#[test]
fn new_rejects_non_http_base_url() {
    let err = ClientConfig::new("ftp://files.example.test").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == API_URL_VAR));
}

#[test]
fn env_parse_falls_back_on_garbage() {
    let key = "__TEST_TT_ENV_PARSE_GARBAGE_417__";
    unsafe { std::env::set_var(key, "not-a-number") };
    assert_eq!(env_parse(key, 7_u64), 7);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_reads_trimmed_value() {
    let key = "__TEST_TT_ENV_PARSE_OK_418__";
    unsafe { std::env::set_var(key, " 42 ") };
    assert_eq!(env_parse(key, 7_u64), 42);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_unset_returns_default() {
    assert_eq!(env_parse("__TEST_TT_SURELY_UNSET_419__", 3_i64), 3);
}
