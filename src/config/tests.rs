use super::*;
use serial_test::serial;
use std::env;
use std::time::Duration;

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, _) in vars {
        unsafe { env::remove_var(key) };
    }

    result
}

fn clear_cache_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("UPSTASH_REDIS_REST_URL");
        env::remove_var("UPSTASH_REDIS_REST_TOKEN");
        env::remove_var("DOCKET_REQUEST_TIMEOUT_MS");
        env::remove_var("DOCKET_REQUEST_RETRIES");
        env::remove_var("DOCKET_L1_CAPACITY");
        env::remove_var("DOCKET_L1_TTL_SECS");
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert!(config.remote.is_none());
    assert!(!config.has_remote());
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(config.request_retries, 2);
    assert_eq!(config.l1_capacity, 1_000);
    assert_eq!(config.l1_ttl, Duration::from_secs(300));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_cache_env();

    let config = Config::from_env().expect("should parse with defaults");

    assert!(config.remote.is_none());
    assert_eq!(config.l1_capacity, 1_000);
}

#[test]
#[serial]
fn test_from_env_remote_configured() {
    clear_cache_env();

    with_env_vars(
        &[
            ("UPSTASH_REDIS_REST_URL", "https://eu1-example.upstash.io"),
            ("UPSTASH_REDIS_REST_TOKEN", "secret-token"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            let remote = config.remote.expect("remote should be set");
            assert_eq!(remote.url, "https://eu1-example.upstash.io");
            assert_eq!(remote.token, "secret-token");
        },
    );
}

#[test]
#[serial]
fn test_from_env_url_without_token_disables_remote() {
    clear_cache_env();

    with_env_vars(
        &[("UPSTASH_REDIS_REST_URL", "https://eu1-example.upstash.io")],
        || {
            let config = Config::from_env().expect("should parse");
            assert!(config.remote.is_none());
        },
    );
}

#[test]
#[serial]
fn test_from_env_blank_token_disables_remote() {
    clear_cache_env();

    with_env_vars(
        &[
            ("UPSTASH_REDIS_REST_URL", "https://eu1-example.upstash.io"),
            ("UPSTASH_REDIS_REST_TOKEN", "   "),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert!(config.remote.is_none());
        },
    );
}

#[test]
#[serial]
fn test_from_env_numeric_overrides() {
    clear_cache_env();

    with_env_vars(
        &[
            ("DOCKET_REQUEST_TIMEOUT_MS", "1500"),
            ("DOCKET_REQUEST_RETRIES", "0"),
            ("DOCKET_L1_CAPACITY", "50"),
            ("DOCKET_L1_TTL_SECS", "30"),
        ],
        || {
            let config = Config::from_env().expect("should parse");
            assert_eq!(config.request_timeout, Duration::from_millis(1500));
            assert_eq!(config.request_retries, 0);
            assert_eq!(config.l1_capacity, 50);
            assert_eq!(config.l1_ttl, Duration::from_secs(30));
        },
    );
}

#[test]
#[serial]
fn test_from_env_invalid_number() {
    clear_cache_env();

    with_env_vars(&[("DOCKET_L1_CAPACITY", "lots")], || {
        let err = Config::from_env().expect_err("should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidNumber {
                name: "DOCKET_L1_CAPACITY",
                ..
            }
        ));
        assert!(err.to_string().contains("lots"));
    });
}

#[test]
#[serial]
fn test_from_env_zero_capacity_rejected() {
    clear_cache_env();

    with_env_vars(&[("DOCKET_L1_CAPACITY", "0")], || {
        let err = Config::from_env().expect_err("should fail");
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    });
}

#[test]
fn test_validate_rejects_non_http_url() {
    let config = Config {
        remote: Some(RemoteConfig {
            url: "redis://localhost:6379".to_string(),
            token: "t".to_string(),
        }),
        ..Default::default()
    };

    let err = config.validate().expect_err("should reject");
    assert!(matches!(err, ConfigError::InvalidUrl { .. }));
}

#[test]
fn test_remote_config_debug_redacts_token() {
    let remote = RemoteConfig {
        url: "https://example.upstash.io".to_string(),
        token: "super-secret".to_string(),
    };

    let rendered = format!("{remote:?}");
    assert!(rendered.contains("example.upstash.io"));
    assert!(!rendered.contains("super-secret"));
}
