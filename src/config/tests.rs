use super::*;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

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

fn clear_metacache_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    unsafe {
        env::remove_var("METACACHE_ENABLED");
        env::remove_var("METACACHE_STORAGE_PATH");
        env::remove_var("METACACHE_MEMORY_CAPACITY");
        env::remove_var("METACACHE_CLEANUP_INTERVAL_HOURS");
        env::remove_var("METACACHE_TTL_DEFAULT_HOURS");
        env::remove_var("METACACHE_TTL_AUDIO_FEATURES_HOURS");
        env::remove_var("METACACHE_TTL_PLAYLIST_HOURS");
        env::remove_var("METACACHE_TTL_TRACK_DETAILS_HOURS");
        env::remove_var("METACACHE_TTL_ALBUM_DETAILS_HOURS");
        env::remove_var("METACACHE_TTL_ARTIST_DETAILS_HOURS");
    }
}

#[test]
fn test_default_config() {
    let config = CacheConfig::default();

    assert!(config.enabled);
    assert_eq!(config.storage_path, PathBuf::from("./.metacache"));
    assert_eq!(config.memory_capacity, 1_000);
    assert_eq!(config.cleanup_interval, hours(24));
    assert_eq!(config.ttl.audio_features, hours(168));
    assert_eq!(config.ttl.playlist, hours(1));
    assert_eq!(config.ttl.track_details, hours(24));
    assert_eq!(config.ttl.default, hours(24));
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    clear_metacache_env();

    let config = CacheConfig::from_env().expect("should parse with defaults");
    assert_eq!(config, CacheConfig::default());
}

#[test]
#[serial]
fn test_from_env_ttl_overrides() {
    clear_metacache_env();

    with_env_vars(
        &[
            ("METACACHE_TTL_PLAYLIST_HOURS", "2"),
            ("METACACHE_TTL_AUDIO_FEATURES_HOURS", "720"),
            ("METACACHE_TTL_DEFAULT_HOURS", " 12 "),
        ],
        || {
            let config = CacheConfig::from_env().expect("should parse");
            assert_eq!(config.ttl.playlist, hours(2));
            assert_eq!(config.ttl.audio_features, hours(720));
            assert_eq!(config.ttl.default, hours(12));
            assert_eq!(config.ttl.artist_details, hours(24));
        },
    );
}

#[test]
#[serial]
fn test_from_env_custom_storage_and_capacity() {
    clear_metacache_env();

    with_env_vars(
        &[
            ("METACACHE_STORAGE_PATH", "/var/cache/metacache"),
            ("METACACHE_MEMORY_CAPACITY", "64"),
            ("METACACHE_CLEANUP_INTERVAL_HOURS", "6"),
        ],
        || {
            let config = CacheConfig::from_env().expect("should parse");
            assert_eq!(config.storage_path, PathBuf::from("/var/cache/metacache"));
            assert_eq!(config.memory_capacity, 64);
            assert_eq!(config.cleanup_interval, hours(6));
        },
    );
}

#[test]
#[serial]
fn test_from_env_disabled() {
    clear_metacache_env();

    for value in ["false", "0", "OFF", "no"] {
        with_env_vars(&[("METACACHE_ENABLED", value)], || {
            let config = CacheConfig::from_env().expect("should parse");
            assert!(!config.enabled, "value {value:?} should disable");
        });
    }
}

#[test]
#[serial]
fn test_invalid_bool() {
    clear_metacache_env();

    with_env_vars(&[("METACACHE_ENABLED", "maybe")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
        assert!(err.to_string().contains("METACACHE_ENABLED"));
    });
}

#[test]
#[serial]
fn test_zero_ttl_hours_rejected() {
    clear_metacache_env();

    with_env_vars(&[("METACACHE_TTL_PLAYLIST_HOURS", "0")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NonPositiveHours {
                name: "METACACHE_TTL_PLAYLIST_HOURS",
                ..
            }
        ));
    });
}

#[test]
#[serial]
fn test_negative_ttl_hours_rejected() {
    clear_metacache_env();

    with_env_vars(&[("METACACHE_TTL_DEFAULT_HOURS", "-1")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveHours { .. }));
        assert!(err.to_string().contains("positive number of hours"));
    });
}

#[test]
#[serial]
fn test_fractional_hours_accepted() {
    clear_metacache_env();

    with_env_vars(
        &[
            ("METACACHE_CLEANUP_INTERVAL_HOURS", "0.5"),
            ("METACACHE_TTL_PLAYLIST_HOURS", " 1.25 "),
        ],
        || {
            let config = CacheConfig::from_env().unwrap();
            assert_eq!(config.cleanup_interval, Duration::from_secs(30 * 60));
            assert_eq!(config.ttl.playlist, Duration::from_secs(75 * 60));
        },
    );
}

#[test]
#[serial]
fn test_hours_not_a_number() {
    clear_metacache_env();

    with_env_vars(&[("METACACHE_CLEANUP_INTERVAL_HOURS", "daily")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidHours {
                name: "METACACHE_CLEANUP_INTERVAL_HOURS",
                ..
            }
        ));
        assert!(err.to_string().contains("failed to parse"));
    });
}

#[test]
#[serial]
fn test_non_finite_and_huge_hours_rejected() {
    clear_metacache_env();

    with_env_vars(&[("METACACHE_TTL_DEFAULT_HOURS", "NaN")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::NonPositiveHours { .. }));
    });
    with_env_vars(&[("METACACHE_TTL_DEFAULT_HOURS", "1e300")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::HoursOutOfRange { .. }));
    });
}

#[test]
#[serial]
fn test_zero_memory_capacity_rejected() {
    clear_metacache_env();

    with_env_vars(&[("METACACHE_MEMORY_CAPACITY", "0")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ZeroMemoryCapacity));
    });
}

#[test]
#[serial]
fn test_memory_capacity_not_number() {
    clear_metacache_env();

    with_env_vars(&[("METACACHE_MEMORY_CAPACITY", "lots")], || {
        let err = CacheConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    });
}

#[test]
fn test_validate_zero_ttl() {
    let config = CacheConfig {
        ttl: TtlPolicy::default().with_ttl(&crate::ttl::DataType::AlbumDetails, Duration::ZERO),
        ..Default::default()
    };

    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ZeroTtl {
            data_type: "album_details"
        }
    ));
}

#[test]
fn test_validate_zero_cleanup_interval() {
    let config = CacheConfig {
        cleanup_interval: Duration::ZERO,
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ZeroCleanupInterval)
    ));
}

#[test]
fn test_validate_storage_path_is_file() {
    let config = CacheConfig {
        storage_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"),
        ..Default::default()
    };

    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::NotADirectory { .. }));
}
