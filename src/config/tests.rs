use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.database.url.is_none());
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.cache.backend, CacheBackend::Memory);
    assert_eq!(settings.cache.expiry, Duration::from_secs(900));
    assert_eq!(settings.cache.memory_capacity.get(), 10_000);
    assert_eq!(settings.articles.background_timeout, Duration::from_secs(1));
    assert_eq!(settings.articles.background_concurrency.get(), 256);
    assert!(settings.articles.operation_timeout.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.database.url = Some("postgres://from-file".to_string());

    raw.apply_global_overrides(&GlobalOverrides {
        log_level: Some("debug".to_string()),
        log_json: Some(true),
        ..Default::default()
    });
    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("postgres://from-cli".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://from-cli")
    );
}

#[test]
fn redis_backend_requires_url() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("redis".to_string());

    let err = Settings::from_raw(raw).expect_err("missing url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.redis_url",
            ..
        }
    ));
}

#[test]
fn unknown_cache_backend_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.backend = Some("memcached".to_string());

    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.backend",
            ..
        }
    ));
}

#[test]
fn zero_values_name_the_offending_key() {
    let mut raw = RawSettings::default();
    raw.cache.expiry_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero expiry");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.expiry_seconds",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.articles.operation_timeout_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "articles.operation_timeout_ms",
            ..
        }
    ));
}

#[test]
fn blank_database_url_is_treated_as_unset() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from([
        "webook",
        "migrate",
        "--database-url",
        "postgres://example",
    ]);

    match args.command {
        Command::Migrate(database) => {
            assert_eq!(database.database_url.as_deref(), Some("postgres://example"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_global_flags_after_subcommand() {
    let args = CliArgs::parse_from([
        "webook",
        "check",
        "--log-json",
        "yes",
        "--cache-backend",
        "redis",
        "--cache-redis-url",
        "redis://localhost:6379",
    ]);

    assert!(matches!(args.command, Command::Check(_)));
    assert_eq!(args.overrides.log_json, Some(true));
    assert_eq!(args.overrides.cache_backend.as_deref(), Some("redis"));
    assert_eq!(
        args.overrides.cache_redis_url.as_deref(),
        Some("redis://localhost:6379")
    );
}
