//! Loading configuration files from disk.

use courier_config::{ConfigError, ConfigLoader, LogFormat};
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

fn file_with(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn toml_file_overrides_defaults() {
    let file = file_with(
        ".toml",
        r#"
            [server]
            http_addr = "127.0.0.1:8100"
            max_body_bytes = 4096

            [rate_limit]
            limit = 3
            window_seconds = 10

            [cors]
            allowed_origins = ["https://app.example"]

            [logging]
            format = "pretty"
            level = "debug"
        "#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert_eq!(config.server.http_addr, "127.0.0.1:8100");
    assert_eq!(config.server.max_body_bytes, 4096);
    assert_eq!(config.server.shutdown_timeout_secs, 30);
    assert_eq!(config.rate_limit.limit, 3);
    assert_eq!(config.rate_limit.window_seconds, 10);
    assert_eq!(config.cors.allowed_origins, vec!["https://app.example"]);
    assert_eq!(config.cors.max_age_secs, Some(86_400));
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert!(!config.auth.allow_anonymous);
}

#[test]
fn json_file_is_detected_by_extension() {
    let file = file_with(
        ".json",
        r#"{"auth": {"allow_anonymous": true}, "error_handling": {"expose_internal_errors": true}}"#,
    );

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();

    assert!(config.auth.allow_anonymous);
    assert!(config.error_handling.expose_internal_errors);
}

#[test]
fn unknown_field_in_file_is_rejected() {
    let file = file_with(".toml", "[server]\nport = 8080\n");

    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn invalid_value_fails_validation() {
    let file = file_with(".toml", "[rate_limit]\nlimit = 0\n");

    let err = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "rate_limit.limit"));
}

#[test]
fn unsupported_extension_is_rejected() {
    let file = file_with(".yaml", "server: {}\n");

    let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
}

#[test]
fn empty_file_is_all_defaults() {
    let file = file_with(".toml", "");

    let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
    assert_eq!(config, courier_config::CourierConfig::default());
}
