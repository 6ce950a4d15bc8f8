//! Tests for configuration loading and value resolution
//!
//! Covers:
//! - CLI → ENV → TOML → default priority
//! - Missing config files degrade to defaults, malformed ones fail
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate QRAT_* variables are marked with #[serial].

use qrat_common::config::{resolve, ConfigSource, TomlConfig, ENV_SESSION, ENV_UPSTREAM_URL};
use qrat_common::SessionTag;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
#[serial]
fn test_resolve_cli_wins() {
    env::set_var(ENV_UPSTREAM_URL, "http://from-env");

    let value = resolve(
        Some("http://from-cli".to_string()),
        ENV_UPSTREAM_URL,
        Some("http://from-toml".to_string()),
        "http://default".to_string(),
    );
    assert_eq!(value, "http://from-cli");

    env::remove_var(ENV_UPSTREAM_URL);
}

#[test]
#[serial]
fn test_resolve_env_beats_toml() {
    env::set_var(ENV_SESSION, "9-2");

    let value: SessionTag = resolve(None, ENV_SESSION, Some(SessionTag::default()), SessionTag::default());
    assert_eq!(value.to_string(), "9-2");

    env::remove_var(ENV_SESSION);
}

#[test]
#[serial]
fn test_resolve_ignores_unparseable_env() {
    env::set_var(ENV_SESSION, "not-a-session");

    let toml_value = SessionTag::new(2, 3).unwrap();
    let value = resolve(None, ENV_SESSION, Some(toml_value), SessionTag::default());
    assert_eq!(value, toml_value);

    env::remove_var(ENV_SESSION);
}

#[test]
#[serial]
fn test_resolve_falls_back_to_default() {
    env::remove_var(ENV_UPSTREAM_URL);

    let value = resolve(None, ENV_UPSTREAM_URL, None, "http://default".to_string());
    assert_eq!(value, "http://default");
}

#[test]
fn test_load_full_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
duplicate_phrases = ["already recorded today", "중복"]

[logging]
level = "debug"

[upstream]
base_url = "https://attendance.example.test/dev"
timeout_secs = 10

[scanner]
session = "12-3"
global_cooldown_ms = 800

[proxy]
bind_address = "0.0.0.0:8080"
"#
    )
    .unwrap();

    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.upstream.base_url, "https://attendance.example.test/dev");
    assert_eq!(config.upstream.timeout_secs, 10);
    assert_eq!(config.scanner.session.to_string(), "12-3");
    assert_eq!(config.scanner.global_cooldown_ms, 800);
    assert_eq!(config.scanner.identifier_window_ms, 5_000);
    assert_eq!(config.proxy.bind_address, "0.0.0.0:8080");
    assert!(config.duplicate_phrases.matches("학생 중복 출석"));
}

#[test]
fn test_load_malformed_file_fails() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[scanner\nsession = ").unwrap();

    assert!(TomlConfig::load(file.path()).is_err());
}

#[test]
fn test_explicit_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    assert!(TomlConfig::load_or_default(Some(&missing)).is_err());
}

#[test]
fn test_explicit_file_is_loaded() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[proxy]\nbind_address = \"127.0.0.1:9999\"").unwrap();

    let (config, source) = TomlConfig::load_or_default(Some(file.path())).unwrap();
    assert_eq!(config.proxy.bind_address, "127.0.0.1:9999");
    assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));
}
