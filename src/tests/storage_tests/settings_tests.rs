// Settings Tests - Testing ClientSettings

use crate::reconnect::ReconnectPolicy;
use crate::storage::ClientSettings;
use crate::Error;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_settings_default() {
    let settings = ClientSettings::default();

    assert_eq!(settings.api_base_url, "http://localhost:5000/api");
    assert_eq!(settings.socket_url, "ws://localhost:5000/ws");
    assert_eq!(settings.storage_path, "./data");
    assert_eq!(settings.connect_timeout(), Duration::from_secs(10));
    assert!(!settings.require_auth_ack);
    assert!(!settings.reset_unread_on_logout);
    assert!(!settings.reconnect.is_enabled());
    assert_eq!(settings.login_route, "/login");
    assert_eq!(settings.dashboard_route, "/dashboard");
    assert!(settings.validate().is_ok());
}

#[test]
fn test_settings_save_and_load() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp_file.path();

    let settings = ClientSettings {
        socket_url: "wss://chat.example.com/ws".to_string(),
        require_auth_ack: true,
        reconnect: ReconnectPolicy::exponential(5, 500, 8_000),
        ..ClientSettings::default()
    };
    settings.save(path).expect("Failed to save settings");

    let loaded = ClientSettings::load(path).expect("Failed to load settings");
    assert_eq!(loaded, settings);
}

#[test]
fn test_settings_load_missing_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.json");

    let settings = ClientSettings::load(&path).expect("Missing file should not fail");
    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn test_settings_load_empty_file_returns_default() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "  \n").unwrap();

    let settings = ClientSettings::load(temp_file.path()).unwrap();
    assert_eq!(settings, ClientSettings::default());
}

#[test]
fn test_settings_partial_file_fills_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(
        temp_file.path(),
        r#"{"reset_unread_on_logout": true, "reconnect": {"max_attempts": 3}}"#,
    )
    .unwrap();

    let settings = ClientSettings::load(temp_file.path()).unwrap();
    assert!(settings.reset_unread_on_logout);
    assert_eq!(settings.reconnect.max_attempts, 3);
    assert_eq!(settings.reconnect.base_delay_ms, ReconnectPolicy::default().base_delay_ms);
    assert_eq!(settings.socket_url, ClientSettings::default().socket_url);
}

#[test]
fn test_settings_load_rejects_garbage() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), "not json").unwrap();

    let result = ClientSettings::load(temp_file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_settings_validation() {
    let bad_socket = ClientSettings {
        socket_url: "http://localhost:5000/ws".to_string(),
        ..ClientSettings::default()
    };
    assert!(matches!(bad_socket.validate(), Err(Error::Config(_))));

    let bad_api = ClientSettings {
        api_base_url: "localhost:5000".to_string(),
        ..ClientSettings::default()
    };
    assert!(bad_api.validate().is_err());

    let zero_timeout = ClientSettings {
        connect_timeout_ms: 0,
        ..ClientSettings::default()
    };
    assert!(zero_timeout.validate().is_err());
}

#[test]
fn test_settings_load_validates() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), r#"{"socket_url": "ftp://nope"}"#).unwrap();

    assert!(ClientSettings::load(temp_file.path()).is_err());
}
