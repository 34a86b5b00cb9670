//! Tests for the driver configuration file.

use keyconf::config::{AppConfig, HashKind, StorageKind};
use keyconf::input::KeyCode;
use keyconf::settings::UserIdHasher;
use std::fs;
use std::path::PathBuf;

/// Returns a unique temporary file path for test isolation.
fn get_test_file_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("keyconf_config_test_{}_{}.toml", name, std::process::id()));
    path
}

/// Removes a test file, ignoring errors.
fn cleanup_test_file(path: &PathBuf) {
    let _ = fs::remove_file(path);
}

#[test]
fn test_config_round_trip() {
    let path = get_test_file_path("round_trip");

    let mut config = AppConfig::default();
    config.user_id = "alice".to_string();
    config.storage = StorageKind::Memory;
    config.hash = HashKind::Sha256;
    config.salt = "pepper \"quoted\"".to_string();
    config.storage_path = "C:\\saves\\{user}.json".to_string();
    config.save_to_file(&path).expect("Failed to save config");

    let loaded = AppConfig::load_from_file(&path).expect("Failed to load config");
    assert_eq!(loaded, config);

    cleanup_test_file(&path);
}

#[test]
fn test_config_file_is_commented() {
    let path = get_test_file_path("commented");

    AppConfig::default().save_to_file(&path).expect("Failed to save config");
    let content = fs::read_to_string(&path).expect("Failed to read config");
    assert!(content.contains("# User activated at start"));
    assert!(content.contains("storage = \"file\""));
    assert!(content.contains("hash = \"fnv1a\""));

    cleanup_test_file(&path);
}

#[test]
fn test_load_or_create_writes_default() {
    let path = get_test_file_path("load_or_create");
    cleanup_test_file(&path);

    let created = AppConfig::load_or_create(&path).expect("Failed to create config");
    assert!(path.exists());
    assert_eq!(created, AppConfig::default());

    let loaded = AppConfig::load_or_create(&path).expect("Failed to load config");
    assert_eq!(loaded, created);

    cleanup_test_file(&path);
}

#[test]
fn test_missing_fields_use_defaults() {
    let path = get_test_file_path("partial");
    fs::write(&path, "user_id = \"bob\"\n").expect("Failed to write config");

    let loaded = AppConfig::load_from_file(&path).expect("Failed to load config");
    assert_eq!(loaded.user_id, "bob");
    assert_eq!(loaded.storage, StorageKind::File);
    assert_eq!(loaded.storage_path, "settings/{user}.json");
    assert_eq!(loaded.joystick_count, 4);
    assert_eq!(loaded.log_filter, "info");

    cleanup_test_file(&path);
}

#[test]
fn test_out_of_range_values_are_clamped() {
    let path = get_test_file_path("clamped");
    fs::write(
        &path,
        "user_id = \"  \"\n\
         joystick_count = 0\n\
         joystick_axis_count = 200\n\
         joystick_button_count = 99\n\
         cancel_key = \"NOT_A_KEY\"\n",
    )
    .expect("Failed to write config");

    let loaded = AppConfig::load_from_file(&path).expect("Failed to load config");
    assert_eq!(loaded.user_id, "player");
    assert_eq!(loaded.joystick_count, 1);
    assert_eq!(loaded.joystick_axis_count, 28);
    assert_eq!(loaded.joystick_button_count, 20);
    assert_eq!(loaded.cancel_key(), KeyCode::ESCAPE);

    cleanup_test_file(&path);
}

#[test]
fn test_invalid_storage_kind_is_an_error() {
    let path = get_test_file_path("invalid_storage");
    fs::write(&path, "storage = \"cloud\"\n").expect("Failed to write config");

    assert!(AppConfig::load_from_file(&path).is_err());

    cleanup_test_file(&path);
}

#[test]
fn test_config_builds_input_catalog() {
    let mut config = AppConfig::default();
    config.joystick_count = 2;
    config.joystick_axis_count = 3;
    config.cancel_key = "backspace".to_string();

    let catalog = config.axis_catalog();
    assert_eq!(catalog.joystick_axes().len(), 6);
    assert_eq!(catalog.joystick_buttons(), 20);
    assert_eq!(config.cancel_key(), KeyCode::Keyboard(0x08));
}

#[test]
fn test_config_hasher_selection() {
    let mut config = AppConfig::default();
    assert_eq!(config.user_id_hasher().hash("a"), "af63dc4c8601ec8c");

    config.hash = HashKind::Passthrough;
    assert_eq!(config.user_id_hasher().hash("a"), "a");

    config.hash = HashKind::Sha256;
    assert_eq!(config.user_id_hasher().hash("a").len(), 64);
}
