use wrdspc_core::{CoreConfig, Theme};

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let config = CoreConfig {
        namespace: "journal".to_string(),
        legacy_keys: true,
        save_quiet_period_ms: 250,
        default_theme: Theme::Light,
        log_level: "warn".to_string(),
    };

    config.save(&path).unwrap();

    assert_eq!(CoreConfig::load(&path).unwrap(), config);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn missing_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = CoreConfig::load(dir.path().join("absent.json")).unwrap();

    assert_eq!(config, CoreConfig::default());
}

#[test]
fn corrupt_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(CoreConfig::load(&path).is_err());
    assert_eq!(CoreConfig::load_or_default(&path), CoreConfig::default());
}

#[test]
fn saved_json_uses_camel_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    CoreConfig::default().save(&path).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();

    assert!(raw.contains("\"saveQuietPeriodMs\": 1000"));
    assert!(raw.contains("\"defaultTheme\": \"dark\""));
}
