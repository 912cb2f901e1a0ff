use queue_golem::config::*;

#[test]
fn defaults_carry_documented_constants() {
    let config = QueueGolemConfig::default();
    assert_eq!(config.similarity.prefix_len, 25);
    assert_eq!(config.similarity.keyword_overlap, 0.6);
    assert_eq!(config.promotion.floor, 3);
    assert_eq!(config.promotion.tag, "brainstorming-auto");
    assert_eq!(config.ingest.followup_cap, 3);
    assert_eq!(config.ingest.friction_cap, 2);
    assert_eq!(config.unblock.timeout_secs, 10);
    assert_eq!(config.paths.queue, "work-queue.json");
    assert!(validate(&config).is_ok());
}

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(dir.path()).unwrap();
    assert_eq!(config, QueueGolemConfig::default());
}

#[test]
fn partial_config_overrides_only_named_fields() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[paths]
queue = ".dev/queue.json"

[similarity]
keyword_overlap = 0.75

[promotion]
floor = 5
"#,
    )
    .unwrap();

    let config = load_config(dir.path()).unwrap();
    assert_eq!(config.paths.queue, ".dev/queue.json");
    assert_eq!(config.paths.archive, "work-queue-archive.json");
    assert_eq!(config.similarity.keyword_overlap, 0.75);
    assert_eq!(config.similarity.prefix_len, 25);
    assert_eq!(config.promotion.floor, 5);
    assert_eq!(config.promotion.tag, "brainstorming-auto");
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = load_config_from(Some(&missing), dir.path()).unwrap_err();
    assert!(err.contains("Config file not found"), "got: {}", err);
}

#[test]
fn explicit_config_path_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[unblock]\ntimeout_secs = 3\n").unwrap();

    let config = load_config_from(Some(&path), dir.path()).unwrap();
    assert_eq!(config.unblock.timeout_secs, 3);
}

#[test]
fn invalid_values_are_all_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
[similarity]
keyword_overlap = 1.5

[promotion]
floor = 0
"#,
    )
    .unwrap();

    let err = load_config(dir.path()).unwrap_err();
    assert!(err.contains("keyword_overlap"), "got: {}", err);
    assert!(err.contains("promotion.floor"), "got: {}", err);
}

#[test]
fn unparseable_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[paths\nqueue = ").unwrap();
    let err = load_config(dir.path()).unwrap_err();
    assert!(err.contains("Failed to parse"), "got: {}", err);
}

#[test]
fn default_config_text_parses_to_defaults() {
    let config: QueueGolemConfig = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
    assert_eq!(config, QueueGolemConfig::default());
}

#[test]
fn init_honors_explicit_config_location() {
    use queue_golem::storage::{FileStorage, Storage, QUEUE_KEY};
    use queue_golem::store::init_queue;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("ops/queue-golem.toml");
    assert!(write_default_config(&config_path).unwrap());
    assert!(!write_default_config(&config_path).unwrap());

    let custom = DEFAULT_CONFIG_TOML.replace(
        "# queue = \"work-queue.json\"",
        "queue = \"state/queue.json\"",
    );
    std::fs::write(&config_path, custom).unwrap();

    let config = load_config_from(Some(&config_path), dir.path()).unwrap();
    let base = config_path.parent().unwrap();
    let storage = FileStorage::new(base, &config.paths);
    assert!(init_queue(&storage).unwrap());

    assert!(dir.path().join("ops/state/queue.json").exists());
    assert!(!dir.path().join("work-queue.json").exists());
    assert!(storage.load(QUEUE_KEY).unwrap().is_some());
}
