use queue_golem::types::*;

// --- BlockerCheck wire format ---

#[test]
fn blocker_check_tagged_forms_deserialize() {
    let http: BlockerCheck =
        serde_json::from_str(r#"{"kind": "http_reachable", "url": "http://localhost:8080/health"}"#)
            .unwrap();
    assert_eq!(
        http,
        BlockerCheck::HttpReachable {
            url: "http://localhost:8080/health".to_string()
        }
    );

    let command: BlockerCheck =
        serde_json::from_str(r#"{"kind": "command_exits_zero", "program": "pg_isready"}"#)
            .unwrap();
    assert_eq!(
        command,
        BlockerCheck::CommandExitsZero {
            program: "pg_isready".to_string(),
            args: vec![]
        }
    );
}

#[test]
fn bare_string_blocker_check_is_external_command() {
    let check: BlockerCheck = serde_json::from_str(r#""test -f deploy.lock""#).unwrap();
    assert_eq!(
        check,
        BlockerCheck::External {
            command: "test -f deploy.lock".to_string()
        }
    );
}

#[test]
fn unknown_blocker_kind_is_rejected() {
    let result = serde_json::from_str::<BlockerCheck>(r#"{"kind": "telepathy"}"#);
    assert!(result.is_err());
}

#[test]
fn blocker_check_serializes_tagged() {
    let check = BlockerCheck::FileExists {
        path: "ready.flag".to_string(),
    };
    let value = serde_json::to_value(&check).unwrap();
    assert_eq!(
        value,
        serde_json::json!({"kind": "file_exists", "path": "ready.flag"})
    );
}

// --- QueueItem ---

#[test]
fn minimal_item_fills_defaults() {
    let item: QueueItem = serde_json::from_str(r#"{"id": "wq-001", "title": "Do it"}"#).unwrap();
    assert_eq!(item.status, ItemStatus::Pending);
    assert_eq!(item.complexity, Complexity::M);
    assert!(item.deps.is_empty());
    assert!(item.blocker_check.is_none());
}

#[test]
fn status_uses_kebab_case() {
    let item: QueueItem =
        serde_json::from_str(r#"{"id": "wq-001", "title": "x", "status": "in-progress"}"#)
            .unwrap();
    assert_eq!(item.status, ItemStatus::InProgress);
    assert_eq!(ItemStatus::InProgress.to_string(), "in-progress");
}

#[test]
fn empty_collections_are_omitted_on_write() {
    let item = QueueItem {
        id: "wq-001".to_string(),
        title: "x".to_string(),
        ..Default::default()
    };
    let json = serde_json::to_string(&item).unwrap();
    assert!(!json.contains("progress_notes"));
    assert!(!json.contains("blocker_check"));
    assert!(!json.contains("deps"));
}

#[test]
fn unknown_fields_are_tolerated() {
    let doc = r#"{"queue": [{"id": "wq-001", "title": "x", "assignee": "someone"}]}"#;
    let file: QueueFile = serde_json::from_str(doc).unwrap();
    assert_eq!(file.queue.len(), 1);
}

// --- Parsers ---

#[test]
fn parse_mode_accepts_codes_and_names() {
    assert_eq!(parse_mode("B").unwrap(), Mode::Build);
    assert_eq!(parse_mode("engage").unwrap(), Mode::Engage);
    assert_eq!(parse_mode(" r ").unwrap(), Mode::Reflect);
    assert!(parse_mode("X").is_err());
}

#[test]
fn mode_gates_passes() {
    assert!(Mode::Build.runs_selector());
    assert!(!Mode::Engage.runs_selector());
    assert!(Mode::Reflect.runs_followup_ingest());
    assert!(!Mode::Engage.runs_followup_ingest());
    assert!(Mode::Reflect.runs_friction_ingest());
    assert!(!Mode::Build.runs_friction_ingest());
}

#[test]
fn parse_complexity_accepts_letters_and_words() {
    assert_eq!(parse_complexity("s").unwrap(), Complexity::S);
    assert_eq!(parse_complexity("Large").unwrap(), Complexity::L);
    assert!(parse_complexity("huge").is_err());
}
