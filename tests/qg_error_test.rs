use std::time::Duration;

use queue_golem::qg_error::QueueError;

fn source_unavailable() -> QueueError {
    QueueError::SourceUnavailable {
        key: "queue".to_string(),
        reason: "permission denied".to_string(),
    }
}

#[test]
fn fatal_and_soft_partition_the_variants() {
    let fatal = [
        QueueError::QueueUnreadable {
            key: "queue".to_string(),
            reason: "x".to_string(),
        },
        QueueError::QueueMalformed {
            key: "queue".to_string(),
            reason: "x".to_string(),
        },
        QueueError::StorageWrite {
            key: "queue".to_string(),
            reason: "x".to_string(),
        },
        QueueError::LockHeld("pid 1".to_string()),
    ];
    for err in &fatal {
        assert!(err.is_fatal(), "{:?} should be fatal", err);
        assert!(!err.is_soft());
    }

    let soft = [
        source_unavailable(),
        QueueError::SourceMalformed {
            key: "friction-feed".to_string(),
            reason: "x".to_string(),
        },
        QueueError::CheckFailed {
            id: "wq-001".to_string(),
            reason: "x".to_string(),
        },
        QueueError::CheckTimeout {
            id: "wq-001".to_string(),
            timeout: Duration::from_secs(10),
        },
    ];
    for err in &soft {
        assert!(err.is_soft(), "{:?} should be soft", err);
    }
}

#[test]
fn into_fatal_upgrades_source_errors() {
    let err = source_unavailable().into_fatal();
    assert!(matches!(err, QueueError::QueueUnreadable { .. }));

    let malformed = QueueError::SourceMalformed {
        key: "queue".to_string(),
        reason: "bad".to_string(),
    }
    .into_fatal();
    assert!(matches!(malformed, QueueError::QueueMalformed { .. }));
}

#[test]
fn into_fatal_leaves_other_errors_alone() {
    let err = QueueError::LockHeld("busy".to_string()).into_fatal();
    assert!(matches!(err, QueueError::LockHeld(_)));
}

#[test]
fn timeout_message_reports_seconds() {
    let err = QueueError::CheckTimeout {
        id: "wq-007".to_string(),
        timeout: Duration::from_secs(10),
    };
    assert_eq!(err.to_string(), "Blocker check for wq-007 timed out after 10s");
}

#[test]
fn converts_into_string_for_cli_handlers() {
    fn handler() -> Result<(), String> {
        Err::<(), QueueError>(source_unavailable())?;
        Ok(())
    }
    let msg = handler().unwrap_err();
    assert_eq!(msg, "Failed to read 'queue': permission denied");
}
