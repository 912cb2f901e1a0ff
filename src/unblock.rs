use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::unistd::Pid;

use crate::qg_error::QueueError;
use crate::store::QueueStore;
use crate::types::{BlockerCheck, ItemStatus, ProgressNote};
use crate::{log_debug, log_info, log_warn};

/// Time a timed-out check's process group gets between SIGTERM and SIGKILL.
const SIGTERM_GRACE_PERIOD_MS: u64 = 1_000;

/// Polling interval when waiting for a process group to exit after SIGTERM.
const KILL_POLL_INTERVAL_MS: u64 = 50;

/// PATH handed to sandboxed commands when the caller has none.
const FALLBACK_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Executes blocker checks. Enables mocking in pipeline tests.
///
/// `Ok(true)` means the predicate passed, `Ok(false)` that the blocker still
/// holds. `Err` is reserved for checks that could not be evaluated.
pub trait CheckRunner: Send + Sync {
    fn run_check(
        &self,
        check: &BlockerCheck,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<bool, QueueError>> + Send;

    /// Extra time the runner may need past `timeout` to tear a check down.
    fn grace(&self) -> Duration {
        Duration::ZERO
    }
}

// --- System runner ---

/// Runs checks against the real world: HTTP, filesystem, subprocesses.
///
/// Commands run with a cleared environment (only `PATH`), null stdio, the
/// project root as working directory, and their own process group so a
/// timeout can take down everything they spawned.
pub struct SystemCheckRunner {
    workdir: PathBuf,
}

impl SystemCheckRunner {
    pub fn new(workdir: &Path) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
        }
    }

    fn sandboxed(&self, program: &str) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(program);
        let path = std::env::var("PATH").unwrap_or_else(|_| FALLBACK_PATH.to_string());
        cmd.env_clear()
            .env("PATH", path)
            .current_dir(&self.workdir)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        cmd
    }

    async fn http_reachable(&self, url: &str, timeout: Duration) -> Result<bool, QueueError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueueError::CheckFailed {
                id: url.to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        match client.get(url).send().await {
            Ok(response) => Ok(response.status().as_u16() < 400),
            Err(e) if e.is_timeout() => Err(QueueError::CheckTimeout {
                id: url.to_string(),
                timeout,
            }),
            Err(e) => {
                log_debug!("[unblock] {} unreachable: {}", url, e);
                Ok(false)
            }
        }
    }

    async fn file_exists(&self, path: &str) -> Result<bool, QueueError> {
        let full = self.workdir.join(path);
        tokio::fs::try_exists(&full)
            .await
            .map_err(|e| QueueError::CheckFailed {
                id: path.to_string(),
                reason: format!("Failed to stat {}: {}", full.display(), e),
            })
    }
}

impl CheckRunner for SystemCheckRunner {
    async fn run_check(&self, check: &BlockerCheck, timeout: Duration) -> Result<bool, QueueError> {
        match check {
            BlockerCheck::HttpReachable { url } => self.http_reachable(url, timeout).await,
            BlockerCheck::FileExists { path } => self.file_exists(path).await,
            BlockerCheck::CommandExitsZero { program, args } => {
                let mut cmd = self.sandboxed(program);
                cmd.args(args);
                run_sandboxed(cmd, &check.describe(), timeout).await
            }
            BlockerCheck::External { command } => {
                let mut cmd = self.sandboxed("sh");
                cmd.arg("-c").arg(command);
                run_sandboxed(cmd, &check.describe(), timeout).await
            }
        }
    }

    fn grace(&self) -> Duration {
        Duration::from_millis(SIGTERM_GRACE_PERIOD_MS * 2)
    }
}

/// Spawn `cmd` in its own process group and wait up to `timeout`.
///
/// Exit status zero maps to `Ok(true)`, any other exit to `Ok(false)`.
/// On timeout the whole group is terminated and `CheckTimeout` returned.
pub async fn run_sandboxed(
    mut cmd: tokio::process::Command,
    label: &str,
    timeout: Duration,
) -> Result<bool, QueueError> {
    cmd.kill_on_drop(true);

    // SAFETY: pre_exec runs between fork() and exec() where only async-signal-safe
    // functions are permitted. setpgid is async-signal-safe per POSIX.
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                .map_err(std::io::Error::other)?;
            Ok(())
        });
    }

    let mut child = cmd.spawn().map_err(|e| QueueError::CheckFailed {
        id: label.to_string(),
        reason: format!("Failed to spawn: {}", e),
    })?;

    let child_pid = child.id().ok_or_else(|| QueueError::CheckFailed {
        id: label.to_string(),
        reason: "Failed to get child PID".to_string(),
    })? as i32;
    log_debug!("[unblock] Spawned {} (pid={})", label, child_pid);

    match tokio::time::timeout(timeout, child.wait()).await {
        Err(_) => {
            log_debug!(
                "[unblock] {} timed out after {}s, killing process group",
                label,
                timeout.as_secs()
            );
            kill_process_group(child_pid).await;
            let _ = child.wait().await;
            Err(QueueError::CheckTimeout {
                id: label.to_string(),
                timeout,
            })
        }
        Ok(wait_result) => {
            let status = wait_result.map_err(|e| QueueError::CheckFailed {
                id: label.to_string(),
                reason: format!("Error waiting for subprocess: {}", e),
            })?;
            log_debug!("[unblock] {} exited (status={:?})", label, status.code());
            Ok(status.success())
        }
    }
}

/// SIGTERM the group, poll for exit, SIGKILL survivors.
///
/// The poll-and-sleep loop runs on the blocking pool so it never stalls an
/// async worker.
async fn kill_process_group(pgid: i32) {
    tokio::task::spawn_blocking(move || {
        use nix::sys::signal::{killpg, Signal};

        let pgid = Pid::from_raw(pgid);

        if let Err(nix::errno::Errno::ESRCH) = killpg(pgid, Signal::SIGTERM) {
            return;
        }

        let deadline =
            std::time::Instant::now() + Duration::from_millis(SIGTERM_GRACE_PERIOD_MS);
        let poll_interval = Duration::from_millis(KILL_POLL_INTERVAL_MS);

        while std::time::Instant::now() < deadline {
            match killpg(pgid, None) {
                Err(nix::errno::Errno::ESRCH) => return,
                _ => std::thread::sleep(poll_interval),
            }
        }

        let _ = killpg(pgid, Signal::SIGKILL);
    })
    .await
    .unwrap_or_else(|e| log_warn!("kill_process_group task panicked: {}", e));
}

// --- Mock runner ---

/// Scripted outcome for `MockCheckRunner`.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCheck {
    Pass,
    StillBlocked,
    Error(String),
    /// Never completes; exercises the pass-level deadline.
    Hang,
}

/// Returns predefined outcomes in call order, then `StillBlocked` forever.
pub struct MockCheckRunner {
    outcomes: tokio::sync::Mutex<Vec<MockCheck>>,
}

impl MockCheckRunner {
    pub fn new(outcomes: Vec<MockCheck>) -> Self {
        let mut reversed = outcomes;
        reversed.reverse();
        Self {
            outcomes: tokio::sync::Mutex::new(reversed),
        }
    }
}

impl CheckRunner for MockCheckRunner {
    async fn run_check(&self, check: &BlockerCheck, _timeout: Duration) -> Result<bool, QueueError> {
        let next = self.outcomes.lock().await.pop();
        match next.unwrap_or(MockCheck::StillBlocked) {
            MockCheck::Pass => Ok(true),
            MockCheck::StillBlocked => Ok(false),
            MockCheck::Error(reason) => Err(QueueError::CheckFailed {
                id: check.describe(),
                reason,
            }),
            MockCheck::Hang => {
                std::future::pending::<()>().await;
                Ok(false)
            }
        }
    }
}

// --- The pass ---

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnblockOutcome {
    pub unblocked: Vec<String>,
    pub diagnostics: Vec<String>,
}

/// Re-evaluate every blocked item's blocker check.
///
/// Checks run one at a time, each under its own deadline, so a hanging
/// predicate costs at most `timeout` (plus the runner's grace). A passing
/// check moves the item to pending, appends an audit note, and drops the
/// check. Anything else leaves the item untouched.
pub async fn auto_unblock<R: CheckRunner>(
    store: &mut QueueStore<'_>,
    runner: &R,
    timeout: Duration,
    session: u32,
) -> UnblockOutcome {
    let candidates: Vec<(String, BlockerCheck)> = store
        .items()
        .iter()
        .filter(|item| item.status == ItemStatus::Blocked)
        .filter_map(|item| item.blocker_check.clone().map(|c| (item.id.clone(), c)))
        .collect();

    let mut outcome = UnblockOutcome::default();
    let deadline = timeout + runner.grace();

    for (id, check) in candidates {
        let result = match tokio::time::timeout(deadline, runner.run_check(&check, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(QueueError::CheckTimeout {
                id: id.clone(),
                timeout,
            }),
        };

        match result {
            Ok(true) => {
                let note = format!("Auto-unblocked: blocker check passed ({})", check.describe());
                store.update(&id, |item| {
                    item.status = ItemStatus::Pending;
                    item.blocker_check = None;
                    item.progress_notes.push(ProgressNote { session, text: note });
                });
                log_info!("[unblock] {} unblocked ({})", id, check.describe());
                outcome.unblocked.push(id);
            }
            Ok(false) => {
                log_debug!("[unblock] {} still blocked ({})", id, check.describe());
            }
            Err(e) => {
                log_warn!("[unblock] {}: {}", id, e);
                outcome.diagnostics.push(format!("{}: {}", id, e));
            }
        }
    }

    outcome
}
