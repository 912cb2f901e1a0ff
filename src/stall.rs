use std::sync::LazyLock;

use regex::Regex;

use crate::types::{parse_mode, Mode};

static MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmode=(\w+)").expect("valid mode regex"));
static BUILD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbuild=(\(none\)|\d+)").expect("valid build regex"));
static OUTCOME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\boutcome=(\S+)").expect("valid outcome regex"));

/// Mode and outcome extracted from one session-outcome log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub mode: Mode,
    pub produced_output: bool,
}

/// Parse a log line. Accepts both the full history form
/// (`... mode=B s=12 ... build=(none) ...`) and the compact
/// `mode=B outcome=no-output` form. The mode token may be a code or a name
/// (`mode=build`). Returns `None` for lines without a recognized mode or
/// without an outcome token.
pub fn parse_outcome_line(line: &str) -> Option<SessionOutcome> {
    let mode = parse_mode(MODE_RE.captures(line)?.get(1)?.as_str()).ok()?;

    let produced_output = if let Some(build) = BUILD_RE.captures(line).and_then(|c| c.get(1)) {
        match build.as_str() {
            "(none)" => false,
            count => count.parse::<u32>().map(|n| n > 0).unwrap_or(false),
        }
    } else {
        let outcome = OUTCOME_RE.captures(line)?.get(1)?.as_str().to_lowercase();
        !matches!(outcome.as_str(), "no-output" | "none" | "(none)")
    };

    Some(SessionOutcome {
        mode,
        produced_output,
    })
}

/// Count consecutive no-output runs of `mode` at the end of `log`.
///
/// Only the last `window` non-empty lines are considered. Walking backwards,
/// trailing lines of other modes are passed over until the first line of
/// `mode`; from there the count stops at the first line that produced output
/// or belongs to a different mode. Unparseable lines are skipped.
pub fn count_stalls(log: &str, mode: Mode, window: usize) -> usize {
    let lines: Vec<&str> = log.lines().filter(|l| !l.trim().is_empty()).collect();
    let tail = &lines[lines.len().saturating_sub(window)..];

    let mut stalls = 0;
    let mut in_run = false;
    for line in tail.iter().rev() {
        let Some(outcome) = parse_outcome_line(line) else {
            continue;
        };
        if outcome.mode != mode {
            if in_run {
                break;
            }
            continue;
        }
        if outcome.produced_output {
            break;
        }
        in_run = true;
        stalls += 1;
    }
    stalls
}
