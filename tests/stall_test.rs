use queue_golem::stall::count_stalls;
use queue_golem::types::Mode;

const WINDOW: usize = 30;

#[test]
fn trailing_other_mode_line_does_not_hide_stalls() {
    let log = "\
mode=B outcome=2-commits
mode=B outcome=no-output
mode=B outcome=no-output
mode=R outcome=3-commits
";
    assert_eq!(count_stalls(log, Mode::Build, WINDOW), 2);
}

#[test]
fn output_resets_the_run() {
    let log = "\
mode=B outcome=no-output
mode=B outcome=no-output
mode=B outcome=1-commit
";
    assert_eq!(count_stalls(log, Mode::Build, WINDOW), 0);
}

#[test]
fn different_mode_inside_the_run_ends_it() {
    let log = "\
mode=B outcome=no-output
mode=E outcome=no-output
mode=B outcome=no-output
";
    assert_eq!(count_stalls(log, Mode::Build, WINDOW), 1);
    assert_eq!(count_stalls(log, Mode::Engage, WINDOW), 1);
}

#[test]
fn full_history_lines_are_understood() {
    let log = "\
2026-02-01 mode=B s=410 dur=6m cost=$1.10 build=3 commit(s) files=[a.js] note: ok
2026-02-01 mode=B s=411 dur=4m cost=$0.90 build=(none) files=[] note: stuck
2026-02-02 mode=B s=412 dur=5m cost=$1.00 build=(none) files=[] note: still stuck
2026-02-02 mode=B s=413 dur=1m cost=$0.20 build=(none) files=[] note: gave up
";
    assert_eq!(count_stalls(log, Mode::Build, WINDOW), 3);
}

#[test]
fn unparseable_lines_are_skipped() {
    let log = "\
mode=B outcome=no-output
this line means nothing

mode=B outcome=no-output
";
    assert_eq!(count_stalls(log, Mode::Build, WINDOW), 2);
}

#[test]
fn only_the_window_is_scanned() {
    let mut log = String::new();
    for _ in 0..50 {
        log.push_str("mode=B outcome=no-output\n");
    }
    assert_eq!(count_stalls(&log, Mode::Build, WINDOW), WINDOW);
    assert_eq!(count_stalls(&log, Mode::Build, 5), 5);
}

#[test]
fn empty_log_has_no_stalls() {
    assert_eq!(count_stalls("", Mode::Build, WINDOW), 0);
    assert_eq!(count_stalls("mode=R outcome=no-output\n", Mode::Build, WINDOW), 0);
}

#[test]
fn mode_names_count_as_the_same_mode() {
    let log = "\
mode=B outcome=no-output
mode=build outcome=no-output
mode=reflect outcome=1-commit
";
    assert_eq!(count_stalls(log, Mode::Build, WINDOW), 2);
    assert_eq!(count_stalls(log, Mode::Reflect, WINDOW), 0);
}
