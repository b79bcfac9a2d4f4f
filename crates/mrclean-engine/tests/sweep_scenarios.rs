//! End-to-end sweeps over real temporary directory trees

use filetime::FileTime;
use mrclean_domain::{MaskSet, RetentionRule, Strategy};
use mrclean_engine::{
    AgeBasis, CancellationSignal, EngineConfig, EventSink, MemorySink, Remover, RuleOutcome,
    SkipReason, SweepEvent, SweepStatus, Sweeper,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

const DAY: u64 = 86_400;

fn config() -> EngineConfig {
    EngineConfig {
        age_basis: AgeBasis::Modified,
        watchdog_interval_ms: 10,
        ..EngineConfig::default()
    }
}

fn sweeper() -> (Sweeper, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (Sweeper::with_sink(config(), sink.clone()), sink)
}

fn backdate(path: &Path, days: u64) {
    let then = SystemTime::now() - Duration::from_secs(days * DAY);
    filetime::set_file_mtime(path, FileTime::from_system_time(then)).unwrap();
}

fn file(path: &Path, days: u64) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"data").unwrap();
    backdate(path, days);
    path.to_path_buf()
}

fn rule(root: &Path, strategy: Strategy, days: u64, masks: &str) -> RetentionRule {
    RetentionRule::new("test", root, strategy, days, MaskSet::parse(masks))
}

#[test]
fn strategy0_removes_stale_root_with_contents() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    file(&root.join("old.txt"), 10);
    backdate(&root, 10);

    let (mut sweeper, _) = sweeper();
    let report = sweeper.sweep(
        &[rule(&root, Strategy::DeleteTreeIfStale, 7, "")],
        &CancellationSignal::new(),
    );

    assert_eq!(report.rules[0].outcome, RuleOutcome::Completed);
    assert!(!root.exists());
}

#[test]
fn strategy0_keeps_fresh_root_and_fresh_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    let stale = file(&root.join("old.txt"), 10);
    let fresh = file(&root.join("keep/new.txt"), 1);
    let stale_dir = root.join("gone");
    file(&stale_dir.join("inner.txt"), 10);
    backdate(&stale_dir, 10);
    backdate(&root.join("keep"), 1);

    let (mut sweeper, _) = sweeper();
    sweeper.sweep(
        &[rule(&root, Strategy::DeleteTreeIfStale, 7, "")],
        &CancellationSignal::new(),
    );

    assert!(root.exists());
    assert!(!stale.exists());
    assert!(!stale_dir.exists());
    assert!(fresh.exists());
}

#[test]
fn strategy1_removes_only_stale_subdirectories() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let old = root.join("old");
    let new = root.join("new");
    file(&old.join("a.txt"), 10);
    file(&new.join("b.txt"), 1);
    let top = file(&root.join("top.txt"), 10);
    backdate(&old, 10);
    backdate(&new, 1);

    let (mut sweeper, sink) = sweeper();
    sweeper.sweep(
        &[rule(root, Strategy::DeleteStaleSubdirsOnly, 7, "")],
        &CancellationSignal::new(),
    );

    assert!(!old.exists());
    assert!(new.join("b.txt").exists());
    assert!(top.exists());
    assert_eq!(sink.deleted_paths(), vec![old]);
}

#[test]
fn strategy1_judges_nested_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let parent = root.join("parent");
    let nested = parent.join("nested");
    file(&nested.join("x.txt"), 10);
    file(&parent.join("y.txt"), 1);
    backdate(&nested, 10);
    backdate(&parent, 1);

    let (mut sweeper, _) = sweeper();
    sweeper.sweep(
        &[rule(root, Strategy::DeleteStaleSubdirsOnly, 7, "")],
        &CancellationSignal::new(),
    );

    assert!(parent.join("y.txt").exists());
    assert!(!nested.exists());
}

#[test]
fn strategy2_respects_masks() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let tmp_file = file(&root.join("a.tmp"), 10);
    let log_file = file(&root.join("b.log"), 10);

    let (mut sweeper, sink) = sweeper();
    sweeper.sweep(
        &[rule(root, Strategy::DeleteStaleFilesAtRoot, 7, "*.tmp")],
        &CancellationSignal::new(),
    );

    assert!(!tmp_file.exists());
    assert!(log_file.exists());
    assert!(sink.events().contains(&SweepEvent::EntrySkipped {
        path: log_file,
        kind: mrclean_engine::EntryKind::File,
        reason: SkipReason::NoMatch,
    }));
}

#[test]
fn mask_matching_is_case_insensitive_and_whole_name() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let upper = file(&root.join("REPORT.TMP"), 10);
    let suffix = file(&root.join("report.tmpx"), 10);
    let nested = file(&root.join("sub/deep.Bak"), 10);
    let other = file(&root.join("notes.txt"), 10);

    let (mut sweeper, _) = sweeper();
    sweeper.sweep(
        &[rule(root, Strategy::DeleteStaleFilesKeepTree, 7, "*.tmp, *.bak")],
        &CancellationSignal::new(),
    );

    assert!(!upper.exists());
    assert!(!nested.exists());
    assert!(suffix.exists());
    assert!(other.exists());
}

#[test]
fn mask_aware_strategies_preserve_structure_and_are_idempotent() {
    for strategy in [
        Strategy::DeleteStaleFilesAtRoot,
        Strategy::DeleteStaleFilesRecursive,
        Strategy::DeleteStaleFilesKeepTree,
    ] {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let dirs = [root.join("a"), root.join("a/b"), root.join("a/b/c"), root.join("d")];
        let stale = [
            file(&root.join("a/1.tmp"), 10),
            file(&root.join("a/b/c/2.tmp"), 10),
            file(&root.join("d/3.tmp"), 10),
        ];
        let fresh = file(&root.join("a/b/4.tmp"), 1);
        for dir in &dirs {
            backdate(dir, 30);
        }

        let rules = [rule(root, strategy, 7, "")];
        let (mut sweeper, _) = sweeper();
        let first = sweeper.sweep(&rules, &CancellationSignal::new());
        assert_eq!(first.metrics.files_deleted(), 3, "{}", strategy);

        for dir in &dirs {
            assert!(dir.is_dir(), "{} removed {}", strategy, dir.display());
        }
        assert!(stale.iter().all(|f| !f.exists()), "{}", strategy);
        assert!(fresh.exists(), "{}", strategy);

        sweeper.reset_metrics();
        let second = sweeper.sweep(&rules, &CancellationSignal::new());
        assert_eq!(second.metrics.total_deleted(), 0, "{}", strategy);
    }
}

#[test]
fn nothing_newer_than_cutoff_is_deleted() {
    for strategy in Strategy::ALL {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        let entries = [
            file(&root.join("x.txt"), 2),
            file(&root.join("sub/y.tmp"), 3),
            file(&root.join("sub/deeper/z.log"), 6),
        ];
        backdate(&root.join("sub/deeper"), 6);
        backdate(&root.join("sub"), 3);
        backdate(&root, 2);

        let (mut sweeper, sink) = sweeper();
        let report = sweeper.sweep(&[rule(&root, strategy, 7, "")], &CancellationSignal::new());

        assert_eq!(report.metrics.total_deleted(), 0, "{}", strategy);
        assert!(sink.deleted_paths().is_empty(), "{}", strategy);
        assert!(entries.iter().all(|e| e.exists()), "{}", strategy);
    }
}

/// Cancels the sweep as soon as the named rule starts scanning
struct CancelOnScan {
    rule: String,
    cancel: CancellationSignal,
    inner: Arc<MemorySink>,
}

impl EventSink for CancelOnScan {
    fn emit(&self, event: &SweepEvent) {
        if let SweepEvent::ScanStarted { rule, .. } = event {
            if *rule == self.rule {
                self.cancel.cancel();
            }
        }
        self.inner.emit(event);
    }
}

#[test]
fn cancellation_during_third_rule_stops_the_sweep() {
    let tmp = tempfile::tempdir().unwrap();
    let mut rules = Vec::new();
    let mut stale = Vec::new();
    for i in 1..=5 {
        let root = tmp.path().join(format!("r{i}"));
        stale.push(file(&root.join("old.tmp"), 10));
        rules.push(RetentionRule::new(
            format!("r{i}"),
            &root,
            Strategy::DeleteStaleFilesAtRoot,
            7,
            MaskSet::default(),
        ));
    }

    let cancel = CancellationSignal::new();
    let memory = Arc::new(MemorySink::new());
    let sink = Arc::new(CancelOnScan {
        rule: "r3".to_string(),
        cancel: cancel.clone(),
        inner: memory.clone(),
    });
    let mut sweeper = Sweeper::with_sink(config(), sink);

    let report = sweeper.sweep(&rules, &cancel);

    assert_eq!(report.status, SweepStatus::Cancelled);
    let outcomes: Vec<_> = report.rules.iter().map(|r| r.outcome.clone()).collect();
    assert_eq!(
        outcomes,
        vec![RuleOutcome::Completed, RuleOutcome::Completed, RuleOutcome::Cancelled]
    );
    assert!(!stale[0].exists());
    assert!(!stale[1].exists());
    assert!(stale[2..].iter().all(|f| f.exists()));

    let started = memory
        .events()
        .iter()
        .filter(|e| matches!(e, SweepEvent::ScanStarted { .. }))
        .count();
    assert_eq!(started, 3);
    assert_eq!(
        memory.events().last(),
        Some(&SweepEvent::SweepFinished {
            status: SweepStatus::Cancelled
        })
    );
}

/// Takes a fixed time per removal
struct SlowRemover(Duration);

impl Remover for SlowRemover {
    fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        std::thread::sleep(self.0);
        fs::remove_file(path)
    }

    fn remove_tree(&self, path: &Path) -> std::io::Result<()> {
        std::thread::sleep(self.0);
        fs::remove_dir_all(path)
    }
}

#[test]
fn budget_stops_rule_and_sweep_continues() {
    let tmp = tempfile::tempdir().unwrap();
    let slow_root = tmp.path().join("slow");
    let files: Vec<_> = (0..20)
        .map(|i| file(&slow_root.join(format!("{i:02}.tmp")), 10))
        .collect();
    let next_root = tmp.path().join("next");
    file(&next_root.join("other.tmp"), 10);

    let sink = Arc::new(MemorySink::new());
    let config = config().with_time_budget(Duration::from_millis(100));
    let mut sweeper = Sweeper::with_sink(config, sink.clone())
        .with_remover(SlowRemover(Duration::from_millis(30)));

    let start = Instant::now();
    let outcome = sweeper.run_rule(
        &rule(&slow_root, Strategy::DeleteStaleFilesAtRoot, 7, ""),
        &CancellationSignal::new(),
    );
    let elapsed = start.elapsed();

    assert_eq!(outcome, RuleOutcome::BudgetExceeded);
    // Budget, one watchdog interval, plus the removal already in flight
    assert!(elapsed < Duration::from_millis(100 + 10 + 30 + 200), "{:?}", elapsed);

    let remaining = files.iter().filter(|f| f.exists()).count();
    assert!(remaining > 0 && remaining < files.len(), "{} remaining", remaining);
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, SweepEvent::RuleBudgetExceeded { budget, .. } if *budget == Duration::from_millis(100))));

    let outcome = sweeper.run_rule(
        &rule(&next_root, Strategy::DeleteStaleFilesAtRoot, 7, ""),
        &CancellationSignal::new(),
    );
    assert_eq!(outcome, RuleOutcome::Completed);
    assert!(!next_root.join("other.tmp").exists());
}

#[test]
fn budget_is_rebased_for_every_directory() {
    // Each directory fits the budget on its own; the whole tree does not
    for strategy in [
        Strategy::DeleteStaleSubdirsOnly,
        Strategy::DeleteStaleFilesAtRoot,
        Strategy::DeleteStaleFilesRecursive,
        Strategy::DeleteStaleFilesKeepTree,
    ] {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let mut files = Vec::new();
        for d in 0..4 {
            for f in 0..2 {
                files.push(file(&root.join(format!("d{d}/{f}.tmp")), 10));
            }
        }

        let config = config().with_time_budget(Duration::from_millis(200));
        let mut sweeper = Sweeper::with_sink(config, Arc::new(MemorySink::new()))
            .with_remover(SlowRemover(Duration::from_millis(40)));

        let outcome = sweeper.run_rule(&rule(root, strategy, 7, ""), &CancellationSignal::new());

        assert_eq!(outcome, RuleOutcome::Completed, "{}", strategy);
        if strategy.uses_masks() {
            assert!(files.iter().all(|f| !f.exists()), "{}", strategy);
        }
        for d in 0..4 {
            assert!(root.join(format!("d{d}")).is_dir(), "{}", strategy);
        }
    }
}

#[test]
fn missing_root_does_not_block_other_rules() {
    let tmp = tempfile::tempdir().unwrap();
    let present = tmp.path().join("present");
    let stale = file(&present.join("old.tmp"), 10);

    let (mut sweeper, _) = sweeper();
    let report = sweeper.sweep(
        &[
            rule(&tmp.path().join("absent"), Strategy::DeleteStaleFilesKeepTree, 7, ""),
            rule(&present, Strategy::DeleteStaleFilesKeepTree, 7, ""),
        ],
        &CancellationSignal::new(),
    );

    assert_eq!(report.status, SweepStatus::Completed);
    assert_eq!(report.rules[0].outcome, RuleOutcome::MissingRoot);
    assert_eq!(report.rules[1].outcome, RuleOutcome::Completed);
    assert_eq!(report.failed_rules().count(), 0);
    assert!(!stale.exists());
}

#[test]
fn dry_run_reports_without_deleting() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("root");
    let stale = file(&root.join("old.txt"), 10);
    backdate(&root, 10);

    let sink = Arc::new(MemorySink::new());
    let config = EngineConfig {
        dry_run: true,
        ..config()
    };
    let mut sweeper = Sweeper::with_sink(config, sink.clone());
    let report = sweeper.sweep(
        &[rule(&root, Strategy::DeleteTreeIfStale, 7, "")],
        &CancellationSignal::new(),
    );

    assert!(stale.exists());
    assert_eq!(report.metrics.total_deleted(), 2);
    assert!(sink.events().iter().all(|e| !matches!(
        e,
        SweepEvent::EntryDeleted { dry_run: false, .. }
    )));
}

#[test]
fn rules_sharing_a_root_share_its_masks() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let log = file(&root.join("a.log"), 10);
    let txt = file(&root.join("b.txt"), 10);

    let (mut sweeper, _) = sweeper();
    sweeper.sweep(
        &[
            rule(root, Strategy::DeleteStaleFilesAtRoot, 30, "*.log"),
            rule(root, Strategy::DeleteStaleFilesAtRoot, 7, ""),
        ],
        &CancellationSignal::new(),
    );

    assert!(!log.exists());
    assert!(txt.exists());
}

#[cfg(unix)]
#[test]
fn read_only_file_is_skipped_without_stopping_siblings() {
    use std::os::unix::fs::PermissionsExt;

    if rustix::process::geteuid().is_root() {
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    let locked = file(&root.join("locked.tmp"), 10);
    let open = file(&root.join("open.tmp"), 10);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o444)).unwrap();

    let (mut sweeper, sink) = sweeper();
    let report = sweeper.sweep(
        &[rule(root, Strategy::DeleteStaleFilesAtRoot, 7, "")],
        &CancellationSignal::new(),
    );

    assert!(locked.exists());
    assert!(!open.exists());
    assert_eq!(report.metrics.skipped_for(SkipReason::Permission), 1);
    assert_eq!(report.rules[0].outcome, RuleOutcome::Completed);
    assert!(sink.events().contains(&SweepEvent::EntrySkipped {
        path: locked,
        kind: mrclean_engine::EntryKind::File,
        reason: SkipReason::Permission,
    }));
}
