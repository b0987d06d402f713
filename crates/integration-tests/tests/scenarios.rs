//! Acceptance Scenarios
//!
//! End-to-end runs of the removal engine against fixture trees.

mod common;

use common::*;
use slimdown_core::application::{cancel_channel, CancelSender, CancelToken};
use slimdown_core::domain::{
    ExitStatus, FailureKind, ItemFailure, JobEvent, JobSpec, ProgressEvent,
};
use slimdown_core::port::ProgressSink;
use std::fs;

/// Scenario A: only the targeted language folder goes
#[test]
fn scenario_a_remove_one_language() {
    let dir = tempfile::tempdir().unwrap();
    let apps = dir.path().join("Applications");
    let res = apps.join("Foo.app/Contents/Resources");
    touch(&res.join("fr.lproj/a.strings"), 100);
    touch(&res.join("en.lproj/a.strings"), 50);

    let spec = JobSpec::languages(vec![apps.clone()], ["fr.lproj", "de.lproj"])
        .with_excludes(vec![dir.path().join("System"), dir.path().join("bin")]);
    let mut events = Vec::new();
    let result = runner()
        .run(&spec, &mut events, &CancelToken::never())
        .unwrap();

    assert!(!res.join("fr.lproj").exists());
    assert!(res.join("en.lproj/a.strings").exists());
    assert_eq!(events.len(), 1);
    let JobEvent::Progress(event) = &events[0] else {
        panic!("expected progress, got {:?}", events[0]);
    };
    assert_eq!(event.bytes_freed, 100);
    assert_eq!(event.path, res.join("fr.lproj"));
    assert_eq!(event.bundle_name.as_deref(), Some("Foo"));
    assert_eq!(result.total_bytes_freed, 100);
    assert_eq!(result.status, ExitStatus::Success);

    println!("✅ Scenario A: fr.lproj removed, en.lproj untouched");
}

/// Scenario B: one slice removed, the other kept byte-for-byte
#[test]
fn scenario_b_thin_universal_binary() {
    let dir = tempfile::tempdir().unwrap();
    let binary = dir.path().join("Foo.app/Contents/MacOS/Foo");
    let original = fat_binary(&[("x86_64", 1000), ("arm64", 1200)]);
    write_file(&binary, &original);

    let spec = JobSpec::architectures(vec![dir.path().to_path_buf()], ["x86_64"]);
    let mut events = Vec::new();
    let result = runner()
        .run(&spec, &mut events, &CancelToken::never())
        .unwrap();

    let thinned = fs::read(&binary).unwrap();
    assert_eq!(slice_names(&thinned), vec!["arm64"]);
    assert_eq!(slice_bytes(&thinned, 0), slice_bytes(&original, 1));

    // 1000 slice bytes plus one 20-byte fat_arch entry
    let freed = (original.len() - thinned.len()) as u64;
    assert_eq!(freed, 1020);
    assert!(matches!(&events[..], [JobEvent::Progress(p)] if p.bytes_freed == freed));
    assert_eq!(result.total_bytes_freed, freed);
    assert_eq!(result.status, ExitStatus::Success);

    println!("✅ Scenario B: x86_64 slice removed, {} bytes freed", freed);
}

/// Scenario C: removing every slice fails that file only
#[test]
fn scenario_c_refuse_to_remove_all_slices() {
    let dir = tempfile::tempdir().unwrap();
    let doomed = dir.path().join("A.app/Contents/MacOS/A");
    let other = dir.path().join("B.app/Contents/MacOS/B");
    let original = fat_binary(&[("x86_64", 1000), ("arm64", 1200)]);
    write_file(&doomed, &original);
    write_file(&other, &fat_binary(&[("x86_64", 400), ("arm64", 300), ("i386", 200)]));

    let spec = JobSpec::architectures(vec![dir.path().to_path_buf()], ["x86_64", "arm64"]);
    let mut events = Vec::new();
    let result = runner()
        .run(&spec, &mut events, &CancelToken::never())
        .unwrap();

    assert_eq!(fs::read(&doomed).unwrap(), original);
    assert_eq!(slice_names(&fs::read(&other).unwrap()), vec!["i386"]);

    let failures: Vec<&ItemFailure> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::ItemFailed(f) => Some(f),
            JobEvent::Progress(_) => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, doomed);
    assert_eq!(failures[0].kind, FailureKind::BinaryFormat);

    assert_eq!(result.status, ExitStatus::Success);
    assert_eq!(result.items_failed, 1);
    assert_eq!(result.items_processed, 1);

    println!("✅ Scenario C: error recorded for {}, job continued", doomed.display());
}

/// Requests cancellation once `limit` items were reported
struct CancelAfter {
    limit: usize,
    seen: Vec<ProgressEvent>,
    sender: CancelSender,
}

impl ProgressSink for CancelAfter {
    fn progress(&mut self, event: ProgressEvent) {
        self.seen.push(event);
        if self.seen.len() == self.limit {
            self.sender.cancel();
        }
    }

    fn item_failed(&mut self, _failure: ItemFailure) {}
}

/// Scenario D: cancellation after 3 of 10 candidates
#[test]
fn scenario_d_cancel_mid_job() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..10 {
        touch(&dir.path().join(format!("App{}.app/fr.lproj/a", i)), 100 * (i + 1));
    }

    let spec = JobSpec::languages(vec![dir.path().to_path_buf()], ["fr.lproj"]);
    let (sender, token) = cancel_channel();
    let mut sink = CancelAfter {
        limit: 3,
        seen: Vec::new(),
        sender,
    };
    let result = runner().run(&spec, &mut sink, &token).unwrap();

    assert_eq!(result.status, ExitStatus::Cancelled);
    assert_eq!(sink.seen.len(), 3);
    let completed: u64 = sink.seen.iter().map(|p| p.bytes_freed).sum();
    assert_eq!(result.total_bytes_freed, completed);

    let untouched = (0..10)
        .filter(|i| dir.path().join(format!("App{}.app/fr.lproj/a", i)).exists())
        .count();
    assert_eq!(untouched, 7);

    println!("✅ Scenario D: cancelled after 3 items, 7 untouched");
}
