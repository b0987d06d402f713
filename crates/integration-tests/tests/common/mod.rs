//! Shared fixtures: bundle trees, universal binaries, runners

#![allow(dead_code)]

use slimdown_core::application::JobRunner;
use slimdown_core::domain::{architecture_named, JobEvent};
use slimdown_core::port::bundle_inspector::mocks::StaticBundleInspector;
use slimdown_core::port::symbol_stripper::mocks::{MockBehavior, MockStripper};
use slimdown_core::port::trash::mocks::FailingTrash;
use slimdown_infra_fs::PlistBundleInspector;
use std::fs;
use std::path::Path;
use std::sync::Arc;

const FAT_MAGIC: u32 = 0xcafe_babe;
const FAT_HEADER_LEN: usize = 8;
const FAT_ARCH_LEN: usize = 20;

pub fn touch(path: &Path, bytes: usize) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, vec![b'x'; bytes]).unwrap();
}

/// Create `<bundle>/Contents/Info.plist` declaring `bundle_id`
pub fn write_info_plist(bundle: &Path, bundle_id: &str) {
    let contents = bundle.join("Contents");
    fs::create_dir_all(&contents).unwrap();
    fs::write(
        contents.join("Info.plist"),
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>{}</string>
</dict>
</plist>
"#,
            bundle_id
        ),
    )
    .unwrap();
}

/// A 32-bit universal binary with unaligned, back-to-back slices.
/// Slice `i` is filled with byte `0xa0 + i`.
pub fn fat_binary(slices: &[(&str, usize)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(FAT_MAGIC.to_be_bytes());
    out.extend((slices.len() as u32).to_be_bytes());

    let mut offset = FAT_HEADER_LEN + FAT_ARCH_LEN * slices.len();
    for (name, size) in slices {
        let arch = architecture_named(name).unwrap();
        out.extend(arch.cpu_type.to_be_bytes());
        out.extend(arch.cpu_subtype.to_be_bytes());
        out.extend((offset as u32).to_be_bytes());
        out.extend((*size as u32).to_be_bytes());
        out.extend(0u32.to_be_bytes());
        offset += size;
    }
    for (i, (_, size)) in slices.iter().enumerate() {
        out.extend(std::iter::repeat(0xa0 + i as u8).take(*size));
    }
    out
}

/// Architecture names of a universal binary, in slice order
pub fn slice_names(bytes: &[u8]) -> Vec<&'static str> {
    let be = |at: usize| i32::from_be_bytes(bytes[at..at + 4].try_into().unwrap());
    let count = be(4) as usize;
    (0..count)
        .map(|i| {
            let at = FAT_HEADER_LEN + i * FAT_ARCH_LEN;
            slimdown_core::domain::architecture::identify(be(at), be(at + 4))
                .unwrap()
                .name
        })
        .collect()
}

/// Bytes of slice `index` of a 32-bit universal binary
pub fn slice_bytes(bytes: &[u8], index: usize) -> &[u8] {
    let be = |at: usize| u32::from_be_bytes(bytes[at..at + 4].try_into().unwrap()) as usize;
    let at = FAT_HEADER_LEN + index * FAT_ARCH_LEN;
    let (offset, size) = (be(at + 8), be(at + 12));
    &bytes[offset..offset + size]
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

/// Runner without bundle identifiers, trash or real strip
pub fn runner() -> JobRunner {
    JobRunner::new(
        Arc::new(StaticBundleInspector::new()),
        Arc::new(FailingTrash),
        Arc::new(MockStripper::new(MockBehavior::Noop)),
    )
}

/// Runner reading real Info.plist files
pub fn plist_runner() -> JobRunner {
    JobRunner::new(
        Arc::new(PlistBundleInspector::new()),
        Arc::new(FailingTrash),
        Arc::new(MockStripper::new(MockBehavior::Noop)),
    )
}

pub fn progress_bytes(events: &[JobEvent]) -> u64 {
    events
        .iter()
        .map(|e| match e {
            JobEvent::Progress(p) => p.bytes_freed,
            JobEvent::ItemFailed(_) => 0,
        })
        .sum()
}

/// uid of the test process, as the kernel reports it for socket peers
pub fn current_uid(dir: &Path) -> u32 {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(dir).unwrap().uid()
}
