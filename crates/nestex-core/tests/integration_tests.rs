//! Integration tests for nestex-core.
//!
//! These tests drive whole runs through the public API: nested real-format
//! archives, budget boundaries, fallback, cancellation and the pull stream.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::ops::ControlFlow;
use std::time::Duration;

use nestex_core::BudgetResource;
use nestex_core::ExtractedEntry;
use nestex_core::ExtractionError;
use nestex_core::ExtractionSource;
use nestex_core::Extractor;
use nestex_core::ExtractorOptions;
use nestex_core::RunState;
use nestex_core::formats::ArchiveKind;
use nestex_core::formats::DecoderRegistry;
use nestex_core::test_utils::ScriptedDecoder;
use nestex_core::test_utils::create_corrupt_tar;
use nestex_core::test_utils::create_deflated_zip;
use nestex_core::test_utils::create_test_bzip2;
use nestex_core::test_utils::create_test_gzip;
use nestex_core::test_utils::create_test_tar;
use nestex_core::test_utils::create_test_xz;
use nestex_core::test_utils::create_test_zip;
use nestex_core::test_utils::create_test_zstd;

fn extractor(options: ExtractorOptions) -> Extractor {
    Extractor::new(options).unwrap()
}

/// Extractor whose zip decoder plays back `decoder` regardless of input.
fn scripted(options: ExtractorOptions, decoder: ScriptedDecoder) -> Extractor {
    extractor(options).with_decoders(DecoderRegistry::with_defaults().with(decoder))
}

fn collect_lenient(
    extractor: &Extractor,
    source: ExtractionSource,
) -> (Vec<ExtractedEntry>, nestex_core::RunOutcome) {
    let mut entries = Vec::new();
    let outcome = extractor.walk(source, |entry| {
        entries.push(entry);
        ControlFlow::Continue(())
    });
    (entries, outcome)
}

fn contents(entries: Vec<ExtractedEntry>) -> Vec<(String, Vec<u8>)> {
    entries
        .into_iter()
        .map(|mut entry| {
            let data = entry.read_to_vec().unwrap();
            (entry.path().to_string(), data)
        })
        .collect()
}

#[test]
fn test_three_level_nesting_path() {
    let gz = create_test_gzip(b"deep content");
    let tar = create_test_tar(vec![("file.txt.gz", &gz)]);
    let zip = create_test_zip(vec![("inner.tar", &tar)]);

    let entries = extractor(ExtractorOptions::default())
        .extract_all(ExtractionSource::from_bytes("outer.zip", zip))
        .unwrap();

    assert_eq!(
        contents(entries),
        [(
            "outer.zip/inner.tar/file.txt.gz/file.txt".to_string(),
            b"deep content".to_vec()
        )]
    );
}

#[test]
fn test_every_stream_codec_nests() {
    let tar = create_test_tar(vec![("f.txt", b"payload")]);
    let zip = create_test_zip(vec![
        ("a.tar.gz", &create_test_gzip(&tar)),
        ("b.tar.bz2", &create_test_bzip2(&tar)),
        ("c.txz", &create_test_xz(&tar)),
        ("d.tar.zst", &create_test_zstd(&tar)),
    ]);

    let entries = extractor(ExtractorOptions::default())
        .extract_all(ExtractionSource::from_bytes("bundle.zip", zip))
        .unwrap();
    let paths: Vec<&str> = entries.iter().map(ExtractedEntry::path).collect();

    assert_eq!(
        paths,
        [
            "bundle.zip/a.tar.gz/a.tar/f.txt",
            "bundle.zip/b.tar.bz2/b.tar/f.txt",
            "bundle.zip/c.txz/c.tar/f.txt",
            "bundle.zip/d.tar.zst/d.tar/f.txt",
        ]
    );
}

#[test]
fn test_corrupt_tar_falls_back_to_raw_bytes() {
    let corrupt = create_corrupt_tar();

    let mut entries = extractor(ExtractorOptions::default())
        .extract_all(ExtractionSource::from_bytes("broken.tar", corrupt.clone()))
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_failed_container());
    assert_eq!(entries[0].path(), "broken.tar");
    assert_eq!(entries[0].read_to_vec().unwrap(), corrupt);
}

#[test]
fn test_corrupt_tar_without_fallback_fails() {
    let extractor = extractor(ExtractorOptions::default().with_extract_self_on_fail(false));

    let (entries, outcome) =
        collect_lenient(&extractor, ExtractionSource::from_bytes("broken.tar", create_corrupt_tar()));

    assert!(entries.is_empty());
    assert_eq!(outcome.state(), RunState::Failed);
    match outcome.error {
        Some(ExtractionError::DecodeFailure { path, format, .. }) => {
            assert_eq!(path, "broken.tar");
            assert_eq!(format, ArchiveKind::Tar);
        }
        other => panic!("expected DecodeFailure, got {other:?}"),
    }
}

#[test]
fn test_round_trip_flat_archive() {
    let files: Vec<(&str, &[u8])> = vec![
        ("readme.md", b"# title\n"),
        ("src/main.rs", b"fn main() {}\n"),
        ("empty.txt", b""),
        ("data/blob.bin", &[0xAB; 4096]),
    ];
    let zip = create_deflated_zip(files.clone());

    let entries = extractor(ExtractorOptions::default())
        .extract_all(ExtractionSource::from_bytes("flat.zip", zip))
        .unwrap();

    let expected: Vec<(String, Vec<u8>)> = files
        .iter()
        .map(|(name, data)| (format!("flat.zip/{name}"), data.to_vec()))
        .collect();
    assert_eq!(contents(entries), expected);
}

#[test]
fn test_runs_are_idempotent() {
    let tar = create_test_tar(vec![("x.txt", b"x"), ("y.txt", b"y")]);
    let zip = create_test_zip(vec![("a.txt", b"a"), ("t.tar", &tar), ("b.txt", b"b")]);
    let extractor = extractor(ExtractorOptions::default());

    let first = extractor
        .extract_all(ExtractionSource::from_bytes("r.zip", zip.clone()))
        .unwrap();
    let second = extractor
        .extract_all(ExtractionSource::from_bytes("r.zip", zip))
        .unwrap();
    assert_eq!(contents(first), contents(second));
}

#[test]
fn test_ratio_boundary_exact_multiple_succeeds() {
    let extractor = scripted(
        ExtractorOptions::default(),
        ScriptedDecoder::new(ArchiveKind::Zip).entry("big.bin", vec![7u8; 600]),
    );
    let source = ExtractionSource::from_bytes("ten.zip", vec![0u8; 10]).with_kind(ArchiveKind::Zip);

    let entries = extractor.extract_all(source).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].length(), 600);
}

#[test]
fn test_ratio_boundary_one_byte_over_fails() {
    let extractor = scripted(
        ExtractorOptions::default(),
        ScriptedDecoder::new(ArchiveKind::Zip).entry("big.bin", vec![7u8; 601]),
    );
    let source = ExtractionSource::from_bytes("ten.zip", vec![0u8; 10]).with_kind(ArchiveKind::Zip);

    let (entries, outcome) = collect_lenient(&extractor, source);
    assert!(entries.is_empty());
    assert_eq!(outcome.state(), RunState::BudgetExceeded);
    assert!(matches!(
        outcome.error.as_ref().and_then(ExtractionError::budget_resource),
        Some(BudgetResource::Ratio { max: 600, .. })
    ));
}

#[test]
fn test_small_wrapper_cannot_release_large_file() {
    for fallback in [true, false] {
        let extractor = scripted(
            ExtractorOptions::default()
                .with_max_extracted_bytes_ratio(1.0)
                .with_extract_self_on_fail(fallback),
            ScriptedDecoder::new(ArchiveKind::Zip).entry("ten.bin", vec![1u8; 10]),
        );
        let source = ExtractionSource::from_bytes("five.zip", vec![0u8; 5]).with_kind(ArchiveKind::Zip);

        let (entries, outcome) = collect_lenient(&extractor, source);
        assert!(entries.is_empty(), "fallback={fallback}");
        assert_eq!(outcome.state(), RunState::BudgetExceeded);
        assert_eq!(outcome.report.bytes_extracted, 0);
    }
}

#[test]
fn test_entry_without_size_hint_is_cut_off() {
    let extractor = scripted(
        ExtractorOptions::default().with_max_extracted_bytes(1000),
        ScriptedDecoder::new(ArchiveKind::Zip).entry_without_hint("stream.bin", vec![0u8; 1 << 20]),
    );
    let source = ExtractionSource::from_bytes("s.zip", vec![0u8; 1 << 20]).with_kind(ArchiveKind::Zip);

    let (entries, outcome) = collect_lenient(&extractor, source);
    assert!(entries.is_empty());
    assert_eq!(outcome.state(), RunState::BudgetExceeded);
    assert!(outcome.report.bytes_extracted <= 1000);
}

#[test]
fn test_absolute_cap_keeps_earlier_entries() {
    let zip = create_test_zip(vec![("a", b"aaaa"), ("b", b"bbbb"), ("c", b"cccc")]);
    let extractor = extractor(ExtractorOptions::trusted().with_max_extracted_bytes(10));

    let (entries, outcome) = collect_lenient(&extractor, ExtractionSource::from_bytes("r.zip", zip));

    assert_eq!(entries.len(), 2);
    assert_eq!(outcome.state(), RunState::BudgetExceeded);
    assert_eq!(outcome.report.entries_yielded, 2);
    assert!(matches!(
        outcome.error.as_ref().and_then(ExtractionError::budget_resource),
        Some(BudgetResource::TotalBytes { max: 10, .. })
    ));
}

#[test]
fn test_empty_root_skips_ratio_cap() {
    let extractor = scripted(
        ExtractorOptions::default(),
        ScriptedDecoder::new(ArchiveKind::Zip).entry("any.bin", vec![0u8; 4096]),
    );
    let source = ExtractionSource::from_bytes("empty.zip", Vec::new()).with_kind(ArchiveKind::Zip);

    let entries = extractor.extract_all(source).unwrap();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_timeout_stops_run() {
    let zip = create_test_zip(vec![("a", b"a"), ("b", b"b"), ("c", b"c")]);
    let extractor = extractor(ExtractorOptions::default().with_timeout(Some(Duration::from_millis(50))));

    let mut seen = 0;
    let outcome = extractor.walk(ExtractionSource::from_bytes("slow.zip", zip), |_entry| {
        seen += 1;
        std::thread::sleep(Duration::from_millis(100));
        ControlFlow::Continue(())
    });

    assert_eq!(seen, 1);
    assert_eq!(outcome.state(), RunState::TimedOut);
    assert!(matches!(
        outcome.error,
        Some(ExtractionError::TimeoutExceeded { .. })
    ));
}

#[test]
fn test_lenient_stream_ends_quietly() {
    let zip = create_test_zip(vec![("a", b"aaaa"), ("b", b"bbbb"), ("c", b"cccc")]);
    let extractor = extractor(ExtractorOptions::trusted().with_max_extracted_bytes(6));

    let mut extraction = extractor
        .extract(ExtractionSource::from_bytes("r.zip", zip))
        .unwrap();
    assert_eq!(extraction.state(), RunState::Running);

    let items: Vec<_> = extraction.by_ref().collect();
    assert_eq!(items.len(), 1);
    assert!(items[0].is_ok());
    assert_eq!(extraction.state(), RunState::BudgetExceeded);
    assert!(matches!(
        extraction.error(),
        Some(ExtractionError::BudgetExceeded { .. })
    ));
    assert_eq!(extraction.report().unwrap().entries_yielded, 1);
}

#[test]
fn test_strict_stream_raises_last() {
    let zip = create_test_zip(vec![("a", b"aaaa"), ("b", b"bbbb")]);
    let extractor = extractor(ExtractorOptions::trusted().with_max_extracted_bytes(6));

    let items: Vec<_> = extractor
        .extract(ExtractionSource::from_bytes("r.zip", zip))
        .unwrap()
        .strict()
        .collect();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap().path(), "r.zip/a");
    assert!(matches!(
        items[1],
        Err(ExtractionError::BudgetExceeded { .. })
    ));
}

#[test]
fn test_strict_stream_completed_has_no_error() {
    let zip = create_test_zip(vec![("a", b"a")]);
    let items: Vec<_> = extractor(ExtractorOptions::default())
        .extract(ExtractionSource::from_bytes("r.zip", zip))
        .unwrap()
        .strict()
        .collect();
    assert_eq!(items.len(), 1);
    assert!(items[0].is_ok());
}

fn many_entries_zip(count: usize) -> Vec<u8> {
    let names: Vec<String> = (0..count).map(|i| format!("f{i:03}.txt")).collect();
    create_test_zip(names.iter().map(|n| (n.as_str(), &b"data"[..])).collect())
}

#[test]
fn test_dropping_stream_stops_worker() {
    let extractor = extractor(ExtractorOptions::default().with_batch_size(1));
    let mut extraction = extractor
        .extract(ExtractionSource::from_bytes("many.zip", many_entries_zip(200)))
        .unwrap();

    let first = extraction.next().unwrap().unwrap();
    assert_eq!(first.path(), "many.zip/f000.txt");
    // Must not block on the worker's pending send
    drop(extraction);
}

#[test]
fn test_cancel_ends_stream() {
    let extractor = extractor(ExtractorOptions::default().with_batch_size(1));
    let mut extraction = extractor
        .extract(ExtractionSource::from_bytes("many.zip", many_entries_zip(200)))
        .unwrap();

    assert!(extraction.next().is_some());
    extraction.cancel();
    let rest = extraction.by_ref().count();

    assert!(rest < 199);
    assert_eq!(extraction.state(), RunState::Cancelled);
}

#[test]
fn test_finish_drains_and_reports() {
    let extractor = extractor(ExtractorOptions::default());
    let outcome = extractor
        .extract(ExtractionSource::from_bytes("many.zip", many_entries_zip(20)))
        .unwrap()
        .finish();

    assert_eq!(outcome.state(), RunState::Completed);
    assert_eq!(outcome.report.entries_yielded, 20);
    assert_eq!(outcome.report.bytes_extracted, 80);
}

#[test]
fn test_parallel_budget_is_shared() {
    let tars: Vec<Vec<u8>> = (0..8u8)
        .map(|i| create_test_tar(vec![(&format!("{i}.bin"), &[i; 1000])]))
        .collect();
    let names: Vec<String> = (0..8).map(|i| format!("part{i}.tar")).collect();
    let zip = create_test_zip(
        names
            .iter()
            .zip(&tars)
            .map(|(name, tar)| (name.as_str(), tar.as_slice()))
            .collect(),
    );
    // 8 tars of 2560 bytes fit, 8 more kilobytes of files do not
    let options = ExtractorOptions::trusted()
        .with_parallel(true)
        .with_batch_size(4)
        .with_max_extracted_bytes(25_000);

    let (entries, outcome) = collect_lenient(&extractor(options), ExtractionSource::from_bytes("p.zip", zip));

    assert_eq!(outcome.state(), RunState::BudgetExceeded);
    assert!(outcome.report.bytes_extracted <= 25_000);
    let yielded: u64 = entries.iter().map(ExtractedEntry::length).sum();
    assert!(yielded <= 25_000);
}

#[test]
fn test_allow_filter() {
    let zip = create_test_zip(vec![("keep.txt", b"k"), ("skip.bin", b"s"), ("docs/more.txt", b"m")]);
    let extractor = extractor(ExtractorOptions::default().with_allow_filters(vec!["*.txt".into()]));

    let (entries, outcome) = collect_lenient(&extractor, ExtractionSource::from_bytes("f.zip", zip));
    let paths: Vec<&str> = entries.iter().map(ExtractedEntry::path).collect();

    assert_eq!(paths, ["f.zip/keep.txt", "f.zip/docs/more.txt"]);
    assert_eq!(outcome.report.entries_filtered, 1);
}

#[test]
fn test_large_entries_spill_to_disk() {
    let payload = vec![0x5A_u8; 64 * 1024];
    let zip = create_test_zip(vec![("large.bin", &payload), ("small.txt", b"tiny")]);
    let extractor = extractor(ExtractorOptions::default().with_memory_stream_cutoff(1024));

    let mut entries = extractor
        .extract_all(ExtractionSource::from_bytes("s.zip", zip))
        .unwrap();

    assert!(!entries[0].is_in_memory());
    assert!(entries[1].is_in_memory());
    assert_eq!(entries[0].read_to_vec().unwrap(), payload);
}

#[test]
fn test_source_from_file_and_reader() {
    let zip = create_test_zip(vec![("a.txt", b"alpha")]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.zip");
    std::fs::File::create(&path).unwrap().write_all(&zip).unwrap();
    let extractor = extractor(ExtractorOptions::default());

    let from_file = extractor
        .extract_all(ExtractionSource::open(&path).unwrap())
        .unwrap();
    let from_reader = extractor
        .extract_all(ExtractionSource::from_reader("disk.zip", zip.as_slice(), 1 << 20).unwrap())
        .unwrap();

    assert_eq!(contents(from_file), contents(from_reader));
}
