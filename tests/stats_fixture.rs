/// End-to-end statistics over `tests/data/stats.sam`.
///
/// The fixture has two named read groups (29976, 29978) plus one record
/// without an `RG` tag, read length 20. Group 29978 also carries longer
/// mapped reads after its first (unmapped) 20bp record.
use bamstats_rs::bam_io::AlignmentInput;
use bamstats_rs::report::{CATCH_ALL_ID, StatsReport};
use bamstats_rs::{
    EstimationMode, PerBucketStats, RecordPolicy, RunStats, StatsConfig, StatsEngine, TrimConfig,
    collect_stats,
};
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::record_buf::{Cigar, Sequence};
use std::path::PathBuf;

// ── helpers ──────────────────────────────────────────────────────────────────

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/stats.sam")
}

fn run(config: &StatsConfig) -> StatsEngine {
    let mut input = AlignmentInput::open(&fixture()).expect("open fixture");
    let header = input.header().clone();
    let (engine, run) = collect_stats(&header, input.records(), config).expect("collect stats");
    assert_eq!(run.records, 20);
    assert_eq!(run.skipped, 0);
    engine
}

struct Expected {
    count: u64,
    dups: u64,
    gc: u64,
    umap: u64,
    divergent: u64,
    mapped_bases: u64,
    proper: u64,
    qc_fail: u64,
}

fn check(bucket: &PerBucketStats, want: Expected) {
    assert_eq!(bucket.read_length, 20, "read_length");
    assert_eq!(bucket.count, want.count, "count");
    assert_eq!(bucket.dups, want.dups, "dups");
    assert_eq!(bucket.gc, want.gc, "gc");
    assert_eq!(bucket.umap, want.umap, "umap");
    assert_eq!(bucket.divergent, want.divergent, "divergent");
    assert_eq!(bucket.mapped_bases, want.mapped_bases, "mapped_bases");
    assert_eq!(bucket.proper, want.proper, "proper");
    assert_eq!(bucket.qc_fail, want.qc_fail, "qc_fail");
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[test]
fn fixture_bucket_counts() {
    let engine = run(&StatsConfig::default());
    assert_eq!(engine.catalog.len(), 3);
    assert_eq!(engine.catalog.index_of(Some("29976")), 0);
    assert_eq!(engine.catalog.index_of(Some("29978")), 1);

    let entry = engine.catalog.entry(0).unwrap();
    assert_eq!(entry.sample, "PD1234a");
    assert_eq!(entry.platform, "GAII");
    assert_eq!(entry.platform_unit, "5178_6");
    assert_eq!(entry.library, "PD1234a 140546_1054");
    assert_eq!(engine.catalog.entry(1).unwrap().platform_unit, "5085_6");

    let stats = &engine.stats;
    check(
        stats.get(0, 0).unwrap(),
        Expected { count: 8, dups: 4, gc: 72, umap: 2, divergent: 30, mapped_bases: 115, proper: 6, qc_fail: 1 },
    );
    check(
        stats.get(0, 1).unwrap(),
        Expected { count: 3, dups: 0, gc: 27, umap: 1, divergent: 18, mapped_bases: 37, proper: 0, qc_fail: 0 },
    );
    check(
        stats.get(1, 0).unwrap(),
        Expected { count: 4, dups: 0, gc: 71, umap: 2, divergent: 12, mapped_bases: 95, proper: 2, qc_fail: 0 },
    );
    check(
        stats.get(1, 1).unwrap(),
        Expected { count: 4, dups: 0, gc: 74, umap: 2, divergent: 12, mapped_bases: 95, proper: 0, qc_fail: 0 },
    );

    assert!(stats.get(1, 0).unwrap().mixed_read_lengths);
    assert!(!stats.get(0, 0).unwrap().mixed_read_lengths);
    assert_eq!(stats.get(2, 0).unwrap().count, 1);
    assert!(stats.get(2, 1).is_none());
}

#[test]
fn bucket_counters_never_exceed_count() {
    let engine = run(&StatsConfig::default());
    for group in 0..engine.catalog.len() {
        for mate in 0..2 {
            let Some(b) = engine.stats.get(group, mate) else {
                continue;
            };
            assert!(b.dups <= b.count);
            assert!(b.qc_fail <= b.count);
            assert!(b.umap <= b.count);
            assert!(b.proper <= b.count);
        }
    }
}

#[test]
fn insert_sizes_come_from_leftmost_proper_mates() {
    let engine = run(&StatsConfig::default());
    assert_eq!(
        engine.stats.get(0, 0).unwrap().insert_sizes,
        vec![150, 160, 170, 180, 190, 200]
    );
    assert!(engine.stats.get(0, 1).unwrap().insert_sizes.is_empty());
    assert_eq!(engine.stats.get(1, 0).unwrap().insert_sizes, vec![300, 280]);
}

#[test]
fn repeated_runs_are_identical() {
    let first = run(&StatsConfig::default());
    let second = run(&StatsConfig::default());
    assert_eq!(first.stats, second.stats);
}

#[test]
fn sharded_run_matches_sequential() {
    let sequential = run(&StatsConfig::default());
    for (threads, batch_size) in [(2, 1), (3, 4), (4, 64)] {
        let config = StatsConfig {
            threads,
            batch_size,
            ..StatsConfig::default()
        };
        let sharded = run(&config);
        assert_eq!(sharded.stats, sequential.stats, "threads={threads} batch={batch_size}");
    }
}

#[test]
fn report_rows_for_fixture() {
    let engine = run(&StatsConfig::default());
    let report = StatsReport::build("stats.sam", engine, EstimationMode::Standard);

    let ids: Vec<&str> = report.rows.iter().map(|r| r.entry.id.as_str()).collect();
    assert_eq!(ids, vec!["29976", "29978", CATCH_ALL_ID]);

    let first = &report.rows[0];
    assert_eq!(first.total_reads(), 11);
    assert_eq!(first.mapped_reads(), 8);
    assert_eq!(first.mapped_bases(), 152);
    assert_eq!(first.divergent_bases(), 48);
    assert_eq!(first.properly_paired(), 6);
    assert_eq!(first.duplicates(), 4);
    assert_eq!(first.insert_size.samples, 6);
    assert!((first.insert_size.mean - 175.0).abs() < 1e-9);
    assert!((first.insert_size.median - 175.0).abs() < 1e-9);

    let mut out = Vec::new();
    report.write_bas(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().nth(1).unwrap().starts_with("stats.sam\tPD1234a\tGAII\t5178_6\t"));
}

#[test]
fn rna_mode_only_changes_the_insert_size_summary() {
    let standard = StatsReport::build("stats.sam", run(&StatsConfig::default()), EstimationMode::Standard);
    let rna = StatsReport::build(
        "stats.sam",
        run(&StatsConfig::default()),
        EstimationMode::Rna(TrimConfig::default()),
    );
    for (a, b) in standard.rows.iter().zip(&rna.rows) {
        assert_eq!(a.r1, b.r1);
        assert_eq!(a.r2, b.r2);
        assert!(a.insert_size.trimmed.is_none());
        assert!(b.insert_size.trimmed.is_some());
    }
}

/// A mapped record whose CIGAR consumes 30 bases but which carries only 10.
fn malformed() -> RecordBuf {
    let mut record = RecordBuf::builder()
        .set_name("bad")
        .set_flags(Flags::empty())
        .set_cigar(Cigar::from(vec![Op::new(CigarKind::Match, 30)]))
        .set_sequence(Sequence::from(b"ACGTACGTAC".to_vec()))
        .build();
    record
        .data_mut()
        .insert(Tag::READ_GROUP, Value::from("29976"));
    record
}

fn collect_with_malformed(config: &StatsConfig) -> bamstats_rs::Result<(StatsEngine, RunStats)> {
    let mut input = AlignmentInput::open(&fixture()).expect("open fixture");
    let header = input.header().clone();
    let records = input.records().chain(std::iter::once(Ok(malformed())));
    collect_stats(&header, records, config)
}

#[test]
fn malformed_record_aborts_by_default() {
    let err = collect_with_malformed(&StatsConfig::default()).unwrap_err();
    assert!(matches!(err, bamstats_rs::Error::Record(_)), "{err}");

    let threaded = StatsConfig {
        threads: 2,
        batch_size: 3,
        ..StatsConfig::default()
    };
    let err = collect_with_malformed(&threaded).unwrap_err();
    assert!(matches!(err, bamstats_rs::Error::Record(_)), "{err}");
}

#[test]
fn malformed_record_can_be_skipped() {
    let config = StatsConfig {
        policy: RecordPolicy::SkipAndWarn,
        ..StatsConfig::default()
    };
    let (engine, run) = collect_with_malformed(&config).unwrap();
    assert_eq!(run.records, 21);
    assert_eq!(run.skipped, 1);
    assert_eq!(engine.stats.get(0, 0).unwrap().count, 8);
}
