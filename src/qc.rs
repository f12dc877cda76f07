//! Mismatch QC marking and the matching flag modifier.
//!
//! `mismatch-qc` sets `QC_FAIL` on reads whose divergence fraction is above a
//! threshold and tags them `mm:A:Y`. `flag-modifier` later clears or
//! reinstates `QC_FAIL` on exactly those tagged reads without touching the tag.

use crate::bam_io::{self, AlignmentInput};
use crate::divergence;
use anyhow::{Context, Result};
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::io::Write as _;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use std::path::Path;
use std::time::Instant;

pub const MM_TAG: Tag = Tag::new(b'm', b'm');
const MM_MARK: u8 = b'Y';

/// Reads with any of these flags are never marked.
pub const BAD_FLAGS: Flags = Flags::UNMAPPED
    .union(Flags::MATE_UNMAPPED)
    .union(Flags::QC_FAIL)
    .union(Flags::DUPLICATE)
    .union(Flags::SECONDARY)
    .union(Flags::SUPPLEMENTARY);

const PROGRESS_INTERVAL: u64 = 10_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QcConfig {
    /// Divergence fraction above which a read fails QC.
    pub threshold: f32,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self { threshold: 0.05 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagMode {
    /// Clear `QC_FAIL` on tagged reads.
    Remove,
    /// Set `QC_FAIL` on tagged reads.
    Replace,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QcStats {
    pub processed: u64,
    /// Reads marked (`mismatch-qc`) or carrying the tag (`flag-modifier`).
    pub marked: u64,
}

pub fn has_mismatch_tag(record: &RecordBuf) -> bool {
    matches!(record.data().get(&MM_TAG), Some(Value::Character(MM_MARK)))
}

/// Mark `record` if its divergence fraction exceeds `threshold`.
///
/// Returns whether the record was marked. The tag is only added when absent,
/// so marking is never duplicated.
pub fn mark_mismatch(record: &mut RecordBuf, threshold: f32) -> bool {
    if record.flags().intersects(BAD_FLAGS) {
        return false;
    }
    if divergence::score_record(record).fraction <= threshold {
        return false;
    }

    record.flags_mut().insert(Flags::QC_FAIL);
    if !has_mismatch_tag(record) {
        record.data_mut().insert(MM_TAG, Value::Character(MM_MARK));
    }
    true
}

/// Apply `mode` to a tagged record. Returns whether the record carries the tag.
pub fn apply_flag_mode(record: &mut RecordBuf, mode: FlagMode) -> bool {
    if !has_mismatch_tag(record) {
        return false;
    }
    match mode {
        FlagMode::Remove => record.flags_mut().remove(Flags::QC_FAIL),
        FlagMode::Replace => record.flags_mut().insert(Flags::QC_FAIL),
    }
    true
}

pub fn run_mismatch_qc(
    input: &Path,
    output: &Path,
    config: &QcConfig,
    command_line: &str,
) -> Result<QcStats> {
    let threshold = config.threshold;
    let stats = rewrite(
        input,
        output,
        command_line,
        "Marks reads above the mismatch threshold as QC failed",
        |record| mark_mismatch(record, threshold),
    )?;
    tracing::info!(
        processed = stats.processed,
        marked = stats.marked,
        threshold,
        "mismatch QC complete"
    );
    Ok(stats)
}

pub fn run_flag_modifier(
    input: &Path,
    output: &Path,
    mode: FlagMode,
    command_line: &str,
) -> Result<QcStats> {
    let stats = rewrite(
        input,
        output,
        command_line,
        "Removes or reinstates QC fail flags on mismatch tagged reads",
        |record| apply_flag_mode(record, mode),
    )?;
    tracing::info!(
        processed = stats.processed,
        modified = stats.marked,
        ?mode,
        "flag modification complete"
    );
    Ok(stats)
}

/// Copy every record from `input` to `output`, passing each through `edit`.
fn rewrite<F>(
    input: &Path,
    output: &Path,
    command_line: &str,
    description: &str,
    mut edit: F,
) -> Result<QcStats>
where
    F: FnMut(&mut RecordBuf) -> bool,
{
    let mut reader = AlignmentInput::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let mut header = reader.header().clone();
    bam_io::add_program(&mut header, env!("CARGO_PKG_NAME"), command_line, description)
        .context("failed to add @PG line to header")?;

    let mut writer = bam_io::create_writer(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    writer.write_alignment_header(&header)?;

    let mut stats = QcStats::default();
    let mut started = Instant::now();
    for result in reader.records() {
        let mut record = result.with_context(|| format!("failed to read {}", input.display()))?;
        stats.processed += 1;
        if stats.processed % PROGRESS_INTERVAL == 0 {
            tracing::debug!(
                processed = stats.processed,
                seconds = started.elapsed().as_secs_f64(),
                "processed another 10 million reads"
            );
            started = Instant::now();
        }
        if edit(&mut record) {
            stats.marked += 1;
        }
        writer.write_alignment_record(&header, &record)?;
    }
    writer.finish(&header)?;

    Ok(stats)
}
