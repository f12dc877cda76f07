//! Routes each alignment record to its read group / mate bucket and updates
//! the bucket's counters.
//!
//! Duplicate, QC-failed and unmapped records are still counted: the
//! statistics describe the input population, not a filtered subset. Mapped
//! records contribute bases, divergence and GC whatever their other flags.

use crate::cigar;
use crate::divergence;
use crate::error::{HeaderError, RecordError};
use crate::read_group::ReadGroupCatalog;
use crate::stats::StatsAccumulator;
use crate::types::{GroupIdx, MateIdx};
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;

/// Catalog and empty counter table built together from one header.
#[derive(Debug, Clone)]
pub struct StatsEngine {
    pub catalog: ReadGroupCatalog,
    pub stats: StatsAccumulator,
}

impl StatsEngine {
    pub fn from_header(header: &sam::Header) -> Result<Self, HeaderError> {
        let catalog = ReadGroupCatalog::from_header(header)?;
        let stats = StatsAccumulator::new(catalog.len());
        Ok(Self { catalog, stats })
    }

    pub fn classifier(&mut self) -> AlignmentClassifier<'_> {
        AlignmentClassifier::new(&self.catalog, &mut self.stats)
    }
}

pub struct AlignmentClassifier<'a> {
    catalog: &'a ReadGroupCatalog,
    stats: &'a mut StatsAccumulator,
}

impl<'a> AlignmentClassifier<'a> {
    pub fn new(catalog: &'a ReadGroupCatalog, stats: &'a mut StatsAccumulator) -> Self {
        Self { catalog, stats }
    }

    /// Add one record to its bucket.
    ///
    /// The record is validated before anything is counted, so an `Err` leaves
    /// the table untouched.
    pub fn classify(&mut self, record: &RecordBuf) -> Result<(GroupIdx, MateIdx), RecordError> {
        validate(record)?;

        let flags = record.flags();
        let group = self.catalog.index_of(read_group(record));
        let mate = mate_index(flags);
        let sequence = record.sequence().as_ref();
        let read_length = sequence.len() as u32;

        let bucket = self.stats.bucket_mut(group, mate, read_length);
        if read_length != bucket.read_length && !bucket.mixed_read_lengths {
            tracing::warn!(
                group,
                mate,
                pinned = bucket.read_length,
                observed = read_length,
                "read length differs from the first record in this bucket, keeping the first"
            );
            bucket.mixed_read_lengths = true;
        }

        bucket.count += 1;
        if flags.is_duplicate() {
            bucket.dups += 1;
        }
        if flags.is_qc_fail() {
            bucket.qc_fail += 1;
        }
        if flags.is_unmapped() {
            bucket.umap += 1;
            return Ok((group, mate));
        }

        let ops = record.cigar().as_ref();
        bucket.mapped_bases += u64::from(cigar::mapped_base_count(ops));
        bucket.divergent += u64::from(divergence::score_record(record).mismatch_bases);
        bucket.gc += gc_count(sequence);

        if flags.contains(Flags::PROPERLY_SEGMENTED) {
            bucket.proper += 1;
            // Only the leftmost mate carries a positive TLEN, so each pair is sampled once.
            let tlen = record.template_length();
            if !flags.is_mate_unmapped() && tlen > 0 {
                bucket.insert_sizes.push(tlen as u32);
            }
        }

        Ok((group, mate))
    }
}

/// 1 for second-in-pair records, 0 for everything else.
pub fn mate_index(flags: Flags) -> MateIdx {
    usize::from(flags.is_last_segment() && !flags.is_first_segment())
}

pub fn read_group(record: &RecordBuf) -> Option<&str> {
    match record.data().get(&Tag::READ_GROUP) {
        Some(Value::String(s)) => std::str::from_utf8(s.as_ref()).ok(),
        _ => None,
    }
}

pub fn gc_count(sequence: &[u8]) -> u64 {
    sequence
        .iter()
        .filter(|b| matches!(b, b'G' | b'C' | b'g' | b'c'))
        .count() as u64
}

fn validate(record: &RecordBuf) -> Result<(), RecordError> {
    let seq_len = record.sequence().len();
    let cigar_len = cigar::query_length(record.cigar().as_ref());
    // A `*` sequence carries no bases to check against.
    if seq_len > 0 && cigar_len > seq_len {
        return Err(RecordError::CigarSequenceMismatch {
            name: record
                .name()
                .map(|n| n.to_string())
                .unwrap_or_else(|| String::from("*")),
            cigar_len,
            seq_len,
        });
    }
    Ok(())
}
