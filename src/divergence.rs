//! Mismatch rate of an alignment, derived from its `MD` tag and CIGAR.
//!
//! The `MD` string is an alternating sequence of match runs (decimal digits),
//! mismatched reference bases (any other single character) and deletions
//! (`^` followed by the deleted reference bases). A deletion counts as one
//! mismatch no matter how many bases it removes.
//!
//! ```text
//! fraction = (mismatches + insertion ops) / (matches + mismatches - deletion ops)
//! ```

use crate::cigar;
use crate::error::{DivergenceError, TagParseError};
use noodles::sam::alignment::RecordBuf;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;

const MD_TAG: Tag = Tag::new(b'M', b'D');

/// Outcome of scoring one record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DivergenceResult {
    /// Mismatched reference bases plus deletion runs, as read from `MD`.
    pub mismatch_bases: u32,
    pub fraction: f32,
}

/// Totals read from an `MD` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MdCounts {
    pub matches: u32,
    pub mismatches: u32,
}

#[derive(Debug, Clone, Copy)]
enum MdState {
    /// Between tokens, or just after a mismatched base.
    Literal,
    DigitRun { start: usize, run: u32 },
    /// After `^`; reference letters are skipped until the next non-letter.
    Deletion,
}

impl MdCounts {
    /// Fold a finished token into the totals.
    fn close(&mut self, state: MdState) -> Result<(), TagParseError> {
        if let MdState::DigitRun { start, run } = state {
            self.matches = self
                .matches
                .checked_add(run)
                .ok_or(TagParseError::RunOverflow(start))?;
        }
        Ok(())
    }

    fn mismatch(&mut self, state: MdState) -> Result<(), TagParseError> {
        self.close(state)?;
        self.mismatches = self.mismatches.saturating_add(1);
        Ok(())
    }
}

/// Parse an `MD` string into match and mismatch totals.
///
/// Any byte that is neither a digit nor a deleted reference base counts as
/// one mismatch. Only a match run too long for `u32` is an error.
pub fn parse_md(md: &str) -> Result<MdCounts, TagParseError> {
    let mut counts = MdCounts::default();
    let mut state = MdState::Literal;

    for (offset, byte) in md.bytes().enumerate() {
        state = match (byte, state) {
            (b'0'..=b'9', MdState::DigitRun { start, run }) => {
                let run = run
                    .checked_mul(10)
                    .and_then(|r| r.checked_add(u32::from(byte - b'0')))
                    .ok_or(TagParseError::RunOverflow(start))?;
                MdState::DigitRun { start, run }
            }
            (b'0'..=b'9', _) => MdState::DigitRun {
                start: offset,
                run: u32::from(byte - b'0'),
            },
            (b'^', prev) => {
                counts.mismatch(prev)?;
                MdState::Deletion
            }
            (b, MdState::Deletion) if b.is_ascii_alphabetic() => MdState::Deletion,
            (_, prev) => {
                counts.mismatch(prev)?;
                MdState::Literal
            }
        };
    }
    counts.close(state)?;

    Ok(counts)
}

/// Mismatch fraction for parsed `MD` totals against the record's CIGAR.
pub fn divergence_fraction(counts: MdCounts, ops: &[Op]) -> Result<f32, DivergenceError> {
    let n_ins = cigar::insertion_count(ops);
    let n_del = cigar::deletion_count(ops);
    let total_map = i64::from(counts.matches) + i64::from(counts.mismatches) - i64::from(n_del);
    if total_map <= 0 {
        return Err(DivergenceError::DivisionDegenerate(total_map));
    }
    Ok((counts.mismatches + n_ins) as f32 / total_map as f32)
}

/// Strict scoring: any parse problem or degenerate denominator is an error.
pub fn try_score(md: &str, ops: &[Op]) -> Result<DivergenceResult, DivergenceError> {
    let counts = parse_md(md)?;
    let fraction = divergence_fraction(counts, ops)?;
    Ok(DivergenceResult {
        mismatch_bases: counts.mismatches,
        fraction,
    })
}

/// Score a record's divergence, recovering every failure locally.
///
/// A missing or malformed `MD` scores zero. A degenerate denominator keeps
/// the mismatch count but reports a fraction of zero.
pub fn score(md: Option<&str>, ops: &[Op]) -> DivergenceResult {
    let Some(md) = md else {
        return DivergenceResult::default();
    };

    let counts = match parse_md(md) {
        Ok(counts) => counts,
        Err(e) => {
            tracing::debug!(md, error = %e, "ignoring malformed MD tag");
            return DivergenceResult::default();
        }
    };

    let fraction = match divergence_fraction(counts, ops) {
        Ok(fraction) => fraction,
        Err(e) => {
            tracing::debug!(md, error = %e, "divergence fraction set to zero");
            0.0
        }
    };

    DivergenceResult {
        mismatch_bases: counts.mismatches,
        fraction,
    }
}

/// The record's `MD:Z` value, if present and textual.
pub fn md_tag(record: &RecordBuf) -> Option<&str> {
    match record.data().get(&MD_TAG) {
        Some(Value::String(s)) => std::str::from_utf8(s.as_ref()).ok(),
        _ => None,
    }
}

pub fn score_record(record: &RecordBuf) -> DivergenceResult {
    score(md_tag(record), record.cigar().as_ref())
}
