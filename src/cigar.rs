//! Counting helpers over CIGAR operation lists.
//!
//! Operation lists come straight from the decoded record and are assumed
//! well formed; none of these functions can fail.

use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::cigar::op::Kind as CigarKind;

/// Number of bases aligned against the reference (`M`, `=` and `X` runs).
///
/// Insertions, deletions, clips, skips and padding do not contribute.
/// `5S10M5S` gives 10, `20M` gives 20.
pub fn mapped_base_count(ops: &[Op]) -> u32 {
    ops.iter()
        .filter(|op| {
            matches!(
                op.kind(),
                CigarKind::Match | CigarKind::SequenceMatch | CigarKind::SequenceMismatch
            )
        })
        .map(|op| op.len() as u32)
        .sum()
}

/// Number of insertion operations (not inserted bases).
pub fn insertion_count(ops: &[Op]) -> u32 {
    count_kind(ops, CigarKind::Insertion)
}

/// Number of deletion operations (not deleted bases).
pub fn deletion_count(ops: &[Op]) -> u32 {
    count_kind(ops, CigarKind::Deletion)
}

/// Number of query bases the CIGAR accounts for, hard clips excluded.
pub fn query_length(ops: &[Op]) -> usize {
    ops.iter()
        .map(|op| match op.kind() {
            CigarKind::Match
            | CigarKind::Insertion
            | CigarKind::SoftClip
            | CigarKind::SequenceMatch
            | CigarKind::SequenceMismatch => op.len(),
            // Deletion, Skip, HardClip, Pad
            _ => 0,
        })
        .sum()
}

fn count_kind(ops: &[Op], kind: CigarKind) -> u32 {
    ops.iter().filter(|op| op.kind() == kind).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(list: &[(CigarKind, usize)]) -> Vec<Op> {
        list.iter().map(|&(kind, len)| Op::new(kind, len)).collect()
    }

    #[test]
    fn soft_clips_are_not_mapped() {
        let cigar = ops(&[
            (CigarKind::SoftClip, 5),
            (CigarKind::Match, 10),
            (CigarKind::SoftClip, 5),
        ]);
        assert_eq!(mapped_base_count(&cigar), 10);
        assert_eq!(query_length(&cigar), 20);
    }

    #[test]
    fn full_match() {
        assert_eq!(mapped_base_count(&ops(&[(CigarKind::Match, 20)])), 20);
    }

    #[test]
    fn indels_skips_and_hard_clips_excluded() {
        let cigar = ops(&[
            (CigarKind::HardClip, 3),
            (CigarKind::Match, 8),
            (CigarKind::Insertion, 2),
            (CigarKind::SequenceMatch, 4),
            (CigarKind::Deletion, 3),
            (CigarKind::SequenceMismatch, 1),
            (CigarKind::Skip, 500),
            (CigarKind::Match, 5),
        ]);
        assert_eq!(mapped_base_count(&cigar), 18);
        assert_eq!(query_length(&cigar), 20);
    }

    #[test]
    fn indel_counts_are_per_operation() {
        let cigar = ops(&[
            (CigarKind::Match, 5),
            (CigarKind::Insertion, 4),
            (CigarKind::Match, 5),
            (CigarKind::Deletion, 7),
            (CigarKind::Match, 2),
            (CigarKind::Deletion, 1),
            (CigarKind::Match, 2),
        ]);
        assert_eq!(insertion_count(&cigar), 1);
        assert_eq!(deletion_count(&cigar), 2);
    }

    #[test]
    fn empty_cigar() {
        assert_eq!(mapped_base_count(&[]), 0);
        assert_eq!(insertion_count(&[]), 0);
        assert_eq!(deletion_count(&[]), 0);
        assert_eq!(query_length(&[]), 0);
    }
}
