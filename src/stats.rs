//! Per read group and mate counters.
//!
//! The table is a flat arena of `groups * MATES` slots, indexed by the dense
//! read group index from the catalog. A slot stays `None` until the first
//! record lands in it, at which point the bucket pins its read length.

use crate::types::{GroupIdx, MATES, MateIdx};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerBucketStats {
    /// Sequence length of the first record seen in this bucket.
    pub read_length: u32,
    pub count: u64,
    pub dups: u64,
    pub gc: u64,
    pub umap: u64,
    pub divergent: u64,
    pub mapped_bases: u64,
    pub proper: u64,
    pub qc_fail: u64,
    /// Template lengths of properly paired records with a mapped mate.
    pub insert_sizes: Vec<u32>,
    /// Set once any record disagrees with `read_length`.
    pub mixed_read_lengths: bool,
}

impl PerBucketStats {
    pub fn new(read_length: u32) -> Self {
        Self {
            read_length,
            ..Self::default()
        }
    }

    pub fn mapped(&self) -> u64 {
        self.count - self.umap
    }

    /// Fold a later shard's counters into this one.
    ///
    /// The pinned read length of `self` wins; samples are appended in order.
    /// Add a later bucket's counters to this one.
    ///
    /// Returns true when the merge is the first place the two lengths are
    /// seen to disagree, i.e. neither side had flagged it already.
    pub fn merge(&mut self, other: PerBucketStats) -> bool {
        let newly_mixed = !self.mixed_read_lengths
            && !other.mixed_read_lengths
            && other.read_length != self.read_length;
        self.mixed_read_lengths |= other.mixed_read_lengths || newly_mixed;
        self.count += other.count;
        self.dups += other.dups;
        self.gc += other.gc;
        self.umap += other.umap;
        self.divergent += other.divergent;
        self.mapped_bases += other.mapped_bases;
        self.proper += other.proper;
        self.qc_fail += other.qc_fail;
        self.insert_sizes.extend(other.insert_sizes);
        newly_mixed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsAccumulator {
    groups: usize,
    buckets: Vec<Option<PerBucketStats>>,
}

impl StatsAccumulator {
    /// Empty table for `groups` read groups, catch-all included.
    pub fn new(groups: usize) -> Self {
        Self {
            groups,
            buckets: vec![None; groups * MATES],
        }
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    fn slot(group: GroupIdx, mate: MateIdx) -> usize {
        group * MATES + mate
    }

    /// The bucket for `(group, mate)`, created with `read_length` on first touch.
    pub fn bucket_mut(
        &mut self,
        group: GroupIdx,
        mate: MateIdx,
        read_length: u32,
    ) -> &mut PerBucketStats {
        self.buckets[Self::slot(group, mate)].get_or_insert_with(|| PerBucketStats::new(read_length))
    }

    pub fn get(&self, group: GroupIdx, mate: MateIdx) -> Option<&PerBucketStats> {
        self.buckets.get(Self::slot(group, mate))?.as_ref()
    }

    /// Take both mate buckets of a group out of the table.
    pub fn take_group(&mut self, group: GroupIdx) -> [Option<PerBucketStats>; MATES] {
        let base = Self::slot(group, 0);
        [self.buckets[base].take(), self.buckets[base + 1].take()]
    }

    /// Merge a shard that covered records after everything already in `self`.
    pub fn merge(&mut self, other: StatsAccumulator) {
        debug_assert_eq!(self.groups, other.groups);
        for (slot, (mine, theirs)) in self.buckets.iter_mut().zip(other.buckets).enumerate() {
            match (mine.as_mut(), theirs) {
                (Some(mine), Some(theirs)) => {
                    let observed = theirs.read_length;
                    if mine.merge(theirs) {
                        tracing::warn!(
                            group = slot / MATES,
                            mate = slot % MATES,
                            pinned = mine.read_length,
                            observed,
                            "read length differs from the first record in this bucket, keeping the first"
                        );
                    }
                }
                (None, Some(theirs)) => *mine = Some(theirs),
                (_, None) => {}
            }
        }
    }

    /// Records counted across every bucket.
    pub fn total_records(&self) -> u64 {
        self.buckets.iter().flatten().map(|b| b.count).sum()
    }
}
