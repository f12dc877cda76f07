/// Dense read group index assigned by the catalog.
pub type GroupIdx = usize;
/// 0 for first-in-pair or unpaired records, 1 for second-in-pair.
pub type MateIdx = usize;

/// Mate buckets per read group.
pub const MATES: usize = 2;

// Fast hash maps using AHash instead of the default SipHash.
// Import these throughout the codebase with `use crate::types::HashMap`.
// Also import `HashMapExt` when you need `::new()` or `::with_capacity()`.
pub(crate) type HashMap<K, V> = ahash::HashMap<K, V>;
pub(crate) use ahash::HashMapExt;
