//! Dense indexing of the header's read groups.
//!
//! Read groups are numbered `0..N` in header order. Index `N` is reserved for
//! records whose `RG` tag is missing or names a group the header never
//! declared.

use crate::error::HeaderError;
use crate::types::{HashMap, HashMapExt};
use noodles::sam;
use noodles::sam::header::record::value::map::read_group::tag as rg_tag;

/// Metadata for one `@RG` header line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadGroupEntry {
    pub id: String,
    pub sample: String,
    pub library: String,
    pub platform: String,
    pub platform_unit: String,
}

impl ReadGroupEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadGroupCatalog {
    entries: Vec<ReadGroupEntry>,
    index: HashMap<String, usize>,
}

impl ReadGroupCatalog {
    /// Build the catalog from read groups in header order.
    pub fn build(entries: Vec<ReadGroupEntry>) -> Result<Self, HeaderError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.id.clone(), i).is_some() {
                return Err(HeaderError::DuplicateReadGroup(entry.id.clone()));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn from_header(header: &sam::Header) -> Result<Self, HeaderError> {
        let entries = header
            .read_groups()
            .iter()
            .map(|(id, rg)| {
                let fields = rg.other_fields();
                ReadGroupEntry {
                    id: id.to_string(),
                    sample: fields
                        .get(&rg_tag::SAMPLE)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    library: fields
                        .get(&rg_tag::LIBRARY)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    platform: fields
                        .get(&rg_tag::PLATFORM)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                    platform_unit: fields
                        .get(&rg_tag::PLATFORM_UNIT)
                        .map(|v| v.to_string())
                        .unwrap_or_default(),
                }
            })
            .collect();
        Self::build(entries)
    }

    /// Index for a record's read group tag. Never fails.
    pub fn index_of(&self, tag: Option<&str>) -> usize {
        tag.and_then(|id| self.index.get(id).copied())
            .unwrap_or(self.catch_all())
    }

    pub fn catch_all(&self) -> usize {
        self.entries.len()
    }

    /// Number of buckets, catch-all included.
    pub fn len(&self) -> usize {
        self.entries.len() + 1
    }

    /// Always false: the catch-all group is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Header entry for an index; `None` for the catch-all.
    pub fn entry(&self, idx: usize) -> Option<&ReadGroupEntry> {
        self.entries.get(idx)
    }

    pub fn entries(&self) -> &[ReadGroupEntry] {
        &self.entries
    }
}
