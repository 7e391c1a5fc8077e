use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::catalog::GroupMapping;
use crate::error::{Error, Result};
use crate::export::ExportSnapshot;
use crate::memory::WireFormat;

/// Span of addresses already consumed for one usage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageSpan {
    /// Lowest address in use
    pub min_address: u32,
    /// Highest address in use
    pub max_address: u32,
}

/// Per `(region_id, format, signed)` address usage derived from the export
/// snapshot.
///
/// Absence of a key means the region is untouched by any existing export
/// and allocation starts at the region's start address.
#[derive(Debug, Clone, Default)]
pub struct UsageSummary {
    spans: HashMap<(String, WireFormat, bool), UsageSpan>,
}

impl UsageSummary {
    /// Derives the usage summary from the export snapshot.
    ///
    /// Each exported tag's group resolves to a region through the group
    /// mapping; spans for the same key fold through min/max, never "first
    /// match", so several groups sharing one region collapse into a single
    /// span. A tag whose group has no MAP entry is an error listing every
    /// unmapped group, unless `allow_unmapped` requests the root-tags
    /// relaxation, in which case those tags are excluded.
    pub fn summarize(
        snapshot: &ExportSnapshot,
        mapping: &GroupMapping,
        allow_unmapped: bool,
    ) -> Result<Self> {
        let mut spans: HashMap<(String, WireFormat, bool), UsageSpan> = HashMap::new();
        let mut unmapped = BTreeSet::new();

        for tag in snapshot.iter() {
            let Some(region_id) = mapping.resolve(&tag.group) else {
                if !allow_unmapped {
                    unmapped.insert(tag.group.clone());
                }
                continue;
            };
            let key = (region_id.to_string(), tag.format, tag.signed);
            spans
                .entry(key)
                .and_modify(|span| {
                    span.min_address = span.min_address.min(tag.address);
                    span.max_address = span.max_address.max(tag.address);
                })
                .or_insert(UsageSpan {
                    min_address: tag.address,
                    max_address: tag.address,
                });
        }

        if !unmapped.is_empty() {
            return Err(Error::MissingRegionMapping {
                groups: unmapped.into_iter().collect(),
            });
        }

        debug!(keys = spans.len(), "usage summary derived");
        Ok(UsageSummary { spans })
    }

    /// Highest address already consumed for a key, if any.
    pub fn max_used(&self, region_id: &str, format: WireFormat, signed: bool) -> Option<u32> {
        self.spans
            .get(&(region_id.to_string(), format, signed))
            .map(|span| span.max_address)
    }

    /// Full span for a key, if any.
    pub fn span(&self, region_id: &str, format: WireFormat, signed: bool) -> Option<UsageSpan> {
        self.spans
            .get(&(region_id.to_string(), format, signed))
            .copied()
    }

    /// All rows in deterministic order, for inspection output.
    pub fn rows(&self) -> Vec<(String, WireFormat, bool, UsageSpan)> {
        let mut rows: Vec<_> = self
            .spans
            .iter()
            .map(|((region, format, signed), span)| (region.clone(), *format, *signed, *span))
            .collect();
        rows.sort_by(|a, b| {
            (&a.0, a.1.to_string(), a.2).cmp(&(&b.0, b.1.to_string(), b.2))
        });
        rows
    }

    /// Number of distinct usage keys.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether no key has prior usage.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Per-group usage derived straight from the snapshot, with no mapping
/// applied. Feeds the read-only inspection path.
pub fn group_usage(snapshot: &ExportSnapshot) -> Vec<(String, WireFormat, bool, UsageSpan)> {
    let mut spans: HashMap<(String, WireFormat, bool), UsageSpan> = HashMap::new();
    for tag in snapshot.iter() {
        spans
            .entry((tag.group.clone(), tag.format, tag.signed))
            .and_modify(|span| {
                span.min_address = span.min_address.min(tag.address);
                span.max_address = span.max_address.max(tag.address);
            })
            .or_insert(UsageSpan {
                min_address: tag.address,
                max_address: tag.address,
            });
    }
    let mut rows: Vec<_> = spans
        .into_iter()
        .map(|((group, format, signed), span)| (group, format, signed, span))
        .collect();
    rows.sort_by(|a, b| (&a.0, a.1.to_string(), a.2).cmp(&(&b.0, b.1.to_string(), b.2)));
    rows
}
