//! Next-free address assignment.
//!
//! Intents sharing a region and type pack contiguously immediately after
//! the highest address already consumed in that region; freshly started
//! regions pack from their declared start address. The per-group index is
//! assigned in input order, so re-running with identical inputs produces
//! bit-identical addresses.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::engine::intent::{AllocationResult, TagIntent};
use crate::engine::usage::UsageSummary;
use crate::error::{Error, Result};
use crate::memory::{RegionTable, TagFormat};

/// Assigns a calculated address to every pending intent.
pub fn allocate(
    intents: &[TagIntent],
    regions: &RegionTable,
    usage: &UsageSummary,
) -> Result<Vec<AllocationResult>> {
    // Every intent must join to a region before any address math happens,
    // so a single run reports every missing key at once.
    let mut missing = BTreeSet::new();
    for intent in intents {
        let (wire, signed) = intent.wire();
        if regions.find(&intent.region_id, wire, signed).is_none() {
            missing.insert(format!("{}/{}", intent.region_id, intent.format));
        }
    }
    if !missing.is_empty() {
        return Err(Error::RegionNotFound {
            keys: missing.into_iter().collect(),
        });
    }

    let mut counters: HashMap<(bool, String, TagFormat), u32> = HashMap::new();
    let mut results = Vec::with_capacity(intents.len());
    for intent in intents {
        let (wire, signed) = intent.wire();
        let region = regions
            .find(&intent.region_id, wire, signed)
            .expect("region presence checked above");
        let stride = intent
            .format
            .stride(intent.text_length.or(region.text_length));

        let max_used = usage.max_used(&intent.region_id, wire, signed);
        let has_data = max_used.is_some();

        let index = counters
            .entry((has_data, intent.region_id.clone(), intent.format))
            .or_insert(0);
        let offset = *index * stride;
        *index += 1;

        let base = match max_used {
            Some(max) => max + stride,
            None => region.start_address,
        };
        let calc_address = base + offset;
        debug!(
            tag = %intent.name,
            region = %intent.region_id,
            has_data,
            base,
            offset,
            calc_address,
            "address assigned"
        );
        results.push(AllocationResult::new(intent.clone(), calc_address));
    }
    Ok(results)
}
