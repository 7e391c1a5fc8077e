//! Validation pipeline for addressed allocation results.
//!
//! Checks run in a fixed order and fail fast: the first violated rule
//! aborts the run, but its diagnostic payload lists every offending row
//! that rule found. Success means the set is approved for encoding.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::engine::intent::AllocationResult;
use crate::error::{AddressOffender, BoundsOffender, Error, Result};
use crate::memory::RegionTable;

/// Longest tag name the import side accepts.
pub const MAX_TAG_NAME_LEN: usize = 15;
/// Longest comment the import side accepts.
pub const MAX_DESCRIPTION_LEN: usize = 50;
/// Longest single group path segment the import side accepts.
pub const MAX_GROUP_SEGMENT_LEN: usize = 15;
/// Separator between group path segments.
pub const GROUP_SEPARATOR: char = '\\';

/// Modal bypass flags for the validation pipeline.
///
/// `blind_validation` skips the address-bounds check wholesale (accepts
/// out-of-band or not-yet-mapped regions); `ignore_map_errors` keeps the
/// bounds check but forgives region-lookup failures. When both are set,
/// blind wins: the bounds check never runs, so the ignore flag is moot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Skip the address-bounds check entirely
    pub blind_validation: bool,
    /// Forgive region-lookup failures instead of raising `RegionNotFound`
    pub ignore_map_errors: bool,
}

/// Runs the full check pipeline over an addressed result set.
pub fn validate(
    results: &[AllocationResult],
    regions: &RegionTable,
    options: ValidationOptions,
) -> Result<()> {
    check_name_syntax(results)?;
    check_name_length(results)?;
    check_description_length(results)?;
    check_group_segments(results)?;
    check_address_bounds(results, regions, options)?;
    check_duplicate_addresses(results, true)?;
    check_duplicate_addresses(results, false)?;
    debug!(tags = results.len(), "allocation set approved");
    Ok(())
}

/// The downstream import rejects names with consecutive underscores.
fn check_name_syntax(results: &[AllocationResult]) -> Result<()> {
    let names: Vec<String> = results
        .iter()
        .filter(|r| r.intent.name.contains("__"))
        .map(|r| r.intent.name.clone())
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(Error::DoubleUnderscoreInName { names })
    }
}

fn check_name_length(results: &[AllocationResult]) -> Result<()> {
    let names: Vec<String> = results
        .iter()
        .filter(|r| r.intent.name.chars().count() > MAX_TAG_NAME_LEN)
        .map(|r| r.intent.name.clone())
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(Error::TagNameTooLong {
            limit: MAX_TAG_NAME_LEN,
            names,
        })
    }
}

fn check_description_length(results: &[AllocationResult]) -> Result<()> {
    let names: Vec<String> = results
        .iter()
        .filter(|r| r.intent.description.chars().count() > MAX_DESCRIPTION_LEN)
        .map(|r| r.intent.name.clone())
        .collect();
    if names.is_empty() {
        Ok(())
    } else {
        Err(Error::DescriptionTooLong {
            limit: MAX_DESCRIPTION_LEN,
            names,
        })
    }
}

fn check_group_segments(results: &[AllocationResult]) -> Result<()> {
    let mut groups = BTreeSet::new();
    for result in results {
        let group = &result.intent.group;
        if group
            .split(GROUP_SEPARATOR)
            .any(|segment| segment.chars().count() > MAX_GROUP_SEGMENT_LEN)
        {
            groups.insert(group.clone());
        }
    }
    if groups.is_empty() {
        Ok(())
    } else {
        Err(Error::GroupSegmentTooLong {
            limit: MAX_GROUP_SEGMENT_LEN,
            groups: groups.into_iter().collect(),
        })
    }
}

/// Joins each result back to its region by `(region_id, format, signed)`
/// and rejects addresses outside `[start, end]`.
fn check_address_bounds(
    results: &[AllocationResult],
    regions: &RegionTable,
    options: ValidationOptions,
) -> Result<()> {
    if options.blind_validation {
        debug!("blind validation requested, skipping address bounds check");
        return Ok(());
    }

    let mut missing = BTreeSet::new();
    let mut rows = Vec::new();
    for result in results {
        let (wire, signed) = result.intent.wire();
        match regions.find(&result.intent.region_id, wire, signed) {
            Some(region) => {
                if !region.contains(result.calc_address) {
                    rows.push(BoundsOffender {
                        tag: result.intent.name.clone(),
                        address: result.calc_address,
                        region_id: result.intent.region_id.clone(),
                        start: region.start_address,
                        end: region.end_address(),
                    });
                }
            }
            None => {
                if !options.ignore_map_errors {
                    missing.insert(format!("{}/{}", result.intent.region_id, result.intent.format));
                }
            }
        }
    }

    if !missing.is_empty() {
        return Err(Error::RegionNotFound {
            keys: missing.into_iter().collect(),
        });
    }
    if !rows.is_empty() {
        return Err(Error::AddressOutOfRegion { rows });
    }
    Ok(())
}

/// Rejects shared addresses within one boolean class. Boolean and
/// non-boolean address spaces are independent, so the same numeric address
/// may appear once in each class without conflict.
fn check_duplicate_addresses(results: &[AllocationResult], boolean_class: bool) -> Result<()> {
    let mut by_address: HashMap<u32, Vec<&AllocationResult>> = HashMap::new();
    for result in results {
        if result.intent.format.is_boolean() == boolean_class {
            by_address.entry(result.calc_address).or_default().push(result);
        }
    }

    let mut rows: Vec<AddressOffender> = by_address
        .values()
        .filter(|colliding| colliding.len() > 1)
        .flat_map(|colliding| colliding.iter())
        .map(|result| AddressOffender {
            tag: result.intent.name.clone(),
            address: result.calc_address,
            group: result.intent.group.clone(),
        })
        .collect();
    if rows.is_empty() {
        return Ok(());
    }
    rows.sort_by(|a, b| (a.address, &a.tag).cmp(&(b.address, &b.tag)));
    if boolean_class {
        Err(Error::DuplicateBooleanAddress { rows })
    } else {
        Err(Error::DuplicateAnalogAddress { rows })
    }
}
