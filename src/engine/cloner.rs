//! Clone/relocate allocation path.
//!
//! Takes existing exported tags selected by name and group filters,
//! shifts their addresses by an offset, rewrites names, comments and
//! groups by regex substitution and re-resolves the destination region.
//! The cloned set then goes through the same validation pipeline as
//! freshly generated tags.

use regex::Regex;
use tracing::{debug, info};

use crate::catalog::GroupMapping;
use crate::engine::intent::{AllocationResult, TagIntent};
use crate::engine::validator::ValidationOptions;
use crate::error::{Error, Result};
use crate::export::ExportSnapshot;
use crate::memory::{RegionTable, TagFormat};

/// Parameters of one clone operation.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    /// Regex selecting source tags by name
    pub tag_filter: String,
    /// Regex selecting source tags by group path
    pub group_filter: String,
    /// Regex locating the text to substitute in names, comments and groups
    pub replace_pattern: String,
    /// Replacement text, typically a new loop or instance number
    pub replacement: String,
    /// Signed shift applied to every source address
    pub offset: i32,
    /// Explicit destination group, overriding group substitution
    pub dest: Option<String>,
    /// Optional find regex applied to the group path instead of
    /// `replace_pattern`; replaces every match
    pub group_find: Option<String>,
    /// Replacement for `group_find` matches
    pub group_replace: Option<String>,
    /// When false the group filter is anchored so subfolders stay behind
    pub recurse: bool,
}

/// Builds cloned allocation results from the export snapshot.
///
/// The result set is not yet validated; the caller runs the validation
/// pipeline with the same bypass flags used here.
pub fn clone_tags(
    snapshot: &ExportSnapshot,
    mapping: &GroupMapping,
    regions: &RegionTable,
    request: &CloneRequest,
    options: ValidationOptions,
) -> Result<Vec<AllocationResult>> {
    let tag_filter = compile(&request.tag_filter)?;
    let group_pattern = if request.recurse {
        request.group_filter.clone()
    } else {
        format!("^{}$", request.group_filter)
    };
    let group_filter = compile(&group_pattern)?;
    let replace = compile(&request.replace_pattern)?;
    let group_find = match (&request.group_find, &request.group_replace) {
        (Some(find), Some(_)) => Some(compile(find)?),
        _ => None,
    };

    let selected: Vec<_> = snapshot
        .iter()
        .filter(|tag| tag_filter.is_match(&tag.name) && group_filter.is_match(&tag.group))
        .collect();
    if selected.is_empty() {
        return Err(Error::EmptySelection {
            tag_filter: request.tag_filter.clone(),
            scope: format!("groups matching '{}'", request.group_filter),
        });
    }
    info!(tags = selected.len(), offset = request.offset, "cloning selection");

    // Re-resolution failures are forgiven under either bypass flag; blind
    // validation accepts not-yet-mapped regions by definition.
    let forgive_lookup = options.blind_validation || options.ignore_map_errors;

    let mut unmapped = Vec::new();
    let mut missing_regions = Vec::new();
    let mut results = Vec::with_capacity(selected.len());
    for tag in selected {
        let name = replace
            .replacen(&tag.name, 1, request.replacement.as_str())
            .into_owned();
        let comment = replace
            .replacen(&tag.comment, 1, request.replacement.as_str())
            .into_owned();

        let group = if let Some(dest) = &request.dest {
            dest.clone()
        } else if let Some(find) = &group_find {
            let replacement = request.group_replace.as_deref().unwrap_or_default();
            find.replace_all(&tag.group, replacement).into_owned()
        } else {
            replace
                .replacen(&tag.group, 1, request.replacement.as_str())
                .into_owned()
        };

        let address = tag.address.checked_add_signed(request.offset).ok_or_else(|| {
            Error::InvalidValue {
                what: format!("cloned address for {}", name),
                value: format!("{} + offset {}", tag.address, request.offset),
            }
        })?;

        let format = TagFormat::from_wire(tag.format, tag.signed);
        let region_id = match mapping.resolve(&group) {
            Some(region_id) => {
                // A cloned tag must land in a region whose declared type
                // matches its original format and signedness.
                if regions.find(region_id, tag.format, tag.signed).is_none() && !forgive_lookup {
                    missing_regions.push(format!("{}/{}", region_id, format));
                }
                region_id.to_string()
            }
            None => {
                if !forgive_lookup {
                    unmapped.push(group.clone());
                }
                group.clone()
            }
        };

        debug!(source = %tag.name, clone = %name, group = %group, address, "tag cloned");
        results.push(AllocationResult::new(
            TagIntent {
                name,
                description: comment,
                group,
                region_id,
                format,
                initial_value: tag.initial_value.clone(),
                text_length: tag.text_size,
            },
            address,
        ));
    }

    if !unmapped.is_empty() {
        unmapped.sort();
        unmapped.dedup();
        return Err(Error::MissingRegionMapping { groups: unmapped });
    }
    if !missing_regions.is_empty() {
        missing_regions.sort();
        missing_regions.dedup();
        return Err(Error::RegionNotFound {
            keys: missing_regions,
        });
    }
    Ok(results)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::bad_pattern(pattern, &e))
}
