//! The allocation engine: a single-pass batch pipeline from catalog and
//! export snapshot to an approved, addressed allocation set.
//!
//! ```text
//! Catalog + Snapshot -> Usage Summarizer -> Allocator | Cloner -> Validator
//! ```
//!
//! Every stage takes immutable inputs and returns a new result; no stage
//! reaches back into shared mutable state.

pub mod allocator;
pub mod cloner;
pub mod intent;
pub mod usage;
pub mod validator;

use regex::Regex;
use tracing::info;

use crate::catalog::{GroupMapping, TagCatalog};
use crate::error::{Error, Result};
use crate::export::ExportSnapshot;
use crate::memory::RegionTable;

pub use cloner::CloneRequest;
pub use intent::{AllocationResult, TagIntent};
pub use usage::{UsageSpan, UsageSummary};
pub use validator::ValidationOptions;

/// Modal flags of one engine invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Skip the address-bounds check entirely
    pub blind_validation: bool,
    /// Suppress the region overlap scan and forgive region-lookup failures
    pub ignore_map_errors: bool,
    /// Tolerate exported tags whose group has no MAP entry (root tags)
    pub allow_unmapped: bool,
}

impl EngineOptions {
    fn validation(&self) -> ValidationOptions {
        ValidationOptions {
            blind_validation: self.blind_validation,
            ignore_map_errors: self.ignore_map_errors,
        }
    }
}

/// The loaded inputs of one run, wired into the allocation pipeline.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: TagCatalog,
    regions: RegionTable,
    snapshot: ExportSnapshot,
    mapping: GroupMapping,
}

impl Engine {
    /// Wires loaded inputs together; the group mapping derives from the
    /// catalog's MAP rows.
    pub fn new(catalog: TagCatalog, regions: RegionTable, snapshot: ExportSnapshot) -> Self {
        let mapping = catalog.group_mapping();
        Engine {
            catalog,
            regions,
            snapshot,
            mapping,
        }
    }

    /// The loaded tag catalog.
    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    /// The loaded memory region table.
    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// The loaded export snapshot.
    pub fn snapshot(&self) -> &ExportSnapshot {
        &self.snapshot
    }

    /// The group-to-region mapping derived from MAP rows.
    pub fn mapping(&self) -> &GroupMapping {
        &self.mapping
    }

    /// Generates new tags for every catalog row matching `pattern` and
    /// assigns them non-conflicting addresses.
    ///
    /// The literal `*` selects every GENERATE and BASE row; anything else
    /// is a regex matched against `TAG_PATTERN` (GENERATE) and `TAG_NAME`
    /// (BASE).
    pub fn generate(&self, pattern: &str, options: &EngineOptions) -> Result<Vec<AllocationResult>> {
        info!(pattern, "generating tags");
        self.catalog.validate()?;
        if !options.ignore_map_errors {
            self.regions.check_overlaps()?;
        }

        let intents = self.expand_pattern(pattern)?;
        self.check_new_names(intents.iter().map(|i| i.name.as_str()))?;

        let usage =
            UsageSummary::summarize(&self.snapshot, &self.mapping, options.allow_unmapped)?;
        let results = allocator::allocate(&intents, &self.regions, &usage)?;
        validator::validate(&results, &self.regions, options.validation())?;
        info!(tags = results.len(), "generate approved");
        Ok(results)
    }

    /// Clones existing exported tags into a new region with an address
    /// offset, running the same validation pipeline as `generate`.
    pub fn clone_tags(
        &self,
        request: &CloneRequest,
        options: &EngineOptions,
    ) -> Result<Vec<AllocationResult>> {
        info!(
            group_filter = %request.group_filter,
            offset = request.offset,
            "cloning tags"
        );
        if !options.ignore_map_errors {
            self.regions.check_overlaps()?;
        }

        let results = cloner::clone_tags(
            &self.snapshot,
            &self.mapping,
            &self.regions,
            request,
            options.validation(),
        )?;
        self.check_new_names(results.iter().map(|r| r.intent.name.as_str()))?;
        validator::validate(&results, &self.regions, options.validation())?;
        info!(tags = results.len(), "clone approved");
        Ok(results)
    }

    /// Expands matching GENERATE rows against their templates, then adds
    /// matching BASE rows, resolving every group to its region.
    fn expand_pattern(&self, pattern: &str) -> Result<Vec<TagIntent>> {
        let matcher = PatternMatcher::new(pattern)?;

        let mut missing_templates = Vec::new();
        let mut unmapped = Vec::new();
        let mut missing_regions = Vec::new();
        let mut intents = Vec::new();

        let mut resolve = |group: &str, format: crate::memory::TagFormat| -> Option<String> {
            match self.mapping.resolve(group) {
                Some(region_id) => {
                    let (wire, signed) = format.wire();
                    if self.regions.find(region_id, wire, signed).is_none() {
                        missing_regions.push(format!("{}/{}", region_id, format));
                    }
                    Some(region_id.to_string())
                }
                None => {
                    unmapped.push(group.to_string());
                    None
                }
            }
        };

        for row in self.catalog.generate_patterns() {
            if !matcher.is_match(&row.pattern) {
                continue;
            }
            let templates = self.catalog.templates_for(&row.template);
            if templates.is_empty() {
                missing_templates.push(row.template.clone());
                continue;
            }
            for template in templates {
                let name = substitute_placeholder(&row.pattern, &template.suffix);
                let description = substitute_placeholder(&row.description, &template.description);
                let Some(region_id) = resolve(&row.group, template.format) else {
                    continue;
                };
                intents.push(TagIntent {
                    name,
                    description,
                    group: row.group.clone(),
                    region_id,
                    format: template.format,
                    initial_value: template.initial_value.clone(),
                    text_length: template.text_length,
                });
            }
        }

        for base in self.catalog.base_tags() {
            if !matcher.is_match(&base.name) {
                continue;
            }
            let Some(region_id) = resolve(&base.group, base.format) else {
                continue;
            };
            intents.push(TagIntent {
                name: base.name.clone(),
                description: base.description.clone(),
                group: base.group.clone(),
                region_id,
                format: base.format,
                initial_value: base.initial_value.clone(),
                text_length: base.text_length,
            });
        }

        if !missing_templates.is_empty() {
            missing_templates.sort();
            missing_templates.dedup();
            return Err(Error::TemplateNotFound {
                templates: missing_templates,
            });
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
        if intents.is_empty() {
            return Err(Error::EmptySelection {
                tag_filter: pattern.to_string(),
                scope: "the tag catalog".to_string(),
            });
        }
        Ok(intents)
    }

    /// New tag names must not collide with tags already in the export.
    fn check_new_names<'a>(&self, names: impl Iterator<Item = &'a str>) -> Result<()> {
        let mut existing: Vec<String> = names
            .filter(|name| self.snapshot.contains(name))
            .map(str::to_string)
            .collect();
        if existing.is_empty() {
            Ok(())
        } else {
            existing.sort();
            existing.dedup();
            Err(Error::TagAlreadyExists { names: existing })
        }
    }
}

/// Catalog row selector: the literal `*` selects everything, anything else
/// matches as a regex.
#[derive(Debug)]
struct PatternMatcher {
    regex: Option<Regex>,
}

impl PatternMatcher {
    fn new(pattern: &str) -> Result<Self> {
        if pattern == "*" {
            return Ok(PatternMatcher { regex: None });
        }
        let regex = Regex::new(pattern).map_err(|e| Error::bad_pattern(pattern, &e))?;
        Ok(PatternMatcher { regex: Some(regex) })
    }

    fn is_match(&self, value: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(value),
            None => true,
        }
    }
}

/// Replaces the first `*` placeholder, leaving sources without one alone.
fn substitute_placeholder(source: &str, content: &str) -> String {
    source.replacen('*', content, 1)
}
