//! Tag catalog: declarative tag intents loaded from the workbook.
//!
//! The TAGS table carries three row classes: BASE (literal tags), GENERATE
//! (pattern x template expansions) and MAP (group path to region id). The
//! TEMPLATE table carries the suffix rules GENERATE rows expand against.

pub mod workbook;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::TagFormat;

pub use workbook::Workbook;

/// A literal tag definition (CLASS = BASE).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseTag {
    /// Final tag name
    pub name: String,
    /// Tag description (may be empty)
    pub description: String,
    /// Export group path the tag belongs to
    pub group: String,
    /// Declared type
    pub format: TagFormat,
    /// Initial value cell, passed through to the export verbatim
    pub initial_value: Option<String>,
    /// Text length for TEXT tags
    pub text_length: Option<u32>,
}

/// A generator pattern (CLASS = GENERATE).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratePattern {
    /// Tag pattern with a `*` placeholder for the template suffix
    pub pattern: String,
    /// Description with a `*` placeholder for the template description
    pub description: String,
    /// Template id to expand against
    pub template: String,
    /// Export group path the expanded tags belong to
    pub group: String,
}

/// A group-to-region mapping (CLASS = MAP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Export group path, `\`-delimited
    pub group: String,
    /// Region the group allocates from
    pub region_id: String,
}

/// One suffix rule in the TEMPLATE table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Template id (several rows share one id)
    pub template: String,
    /// Suffix substituted into the tag pattern
    pub suffix: String,
    /// Description substituted into the pattern description
    pub description: String,
    /// Declared type of the expanded tag
    pub format: TagFormat,
    /// Initial value cell, passed through to the export verbatim
    pub initial_value: Option<String>,
    /// Text length for TEXT tags
    pub text_length: Option<u32>,
}

/// A row of the TAGS table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogEntry {
    /// Literal tag
    Base(BaseTag),
    /// Generator pattern
    Generate(GeneratePattern),
    /// Group mapping
    Map(MapEntry),
}

/// Many-to-one relation from export group paths to region ids.
///
/// Multiple groups may map to the same region and then share its address
/// pool.
#[derive(Debug, Clone, Default)]
pub struct GroupMapping {
    map: HashMap<String, String>,
}

impl GroupMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        GroupMapping::default()
    }

    /// Adds a group mapping; the first entry for a group wins.
    pub fn insert(&mut self, group: String, region_id: String) {
        if let Some(existing) = self.map.get(&group) {
            debug!(group = %group, kept = %existing, ignored = %region_id, "duplicate MAP entry");
            return;
        }
        self.map.insert(group, region_id);
    }

    /// Resolves a group path to its region id.
    pub fn resolve(&self, group: &str) -> Option<&str> {
        self.map.get(group).map(String::as_str)
    }

    /// Number of mapped groups.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no group is mapped.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The loaded tag catalog: TAGS rows plus the TEMPLATE table.
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    entries: Vec<CatalogEntry>,
    templates: Vec<TemplateEntry>,
}

impl TagCatalog {
    /// Creates a catalog from loaded rows.
    pub fn new(entries: Vec<CatalogEntry>, templates: Vec<TemplateEntry>) -> Self {
        TagCatalog { entries, templates }
    }

    /// Catalog integrity check: no duplicate BASE names, no duplicate
    /// GENERATE patterns.
    pub fn validate(&self) -> Result<()> {
        let dup_names = duplicates(self.base_tags().map(|t| t.name.as_str()));
        if !dup_names.is_empty() {
            return Err(Error::DuplicateTagName { names: dup_names });
        }
        let dup_patterns = duplicates(self.generate_patterns().map(|g| g.pattern.as_str()));
        if !dup_patterns.is_empty() {
            return Err(Error::DuplicatePattern {
                patterns: dup_patterns,
            });
        }
        Ok(())
    }

    /// Iterates over BASE rows.
    pub fn base_tags(&self) -> impl Iterator<Item = &BaseTag> {
        self.entries.iter().filter_map(|e| match e {
            CatalogEntry::Base(tag) => Some(tag),
            _ => None,
        })
    }

    /// Iterates over GENERATE rows.
    pub fn generate_patterns(&self) -> impl Iterator<Item = &GeneratePattern> {
        self.entries.iter().filter_map(|e| match e {
            CatalogEntry::Generate(pattern) => Some(pattern),
            _ => None,
        })
    }

    /// Iterates over MAP rows.
    pub fn map_entries(&self) -> impl Iterator<Item = &MapEntry> {
        self.entries.iter().filter_map(|e| match e {
            CatalogEntry::Map(entry) => Some(entry),
            _ => None,
        })
    }

    /// Builds the group-to-region mapping from the MAP rows.
    pub fn group_mapping(&self) -> GroupMapping {
        let mut mapping = GroupMapping::new();
        for entry in self.map_entries() {
            mapping.insert(entry.group.clone(), entry.region_id.clone());
        }
        mapping
    }

    /// All TEMPLATE rows for a template id, in table order.
    pub fn templates_for(&self, template: &str) -> Vec<&TemplateEntry> {
        self.templates
            .iter()
            .filter(|t| t.template == template)
            .collect()
    }

    /// Iterates over all TEMPLATE rows.
    pub fn templates(&self) -> impl Iterator<Item = &TemplateEntry> {
        self.templates.iter()
    }

    /// Iterates over all TAGS rows.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }
}

/// Collects values that appear more than once, preserving first-seen order.
fn duplicates<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut dups = Vec::new();
    for value in values {
        let count = seen.entry(value).or_insert(0);
        *count += 1;
        if *count == 2 {
            dups.push(value.to_string());
        }
    }
    dups
}
