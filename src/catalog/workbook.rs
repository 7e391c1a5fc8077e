//! Workbook loader.
//!
//! The spreadsheet collaborator is a directory of CSV tables, one file per
//! tab: `TAGS.csv`, `TEMPLATE.csv`, `MEMORY_MAP.csv`. Loading enforces the
//! tab constraints: the directory and required tables must exist, tables
//! must be non-empty, and required cells must hold a value.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::catalog::{
    BaseTag, CatalogEntry, GeneratePattern, MapEntry, TagCatalog, TemplateEntry,
};
use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, RegionTable, TagFormat};

/// TAGS table name
pub const TAGS_TABLE: &str = "TAGS";
/// TEMPLATE table name
pub const TEMPLATE_TABLE: &str = "TEMPLATE";
/// MEMORY_MAP table name
pub const MEMORY_MAP_TABLE: &str = "MEMORY_MAP";

/// A workbook directory holding the catalog and memory map tables.
#[derive(Debug, Clone)]
pub struct Workbook {
    dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagsRecord {
    #[serde(rename = "CLASS")]
    class: Option<String>,
    #[serde(rename = "TAG_NAME")]
    tag_name: Option<String>,
    #[serde(rename = "TAG_PATTERN")]
    tag_pattern: Option<String>,
    #[serde(rename = "DESCRIPTION")]
    description: Option<String>,
    #[serde(rename = "TEMPLATE")]
    template: Option<String>,
    #[serde(rename = "GROUP")]
    group: Option<String>,
    #[serde(rename = "TYPE")]
    format: Option<String>,
    #[serde(rename = "INITIAL_VALUE")]
    initial_value: Option<String>,
    #[serde(rename = "TEXT_LEN")]
    text_length: Option<String>,
    #[serde(rename = "MEM_ID")]
    region_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TemplateRecord {
    #[serde(rename = "TEMPLATE")]
    template: Option<String>,
    #[serde(rename = "SUFFIX")]
    suffix: Option<String>,
    #[serde(rename = "DESCRIPTION")]
    description: Option<String>,
    #[serde(rename = "TYPE")]
    format: Option<String>,
    #[serde(rename = "INITIAL_VALUE")]
    initial_value: Option<String>,
    #[serde(rename = "TEXT_LEN")]
    text_length: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemoryMapRecord {
    #[serde(rename = "MEM_ID")]
    region_id: Option<String>,
    #[serde(rename = "MEM_TYPE")]
    format: Option<String>,
    #[serde(rename = "START_ADDRESS")]
    start_address: Option<String>,
    #[serde(rename = "LENGTH")]
    length: Option<String>,
    #[serde(rename = "TEXT_LEN")]
    text_length: Option<String>,
}

impl Workbook {
    /// Opens a workbook directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::FileNotFound {
                path: dir.display().to_string(),
            });
        }
        Ok(Workbook { dir })
    }

    /// Workbook directory path.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Loads the TAGS and TEMPLATE tables into a catalog.
    pub fn load_catalog(&self) -> Result<TagCatalog> {
        info!(workbook = %self.dir.display(), "loading tag catalog");
        let entries = self.load_tags()?;
        let templates = self.load_templates()?;
        Ok(TagCatalog::new(entries, templates))
    }

    /// Loads the MEMORY_MAP table.
    pub fn load_regions(&self) -> Result<RegionTable> {
        info!(workbook = %self.dir.display(), "loading memory map");
        let records: Vec<MemoryMapRecord> = self.read_table(MEMORY_MAP_TABLE)?;
        if records.is_empty() {
            return Err(Error::TabEmpty {
                tab: MEMORY_MAP_TABLE.to_string(),
            });
        }

        let mut cells = CellTracker::new(MEMORY_MAP_TABLE);
        let mut regions = Vec::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            let row = i + 2;
            let region_id = cells.require(&rec.region_id, "MEM_ID", row);
            let format = cells.require(&rec.format, "MEM_TYPE", row);
            let start = cells.require(&rec.start_address, "START_ADDRESS", row);
            let length = cells.require(&rec.length, "LENGTH", row);
            let (Some(region_id), Some(format), Some(start), Some(length)) =
                (region_id, format, start, length)
            else {
                continue;
            };
            let format = parse_format(format, MEMORY_MAP_TABLE, "MEM_TYPE", row)?;
            let text_length = match (format, cell(&rec.text_length)) {
                (TagFormat::Text, Some(len)) => {
                    Some(parse_number(len, MEMORY_MAP_TABLE, "TEXT_LEN", row)?)
                }
                (TagFormat::Text, None) => {
                    cells.missing("TEXT_LEN", row);
                    continue;
                }
                (_, _) => None,
            };
            regions.push(MemoryRegion {
                region_id: region_id.to_string(),
                format,
                start_address: parse_number(start, MEMORY_MAP_TABLE, "START_ADDRESS", row)?,
                length: parse_number(length, MEMORY_MAP_TABLE, "LENGTH", row)?,
                text_length,
            });
        }
        cells.finish()?;
        Ok(RegionTable::new(regions))
    }

    fn load_tags(&self) -> Result<Vec<CatalogEntry>> {
        let records: Vec<TagsRecord> = self.read_table(TAGS_TABLE)?;
        if records.is_empty() {
            return Err(Error::TabEmpty {
                tab: TAGS_TABLE.to_string(),
            });
        }

        let mut cells = CellTracker::new(TAGS_TABLE);
        let mut entries = Vec::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            let row = i + 2;
            let Some(class) = cells.require(&rec.class, "CLASS", row) else {
                continue;
            };
            match class {
                "BASE" => {
                    let name = cells.require(&rec.tag_name, "TAG_NAME", row);
                    let group = cells.require(&rec.group, "GROUP", row);
                    let format = cells.require(&rec.format, "TYPE", row);
                    let (Some(name), Some(group), Some(format)) = (name, group, format) else {
                        continue;
                    };
                    let format = parse_format(format, TAGS_TABLE, "TYPE", row)?;
                    entries.push(CatalogEntry::Base(BaseTag {
                        name: name.to_string(),
                        description: cell(&rec.description).unwrap_or_default().to_string(),
                        group: group.to_string(),
                        format,
                        initial_value: cell(&rec.initial_value).map(str::to_string),
                        text_length: cell(&rec.text_length)
                            .map(|len| parse_number(len, TAGS_TABLE, "TEXT_LEN", row))
                            .transpose()?,
                    }));
                }
                "GENERATE" => {
                    let pattern = cells.require(&rec.tag_pattern, "TAG_PATTERN", row);
                    let template = cells.require(&rec.template, "TEMPLATE", row);
                    let group = cells.require(&rec.group, "GROUP", row);
                    let (Some(pattern), Some(template), Some(group)) = (pattern, template, group)
                    else {
                        continue;
                    };
                    entries.push(CatalogEntry::Generate(GeneratePattern {
                        pattern: pattern.to_string(),
                        description: cell(&rec.description).unwrap_or_default().to_string(),
                        template: template.to_string(),
                        group: group.to_string(),
                    }));
                }
                "MAP" => {
                    let group = cells.require(&rec.group, "GROUP", row);
                    let region_id = cells.require(&rec.region_id, "MEM_ID", row);
                    let (Some(group), Some(region_id)) = (group, region_id) else {
                        continue;
                    };
                    entries.push(CatalogEntry::Map(MapEntry {
                        group: group.to_string(),
                        region_id: region_id.to_string(),
                    }));
                }
                other => {
                    return Err(Error::InvalidValue {
                        what: format!("{}.CLASS (row {})", TAGS_TABLE, row),
                        value: other.to_string(),
                    });
                }
            }
        }
        cells.finish()?;
        Ok(entries)
    }

    fn load_templates(&self) -> Result<Vec<TemplateEntry>> {
        let records: Vec<TemplateRecord> = self.read_table(TEMPLATE_TABLE)?;
        if records.is_empty() {
            return Err(Error::TabEmpty {
                tab: TEMPLATE_TABLE.to_string(),
            });
        }

        let mut cells = CellTracker::new(TEMPLATE_TABLE);
        let mut templates = Vec::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            let row = i + 2;
            let template = cells.require(&rec.template, "TEMPLATE", row);
            let suffix = cells.require(&rec.suffix, "SUFFIX", row);
            let description = cells.require(&rec.description, "DESCRIPTION", row);
            let format = cells.require(&rec.format, "TYPE", row);
            let (Some(template), Some(suffix), Some(description), Some(format)) =
                (template, suffix, description, format)
            else {
                continue;
            };
            templates.push(TemplateEntry {
                template: template.to_string(),
                suffix: suffix.to_string(),
                description: description.to_string(),
                format: parse_format(format, TEMPLATE_TABLE, "TYPE", row)?,
                initial_value: cell(&rec.initial_value).map(str::to_string),
                text_length: cell(&rec.text_length)
                    .map(|len| parse_number(len, TEMPLATE_TABLE, "TEXT_LEN", row))
                    .transpose()?,
            });
        }
        cells.finish()?;
        Ok(templates)
    }

    fn read_table<T: DeserializeOwned>(&self, tab: &str) -> Result<Vec<T>> {
        let path = self.dir.join(format!("{}.csv", tab));
        if !path.is_file() {
            return Err(Error::TabNotFound {
                tab: tab.to_string(),
                path: self.dir.display().to_string(),
            });
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| Error::InvalidValue {
            what: format!("{} table", tab),
            value: e.to_string(),
        })?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record.map_err(|e| Error::InvalidValue {
                what: format!("{} table", tab),
                value: e.to_string(),
            })?);
        }
        Ok(rows)
    }
}

/// Accumulates empty required cells so one load reports them all.
struct CellTracker {
    tab: &'static str,
    cells: Vec<String>,
}

impl CellTracker {
    fn new(tab: &'static str) -> Self {
        CellTracker {
            tab,
            cells: Vec::new(),
        }
    }

    /// Returns the trimmed cell value, recording it as missing when empty.
    fn require<'a>(&mut self, value: &'a Option<String>, column: &str, row: usize) -> Option<&'a str> {
        match cell(value) {
            Some(v) => Some(v),
            None => {
                self.missing(column, row);
                None
            }
        }
    }

    fn missing(&mut self, column: &str, row: usize) {
        self.cells.push(format!("{} (row {})", column, row));
    }

    fn finish(self) -> Result<()> {
        if self.cells.is_empty() {
            Ok(())
        } else {
            Err(Error::EmptyCells {
                tab: self.tab.to_string(),
                cells: self.cells,
            })
        }
    }
}

/// Trims a raw cell, mapping whitespace-only content to `None`.
fn cell(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_format(value: &str, tab: &str, column: &str, row: usize) -> Result<TagFormat> {
    value.parse().map_err(|_| Error::InvalidValue {
        what: format!("{}.{} (row {})", tab, column, row),
        value: value.to_string(),
    })
}

fn parse_number(value: &str, tab: &str, column: &str, row: usize) -> Result<u32> {
    value.parse().map_err(|_| Error::InvalidValue {
        what: format!("{}.{} (row {})", tab, column, row),
        value: value.to_string(),
    })
}
