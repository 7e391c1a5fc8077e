//! Export snapshot: the already-allocated tag set as seen in the Twinsoft
//! tag export XML, plus the reader and writer for that format.

pub mod reader;
pub mod writer;
pub mod xml;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::memory::WireFormat;

/// A tag already present in the export.
///
/// Immutable input to the current run: never mutated, only read to compute
/// prior address usage and to source clone operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedTag {
    /// Tag name (`Name` attribute)
    pub name: String,
    /// Group path, `\`-delimited; empty for root tags
    pub group: String,
    /// Export format element
    pub format: WireFormat,
    /// Signedness flag (`Signed` element; empty parses as false)
    pub signed: bool,
    /// Modbus address
    pub address: u32,
    /// Comment element
    pub comment: String,
    /// Initial value element; empty element means no initial value
    pub initial_value: Option<String>,
    /// Text tag size for TEXT tags
    pub text_size: Option<u32>,
}

/// The parsed export snapshot with a name index.
#[derive(Debug, Clone, Default)]
pub struct ExportSnapshot {
    tags: Vec<ExportedTag>,
    names: HashSet<String>,
}

impl ExportSnapshot {
    /// Creates a snapshot from parsed tags.
    pub fn new(tags: Vec<ExportedTag>) -> Self {
        let names = tags.iter().map(|t| t.name.clone()).collect();
        ExportSnapshot { tags, names }
    }

    /// Loads and parses an export XML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();
        info!(file = %label, "loading export snapshot");
        let source = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::SourceNotFound { path: label.clone() }
            } else {
                Error::malformed(label.clone(), 0, e.to_string())
            }
        })?;
        Self::parse(&source, &label)
    }

    /// Parses export XML text; `label` names the source in diagnostics.
    pub fn parse(source: &str, label: &str) -> Result<Self> {
        let tags = reader::parse_snapshot(source, label)?;
        info!(tags = tags.len(), "export snapshot loaded");
        Ok(Self::new(tags))
    }

    /// Whether a tag with this name already exists in the export.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Iterates over tags in document order.
    pub fn iter(&self) -> impl Iterator<Item = &ExportedTag> {
        self.tags.iter()
    }

    /// Number of tags in the snapshot.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the snapshot holds no tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
