//! Error types for the tagforge engine

use std::fmt;

use thiserror::Error;

/// Joins a diagnostic row set into a single comma-separated payload string.
///
/// Every validation failure carries the complete offending row set, so one
/// run surfaces the whole problem class instead of the first offender.
pub(crate) fn join_rows<T: fmt::Display>(rows: &[T]) -> String {
    rows.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A tag whose calculated address collides with another tag in the same
/// address class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOffender {
    /// Tag name
    pub tag: String,
    /// Calculated address
    pub address: u32,
    /// Group path the tag belongs to
    pub group: String,
}

impl fmt::Display for AddressOffender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} in {}", self.tag, self.address, self.group)
    }
}

/// A tag whose calculated address falls outside its memory region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsOffender {
    /// Tag name
    pub tag: String,
    /// Calculated address
    pub address: u32,
    /// Region the tag was allocated into
    pub region_id: String,
    /// Region start address
    pub start: u32,
    /// Region end address
    pub end: u32,
}

impl fmt::Display for BoundsOffender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} outside {} [{}..{}]",
            self.tag, self.address, self.region_id, self.start, self.end
        )
    }
}

/// A pair of same-class memory regions with intersecting address intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConflict {
    /// First region, rendered as `MEM_ID/MEM_TYPE`
    pub left: String,
    /// First region interval (inclusive)
    pub left_span: (u32, u32),
    /// Second region, rendered as `MEM_ID/MEM_TYPE`
    pub right: String,
    /// Second region interval (inclusive)
    pub right_span: (u32, u32),
}

impl fmt::Display for RegionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}..{}] overlaps {} [{}..{}]",
            self.left,
            self.left_span.0,
            self.left_span.1,
            self.right,
            self.right_span.0,
            self.right_span.1
        )
    }
}

/// Tagforge engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Catalog and mapping errors
    /// An exported tag's group path has no MAP entry in the tag catalog
    #[error("export groups have no MAP entry in the tag catalog: {}", join_rows(.groups))]
    MissingRegionMapping {
        /// Every unmapped group path found
        groups: Vec<String>,
    },

    /// A referenced region is absent from the memory map (or its declared
    /// type does not match the tag's format/signedness)
    #[error("regions not found in the memory map: {}", join_rows(.keys))]
    RegionNotFound {
        /// Every missing `MEM_ID/MEM_TYPE` lookup key
        keys: Vec<String>,
    },

    /// A GENERATE row references a template id with no TEMPLATE entries
    #[error("templates not found in the template table: {}", join_rows(.templates))]
    TemplateNotFound {
        /// Every missing template id
        templates: Vec<String>,
    },

    /// Duplicate TAG_NAME among BASE catalog rows
    #[error("duplicate BASE tag names in the tag catalog: {}", join_rows(.names))]
    DuplicateTagName {
        /// Every duplicated name
        names: Vec<String>,
    },

    /// Duplicate TAG_PATTERN among GENERATE catalog rows
    #[error("duplicate GENERATE patterns in the tag catalog: {}", join_rows(.patterns))]
    DuplicatePattern {
        /// Every duplicated pattern
        patterns: Vec<String>,
    },

    // Validation errors
    /// Generated tag name exceeds the permitted length
    #[error("tag names longer than {limit} characters: {}", join_rows(.names))]
    TagNameTooLong {
        /// Maximum permitted length
        limit: usize,
        /// Every offending name
        names: Vec<String>,
    },

    /// Generated description exceeds the permitted length
    #[error("descriptions longer than {limit} characters for tags: {}", join_rows(.names))]
    DescriptionTooLong {
        /// Maximum permitted length
        limit: usize,
        /// Tags whose descriptions are too long
        names: Vec<String>,
    },

    /// A group path segment exceeds the permitted length
    #[error("group paths with segments longer than {limit} characters: {}", join_rows(.groups))]
    GroupSegmentTooLong {
        /// Maximum permitted segment length
        limit: usize,
        /// Every offending group path
        groups: Vec<String>,
    },

    /// Tag name contains two consecutive underscores
    #[error("tag names with consecutive underscores: {}", join_rows(.names))]
    DoubleUnderscoreInName {
        /// Every offending name
        names: Vec<String>,
    },

    /// Calculated address falls outside the target region
    #[error("addresses outside their memory region: {}", join_rows(.rows))]
    AddressOutOfRegion {
        /// Every out-of-bounds allocation
        rows: Vec<BoundsOffender>,
    },

    /// Two boolean-class tags share a calculated address
    #[error("duplicate boolean addresses: {}", join_rows(.rows))]
    DuplicateBooleanAddress {
        /// Every colliding allocation
        rows: Vec<AddressOffender>,
    },

    /// Two non-boolean tags share a calculated address
    #[error("duplicate analog addresses: {}", join_rows(.rows))]
    DuplicateAnalogAddress {
        /// Every colliding allocation
        rows: Vec<AddressOffender>,
    },

    /// Same-class memory regions have intersecting address intervals
    #[error("overlapping memory regions: {}", join_rows(.conflicts))]
    RegionOverlap {
        /// Every conflicting region pair
        conflicts: Vec<RegionConflict>,
    },

    /// A generated or cloned tag name already exists in the export snapshot
    #[error("tags already present in the export: {}", join_rows(.names))]
    TagAlreadyExists {
        /// Every colliding name
        names: Vec<String>,
    },

    /// Selection filters matched nothing
    #[error("no tags match filter '{tag_filter}' in {scope}")]
    EmptySelection {
        /// Tag name filter that was applied
        tag_filter: String,
        /// What was searched, e.g. the catalog or a set of export groups
        scope: String,
    },

    /// A caller-supplied regex failed to compile
    #[error("invalid pattern '{pattern}': {message}")]
    BadPattern {
        /// The pattern as supplied
        pattern: String,
        /// Compiler diagnostic
        message: String,
    },

    /// A cell or element holds a value outside its permitted vocabulary
    #[error("invalid {what} value '{value}'")]
    InvalidValue {
        /// What was being parsed, with row/column context where known
        what: String,
        /// The rejected value
        value: String,
    },

    // Workbook collaborator errors
    /// The workbook directory does not exist
    #[error("no such workbook directory: {path}")]
    FileNotFound {
        /// Path that was requested
        path: String,
    },

    /// A required table file is missing from the workbook
    #[error("table {tab} not found in workbook {path}")]
    TabNotFound {
        /// Table name
        tab: String,
        /// Workbook directory
        path: String,
    },

    /// A required table has no data rows
    #[error("table {tab} cannot be empty")]
    TabEmpty {
        /// Table name
        tab: String,
    },

    /// Required cells in a table are empty
    #[error("table {tab} has empty cells that must have a value: {}", join_rows(.cells))]
    EmptyCells {
        /// Table name
        tab: String,
        /// Every empty cell, rendered as `COLUMN (row N)`
        cells: Vec<String>,
    },

    // Export collaborator errors
    /// The export XML file does not exist
    #[error("no such export file: {path}")]
    SourceNotFound {
        /// Path that was requested
        path: String,
    },

    /// The export XML file is not well-formed
    #[error("malformed export file {path} at line {line}: {message}")]
    SourceMalformed {
        /// Path that was parsed
        path: String,
        /// Line where parsing failed (1-indexed)
        line: usize,
        /// Parser diagnostic
        message: String,
    },
}

impl Error {
    /// Create a `SourceMalformed` error with a message
    pub fn malformed(path: impl Into<String>, line: usize, msg: impl Into<String>) -> Self {
        Error::SourceMalformed {
            path: path.into(),
            line,
            message: msg.into(),
        }
    }

    /// Create a `BadPattern` error from a regex compile failure
    pub fn bad_pattern(pattern: impl Into<String>, err: &regex::Error) -> Self {
        Error::BadPattern {
            pattern: pattern.into(),
            message: err.to_string(),
        }
    }

    /// Short machine-readable kind name, used by the CLI error reporter
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingRegionMapping { .. } => "MissingRegionMapping",
            Error::RegionNotFound { .. } => "RegionNotFound",
            Error::TemplateNotFound { .. } => "TemplateNotFound",
            Error::DuplicateTagName { .. } => "DuplicateTagName",
            Error::DuplicatePattern { .. } => "DuplicatePattern",
            Error::TagNameTooLong { .. } => "TagNameTooLong",
            Error::DescriptionTooLong { .. } => "DescriptionTooLong",
            Error::GroupSegmentTooLong { .. } => "GroupSegmentTooLong",
            Error::DoubleUnderscoreInName { .. } => "DoubleUnderscoreInName",
            Error::AddressOutOfRegion { .. } => "AddressOutOfRegion",
            Error::DuplicateBooleanAddress { .. } => "DuplicateBooleanAddress",
            Error::DuplicateAnalogAddress { .. } => "DuplicateAnalogAddress",
            Error::RegionOverlap { .. } => "RegionOverlap",
            Error::TagAlreadyExists { .. } => "TagAlreadyExists",
            Error::EmptySelection { .. } => "EmptySelection",
            Error::BadPattern { .. } => "BadPattern",
            Error::InvalidValue { .. } => "InvalidValue",
            Error::FileNotFound { .. } => "FileNotFound",
            Error::TabNotFound { .. } => "TabNotFound",
            Error::TabEmpty { .. } => "TabEmpty",
            Error::EmptyCells { .. } => "EmptyCells",
            Error::SourceNotFound { .. } => "SourceNotFound",
            Error::SourceMalformed { .. } => "SourceMalformed",
        }
    }
}

/// Result type for tagforge operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_lists_every_offender() {
        let err = Error::TagNameTooLong {
            limit: 15,
            names: vec![
                "VERY_LONG_TAG_NAME_1".to_string(),
                "VERY_LONG_TAG_NAME_2".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("VERY_LONG_TAG_NAME_1"));
        assert!(msg.contains("VERY_LONG_TAG_NAME_2"));
    }

    #[test]
    fn test_kind_matches_variant() {
        let err = Error::TabEmpty {
            tab: "TEMPLATE".to_string(),
        };
        assert_eq!(err.kind(), "TabEmpty");
    }

    #[test]
    fn test_conflict_display() {
        let conflict = RegionConflict {
            left: "GLOBALS/UINT16".to_string(),
            left_span: (0, 99),
            right: "ALARMS/UINT16".to_string(),
            right_span: (50, 149),
        };
        assert_eq!(
            conflict.to_string(),
            "GLOBALS/UINT16 [0..99] overlaps ALARMS/UINT16 [50..149]"
        );
    }
}
