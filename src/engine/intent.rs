use serde::{Deserialize, Serialize};

use crate::memory::{TagFormat, WireFormat};

/// A tag to be materialized, with its target region resolved.
///
/// Produced by a BASE row, a GENERATE pattern expansion or a clone
/// transform; bound to a concrete address by the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagIntent {
    /// Final tag name
    pub name: String,
    /// Tag description, written to the export comment
    pub description: String,
    /// Export group path the tag is created under
    pub group: String,
    /// Region the tag allocates from (resolved via the group mapping)
    pub region_id: String,
    /// Declared type
    pub format: TagFormat,
    /// Initial value, passed through to the export verbatim
    pub initial_value: Option<String>,
    /// Text length for TEXT tags
    pub text_length: Option<u32>,
}

impl TagIntent {
    /// Export-side format element and signedness.
    pub fn wire(&self) -> (WireFormat, bool) {
        self.format.wire()
    }
}

/// A tag intent bound to a calculated address.
///
/// Created by the allocator or cloner, rejected or approved by the
/// validator, and finally consumed by the export encoder; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// The materialized intent
    pub intent: TagIntent,
    /// Assigned address
    pub calc_address: u32,
}

impl AllocationResult {
    /// Binds an intent to its calculated address.
    pub fn new(intent: TagIntent, calc_address: u32) -> Self {
        AllocationResult {
            intent,
            calc_address,
        }
    }
}
