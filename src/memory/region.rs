use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, RegionConflict, Result};
use crate::memory::format::{TagFormat, WireFormat};

/// A named, typed, contiguous address range that tags are allocated into.
///
/// The upstream memory map keys its rows by (group, format), so a `MEM_ID`
/// names a family of typed ranges: identity here is `(region_id, format)`
/// and lookups always carry the format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    /// Region name (`MEM_ID` column)
    pub region_id: String,
    /// Declared type of every tag in the region (`MEM_TYPE` column)
    pub format: TagFormat,
    /// First address of the region
    pub start_address: u32,
    /// Count of addressable values in the region
    pub length: u32,
    /// Declared text length (`TEXT_LEN` column, Text regions only)
    pub text_length: Option<u32>,
}

impl MemoryRegion {
    /// Last address covered by the region (inclusive).
    ///
    /// One-unit types span `start + length - 1`; two-unit types span
    /// `start + length*2 - 2`; text regions span whole text slots.
    pub fn end_address(&self) -> u32 {
        let stride = self.format.stride(self.text_length);
        self.start_address + self.length * stride - stride
    }

    /// Whether an address falls inside `[start, end]`.
    pub fn contains(&self, address: u32) -> bool {
        address >= self.start_address && address <= self.end_address()
    }

    /// Whether the region lives in the bit-addressable class.
    pub fn is_boolean(&self) -> bool {
        self.format.is_boolean()
    }

    /// Lookup key rendered as `MEM_ID/MEM_TYPE`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.region_id, self.format)
    }
}

/// The loaded memory region table.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    regions: Vec<MemoryRegion>,
}

impl RegionTable {
    /// Creates a region table from loaded rows.
    pub fn new(regions: Vec<MemoryRegion>) -> Self {
        RegionTable { regions }
    }

    /// Finds the region a tag belongs to by the `(region_id, format,
    /// signed)` join key.
    ///
    /// Returns `None` when the id is unknown or when the region's declared
    /// type does not match the tag's wire format and signedness.
    pub fn find(&self, region_id: &str, wire: WireFormat, signed: bool) -> Option<&MemoryRegion> {
        self.regions
            .iter()
            .find(|r| r.region_id == region_id && r.format.wire() == (wire, signed))
    }

    /// Iterates over all regions in table order.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryRegion> {
        self.regions.iter()
    }

    /// Number of regions in the table.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the table holds no regions.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Memory map integrity scan, run once per invocation before any
    /// allocation.
    ///
    /// Pairwise interval-overlap check within each boolean class; bit and
    /// word address spaces are independent, so cross-class overlap is
    /// permitted. Every conflicting pair is reported, not just the first.
    pub fn check_overlaps(&self) -> Result<()> {
        let mut conflicts = Vec::new();
        for (i, a) in self.regions.iter().enumerate() {
            for b in &self.regions[i + 1..] {
                if a.is_boolean() != b.is_boolean() {
                    continue;
                }
                if a.start_address <= b.end_address() && b.start_address <= a.end_address() {
                    conflicts.push(RegionConflict {
                        left: a.key(),
                        left_span: (a.start_address, a.end_address()),
                        right: b.key(),
                        right_span: (b.start_address, b.end_address()),
                    });
                }
            }
        }
        if conflicts.is_empty() {
            debug!(regions = self.regions.len(), "memory map intervals are disjoint");
            Ok(())
        } else {
            Err(Error::RegionOverlap { conflicts })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(id: &str, format: TagFormat, start: u32, length: u32) -> MemoryRegion {
        MemoryRegion {
            region_id: id.to_string(),
            format,
            start_address: start,
            length,
            text_length: None,
        }
    }

    #[test]
    fn test_end_address_one_unit() {
        let r = region("GLOBALS", TagFormat::Uint16, 100, 50);
        assert_eq!(r.end_address(), 149);
    }

    #[test]
    fn test_end_address_two_unit() {
        let r = region("ANALOGS", TagFormat::Float, 200, 10);
        assert_eq!(r.end_address(), 218);
    }

    #[test]
    fn test_end_address_text() {
        let mut r = region("LABELS", TagFormat::Text, 500, 4);
        r.text_length = Some(8);
        assert_eq!(r.end_address(), 524);
    }

    #[test]
    fn test_contains() {
        let r = region("GLOBALS", TagFormat::Uint16, 100, 50);
        assert!(r.contains(100));
        assert!(r.contains(149));
        assert!(!r.contains(99));
        assert!(!r.contains(150));
    }

    #[test]
    fn test_find_matches_type_and_signedness() {
        let table = RegionTable::new(vec![
            region("GLOBALS", TagFormat::Uint16, 100, 50),
            region("GLOBALS", TagFormat::Int16, 200, 50),
        ]);
        let unsigned = table.find("GLOBALS", WireFormat::Bits16, false).unwrap();
        assert_eq!(unsigned.start_address, 100);
        let signed = table.find("GLOBALS", WireFormat::Bits16, true).unwrap();
        assert_eq!(signed.start_address, 200);
        assert!(table.find("GLOBALS", WireFormat::Digital, false).is_none());
        assert!(table.find("ALARMS", WireFormat::Bits16, false).is_none());
    }

    #[test]
    fn test_overlap_same_class_detected() {
        let table = RegionTable::new(vec![
            region("A", TagFormat::Bool, 0, 100),
            region("B", TagFormat::Bool, 50, 100),
        ]);
        let err = table.check_overlaps().unwrap_err();
        match err {
            Error::RegionOverlap { conflicts } => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].left, "A/BOOL");
                assert_eq!(conflicts[0].right, "B/BOOL");
            }
            other => panic!("expected RegionOverlap, got {:?}", other),
        }
    }

    #[test]
    fn test_overlap_cross_class_permitted() {
        let table = RegionTable::new(vec![
            region("BITS", TagFormat::Bool, 0, 100),
            region("WORDS", TagFormat::Uint16, 0, 100),
        ]);
        assert!(table.check_overlaps().is_ok());
    }

    #[test]
    fn test_overlap_reports_every_pair() {
        let table = RegionTable::new(vec![
            region("A", TagFormat::Uint16, 0, 100),
            region("B", TagFormat::Uint16, 50, 100),
            region("C", TagFormat::Uint16, 90, 100),
        ]);
        let err = table.check_overlaps().unwrap_err();
        match err {
            Error::RegionOverlap { conflicts } => assert_eq!(conflicts.len(), 3),
            other => panic!("expected RegionOverlap, got {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_regions_do_not_conflict() {
        let table = RegionTable::new(vec![
            region("A", TagFormat::Uint16, 0, 100),
            region("B", TagFormat::Uint16, 100, 100),
        ]);
        assert!(table.check_overlaps().is_ok());
    }
}
