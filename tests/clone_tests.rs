//! Clone scenarios through the engine: offset shifts, substitutions,
//! destination resolution and validation of the cloned set.

use tagforge::catalog::{CatalogEntry, MapEntry, TagCatalog};
use tagforge::export::{ExportSnapshot, ExportedTag};
use tagforge::memory::{MemoryRegion, RegionTable, TagFormat, WireFormat};
use tagforge::{CloneRequest, Engine, EngineOptions, Error};

fn map_entry(group: &str, region: &str) -> CatalogEntry {
    CatalogEntry::Map(MapEntry {
        group: group.to_string(),
        region_id: region.to_string(),
    })
}

fn region(id: &str, format: TagFormat, start: u32, length: u32) -> MemoryRegion {
    MemoryRegion {
        region_id: id.to_string(),
        format,
        start_address: start,
        length,
        text_length: None,
    }
}

fn exported(name: &str, group: &str, address: u32) -> ExportedTag {
    ExportedTag {
        name: name.to_string(),
        group: group.to_string(),
        format: WireFormat::Bits16,
        signed: false,
        address,
        comment: format!("{} comment", name),
        initial_value: None,
        text_size: None,
    }
}

fn request(group_filter: &str, offset: i32, replacement: &str) -> CloneRequest {
    CloneRequest {
        tag_filter: r"^.+\d.+".to_string(),
        group_filter: group_filter.to_string(),
        replace_pattern: r"\d".to_string(),
        replacement: replacement.to_string(),
        offset,
        dest: None,
        group_find: None,
        group_replace: None,
        recurse: true,
    }
}

fn chamber_engine() -> Engine {
    let catalog = TagCatalog::new(
        vec![
            map_entry("CHAMBER 1", "CH1"),
            map_entry("CHAMBER 1\\SOFTS", "CH1"),
            map_entry("CHAMBER 2", "CH2"),
            map_entry("CHAMBER 2\\SOFTS", "CH2"),
        ],
        vec![],
    );
    let regions = RegionTable::new(vec![
        region("CH1", TagFormat::Uint16, 1000, 500),
        region("CH2", TagFormat::Uint16, 1500, 500),
    ]);
    let snapshot = ExportSnapshot::new(vec![
        exported("LT_101", "CHAMBER 1", 1000),
        exported("TI_102", "CHAMBER 1", 1001),
        exported("LT_101_SP", "CHAMBER 1\\SOFTS", 1100),
    ]);
    Engine::new(catalog, regions, snapshot)
}

#[test]
fn test_clone_shifts_and_renames() {
    let engine = chamber_engine();
    let results = engine
        .clone_tags(&request("CHAMBER 1", 500, "2"), &EngineOptions::default())
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].intent.name, "LT_201");
    assert_eq!(results[0].calc_address, 1500);
    assert_eq!(results[0].intent.group, "CHAMBER 2");
    assert_eq!(results[0].intent.region_id, "CH2");
    assert_eq!(results[0].intent.description, "LT_201 comment");

    assert_eq!(results[1].intent.name, "TI_202");
    assert_eq!(results[1].calc_address, 1501);

    // Subfolder tags follow along and keep their folder shape
    assert_eq!(results[2].intent.name, "LT_201_SP");
    assert_eq!(results[2].intent.group, "CHAMBER 2\\SOFTS");
    assert_eq!(results[2].calc_address, 1600);
}

#[test]
fn test_clone_without_recursion_leaves_subfolders() {
    let engine = chamber_engine();
    let mut req = request("CHAMBER 1", 500, "2");
    req.recurse = false;
    let results = engine.clone_tags(&req, &EngineOptions::default()).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.intent.group == "CHAMBER 2"));
}

#[test]
fn test_clone_empty_selection() {
    let engine = chamber_engine();
    let err = engine
        .clone_tags(&request("CHAMBER 9", 500, "2"), &EngineOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), "EmptySelection");
}

#[test]
fn test_clone_name_collision_with_export() {
    // Offset 0 and identity-ish replacement keep the original names, which
    // already exist in the export
    let engine = chamber_engine();
    let mut req = request("CHAMBER 1", 0, "1");
    req.replace_pattern = "1".to_string();
    let err = engine.clone_tags(&req, &EngineOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "TagAlreadyExists");
}

#[test]
fn test_clone_out_of_region_rejected_then_blind() {
    let engine = chamber_engine();
    // CH2 spans 1500..1999; offset 5000 lands far outside
    let err = engine
        .clone_tags(&request("CHAMBER 1", 5000, "2"), &EngineOptions::default())
        .unwrap_err();
    match err {
        Error::AddressOutOfRegion { rows } => assert_eq!(rows.len(), 3),
        other => panic!("expected AddressOutOfRegion, got {:?}", other),
    }

    let options = EngineOptions {
        blind_validation: true,
        ..Default::default()
    };
    let results = engine
        .clone_tags(&request("CHAMBER 1", 5000, "2"), &options)
        .unwrap();
    assert_eq!(results[0].calc_address, 6000);
}

#[test]
fn test_clone_duplicate_addresses_detected() {
    // Two source tags sharing an address in sibling groups collide once
    // both are shifted by the same offset
    let catalog = TagCatalog::new(
        vec![
            map_entry("CHAMBER 1", "CH1"),
            map_entry("LOOP 1", "CH1"),
            map_entry("CHAMBER 3", "CH1"),
            map_entry("LOOP 3", "CH1"),
        ],
        vec![],
    );
    let regions = RegionTable::new(vec![region("CH1", TagFormat::Uint16, 0, 5000)]);
    let snapshot = ExportSnapshot::new(vec![
        exported("LT_101", "CHAMBER 1", 1000),
        exported("PT_101", "LOOP 1", 1000),
    ]);
    let engine = Engine::new(catalog, regions, snapshot);

    let err = engine
        .clone_tags(&request("CHAMBER 1|LOOP 1", 500, "3"), &EngineOptions::default())
        .unwrap_err();
    match err {
        Error::DuplicateAnalogAddress { rows } => {
            assert_eq!(rows.len(), 2);
            assert!(rows.iter().all(|r| r.address == 1500));
        }
        other => panic!("expected DuplicateAnalogAddress, got {:?}", other),
    }
}

#[test]
fn test_clone_group_find_replace() {
    let engine = chamber_engine();
    let mut req = request("CHAMBER 1", 500, "2");
    req.group_find = Some("CHAMBER 1".to_string());
    req.group_replace = Some("CHAMBER 2".to_string());
    let results = engine.clone_tags(&req, &EngineOptions::default()).unwrap();
    assert_eq!(results[0].intent.group, "CHAMBER 2");
    assert_eq!(results[2].intent.group, "CHAMBER 2\\SOFTS");
}

#[test]
fn test_clone_respects_region_overlap_gate() {
    let catalog = TagCatalog::new(vec![map_entry("CHAMBER 1", "CH1")], vec![]);
    let regions = RegionTable::new(vec![
        region("CH1", TagFormat::Uint16, 0, 100),
        region("CH2", TagFormat::Uint16, 50, 100),
    ]);
    let snapshot = ExportSnapshot::new(vec![exported("LT_101", "CHAMBER 1", 10)]);
    let engine = Engine::new(catalog, regions, snapshot);

    let err = engine
        .clone_tags(&request("CHAMBER 1", 0, "2"), &EngineOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), "RegionOverlap");
}
