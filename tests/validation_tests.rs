//! Error taxonomy through the full generate pipeline: every failed check
//! aborts the run and names the complete offending row set.

use tagforge::catalog::{CatalogEntry, GeneratePattern, MapEntry, TagCatalog, TemplateEntry};
use tagforge::export::{ExportSnapshot, ExportedTag};
use tagforge::memory::{MemoryRegion, RegionTable, TagFormat, WireFormat};
use tagforge::{Engine, EngineOptions, Error};

fn map_entry(group: &str, region: &str) -> CatalogEntry {
    CatalogEntry::Map(MapEntry {
        group: group.to_string(),
        region_id: region.to_string(),
    })
}

fn generate_row(pattern: &str, template: &str, group: &str) -> CatalogEntry {
    CatalogEntry::Generate(GeneratePattern {
        pattern: pattern.to_string(),
        description: "tag *".to_string(),
        template: template.to_string(),
        group: group.to_string(),
    })
}

fn template(id: &str, suffix: &str, format: TagFormat) -> TemplateEntry {
    TemplateEntry {
        template: id.to_string(),
        suffix: suffix.to_string(),
        description: suffix.to_lowercase(),
        format,
        initial_value: None,
        text_length: None,
    }
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
        comment: String::new(),
        initial_value: None,
        text_size: None,
    }
}

#[test]
fn test_overlong_generated_name_lists_exact_name() {
    // Pattern plus suffix lands at 16 characters
    let catalog = TagCatalog::new(
        vec![
            generate_row("LONGPREFIX_*", "ONE", "GLOBALS"),
            map_entry("GLOBALS", "GLOBALS"),
        ],
        vec![template("ONE", "VWXYZ", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    match err {
        Error::TagNameTooLong { limit, names } => {
            assert_eq!(limit, 15);
            assert_eq!(names, vec!["LONGPREFIX_VWXYZ".to_string()]);
            assert_eq!(names[0].len(), 16);
        }
        other => panic!("expected TagNameTooLong, got {:?}", other),
    }
}

#[test]
fn test_template_not_found() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "MISSING", "GLOBALS"),
            map_entry("GLOBALS", "GLOBALS"),
        ],
        vec![template("OTHER", "A", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    assert_eq!(
        err,
        Error::TemplateNotFound {
            templates: vec!["MISSING".to_string()]
        }
    );
}

#[test]
fn test_group_without_map_entry() {
    let catalog = TagCatalog::new(
        vec![generate_row("GT_*", "ONE", "ORPHAN GROUP")],
        vec![template("ONE", "A", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    assert_eq!(
        err,
        Error::MissingRegionMapping {
            groups: vec!["ORPHAN GROUP".to_string()]
        }
    );
}

#[test]
fn test_mapped_region_missing_from_table() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "ONE", "GLOBALS"),
            map_entry("GLOBALS", "NOWHERE"),
        ],
        vec![template("ONE", "A", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    assert_eq!(
        err,
        Error::RegionNotFound {
            keys: vec!["NOWHERE/UINT16".to_string()]
        }
    );
}

#[test]
fn test_generated_name_already_in_export() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "ONE", "GLOBALS"),
            map_entry("GLOBALS", "GLOBALS"),
        ],
        vec![template("ONE", "A", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let snapshot = ExportSnapshot::new(vec![exported("GT_A", "GLOBALS", 120)]);
    let engine = Engine::new(catalog, regions, snapshot);

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    assert_eq!(
        err,
        Error::TagAlreadyExists {
            names: vec!["GT_A".to_string()]
        }
    );
}

#[test]
fn test_duplicate_base_names_abort_before_allocation() {
    use tagforge::catalog::BaseTag;
    let base = |name: &str| {
        CatalogEntry::Base(BaseTag {
            name: name.to_string(),
            description: String::new(),
            group: "GLOBALS".to_string(),
            format: TagFormat::Uint16,
            initial_value: None,
            text_length: None,
        })
    };
    let catalog = TagCatalog::new(
        vec![base("WD"), base("WD"), map_entry("GLOBALS", "GLOBALS")],
        vec![template("ONE", "A", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "DuplicateTagName");
}

#[test]
fn test_region_overlap_aborts_run() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "ONE", "GLOBALS"),
            map_entry("GLOBALS", "A"),
        ],
        vec![template("ONE", "X", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![
        region("A", TagFormat::Uint16, 0, 100),
        region("B", TagFormat::Uint16, 50, 100),
    ]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "RegionOverlap");
}

#[test]
fn test_region_overlap_suppressed_by_ignore_map_errors() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "ONE", "GLOBALS"),
            map_entry("GLOBALS", "A"),
        ],
        vec![template("ONE", "X", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![
        region("A", TagFormat::Uint16, 0, 100),
        region("B", TagFormat::Uint16, 50, 100),
    ]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let options = EngineOptions {
        ignore_map_errors: true,
        ..Default::default()
    };
    let results = engine.generate("*", &options).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_region_exhaustion_detected() {
    // Region holds 2 values; third intent lands outside and is rejected
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "TRIO", "GLOBALS"),
            map_entry("GLOBALS", "GLOBALS"),
        ],
        vec![
            template("TRIO", "A", TagFormat::Uint16),
            template("TRIO", "B", TagFormat::Uint16),
            template("TRIO", "C", TagFormat::Uint16),
        ],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 2)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    match err {
        Error::AddressOutOfRegion { rows } => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].tag, "GT_C");
            assert_eq!(rows[0].address, 102);
        }
        other => panic!("expected AddressOutOfRegion, got {:?}", other),
    }
}

#[test]
fn test_blind_validation_accepts_exhausted_region() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "TRIO", "GLOBALS"),
            map_entry("GLOBALS", "GLOBALS"),
        ],
        vec![
            template("TRIO", "A", TagFormat::Uint16),
            template("TRIO", "B", TagFormat::Uint16),
            template("TRIO", "C", TagFormat::Uint16),
        ],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 2)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let options = EngineOptions {
        blind_validation: true,
        ..Default::default()
    };
    let results = engine.generate("*", &options).unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn test_unmapped_export_group_errors_without_relaxation() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "ONE", "GLOBALS"),
            map_entry("GLOBALS", "GLOBALS"),
        ],
        vec![template("ONE", "A", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let snapshot = ExportSnapshot::new(vec![exported("ROOT_TAG", "", 10)]);
    let engine = Engine::new(catalog, regions, snapshot);

    let err = engine.generate("*", &EngineOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "MissingRegionMapping");

    let options = EngineOptions {
        allow_unmapped: true,
        ..Default::default()
    };
    let results = engine.generate("*", &options).unwrap();
    assert_eq!(results[0].calc_address, 100);
}

#[test]
fn test_no_catalog_row_matches_pattern() {
    let catalog = TagCatalog::new(
        vec![
            generate_row("GT_*", "ONE", "GLOBALS"),
            map_entry("GLOBALS", "GLOBALS"),
        ],
        vec![template("ONE", "A", TagFormat::Uint16)],
    );
    let regions = RegionTable::new(vec![region("GLOBALS", TagFormat::Uint16, 100, 50)]);
    let engine = Engine::new(catalog, regions, ExportSnapshot::default());

    let err = engine.generate("^NOPE.+", &EngineOptions::default()).unwrap_err();
    assert_eq!(err.kind(), "EmptySelection");
}
