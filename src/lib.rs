//! # Tagforge - memory-map address allocation for tag database exports
//!
//! Tagforge reconciles tag definitions kept in a spreadsheet-style
//! workbook against an already-exported Twinsoft tag set and produces a
//! new export with correctly assigned, non-conflicting memory addresses.
//!
//! ## Pipeline
//!
//! ```text
//! Workbook + Export XML -> Usage Summarizer -> Allocator | Cloner -> Validator -> Export XML
//! ```
//!
//! ### Main Components
//!
//! - [`catalog::Workbook`] - loads the TAGS / TEMPLATE / MEMORY_MAP tables
//! - [`memory::RegionTable`] - named, typed address ranges with overlap checking
//! - [`export::ExportSnapshot`] - the already-allocated tag set, parsed from XML
//! - [`engine::UsageSummary`] - per (region, format, signedness) address usage
//! - [`Engine`] - generate and clone pipelines ending in the validation gate
//!
//! ## Quick Start
//!
//! ```rust
//! use tagforge::catalog::{CatalogEntry, GeneratePattern, MapEntry, TagCatalog, TemplateEntry};
//! use tagforge::export::ExportSnapshot;
//! use tagforge::memory::{MemoryRegion, RegionTable, TagFormat};
//! use tagforge::{Engine, EngineOptions};
//!
//! # fn main() -> tagforge::Result<()> {
//! let catalog = TagCatalog::new(
//!     vec![
//!         CatalogEntry::Generate(GeneratePattern {
//!             pattern: "P01_*".to_string(),
//!             description: "Pump 1 *".to_string(),
//!             template: "PUMP".to_string(),
//!             group: "GLOBALS".to_string(),
//!         }),
//!         CatalogEntry::Map(MapEntry {
//!             group: "GLOBALS".to_string(),
//!             region_id: "GLOBALS".to_string(),
//!         }),
//!     ],
//!     vec![TemplateEntry {
//!         template: "PUMP".to_string(),
//!         suffix: "RUN".to_string(),
//!         description: "running".to_string(),
//!         format: TagFormat::Uint16,
//!         initial_value: None,
//!         text_length: None,
//!     }],
//! );
//! let regions = RegionTable::new(vec![MemoryRegion {
//!     region_id: "GLOBALS".to_string(),
//!     format: TagFormat::Uint16,
//!     start_address: 100,
//!     length: 50,
//!     text_length: None,
//! }]);
//!
//! let engine = Engine::new(catalog, regions, ExportSnapshot::default());
//! let results = engine.generate("*", &EngineOptions::default())?;
//!
//! assert_eq!(results[0].intent.name, "P01_RUN");
//! assert_eq!(results[0].calc_address, 100);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure surfaces as one [`Error`] variant carrying the complete
//! offending row set, so a single run reports the whole problem class. The
//! engine is a hard-stop batch transform: no partial output is ever
//! written.

/// Version of the tagforge engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod catalog;
pub mod engine;
pub mod error;
pub mod export;
pub mod memory;

// Re-export main types
pub use catalog::{GroupMapping, TagCatalog, Workbook};
pub use engine::{
    AllocationResult, CloneRequest, Engine, EngineOptions, TagIntent, UsageSummary,
    ValidationOptions,
};
pub use error::{Error, Result};
pub use export::{ExportSnapshot, ExportedTag};
pub use memory::{MemoryRegion, RegionTable, TagFormat, WireFormat};
