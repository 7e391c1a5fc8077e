//! Memory map model: tag formats, typed address strides, region table.

pub mod format;
pub mod region;

pub use format::{TagFormat, WireFormat};
pub use region::{MemoryRegion, RegionTable};
