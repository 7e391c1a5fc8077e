use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declared tag type as it appears in the workbook (`TYPE` / `MEM_TYPE`
/// columns).
///
/// Signedness is baked into the variant; the export side splits it back out
/// into a [`WireFormat`] plus a signed flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagFormat {
    /// Bit-addressable boolean
    Bool,
    /// Unsigned 8-bit byte
    Uint8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    Uint16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    Uint32,
    /// 32-bit float
    Float,
    /// Fixed-length text
    Text,
}

impl TagFormat {
    /// Number of address units one value of this format consumes.
    ///
    /// Text tags consume their declared text length; a text tag with no
    /// declared length is caught during workbook loading, so the fallback
    /// stride of 1 is never reached from the pipeline.
    pub fn stride(&self, text_length: Option<u32>) -> u32 {
        match self {
            TagFormat::Bool | TagFormat::Uint8 | TagFormat::Int16 | TagFormat::Uint16 => 1,
            TagFormat::Int32 | TagFormat::Uint32 | TagFormat::Float => 2,
            TagFormat::Text => text_length.unwrap_or(1),
        }
    }

    /// Whether the format lives in the bit-addressable address class.
    ///
    /// Boolean and non-boolean address spaces are independent: the same
    /// numeric address may appear once in each class without conflict.
    pub fn is_boolean(&self) -> bool {
        matches!(self, TagFormat::Bool)
    }

    /// The export-side format element plus signedness flag.
    pub fn wire(&self) -> (WireFormat, bool) {
        match self {
            TagFormat::Bool => (WireFormat::Digital, false),
            TagFormat::Uint8 => (WireFormat::Byte, false),
            TagFormat::Int16 => (WireFormat::Bits16, true),
            TagFormat::Uint16 => (WireFormat::Bits16, false),
            TagFormat::Int32 => (WireFormat::Bits32, true),
            TagFormat::Uint32 => (WireFormat::Bits32, false),
            // Exported floats carry an empty Signed element, which parses
            // as unsigned
            TagFormat::Float => (WireFormat::Float, false),
            TagFormat::Text => (WireFormat::Text, false),
        }
    }

    /// Reconstructs the declared format from an export-side format element
    /// and signedness flag.
    pub fn from_wire(wire: WireFormat, signed: bool) -> Self {
        match (wire, signed) {
            (WireFormat::Digital, _) => TagFormat::Bool,
            (WireFormat::Byte, _) => TagFormat::Uint8,
            (WireFormat::Bits16, true) => TagFormat::Int16,
            (WireFormat::Bits16, false) => TagFormat::Uint16,
            (WireFormat::Bits32, true) => TagFormat::Int32,
            (WireFormat::Bits32, false) => TagFormat::Uint32,
            (WireFormat::Float, _) => TagFormat::Float,
            (WireFormat::Text, _) => TagFormat::Text,
        }
    }
}

impl fmt::Display for TagFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TagFormat::Bool => "BOOL",
            TagFormat::Uint8 => "UINT8",
            TagFormat::Int16 => "INT16",
            TagFormat::Uint16 => "UINT16",
            TagFormat::Int32 => "INT32",
            TagFormat::Uint32 => "UINT32",
            TagFormat::Float => "FLOAT",
            TagFormat::Text => "TEXT",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TagFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BOOL" => Ok(TagFormat::Bool),
            "UINT8" => Ok(TagFormat::Uint8),
            "INT16" => Ok(TagFormat::Int16),
            "UINT16" => Ok(TagFormat::Uint16),
            "INT32" => Ok(TagFormat::Int32),
            "UINT32" => Ok(TagFormat::Uint32),
            "FLOAT" => Ok(TagFormat::Float),
            "TEXT" => Ok(TagFormat::Text),
            other => Err(Error::InvalidValue {
                what: "TYPE".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Format element value in the Twinsoft export (`<Format>` child).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireFormat {
    /// `DIGITAL` - bit-addressable boolean
    Digital,
    /// `BYTE` - 8-bit value
    Byte,
    /// `16BITS` - 16-bit word
    Bits16,
    /// `32BITS` - 32-bit double word
    Bits32,
    /// `FLOAT` - 32-bit float
    Float,
    /// `TEXT` - fixed-length text
    Text,
}

impl WireFormat {
    /// Whether the wire format lives in the bit-addressable address class.
    pub fn is_boolean(&self) -> bool {
        matches!(self, WireFormat::Digital)
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WireFormat::Digital => "DIGITAL",
            WireFormat::Byte => "BYTE",
            WireFormat::Bits16 => "16BITS",
            WireFormat::Bits32 => "32BITS",
            WireFormat::Float => "FLOAT",
            WireFormat::Text => "TEXT",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for WireFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DIGITAL" => Ok(WireFormat::Digital),
            "BYTE" => Ok(WireFormat::Byte),
            "16BITS" => Ok(WireFormat::Bits16),
            "32BITS" => Ok(WireFormat::Bits32),
            "FLOAT" => Ok(WireFormat::Float),
            "TEXT" => Ok(WireFormat::Text),
            other => Err(Error::InvalidValue {
                what: "Format".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
