//! Encoder for the Twinsoft tag export document.
//!
//! Emits the full element shape the import side expects for every approved
//! allocation. The output file is only written after validation passes, so
//! a failed run never leaves a partial export behind.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::engine::AllocationResult;
use crate::error::{Error, Result};
use crate::export::xml::encode_entities;
use crate::memory::WireFormat;

/// Encodes an approved allocation set as an export document.
pub fn encode(results: &[AllocationResult]) -> String {
    let mut doc = String::from("<TWinSoftTags>\n");
    for result in results {
        encode_tag(&mut doc, result);
    }
    doc.push_str("</TWinSoftTags>");
    doc
}

/// Encodes and writes an approved allocation set to a file.
pub fn write_file(path: impl AsRef<Path>, results: &[AllocationResult]) -> Result<()> {
    let path = path.as_ref();
    let doc = encode(results);
    fs::write(path, doc)
        .map_err(|e| Error::malformed(path.display().to_string(), 0, e.to_string()))?;
    info!(file = %path.display(), tags = results.len(), "export written");
    Ok(())
}

fn encode_tag(doc: &mut String, result: &AllocationResult) {
    let intent = &result.intent;
    let (wire, signed) = intent.wire();
    let name = encode_entities(&intent.name);
    let digital = wire == WireFormat::Digital;

    let _ = writeln!(doc, "<Tag Name=\"{}\">", name);
    let _ = writeln!(doc, "<NewName>{}</NewName>", name);
    doc.push_str("<Address />\n");
    let _ = writeln!(doc, "<Format>{}</Format>", wire);
    let _ = writeln!(doc, "<ModbusAddress>{}</ModbusAddress>", result.calc_address);
    let _ = writeln!(doc, "<Comment>{}</Comment>", encode_entities(&intent.description));
    match &intent.initial_value {
        Some(value) => {
            let _ = writeln!(doc, "<InitalValue>{}</InitalValue>", encode_entities(value));
        }
        None => doc.push_str("<InitalValue />\n"),
    }
    if digital {
        doc.push_str("<Signed />\n");
    } else {
        let _ = writeln!(doc, "<Signed>{}</Signed>", if signed { "True" } else { "False" });
    }
    match intent.text_length {
        Some(len) if wire == WireFormat::Text => {
            let _ = writeln!(doc, "<TextTagSize>{}</TextTagSize>", len);
        }
        _ => doc.push_str("<TextTagSize />\n"),
    }
    if digital {
        doc.push_str("<Minimum />\n<Maximum />\n<Resolution />\n");
    } else {
        doc.push_str("<Minimum>0</Minimum>\n<Maximum>1000</Maximum>\n<Resolution />\n");
    }
    let _ = writeln!(doc, "<Group>{}</Group>", encode_entities(&intent.group));
    doc.push_str(
        "<Presentation Description=\"\" StateOn=\"\" StateOff=\"\" Units=\"\" NbrDecimals=\"\">False</Presentation>\n",
    );
    doc.push_str(
        "<WriteAllowed WriteAllowed_Minimum=\"\" WriteAllowed_Maximum=\"\">False</WriteAllowed>\n",
    );
    doc.push_str("<DisplayFormat>DECIMAL</DisplayFormat>\n");
    doc.push_str("</Tag>\n");
}
