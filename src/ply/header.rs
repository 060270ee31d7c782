//! PLY header grammar (spec §4.E "Header", §6 "PLY file format").

use crate::error::{PbrtError, PbrtResult};
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Float,
    Double,
}

impl ScalarType {
    pub fn size_bytes(self) -> usize {
        match self {
            ScalarType::Char | ScalarType::UChar => 1,
            ScalarType::Short | ScalarType::UShort => 2,
            ScalarType::Int | ScalarType::UInt | ScalarType::Float => 4,
            ScalarType::Double => 8,
        }
    }

    /// Resolve a PLY type keyword including the `intN`/`uintN`/`floatN`
    /// aliases (spec §6).
    pub fn from_name(name: &str) -> Option<ScalarType> {
        Some(match name {
            "char" | "int8" => ScalarType::Char,
            "uchar" | "uint8" => ScalarType::UChar,
            "short" | "int16" => ScalarType::Short,
            "ushort" | "uint16" => ScalarType::UShort,
            "int" | "int32" => ScalarType::Int,
            "uint" | "uint32" => ScalarType::UInt,
            "float" | "float32" => ScalarType::Float,
            "double" | "float64" => ScalarType::Double,
            _ => return None,
        })
    }

    /// Two types are compatible (no conversion needed) iff equal, or the
    /// same-size signed/unsigned integer pair (spec §4.E "Column
    /// extraction").
    pub fn is_compatible_with(self, other: ScalarType) -> bool {
        if self == other {
            return true;
        }
        use ScalarType::*;
        matches!(
            (self, other),
            (Char, UChar) | (UChar, Char) | (Short, UShort) | (UShort, Short) | (Int, UInt) | (UInt, Int)
        )
    }
}

#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: String,
    /// For list properties: the value type. For scalar properties: the
    /// scalar type.
    pub scalar_type: ScalarType,
    /// `Some(count_type)` for list properties, `None` for scalar properties.
    pub list_count_type: Option<ScalarType>,
}

impl PropertyDecl {
    pub fn is_list(&self) -> bool {
        self.list_count_type.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: String,
    pub count: usize,
    pub properties: Vec<PropertyDecl>,
    pub fixed_size: bool,
    pub row_stride: usize,
    /// Byte offset of each property within the fixed row; `None` for list
    /// properties, which live out-of-band (spec §4.E "Layout computation").
    pub fixed_offsets: Vec<Option<usize>>,
}

impl ElementDecl {
    fn new(name: String, count: usize, properties: Vec<PropertyDecl>) -> Self {
        let fixed_size = properties.iter().all(|p| !p.is_list());
        let mut offsets = Vec::with_capacity(properties.len());
        let mut stride = 0usize;
        for p in &properties {
            if p.is_list() {
                offsets.push(None);
            } else {
                offsets.push(Some(stride));
                stride += p.scalar_type.size_bytes();
            }
        }
        ElementDecl { name, count, properties, fixed_size, row_stride: stride, fixed_offsets: offsets }
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub version: (u32, u32),
    pub elements: Vec<ElementDecl>,
}

/// Parse the PLY header from `reader`, consuming exactly through the
/// `end_header\n` terminator. Returns the header and the number of bytes
/// consumed (for diagnostics).
pub fn parse_header<R: BufRead>(reader: &mut R, filename: &str) -> PbrtResult<(PlyHeader, u64)> {
    let mut consumed: u64 = 0;
    let mut read_line = |reader: &mut R| -> PbrtResult<String> {
        let mut line = String::new();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| PbrtError::io(filename, consumed, e.to_string()))?;
        if n == 0 {
            return Err(PbrtError::semantic(filename, consumed, "PLY file ends before end_header"));
        }
        consumed += n as u64;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    };

    let magic = read_line(reader)?;
    if magic.trim() != "ply" {
        return Err(PbrtError::semantic(filename, 0, "PLY file does not start with magic \"ply\""));
    }

    let mut format = None;
    let mut version = (1, 0);
    let mut elements: Vec<ElementDecl> = Vec::new();

    loop {
        let line = read_line(reader)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let keyword = tokens.next().unwrap_or("");
        match keyword {
            "comment" | "obj_info" => continue,
            "format" => {
                let kind = tokens
                    .next()
                    .ok_or_else(|| PbrtError::semantic(filename, consumed, "format line missing encoding"))?;
                format = Some(match kind {
                    "ascii" => PlyFormat::Ascii,
                    "binary_little_endian" => PlyFormat::BinaryLittleEndian,
                    "binary_big_endian" => PlyFormat::BinaryBigEndian,
                    other => {
                        return Err(PbrtError::semantic(filename, consumed, format!("unknown PLY format \"{other}\"")))
                    }
                });
                let ver = tokens.next().unwrap_or("1.0");
                version = parse_version(ver).unwrap_or((1, 0));
            }
            "element" => {
                let name = tokens
                    .next()
                    .ok_or_else(|| PbrtError::semantic(filename, consumed, "element line missing name"))?
                    .to_string();
                let count: usize = tokens
                    .next()
                    .ok_or_else(|| PbrtError::semantic(filename, consumed, "element line missing count"))?
                    .parse()
                    .map_err(|_| PbrtError::semantic(filename, consumed, "element count is not a valid integer"))?;
                elements.push(ElementDecl::new(name, count, Vec::new()));
            }
            "property" => {
                let last = elements.last_mut().ok_or_else(|| {
                    PbrtError::semantic(filename, consumed, "property declared before any element")
                })?;
                if tokens.clone().next() == Some("list") {
                    tokens.next();
                    let count_ty = tokens
                        .next()
                        .and_then(ScalarType::from_name)
                        .ok_or_else(|| PbrtError::semantic(filename, consumed, "unknown list count type"))?;
                    let value_ty = tokens
                        .next()
                        .and_then(ScalarType::from_name)
                        .ok_or_else(|| PbrtError::semantic(filename, consumed, "unknown list value type"))?;
                    let name = tokens
                        .next()
                        .ok_or_else(|| PbrtError::semantic(filename, consumed, "list property missing name"))?
                        .to_string();
                    last.properties.push(PropertyDecl { name, scalar_type: value_ty, list_count_type: Some(count_ty) });
                } else {
                    let ty = tokens
                        .next()
                        .and_then(ScalarType::from_name)
                        .ok_or_else(|| PbrtError::semantic(filename, consumed, "unknown scalar property type"))?;
                    let name = tokens
                        .next()
                        .ok_or_else(|| PbrtError::semantic(filename, consumed, "scalar property missing name"))?
                        .to_string();
                    last.properties.push(PropertyDecl { name, scalar_type: ty, list_count_type: None });
                }
                // Recompute layout now that a property was appended.
                let recomputed = ElementDecl::new(
                    std::mem::take(&mut last.name),
                    last.count,
                    std::mem::take(&mut last.properties),
                );
                *last = recomputed;
            }
            "end_header" => break,
            other => {
                return Err(PbrtError::semantic(filename, consumed, format!("unrecognized PLY header line \"{other}\"")))
            }
        }
    }

    let format = format.ok_or_else(|| PbrtError::semantic(filename, consumed, "PLY header missing format line"))?;
    Ok((PlyHeader { format, version, elements }, consumed))
}

fn parse_version(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_simple_ascii_header() {
        let text = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let (header, consumed) = parse_header(&mut cursor, "mesh.ply").unwrap();
        assert_eq!(header.format, PlyFormat::Ascii);
        assert_eq!(header.elements.len(), 1);
        assert_eq!(header.elements[0].count, 3);
        assert_eq!(header.elements[0].row_stride, 12);
        assert!(header.elements[0].fixed_size);
        assert_eq!(consumed as usize, text.len());
    }

    #[test]
    fn parses_list_property_and_skips_comments() {
        let text = "ply\ncomment made by test\nformat binary_little_endian 1.0\nelement face 2\nproperty list uchar int vertex_indices\nend_header\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let (header, _) = parse_header(&mut cursor, "mesh.ply").unwrap();
        assert_eq!(header.format, PlyFormat::BinaryLittleEndian);
        let elem = &header.elements[0];
        assert!(!elem.fixed_size);
        assert_eq!(elem.properties[0].list_count_type, Some(ScalarType::UChar));
        assert_eq!(elem.properties[0].scalar_type, ScalarType::Int);
    }

    #[test]
    fn rejects_missing_magic() {
        let mut cursor = Cursor::new(b"not_ply\n".as_slice());
        assert!(parse_header(&mut cursor, "mesh.ply").is_err());
    }

    #[test]
    fn scalar_type_aliases_and_compatibility() {
        assert_eq!(ScalarType::from_name("uint8"), Some(ScalarType::UChar));
        assert!(ScalarType::Int.is_compatible_with(ScalarType::UInt));
        assert!(!ScalarType::Int.is_compatible_with(ScalarType::Float));
    }
}
