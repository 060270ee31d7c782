//! Fixed- and variable-size PLY element loading (spec §4.E).
//!
//! Loaded scalars are always stored in host-native byte order, regardless of
//! the source encoding: ASCII rows are parsed straight into native bytes,
//! little-endian binary is a straight memcpy, and big-endian binary gets a
//! swap pass after the bulk read. This keeps column extraction (`columns.rs`)
//! oblivious to the original file encoding.

use super::header::{ElementDecl, PlyFormat, ScalarType};
use crate::error::{PbrtError, PbrtResult};
use std::io::{BufRead, Read};

/// One list property's out-of-band storage: concatenated values plus a
/// parallel per-row item count (spec §3 "PLY element").
#[derive(Debug, Clone)]
pub struct ListPropertyData {
    pub value_type: ScalarType,
    pub counts: Vec<u32>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct LoadedElement {
    pub name: String,
    pub count: usize,
    pub fixed_size: bool,
    pub row_stride: usize,
    /// Parallel to `ElementDecl::properties`: `Some(offset)` into
    /// `fixed_data` for scalar properties, `None` for list properties.
    pub fixed_offsets: Vec<Option<usize>>,
    pub property_names: Vec<String>,
    pub property_types: Vec<ScalarType>,
    pub fixed_data: Vec<u8>,
    /// Parallel to properties; `Some(index into list_data)` for list
    /// properties.
    pub list_indices: Vec<Option<usize>>,
    pub list_data: Vec<ListPropertyData>,
}

impl LoadedElement {
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.property_names.iter().position(|n| n == name)
    }
}

pub fn load_element<R: BufRead>(
    reader: &mut R,
    elem: &ElementDecl,
    format: PlyFormat,
    filename: &str,
) -> PbrtResult<LoadedElement> {
    let property_names = elem.properties.iter().map(|p| p.name.clone()).collect();
    let property_types = elem.properties.iter().map(|p| p.scalar_type).collect();
    let mut list_indices = vec![None; elem.properties.len()];
    let mut list_data = Vec::new();
    for (i, p) in elem.properties.iter().enumerate() {
        if p.is_list() {
            list_indices[i] = Some(list_data.len());
            list_data.push(ListPropertyData { value_type: p.scalar_type, counts: Vec::new(), bytes: Vec::new() });
        }
    }

    let fixed_data = match format {
        PlyFormat::Ascii => load_ascii(reader, elem, &mut list_data, &list_indices, filename)?,
        PlyFormat::BinaryLittleEndian => load_binary(reader, elem, &mut list_data, &list_indices, filename, false)?,
        PlyFormat::BinaryBigEndian => load_binary(reader, elem, &mut list_data, &list_indices, filename, true)?,
    };

    Ok(LoadedElement {
        name: elem.name.clone(),
        count: elem.count,
        fixed_size: elem.fixed_size,
        row_stride: elem.row_stride,
        fixed_offsets: elem.fixed_offsets.clone(),
        property_names,
        property_types,
        fixed_data,
        list_indices,
        list_data,
    })
}

fn load_ascii<R: BufRead>(
    reader: &mut R,
    elem: &ElementDecl,
    list_data: &mut [ListPropertyData],
    list_indices: &[Option<usize>],
    filename: &str,
) -> PbrtResult<Vec<u8>> {
    let mut fixed = vec![0u8; elem.count * elem.row_stride];
    for row in 0..elem.count {
        let mut line = String::new();
        let n = reader.read_line(&mut line).map_err(|e| PbrtError::io(filename, 0, e.to_string()))?;
        if n == 0 {
            return Err(PbrtError::semantic(filename, 0, format!("PLY element \"{}\" ends early", elem.name)));
        }
        let mut tokens = line.split_whitespace();
        for (i, prop) in elem.properties.iter().enumerate() {
            if let Some(count_ty) = prop.list_count_type {
                let count_tok = tokens
                    .next()
                    .ok_or_else(|| PbrtError::semantic(filename, 0, "missing list count in ascii PLY row"))?;
                let raw: i64 = count_tok
                    .parse()
                    .map_err(|_| PbrtError::semantic(filename, 0, "list count is not an integer"))?;
                // Mirror the binary path's "cast to i32" boundary rule so a
                // `uint` count of exactly 2^31 is rejected the same way
                // regardless of encoding.
                let count = match count_ty {
                    ScalarType::Int | ScalarType::UInt => (raw as u32 as i32) as i64,
                    _ => raw,
                };
                if count < 0 {
                    return Err(PbrtError::semantic(filename, 0, "PLY list count is negative"));
                }
                let list = &mut list_data[list_indices[i].unwrap()];
                list.counts.push(count as u32);
                for _ in 0..count {
                    let value_tok = tokens
                        .next()
                        .ok_or_else(|| PbrtError::semantic(filename, 0, "missing list value in ascii PLY row"))?;
                    append_ascii_scalar(&mut list.bytes, prop.scalar_type, value_tok, filename)?;
                }
            } else {
                let tok = tokens
                    .next()
                    .ok_or_else(|| PbrtError::semantic(filename, 0, "missing scalar in ascii PLY row"))?;
                let offset = row * elem.row_stride + elem.fixed_offsets[i].unwrap();
                write_ascii_scalar(&mut fixed, offset, prop.scalar_type, tok, filename)?;
            }
        }
    }
    Ok(fixed)
}

fn append_ascii_scalar(out: &mut Vec<u8>, ty: ScalarType, tok: &str, filename: &str) -> PbrtResult<()> {
    let mut tmp = vec![0u8; ty.size_bytes()];
    write_ascii_scalar(&mut tmp, 0, ty, tok, filename)?;
    out.extend_from_slice(&tmp);
    Ok(())
}

fn write_ascii_scalar(buf: &mut [u8], offset: usize, ty: ScalarType, tok: &str, filename: &str) -> PbrtResult<()> {
    let bad = || PbrtError::semantic(filename, 0, format!("cannot parse \"{tok}\" as {ty:?}"));
    match ty {
        ScalarType::Char => buf[offset] = (tok.parse::<i64>().map_err(|_| bad())? as i8) as u8,
        ScalarType::UChar => buf[offset] = tok.parse::<u8>().map_err(|_| bad())?,
        ScalarType::Short => buf[offset..offset + 2].copy_from_slice(&tok.parse::<i16>().map_err(|_| bad())?.to_ne_bytes()),
        ScalarType::UShort => buf[offset..offset + 2].copy_from_slice(&tok.parse::<u16>().map_err(|_| bad())?.to_ne_bytes()),
        ScalarType::Int => buf[offset..offset + 4].copy_from_slice(&tok.parse::<i32>().map_err(|_| bad())?.to_ne_bytes()),
        ScalarType::UInt => buf[offset..offset + 4].copy_from_slice(&tok.parse::<u32>().map_err(|_| bad())?.to_ne_bytes()),
        ScalarType::Float => buf[offset..offset + 4].copy_from_slice(&tok.parse::<f32>().map_err(|_| bad())?.to_ne_bytes()),
        ScalarType::Double => buf[offset..offset + 8].copy_from_slice(&tok.parse::<f64>().map_err(|_| bad())?.to_ne_bytes()),
    }
    Ok(())
}

fn load_binary<R: Read>(
    reader: &mut R,
    elem: &ElementDecl,
    list_data: &mut [ListPropertyData],
    list_indices: &[Option<usize>],
    filename: &str,
    big_endian: bool,
) -> PbrtResult<Vec<u8>> {
    if elem.fixed_size {
        let mut fixed = vec![0u8; elem.count * elem.row_stride];
        reader.read_exact(&mut fixed).map_err(|e| PbrtError::io(filename, 0, e.to_string()))?;
        if big_endian {
            for (i, prop) in elem.properties.iter().enumerate() {
                let offset = elem.fixed_offsets[i].unwrap();
                for row in 0..elem.count {
                    swap_in_place(&mut fixed[row * elem.row_stride + offset..][..prop.scalar_type.size_bytes()]);
                }
            }
        }
        return Ok(fixed);
    }

    let mut fixed = vec![0u8; elem.count * elem.row_stride];
    for row in 0..elem.count {
        for (i, prop) in elem.properties.iter().enumerate() {
            if let Some(count_ty) = prop.list_count_type {
                let mut count_buf = vec![0u8; count_ty.size_bytes()];
                reader.read_exact(&mut count_buf).map_err(|e| PbrtError::io(filename, 0, e.to_string()))?;
                if big_endian {
                    swap_in_place(&mut count_buf);
                }
                let count = read_count_as_i64(&count_buf, count_ty);
                if count < 0 {
                    return Err(PbrtError::semantic(filename, 0, "PLY list count is negative"));
                }
                let count = count as usize;
                let value_size = prop.scalar_type.size_bytes();
                let mut values = vec![0u8; count * value_size];
                reader.read_exact(&mut values).map_err(|e| PbrtError::io(filename, 0, e.to_string()))?;
                if big_endian {
                    for chunk in values.chunks_mut(value_size) {
                        swap_in_place(chunk);
                    }
                }
                let list = &mut list_data[list_indices[i].unwrap()];
                list.counts.push(count as u32);
                list.bytes.extend_from_slice(&values);
            } else {
                let size = prop.scalar_type.size_bytes();
                let offset = row * elem.row_stride + elem.fixed_offsets[i].unwrap();
                reader
                    .read_exact(&mut fixed[offset..offset + size])
                    .map_err(|e| PbrtError::io(filename, 0, e.to_string()))?;
                if big_endian {
                    swap_in_place(&mut fixed[offset..offset + size]);
                }
            }
        }
    }
    Ok(fixed)
}

/// Reverses a scalar's bytes in place. Built on the standard integer
/// byte-reversal primitives rather than a hand-rolled swap, so there is no
/// chance of writing to an uninitialized temporary (spec §9: one source
/// variant's 8-byte swap had exactly that bug).
fn swap_in_place(bytes: &mut [u8]) {
    match bytes.len() {
        1 => {}
        2 => {
            let v = u16::from_ne_bytes(bytes.try_into().unwrap());
            bytes.copy_from_slice(&v.swap_bytes().to_ne_bytes());
        }
        4 => {
            let v = u32::from_ne_bytes(bytes.try_into().unwrap());
            bytes.copy_from_slice(&v.swap_bytes().to_ne_bytes());
        }
        8 => {
            let v = u64::from_ne_bytes(bytes.try_into().unwrap());
            bytes.copy_from_slice(&v.swap_bytes().to_ne_bytes());
        }
        other => unreachable!("PLY scalars are 1/2/4/8 bytes, got {other}"),
    }
}

fn read_count_as_i64(bytes: &[u8], ty: ScalarType) -> i64 {
    match ty {
        ScalarType::Char => bytes[0] as i8 as i64,
        ScalarType::UChar => bytes[0] as i64,
        ScalarType::Short => i16::from_ne_bytes(bytes.try_into().unwrap()) as i64,
        ScalarType::UShort => u16::from_ne_bytes(bytes.try_into().unwrap()) as i64,
        // Both `int` and `uint` count types are widened through `i32` so a
        // count with the high bit set (e.g. exactly 2^31) reads back
        // negative and is rejected, per the "cast to i32" boundary rule —
        // `uint` is not zero-extended to a huge positive `i64`.
        ScalarType::Int | ScalarType::UInt => i32::from_ne_bytes(bytes.try_into().unwrap()) as i64,
        ScalarType::Float | ScalarType::Double => unreachable!("list counts are never floating point"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ply::header::{parse_header, PropertyDecl};
    use std::io::Cursor;

    fn vertex_element() -> ElementDecl {
        let props = vec![
            PropertyDecl { name: "x".into(), scalar_type: ScalarType::Float, list_count_type: None },
            PropertyDecl { name: "y".into(), scalar_type: ScalarType::Float, list_count_type: None },
            PropertyDecl { name: "z".into(), scalar_type: ScalarType::Float, list_count_type: None },
        ];
        // Reuse the header's layout computation via a round trip through
        // parse_header so row_stride/fixed_offsets are consistent.
        let text = "ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let (header, _) = parse_header(&mut cursor, "mesh.ply").unwrap();
        let _ = props;
        header.elements[0].clone()
    }

    #[test]
    fn loads_fixed_size_little_endian_binary() {
        let elem = vertex_element();
        let mut body: Vec<u8> = Vec::new();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            body.extend_from_slice(&v.to_le_bytes());
        }
        let mut cursor = Cursor::new(body);
        let loaded = load_element(&mut cursor, &elem, PlyFormat::BinaryLittleEndian, "mesh.ply").unwrap();
        let floats: Vec<f32> = loaded
            .fixed_data
            .chunks(4)
            .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(floats, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn big_endian_round_trips_to_same_values() {
        let elem = vertex_element();
        let mut le_body: Vec<u8> = Vec::new();
        let mut be_body: Vec<u8> = Vec::new();
        for v in [1.5f32, -2.5, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0] {
            le_body.extend_from_slice(&v.to_le_bytes());
            be_body.extend_from_slice(&v.to_be_bytes());
        }
        let mut le_cursor = Cursor::new(le_body);
        let mut be_cursor = Cursor::new(be_body);
        let le = load_element(&mut le_cursor, &elem, PlyFormat::BinaryLittleEndian, "mesh.ply").unwrap();
        let be = load_element(&mut be_cursor, &elem, PlyFormat::BinaryBigEndian, "mesh.ply").unwrap();
        assert_eq!(le.fixed_data, be.fixed_data);
    }

    #[test]
    fn loads_ascii_list_property() {
        let text = "ply\nformat ascii 1.0\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n3 0 1 2\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let (header, _) = parse_header(&mut cursor, "mesh.ply").unwrap();
        let loaded = load_element(&mut cursor, &header.elements[0], PlyFormat::Ascii, "mesh.ply").unwrap();
        assert_eq!(loaded.list_data[0].counts, vec![3]);
        let values: Vec<i32> = loaded.list_data[0]
            .bytes
            .chunks(4)
            .map(|c| i32::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn negative_list_count_is_rejected() {
        let text = "ply\nformat ascii 1.0\nelement face 1\nproperty list int int vertex_indices\nend_header\n-1\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let (header, _) = parse_header(&mut cursor, "mesh.ply").unwrap();
        assert!(load_element(&mut cursor, &header.elements[0], PlyFormat::Ascii, "mesh.ply").is_err());
    }

    #[test]
    fn uint_list_count_of_2_pow_31_is_rejected_ascii() {
        // 2^31 read back as i32 is negative, so a `uint`-typed count is
        // rejected the same as an `int`-typed one, not zero-extended.
        let text = "ply\nformat ascii 1.0\nelement face 1\nproperty list uint int vertex_indices\nend_header\n2147483648\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let (header, _) = parse_header(&mut cursor, "mesh.ply").unwrap();
        assert!(load_element(&mut cursor, &header.elements[0], PlyFormat::Ascii, "mesh.ply").is_err());
    }

    #[test]
    fn uint_list_count_of_2_pow_31_is_rejected_binary() {
        let text =
            "ply\nformat binary_little_endian 1.0\nelement face 1\nproperty list uint int vertex_indices\nend_header\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let (header, _) = parse_header(&mut cursor, "mesh.ply").unwrap();
        let mut body = 0x8000_0000u32.to_le_bytes().to_vec();
        body.extend_from_slice(&0i32.to_le_bytes()); // one (unread) value, in case the count were accepted
        let mut body_cursor = Cursor::new(body);
        assert!(load_element(&mut body_cursor, &header.elements[0], PlyFormat::BinaryLittleEndian, "mesh.ply").is_err());
    }
}
