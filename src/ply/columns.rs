//! Column extraction with type conversion (spec §4.E "Column extraction").
//!
//! Four paths, fastest first: (1) the requested properties are the entire
//! row, in order, with no conversion needed -> one memcpy of the whole fixed
//! block; (2) the requested properties are a contiguous run within the row
//! with no conversion needed -> one memcpy per row; (3) no conversion needed
//! but the columns are scattered -> per-column-per-row copy; (4) conversion
//! needed -> per-column-per-row numeric cast.

use super::header::ScalarType;
use super::reader::LoadedElement;
use crate::error::{PbrtError, PbrtResult};

/// Extract `prop_names` from every row of `elem`, converting each value to
/// `dest_type`, and return the row-major concatenated bytes
/// (`count * prop_names.len() * dest_type.size_bytes()`).
pub fn extract_properties(
    elem: &LoadedElement,
    prop_names: &[&str],
    dest_type: ScalarType,
    filename: &str,
) -> PbrtResult<Vec<u8>> {
    let mut indices = Vec::with_capacity(prop_names.len());
    for name in prop_names {
        let idx = elem
            .property_index(name)
            .ok_or_else(|| PbrtError::semantic(filename, 0, format!("PLY element has no property \"{name}\"")))?;
        if elem.fixed_offsets[idx].is_none() {
            return Err(PbrtError::semantic(filename, 0, format!("property \"{name}\" is a list, cannot extract as a column")));
        }
        indices.push(idx);
    }

    let dest_size = dest_type.size_bytes();
    let no_conversion = indices.iter().all(|&i| elem.property_types[i].is_compatible_with(dest_type));

    if no_conversion && is_whole_row_in_order(elem, &indices) {
        return Ok(elem.fixed_data.clone());
    }

    if no_conversion {
        if let Some((start, len)) = contiguous_span(elem, &indices) {
            let mut out = Vec::with_capacity(elem.count * len);
            for row in 0..elem.count {
                let row_start = row * elem.row_stride + start;
                out.extend_from_slice(&elem.fixed_data[row_start..row_start + len]);
            }
            return Ok(out);
        }
    }

    let mut out = vec![0u8; elem.count * indices.len() * dest_size];
    for row in 0..elem.count {
        for (col, &idx) in indices.iter().enumerate() {
            let src_type = elem.property_types[idx];
            let src_offset = row * elem.row_stride + elem.fixed_offsets[idx].unwrap();
            let src_size = src_type.size_bytes();
            let src_bytes = &elem.fixed_data[src_offset..src_offset + src_size];
            let dest_offset = (row * indices.len() + col) * dest_size;
            convert_scalar(src_bytes, src_type, &mut out[dest_offset..dest_offset + dest_size], dest_type);
        }
    }
    Ok(out)
}

fn is_whole_row_in_order(elem: &LoadedElement, indices: &[usize]) -> bool {
    if indices.len() != elem.fixed_offsets.iter().filter(|o| o.is_some()).count() {
        return false;
    }
    let fixed_indices: Vec<usize> = (0..elem.fixed_offsets.len()).filter(|&i| elem.fixed_offsets[i].is_some()).collect();
    indices == fixed_indices.as_slice()
}

/// If `indices` are already sorted, adjacent in the row layout, and cover a
/// single contiguous byte span, return `(start_offset, span_len)`.
fn contiguous_span(elem: &LoadedElement, indices: &[usize]) -> Option<(usize, usize)> {
    if indices.is_empty() {
        return None;
    }
    let mut offsets: Vec<(usize, usize)> = indices
        .iter()
        .map(|&i| (elem.fixed_offsets[i].unwrap(), elem.property_types[i].size_bytes()))
        .collect();
    offsets.sort_by_key(|(offset, _)| *offset);
    let first = offsets[0].0;
    let mut expect = first;
    for (offset, size) in &offsets {
        if *offset != expect {
            return None;
        }
        expect += size;
    }
    // Require the caller's requested order to already match layout order —
    // otherwise a naive memcpy would silently permute columns.
    let in_layout_order = indices
        .windows(2)
        .all(|w| elem.fixed_offsets[w[0]].unwrap() < elem.fixed_offsets[w[1]].unwrap());
    if !in_layout_order {
        return None;
    }
    Some((first, expect - first))
}

fn convert_scalar(src: &[u8], src_type: ScalarType, dest: &mut [u8], dest_type: ScalarType) {
    let value = scalar_to_f64(src, src_type);
    write_f64_as(value, dest_type, dest);
}

fn scalar_to_f64(bytes: &[u8], ty: ScalarType) -> f64 {
    match ty {
        ScalarType::Char => bytes[0] as i8 as f64,
        ScalarType::UChar => bytes[0] as f64,
        ScalarType::Short => i16::from_ne_bytes(bytes.try_into().unwrap()) as f64,
        ScalarType::UShort => u16::from_ne_bytes(bytes.try_into().unwrap()) as f64,
        ScalarType::Int => i32::from_ne_bytes(bytes.try_into().unwrap()) as f64,
        ScalarType::UInt => u32::from_ne_bytes(bytes.try_into().unwrap()) as f64,
        ScalarType::Float => f32::from_ne_bytes(bytes.try_into().unwrap()) as f64,
        ScalarType::Double => f64::from_ne_bytes(bytes.try_into().unwrap()),
    }
}

fn write_f64_as(value: f64, ty: ScalarType, dest: &mut [u8]) {
    match ty {
        ScalarType::Char => dest[0] = (value as i8) as u8,
        ScalarType::UChar => dest[0] = value as u8,
        ScalarType::Short => dest.copy_from_slice(&(value as i16).to_ne_bytes()),
        ScalarType::UShort => dest.copy_from_slice(&(value as u16).to_ne_bytes()),
        ScalarType::Int => dest.copy_from_slice(&(value as i32).to_ne_bytes()),
        ScalarType::UInt => dest.copy_from_slice(&(value as u32).to_ne_bytes()),
        ScalarType::Float => dest.copy_from_slice(&(value as f32).to_ne_bytes()),
        ScalarType::Double => dest.copy_from_slice(&value.to_ne_bytes()),
    }
}

/// When every row of a list property has the same length `k`, reshape it
/// into `1 + k` fixed scalar properties (spec §4.E "List-to-fixed
/// conversion"). Returns `None` if row lengths differ.
pub fn list_to_fixed_lengths(counts: &[u32]) -> Option<u32> {
    let first = *counts.first()?;
    if counts.iter().all(|&c| c == first) {
        Some(first)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ply::header::parse_header;
    use crate::ply::reader::load_element;
    use crate::ply::header::PlyFormat;
    use std::io::Cursor;

    fn load_xyz_element(values: &[f32]) -> LoadedElement {
        let text = "ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut header_cursor = Cursor::new(text.as_bytes());
        let (header, _) = parse_header(&mut header_cursor, "mesh.ply").unwrap();
        let mut body = Vec::new();
        for v in values {
            body.extend_from_slice(&v.to_le_bytes());
        }
        let mut cursor = Cursor::new(body);
        load_element(&mut cursor, &header.elements[0], PlyFormat::BinaryLittleEndian, "mesh.ply").unwrap()
    }

    #[test]
    fn extract_whole_row_is_identity() {
        let values = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let elem = load_xyz_element(&values);
        let out = extract_properties(&elem, &["x", "y", "z"], ScalarType::Float, "mesh.ply").unwrap();
        let floats: Vec<f32> = out.chunks(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
        assert_eq!(floats, values);
    }

    #[test]
    fn extract_subset_preserves_values() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let elem = load_xyz_element(&values);
        let out = extract_properties(&elem, &["z", "x"], ScalarType::Float, "mesh.ply").unwrap();
        let floats: Vec<f32> = out.chunks(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
        assert_eq!(floats, vec![3.0, 1.0, 6.0, 4.0]);
    }

    #[test]
    fn extract_converts_type() {
        let values = [1.0, 2.0, 3.0];
        let elem = load_xyz_element(&values);
        let out = extract_properties(&elem, &["x"], ScalarType::Double, "mesh.ply").unwrap();
        let doubles: Vec<f64> = out.chunks(8).map(|c| f64::from_ne_bytes(c.try_into().unwrap())).collect();
        assert_eq!(doubles, vec![1.0]);
    }

    #[test]
    fn unknown_property_errors() {
        let elem = load_xyz_element(&[0.0, 0.0, 0.0]);
        assert!(extract_properties(&elem, &["w"], ScalarType::Float, "mesh.ply").is_err());
    }

    #[test]
    fn list_to_fixed_detects_uniform_length() {
        assert_eq!(list_to_fixed_lengths(&[3, 3, 3]), Some(3));
        assert_eq!(list_to_fixed_lengths(&[3, 4, 3]), None);
    }
}
