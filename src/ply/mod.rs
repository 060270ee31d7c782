//! PLY mesh reader: header, element loading, column extraction (spec §4.E).

pub mod columns;
pub mod header;
pub mod reader;

pub use header::{ElementDecl, PlyFormat, PlyHeader, PropertyDecl, ScalarType};
pub use reader::LoadedElement;

use crate::error::{PbrtError, PbrtResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const PLY_BUFFER_CAPACITY: usize = 128 * 1024;

/// A PLY file opened for sequential element loading. Elements must be loaded
/// in file order (spec §5: "property-extraction results always correspond
/// to the element most recently loaded") — there is no random access into
/// the binary data section.
pub struct PlyFile {
    filename: PathBuf,
    header: PlyHeader,
    reader: BufReader<File>,
    next_element: usize,
}

impl PlyFile {
    pub fn open(path: impl AsRef<Path>) -> PbrtResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PbrtError::io(path, 0, format!("failed to open {}: {e}", path.display())))?;
        let mut reader = BufReader::with_capacity(PLY_BUFFER_CAPACITY, file);
        let (header, _consumed) = header::parse_header(&mut reader, &path.display().to_string())?;
        Ok(PlyFile { filename: path.to_path_buf(), header, reader, next_element: 0 })
    }

    pub fn header(&self) -> &PlyHeader {
        &self.header
    }

    /// Load the next element declared in the header, in file order.
    pub fn load_next_element(&mut self) -> PbrtResult<LoadedElement> {
        let filename = self.filename.display().to_string();
        let decl = self
            .header
            .elements
            .get(self.next_element)
            .ok_or_else(|| PbrtError::semantic(&filename, 0, "no more PLY elements to load"))?
            .clone();
        let loaded = reader::load_element(&mut self.reader, &decl, self.header.format, &filename)?;
        self.next_element += 1;
        Ok(loaded)
    }

    /// Load every element declared in the header, in order.
    pub fn load_all_elements(&mut self) -> PbrtResult<Vec<LoadedElement>> {
        let mut out = Vec::with_capacity(self.header.elements.len());
        while self.next_element < self.header.elements.len() {
            out.push(self.load_next_element()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("pbrt_scene_ply_test_{}_{}.ply", std::process::id(), rand_suffix()));
        let mut f = File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos() as u64
    }

    #[test]
    fn loads_fixed_size_le_binary_vertex_element() {
        // Spec §8 scenario 6.
        let header = b"ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        let mut bytes = header.to_vec();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let path = write_temp(&bytes);
        let mut ply = PlyFile::open(&path).unwrap();
        let elem = ply.load_next_element().unwrap();
        let extracted = columns::extract_properties(&elem, &["x", "y", "z"], ScalarType::Float, "mesh.ply").unwrap();
        let floats: Vec<f32> = extracted.chunks(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
        assert_eq!(floats, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn load_past_last_element_errors() {
        let header = b"ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nend_header\n";
        let path = write_temp(header);
        let mut ply = PlyFile::open(&path).unwrap();
        ply.load_next_element().unwrap();
        assert!(ply.load_next_element().is_err());
        std::fs::remove_file(path).ok();
    }
}
