//! Loader facade (spec §4.K) and ambient configuration (SPEC_FULL.md §1.3).
//!
//! `Loader` owns the whole parse: it opens the top-level file, drives the
//! dispatcher to completion or first error, and hands back whatever scene
//! state had been committed at that point. Nothing here is reentrant or
//! incremental — one `Loader` is one parse.

use crate::dispatcher::Dispatcher;
use crate::error::PbrtError;
use crate::ply::columns;
use crate::ply::{PlyFile, ScalarType};
use crate::scene::Scene;
use crate::tokenizer::{Tokenizer, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_INCLUDE_DEPTH};
use crate::triangulate;
use std::path::Path;

/// Which shapes get their face data triangulated eagerly, at load time,
/// rather than left for a caller to triangulate on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriangulationPolicy {
    /// Triangulate every shape with polygonal face data.
    All,
    /// Only `plymesh` shapes (the common case: PLY files may carry n-gons,
    /// `trianglemesh` shapes are already triangles).
    PlyOnly,
    /// Only shapes whose directive name appears in the mask.
    Shapes(ShapeMask),
}

/// A set of shape directive names (e.g. `"plymesh"`, `"trianglemesh"`)
/// eligible for eager triangulation under `TriangulationPolicy::Shapes`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShapeMask(pub Vec<String>);

impl ShapeMask {
    pub fn contains(&self, directive_name: &str) -> bool {
        self.0.iter().any(|s| s == directive_name)
    }
}

/// Ambient tokenizer/include/triangulation knobs (SPEC_FULL.md §1.3). Every
/// field has a default drawn from the tokenizer's own constants, so a caller
/// that doesn't care can just use `LoaderConfig::default()`.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    pub buffer_capacity: usize,
    pub max_include_depth: usize,
    pub triangulation: TriangulationPolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            triangulation: TriangulationPolicy::PlyOnly,
        }
    }
}

/// The result of one parse: whatever scene state the dispatcher had
/// committed, plus the first error encountered (if any). A faulting parse
/// still returns a `Loader` — `borrow_scene` reflects every directive that
/// completed before the fault (spec §4.K).
pub struct Loader {
    scene: Scene,
    error: Option<PbrtError>,
}

impl Loader {
    /// Open and parse `path` to completion or first error.
    pub fn open(path: impl AsRef<Path>, config: LoaderConfig) -> Self {
        let path = path.as_ref();
        match crate::tokenizer::TokenBuffer::open(path, config.buffer_capacity, config.max_include_depth) {
            Ok(buffer) => Self::run(Tokenizer::new(buffer), &config),
            Err(e) => {
                log::warn!("failed to open top-level scene file {}: {e}", path.display());
                Loader { scene: Scene::new(), error: Some(e) }
            }
        }
    }

    /// Parse `contents` as if it were a top-level scene file, without the
    /// caller needing to create one on disk (SPEC_FULL.md §1.4 test
    /// tooling). Writes a temp file under the same name pattern the rest of
    /// this crate's tests use, since the tokenizer only reads from a real
    /// `File`.
    pub fn open_str(contents: &str, config: LoaderConfig) -> Self {
        let mut path = std::env::temp_dir();
        path.push(format!("pbrt_scene_loader_inline_{}_{}.pbrt", std::process::id(), rand_suffix()));
        if let Err(e) = std::fs::write(&path, contents) {
            return Loader {
                scene: Scene::new(),
                error: Some(PbrtError::io(&path, 0, format!("failed to write temp scene file: {e}"))),
            };
        }
        let loader = Self::open(&path, config);
        std::fs::remove_file(&path).ok();
        loader
    }

    fn run(tz: Tokenizer, config: &LoaderConfig) -> Self {
        log::debug!("spectral curves initializing");
        let _ = crate::spectral::SpectralTables::get();
        let mut dispatcher = Dispatcher::new(tz);
        let error = dispatcher.run().err();
        if let Some(e) = &error {
            log::warn!("parse stopped: {e}");
        }
        let mut scene = dispatcher.scene;
        apply_triangulation_policy(&mut scene, &config.triangulation);
        Loader { scene, error }
    }

    /// A non-owning view of the parsed scene.
    pub fn borrow_scene(&self) -> &Scene {
        &self.scene
    }

    /// Transfers ownership of the parsed scene; the loader no longer holds it.
    pub fn take_scene(self) -> Scene {
        self.scene
    }

    pub fn error(&self) -> Option<&PbrtError> {
        self.error.as_ref()
    }
}

fn rand_suffix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos() as u64
}

/// Walk every shape eligible under `policy` and, where it names a PLY file,
/// load and triangulate its face data in place.
fn apply_triangulation_policy(scene: &mut Scene, policy: &TriangulationPolicy) {
    for shape in scene.shapes.iter_mut() {
        let eager = match policy {
            TriangulationPolicy::All => true,
            TriangulationPolicy::PlyOnly => shape.directive_name == "plymesh",
            TriangulationPolicy::Shapes(mask) => mask.contains(&shape.directive_name),
        };
        if !eager {
            continue;
        }
        // Only `plymesh` shapes name an external PLY file; every other
        // shape's `filename` lookup naturally misses and falls through.
        let Some(filename) = string_param(shape, "filename") else { continue };
        match triangulate_ply_file(&filename) {
            Ok(indices) => shape.triangulated_indices = Some(indices),
            Err(e) => log::warn!("could not eagerly triangulate {filename}: {e}"),
        }
    }
}

fn string_param(shape: &crate::scene::Shape, name: &str) -> Option<String> {
    shape.params.iter().find(|p| p.name == name).and_then(|p| match &p.value {
        crate::param_table::ParamValue::String(values) => values.first().cloned(),
        _ => None,
    })
}

/// Load `path`'s `vertex`/`face` elements and triangulate every face,
/// returning a flat index list into the vertex element (spec §4.E/§4.J).
fn triangulate_ply_file(path: &str) -> Result<Vec<u32>, PbrtError> {
    let mut ply = PlyFile::open(path)?;
    let elements = ply.load_all_elements()?;
    let filename = path.to_string();

    let vertex = elements
        .iter()
        .find(|e| e.name == "vertex")
        .ok_or_else(|| PbrtError::semantic(&filename, 0, "PLY file has no \"vertex\" element"))?;
    let face = elements
        .iter()
        .find(|e| e.name == "face")
        .ok_or_else(|| PbrtError::semantic(&filename, 0, "PLY file has no \"face\" element"))?;

    let xyz = columns::extract_properties(vertex, &["x", "y", "z"], ScalarType::Double, &filename)?;
    let positions: Vec<[f64; 3]> = xyz
        .chunks(24)
        .map(|c| {
            [
                f64::from_ne_bytes(c[0..8].try_into().unwrap()),
                f64::from_ne_bytes(c[8..16].try_into().unwrap()),
                f64::from_ne_bytes(c[16..24].try_into().unwrap()),
            ]
        })
        .collect();

    let vertex_indices_prop = face
        .property_names
        .iter()
        .find(|n| n.as_str() == "vertex_indices" || n.as_str() == "vertex_index")
        .ok_or_else(|| PbrtError::semantic(&filename, 0, "face element has no vertex_indices list property"))?;
    let rows = list_property_rows(face, vertex_indices_prop, &filename)?;

    let mut out = Vec::new();
    for row in rows {
        let tris = triangulate::triangulate(&row, |i| positions[i as usize]);
        out.extend(tris);
    }
    Ok(out)
}

/// Decode one list property's rows into `Vec<Vec<u32>>`, e.g. a PLY face
/// element's `vertex_indices`.
fn list_property_rows(
    elem: &crate::ply::LoadedElement,
    prop_name: &str,
    filename: &str,
) -> Result<Vec<Vec<u32>>, PbrtError> {
    let idx = elem
        .property_index(prop_name)
        .ok_or_else(|| PbrtError::semantic(filename, 0, format!("PLY element has no property \"{prop_name}\"")))?;
    let list_idx = elem.list_indices[idx]
        .ok_or_else(|| PbrtError::semantic(filename, 0, format!("property \"{prop_name}\" is not a list")))?;
    let list = &elem.list_data[list_idx];
    let value_size = list.value_type.size_bytes();
    let mut rows = Vec::with_capacity(list.counts.len());
    let mut byte_pos = 0usize;
    for &count in &list.counts {
        let mut row = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let bytes = &list.bytes[byte_pos..byte_pos + value_size];
            row.push(scalar_bytes_to_u32(bytes, list.value_type));
            byte_pos += value_size;
        }
        rows.push(row);
    }
    Ok(rows)
}

fn scalar_bytes_to_u32(bytes: &[u8], ty: ScalarType) -> u32 {
    match ty {
        ScalarType::Char => bytes[0] as i8 as u32,
        ScalarType::UChar => bytes[0] as u32,
        ScalarType::Short => i16::from_ne_bytes(bytes.try_into().unwrap()) as u32,
        ScalarType::UShort => u16::from_ne_bytes(bytes.try_into().unwrap()) as u32,
        ScalarType::Int => i32::from_ne_bytes(bytes.try_into().unwrap()) as u32,
        ScalarType::UInt => u32::from_ne_bytes(bytes.try_into().unwrap()),
        ScalarType::Float => f32::from_ne_bytes(bytes.try_into().unwrap()) as u32,
        ScalarType::Double => f64::from_ne_bytes(bytes.try_into().unwrap()) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_scene_parses_without_error() {
        let loader = Loader::open_str("WorldBegin\nWorldEnd\n", LoaderConfig::default());
        assert!(loader.error().is_none());
        assert!(loader.borrow_scene().camera.is_some());
    }

    #[test]
    fn syntax_error_still_yields_partial_scene() {
        let loader = Loader::open_str("WorldBegin\nBogusDirective\nWorldEnd\n", LoaderConfig::default());
        assert!(loader.error().is_some());
        // WorldBegin committed before the fault, so rendering defaults were seeded.
        assert!(loader.borrow_scene().camera.is_some());
    }

    #[test]
    fn open_missing_file_reports_io_error() {
        let loader = Loader::open("/nonexistent/path/does_not_exist.pbrt", LoaderConfig::default());
        assert!(loader.error().is_some());
        assert!(loader.borrow_scene().shapes.is_empty());
    }

    #[test]
    fn take_scene_transfers_ownership() {
        let loader = Loader::open_str("WorldBegin\nWorldEnd\n", LoaderConfig::default());
        let scene = loader.take_scene();
        assert!(scene.camera.is_some());
    }

    #[test]
    fn shape_mask_matches_named_directives() {
        let mask = ShapeMask(vec!["plymesh".to_string()]);
        assert!(mask.contains("plymesh"));
        assert!(!mask.contains("trianglemesh"));
    }

    #[test]
    fn ply_shape_gets_triangulated_indices_under_default_policy() {
        let mut ply_path = std::env::temp_dir();
        ply_path.push(format!("pbrt_scene_loader_ply_test_{}_{}.ply", std::process::id(), rand_suffix()));
        let header = "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n";
        let body = "0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n";
        std::fs::write(&ply_path, format!("{header}{body}")).unwrap();

        let scene_text = format!(
            "WorldBegin\nShape \"plymesh\" \"string filename\" [\"{}\"]\nWorldEnd\n",
            ply_path.display()
        );
        let loader = Loader::open_str(&scene_text, LoaderConfig::default());
        assert!(loader.error().is_none(), "{:?}", loader.error());
        let scene = loader.borrow_scene();
        assert_eq!(scene.shapes.len(), 1);
        let indices = scene.shapes[0].triangulated_indices.as_ref().expect("eager triangulation");
        assert_eq!(indices.len(), 6);

        std::fs::remove_file(&ply_path).ok();
    }
}
