//! # pbrt-scene
//!
//! A streaming parser for PBRT-v3 scene description files and the PLY mesh
//! format they reference. The parser never holds the whole input in memory:
//! scene files are read through a sliding token window with an include-file
//! stack, and PLY elements are loaded one at a time in file order.
//!
//! ## Quick start
//!
//! ```ignore
//! use pbrt_scene::{Loader, LoaderConfig};
//!
//! let loader = Loader::open("scene.pbrt", LoaderConfig::default());
//! if let Some(err) = loader.error() {
//!     eprintln!("parse stopped: {err}");
//! }
//! let scene = loader.borrow_scene();
//! println!("{} shapes, {} lights", scene.shapes.len(), scene.lights.len());
//! ```
//!
//! ## Module layout
//!
//! - [`error`] — the `PbrtError` taxonomy shared by every stage.
//! - [`numeric`] — integer/float literal scanning.
//! - [`matrix`] — 4x4 affine matrix algebra.
//! - [`spectral`] — CIE colorimetry and Samples/Blackbody/XYZ to RGB.
//! - [`tokenizer`] — the buffered token window and token recognizers.
//! - [`param_table`] — the typed per-directive parameter arena and interner.
//! - [`transform_stack`] — the dual-matrix (start/end) transform stack.
//! - [`attribute_stack`] — material/light/medium binding stack.
//! - [`scene`] — the flat, index-addressed scene graph.
//! - [`ply`] — PLY header parsing, element loading, column extraction.
//! - [`triangulate`] — ear-clip polygon triangulation.
//! - [`dispatcher`] — the directive statement table and per-directive handlers.
//! - [`loader`] — the top-level facade and ambient configuration.

pub mod attribute_stack;
pub mod dispatcher;
pub mod error;
pub mod loader;
pub mod matrix;
pub mod numeric;
pub mod param_table;
pub mod ply;
pub mod scene;
pub mod spectral;
pub mod tokenizer;
pub mod transform_stack;
pub mod triangulate;

pub use error::{PbrtError, PbrtResult};
pub use loader::{Loader, LoaderConfig, ShapeMask, TriangulationPolicy};
pub use scene::Scene;
