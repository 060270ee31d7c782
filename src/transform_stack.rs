//! Dual-matrix (start, end) transform stack with named coordinate systems
//! (spec §4.F, §3 "Transform frame").

use crate::error::{PbrtError, PbrtResult};
use crate::matrix::Matrix4;
use std::collections::HashMap;

pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformFrame {
    pub start: Matrix4,
    pub end: Matrix4,
}

impl TransformFrame {
    pub fn identity() -> Self {
        TransformFrame { start: Matrix4::identity(), end: Matrix4::identity() }
    }
}

/// Selects which of `(start, end)` subsequent operations apply to (spec §3
/// "Active transforms").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTransforms {
    pub start: bool,
    pub end: bool,
}

impl Default for ActiveTransforms {
    fn default() -> Self {
        ActiveTransforms { start: true, end: true }
    }
}

pub struct TransformStack {
    stack: Vec<TransformFrame>,
    current: TransformFrame,
    pub active: ActiveTransforms,
    named: HashMap<String, TransformFrame>,
}

impl TransformStack {
    pub fn new() -> Self {
        TransformStack {
            stack: Vec::new(),
            current: TransformFrame::identity(),
            active: ActiveTransforms::default(),
            named: HashMap::new(),
        }
    }

    pub fn current(&self) -> TransformFrame {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Apply `f` to whichever of (start, end) the active pair selects.
    pub fn apply(&mut self, f: impl Fn(&Matrix4) -> Matrix4) {
        if self.active.start {
            self.current.start = f(&self.current.start);
        }
        if self.active.end {
            self.current.end = f(&self.current.end);
        }
    }

    /// `Transform` directive: overwrites (does not compose with) the current
    /// frame (spec §8 scenario 2).
    pub fn set(&mut self, m: Matrix4) {
        if self.active.start {
            self.current.start = m;
        }
        if self.active.end {
            self.current.end = m;
        }
    }

    pub fn push(&mut self, filename: &str, offset: u64) -> PbrtResult<()> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(PbrtError::semantic(filename, offset, "transform stack depth exceeds maximum of 128"));
        }
        self.stack.push(self.current);
        Ok(())
    }

    pub fn pop(&mut self, filename: &str, offset: u64) -> PbrtResult<()> {
        self.current = self
            .stack
            .pop()
            .ok_or_else(|| PbrtError::semantic(filename, offset, "TransformEnd/AttributeEnd without matching Begin"))?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.current = TransformFrame::identity();
        self.active = ActiveTransforms::default();
    }

    /// `coordinate_system(name)`: snapshot the current frame under `name`,
    /// replacing any prior entry.
    pub fn coordinate_system(&mut self, name: &str) {
        self.named.insert(name.to_string(), self.current);
    }

    /// `coord_sys_transform(name)`: overwrite the current frame with the
    /// stored pair.
    pub fn coord_sys_transform(&mut self, name: &str, filename: &str, offset: u64) -> PbrtResult<()> {
        let frame = self
            .named
            .get(name)
            .copied()
            .ok_or_else(|| PbrtError::semantic(filename, offset, format!("unknown coordinate system \"{name}\"")))?;
        self.current = frame;
        Ok(())
    }
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_overwrites_rather_than_composes() {
        let mut ts = TransformStack::new();
        ts.apply(|m| m.mul(&Matrix4::translate(1.0, 2.0, 3.0)));
        ts.apply(|m| m.mul(&Matrix4::scale(2.0, 2.0, 2.0)));
        ts.set(Matrix4::identity());
        assert_eq!(ts.current().start, Matrix4::identity());
        assert_eq!(ts.current().end, Matrix4::identity());
    }

    #[test]
    fn named_coordinate_system_round_trips() {
        let mut ts = TransformStack::new();
        ts.apply(|m| m.mul(&Matrix4::translate(5.0, 0.0, 0.0)));
        ts.coordinate_system("a");
        ts.set(Matrix4::identity());
        ts.coord_sys_transform("a", "scene.pbrt", 0).unwrap();
        assert_eq!(ts.current().start.m[0][3], 5.0);
    }

    #[test]
    fn push_pop_depth_matches() {
        let mut ts = TransformStack::new();
        assert_eq!(ts.depth(), 0);
        ts.push("scene.pbrt", 0).unwrap();
        ts.push("scene.pbrt", 0).unwrap();
        assert_eq!(ts.depth(), 2);
        ts.pop("scene.pbrt", 0).unwrap();
        ts.pop("scene.pbrt", 0).unwrap();
        assert_eq!(ts.depth(), 0);
        assert!(ts.pop("scene.pbrt", 0).is_err());
    }

    #[test]
    fn depth_limit_is_128() {
        let mut ts = TransformStack::new();
        for _ in 0..MAX_DEPTH {
            ts.push("scene.pbrt", 0).unwrap();
        }
        assert!(ts.push("scene.pbrt", 0).is_err());
    }

    #[test]
    fn unknown_coordinate_system_fails() {
        let mut ts = TransformStack::new();
        assert!(ts.coord_sys_transform("nope", "scene.pbrt", 0).is_err());
    }
}
