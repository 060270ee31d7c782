//! The directive statement table (spec §4.I "Statement table").

/// Positional argument slot kinds: float, string, quoted-enum-string,
/// bare-enum-keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Float,
    Str,
    QuotedEnum,
    BareKeyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementTag {
    Identity,
    Translate,
    Scale,
    Rotate,
    LookAt,
    CoordinateSystem,
    CoordSysTransform,
    Transform,
    ConcatTransform,
    ActiveTransform,
    MakeNamedMedium,
    MediumInterface,
    Include,
    AttributeBegin,
    AttributeEnd,
    Shape,
    AreaLightSource,
    LightSource,
    Material,
    MakeNamedMaterial,
    NamedMaterial,
    ObjectBegin,
    ObjectEnd,
    ObjectInstance,
    Texture,
    TransformBegin,
    TransformEnd,
    ReverseOrientation,
    WorldEnd,
    Accelerator,
    Camera,
    Film,
    Integrator,
    PixelFilter,
    Sampler,
    TransformTimes,
    WorldBegin,
}

#[derive(Debug, Clone, Copy)]
pub struct Statement {
    pub tag: StatementTag,
    pub keyword: &'static str,
    /// Positional-argument pattern, e.g. `&[Float, Float, Float]` for
    /// `Translate x y z`.
    pub args: &'static [ArgKind],
    pub preamble_allowed: bool,
    pub world_allowed: bool,
}

/// The 40 statements named in spec §4.I, in the same order.
pub const STATEMENTS: &[Statement] = &[
    Statement { tag: StatementTag::Identity, keyword: "Identity", args: &[], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::Translate, keyword: "Translate", args: &[ArgKind::Float, ArgKind::Float, ArgKind::Float], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::Scale, keyword: "Scale", args: &[ArgKind::Float, ArgKind::Float, ArgKind::Float], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::Rotate, keyword: "Rotate", args: &[ArgKind::Float, ArgKind::Float, ArgKind::Float, ArgKind::Float], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::LookAt, keyword: "LookAt", args: &[ArgKind::Float; 9], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::CoordinateSystem, keyword: "CoordinateSystem", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::CoordSysTransform, keyword: "CoordSysTransform", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::Transform, keyword: "Transform", args: &[ArgKind::Float; 16], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::ConcatTransform, keyword: "ConcatTransform", args: &[ArgKind::Float; 16], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::ActiveTransform, keyword: "ActiveTransform", args: &[ArgKind::BareKeyword], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::MakeNamedMedium, keyword: "MakeNamedMedium", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::MediumInterface, keyword: "MediumInterface", args: &[ArgKind::Str, ArgKind::Str], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::Include, keyword: "Include", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::AttributeBegin, keyword: "AttributeBegin", args: &[], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::AttributeEnd, keyword: "AttributeEnd", args: &[], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::Shape, keyword: "Shape", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::AreaLightSource, keyword: "AreaLightSource", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::LightSource, keyword: "LightSource", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::Material, keyword: "Material", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::MakeNamedMaterial, keyword: "MakeNamedMaterial", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::NamedMaterial, keyword: "NamedMaterial", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::ObjectBegin, keyword: "ObjectBegin", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::ObjectEnd, keyword: "ObjectEnd", args: &[], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::ObjectInstance, keyword: "ObjectInstance", args: &[ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::Texture, keyword: "Texture", args: &[ArgKind::Str, ArgKind::Str, ArgKind::Str], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::TransformBegin, keyword: "TransformBegin", args: &[], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::TransformEnd, keyword: "TransformEnd", args: &[], preamble_allowed: true, world_allowed: true },
    Statement { tag: StatementTag::ReverseOrientation, keyword: "ReverseOrientation", args: &[], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::WorldEnd, keyword: "WorldEnd", args: &[], preamble_allowed: false, world_allowed: true },
    Statement { tag: StatementTag::Accelerator, keyword: "Accelerator", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: false },
    Statement { tag: StatementTag::Camera, keyword: "Camera", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: false },
    Statement { tag: StatementTag::Film, keyword: "Film", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: false },
    Statement { tag: StatementTag::Integrator, keyword: "Integrator", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: false },
    Statement { tag: StatementTag::PixelFilter, keyword: "PixelFilter", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: false },
    Statement { tag: StatementTag::Sampler, keyword: "Sampler", args: &[ArgKind::Str], preamble_allowed: true, world_allowed: false },
    Statement { tag: StatementTag::TransformTimes, keyword: "TransformTimes", args: &[ArgKind::Float, ArgKind::Float], preamble_allowed: true, world_allowed: false },
    Statement { tag: StatementTag::WorldBegin, keyword: "WorldBegin", args: &[], preamble_allowed: true, world_allowed: false },
];

/// `which_keyword`: longest-match lookup against the statement table (spec
/// §4.D). Statement keywords never share a prefix in this table so "longest
/// match" degenerates to exact match, but the lookup is still centralized
/// here rather than scattered across call sites.
pub fn find_statement(word: &str) -> Option<&'static Statement> {
    STATEMENTS.iter().find(|s| s.keyword == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_every_named_statement() {
        // spec.md enumerates 37 concrete keywords even though its prose
        // rounds the count to "40" — this asserts against the actual list.
        assert_eq!(STATEMENTS.len(), 37);
    }

    #[test]
    fn find_statement_resolves_known_keyword() {
        let s = find_statement("WorldBegin").unwrap();
        assert_eq!(s.tag, StatementTag::WorldBegin);
        assert!(s.preamble_allowed);
        assert!(!s.world_allowed);
    }

    #[test]
    fn find_statement_rejects_unknown_keyword() {
        assert!(find_statement("Frobnicate").is_none());
    }

    #[test]
    fn shape_only_allowed_in_world() {
        let s = find_statement("Shape").unwrap();
        assert!(!s.preamble_allowed);
        assert!(s.world_allowed);
    }
}
