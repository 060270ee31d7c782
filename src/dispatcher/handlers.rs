//! Per-directive handlers (spec §4.I "Per-directive flow").

use super::statements::StatementTag;
use super::{matrix_from_column_major, Dispatcher, PositionalArg};
use crate::attribute_stack::UNRESOLVED;
use crate::error::PbrtResult;
use crate::matrix::Matrix4;
use crate::param_table::ParamValue;
use crate::scene::{
    Accelerator, AreaLight, Camera, Filter, Film, Instance, Integrator, Light, Material, Medium,
    Object, ResolvedParam, Sampler, Shape, Texture,
};
use crate::transform_stack::TransformFrame;

pub fn handle(d: &mut Dispatcher, tag: StatementTag, args: &[PositionalArg]) -> PbrtResult<()> {
    match tag {
        StatementTag::Identity => d.transform.set(Matrix4::identity()),
        StatementTag::Translate => {
            let [x, y, z] = floats3(args);
            d.transform.apply(|m| m.mul(&Matrix4::translate(x, y, z)));
        }
        StatementTag::Scale => {
            let [x, y, z] = floats3(args);
            d.transform.apply(|m| m.mul(&Matrix4::scale(x, y, z)));
        }
        StatementTag::Rotate => {
            let angle = args[0].as_float().unwrap();
            let axis = [args[1].as_float().unwrap(), args[2].as_float().unwrap(), args[3].as_float().unwrap()];
            d.transform.apply(|m| m.mul(&Matrix4::rotate(angle, axis)));
        }
        StatementTag::LookAt => {
            let v: Vec<f64> = args.iter().map(|a| a.as_float().unwrap()).collect();
            let eye = [v[0], v[1], v[2]];
            let look = [v[3], v[4], v[5]];
            let up = [v[6], v[7], v[8]];
            d.transform.apply(|m| m.look_at(eye, look, up));
        }
        StatementTag::CoordinateSystem => {
            let name = args[0].as_str().unwrap();
            d.transform.coordinate_system(name);
        }
        StatementTag::CoordSysTransform => {
            let name = args[0].as_str().unwrap().to_string();
            let (filename, offset) = (d.current_filename(), d.current_offset());
            d.transform.coord_sys_transform(&name, &filename, offset)?;
        }
        StatementTag::Transform => {
            let v: Vec<f64> = args.iter().map(|a| a.as_float().unwrap()).collect();
            d.transform.set(matrix_from_column_major(&v));
        }
        StatementTag::ConcatTransform => {
            let v: Vec<f64> = args.iter().map(|a| a.as_float().unwrap()).collect();
            let m = matrix_from_column_major(&v);
            d.transform.apply(|cur| cur.mul(&m));
        }
        StatementTag::ActiveTransform => {
            let which = args[0].as_str().unwrap();
            match which {
                "StartTime" => d.transform.active = crate::transform_stack::ActiveTransforms { start: true, end: false },
                "EndTime" => d.transform.active = crate::transform_stack::ActiveTransforms { start: false, end: true },
                "All" => d.transform.active = crate::transform_stack::ActiveTransforms { start: true, end: true },
                other => return Err(d.error_at(format!("unknown ActiveTransform target \"{other}\""))),
            }
        }
        StatementTag::MakeNamedMedium => handle_make_named_medium(d, args)?,
        StatementTag::MediumInterface => handle_medium_interface(d, args)?,
        StatementTag::Include => {
            let name = args[0].as_str().unwrap().to_string();
            d.push_include(&name)?;
        }
        StatementTag::AttributeBegin => {
            let (filename, offset) = (d.current_filename(), d.current_offset());
            d.transform.push(&filename, offset)?;
            d.attributes.push();
        }
        StatementTag::AttributeEnd => {
            let (filename, offset) = (d.current_filename(), d.current_offset());
            d.transform.pop(&filename, offset)?;
            d.attributes.pop(&filename, offset)?;
        }
        StatementTag::TransformBegin => {
            let (filename, offset) = (d.current_filename(), d.current_offset());
            d.transform.push(&filename, offset)?;
        }
        StatementTag::TransformEnd => {
            let (filename, offset) = (d.current_filename(), d.current_offset());
            d.transform.pop(&filename, offset)?;
        }
        StatementTag::Shape => handle_shape(d, args[0].as_str().unwrap())?,
        StatementTag::AreaLightSource => handle_area_light(d, args[0].as_str().unwrap()),
        StatementTag::LightSource => handle_light_source(d, args[0].as_str().unwrap()),
        StatementTag::Material => handle_material(d, args[0].as_str().unwrap()),
        StatementTag::MakeNamedMaterial => handle_make_named_material(d, args[0].as_str().unwrap()),
        StatementTag::NamedMaterial => handle_named_material(d, args[0].as_str().unwrap())?,
        StatementTag::ObjectBegin => handle_object_begin(d, args[0].as_str().unwrap())?,
        StatementTag::ObjectEnd => handle_object_end(d)?,
        StatementTag::ObjectInstance => handle_object_instance(d, args[0].as_str().unwrap())?,
        StatementTag::Texture => handle_texture(d, args)?,
        StatementTag::ReverseOrientation => d.attributes.toggle_reverse_orientation(),
        StatementTag::WorldBegin => d.enter_world(),
        StatementTag::WorldEnd => d.leave_world(),
        StatementTag::Accelerator => {
            let name = args[0].as_str().unwrap().to_string();
            let params = snapshot_params(d);
            d.scene.accelerator = Some(Accelerator::new(name, params));
        }
        StatementTag::Camera => {
            let name = args[0].as_str().unwrap().to_string();
            let params = snapshot_params(d);
            // Camera's world-to-camera transform is the *inverse* of the CTM
            // in effect when Camera is declared (the CTM maps camera space
            // to world space at this point).
            let ctm = d.transform.current();
            let world_to_camera = TransformFrame {
                start: ctm.start.invert().unwrap_or_else(Matrix4::identity),
                end: ctm.end.invert().unwrap_or_else(Matrix4::identity),
            };
            d.scene.camera = Some(Camera { directive_name: name, params, world_to_camera });
        }
        StatementTag::Film => {
            let name = args[0].as_str().unwrap().to_string();
            let params = snapshot_params(d);
            d.scene.film = Some(Film::new(name, params));
        }
        StatementTag::Integrator => {
            let name = args[0].as_str().unwrap().to_string();
            let params = snapshot_params(d);
            d.scene.integrator = Some(Integrator::new(name, params));
        }
        StatementTag::PixelFilter => {
            let name = args[0].as_str().unwrap().to_string();
            let params = snapshot_params(d);
            d.scene.filter = Some(Filter::new(name, params));
        }
        StatementTag::Sampler => {
            let name = args[0].as_str().unwrap().to_string();
            let params = snapshot_params(d);
            d.scene.sampler = Some(Sampler::new(name, params));
        }
        StatementTag::TransformTimes => {
            let open = args[0].as_float().unwrap();
            let close = args[1].as_float().unwrap();
            d.scene.shutter = Some((open, close));
        }
    }
    Ok(())
}

fn floats3(args: &[PositionalArg]) -> [f64; 3] {
    [args[0].as_float().unwrap(), args[1].as_float().unwrap(), args[2].as_float().unwrap()]
}

fn snapshot_params(d: &Dispatcher) -> Vec<ResolvedParam> {
    d.params().iter().map(|info| ResolvedParam { name: info.name.clone(), value: info.value.clone() }).collect()
}

fn handle_make_named_medium(d: &mut Dispatcher, args: &[PositionalArg]) -> PbrtResult<()> {
    let name = args[0].as_str().unwrap().to_string();
    let medium_type = d
        .params()
        .find_param("type", &[crate::param_table::ParamType::String])
        .and_then(|info| match &info.value {
            ParamValue::String(v) => v.first().cloned(),
            _ => None,
        })
        .unwrap_or_else(|| "homogeneous".to_string());
    let params = snapshot_params(d);
    let idx = d.scene.mediums.len() as u32;
    d.scene.mediums.push(Medium::new(medium_type, params));
    d.register_named_medium(name, idx);
    Ok(())
}

fn handle_medium_interface(d: &mut Dispatcher, args: &[PositionalArg]) -> PbrtResult<()> {
    let inside_name = args[0].as_str().unwrap();
    let outside_name = args[1].as_str().unwrap();
    let inside = resolve_medium_name(d, inside_name)?;
    let outside = resolve_medium_name(d, outside_name)?;
    d.attributes.current_mut().inside_medium = inside;
    d.attributes.current_mut().outside_medium = outside;
    Ok(())
}

fn resolve_medium_name(d: &Dispatcher, name: &str) -> PbrtResult<u32> {
    if name.is_empty() {
        return Ok(UNRESOLVED);
    }
    d.lookup_named_medium(name)
        .ok_or_else(|| d.error_at(format!("reference to undefined medium \"{name}\"")))
}

fn handle_shape(d: &mut Dispatcher, name: &str) -> PbrtResult<()> {
    let params = snapshot_params(d);
    let material = resolve_shape_material(d, &params);
    let shape = Shape {
        directive_name: name.to_string(),
        params,
        object_to_world: d.transform.current(),
        material,
        area_light: d.attributes.current().area_light,
        reverse_orientation: d.attributes.current().reverse_orientation,
        triangulated_indices: None,
    };
    d.scene.shapes.push(shape);
    Ok(())
}

const RECOGNIZED_MATERIAL_FLOATS: &[&str] = &["roughness", "uroughness", "vroughness", "eta", "k", "index", "amount"];

/// Detect whether a shape's own parameters should fork a per-shape material
/// override (spec §4.I): any spectrum-typed parameter, any texture reference
/// other than `alpha`/`shadowalpha`, a recognized per-material float
/// parameter, or `remaproughness`.
fn is_material_override_trigger(p: &ResolvedParam) -> bool {
    match &p.value {
        ParamValue::Rgb(_) | ParamValue::Xyz(_) | ParamValue::Blackbody(_) | ParamValue::Samples(_) => true,
        ParamValue::Texture(_) => p.name != "alpha" && p.name != "shadowalpha",
        ParamValue::Float(_) => RECOGNIZED_MATERIAL_FLOATS.contains(&p.name.as_str()),
        ParamValue::Bool(_) => p.name == "remaproughness",
        _ => false,
    }
}

fn resolve_shape_material(d: &mut Dispatcher, shape_params: &[ResolvedParam]) -> u32 {
    let triggers: Vec<&ResolvedParam> = shape_params.iter().filter(|p| is_material_override_trigger(p)).collect();
    if triggers.is_empty() {
        return d.attributes.current().material;
    }

    let base_idx = d.attributes.current().material;
    let (directive_name, mut merged) = if base_idx != UNRESOLVED {
        let base = &d.scene.materials[base_idx as usize];
        (base.directive_name.clone(), base.params.clone())
    } else {
        ("matte".to_string(), Vec::new())
    };
    for p in triggers {
        if let Some(existing) = merged.iter_mut().find(|m| m.name == p.name) {
            *existing = (*p).clone();
        } else {
            merged.push((*p).clone());
        }
    }

    let idx = d.scene.materials.len() as u32;
    d.scene.materials.push(Material::new(directive_name, merged));
    idx
}

fn handle_area_light(d: &mut Dispatcher, name: &str) {
    let params = snapshot_params(d);
    let idx = d.scene.area_lights.len() as u32;
    d.scene.area_lights.push(AreaLight::new(name.to_string(), params));
    d.attributes.current_mut().area_light = idx;
}

fn handle_light_source(d: &mut Dispatcher, name: &str) {
    let params = snapshot_params(d);
    d.scene.lights.push(Light { directive_name: name.to_string(), params, light_to_world: d.transform.current() });
}

fn handle_material(d: &mut Dispatcher, name: &str) {
    if name == "none" {
        d.attributes.current_mut().material = UNRESOLVED;
        return;
    }
    d.interner.intern(name);
    let params = snapshot_params(d);
    let idx = d.scene.materials.len() as u32;
    d.scene.materials.push(Material::new(name.to_string(), params));
    d.attributes.current_mut().material = idx;
}

fn handle_make_named_material(d: &mut Dispatcher, name: &str) {
    let material_type = d
        .params()
        .find_param("type", &[crate::param_table::ParamType::String])
        .and_then(|info| match &info.value {
            ParamValue::String(v) => v.first().cloned(),
            _ => None,
        })
        .unwrap_or_else(|| "matte".to_string());
    d.interner.intern(name);
    d.interner.intern(&material_type);
    let params = snapshot_params(d);
    let idx = d.scene.materials.len() as u32;
    d.scene.materials.push(Material::new(material_type, params));
    d.attributes.declare_named_material(name, idx);
}

fn handle_named_material(d: &mut Dispatcher, name: &str) -> PbrtResult<()> {
    let idx = d
        .attributes
        .lookup_named_material(name)
        .ok_or_else(|| d.error_at(format!("reference to undefined named material \"{name}\"")))?;
    d.attributes.current_mut().material = idx;
    Ok(())
}

fn handle_object_begin(d: &mut Dispatcher, name: &str) -> PbrtResult<()> {
    if d.active_object().is_some() {
        return Err(d.error_at("ObjectBegin cannot be nested inside another ObjectBegin"));
    }
    d.interner.intern(name);
    let (filename, offset) = (d.current_filename(), d.current_offset());
    d.transform.push(&filename, offset)?;
    d.attributes.push();
    let object = Object {
        name: name.to_string(),
        first_shape: d.scene.shapes.len() as u32,
        num_shapes: 0,
        object_to_instance: d.transform.current(),
    };
    let idx = d.scene.objects.len();
    d.scene.objects.push(object);
    d.set_active_object(Some(idx));
    Ok(())
}

fn handle_object_end(d: &mut Dispatcher) -> PbrtResult<()> {
    let Some(idx) = d.active_object() else {
        return Err(d.error_at("ObjectEnd without matching ObjectBegin"));
    };
    let first_shape = d.scene.objects[idx].first_shape;
    d.scene.objects[idx].num_shapes = d.scene.shapes.len() as u32 - first_shape;
    let (filename, offset) = (d.current_filename(), d.current_offset());
    d.transform.pop(&filename, offset)?;
    d.attributes.pop(&filename, offset)?;
    d.set_active_object(None);
    Ok(())
}

fn handle_object_instance(d: &mut Dispatcher, name: &str) -> PbrtResult<()> {
    if d.active_object().is_some() {
        return Err(d.error_at("ObjectInstance is not allowed while defining an object"));
    }
    let object_index = d
        .scene
        .find_object_by_name(name)
        .ok_or_else(|| d.error_at(format!("reference to undefined object \"{name}\"")))?;
    let instance = Instance {
        object_index,
        instance_to_world: d.transform.current(),
        material: d.attributes.current().material,
        reverse_orientation: d.attributes.current().reverse_orientation,
    };
    d.scene.instances.push(instance);
    Ok(())
}

fn handle_texture(d: &mut Dispatcher, args: &[PositionalArg]) -> PbrtResult<()> {
    let name = args[0].as_str().unwrap().to_string();
    let value_kind = args[1].as_str().unwrap();
    let class = args[2].as_str().unwrap().to_string();
    d.interner.intern(&name);
    d.interner.intern(&class);
    let params = snapshot_params(d);
    let idx = d.scene.textures.len() as u32;
    d.scene.textures.push(Texture::new(class, params));
    if value_kind == "float" {
        d.attributes.declare_float_texture(&name, idx);
    } else {
        d.attributes.declare_spectrum_texture(&name, idx);
    }
    Ok(())
}

/// Seed the rendering-configuration defaults pbrt uses when a directive was
/// never given in the preamble (spec §4.I "phase transition").
pub(crate) fn seed_rendering_defaults(d: &mut Dispatcher) {
    if d.scene.camera.is_none() {
        d.scene.camera = Some(Camera {
            directive_name: "perspective".to_string(),
            params: Vec::new(),
            world_to_camera: TransformFrame::identity(),
        });
    }
    if d.scene.sampler.is_none() {
        d.scene.sampler = Some(Sampler::new("halton", Vec::new()));
    }
    if d.scene.film.is_none() {
        d.scene.film = Some(Film::new(
            "image",
            vec![ResolvedParam { name: "filename".to_string(), value: ParamValue::String(vec!["pbrt.exr".to_string()]) }],
        ));
    }
    if d.scene.filter.is_none() {
        d.scene.filter = Some(Filter::new("box", Vec::new()));
    }
    if d.scene.integrator.is_none() {
        d.scene.integrator = Some(Integrator::new("path", Vec::new()));
    }
    if d.scene.accelerator.is_none() {
        d.scene.accelerator = Some(Accelerator::new("bvh", Vec::new()));
    }
}
