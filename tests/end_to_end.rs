//! Black-box end-to-end scenarios (spec §8 "Concrete end-to-end scenarios").

use pbrt_scene::ply::{columns, PlyFile, ScalarType};
use pbrt_scene::{Loader, LoaderConfig};

#[test]
fn minimal_scene_seeds_every_rendering_default() {
    // Scenario 1.
    let loader = Loader::open_str("WorldBegin\nWorldEnd\n", LoaderConfig::default());
    assert!(loader.error().is_none());
    let scene = loader.borrow_scene();

    assert!(scene.shapes.is_empty());

    let camera = scene.camera.as_ref().unwrap();
    assert_eq!(camera.directive_name, "perspective");
    assert!(camera.world_to_camera.start.approx_eq(&pbrt_scene::matrix::Matrix4::identity(), 1e-9));

    assert_eq!(scene.sampler.as_ref().unwrap().directive_name, "halton");
    assert_eq!(scene.filter.as_ref().unwrap().directive_name, "box");
    assert_eq!(scene.integrator.as_ref().unwrap().directive_name, "path");
    assert_eq!(scene.accelerator.as_ref().unwrap().directive_name, "bvh");

    let film = scene.film.as_ref().unwrap();
    assert_eq!(film.directive_name, "image");
    let filename = film
        .params
        .iter()
        .find(|p| p.name == "filename")
        .expect("default film has a filename param");
    match &filename.value {
        pbrt_scene::param_table::ParamValue::String(v) => assert_eq!(v[0], "pbrt.exr"),
        other => panic!("unexpected filename param value: {other:?}"),
    }
}

#[test]
fn transform_overwrites_rather_than_composes() {
    // Scenario 2: `Transform` replaces the CTM outright, discarding the
    // preceding Translate/Scale.
    let text = "Translate 1 2 3\nScale 2 2 2\nTransform [1 0 0 0  0 1 0 0  0 0 1 0  0 0 0 1]\nCamera \"perspective\"\nWorldBegin\nWorldEnd";
    let loader = Loader::open_str(text, LoaderConfig::default());
    assert!(loader.error().is_none());
    let camera = loader.borrow_scene().camera.as_ref().unwrap();
    let identity = pbrt_scene::matrix::Matrix4::identity();
    assert!(camera.world_to_camera.start.approx_eq(&identity, 1e-9));
    assert!(camera.world_to_camera.end.approx_eq(&identity, 1e-9));
}

#[test]
fn named_coordinate_system_round_trips_translation() {
    // Scenario 3. A `Camera` directive right before `WorldBegin` captures the
    // CTM restored by `CoordSysTransform`, so its inverse recovers the
    // (5,0,0) translation.
    let text = "Translate 5 0 0\nCoordinateSystem \"a\"\nIdentity\nCoordSysTransform \"a\"\nCamera \"perspective\"\nWorldBegin\nWorldEnd";
    let loader = Loader::open_str(text, LoaderConfig::default());
    assert!(loader.error().is_none());
    let camera = loader.borrow_scene().camera.as_ref().unwrap();
    let world_to_cam = camera.world_to_camera.start;
    let cam_to_world = world_to_cam.invert().unwrap();
    assert!((cam_to_world.m[0][3] - 5.0).abs() < 1e-9);
    assert!(cam_to_world.m[1][3].abs() < 1e-9);
    assert!(cam_to_world.m[2][3].abs() < 1e-9);
}

#[test]
fn include_directive_resumes_after_the_quoted_filename() {
    // Scenario 4.
    let mut inc_path = std::env::temp_dir();
    inc_path.push(format!("pbrt_scene_e2e_include_{}.pbrt", std::process::id()));
    std::fs::write(&inc_path, "").unwrap();

    let mut top_path = std::env::temp_dir();
    top_path.push(format!("pbrt_scene_e2e_top_{}.pbrt", std::process::id()));
    let top_contents = format!("Include \"{}\"\nWorldBegin\nWorldEnd\n", inc_path.display());
    std::fs::write(&top_path, &top_contents).unwrap();

    let loader = Loader::open(&top_path, LoaderConfig::default());
    assert!(loader.error().is_none(), "{:?}", loader.error());
    assert!(loader.borrow_scene().camera.is_some());

    std::fs::remove_file(&top_path).ok();
    std::fs::remove_file(&inc_path).ok();
}

#[test]
fn inline_sampled_spectrum_converts_to_a_finite_positive_rgb() {
    // Scenario 5.
    let text = "WorldBegin\nAttributeBegin\nMaterial \"matte\" \"spectrum Kd\" [400 1 700 1]\nAttributeEnd\nWorldEnd\n";
    let loader = Loader::open_str(text, LoaderConfig::default());
    assert!(loader.error().is_none(), "{:?}", loader.error());
    let scene = loader.borrow_scene();
    let material = scene.materials.last().expect("Material directive created a material entity");
    let kd = material.params.iter().find(|p| p.name == "Kd").expect("Kd param present");
    match &kd.value {
        pbrt_scene::param_table::ParamValue::Samples(pairs) => {
            let mut pairs = pairs.clone();
            let rgb = pbrt_scene::spectral::samples_to_rgb(&mut pairs);
            for c in rgb {
                assert!(c.is_finite());
                assert!(c > 0.0);
            }
            // A flat unit spectrum integrates to a near-gray triple.
            assert!((rgb[0] - rgb[1]).abs() < 0.5);
            assert!((rgb[1] - rgb[2]).abs() < 0.5);
        }
        other => panic!("Kd did not resolve to a Samples value: {other:?}"),
    }
}

#[test]
fn ply_fixed_size_little_endian_binary_round_trips() {
    // Scenario 6.
    let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n".to_vec();
    for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    let mut path = std::env::temp_dir();
    path.push(format!("pbrt_scene_e2e_ply_{}.ply", std::process::id()));
    std::fs::write(&path, &bytes).unwrap();

    let mut ply = PlyFile::open(&path).unwrap();
    let elem = ply.load_next_element().unwrap();
    let extracted = columns::extract_properties(&elem, &["x", "y", "z"], ScalarType::Float, "mesh.ply").unwrap();
    let floats: Vec<f32> = extracted.chunks(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect();
    assert_eq!(floats, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

    std::fs::remove_file(&path).ok();
}
