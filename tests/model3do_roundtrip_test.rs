// Round-trip tests: 3DO text -> Model3do -> 3DO text
// Every supported format version must reproduce the loaded model.

use sith_tools_lib::math::Vector4f;
use sith_tools_lib::model::{
    load_3do, parse_3do, save_3do, write_3do, GeometryMode, LightMode, Model3doFileVersion,
    TextureMode,
};

#[path = "common/mod.rs"]
mod common;

#[test]
fn fixture_loads_completely() {
    let (model, version) = common::load_robot();

    assert_eq!(version, Model3doFileVersion::Version2_1);
    assert_eq!(model.name, "robot.3do");
    assert_eq!(model.materials, vec!["body.mat", "head.mat"]);
    assert_eq!(model.radius, 1.5);
    assert_eq!(model.geosets.len(), 1);

    let meshes = &model.geosets[0].meshes;
    assert_eq!(meshes.len(), 2);
    assert_eq!(meshes[0].name, "torso");
    assert_eq!(meshes[0].geometry_mode, GeometryMode::Texture);
    assert_eq!(meshes[0].light_mode, LightMode::Gouraud);
    assert_eq!(meshes[0].texture_mode, TextureMode::Affine);
    assert_eq!(meshes[0].vertices.len(), 3);
    assert_eq!(meshes[0].uvs[1].x, 64.0);

    // 2.1 stores a single intensity per vertex
    assert_eq!(meshes[0].vertex_colors[2], Vector4f::new(0.5, 0.5, 0.5, 1.0));

    let quad = &meshes[1].faces[0];
    assert_eq!(quad.material_idx, 1);
    assert_eq!(quad.vertex_idxs, vec![0, 1, 2, 3]);
    assert_eq!(quad.uv_idxs, vec![0, 1, 2, 3]);
    assert_eq!(quad.color, Vector4f::new(0.25, 0.25, 0.25, 1.0));

    assert_eq!(model.hierarchy.len(), 3);
    assert_eq!(model.hierarchy[1].rotation.y, 90.0);
    assert_eq!(model.hierarchy[2].mesh_idx, -1);
}

#[test]
fn roundtrip_every_version() {
    let (model, _) = common::load_robot();

    for version in [
        Model3doFileVersion::Version2_1,
        Model3doFileVersion::Version2_2,
        Model3doFileVersion::Version2_3,
    ] {
        println!("Round-tripping robot.3do as {}", version.as_str());

        let mut buf = Vec::new();
        write_3do(&model, &mut buf, version, "roundtrip").expect("Failed to write 3DO");
        let text = String::from_utf8(buf).expect("3DO output is not UTF-8");
        assert!(text.contains(&format!("3DO {}", version.as_str())));

        let (reloaded, reloaded_version) =
            parse_3do("robot.3do", &text).expect("Failed to parse written 3DO");
        assert_eq!(reloaded_version, version);
        assert_eq!(reloaded, model, "model changed after {} round trip", version.as_str());
    }
}

#[test]
fn rewrite_is_stable() {
    let (model, _) = common::load_robot();
    let dir = tempfile::tempdir().expect("tempdir");
    let first = dir.path().join("first.3do");
    let second = dir.path().join("second.3do");

    save_3do(&model, &first, Model3doFileVersion::Version2_3, "robot").expect("save first");
    let (reloaded, _) = load_3do(&first).expect("load first");
    save_3do(&reloaded, &second, Model3doFileVersion::Version2_3, "robot").expect("save second");

    let a = std::fs::read_to_string(&first).expect("read first");
    let b = std::fs::read_to_string(&second).expect("read second");
    assert_eq!(a, b);
}

#[test]
fn header_section_snapshot() {
    let (model, _) = common::load_robot();
    let mut buf = Vec::new();
    write_3do(&model, &mut buf, Model3doFileVersion::Version2_1, "3DO model 'robot.3do'")
        .expect("write");
    let text = String::from_utf8(buf).expect("utf8");
    let head: String = text.lines().take(15).collect::<Vec<_>>().join("\n");

    insta::assert_snapshot!(head, @r"
    # 3DO model 'robot.3do'

    ###############
    SECTION: HEADER

    3DO 2.1

    ###############
    SECTION: MODELRESOURCE

    # Materials list
    MATERIALS 2

             0:       body.mat
             1:       head.mat
    ");
}
