// KEY animation tests: fixture parsing, re-serialization, and building a key
// against the hierarchy of a loaded model.

use sith_tools_lib::key::{
    parse_key, write_key, Channel, KeyBuilder, KeyFlag, KeyMarkerType, KeyframeFlag, NodeTrack,
};
use sith_tools_lib::model::Mesh3doNodeType;
use sith_tools_lib::validation::validate_key;

#[path = "common/mod.rs"]
mod common;

#[test]
fn fixture_loads_completely() {
    let key = common::load_wave();

    assert_eq!(key.name, "wave.key");
    assert_eq!(key.flags, KeyFlag::NO_LOOP);
    assert!(!key.is_looping());
    assert_eq!(key.node_types, Mesh3doNodeType::from_bits_retain(1));
    assert_eq!(key.num_frames, 20);
    assert_eq!(key.fps, 15.0);
    assert_eq!(key.num_joints, 3);

    // Code 12 has no marker type and falls back to a plain marker
    assert_eq!(key.markers.len(), 2);
    assert_eq!(key.markers[0].marker_type, KeyMarkerType::LeftFootstep);
    assert_eq!(key.markers[1].marker_type, KeyMarkerType::Marker);
    assert_eq!(key.markers[1].frame, 19.0);

    let head = key.node_by_name("HEAD").expect("head node");
    assert_eq!(head.idx, 1);
    assert_eq!(head.keyframes.len(), 3);
    assert_eq!(head.keyframes[1].frame, 10);
    assert_eq!(head.keyframes[1].flags, KeyframeFlag::OrientationChange);
    assert_eq!(head.keyframes[1].orientation.y, 30.0);
    assert_eq!(head.keyframes[1].delta_rotation.y, -3.0);
    assert_eq!(head.keyframes[2].flags, KeyframeFlag::NoChange);
}

#[test]
fn reformat_is_lossless() {
    let key = common::load_wave();

    let mut buf = Vec::new();
    write_key(&key, &mut buf, "Keyframe 'wave.key'").expect("Failed to write KEY");
    let text = String::from_utf8(buf).expect("KEY output is not UTF-8");

    let reloaded = parse_key("wave.key", &text).expect("Failed to parse written KEY");
    assert_eq!(reloaded, key);

    // Unknown marker codes are written back as plain markers
    assert!(text.contains("19.000000 0"));
}

#[test]
fn fixture_validates_against_its_model() {
    let key = common::load_wave();
    let (model, _) = common::load_robot();

    let report = validate_key(&key, Some(&model));
    for item in &report.items {
        println!("{}", item);
    }
    assert!(report.is_valid());
    assert_eq!(report.warning_count, 0);
}

#[test]
fn built_key_matches_model_hierarchy() {
    let (model, _) = common::load_robot();
    common::print_hierarchy(&model);

    let tail = NodeTrack::new("Tail")
        .sample(Channel::Location, 0, 0, 0.5)
        .sample(Channel::Location, 0, 8, 0.9);
    let torso = NodeTrack::new("torso")
        .sample_all(Channel::Orientation, 0, &[0.0, 0.0, 0.0])
        .sample_all(Channel::Orientation, 4, &[0.0, 40.0, 0.0]);
    let ghost = NodeTrack::new("ghost").sample(Channel::Location, 2, 0, 1.0);

    let mut builder = KeyBuilder::new("swing.key").expect("builder").fps(30.0);
    builder.add_track(tail);
    builder.add_track(torso);
    builder.add_track(ghost);
    assert!(builder.add_marker(8.0, "left_footstep"));
    let key = builder.build(&model).expect("build key");

    assert_eq!(key.num_joints, 3);
    assert_eq!(key.num_frames, 9);
    assert_eq!(key.markers[0].marker_type, KeyMarkerType::LeftFootstep);

    // Nodes come out in depth-first hierarchy order; "ghost" is not in the model
    let names: Vec<&str> = key.nodes.iter().map(|n| n.mesh_name.as_str()).collect();
    assert_eq!(names, vec!["torso", "tail"]);
    assert_eq!(key.nodes[1].idx, 2);

    let torso = &key.nodes[0];
    assert_eq!(torso.keyframes[0].flags, KeyframeFlag::OrientationChange);
    assert!((torso.keyframes[0].delta_rotation.y - 10.0).abs() < 1e-5);

    let tail = &key.nodes[1];
    assert_eq!(tail.keyframes[0].flags, KeyframeFlag::PositionChange);
    assert!((tail.keyframes[0].delta_position.x - 0.05).abs() < 1e-6);

    let report = validate_key(&key, Some(&model));
    assert!(report.is_valid());
}
