// Common test utilities and helpers
#![allow(dead_code)]

use std::path::PathBuf;

use sith_tools_lib::key::{load_key, Key};
use sith_tools_lib::model::{load_3do, Model3do, Model3doFileVersion};

/// Path of a file in tests/fixtures
pub fn fixture_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(filename);

    assert!(path.exists(), "Test fixture not found: {}", path.display());
    path
}

/// Three node model: torso (mesh 0) with children head (mesh 1) and tail (no mesh)
pub fn load_robot() -> (Model3do, Model3doFileVersion) {
    load_3do(fixture_path("robot.3do")).expect("Failed to load robot.3do")
}

/// Two node key animating torso and head of robot.3do
pub fn load_wave() -> Key {
    load_key(fixture_path("wave.key")).expect("Failed to load wave.key")
}

/// Print node hierarchy for debugging
pub fn print_hierarchy(model: &Model3do) {
    println!("\n=== Hierarchy of '{}' ===", model.name);
    for (i, node) in model.hierarchy.iter().enumerate() {
        let parent = if node.parent_idx < 0 {
            "ROOT".to_string()
        } else {
            format!("'{}'", model.hierarchy[node.parent_idx as usize].name)
        };
        println!(
            "[{}] '{}' (mesh={}, parent={} -> {}, child={}, sibling={})",
            i, node.name, node.mesh_idx, node.parent_idx, parent, node.first_child_idx, node.sibling_idx
        );
    }
}
