//! Structural checks for loaded or constructed assets.

pub mod autofix;
pub mod limits;
pub mod report;
pub mod rules;

pub use report::{ValidationCategory, ValidationItem, ValidationReport, ValidationSeverity};
pub use rules::assert_name;

use crate::key::Key;
use crate::model::Model3do;

pub fn validate_model(model: &Model3do) -> ValidationReport {
    let mut report = ValidationReport::new();

    if let Some(item) = rules::validate_name(&model.name, "model") {
        report.add(item);
    }
    report.extend(rules::validate_material_names(model));

    for mesh in model.geosets.iter().flat_map(|g| g.meshes.iter()) {
        if let Some(item) = rules::validate_name(&mesh.name, "mesh") {
            report.add(item);
        }
        if let Some(item) = rules::validate_mesh_arrays(mesh) {
            report.add(item);
        }
        report.extend(rules::validate_mesh_faces(mesh, model.materials.len()));
    }

    report.extend(rules::validate_hierarchy(model));
    report
}

/// Validates `key` on its own, or against the model it animates.
pub fn validate_key(key: &Key, model: Option<&Model3do>) -> ValidationReport {
    let mut report = ValidationReport::new();

    if let Some(item) = rules::validate_name(&key.name, "key") {
        report.add(item);
    }
    if let Some(model) = model {
        if key.num_joints as usize != model.hierarchy.len() {
            report.add(ValidationItem::warning(
                "KEY_JOINT_COUNT_MISMATCH",
                ValidationCategory::Animation,
                format!(
                    "Key declares {} joints but model '{}' has {} hierarchy nodes.",
                    key.num_joints,
                    model.name,
                    model.hierarchy.len()
                ),
            ));
        }
    }
    for marker in &key.markers {
        if marker.frame < 0.0 || marker.frame > key.num_frames as f32 {
            report.add(ValidationItem::warning(
                "MARKER_OUT_OF_RANGE",
                ValidationCategory::Animation,
                format!("Marker {:?} at frame {} is outside the animation.", marker.marker_type, marker.frame),
            ));
        }
    }
    for node in &key.nodes {
        report.extend(rules::validate_key_node(node, key, model));
    }
    report
}
