use crate::error::{Result, SithError};
use crate::key::{Key, KeyNode};
use crate::model::{Mesh3do, Model3do};

use super::limits::*;
use super::report::*;

/// Fails unless `name` is ASCII and at most [`MAX_NAME_LEN`] characters.
pub fn assert_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(SithError::InvalidName(format!(
            "len of '{}' is greater then {} chars",
            name, MAX_NAME_LEN
        )));
    }
    if !name.is_ascii() {
        return Err(SithError::InvalidName(format!(
            "'{}' len does not contain all ASCII chars",
            name
        )));
    }
    Ok(())
}

pub fn validate_name(name: &str, what: &str) -> Option<ValidationItem> {
    assert_name(name).err().map(|e| {
        ValidationItem::error(
            "INVALID_NAME",
            ValidationCategory::Name,
            format!("{} {}", what, e),
        )
    })
}

/// Vertex positions, colors and normals must be parallel arrays.
pub fn validate_mesh_arrays(mesh: &Mesh3do) -> Option<ValidationItem> {
    let n = mesh.vertices.len();
    if mesh.vertex_colors.len() != n || mesh.normals.len() != n {
        Some(ValidationItem::error(
            "MESH_ARRAY_MISMATCH",
            ValidationCategory::Mesh,
            format!(
                "Mesh '{}' has {} vertices, {} vertex colors and {} normals.",
                mesh.name,
                n,
                mesh.vertex_colors.len(),
                mesh.normals.len()
            ),
        ))
    } else {
        None
    }
}

pub fn validate_mesh_faces(mesh: &Mesh3do, num_materials: usize) -> Vec<ValidationItem> {
    let mut items = Vec::new();
    for (fi, face) in mesh.faces.iter().enumerate() {
        if face.vertex_idxs.len() != face.uv_idxs.len() {
            items.push(ValidationItem::error(
                "FACE_UV_COUNT_MISMATCH",
                ValidationCategory::Mesh,
                format!(
                    "Mesh '{}' face {} has {} vertex indices but {} UV indices.",
                    mesh.name,
                    fi,
                    face.vertex_idxs.len(),
                    face.uv_idxs.len()
                ),
            ));
        }
        if face.vertex_idxs.len() < MIN_FACE_VERTICES {
            items.push(ValidationItem::error(
                "FACE_DEGENERATE",
                ValidationCategory::Mesh,
                format!(
                    "Mesh '{}' face {} has only {} vertices.",
                    mesh.name,
                    fi,
                    face.vertex_idxs.len()
                ),
            ));
        }
        if let Some(v) = face
            .vertex_idxs
            .iter()
            .find(|&&v| v < 0 || v as usize >= mesh.vertices.len())
        {
            items.push(ValidationItem::error(
                "FACE_VERTEX_OUT_OF_RANGE",
                ValidationCategory::Mesh,
                format!(
                    "Mesh '{}' face {} references vertex {} of {}.",
                    mesh.name,
                    fi,
                    v,
                    mesh.vertices.len()
                ),
            ));
        }
        if let Some(uv) = face
            .uv_idxs
            .iter()
            .find(|&&uv| uv < 0 || uv as usize >= mesh.uvs.len())
        {
            // Untextured faces commonly carry zero UV indices with an empty UV list
            if !(mesh.uvs.is_empty() && *uv == 0) {
                items.push(ValidationItem::warning(
                    "FACE_UV_OUT_OF_RANGE",
                    ValidationCategory::Mesh,
                    format!(
                        "Mesh '{}' face {} references texture vertex {} of {}.",
                        mesh.name,
                        fi,
                        uv,
                        mesh.uvs.len()
                    ),
                ));
            }
        }
        if face.material_idx >= 0 && face.material_idx as usize >= num_materials {
            items.push(ValidationItem::error(
                "FACE_MATERIAL_OUT_OF_RANGE",
                ValidationCategory::Material,
                format!(
                    "Mesh '{}' face {} uses material {} but the model has {} materials.",
                    mesh.name, fi, face.material_idx, num_materials
                ),
            ));
        }
    }
    items
}

pub fn validate_material_names(model: &Model3do) -> Vec<ValidationItem> {
    let mut items = Vec::new();
    for mat in &model.materials {
        if let Some(item) = validate_name(mat, "material") {
            items.push(item);
        }
        if !mat.to_lowercase().ends_with(".mat") {
            items.push(ValidationItem::warning(
                "MATERIAL_EXTENSION",
                ValidationCategory::Material,
                format!("Material '{}' has no .mat extension.", mat),
            ));
        }
    }
    items
}

pub fn validate_hierarchy(model: &Model3do) -> Vec<ValidationItem> {
    let mut items = Vec::new();
    if let Err(e) = model.validate_hierarchy() {
        items.push(ValidationItem::error(
            "HIERARCHY_INVALID",
            ValidationCategory::Hierarchy,
            e.to_string(),
        ));
        return items;
    }

    let mesh_count = model.geosets.first().map(|g| g.meshes.len()).unwrap_or(0);
    for (i, node) in model.hierarchy.iter().enumerate() {
        if let Some(item) = validate_name(&node.name, "hierarchy node") {
            items.push(item);
        }
        if node.idx != i as i32 {
            items.push(
                ValidationItem::warning(
                    "HIERARCHY_NOT_ORDERED",
                    ValidationCategory::Hierarchy,
                    format!("Node '{}' at position {} has sequence number {}.", node.name, i, node.idx),
                )
                .fixable(),
            );
        }
        if node.mesh_idx >= 0 && node.mesh_idx as usize >= mesh_count {
            items.push(ValidationItem::error(
                "NODE_MESH_OUT_OF_RANGE",
                ValidationCategory::Hierarchy,
                format!(
                    "Node '{}' references mesh {} but geoset 0 has {} meshes.",
                    node.name, node.mesh_idx, mesh_count
                ),
            ));
        }
        let children = model.node_children(i).map(|c| c.len()).unwrap_or(0);
        if node.num_children != children as i32 {
            items.push(
                ValidationItem::warning(
                    "NODE_CHILD_COUNT_MISMATCH",
                    ValidationCategory::Hierarchy,
                    format!(
                        "Node '{}' declares {} children but links {}.",
                        node.name, node.num_children, children
                    ),
                )
                .fixable(),
            );
        }
    }
    items
}

pub fn validate_key_node(node: &KeyNode, key: &Key, model: Option<&Model3do>) -> Vec<ValidationItem> {
    let mut items = Vec::new();
    if node.idx < 0 || node.idx >= key.num_joints {
        items.push(ValidationItem::error(
            "KEY_NODE_OUT_OF_RANGE",
            ValidationCategory::Animation,
            format!(
                "Key node '{}' has index {} but the key declares {} joints.",
                node.mesh_name, node.idx, key.num_joints
            ),
        ));
    }

    if let Some(model) = model {
        match usize::try_from(node.idx).ok().and_then(|i| model.hierarchy.get(i)) {
            Some(hnode) if !hnode.name.eq_ignore_ascii_case(&node.mesh_name) => {
                items.push(ValidationItem::warning(
                    "KEY_NODE_NAME_MISMATCH",
                    ValidationCategory::Animation,
                    format!(
                        "Key node {} is named '{}' but the model node is '{}'.",
                        node.idx, node.mesh_name, hnode.name
                    ),
                ));
            }
            Some(_) => {}
            None => items.push(ValidationItem::error(
                "KEY_NODE_MISSING_IN_MODEL",
                ValidationCategory::Animation,
                format!("Key node {} ('{}') does not exist in the model.", node.idx, node.mesh_name),
            )),
        }
    }

    if node
        .keyframes
        .windows(2)
        .any(|pair| pair[1].frame <= pair[0].frame)
    {
        items.push(ValidationItem::warning(
            "KEYFRAMES_NOT_INCREASING",
            ValidationCategory::Animation,
            format!("Keyframes of node '{}' are not in increasing frame order.", node.mesh_name),
        ));
    }

    if let Some(kf) = node
        .keyframes
        .iter()
        .find(|kf| kf.frame < 0 || kf.frame >= key.num_frames.max(1))
    {
        items.push(ValidationItem::warning(
            "KEYFRAME_OUT_OF_RANGE",
            ValidationCategory::Animation,
            format!(
                "Node '{}' has a keyframe at frame {} outside 0..{}.",
                node.mesh_name, kf.frame, key.num_frames
            ),
        ));
    }
    items
}
