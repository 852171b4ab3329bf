use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::math::{Vector3f, Vector4f};
use crate::text::serutils::{
    write_comment_line, write_key_value, write_line, write_new_line, write_section_title,
};

use super::{Mesh3do, Mesh3doFace, Model3do, Model3doFileVersion};

const FILE_MAGIC: &str = "3DO";

/// ` {:>w.6}` per component, or `(x/y/z)` when not compact.
fn floats_to_str(values: &[f32], compact: bool, width: usize) -> String {
    if compact {
        values
            .iter()
            .map(|v| format!(" {:>width$.6}", v, width = width))
            .collect()
    } else {
        let inner: Vec<String> = values.iter().map(|v| format!("{:.6}", v)).collect();
        format!("({})", inner.join("/"))
    }
}

fn vector_to_str(v: &Vector3f) -> String {
    floats_to_str(&[v.x, v.y, v.z], true, 10)
}

fn radius_to_str(radius: f32) -> String {
    format!("{:>11.6}", radius)
}

/// v2.1 stores a single intensity, v2.2 RGB and v2.3 RGBA. Only v2.3
/// honours the tuple form since the older readers expect bare floats.
fn color_to_str(color: &Vector4f, version: Model3doFileVersion, compact: bool) -> String {
    match version {
        Model3doFileVersion::Version2_1 => {
            floats_to_str(&[(color.x + color.y + color.z) / 3.0], true, 0)
        }
        Model3doFileVersion::Version2_2 => floats_to_str(&[color.x, color.y, color.z], true, 0),
        Model3doFileVersion::Version2_3 => {
            floats_to_str(&[color.x, color.y, color.z, color.w], compact, 0)
        }
    }
}

pub fn save_3do(
    model: &Model3do,
    path: impl AsRef<Path>,
    version: Model3doFileVersion,
    header_comment: &str,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut w = BufWriter::new(file);
    write_3do(model, &mut w, version, header_comment)?;
    w.flush()?;
    Ok(())
}

pub fn write_3do<W: Write>(
    model: &Model3do,
    w: &mut W,
    version: Model3doFileVersion,
    header_comment: &str,
) -> Result<()> {
    write_header_section(w, header_comment, version)?;
    write_resource_section(w, model)?;
    write_geometry_section(w, model, version)?;
    write_hierarchy_section(w, model)?;
    Ok(())
}

fn write_header_section<W: Write>(
    w: &mut W,
    header_comment: &str,
    version: Model3doFileVersion,
) -> Result<()> {
    write_comment_line(w, header_comment)?;
    write_new_line(w)?;

    write_section_title(w, "header")?;
    write_key_value(w, FILE_MAGIC, version.as_str(), 0)?;
    write_new_line(w)?;
    Ok(())
}

fn write_resource_section<W: Write>(w: &mut W, model: &Model3do) -> Result<()> {
    if model.materials.is_empty() {
        return Ok(());
    }

    write_section_title(w, "modelresource")?;
    write_comment_line(w, "Materials list")?;
    write_key_value(w, "materials", model.materials.len(), 0)?;
    write_new_line(w)?;

    for (idx, mat) in model.materials.iter().enumerate() {
        write_line(w, &format!("{:>10}:{:>15}", idx, mat))?;
    }
    write_new_line(w)?;
    write_new_line(w)?;
    Ok(())
}

fn write_geometry_section<W: Write>(
    w: &mut W,
    model: &Model3do,
    version: Model3doFileVersion,
) -> Result<()> {
    write_section_title(w, "geometrydef")?;

    write_comment_line(w, "Object radius")?;
    write_key_value(w, "radius", radius_to_str(model.radius), 0)?;
    write_new_line(w)?;

    write_comment_line(w, "Insertion offset")?;
    write_key_value(w, "insert offset", vector_to_str(&model.insert_offset), 0)?;
    write_new_line(w)?;

    write_comment_line(w, "Number of Geometry Sets")?;
    write_key_value(w, "geosets", model.geosets.len(), 0)?;
    write_new_line(w)?;

    for (num, geoset) in model.geosets.iter().enumerate() {
        write_comment_line(w, "Geometry Set definition")?;
        write_key_value(w, "geoset", num, 0)?;
        write_new_line(w)?;

        write_comment_line(w, "Number of Meshes")?;
        write_key_value(w, "meshes", geoset.meshes.len(), 0)?;
        write_new_line(w)?;
        write_new_line(w)?;

        for mesh in &geoset.meshes {
            write_mesh(w, mesh, version)?;
        }
    }
    Ok(())
}

fn write_mesh<W: Write>(w: &mut W, mesh: &Mesh3do, version: Model3doFileVersion) -> Result<()> {
    write_comment_line(w, "Mesh definition")?;
    write_key_value(w, "mesh", mesh.idx, 0)?;
    write_new_line(w)?;

    write_key_value(w, "name", &mesh.name, 0)?;
    write_new_line(w)?;

    write_key_value(w, "radius", radius_to_str(mesh.radius), 0)?;
    write_new_line(w)?;

    write_key_value(w, "geometrymode", mesh.geometry_mode as i32, 0)?;
    write_key_value(w, "lightingmode", mesh.light_mode as i32, 0)?;
    write_key_value(w, "texturemode", mesh.texture_mode as i32, 0)?;
    write_new_line(w)?;
    write_new_line(w)?;

    write_key_value(w, "vertices", mesh.vertices.len(), 0)?;
    write_new_line(w)?;
    write_comment_line(w, "num:     x:         y:         z:         i:")?;
    for (idx, (vert, color)) in mesh.vertices.iter().zip(&mesh.vertex_colors).enumerate() {
        let row = format!(
            "{:>5}:{} {}",
            idx,
            vector_to_str(vert),
            color_to_str(color, version, true)
        );
        write_line(w, &row)?;
    }
    write_new_line(w)?;
    write_new_line(w)?;

    write_key_value(w, "texture vertices", mesh.uvs.len(), 0)?;
    write_new_line(w)?;
    for (idx, uv) in mesh.uvs.iter().enumerate() {
        write_line(w, &format!("{:>5}:{}", idx, floats_to_str(&[uv.x, uv.y], true, 10)))?;
    }
    write_new_line(w)?;
    write_new_line(w)?;

    write_line(w, "VERTEX NORMALS")?;
    write_new_line(w)?;
    write_comment_line(w, "num:     x:         y:         z:")?;
    for (idx, n) in mesh.normals.iter().enumerate() {
        write_line(w, &format!("{:>5}:{}", idx, vector_to_str(n)))?;
    }
    write_new_line(w)?;
    write_new_line(w)?;

    write_faces(w, &mesh.faces, version)
}

fn face_verts_to_str(face: &Mesh3doFace) -> String {
    let mut out = format!("{:>8}  ", face.vertex_idxs.len());
    for (v, uv) in face.vertex_idxs.iter().zip(&face.uv_idxs) {
        out.push_str(&format!("{:>3}, {:>2} ", v, uv));
    }
    out
}

fn write_faces<W: Write>(w: &mut W, faces: &[Mesh3doFace], version: Model3doFileVersion) -> Result<()> {
    write_key_value(w, "faces", faces.len(), 0)?;
    write_new_line(w)?;

    write_comment_line(
        w,
        " num:  material:   type:  geo:  light:   tex:  extralight:  verts:",
    )?;
    for (idx, face) in faces.iter().enumerate() {
        let row = format!(
            "{:>6}:{:>10}  0x{:04x}{:>6}{:>8}{:>7} {}{}",
            idx,
            face.material_idx,
            face.face_type.bits(),
            face.geometry_mode as i32,
            face.light_mode as i32,
            face.texture_mode as i32,
            color_to_str(&face.color, version, false),
            face_verts_to_str(face)
        );
        write_line(w, &row)?;
    }
    write_new_line(w)?;
    write_new_line(w)?;

    write_line(w, "FACE NORMALS")?;
    write_new_line(w)?;
    write_comment_line(w, "num:     x:         y:         z:")?;
    for (idx, face) in faces.iter().enumerate() {
        write_line(w, &format!("{:>5}:{}", idx, vector_to_str(&face.normal)))?;
    }
    write_new_line(w)?;
    write_new_line(w)?;
    Ok(())
}

fn write_hierarchy_section<W: Write>(w: &mut W, model: &Model3do) -> Result<()> {
    write_section_title(w, "hierarchydef")?;

    write_comment_line(w, "Hierarchy node list")?;
    write_key_value(w, "hierarchy nodes", model.hierarchy.len(), 0)?;
    write_new_line(w)?;

    write_comment_line(
        w,
        " num:   flags:   type:    mesh:  parent:  child:  sibling:  numChildren:        x:         y:         z:     pitch:       yaw:      roll:    pivotx:    pivoty:    pivotz:  hnodename:",
    )?;
    for (idx, node) in model.hierarchy.iter().enumerate() {
        let row = format!(
            "{:>6}:  0x{:04x} 0x{:05x} {:>8} {:>8} {:>7} {:>9} {:>13}{}{}{}  {}",
            idx,
            node.flags.bits(),
            node.node_type.bits(),
            node.mesh_idx,
            node.parent_idx,
            node.first_child_idx,
            node.sibling_idx,
            node.num_children,
            vector_to_str(&node.position),
            vector_to_str(&node.rotation),
            vector_to_str(&node.pivot),
            node.name
        );
        write_line(w, &row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_encoding_per_version() {
        let c = Vector4f::new(0.25, 0.5, 0.75, 1.0);
        assert_eq!(color_to_str(&c, Model3doFileVersion::Version2_1, false), " 0.500000");
        assert_eq!(
            color_to_str(&c, Model3doFileVersion::Version2_2, false),
            " 0.250000 0.500000 0.750000"
        );
        assert_eq!(
            color_to_str(&c, Model3doFileVersion::Version2_3, false),
            "(0.250000/0.500000/0.750000/1.000000)"
        );
        assert_eq!(
            color_to_str(&c, Model3doFileVersion::Version2_3, true),
            " 0.250000 0.500000 0.750000 1.000000"
        );
    }

    #[test]
    fn empty_material_list_omits_resource_section() {
        let model = Model3do::new("empty.3do");
        let mut buf = Vec::new();
        write_3do(&model, &mut buf, Model3doFileVersion::Version2_1, "test").expect("write");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("# test\n\n###############\nSECTION: HEADER\n\n3DO 2.1\n"));
        assert!(!text.contains("MODELRESOURCE"));
        assert!(text.contains("HIERARCHY NODES 0"));
    }

    #[test]
    fn vector_columns_are_aligned() {
        assert_eq!(vector_to_str(&Vector3f::new(1.0, -2.5, 0.0)), "   1.000000  -2.500000   0.000000");
        assert_eq!(radius_to_str(0.5), "   0.500000");
    }
}
