use std::path::Path;

use crate::error::{ParseError, Result, SithError};
use crate::math::Vector4f;
use crate::text::{TokenType, Tokenizer};

use super::{
    FaceType, GeometryMode, LightMode, Mesh3do, Mesh3doFace, Mesh3doNode, Mesh3doNodeFlags,
    Mesh3doNodeType, Model3do, Model3doFileVersion, Model3doGeoSet, TextureMode,
};

const FILE_MAGIC: &str = "3DO";

/// Loads a 3DO model from disk. The model is named after the file's basename.
pub fn load_3do(path: impl AsRef<Path>) -> Result<(Model3do, Model3doFileVersion)> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_3do(name, &source)
}

pub fn parse_3do(name: impl Into<String>, source: &str) -> Result<(Model3do, Model3doFileVersion)> {
    let mut tok = Tokenizer::new(source);
    let mut model = Model3do::new(name);
    let mut version = Model3doFileVersion::default();

    while tok.skip_to_next_section()? {
        let t = tok.get_token()?;
        if t.token_type == TokenType::Eof {
            break;
        }

        match t.value.to_uppercase().as_str() {
            "HEADER" => version = parse_header_section(&mut tok)?,
            "MODELRESOURCE" => parse_resource_section(&mut tok, &mut model)?,
            "GEOMETRYDEF" => parse_geometry_section(&mut tok, &mut model, version)?,
            "HIERARCHYDEF" => parse_hierarchy_section(&mut tok, &mut model)?,
            other => tracing::debug!("skipping unknown 3DO section '{}'", other),
        }
    }

    Ok((model, version))
}

fn get_i32(tok: &mut Tokenizer) -> Result<i32> {
    let t = tok.get_token()?;
    let value = t.to_int_number()?;
    i32::try_from(value).map_err(|_| {
        ParseError::new(
            format!("Integer '{}' is out of range!", t.value),
            t.begin_line,
            t.begin_column,
        )
        .into()
    })
}

fn get_count(tok: &mut Tokenizer, what: &str) -> Result<usize> {
    let t = tok.get_token()?;
    let value = t.to_int_number()?;
    usize::try_from(value).map_err(|_| {
        ParseError::new(
            format!("Expected {} count, found '{}'!", what, t.value),
            t.begin_line,
            t.begin_column,
        )
        .into()
    })
}

fn get_mode<T>(tok: &mut Tokenizer, what: &str, convert: fn(i64) -> Option<T>) -> Result<T> {
    let t = tok.get_token()?;
    let value = t.to_int_number()?;
    convert(value).ok_or_else(|| {
        ParseError::new(
            format!("Invalid {} '{}'!", what, t.value),
            t.begin_line,
            t.begin_column,
        )
        .into()
    })
}

fn get_flag_bits(tok: &mut Tokenizer) -> Result<u32> {
    let t = tok.get_token()?;
    let value = t.to_int_number()?;
    u32::try_from(value).map_err(|_| {
        ParseError::new(
            format!("Expected flags, found '{}'!", t.value),
            t.begin_line,
            t.begin_column,
        )
        .into()
    })
}

/// Reads a `<seq>:` row prefix. A mismatching sequence number is only logged.
fn read_row_index(tok: &mut Tokenizer, expected: usize, what: &str) -> Result<i32> {
    let idx = get_i32(tok)?;
    if usize::try_from(idx).ok() != Some(expected) {
        tracing::warn!("index mismatch while loading 3DO {}: {} != {}", what, idx, expected);
    }
    tok.assert_punctuator(":")?;
    Ok(idx)
}

fn read_color(tok: &mut Tokenizer, version: Model3doFileVersion) -> Result<Vector4f> {
    match version {
        Model3doFileVersion::Version2_1 => {
            let i = tok.get_float_number()?;
            Ok(Vector4f::new(i, i, i, 1.0))
        }
        Model3doFileVersion::Version2_2 => {
            let rgb = tok.get_vector3f()?;
            Ok(rgb.extend(1.0))
        }
        Model3doFileVersion::Version2_3 => tok.get_vector4f(),
    }
}

fn parse_header_section(tok: &mut Tokenizer) -> Result<Model3doFileVersion> {
    let magic = tok.get_space_delimited_string()?;
    if !magic.eq_ignore_ascii_case(FILE_MAGIC) {
        return Err(SithError::InvalidMagic {
            format: "3DO",
            expected: FILE_MAGIC.to_string(),
            found: magic,
        });
    }

    let version = tok.get_float_number()?;
    Model3doFileVersion::from_f32(version).ok_or_else(|| SithError::UnsupportedVersion {
        format: "3DO",
        version: version.to_string(),
    })
}

fn parse_resource_section(tok: &mut Tokenizer, model: &mut Model3do) -> Result<()> {
    tok.assert_identifier("MATERIALS")?;
    let count = get_count(tok, "material")?;
    for i in 0..count {
        read_row_index(tok, i, "materials")?;
        model.materials.push(tok.get_space_delimited_string()?);
    }
    Ok(())
}

fn parse_geometry_section(
    tok: &mut Tokenizer,
    model: &mut Model3do,
    version: Model3doFileVersion,
) -> Result<()> {
    tok.assert_identifier("RADIUS")?;
    model.radius = tok.get_float_number()?;

    tok.assert_identifier("INSERT")?;
    tok.assert_identifier("OFFSET")?;
    model.insert_offset = tok.get_vector3f()?;

    tok.assert_identifier("GEOSETS")?;
    let num_geosets = get_count(tok, "geoset")?;
    for i in 0..num_geosets {
        tok.assert_identifier("GEOSET")?;
        let geoset_idx = get_i32(tok)?;
        if usize::try_from(geoset_idx).ok() != Some(i) {
            tracing::warn!("index mismatch while loading 3DO geosets: {} != {}", geoset_idx, i);
        }

        tok.assert_identifier("MESHES")?;
        let num_meshes = get_count(tok, "mesh")?;
        let mut geoset = Model3doGeoSet::default();
        for j in 0..num_meshes {
            geoset.meshes.push(parse_mesh(tok, j, version)?);
        }
        model.geosets.push(geoset);
    }
    Ok(())
}

fn parse_mesh(tok: &mut Tokenizer, expected_idx: usize, version: Model3doFileVersion) -> Result<Mesh3do> {
    tok.assert_identifier("MESH")?;
    let mesh_idx = get_i32(tok)?;
    if usize::try_from(mesh_idx).ok() != Some(expected_idx) {
        tracing::warn!("index mismatch while loading 3DO meshes: {} != {}", mesh_idx, expected_idx);
    }

    tok.assert_identifier("NAME")?;
    let mut mesh = Mesh3do::new(mesh_idx, tok.get_line_string()?);

    tok.assert_identifier("RADIUS")?;
    mesh.radius = tok.get_float_number()?;

    // Grim Fandango meshes carry an extra SHADOW field before GEOMETRYMODE
    let t = tok.get_token()?;
    if t.token_type == TokenType::Identifier && t.value.eq_ignore_ascii_case("SHADOW") {
        tok.get_token()?;
        tok.assert_identifier("GEOMETRYMODE")?;
    } else if t.token_type != TokenType::Identifier || !t.value.eq_ignore_ascii_case("GEOMETRYMODE") {
        return Err(ParseError::new(
            format!("Expected identifier 'GEOMETRYMODE', found '{}'!", t.value),
            t.begin_line,
            t.begin_column,
        )
        .into());
    }
    mesh.geometry_mode = get_mode(tok, "geometry mode", GeometryMode::from_i64)?;

    tok.assert_identifier("LIGHTINGMODE")?;
    mesh.light_mode = get_mode(tok, "lighting mode", LightMode::from_i64)?;

    tok.assert_identifier("TEXTUREMODE")?;
    mesh.texture_mode = get_mode(tok, "texture mode", TextureMode::from_i64)?;

    tok.assert_identifier("VERTICES")?;
    let num_vertices = get_count(tok, "vertex")?;
    for k in 0..num_vertices {
        read_row_index(tok, k, "vertices")?;
        mesh.vertices.push(tok.get_vector3f()?);
        mesh.vertex_colors.push(read_color(tok, version)?);
    }

    tok.assert_identifier("TEXTURE")?;
    tok.assert_identifier("VERTICES")?;
    let num_uvs = get_count(tok, "texture vertex")?;
    for k in 0..num_uvs {
        read_row_index(tok, k, "texture vertices")?;
        mesh.uvs.push(tok.get_vector2f()?);
    }

    tok.assert_identifier("VERTEX")?;
    tok.assert_identifier("NORMALS")?;
    for k in 0..num_vertices {
        read_row_index(tok, k, "vertex normals")?;
        mesh.normals.push(tok.get_vector3f()?);
    }

    tok.assert_identifier("FACES")?;
    let num_faces = get_count(tok, "face")?;
    for k in 0..num_faces {
        read_row_index(tok, k, "faces")?;
        mesh.faces.push(parse_face(tok, version)?);
    }

    tok.assert_identifier("FACE")?;
    tok.assert_identifier("NORMALS")?;
    for (k, face) in mesh.faces.iter_mut().enumerate() {
        read_row_index(tok, k, "face normals")?;
        face.normal = tok.get_vector3f()?;
    }

    Ok(mesh)
}

fn parse_face(tok: &mut Tokenizer, version: Model3doFileVersion) -> Result<Mesh3doFace> {
    let mut face = Mesh3doFace {
        material_idx: get_i32(tok)?,
        face_type: FaceType::from_bits_retain(get_flag_bits(tok)?),
        geometry_mode: get_mode(tok, "geometry mode", GeometryMode::from_i64)?,
        light_mode: get_mode(tok, "lighting mode", LightMode::from_i64)?,
        texture_mode: get_mode(tok, "texture mode", TextureMode::from_i64)?,
        color: read_color(tok, version)?,
        ..Default::default()
    };

    let num_verts = get_count(tok, "face vertex")?;
    for _ in 0..num_verts {
        face.vertex_idxs.push(get_i32(tok)?);
        tok.assert_punctuator(",")?;
        face.uv_idxs.push(get_i32(tok)?);
    }
    Ok(face)
}

fn parse_hierarchy_section(tok: &mut Tokenizer, model: &mut Model3do) -> Result<()> {
    tok.assert_identifier("HIERARCHY")?;
    tok.assert_identifier("NODES")?;

    let count = get_count(tok, "hierarchy node")?;
    for i in 0..count {
        let idx = read_row_index(tok, i, "hierarchy nodes")?;
        let flags = Mesh3doNodeFlags::from_bits_retain(get_flag_bits(tok)?);
        let node_type = Mesh3doNodeType::from_bits_retain(get_flag_bits(tok)?);
        let mesh_idx = get_i32(tok)?;
        let parent_idx = get_i32(tok)?;
        let first_child_idx = get_i32(tok)?;
        let sibling_idx = get_i32(tok)?;
        let num_children = get_i32(tok)?;
        let position = tok.get_vector3f()?;
        let rotation = tok.get_vector3f()?;
        let pivot = tok.get_vector3f()?;
        let name = tok.get_space_delimited_string()?;

        model.hierarchy.push(Mesh3doNode {
            idx,
            flags,
            node_type,
            name,
            mesh_idx,
            parent_idx,
            first_child_idx,
            sibling_idx,
            num_children,
            position,
            rotation,
            pivot,
        });
    }
    Ok(())
}
