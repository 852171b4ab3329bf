use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::math::Vector3f;
use crate::text::serutils::{
    write_comment_line, write_key_value, write_line, write_new_line, write_section_title,
};

use super::Key;

const HEADER_KEY_WIDTH: usize = 6;
const NODE_KEY_WIDTH: usize = 7;

fn flags_to_str(bits: u32) -> String {
    format!("0x{:04X}", bits)
}

fn vector_to_str(v: &Vector3f) -> String {
    [v.x, v.y, v.z]
        .iter()
        .map(|e| format!(" {:>12.8}", e))
        .collect()
}

pub fn save_key(key: &Key, path: impl AsRef<Path>, header_comment: &str) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut w = BufWriter::new(file);
    write_key(key, &mut w, header_comment)?;
    w.flush()?;
    Ok(())
}

pub fn write_key<W: Write>(key: &Key, w: &mut W, header_comment: &str) -> Result<()> {
    write_header_section(w, key, header_comment)?;
    write_markers_section(w, key)?;
    write_keyframe_nodes_section(w, key)?;
    Ok(())
}

fn write_header_section<W: Write>(w: &mut W, key: &Key, header_comment: &str) -> Result<()> {
    write_comment_line(w, header_comment)?;
    write_new_line(w)?;

    write_section_title(w, "header")?;
    write_key_value(w, "flags", flags_to_str(key.flags.bits()), HEADER_KEY_WIDTH)?;
    write_key_value(w, "type", flags_to_str(key.node_types.bits()), HEADER_KEY_WIDTH)?;
    write_key_value(w, "frames", key.num_frames, HEADER_KEY_WIDTH)?;
    write_key_value(w, "fps", format!("{:.3}", key.fps), HEADER_KEY_WIDTH)?;
    write_key_value(w, "joints", key.num_joints, HEADER_KEY_WIDTH)?;
    write_new_line(w)?;
    write_new_line(w)?;
    Ok(())
}

fn write_markers_section<W: Write>(w: &mut W, key: &Key) -> Result<()> {
    if key.markers.is_empty() {
        return Ok(());
    }

    write_section_title(w, "markers")?;
    write_key_value(w, "markers", key.markers.len(), 0)?;
    write_new_line(w)?;

    for m in &key.markers {
        write_key_value(w, &format!("{:.6}", m.frame), m.marker_type as i32, 0)?;
    }
    write_new_line(w)?;
    write_new_line(w)?;
    Ok(())
}

fn write_keyframe_nodes_section<W: Write>(w: &mut W, key: &Key) -> Result<()> {
    write_section_title(w, "keyframe nodes")?;
    write_key_value(w, "nodes", key.nodes.len(), 0)?;
    write_new_line(w)?;

    for node in &key.nodes {
        write_key_value(w, "node", node.idx, NODE_KEY_WIDTH)?;
        write_key_value(w, "mesh name", &node.mesh_name, 0)?;
        write_key_value(w, "entries", node.keyframes.len(), 0)?;
        write_new_line(w)?;

        write_comment_line(
            w,
            "num:   frame:   flags:           x:           y:           z:           p:           y:           r:",
        )?;
        write_comment_line(
            w,
            "                                dx:          dy:          dz:          dp:          dy:          dr:",
        )?;
        for (idx, kf) in node.keyframes.iter().enumerate() {
            let row = format!(
                "{:>4}:{:>9}{:>9}{}{}",
                idx,
                kf.frame,
                flags_to_str(kf.flags as u32),
                vector_to_str(&kf.position),
                vector_to_str(&kf.orientation)
            );
            write_line(w, &row)?;

            let deltas = format!(
                "{}{}{}",
                " ".repeat(23),
                vector_to_str(&kf.delta_position),
                vector_to_str(&kf.delta_rotation)
            );
            write_line(w, &deltas)?;
        }
        write_new_line(w)?;
    }
    Ok(())
}
