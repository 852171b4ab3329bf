use std::path::Path;

use crate::error::Result;
use crate::model::Mesh3doNodeType;
use crate::text::{TokenType, Tokenizer};

use super::{Key, KeyFlag, KeyMarker, KeyMarkerType, KeyNode, Keyframe, KeyframeFlag};

/// Loads a key from disk. The key is named after the file's basename.
pub fn load_key(path: impl AsRef<Path>) -> Result<Key> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_key(name, &source)
}

pub fn parse_key(name: impl Into<String>, source: &str) -> Result<Key> {
    let mut tok = Tokenizer::new(source);
    let mut key = Key::new(name);

    while tok.skip_to_next_section()? {
        let t = tok.get_token()?;
        if t.token_type == TokenType::Eof {
            break;
        }

        match t.value.to_uppercase().as_str() {
            "HEADER" => parse_header_section(&mut tok, &mut key)?,
            "MARKERS" => parse_markers_section(&mut tok, &mut key)?,
            "KEYFRAME" => {
                tok.assert_identifier("NODES")?;
                parse_keyframe_nodes_section(&mut tok, &mut key)?;
            }
            other => tracing::debug!("skipping unknown KEY section '{}'", other),
        }
    }

    Ok(key)
}

fn get_i32(tok: &mut Tokenizer) -> Result<i32> {
    let t = tok.get_token()?;
    let value = t.to_int_number()?;
    i32::try_from(value).map_err(|_| t.error(format!("Integer '{}' is out of range!", t.value)))
}

fn get_count(tok: &mut Tokenizer, what: &str) -> Result<usize> {
    let t = tok.get_token()?;
    let value = t.to_int_number()?;
    usize::try_from(value).map_err(|_| t.error(format!("Expected {} count, found '{}'!", what, t.value)))
}

fn get_flag_bits(tok: &mut Tokenizer) -> Result<u32> {
    let t = tok.get_token()?;
    let value = t.to_int_number()?;
    u32::try_from(value).map_err(|_| t.error(format!("Expected flags, found '{}'!", t.value)))
}

fn parse_header_section(tok: &mut Tokenizer, key: &mut Key) -> Result<()> {
    tok.assert_identifier("FLAGS")?;
    key.flags = KeyFlag::from_bits_retain(get_flag_bits(tok)?);

    tok.assert_identifier("TYPE")?;
    key.node_types = Mesh3doNodeType::from_bits_retain(get_flag_bits(tok)?);

    tok.assert_identifier("FRAMES")?;
    key.num_frames = get_i32(tok)?;

    tok.assert_identifier("FPS")?;
    key.fps = tok.get_float_number()?;

    tok.assert_identifier("JOINTS")?;
    key.num_joints = get_i32(tok)?;
    Ok(())
}

fn parse_markers_section(tok: &mut Tokenizer, key: &mut Key) -> Result<()> {
    tok.assert_identifier("MARKERS")?;
    let num_markers = get_count(tok, "marker")?;

    for _ in 0..num_markers {
        let frame = tok.get_float_number()?;
        let code = tok.get_int_number()?;
        let marker_type = KeyMarkerType::from_i64(code).unwrap_or_else(|| {
            tracing::warn!(
                "unknown marker type '{}' at frame {}, falling back to '{}'",
                code,
                frame,
                KeyMarkerType::default().name()
            );
            KeyMarkerType::default()
        });
        key.markers.push(KeyMarker { frame, marker_type });
    }
    Ok(())
}

fn parse_keyframe_nodes_section(tok: &mut Tokenizer, key: &mut Key) -> Result<()> {
    tok.assert_identifier("NODES")?;
    let num_nodes = get_count(tok, "node")?;

    for _ in 0..num_nodes {
        let mut node = KeyNode::default();

        tok.assert_identifier("NODE")?;
        node.idx = get_i32(tok)?;

        tok.assert_identifier("MESH")?;
        tok.assert_identifier("NAME")?;
        node.mesh_name = tok.get_line_string()?;

        tok.assert_identifier("ENTRIES")?;
        let num_entries = get_count(tok, "entry")?;
        for entry in 0..num_entries {
            let seq = get_i32(tok)?;
            if usize::try_from(seq).ok() != Some(entry) {
                tracing::warn!(
                    "index mismatch while loading keyframes of node '{}': {} != {}",
                    node.mesh_name,
                    seq,
                    entry
                );
            }
            tok.assert_punctuator(":")?;
            node.keyframes.push(parse_keyframe(tok)?);
        }
        key.nodes.push(node);
    }
    Ok(())
}

fn parse_keyframe(tok: &mut Tokenizer) -> Result<Keyframe> {
    let frame = get_i32(tok)?;

    let t = tok.get_token()?;
    let flags = KeyframeFlag::from_i64(t.to_int_number()?)
        .ok_or_else(|| t.error(format!("Invalid keyframe flags '{}'!", t.value)))?;

    Ok(Keyframe {
        frame,
        flags,
        position: tok.get_vector3f()?,
        orientation: tok.get_vector3f()?,
        delta_position: tok.get_vector3f()?,
        delta_rotation: tok.get_vector3f()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SithError;

    const WALK_KEY: &str = "\
# walk cycle

###############
SECTION: HEADER

FLAGS  0x0000
TYPE   0x0000
FRAMES 10
FPS    30.000
JOINTS 1

###############
SECTION: MARKERS

MARKERS 1
5.000000 1

###############
SECTION: KEYFRAME NODES

NODES 1

NODE    0
MESH NAME root
ENTRIES 2

#num:   frame:   flags:           x:           y:           z:           p:           y:           r:
   0:        0   0x0001   0.00000000   0.00000000   0.00000000   0.00000000   0.00000000   0.00000000
                          0.10000000   0.00000000   0.00000000   0.00000000   0.00000000   0.00000000
   1:       10   0x0000   1.00000000   0.00000000   0.00000000   0.00000000   0.00000000   0.00000000
                          0.00000000   0.00000000   0.00000000   0.00000000   0.00000000   0.00000000
";

    #[test]
    fn parses_header_markers_and_nodes() {
        let key = parse_key("walk.key", WALK_KEY).expect("parse");
        assert_eq!(key.name, "walk.key");
        assert_eq!(key.flags, KeyFlag::empty());
        assert_eq!(key.num_frames, 10);
        assert_eq!(key.fps, 30.0);
        assert_eq!(key.num_joints, 1);
        assert_eq!(key.markers.len(), 1);
        assert_eq!(key.markers[0].frame, 5.0);
        assert_eq!(key.markers[0].marker_type, KeyMarkerType::LeftFootstep);

        let node = &key.nodes[0];
        assert_eq!(node.mesh_name, "root");
        assert_eq!(node.keyframes.len(), 2);
        assert_eq!(node.keyframes[0].flags, KeyframeFlag::PositionChange);
        assert_eq!(node.keyframes[0].delta_position.x, 0.1);
        assert_eq!(node.keyframes[1].frame, 10);
        assert_eq!(node.keyframes[1].position.x, 1.0);
    }

    #[test]
    fn unknown_marker_code_falls_back() {
        let source = "SECTION: MARKERS\nMARKERS 2\n1.0 7\n2.0 11\n";
        let key = parse_key("k", source).expect("parse");
        assert_eq!(key.markers[0].marker_type, KeyMarkerType::Marker);
        assert_eq!(key.markers[1].marker_type, KeyMarkerType::Jump);
    }

    #[test]
    fn unknown_keyframe_flag_is_an_error() {
        let source = WALK_KEY.replace("0x0001", "0x0009");
        let err = parse_key("k", &source).unwrap_err();
        assert!(matches!(err, SithError::Parse(_)));
        assert!(err.to_string().starts_with("Invalid keyframe flags '0x0009'!"));
    }

    #[test]
    fn entry_sequence_mismatch_is_tolerated() {
        let source = WALK_KEY.replace("   1:       10", "   4:       10");
        let key = parse_key("k", &source).expect("parse");
        assert_eq!(key.nodes[0].keyframes.len(), 2);
    }

    #[test]
    fn huge_counts_fail_at_end_of_input() {
        for (from, to) in [
            ("ENTRIES 2", "ENTRIES 999999999999"),
            ("NODES 1", "NODES 999999999999"),
            ("MARKERS 1", "MARKERS 999999999999"),
        ] {
            let source = WALK_KEY.replace(from, to);
            let err = parse_key("k", &source).unwrap_err();
            assert!(matches!(err, SithError::Parse(_)), "{}: {}", to, err);
        }
    }

    #[test]
    fn header_field_order_is_enforced() {
        let source = "SECTION: HEADER\nTYPE 0x0\n";
        assert!(parse_key("k", source).is_err());
    }
}
