//! Export-direction construction of a [`Key`] from sparse animation curves.
//!
//! Callers feed one [`NodeTrack`] per animated hierarchy node. Each track is
//! a list of single-axis samples, the way curve editors store them, in the
//! node's local space.

use std::collections::BTreeMap;

use cgmath::Quaternion;

use crate::error::Result;
use crate::math::{is_zero3, quaternion_to_pyr, Vector3f};
use crate::model::{Mesh3doNodeType, Model3do};
use crate::validation::assert_name;

use super::{Key, KeyFlag, KeyMarker, KeyMarkerType, KeyNode, Keyframe, KeyframeFlag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Axes x, y, z.
    Location,
    /// Pitch, yaw, roll in degrees.
    Orientation,
    /// Axes w, x, y, z.
    Quaternion,
}

impl Channel {
    fn arity(self) -> usize {
        match self {
            Channel::Location | Channel::Orientation => 3,
            Channel::Quaternion => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSample {
    pub channel: Channel,
    pub axis: usize,
    pub frame: i32,
    pub value: f32,
}

/// Animation samples for the hierarchy node named `node_name`.
#[derive(Debug, Clone, Default)]
pub struct NodeTrack {
    pub node_name: String,
    pub samples: Vec<ChannelSample>,
}

impl NodeTrack {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            samples: Vec::new(),
        }
    }

    pub fn sample(mut self, channel: Channel, axis: usize, frame: i32, value: f32) -> Self {
        self.samples.push(ChannelSample { channel, axis, frame, value });
        self
    }

    /// Adds samples for every axis of `channel` at `frame`.
    pub fn sample_all(mut self, channel: Channel, frame: i32, values: &[f32]) -> Self {
        for (axis, value) in values.iter().enumerate() {
            self.samples.push(ChannelSample { channel, axis, frame, value: *value });
        }
        self
    }
}

#[derive(Debug, Default)]
struct FrameEntry {
    location: Option<Vector3f>,
    orientation: Option<Vector3f>,
    quaternion: Option<Quaternion<f32>>,
}

#[derive(Debug, Clone)]
pub struct KeyBuilder {
    key: Key,
    tracks: Vec<NodeTrack>,
}

impl KeyBuilder {
    pub fn new(name: &str) -> Result<Self> {
        assert_name(name)?;
        Ok(Self {
            key: Key::new(name),
            tracks: Vec::new(),
        })
    }

    pub fn flags(mut self, flags: KeyFlag) -> Self {
        self.key.flags = flags;
        self
    }

    pub fn node_types(mut self, node_types: Mesh3doNodeType) -> Self {
        self.key.node_types = node_types;
        self
    }

    /// Frame count. When left at 0 it is derived from the last keyframe.
    pub fn num_frames(mut self, num_frames: i32) -> Self {
        self.key.num_frames = num_frames;
        self
    }

    pub fn fps(mut self, fps: f32) -> Self {
        self.key.fps = fps;
        self
    }

    /// Adds a marker named after a [`KeyMarkerType`] variant or its code.
    /// Unrecognized names are skipped with a warning.
    pub fn add_marker(&mut self, frame: f32, name: &str) -> bool {
        match name.parse::<KeyMarkerType>() {
            Ok(marker_type) => {
                self.key.markers.push(KeyMarker { frame, marker_type });
                true
            }
            Err(_) => {
                tracing::warn!("invalid marker '{}' at frame {}, skipping it", name, frame);
                false
            }
        }
    }

    pub fn add_track(&mut self, track: NodeTrack) {
        self.tracks.push(track);
    }

    /// Resolves tracks against `model`'s hierarchy and computes keyframes.
    ///
    /// Nodes are emitted in depth-first hierarchy order, and nodes without
    /// samples are left out.
    pub fn build(mut self, model: &Model3do) -> Result<Key> {
        self.key.num_joints = model.hierarchy.len() as i32;

        for track in &self.tracks {
            let known = model
                .hierarchy
                .iter()
                .any(|n| n.name.eq_ignore_ascii_case(&track.node_name));
            if !known {
                tracing::warn!(
                    "animation track for '{}' has no matching hierarchy node in '{}'",
                    track.node_name,
                    model.name
                );
            }
        }

        for idx in model.walk_depth_first()? {
            let hnode = &model.hierarchy[idx];
            let samples: Vec<&ChannelSample> = self
                .tracks
                .iter()
                .filter(|t| t.node_name.eq_ignore_ascii_case(&hnode.name))
                .flat_map(|t| t.samples.iter())
                .collect();
            if samples.is_empty() {
                continue;
            }

            let keyframes = make_keyframes(&hnode.name, &samples);
            if !keyframes.is_empty() {
                self.key.nodes.push(KeyNode {
                    idx: idx as i32,
                    mesh_name: hnode.name.clone(),
                    keyframes,
                });
            }
        }

        if self.key.nodes.is_empty() {
            tracing::warn!("key '{}' has no animation data", self.key.name);
        }
        if self.key.num_frames == 0 {
            self.key.num_frames = self
                .key
                .nodes
                .iter()
                .flat_map(|n| n.keyframes.last())
                .map(|kf| kf.frame + 1)
                .max()
                .unwrap_or(0);
        }
        Ok(self.key)
    }
}

/// Groups samples of one channel by frame and fills axes missing at a frame
/// with the previous frame's value, or 0.0 before the first one.
fn fill_channel(node_name: &str, channel: Channel, samples: &[&ChannelSample]) -> BTreeMap<i32, Vec<f32>> {
    let arity = channel.arity();
    let mut sparse: BTreeMap<i32, Vec<Option<f32>>> = BTreeMap::new();
    for s in samples.iter().filter(|s| s.channel == channel) {
        if s.axis >= arity {
            tracing::warn!(
                "node '{}' has a {:?} sample for axis {} at frame {}, ignoring it",
                node_name,
                channel,
                s.axis,
                s.frame
            );
            continue;
        }
        sparse.entry(s.frame).or_insert_with(|| vec![None; arity])[s.axis] = Some(s.value);
    }

    let mut filled = BTreeMap::new();
    let mut prev: Option<Vec<f32>> = None;
    for (frame, co) in sparse {
        let co: Vec<f32> = co
            .iter()
            .enumerate()
            .map(|(i, v)| v.unwrap_or_else(|| prev.as_ref().map_or(0.0, |p| p[i])))
            .collect();
        prev = Some(co.clone());
        filled.insert(frame, co);
    }
    filled
}

fn make_keyframes(node_name: &str, samples: &[&ChannelSample]) -> Vec<Keyframe> {
    let mut entries: BTreeMap<i32, FrameEntry> = BTreeMap::new();
    for (frame, co) in fill_channel(node_name, Channel::Location, samples) {
        entries.entry(frame).or_default().location = Some(Vector3f::new(co[0], co[1], co[2]));
    }
    for (frame, co) in fill_channel(node_name, Channel::Orientation, samples) {
        entries.entry(frame).or_default().orientation = Some(Vector3f::new(co[0], co[1], co[2]));
    }
    for (frame, co) in fill_channel(node_name, Channel::Quaternion, samples) {
        entries.entry(frame).or_default().quaternion = Some(Quaternion::new(co[0], co[1], co[2], co[3]));
    }

    let mut keyframes: Vec<Keyframe> = Vec::with_capacity(entries.len());
    for (frame, entry) in entries {
        if keyframes.is_empty() && frame != 0 {
            tracing::warn!("node '{}' doesn't have a keyframe set at frame 0", node_name);
        }

        let prev = keyframes.last().copied();
        let mut kf = Keyframe {
            frame,
            ..Keyframe::default()
        };

        kf.position = match (entry.location, prev) {
            (Some(loc), _) => loc,
            (None, Some(p)) => p.position,
            (None, None) => kf.position,
        };
        kf.orientation = match (entry.quaternion, entry.orientation, prev) {
            (Some(q), _, _) => quaternion_to_pyr(q),
            (None, Some(pyr), _) => pyr,
            (None, None, Some(p)) => p.orientation,
            (None, None, None) => kf.orientation,
        };

        if let Some(last) = keyframes.last_mut() {
            set_keyframe_delta(last, &kf, KeyframeFlag::PositionChange);
            set_keyframe_delta(last, &kf, KeyframeFlag::OrientationChange);
        }
        keyframes.push(kf);
    }
    keyframes
}

/// Stores the per-frame rate of change from `kf1` to `kf2` on `kf1` and
/// marks the changed channel. Nothing is stored for a zero delta or when
/// `kf2` does not come after `kf1`.
fn set_keyframe_delta(kf1: &mut Keyframe, kf2: &Keyframe, dtype: KeyframeFlag) {
    if kf2.frame <= kf1.frame {
        return;
    }

    let dframes = (kf2.frame - kf1.frame) as f32;
    let delta = match dtype {
        KeyframeFlag::PositionChange => (kf2.position - kf1.position) / dframes,
        KeyframeFlag::OrientationChange => (kf2.orientation - kf1.orientation) / dframes,
        _ => return,
    };
    if is_zero3(delta) {
        return;
    }

    if dtype == KeyframeFlag::PositionChange {
        kf1.delta_position = delta;
    } else {
        kf1.delta_rotation = delta;
    }
    kf1.flags = kf1.flags.combine(dtype);
}
