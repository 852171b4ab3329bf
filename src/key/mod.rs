//! KEY skeletal animation data.
//!
//! A key holds per-joint keyframe tracks addressed by the hierarchy node
//! index of the 3DO model it animates.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::math::Vector3f;
use crate::model::Mesh3doNodeType;

pub mod builder;
pub mod loader;
pub mod writer;

pub use builder::{Channel, ChannelSample, KeyBuilder, NodeTrack};
pub use loader::{load_key, parse_key};
pub use writer::{save_key, write_key};

bitflags::bitflags! {
    /// Playback flags. No bits set means the animation loops.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct KeyFlag: u32 {
        const USE_PUPPET_FPS = 0x01;
        const NO_LOOP = 0x02;
        const PAUSE_ON_LAST_FRAME = 0x04;
        const RESTART_ACTIVE = 0x08;
        const DISABLE_FADE_IN = 0x10;
        const FADE_OUT_AND_NO_LOOP = 0x20;
    }
}

macro_rules! marker_types {
    ($($name:ident = $code:literal),* $(,)?) => {
        /// Game event attached to a frame of the animation.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum KeyMarkerType {
            #[default]
            $($name = $code,)*
        }

        impl KeyMarkerType {
            pub const ALL: &'static [KeyMarkerType] = &[$(KeyMarkerType::$name,)*];

            pub fn from_i64(value: i64) -> Option<Self> {
                match value {
                    $($code => Some(Self::$name),)*
                    _ => None,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                }
            }
        }
    };
}

marker_types! {
    Marker = 0,
    LeftFootstep = 1,
    RightFootstep = 2,
    AttackFire = 3,
    WhipSwing = 4,
    SaberUnknown2 = 5,
    SwimLeft = 6,
    LeftRunFootstep = 8,
    RightRunFootstep = 9,
    Died = 10,
    Jump = 11,
    SwimRight = 13,
    Duck = 14,
    Climb = 15,
    Activate = 16,
    Crawl = 17,
    RunJumpLand = 18,
    RightArmPickup = 19,
    RightArmPickupRest = 20,
    RightArmPlace = 21,
    RightArmPlaceRest = 22,
    RightArmReach = 23,
    RightArmReachRest = 24,
    Pickup = 25,
    Drop = 26,
    Pull = 27,
    InventoryPull = 28,
    InventoryPut = 29,
    AttackFireFinish = 30,
    TurnOff = 31,
    Unknown32 = 32,
    Unknown33 = 33,
    MoveLeftSide = 34,
    MoveRightSide = 35,
}

impl FromStr for KeyMarkerType {
    type Err = String;

    /// Accepts a variant name (case and underscores ignored) or its integer code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let name = s.replace('_', "");
        if let Some(t) = Self::ALL.iter().find(|t| t.name().eq_ignore_ascii_case(&name)) {
            return Ok(*t);
        }
        s.parse::<i64>()
            .ok()
            .and_then(Self::from_i64)
            .ok_or_else(|| format!("invalid marker type '{}'", s))
    }
}

/// Which channels change between a keyframe and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyframeFlag {
    #[default]
    NoChange = 0,
    PositionChange = 1,
    OrientationChange = 2,
    AllChange = 3,
}

impl KeyframeFlag {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::NoChange),
            1 => Some(Self::PositionChange),
            2 => Some(Self::OrientationChange),
            3 => Some(Self::AllChange),
            _ => None,
        }
    }

    /// Adds the change `other` to `self`.
    pub fn combine(self, other: KeyframeFlag) -> KeyframeFlag {
        match (self, other) {
            (a, KeyframeFlag::NoChange) => a,
            (KeyframeFlag::NoChange, b) => b,
            (a, b) if a == b => a,
            _ => KeyframeFlag::AllChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyMarker {
    pub frame: f32,
    pub marker_type: KeyMarkerType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: i32,
    pub flags: KeyframeFlag,
    pub position: Vector3f,
    /// Pitch, yaw, roll in degrees.
    pub orientation: Vector3f,
    /// Per-frame rate of change towards the next keyframe.
    pub delta_position: Vector3f,
    pub delta_rotation: Vector3f,
}

impl Default for Keyframe {
    fn default() -> Self {
        let zero = Vector3f::new(0.0, 0.0, 0.0);
        Self {
            frame: 0,
            flags: KeyframeFlag::NoChange,
            position: zero,
            orientation: zero,
            delta_position: zero,
            delta_rotation: zero,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyNode {
    /// Index of the animated node in the model hierarchy.
    pub idx: i32,
    pub mesh_name: String,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub name: String,
    pub flags: KeyFlag,
    /// Node types that get high animation priority.
    pub node_types: Mesh3doNodeType,
    pub num_frames: i32,
    pub fps: f32,
    pub num_joints: i32,
    pub markers: Vec<KeyMarker>,
    pub nodes: Vec<KeyNode>,
}

impl Key {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: KeyFlag::empty(),
            node_types: Mesh3doNodeType::empty(),
            num_frames: 0,
            fps: 0.0,
            num_joints: 0,
            markers: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn is_looping(&self) -> bool {
        !self
            .flags
            .intersects(KeyFlag::NO_LOOP | KeyFlag::FADE_OUT_AND_NO_LOOP)
    }

    /// Finds the track animating the hierarchy node `idx`.
    pub fn node(&self, idx: i32) -> Option<&KeyNode> {
        self.nodes.iter().find(|n| n.idx == idx)
    }

    /// Finds a track by node name, ignoring case.
    pub fn node_by_name(&self, name: &str) -> Option<&KeyNode> {
        self.nodes.iter().find(|n| n.mesh_name.eq_ignore_ascii_case(name))
    }

    /// Playback length in seconds, 0 when fps is unset.
    pub fn duration(&self) -> f32 {
        if self.fps > 0.0 {
            self.num_frames as f32 / self.fps
        } else {
            0.0
        }
    }
}
