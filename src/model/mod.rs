use cgmath::{InnerSpace, Vector3};
use serde::{Deserialize, Serialize};

use crate::math::{Vector2f, Vector3f, Vector4f};

pub mod builder;
pub mod hierarchy;
pub mod loader;
pub mod writer;

pub use builder::{FaceCorner, MeshBuilder, Model3doBuilder, NodeDesc};
pub use loader::{load_3do, parse_3do};
pub use writer::{save_3do, write_3do};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Model3doFileVersion {
    #[default]
    Version2_1,
    Version2_2,
    Version2_3,
}

impl Model3doFileVersion {
    pub fn from_f32(value: f32) -> Option<Self> {
        [Self::Version2_1, Self::Version2_2, Self::Version2_3]
            .into_iter()
            .find(|v| (v.as_f32() - value).abs() < 1e-4)
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            Self::Version2_1 => 2.1,
            Self::Version2_2 => 2.2,
            Self::Version2_3 => 2.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Version2_1 => "2.1",
            Self::Version2_2 => "2.2",
            Self::Version2_3 => "2.3",
        }
    }
}

impl std::str::FromStr for Model3doFileVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<f32>()
            .ok()
            .and_then(Self::from_f32)
            .ok_or_else(|| format!("unsupported 3DO version '{}', expected 2.1, 2.2 or 2.3", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryMode {
    #[default]
    NotDrawn = 0,
    VertexOnly = 1,
    Wireframe = 2,
    Solid = 3,
    Texture = 4,
}

impl GeometryMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::NotDrawn),
            1 => Some(Self::VertexOnly),
            2 => Some(Self::Wireframe),
            3 => Some(Self::Solid),
            4 => Some(Self::Texture),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightMode {
    #[default]
    FullyLit = 0,
    NotLit = 1,
    Diffuse = 2,
    Gouraud = 3,
    /// Grim Fandango only.
    GfUnknown6 = 6,
}

impl LightMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::FullyLit),
            1 => Some(Self::NotLit),
            2 => Some(Self::Diffuse),
            3 => Some(Self::Gouraud),
            6 => Some(Self::GfUnknown6),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextureMode {
    #[default]
    Affine = 0,
    Perspective = 1,
    PerspectiveUnknown = 2,
    PerspectiveCorrected = 3,
}

impl TextureMode {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Affine),
            1 => Some(Self::Perspective),
            2 => Some(Self::PerspectiveUnknown),
            3 => Some(Self::PerspectiveCorrected),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FaceType: u32 {
        const DOUBLE_SIDED = 0x01;
        const TRANSLUCENT = 0x02;
        /// Texture is clamped in x instead of wrapped.
        const TEX_CLAMP_X = 0x04;
        const TEX_CLAMP_Y = 0x08;
        /// Point filtering instead of bilinear.
        const TEX_FILTER_NONE = 0x10;
        const ZWRITE_DISABLED = 0x20;
        /// IJIM: player can hang on the ledge of this face.
        const IJIM_LEDGE = 0x40;
        const IJIM_FOG_ENABLED = 0x100;
        const IJIM_WHIP_AIM = 0x200;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Mesh3doNodeFlags: u32 {
        const UNKNOWN_01 = 0x01;
        const UNKNOWN_02 = 0x02;
        const UNKNOWN_04 = 0x04;
        const UNKNOWN_08 = 0x08;
        const UNKNOWN_10 = 0x10;
        const UNKNOWN_20 = 0x20;
        const UNKNOWN_40 = 0x40;
        const UNKNOWN_80 = 0x80;
        const UNKNOWN_100 = 0x100;
        const UNKNOWN_200 = 0x200;
        const UNKNOWN_400 = 0x400;
        const UNKNOWN_800 = 0x800;
        const UNKNOWN_1000 = 0x1000;
        const UNKNOWN_2000 = 0x2000;
        const UNKNOWN_4000 = 0x4000;
        const UNKNOWN_8000 = 0x8000;
    }
}

bitflags::bitflags! {
    /// Joint classification. Also used by KEY headers to mark high-priority joints.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Mesh3doNodeType: u32 {
        const TORSO = 0x01;
        const LEFT_ARM = 0x02;
        const RIGHT_ARM = 0x04;
        const HEAD = 0x08;
        const HIP = 0x10;
        const LEFT_LEG = 0x20;
        const RIGHT_LEG = 0x40;
        const LEFT_HAND = 0x80;
        const RIGHT_HAND = 0x100;
        const UNKNOWN_200 = 0x200;
        const VEHICLE = 0x400;
        const BACK_PART = 0x800;
        const FRONT_PART = 0x1000;
        const UNKNOWN_2000 = 0x2000;
        const UNKNOWN_4000 = 0x4000;
        const UNKNOWN_8000 = 0x8000;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh3doFace {
    /// Index into [`Model3do::materials`], -1 for none.
    pub material_idx: i32,
    pub face_type: FaceType,
    pub geometry_mode: GeometryMode,
    pub light_mode: LightMode,
    pub texture_mode: TextureMode,
    /// Extra light color (RGBA).
    pub color: Vector4f,
    pub vertex_idxs: Vec<i32>,
    pub uv_idxs: Vec<i32>,
    pub normal: Vector3f,
}

impl Default for Mesh3doFace {
    fn default() -> Self {
        Self {
            material_idx: -1,
            face_type: FaceType::empty(),
            geometry_mode: GeometryMode::default(),
            light_mode: LightMode::default(),
            texture_mode: TextureMode::default(),
            color: Vector4f::new(0.0, 0.0, 0.0, 0.0),
            vertex_idxs: Vec::new(),
            uv_idxs: Vec::new(),
            normal: Vector3f::new(0.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh3do {
    pub idx: i32,
    pub name: String,
    pub radius: f32,
    pub geometry_mode: GeometryMode,
    pub light_mode: LightMode,
    pub texture_mode: TextureMode,
    pub vertices: Vec<Vector3f>,
    pub vertex_colors: Vec<Vector4f>,
    pub normals: Vec<Vector3f>,
    pub uvs: Vec<Vector2f>,
    pub faces: Vec<Mesh3doFace>,
}

impl Mesh3do {
    pub fn new(idx: i32, name: impl Into<String>) -> Self {
        Self {
            idx,
            name: name.into(),
            radius: 0.0,
            geometry_mode: GeometryMode::default(),
            light_mode: LightMode::default(),
            texture_mode: TextureMode::default(),
            vertices: Vec::new(),
            vertex_colors: Vec::new(),
            normals: Vec::new(),
            uvs: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Furthest vertex distance from the mesh origin.
    pub fn compute_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.magnitude())
            .fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model3doGeoSet {
    pub meshes: Vec<Mesh3do>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh3doNode {
    pub idx: i32,
    pub flags: Mesh3doNodeFlags,
    pub node_type: Mesh3doNodeType,
    pub name: String,
    pub mesh_idx: i32,
    pub parent_idx: i32,
    pub first_child_idx: i32,
    pub sibling_idx: i32,
    pub num_children: i32,
    pub position: Vector3f,
    /// (pitch, yaw, roll) in degrees.
    pub rotation: Vector3f,
    pub pivot: Vector3f,
}

impl Mesh3doNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            idx: -1,
            flags: Mesh3doNodeFlags::empty(),
            node_type: Mesh3doNodeType::empty(),
            name: name.into(),
            mesh_idx: -1,
            parent_idx: -1,
            first_child_idx: -1,
            sibling_idx: -1,
            num_children: 0,
            position: Vector3f::new(0.0, 0.0, 0.0),
            rotation: Vector3f::new(0.0, 0.0, 0.0),
            pivot: Vector3f::new(0.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model3do {
    pub name: String,
    pub materials: Vec<String>,
    pub radius: f32,
    pub insert_offset: Vector3f,
    pub geosets: Vec<Model3doGeoSet>,
    pub hierarchy: Vec<Mesh3doNode>,
}

impl Model3do {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            materials: Vec::new(),
            radius: 0.0,
            insert_offset: Vector3f::new(0.0, 0.0, 0.0),
            geosets: Vec::new(),
            hierarchy: Vec::new(),
        }
    }

    pub fn mesh(&self, geoset: usize, mesh_idx: i32) -> Option<&Mesh3do> {
        let idx = usize::try_from(mesh_idx).ok()?;
        self.geosets.get(geoset)?.meshes.get(idx)
    }

    pub fn mesh_count(&self) -> usize {
        self.geosets.iter().map(|g| g.meshes.len()).sum()
    }

    /// Half the diagonal of the bounding box of every mesh vertex in every geoset.
    pub fn compute_radius(&self) -> f32 {
        let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);
        let mut any = false;
        for v in self
            .geosets
            .iter()
            .flat_map(|g| g.meshes.iter())
            .flat_map(|m| m.vertices.iter())
        {
            any = true;
            min.x = min.x.min(v.x);
            min.y = min.y.min(v.y);
            min.z = min.z.min(v.z);
            max.x = max.x.max(v.x);
            max.y = max.y.max(v.y);
            max.z = max.z.max(v.z);
        }
        if !any {
            return 0.0;
        }
        (max - min).magnitude() / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::FlagsExt;

    #[test]
    fn version_from_float() {
        assert_eq!(Model3doFileVersion::from_f32(2.2), Some(Model3doFileVersion::Version2_2));
        assert_eq!(Model3doFileVersion::from_f32(2.0), None);
        assert_eq!("2.3".parse::<Model3doFileVersion>(), Ok(Model3doFileVersion::Version2_3));
        assert!("3.0".parse::<Model3doFileVersion>().is_err());
    }

    #[test]
    fn mode_codes() {
        assert_eq!(LightMode::from_i64(6), Some(LightMode::GfUnknown6));
        assert_eq!(LightMode::from_i64(4), None);
        assert_eq!(GeometryMode::from_i64(4), Some(GeometryMode::Texture));
        assert_eq!(TextureMode::from_i64(5), None);
    }

    #[test]
    fn node_type_names() {
        let t = Mesh3doNodeType::from_hex("0x0C00").expect("hex");
        let names = t.to_name_set();
        assert!(names.contains("VEHICLE"));
        assert!(names.contains("BACK_PART"));
        assert_eq!(Mesh3doNodeType::from_name_set(names), t);
    }

    #[test]
    fn radius_computation() {
        let mut mesh = Mesh3do::new(0, "box");
        mesh.vertices = vec![Vector3f::new(-1.0, 0.0, 0.0), Vector3f::new(3.0, 4.0, 0.0)];
        assert_eq!(mesh.compute_radius(), 5.0);

        let mut model = Model3do::new("m.3do");
        model.geosets.push(Model3doGeoSet { meshes: vec![mesh] });
        // bbox is (-1,0,0)..(3,4,0): diagonal sqrt(16+16)
        assert!((model.compute_radius() - (32f32).sqrt() / 2.0).abs() < 1e-6);
        assert_eq!(Model3do::new("empty").compute_radius(), 0.0);
    }
}
