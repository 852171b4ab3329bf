//! Export-direction construction of a [`Model3do`].
//!
//! Vertices are deduplicated by (position, color) and texture vertices by
//! value while faces are added, so the writer can emit the arrays verbatim.

use crate::error::{Result, SithError};
use crate::math::{Vector2f, Vector3f, Vector4f};
use crate::validation::assert_name;
use crate::validation::limits::MIN_FACE_VERTICES;

use super::{
    GeometryMode, LightMode, Mesh3do, Mesh3doFace, Mesh3doNode, Model3do, Model3doGeoSet,
    TextureMode,
};

pub const DEFAULT_VERTEX_COLOR: Vector4f = Vector4f::new(0.0, 0.0, 0.0, 1.0);

/// One polygon corner as the source geometry describes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCorner {
    pub position: Vector3f,
    pub color: Vector4f,
    pub normal: Vector3f,
    /// Source UV with V pointing up; it is stored flipped.
    pub uv: Vector2f,
}

#[derive(Debug, Clone)]
pub struct MeshBuilder {
    mesh: Mesh3do,
}

impl MeshBuilder {
    pub fn new(name: &str) -> Result<Self> {
        assert_name(name)?;
        let mut mesh = Mesh3do::new(0, name);
        mesh.geometry_mode = GeometryMode::Texture;
        mesh.light_mode = LightMode::Gouraud;
        mesh.texture_mode = TextureMode::PerspectiveCorrected;
        Ok(Self { mesh })
    }

    pub fn modes(mut self, geometry: GeometryMode, light: LightMode, texture: TextureMode) -> Self {
        self.mesh.geometry_mode = geometry;
        self.mesh.light_mode = light;
        self.mesh.texture_mode = texture;
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.mesh.radius = radius;
        self
    }

    /// Returns the index of an identical (position, color) vertex, appending one if needed.
    pub fn add_vertex(&mut self, position: Vector3f, color: Vector4f, normal: Vector3f) -> i32 {
        let existing = self
            .mesh
            .vertices
            .iter()
            .zip(&self.mesh.vertex_colors)
            .position(|(v, c)| *v == position && *c == color);
        if let Some(idx) = existing {
            return idx as i32;
        }
        self.mesh.vertices.push(position);
        self.mesh.vertex_colors.push(color);
        self.mesh.normals.push(normal);
        (self.mesh.vertices.len() - 1) as i32
    }

    /// Stores `(u, -v)` and returns its index, reusing an equal entry.
    pub fn add_uv(&mut self, uv: Vector2f) -> i32 {
        let flipped = Vector2f::new(uv.x, -uv.y);
        if let Some(idx) = self.mesh.uvs.iter().position(|t| *t == flipped) {
            return idx as i32;
        }
        self.mesh.uvs.push(flipped);
        (self.mesh.uvs.len() - 1) as i32
    }

    /// Adds a face built from `template` properties and the given corners.
    ///
    /// Any vertex/UV indices already on the template are replaced.
    pub fn add_face(&mut self, template: Mesh3doFace, corners: &[FaceCorner]) -> Result<usize> {
        if corners.len() < MIN_FACE_VERTICES {
            return Err(SithError::invalid_format(
                "3DO",
                format!(
                    "face {} of mesh '{}' has {} corners",
                    self.mesh.faces.len(),
                    self.mesh.name,
                    corners.len()
                ),
            ));
        }

        let mut face = Mesh3doFace {
            vertex_idxs: Vec::with_capacity(corners.len()),
            uv_idxs: Vec::with_capacity(corners.len()),
            ..template
        };
        for corner in corners {
            face.vertex_idxs
                .push(self.add_vertex(corner.position, corner.color, corner.normal));
            face.uv_idxs.push(self.add_uv(corner.uv));
        }
        self.mesh.faces.push(face);
        Ok(self.mesh.faces.len() - 1)
    }

    /// Finishes the mesh. A zero radius is replaced by the computed one.
    pub fn build(mut self) -> Mesh3do {
        if self.mesh.radius == 0.0 {
            self.mesh.radius = self.mesh.compute_radius();
        }
        self.mesh
    }
}

/// Node description for [`Model3doBuilder::add_node`].
#[derive(Debug, Clone)]
pub struct NodeDesc {
    pub node: Mesh3doNode,
    /// Position in the builder's node list of the parent node.
    pub parent: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Model3doBuilder {
    model: Model3do,
}

impl Model3doBuilder {
    pub fn new(name: &str) -> Result<Self> {
        assert_name(name)?;
        let mut model = Model3do::new(name);
        model.geosets.push(Model3doGeoSet::default());
        Ok(Self { model })
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.model.radius = radius;
        self
    }

    pub fn insert_offset(mut self, offset: Vector3f) -> Self {
        self.model.insert_offset = offset;
        self
    }

    /// Registers a material file name and returns its index.
    ///
    /// A missing `.mat` extension is appended with a warning.
    pub fn add_material(&mut self, name: &str) -> Result<i32> {
        let mut name = name.to_string();
        if !name.to_lowercase().ends_with(".mat") {
            tracing::warn!("adding an extension '.mat' to the material file name '{}'", name);
            name.push_str(".mat");
        }
        if let Some(idx) = self.model.materials.iter().position(|m| *m == name) {
            return Ok(idx as i32);
        }
        assert_name(&name)?;
        self.model.materials.push(name);
        Ok((self.model.materials.len() - 1) as i32)
    }

    pub fn material_index(&self, name: &str) -> Option<i32> {
        self.model
            .materials
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .map(|i| i as i32)
    }

    /// Adds a mesh to geoset 0 and returns its mesh index.
    pub fn add_mesh(&mut self, mesh: MeshBuilder) -> i32 {
        let meshes = &mut self.model.geosets[0].meshes;
        let mut mesh = mesh.build();
        let idx = meshes.len() as i32;
        mesh.idx = idx;
        meshes.push(mesh);
        idx
    }

    /// Appends a hierarchy node and links it under `desc.parent`, as the first
    /// child or after the parent's last child. Returns the node's list position.
    pub fn add_node(&mut self, desc: NodeDesc) -> Result<usize> {
        assert_name(&desc.node.name)?;
        let nodes = &mut self.model.hierarchy;
        let node_pos = nodes.len();

        let mut node = desc.node;
        node.first_child_idx = -1;
        node.sibling_idx = -1;
        node.num_children = 0;
        node.parent_idx = -1;

        if let Some(parent) = desc.parent {
            if parent >= node_pos {
                return Err(SithError::InvalidHierarchy(format!(
                    "parent {} of node '{}' has not been added",
                    parent, node.name
                )));
            }
            node.parent_idx = parent as i32;

            match usize::try_from(nodes[parent].first_child_idx) {
                Err(_) => nodes[parent].first_child_idx = node_pos as i32,
                Ok(first) => {
                    let mut last = first;
                    let mut steps = 0;
                    while let Ok(next) = usize::try_from(nodes[last].sibling_idx) {
                        steps += 1;
                        if steps > node_pos {
                            return Err(SithError::InvalidHierarchy(format!(
                                "sibling chain under node {} loops",
                                parent
                            )));
                        }
                        last = next;
                    }
                    nodes[last].sibling_idx = node_pos as i32;
                }
            }
            nodes[parent].num_children += 1;
        }

        if node.idx < 0 {
            node.idx = node_pos as i32;
        }
        nodes.push(node);
        Ok(node_pos)
    }

    /// Reorders nodes by sequence number and fills in a missing model radius.
    pub fn build(mut self) -> Model3do {
        if self.model.radius == 0.0 {
            self.model.radius = self.model.compute_radius();
        }
        self.model.reorder_nodes();
        self.model
    }
}
