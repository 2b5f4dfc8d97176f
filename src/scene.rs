//! # Scene
//!
//! The `scene` module provides the scene graph the placement controller mutates and the
//! renderer draws. It is a flat arena of [`Node`]s linked into a tree below a root node.
//!
//! ## Overview
//!
//! Every node has:
//!
//! - a **kind**: the root, a camera, a mesh (geometry + material), or the UI panel,
//! - a **local matrix** (`nalgebra_glm::Mat4`) relative to its parent,
//! - a **visibility flag**; an invisible node hides its whole subtree,
//! - an optional **parent** and an ordered list of **children**.
//!
//! Nodes are created detached and become part of the scene once they are attached below the
//! root, either directly with [`Scene::add`] or through another attached node with
//! [`Scene::attach`]. Detaching a node removes its subtree from the scene without destroying it,
//! which is how the status panel is taken off the camera when a session ends.
//!
//! ## Example Usage
//!
//! ```rust
//! use ar_placement_core::{Geometry, Material, Projection, Scene};
//!
//! let mut scene = Scene::new();
//! let camera = scene.create_camera(Projection::default());
//! scene.add(camera);
//!
//! let cube = scene.create_mesh(
//!     Geometry::Cuboid { size: [0.1, 0.1, 0.1] },
//!     Material { color: [1.0, 0.0, 0.0, 1.0] },
//! );
//! scene.set_position(cube, nalgebra_glm::vec3(0.0, 0.0, -1.0));
//! scene.add(cube);
//!
//! assert_eq!(scene.node_count(), 2);
//! ```

use nalgebra_glm::{Mat4, Vec3};

/// Handle to a node of a [`Scene`]. Only meaningful for the scene that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Shape of a mesh node, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// A flat annulus lying in the node's XZ plane, facing +Y.
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        segments: u32,
    },
    /// An axis-aligned box centered on the node's origin.
    Cuboid { size: [f32; 3] },
}

/// Surface appearance of a mesh node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Linear RGBA base color.
    pub color: [f32; 4],
}

/// Perspective projection parameters of a camera node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 70_f32.to_radians(),
            near: 0.01,
            far: 20.0,
        }
    }
}

impl Projection {
    /// Right-handed projection with a `[0, 1]` depth range, as wgpu expects.
    pub fn matrix(&self, aspect_ratio: f32) -> Mat4 {
        nalgebra_glm::perspective_rh_zo(aspect_ratio, self.fov_y, self.near, self.far)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    Root,
    Camera(Projection),
    Mesh {
        geometry: Geometry,
        material: Material,
    },
    /// Anchor of the 2D status panel; drawn by the GUI layer, not as geometry.
    Panel,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub matrix: Mat4,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            matrix: Mat4::identity(),
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A visible mesh ready to be drawn, with its world matrix resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub world: Mat4,
    pub geometry: Geometry,
    pub material: Material,
}

#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn create_camera(&mut self, projection: Projection) -> NodeId {
        self.insert(NodeKind::Camera(projection))
    }

    pub fn create_mesh(&mut self, geometry: Geometry, material: Material) -> NodeId {
        self.insert(NodeKind::Mesh { geometry, material })
    }

    pub fn create_panel(&mut self) -> NodeId {
        self.insert(NodeKind::Panel)
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    /// Attaches `node` directly below the root.
    pub fn add(&mut self, node: NodeId) {
        self.attach(self.root(), node);
    }

    /// Makes `child` the last child of `parent`, detaching it from any previous parent.
    ///
    /// Attaching the root, or attaching a node below itself, is ignored.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if child == self.root() || self.is_ancestor(child, parent) {
            log::warn!("Refusing to attach {child:?} below {parent:?}");
            return;
        }
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Removes `node` (and its subtree) from its parent. Detached nodes are kept for reuse.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node.0].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// True if `node` is reachable from the root.
    pub fn contains(&self, node: NodeId) -> bool {
        self.is_ancestor(self.root(), node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn matrix(&self, node: NodeId) -> &Mat4 {
        &self.nodes[node.0].matrix
    }

    pub fn set_matrix(&mut self, node: NodeId, matrix: &Mat4) {
        self.nodes[node.0].matrix = *matrix;
    }

    /// Replaces the node's local matrix with a pure translation.
    pub fn set_position(&mut self, node: NodeId, position: Vec3) {
        self.nodes[node.0].matrix = nalgebra_glm::translation(&position);
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.nodes[node.0].visible
    }

    pub fn set_visible(&mut self, node: NodeId, visible: bool) {
        self.nodes[node.0].visible = visible;
    }

    /// Number of nodes in the scene, not counting the root.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            let children = &self.nodes[node.0].children;
            count += children.len();
            stack.extend(children.iter().copied());
        }
        count
    }

    /// Local-to-world matrix of `node`.
    pub fn world_matrix(&self, node: NodeId) -> Mat4 {
        let mut world = self.nodes[node.0].matrix;
        let mut current = self.nodes[node.0].parent;
        while let Some(parent) = current {
            world = self.nodes[parent.0].matrix * world;
            current = self.nodes[parent.0].parent;
        }
        world
    }

    /// Projection and view matrices of a camera node, or `None` if `camera` is not a camera.
    pub fn view_projection(&self, camera: NodeId, aspect_ratio: f32) -> Option<Mat4> {
        let NodeKind::Camera(projection) = self.nodes[camera.0].kind else {
            return None;
        };
        let view = self
            .world_matrix(camera)
            .try_inverse()
            .unwrap_or_else(Mat4::identity);
        Some(projection.matrix(aspect_ratio) * view)
    }

    /// Every mesh reachable from the root through visible nodes, in tree order.
    pub fn draw_items(&self) -> Vec<DrawItem> {
        let mut items = Vec::new();
        let mut stack = vec![(self.root(), Mat4::identity())];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &self.nodes[id.0];
            if !node.visible {
                continue;
            }
            let world = parent_world * node.matrix;
            if let NodeKind::Mesh { geometry, material } = node.kind {
                items.push(DrawItem {
                    node: id,
                    world,
                    geometry,
                    material,
                });
            }
            stack.extend(node.children.iter().rev().map(|child| (*child, world)));
        }
        items
    }
}
