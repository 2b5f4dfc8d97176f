//! # Placement
//!
//! Turns a discrete "select" input into a persistent object in the world. Every select made
//! while the reticle is visible places a new object at the reticle's pose; selects made while
//! it is hidden do nothing. Placed objects are handed to the scene graph and accumulate.

use crate::config::ObjectTemplate;
use crate::reticle::Reticle;
use crate::scene::{NodeId, Scene};

#[derive(Debug, Clone)]
pub struct Placement {
    template: ObjectTemplate,
    placed: Vec<NodeId>,
}

impl Placement {
    pub fn new(template: ObjectTemplate) -> Self {
        Self {
            template,
            placed: Vec::new(),
        }
    }

    /// Places a new object at the reticle's current pose. Returns the new node, or `None` if
    /// the reticle is hidden.
    pub fn on_select(&mut self, reticle: &Reticle, scene: &mut Scene) -> Option<NodeId> {
        if !reticle.is_visible() {
            log::debug!("Select ignored: no surface under the reticle");
            return None;
        }

        let node = scene.create_mesh(self.template.geometry, self.template.material);
        scene.set_matrix(node, reticle.transform().matrix());
        scene.set_visible(node, true);
        scene.add(node);
        self.placed.push(node);

        let position = reticle.transform().translation();
        log::info!(
            "Placed object #{} at ({:.3}, {:.3}, {:.3})",
            self.placed.len(),
            position.x,
            position.y,
            position.z
        );
        Some(node)
    }

    pub fn placed(&self) -> &[NodeId] {
        &self.placed
    }
}
