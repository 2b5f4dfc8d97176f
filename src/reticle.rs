//! # Reticle
//!
//! The surface indicator. Its state is a pose and a visibility flag; both are a pure
//! projection of the latest hit-test poll and have no other mutation path. The reticle
//! is created once with its scene node and is only ever toggled, never destroyed.

use crate::config::ObjectTemplate;
use crate::pose::Pose;
use crate::scene::{NodeId, Scene};
use crate::xr::HitTestResult;

#[derive(Debug, Clone)]
pub struct Reticle {
    node: NodeId,
    transform: Pose,
    visible: bool,
}

impl Reticle {
    /// Creates the reticle's mesh node from `template` and adds it to `scene`, hidden.
    pub fn new(scene: &mut Scene, template: &ObjectTemplate) -> Self {
        let node = scene.create_mesh(template.geometry, template.material);
        scene.set_visible(node, false);
        scene.add(node);
        Self {
            node,
            transform: Pose::identity(),
            visible: false,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn transform(&self) -> &Pose {
        &self.transform
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Follows the first hit result, expressed in `tracking_space`.
    ///
    /// No results, or a first result the device cannot place in `tracking_space`, hide the
    /// reticle. The transform is left as it was while hidden.
    pub fn update<R, Space>(&mut self, results: &[R], tracking_space: &Space)
    where
        R: HitTestResult<Space>,
    {
        match results.first().and_then(|hit| hit.pose(tracking_space)) {
            Some(pose) => {
                self.transform = pose;
                self.visible = true;
            }
            None => self.visible = false,
        }
    }

    /// Hides the reticle until the next hit arrives.
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Mirrors the state onto the reticle's scene node.
    pub fn sync(&self, scene: &mut Scene) {
        scene.set_visible(self.node, self.visible);
        if self.visible {
            scene.set_matrix(self.node, self.transform.matrix());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::testing::{FakeHit, FakeSession};

    fn pose(x: f32) -> Pose {
        Pose::from_translation(&nalgebra_glm::vec3(x, 0.0, -1.0))
    }

    #[test]
    fn test_starts_hidden_in_scene() {
        let mut scene = Scene::new();
        let reticle = Reticle::new(&mut scene, &ObjectTemplate::reticle());
        assert!(!reticle.is_visible());
        assert!(scene.contains(reticle.node()));
        assert!(!scene.is_visible(reticle.node()));
    }

    #[test]
    fn test_empty_results_hide() {
        let mut scene = Scene::new();
        let space = FakeSession::new().tracking_space();
        let mut reticle = Reticle::new(&mut scene, &ObjectTemplate::reticle());

        reticle.update(&[FakeHit::at(pose(1.0))], &space);
        assert!(reticle.is_visible());

        reticle.update::<FakeHit, _>(&[], &space);
        assert!(!reticle.is_visible());
        assert_eq!(*reticle.transform(), pose(1.0));
    }

    #[test]
    fn test_first_result_wins() {
        let mut scene = Scene::new();
        let space = FakeSession::new().tracking_space();
        let mut reticle = Reticle::new(&mut scene, &ObjectTemplate::reticle());

        reticle.update(
            &[FakeHit::at(pose(1.0)), FakeHit::at(pose(2.0)), FakeHit::at(pose(3.0))],
            &space,
        );

        assert!(reticle.is_visible());
        assert_eq!(*reticle.transform(), pose(1.0));
    }

    #[test]
    fn test_unplaceable_first_result_hides() {
        let mut scene = Scene::new();
        let space = FakeSession::new().tracking_space();
        let mut reticle = Reticle::new(&mut scene, &ObjectTemplate::reticle());

        reticle.update(&[FakeHit { pose: None }, FakeHit::at(pose(2.0))], &space);
        assert!(!reticle.is_visible());
    }

    #[test]
    fn test_hide_keeps_transform() {
        let mut scene = Scene::new();
        let space = FakeSession::new().tracking_space();
        let mut reticle = Reticle::new(&mut scene, &ObjectTemplate::reticle());
        reticle.update(&[FakeHit::at(pose(5.0))], &space);

        reticle.hide();

        assert!(!reticle.is_visible());
        assert_eq!(*reticle.transform(), pose(5.0));
    }

    #[test]
    fn test_sync_mirrors_onto_node() {
        let mut scene = Scene::new();
        let space = FakeSession::new().tracking_space();
        let mut reticle = Reticle::new(&mut scene, &ObjectTemplate::reticle());

        reticle.update(&[FakeHit::at(pose(4.0))], &space);
        reticle.sync(&mut scene);
        assert!(scene.is_visible(reticle.node()));
        assert_eq!(scene.matrix(reticle.node()), pose(4.0).matrix());

        reticle.update::<FakeHit, _>(&[], &space);
        reticle.sync(&mut scene);
        assert!(!scene.is_visible(reticle.node()));
    }
}
