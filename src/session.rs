//! # Session Lifecycle
//!
//! Bridges the session affordance's start/end callbacks to application state. While a session
//! is active the status panel rides along as a child of the camera; when the session ends the
//! panel is taken off and the hit-test feed is reset so the next session starts clean.
//!
//! At most one session is active. Starting a new one while another is active ends the previous
//! one first.

use crate::hit_test::HitTestFeed;
use crate::panel::Panel;
use crate::scene::{NodeId, Scene};
use crate::xr::{SessionId, XrSession};

struct ActiveSession<S: XrSession> {
    session: S,
    tracking_space: S::ReferenceSpace,
}

pub struct SessionLifecycle<S: XrSession> {
    active: Option<ActiveSession<S>>,
    panel_offset: nalgebra_glm::Vec3,
}

impl<S: XrSession> SessionLifecycle<S> {
    pub fn new(panel_offset: nalgebra_glm::Vec3) -> Self {
        Self {
            active: None,
            panel_offset,
        }
    }

    pub fn session(&self) -> Option<&S> {
        self.active.as_ref().map(|active| &active.session)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session().map(XrSession::id)
    }

    /// The stable tracking space of the active session, used to place the reticle and camera.
    pub fn tracking_space(&self) -> Option<&S::ReferenceSpace> {
        self.active.as_ref().map(|active| &active.tracking_space)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(
        &mut self,
        session: S,
        tracking_space: S::ReferenceSpace,
        scene: &mut Scene,
        camera: NodeId,
        panel: &Panel,
        feed: &mut HitTestFeed<S>,
    ) {
        if let Some(previous) = self.active.as_ref() {
            log::warn!(
                "Session {} started while session {} is active; ending the old one",
                session.id(),
                previous.session.id()
            );
            previous.session.end();
            self.end(scene, panel, feed);
        }

        panel.set_position(scene, self.panel_offset);
        scene.attach(camera, panel.node());
        log::info!("AR session {} started", session.id());
        self.active = Some(ActiveSession {
            session,
            tracking_space,
        });
    }

    /// Tears down the active session's state. Safe to call when no session is active.
    pub fn end(&mut self, scene: &mut Scene, panel: &Panel, feed: &mut HitTestFeed<S>) {
        match self.active.take() {
            Some(active) => log::info!("AR session {} ended", active.session.id()),
            None => log::debug!("Session end without an active session"),
        }
        scene.detach(panel.node());
        feed.reset();
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::LocalPool;

    use super::*;
    use crate::hit_test::FeedState;
    use crate::scene::Projection;
    use crate::xr::testing::FakeSession;

    struct Fixture {
        scene: Scene,
        camera: NodeId,
        panel: Panel,
        feed: HitTestFeed<FakeSession>,
        lifecycle: SessionLifecycle<FakeSession>,
    }

    fn fixture() -> Fixture {
        let mut scene = Scene::new();
        let camera = scene.create_camera(Projection::default());
        scene.add(camera);
        let panel = Panel::new(&mut scene);
        Fixture {
            scene,
            camera,
            panel,
            feed: HitTestFeed::new(),
            lifecycle: SessionLifecycle::new(nalgebra_glm::vec3(0.0, 0.0, -1.0)),
        }
    }

    #[test]
    fn test_start_attaches_panel_to_camera() {
        let mut f = fixture();
        let session = FakeSession::new();
        let space = session.tracking_space();

        f.lifecycle
            .start(session.clone(), space, &mut f.scene, f.camera, &f.panel, &mut f.feed);

        assert!(f.lifecycle.is_active());
        assert_eq!(f.lifecycle.session_id(), Some(session.id()));
        assert_eq!(f.scene.parent(f.panel.node()), Some(f.camera));
        assert_eq!(
            f.scene.matrix(f.panel.node()),
            &nalgebra_glm::translation(&nalgebra_glm::vec3(0.0, 0.0, -1.0))
        );
    }

    #[test]
    fn test_end_detaches_panel_and_resets_feed() {
        let mut f = fixture();
        let pool = LocalPool::new();
        let session = FakeSession::new();
        f.lifecycle.start(
            session.clone(),
            session.tracking_space(),
            &mut f.scene,
            f.camera,
            &f.panel,
            &mut f.feed,
        );
        f.feed.request(&session, &pool.spawner());
        assert_eq!(f.feed.state(), FeedState::Requesting);

        f.lifecycle.end(&mut f.scene, &f.panel, &mut f.feed);

        assert!(!f.lifecycle.is_active());
        assert!(f.lifecycle.tracking_space().is_none());
        assert_eq!(f.scene.parent(f.panel.node()), None);
        assert_eq!(f.feed.state(), FeedState::Idle);
        assert_eq!(f.feed.session(), None);
    }

    #[test]
    fn test_restart_ends_previous_session() {
        let mut f = fixture();
        let first = FakeSession::new();
        let second = FakeSession::new();

        f.lifecycle.start(
            first.clone(),
            first.tracking_space(),
            &mut f.scene,
            f.camera,
            &f.panel,
            &mut f.feed,
        );
        f.lifecycle.start(
            second.clone(),
            second.tracking_space(),
            &mut f.scene,
            f.camera,
            &f.panel,
            &mut f.feed,
        );

        assert_eq!(first.end_requests(), 1);
        assert_eq!(second.end_requests(), 0);
        assert_eq!(f.lifecycle.session_id(), Some(second.id()));
        assert_eq!(f.scene.parent(f.panel.node()), Some(f.camera));
    }

    #[test]
    fn test_end_without_session_is_harmless() {
        let mut f = fixture();
        f.lifecycle.end(&mut f.scene, &f.panel, &mut f.feed);
        assert!(!f.lifecycle.is_active());
        assert_eq!(f.feed.state(), FeedState::Idle);
    }
}
