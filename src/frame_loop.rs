//! # Frame Loop
//!
//! The [`FrameLoop`] is the placement controller. It owns the explicit application context
//! (scene, camera, status panel), the reticle, the hit-test feed, the placement action and the
//! session lifecycle, and exposes the four entry points the host drives:
//!
//! - [`FrameLoop::on_frame`], once per rendered frame,
//! - [`FrameLoop::on_select`], on a user confirmation gesture,
//! - [`FrameLoop::on_session_start`] / [`FrameLoop::on_session_end`], from the session affordance.
//!
//! ## Frame Sequencing
//!
//! A frame without a frame token (no immersive session) is only rendered. A frame with a token:
//!
//! 1. picks up a hit-test source acquisition that finished since the last frame,
//! 2. starts the acquisition if the feed is idle (fire-and-forget),
//! 3. moves the camera to the viewer pose,
//! 4. polls the feed with this frame's token and updates the reticle,
//! 5. renders.
//!
//! Nothing in a frame waits on the acquisition; while it is pending the reticle simply
//! receives no results. All entry points run on the same single-threaded event loop.

use futures::task::LocalSpawn;

use crate::config::ArConfig;
use crate::hit_test::{FeedState, HitTestFeed};
use crate::panel::{Panel, Status};
use crate::placement::Placement;
use crate::renderer::SceneRenderer;
use crate::reticle::Reticle;
use crate::scene::{NodeId, Projection, Scene};
use crate::session::SessionLifecycle;
use crate::xr::{SessionId, XrFrame, XrSession};

/// Scene, camera and status panel the controller operates on.
pub struct ArContext {
    pub scene: Scene,
    pub camera: NodeId,
    pub panel: Panel,
}

impl Default for ArContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ArContext {
    /// A scene holding a default camera and a detached status panel.
    pub fn new() -> Self {
        let mut scene = Scene::new();
        let camera = scene.create_camera(Projection::default());
        scene.add(camera);
        let panel = Panel::new(&mut scene);
        Self {
            scene,
            camera,
            panel,
        }
    }
}

pub struct FrameLoop<S: XrSession> {
    context: ArContext,
    reticle: Reticle,
    feed: HitTestFeed<S>,
    placement: Placement,
    lifecycle: SessionLifecycle<S>,
    spawner: Box<dyn LocalSpawn>,
    frames: u64,
    last_timestamp: Option<f64>,
    frame_time_ms: f64,
}

impl<S: XrSession> FrameLoop<S> {
    /// Builds the controller around `context`. `spawner` runs the hit-test source acquisition.
    pub fn new(mut context: ArContext, config: &ArConfig, spawner: Box<dyn LocalSpawn>) -> Self {
        let reticle = Reticle::new(&mut context.scene, &config.reticle);
        Self {
            context,
            reticle,
            feed: HitTestFeed::new(),
            placement: Placement::new(config.placed_object),
            lifecycle: SessionLifecycle::new(config.panel_offset),
            spawner,
            frames: 0,
            last_timestamp: None,
            frame_time_ms: 0.0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.context.scene
    }

    pub fn camera(&self) -> NodeId {
        self.context.camera
    }

    pub fn panel(&self) -> &Panel {
        &self.context.panel
    }

    pub fn reticle(&self) -> &Reticle {
        &self.reticle
    }

    pub fn feed(&self) -> &HitTestFeed<S> {
        &self.feed
    }

    pub fn session(&self) -> Option<&S> {
        self.lifecycle.session()
    }

    pub fn status(&self) -> Status {
        Status {
            session_active: self.lifecycle.is_active(),
            feed: self.feed.state(),
            reticle_visible: self.reticle.is_visible(),
            placed_objects: self.placement.placed().len(),
            frames: self.frames,
            frame_time_ms: self.frame_time_ms,
        }
    }

    pub fn on_session_start(&mut self, session: S, tracking_space: S::ReferenceSpace) {
        let ArContext {
            scene,
            camera,
            panel,
        } = &mut self.context;
        self.lifecycle
            .start(session, tracking_space, scene, *camera, panel, &mut self.feed);
        self.clear_session_state();
    }

    pub fn on_session_end(&mut self) {
        let ArContext { scene, panel, .. } = &mut self.context;
        self.lifecycle.end(scene, panel, &mut self.feed);
        self.clear_session_state();
    }

    /// Drops what belonged to the previous session: the reticle's pose lives in that
    /// session's tracking space, and frame timestamps switch clocks.
    fn clear_session_state(&mut self) {
        self.reticle.hide();
        self.reticle.sync(&mut self.context.scene);
        self.last_timestamp = None;
    }

    /// Device-reported end of session `id`. Ignored unless `id` is the active session, so the
    /// late end event of a replaced session cannot tear down its successor.
    pub fn on_session_end_event(&mut self, id: SessionId) {
        if self.lifecycle.session_id() == Some(id) {
            self.on_session_end();
        } else {
            log::debug!("Ignoring end event of inactive session {id}");
        }
    }

    /// Places a new object at the reticle if it currently marks a surface.
    pub fn on_select(&mut self) -> Option<NodeId> {
        self.placement
            .on_select(&self.reticle, &mut self.context.scene)
    }

    /// Runs one frame. `timestamp` is in milliseconds; `frame` is present only during an
    /// immersive session.
    pub fn on_frame<F, R>(&mut self, timestamp: f64, frame: Option<&F>, renderer: &mut R)
    where
        F: XrFrame<Session = S>,
        R: SceneRenderer + ?Sized,
    {
        if let Some(last) = self.last_timestamp {
            self.frame_time_ms = timestamp - last;
        }
        self.last_timestamp = Some(timestamp);
        self.frames += 1;

        if let Some(frame) = frame {
            self.advance(frame);
        }

        renderer.render(&self.context.scene, self.context.camera);
    }

    fn advance<F>(&mut self, frame: &F)
    where
        F: XrFrame<Session = S>,
    {
        let (Some(session), Some(tracking_space)) =
            (self.lifecycle.session(), self.lifecycle.tracking_space())
        else {
            log::debug!("Frame token received without an active session");
            return;
        };

        self.feed.collect();
        if self.feed.is_idle() {
            self.feed.request(session, self.spawner.as_ref());
        }

        if let Some(viewer) = frame.viewer_pose(tracking_space) {
            self.context
                .scene
                .set_matrix(self.context.camera, viewer.matrix());
        }

        if self.feed.state() == FeedState::Active {
            let results = self.feed.poll(frame);
            self.reticle.update(&results, tracking_space);
        } else {
            self.reticle.hide();
        }
        self.reticle.sync(&mut self.context.scene);
    }

    /// Draws the status panel while it is attached to the camera.
    pub fn show_panel(&self, ctx: &egui::Context) {
        if self
            .context
            .panel
            .is_attached_to(&self.context.scene, self.context.camera)
        {
            self.context.panel.show(ctx, &self.status());
        }
    }
}
