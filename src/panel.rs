//! # Status Panel
//!
//! A small 2D panel showing the controller's status. The panel owns a scene node; while that
//! node hangs below the camera the panel is shown, and it disappears as soon as the node is
//! detached. The contents are drawn with `egui` on top of the 3D scene.

use crate::hit_test::FeedState;
use crate::scene::{NodeId, Scene};

/// Snapshot of the controller state displayed by the panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    pub session_active: bool,
    pub feed: FeedState,
    pub reticle_visible: bool,
    pub placed_objects: usize,
    pub frames: u64,
    /// Time between the last two frames, in milliseconds.
    pub frame_time_ms: f64,
}

#[derive(Debug, Clone)]
pub struct Panel {
    node: NodeId,
}

impl Panel {
    /// Creates the panel's node, detached.
    pub fn new(scene: &mut Scene) -> Self {
        Self {
            node: scene.create_panel(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Sets the panel's offset relative to its parent.
    pub fn set_position(&self, scene: &mut Scene, position: nalgebra_glm::Vec3) {
        scene.set_position(self.node, position);
    }

    pub fn is_attached_to(&self, scene: &Scene, camera: NodeId) -> bool {
        scene.parent(self.node) == Some(camera)
    }

    pub fn show(&self, ctx: &egui::Context, status: &Status) {
        egui::Window::new("AR Status")
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label(hint(status));
                ui.separator();
                egui::Grid::new("ar_status").num_columns(2).show(ui, |ui| {
                    ui.label("Hit test");
                    ui.label(feed_label(status.feed));
                    ui.end_row();
                    ui.label("Placed");
                    ui.label(status.placed_objects.to_string());
                    ui.end_row();
                    ui.label("Frame");
                    ui.label(format!("{:.1} ms", status.frame_time_ms));
                    ui.end_row();
                });
            });
    }
}

fn feed_label(state: FeedState) -> &'static str {
    match state {
        FeedState::Idle => "idle",
        FeedState::Requesting => "starting",
        FeedState::Active => "tracking",
        FeedState::Failed => "unavailable",
    }
}

fn hint(status: &Status) -> &'static str {
    match (status.feed, status.reticle_visible) {
        (FeedState::Failed, _) => "Surface detection is unavailable on this device.",
        (FeedState::Active, true) => "Tap to place an object.",
        (FeedState::Active, false) => "Move your device to find a surface.",
        _ => "Starting surface detection...",
    }
}
