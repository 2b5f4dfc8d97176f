//! # AR Placement Library
//!
//! This library implements the controller of an augmented-reality "place an object on a detected
//! surface" experience. While an immersive session runs, a reticle tracks the first surface hit
//! along the viewer's forward ray, and every select input places a new object where the reticle is.
//! The controller is written against small device traits so it can be driven by the browser's
//! WebXR API or by fakes in tests; rendering goes through `wgpu` and the overlay through `egui`.
//!
//! ## Modules
//!
//! - [`app`]: Window, renderer and GUI setup with `winit`, plus the "Start AR" affordance.
//! - [`frame_loop`]: The per-frame driver that ties the parts below together.
//! - [`session`]: Reacts to an immersive session starting and ending.
//! - [`hit_test`]: Acquires the hit-test source of a session and polls it every frame.
//! - [`reticle`]: Follows the first hit-test result.
//! - [`placement`]: Places objects on select.
//! - [`panel`]: The camera-attached status panel.
//! - [`scene`]: A small scene graph of cameras, meshes and panels.
//! - [`xr`]: Device traits for sessions, frames, hit-test sources and results.
//! - [`pose`]: Rigid transforms delivered by the device.
//! - [`config`]: Session features and object templates.
//! - [`error`]: The crate's error type.
//! - [`renderer`], [`gpu`], [`vertex`], [`uniform_buffer`], [`uniform_binding`]: The `wgpu`
//!   implementation of [`SceneRenderer`].
//!
//! ## Constants
//!
//! ### [`CANVAS_ID`]
//!
//! Id of the page's canvas element on the web. The window renders into it, and the immersive
//! session's base layer is created from its WebGL2 context.
//!
//! ### [`SHADER_SOURCE`]
//!
//! The WGSL mesh shader. Each draw binds one uniform holding a model-view-projection matrix and
//! a color that tints the per-vertex shade.
//!
//! ## Usage
//!
//! 1. **Configure**: Build an [`ArConfig`], or take the default (`hit-test` required,
//!    `dom-overlay` optional).
//! 2. **Create the Controller**: [`FrameLoop::new`] builds the reticle, the hit-test feed and the
//!    placement action into an [`ArContext`].
//! 3. **Forward Events**: call [`FrameLoop::on_session_start`], [`FrameLoop::on_select`] and
//!    [`FrameLoop::on_session_end`] from the session's callbacks.
//! 4. **Drive Frames**: call [`FrameLoop::on_frame`] once per animation frame.
//!
//! ```ignore
//! let mut frame_loop = FrameLoop::new(ArContext::new(), &ArConfig::default(), spawner);
//! frame_loop.on_session_start(session, tracking_space);
//! frame_loop.on_frame(timestamp, Some(&frame), &mut renderer);
//! frame_loop.on_select();
//! ```
//!
//! ## Notes
//!
//! - The `wasm32` build needs `RUSTFLAGS="--cfg=web_sys_unstable_apis"` for the WebXR bindings.
//! - Desktop builds have no immersive device; they render the scene and the panel only.

mod app;
mod config;
mod error;
mod frame_loop;
mod gpu;
mod panel;
mod placement;
mod pose;
mod renderer;
mod reticle;
mod scene;
mod session;
mod uniform_binding;
mod uniform_buffer;
mod vertex;
pub mod xr;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use crate::app::App;
pub use crate::config::{ArConfig, DomOverlay, Feature, ObjectTemplate, SessionConfig};
pub use crate::error::{ArError, Result};
pub use crate::frame_loop::{ArContext, FrameLoop};
pub use crate::gpu::Gpu;
pub use crate::hit_test::{FeedState, HitTestFeed};
pub use crate::panel::{Panel, Status};
pub use crate::placement::Placement;
pub use crate::pose::Pose;
pub use crate::renderer::{GuiFrame, Renderer, SceneRenderer};
pub use crate::reticle::Reticle;
pub use crate::scene::{DrawItem, Geometry, Material, Node, NodeId, NodeKind, Projection, Scene};
pub use crate::session::SessionLifecycle;
pub use crate::uniform_binding::UniformBinding;
pub use crate::uniform_buffer::UniformBuffer;
pub use crate::vertex::{MeshData, Vertex};
pub use crate::xr::{
    HitTestResult, HitTestSource, ReferenceSpaceKind, SessionId, XrFrame, XrSession,
};

/// Id of the canvas element the application renders into on the web.
pub const CANVAS_ID: &str = "canvas";

/// The source code of the mesh shader, written in WGSL.
///
/// ### Uniform
///
/// - `ubo.mvp`: model-view-projection matrix of the drawn node.
/// - `ubo.color`: the node's material color.
///
/// ### Vertex Stage
///
/// `vertex_main` reads `@location(0) position` and `@location(1) color` (a per-face shade),
/// transforms the position by `mvp` and tints the shade with the material color.
///
/// ### Fragment Stage
///
/// `fragment_main` outputs the interpolated color.
pub const SHADER_SOURCE: &str = include_str!("shader_source.wgsl");

/// Initializes logging and runs the application until its window closes.
///
/// On the web this is the module's start function and hands the event loop to the browser.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen::prelude::wasm_bindgen(start))]
pub fn run() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(target_arch = "wasm32")]
    {
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));
        if let Err(error) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to initialize logger: {error}").into());
        }
    }

    let event_loop = match winit::event_loop::EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(error) => {
            log::error!("Failed to create event loop: {error}");
            return;
        }
    };
    let mut app = App::new(ArConfig::default());

    #[cfg(not(target_arch = "wasm32"))]
    if let Err(error) = event_loop.run_app(&mut app) {
        log::error!("Event loop terminated with an error: {error}");
    }

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::EventLoopExtWebSys;
        event_loop.spawn_app(app);
    }
}
