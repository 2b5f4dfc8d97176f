//! # Application Core (`app.rs`)
//!
//! The `App` struct is the `winit` application shell around the placement controller. It owns
//! the window (or the page's canvas on the web), the renderer, the `egui` state and the shared
//! [`FrameLoop`], and turns window events into controller calls.
//!
//! ## Responsibilities
//!
//! - **Window Management**: creates the window, resizes the renderer, exits on close/Escape.
//! - **Renderer Setup**: synchronous on desktop (`pollster`), asynchronous on the web, where the
//!   renderer is delivered through a `oneshot` channel and picked up on a later event.
//! - **Session Affordance**: an `egui` window with a "Start AR" / "Stop AR" button. Starting
//!   validates the session configuration and requests an immersive session; the result arrives
//!   through a second `oneshot` channel and is handed to [`crate::web::run_session`].
//! - **Non-AR Frames**: without a session, every redraw runs [`FrameLoop::on_frame`] without a
//!   frame token, which only renders. Frames with a token come from the session's own
//!   animation loop.
//!
//! ## Platform-Specific Notes
//!
//! - **Desktop**: there is no immersive device. The controller is instantiated over
//!   [`Unavailable`](crate::xr::Unavailable) and the affordance says so.
//! - **WebAssembly**: the controller and renderer are shared with the session's callbacks as
//!   `Rc<RefCell<_>>`; every callback runs on the browser's single event loop.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    window::{Theme, Window},
};

use crate::config::ArConfig;
use crate::frame_loop::{ArContext, FrameLoop};
use crate::renderer::{GuiFrame, Renderer};
#[cfg(target_arch = "wasm32")]
use crate::xr::XrSession;

#[cfg(target_arch = "wasm32")]
type Session = crate::web::WebXrSession;
#[cfg(target_arch = "wasm32")]
type Frame = crate::web::WebXrFrame;
#[cfg(not(target_arch = "wasm32"))]
type Session = crate::xr::Unavailable;
#[cfg(not(target_arch = "wasm32"))]
type Frame = crate::xr::UnavailableFrame;

#[cfg(target_arch = "wasm32")]
type SessionStart = crate::error::Result<(crate::web::WebXrSession, crate::web::WebReferenceSpace)>;

#[cfg(not(target_arch = "wasm32"))]
const TITLE: &str = "AR Placement";
#[cfg(all(target_arch = "wasm32", feature = "webgl"))]
const TITLE: &str = "AR Placement (WebGL)";
#[cfg(all(target_arch = "wasm32", not(feature = "webgl")))]
const TITLE: &str = "AR Placement (WebGPU)";

/// What the user asked the session affordance to do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionAction {
    Start,
    Stop,
}

/// Main application structure.
///
/// # Fields
///
/// - `config`: Session and placement configuration, fixed at startup.
/// - `window`: The application window, once created.
/// - `renderer`: The `wgpu` renderer, shared with the session's animation loop on the web.
/// - `frame_loop`: The placement controller.
/// - `gui_state`: `egui` integration with the window.
/// - `started`: Origin of the millisecond timestamps handed to the controller.
/// - `renderer_receiver` / `session_receiver` (web only): results of the asynchronous renderer
///   creation and session request.
/// - `local_pool` (desktop only): runs any task the controller spawns.
/// - `last_size`: Surface size in pixels, used for the GUI screen descriptor.
pub struct App {
    config: ArConfig,
    window: Option<Arc<Window>>,
    renderer: Option<Rc<RefCell<Renderer>>>,
    frame_loop: Rc<RefCell<FrameLoop<Session>>>,
    gui_state: Option<egui_winit::State>,
    started: Instant,
    #[cfg(target_arch = "wasm32")]
    renderer_receiver: Option<futures::channel::oneshot::Receiver<crate::error::Result<Renderer>>>,
    #[cfg(target_arch = "wasm32")]
    session_receiver: Option<futures::channel::oneshot::Receiver<SessionStart>>,
    #[cfg(not(target_arch = "wasm32"))]
    local_pool: futures::executor::LocalPool,
    last_size: (u32, u32),
}

impl App {
    pub fn new(config: ArConfig) -> Self {
        #[cfg(target_arch = "wasm32")]
        let spawner: Box<dyn futures::task::LocalSpawn> = Box::new(crate::web::WebSpawner);
        #[cfg(not(target_arch = "wasm32"))]
        let local_pool = futures::executor::LocalPool::new();
        #[cfg(not(target_arch = "wasm32"))]
        let spawner: Box<dyn futures::task::LocalSpawn> = Box::new(local_pool.spawner());

        let frame_loop = FrameLoop::new(ArContext::new(), &config, spawner);
        Self {
            config,
            window: None,
            renderer: None,
            frame_loop: Rc::new(RefCell::new(frame_loop)),
            gui_state: None,
            started: Instant::now(),
            #[cfg(target_arch = "wasm32")]
            renderer_receiver: None,
            #[cfg(target_arch = "wasm32")]
            session_receiver: None,
            #[cfg(not(target_arch = "wasm32"))]
            local_pool,
            last_size: (0, 0),
        }
    }

    fn request_session(&mut self) {
        if let Err(error) = self.config.session.validate() {
            log::error!("Not requesting an AR session: {error}");
            return;
        }

        #[cfg(target_arch = "wasm32")]
        {
            let (sender, receiver) = futures::channel::oneshot::channel();
            self.session_receiver = Some(receiver);
            let config = self.config.session.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = crate::web::request_session(&config).await;
                if let Err(Ok((session, _))) = sender.send(result) {
                    log::error!("Failed to deliver AR session {}", session.id());
                    session.end();
                }
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        log::warn!("Immersive AR is not available on this platform");
    }

    fn end_session(&self) {
        if let Some(session) = self.frame_loop.borrow().session() {
            crate::xr::XrSession::end(session);
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn receive_pending(&mut self) {
        if let Some(receiver) = self.renderer_receiver.as_mut() {
            match receiver.try_recv() {
                Ok(Some(Ok(renderer))) => {
                    self.renderer = Some(Rc::new(RefCell::new(renderer)));
                    self.renderer_receiver = None;
                }
                Ok(Some(Err(error))) => {
                    log::error!("Failed to create renderer: {error}");
                    self.renderer_receiver = None;
                }
                Ok(None) => {}
                Err(_) => self.renderer_receiver = None,
            }
        }

        if let Some(receiver) = self.session_receiver.as_mut() {
            let started = match receiver.try_recv() {
                Ok(None) => return,
                Ok(Some(started)) => Some(started),
                Err(_) => None,
            };
            self.session_receiver = None;
            match (started, self.renderer.as_ref()) {
                (Some(Ok((session, tracking_space))), Some(renderer)) => crate::web::run_session(
                    self.frame_loop.clone(),
                    renderer.clone(),
                    session,
                    tracking_space,
                ),
                (Some(Ok((session, _))), None) => {
                    log::error!("AR session {} started before the renderer", session.id());
                    session.end();
                }
                (Some(Err(error)), _) => log::error!("AR session request failed: {error}"),
                (None, _) => log::error!("AR session request was dropped"),
            }
        }
    }
}

/// The "Start AR" / "Stop AR" window.
fn session_affordance(ctx: &egui::Context, active: bool) -> Option<SessionAction> {
    egui::Window::new(TITLE)
        .resizable(false)
        .show(ctx, |ui| {
            if cfg!(not(target_arch = "wasm32")) {
                ui.label("Immersive AR is not available on this platform.");
                return None;
            }
            if active {
                ui.button("Stop AR")
                    .clicked()
                    .then_some(SessionAction::Stop)
            } else {
                ui.button("Start AR")
                    .clicked()
                    .then_some(SessionAction::Start)
            }
        })
        .and_then(|response| response.inner)
        .flatten()
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut attributes = Window::default_attributes();

        #[cfg(not(target_arch = "wasm32"))]
        {
            attributes = attributes.with_title(TITLE);
        }

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let Some(canvas) = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(crate::CANVAS_ID))
                .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok())
            else {
                log::error!("No canvas #{} on the page", crate::CANVAS_ID);
                event_loop.exit();
                return;
            };
            self.last_size = (canvas.width(), canvas.height());
            log::info!("Canvas dimensions: ({} x {})", canvas.width(), canvas.height());
            attributes = attributes.with_canvas(Some(canvas));
        }

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                log::error!("Failed to create window: {error}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        let gui_context = egui::Context::default();
        #[cfg(not(target_arch = "wasm32"))]
        {
            let inner_size = window.inner_size();
            self.last_size = (inner_size.width, inner_size.height);
        }
        #[cfg(target_arch = "wasm32")]
        {
            gui_context.set_pixels_per_point(window.scale_factor() as f32);
        }

        let viewport_id = gui_context.viewport_id();
        self.gui_state = Some(egui_winit::State::new(
            gui_context,
            viewport_id,
            &window,
            Some(window.scale_factor() as _),
            Some(Theme::Dark),
            None,
        ));

        let (width, height) = self.last_size;

        #[cfg(not(target_arch = "wasm32"))]
        {
            match pollster::block_on(Renderer::new(window.clone(), width, height)) {
                Ok(renderer) => self.renderer = Some(Rc::new(RefCell::new(renderer))),
                Err(error) => {
                    log::error!("Failed to create renderer: {error}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let (sender, receiver) = futures::channel::oneshot::channel();
            self.renderer_receiver = Some(receiver);
            wasm_bindgen_futures::spawn_local(async move {
                let renderer = Renderer::new(window.clone(), width, height).await;
                if sender.send(renderer).is_err() {
                    log::error!("Failed to create and send renderer!");
                }
            });
        }

        self.started = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: winit::event::WindowEvent,
    ) {
        #[cfg(target_arch = "wasm32")]
        self.receive_pending();

        let (Some(gui_state), Some(renderer), Some(window)) = (
            self.gui_state.as_mut(),
            self.renderer.clone(),
            self.window.clone(),
        ) else {
            return;
        };

        if gui_state.on_window_event(&window, &event).consumed {
            return;
        }

        let mut action = None;
        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        ..
                    },
                ..
            } => {
                if matches!(key_code, winit::keyboard::KeyCode::Escape) {
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                log::info!("Resizing renderer surface to: ({width}, {height})");
                renderer.borrow_mut().resize(width, height);
                self.last_size = (width, height);
            }
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting...");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                let timestamp = self.started.elapsed().as_secs_f64() * 1000.0;

                let gui_input = gui_state.take_egui_input(&window);
                gui_state.egui_ctx().begin_pass(gui_input);
                {
                    let frame_loop = self.frame_loop.borrow();
                    frame_loop.show_panel(gui_state.egui_ctx());
                    action = session_affordance(gui_state.egui_ctx(), frame_loop.status().session_active);
                }
                let egui::FullOutput {
                    textures_delta,
                    shapes,
                    pixels_per_point,
                    platform_output,
                    ..
                } = gui_state.egui_ctx().end_pass();
                gui_state.handle_platform_output(&window, platform_output);
                let paint_jobs = gui_state.egui_ctx().tessellate(shapes, pixels_per_point);

                let (width, height) = self.last_size;
                renderer.borrow_mut().queue_gui(GuiFrame {
                    screen_descriptor: egui_wgpu::ScreenDescriptor {
                        size_in_pixels: [width, height],
                        pixels_per_point: window.scale_factor() as f32,
                    },
                    paint_jobs,
                    textures_delta,
                });

                // While a session runs, its animation loop renders and paints the queued GUI.
                {
                    let mut frame_loop = self.frame_loop.borrow_mut();
                    if frame_loop.session().is_none() {
                        frame_loop.on_frame(timestamp, None::<&Frame>, &mut *renderer.borrow_mut());
                    }
                }

                #[cfg(not(target_arch = "wasm32"))]
                self.local_pool.run_until_stalled();
            }
            _ => (),
        }

        match action {
            Some(SessionAction::Start) => self.request_session(),
            Some(SessionAction::Stop) => self.end_session(),
            None => {}
        }

        window.request_redraw();
    }
}
