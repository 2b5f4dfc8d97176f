//! # WebXR Bindings
//!
//! Implements the device traits of [`crate::xr`] over the browser's WebXR API and wires a
//! running immersive session to the [`FrameLoop`]:
//!
//! - [`request_session`] asks the browser for an `immersive-ar` session with the configured
//!   features, gives it a base layer backed by the canvas' WebGL2 context, and resolves the
//!   `local` tracking space.
//! - [`run_session`] hands the session to the controller and installs the session's `end` and
//!   `select` handlers and its animation loop.
//!
//! Rejected promises are converted into [`ArError`]s here. The WebXR bindings of `web-sys` are
//! unstable; the crate must be built with `RUSTFLAGS="--cfg=web_sys_unstable_apis"` for
//! `wasm32`. `web-sys` has no bindings for the WebXR Hit Test module, so the few entry points
//! used here are imported directly.

use std::cell::RefCell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::task::{LocalFutureObj, LocalSpawn, SpawnError};
use futures::FutureExt;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::config::SessionConfig;
use crate::error::{ArError, Result};
use crate::frame_loop::FrameLoop;
use crate::pose::Pose;
use crate::renderer::Renderer;
use crate::xr::{HitTestResult, HitTestSource, ReferenceSpaceKind, SessionId, XrFrame, XrSession};
use crate::CANVAS_ID;

#[wasm_bindgen]
extern "C" {
    /// `XRSession`, seen through its hit-test extension.
    #[wasm_bindgen(js_name = XRSession)]
    type HitTestSession;

    #[wasm_bindgen(method, js_name = requestHitTestSource)]
    fn request_hit_test_source(this: &HitTestSession, options: &js_sys::Object) -> js_sys::Promise;

    /// `XRFrame`, seen through its hit-test extension.
    #[wasm_bindgen(js_name = XRFrame)]
    type HitTestFrame;

    #[wasm_bindgen(method, js_name = getHitTestResults)]
    fn get_hit_test_results(this: &HitTestFrame, source: &XrHitTestSource) -> js_sys::Array;

    #[wasm_bindgen(js_name = XRHitTestSource)]
    type XrHitTestSource;

    #[wasm_bindgen(method)]
    fn cancel(this: &XrHitTestSource);

    #[wasm_bindgen(js_name = XRHitTestResult)]
    type XrHitTestResult;

    #[wasm_bindgen(method, js_name = getPose)]
    fn get_pose(this: &XrHitTestResult, base_space: &web_sys::XrSpace) -> Option<web_sys::XrPose>;
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Spawns futures on the browser's microtask queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSpawner;

impl LocalSpawn for WebSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> std::result::Result<(), SpawnError> {
        wasm_bindgen_futures::spawn_local(future);
        Ok(())
    }
}

#[derive(Clone)]
pub struct WebReferenceSpace(web_sys::XrReferenceSpace);

pub struct WebHitTestSource(XrHitTestSource);

impl HitTestSource for WebHitTestSource {
    fn cancel(&self) {
        self.0.cancel();
    }
}

#[derive(Clone)]
pub struct WebXrSession {
    id: SessionId,
    inner: web_sys::XrSession,
}

fn reference_space_type(kind: ReferenceSpaceKind) -> web_sys::XrReferenceSpaceType {
    match kind {
        ReferenceSpaceKind::Viewer => web_sys::XrReferenceSpaceType::Viewer,
        ReferenceSpaceKind::Local => web_sys::XrReferenceSpaceType::Local,
        ReferenceSpaceKind::LocalFloor => web_sys::XrReferenceSpaceType::LocalFloor,
    }
}

async fn reference_space(
    promise: js_sys::Promise,
    kind: ReferenceSpaceKind,
) -> Result<WebReferenceSpace> {
    let value = JsFuture::from(promise)
        .await
        .map_err(|error| ArError::ReferenceSpace(format!("{}: {}", kind.as_str(), describe(&error))))?;
    value
        .dyn_into::<web_sys::XrReferenceSpace>()
        .map(WebReferenceSpace)
        .map_err(|_| ArError::ReferenceSpace(format!("{} did not resolve to a space", kind.as_str())))
}

impl XrSession for WebXrSession {
    type ReferenceSpace = WebReferenceSpace;
    type HitTestSource = WebHitTestSource;

    fn id(&self) -> SessionId {
        self.id
    }

    fn request_reference_space(
        &self,
        kind: ReferenceSpaceKind,
    ) -> LocalBoxFuture<'static, Result<WebReferenceSpace>> {
        let promise = self.inner.request_reference_space(reference_space_type(kind));
        reference_space(promise, kind).boxed_local()
    }

    fn request_hit_test_source(
        &self,
        space: &WebReferenceSpace,
    ) -> LocalBoxFuture<'static, Result<WebHitTestSource>> {
        let promise = hit_test_options(&space.0).map(|options| {
            self.inner
                .unchecked_ref::<HitTestSession>()
                .request_hit_test_source(&options)
        });
        async move {
            let value = JsFuture::from(promise?)
                .await
                .map_err(|error| ArError::HitTestSource(describe(&error)))?;
            value
                .dyn_into::<XrHitTestSource>()
                .map(WebHitTestSource)
                .map_err(|_| ArError::HitTestSource("did not resolve to a source".to_string()))
        }
        .boxed_local()
    }

    fn end(&self) {
        let id = self.id;
        let promise = self.inner.end();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(error) = JsFuture::from(promise).await {
                log::warn!("Failed to end session {id}: {}", describe(&error));
            }
        });
    }
}

pub struct WebHitTestResult(XrHitTestResult);

fn pose_of(pose: &web_sys::XrPose) -> Option<Pose> {
    Pose::from_slice(&pose.transform().matrix())
}

impl HitTestResult<WebReferenceSpace> for WebHitTestResult {
    fn pose(&self, space: &WebReferenceSpace) -> Option<Pose> {
        pose_of(&self.0.get_pose(&space.0)?)
    }
}

/// The frame token of one WebXR animation frame. Only valid during that frame's callback.
pub struct WebXrFrame {
    inner: web_sys::XrFrame,
}

impl XrFrame for WebXrFrame {
    type Session = WebXrSession;
    type HitTestResult = WebHitTestResult;

    fn hit_test_results(&self, source: &WebHitTestSource) -> Vec<WebHitTestResult> {
        self.inner
            .unchecked_ref::<HitTestFrame>()
            .get_hit_test_results(&source.0)
            .iter()
            .map(|value| WebHitTestResult(value.unchecked_into()))
            .collect()
    }

    fn viewer_pose(&self, space: &WebReferenceSpace) -> Option<Pose> {
        pose_of(&self.inner.get_viewer_pose(&space.0)?)
    }
}

/// The `XRHitTestOptionsInit` dictionary `{ space }`.
fn hit_test_options(space: &JsValue) -> Result<js_sys::Object> {
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &JsValue::from_str("space"), space)
        .map_err(|error| ArError::HitTestSource(describe(&error)))?;
    Ok(options)
}

fn feature_list(names: &[&str]) -> js_sys::Array {
    names.iter().map(|name| JsValue::from_str(name)).collect()
}

/// Requests an `immersive-ar` session described by `config`.
///
/// # Errors
///
/// - [`ArError::Configuration`] if `config` is invalid, or a required overlay root does not exist,
/// - [`ArError::Unsupported`] if the page has no WebXR or no canvas to render from,
/// - [`ArError::SessionRequest`] if the browser refuses the session,
/// - [`ArError::ReferenceSpace`] if the session cannot provide a `local` space.
pub async fn request_session(config: &SessionConfig) -> Result<(WebXrSession, WebReferenceSpace)> {
    let window =
        web_sys::window().ok_or_else(|| ArError::Unsupported("no browser window".to_string()))?;
    let document = window
        .document()
        .ok_or_else(|| ArError::Unsupported("no document".to_string()))?;

    let overlay_root = config
        .dom_overlay
        .as_ref()
        .and_then(|overlay| document.get_element_by_id(&overlay.root));
    let config = config.for_page(overlay_root.is_some())?;

    let init = web_sys::XrSessionInit::new();
    init.set_required_features(&feature_list(&config.required_feature_names()));
    init.set_optional_features(&feature_list(&config.optional_feature_names()));
    if let (Some(_), Some(root)) = (&config.dom_overlay, &overlay_root) {
        let dom_overlay = js_sys::Object::new();
        js_sys::Reflect::set(&dom_overlay, &JsValue::from_str("root"), root)
            .and_then(|_| js_sys::Reflect::set(&init, &JsValue::from_str("domOverlay"), &dom_overlay))
            .map_err(|error| ArError::Configuration(describe(&error)))?;
    }

    let promise = window
        .navigator()
        .xr()
        .request_session_with_options(web_sys::XrSessionMode::ImmersiveAr, &init);
    let session = JsFuture::from(promise)
        .await
        .map_err(|error| ArError::SessionRequest(describe(&error)))?
        .dyn_into::<web_sys::XrSession>()
        .map_err(|_| ArError::SessionRequest("did not resolve to a session".to_string()))?;

    let prepared = async {
        attach_base_layer(&document, &session).await?;
        reference_space(
            session.request_reference_space(web_sys::XrReferenceSpaceType::Local),
            ReferenceSpaceKind::Local,
        )
        .await
    };
    let session = WebXrSession {
        id: SessionId::next(),
        inner: session.clone(),
    };
    match prepared.await {
        Ok(tracking_space) => Ok((session, tracking_space)),
        Err(error) => {
            session.end();
            Err(error)
        }
    }
}

async fn attach_base_layer(document: &web_sys::Document, session: &web_sys::XrSession) -> Result<()> {
    let canvas = document
        .get_element_by_id(CANVAS_ID)
        .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok())
        .ok_or_else(|| ArError::Unsupported(format!("no canvas #{CANVAS_ID}")))?;
    let context = canvas
        .get_context("webgl2")
        .map_err(|error| ArError::Unsupported(describe(&error)))?
        .and_then(|context| context.dyn_into::<web_sys::WebGl2RenderingContext>().ok())
        .ok_or_else(|| ArError::Unsupported("canvas has no WebGL2 context".to_string()))?;

    JsFuture::from(context.make_xr_compatible())
        .await
        .map_err(|error| ArError::Unsupported(format!("WebGL2 context is not XR compatible: {}", describe(&error))))?;
    let layer = web_sys::XrWebGlLayer::new_with_web_gl2_rendering_context(session, &context)
        .map_err(|error| ArError::SessionRequest(describe(&error)))?;

    let render_state = web_sys::XrRenderStateInit::new();
    render_state.set_base_layer(Some(&layer));
    session.update_render_state_with_state(&render_state);
    Ok(())
}

/// Starts driving `frame_loop` from `session`.
///
/// The session's handlers hold clones of `frame_loop` and `renderer` and are released when the
/// page goes away; the animation loop stops requesting frames once the session is no longer the
/// controller's active one.
pub fn run_session(
    frame_loop: Rc<RefCell<FrameLoop<WebXrSession>>>,
    renderer: Rc<RefCell<Renderer>>,
    session: WebXrSession,
    tracking_space: WebReferenceSpace,
) {
    let id = session.id();
    let inner = session.inner.clone();
    frame_loop
        .borrow_mut()
        .on_session_start(session, tracking_space);

    let on_end = {
        let frame_loop = frame_loop.clone();
        Closure::<dyn FnMut()>::new(move || frame_loop.borrow_mut().on_session_end_event(id))
    };
    inner.set_onend(Some(on_end.as_ref().unchecked_ref()));
    on_end.forget();

    let on_select = {
        let frame_loop = frame_loop.clone();
        Closure::<dyn FnMut(web_sys::XrInputSourceEvent)>::new(move |_event| {
            frame_loop.borrow_mut().on_select();
        })
    };
    inner.set_onselect(Some(on_select.as_ref().unchecked_ref()));
    on_select.forget();

    type FrameCallback = Closure<dyn FnMut(f64, web_sys::XrFrame)>;
    let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
    let next = callback.clone();
    *callback.borrow_mut() = Some(Closure::new(move |timestamp: f64, frame: web_sys::XrFrame| {
        let session = frame.session();
        {
            let mut frame_loop = frame_loop.borrow_mut();
            if frame_loop.session().map(XrSession::id) != Some(id) {
                log::debug!("Animation loop of session {id} stopped");
                return;
            }
            let frame = WebXrFrame { inner: frame };
            frame_loop.on_frame(timestamp, Some(&frame), &mut *renderer.borrow_mut());
        }
        if let Some(callback) = next.borrow().as_ref() {
            session.request_animation_frame(callback.as_ref().unchecked_ref());
        }
    }));
    if let Some(callback) = callback.borrow().as_ref() {
        inner.request_animation_frame(callback.as_ref().unchecked_ref());
    }
}

#[cfg(test)]
mod tests {
    use wasm_bindgen_test::*;

    use super::*;

    fn set(target: &js_sys::Object, key: &str, value: &JsValue) {
        js_sys::Reflect::set(target, &JsValue::from_str(key), value).expect("plain object");
    }

    fn get(target: &js_sys::Object, key: &str) -> JsValue {
        js_sys::Reflect::get(target, &JsValue::from_str(key)).expect("plain object")
    }

    #[wasm_bindgen_test]
    fn test_hit_test_options_carry_space() {
        let space = js_sys::Object::new();
        let options = hit_test_options(&space).expect("options object");
        assert_eq!(get(&options, "space"), JsValue::from(space));
    }

    #[wasm_bindgen_test]
    fn test_frame_results_come_from_get_hit_test_results() {
        let frame = js_sys::Object::new();
        let results = js_sys::Array::of2(&js_sys::Object::new(), &js_sys::Object::new());
        set(&frame, "results", &results);
        set(
            &frame,
            "getHitTestResults",
            &js_sys::Function::new_with_args("source", "return this.results;"),
        );

        let frame = WebXrFrame {
            inner: frame.unchecked_into(),
        };
        let source = WebHitTestSource(js_sys::Object::new().unchecked_into());
        assert_eq!(frame.hit_test_results(&source).len(), 2);
    }

    #[wasm_bindgen_test]
    fn test_cancel_reaches_the_source() {
        let source = js_sys::Object::new();
        set(
            &source,
            "cancel",
            &js_sys::Function::new_no_args("this.cancelled = true;"),
        );

        WebHitTestSource(source.clone().unchecked_into()).cancel();
        assert_eq!(get(&source, "cancelled"), JsValue::TRUE);
    }
}
