//! # Device Session Interfaces
//!
//! Traits describing the immersive-session device the placement controller talks to. The
//! controller never touches a concrete device API; it only needs:
//!
//! - an [`XrSession`] that can asynchronously hand out reference spaces and a hit-test source,
//! - an [`XrFrame`] (the per-frame token) that can be polled for hit-test results and the
//!   viewer pose,
//! - [`HitTestResult`]s that resolve to a [`Pose`] in a given reference space.
//!
//! On `wasm32` these are implemented over WebXR in the `web` module. Native builds have no
//! immersive device and use [`Unavailable`], an uninhabited session type, so the rest of the
//! application compiles unchanged and only ever runs the non-AR render path.
//!
//! Asynchronous requests return `LocalBoxFuture<'static, _>`: everything runs on a single
//! thread, and the futures must outlive the borrow of the session so they can be spawned.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::LocalBoxFuture;

use crate::error::Result;
use crate::pose::Pose;

/// Identity of one immersive session, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Named coordinate frames a session can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSpaceKind {
    /// Origin at the viewer; used as the origin of the hit-test ray.
    Viewer,
    /// Stable tracking space near the viewer's starting position; used for rendering.
    Local,
    LocalFloor,
}

impl ReferenceSpaceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceSpaceKind::Viewer => "viewer",
            ReferenceSpaceKind::Local => "local",
            ReferenceSpaceKind::LocalFloor => "local-floor",
        }
    }
}

/// A subscription that yields surface intersections every frame.
pub trait HitTestSource {
    /// Releases the underlying device resource. The source yields nothing afterwards.
    fn cancel(&self);
}

/// An active immersive session.
///
/// Session handles are cheap to clone; clones refer to the same device session.
pub trait XrSession: Clone + 'static {
    type ReferenceSpace: Clone + 'static;
    type HitTestSource: HitTestSource + 'static;

    fn id(&self) -> SessionId;

    fn request_reference_space(
        &self,
        kind: ReferenceSpaceKind,
    ) -> LocalBoxFuture<'static, Result<Self::ReferenceSpace>>;

    /// Requests a hit-test source casting a ray forward from the origin of `space`.
    fn request_hit_test_source(
        &self,
        space: &Self::ReferenceSpace,
    ) -> LocalBoxFuture<'static, Result<Self::HitTestSource>>;

    /// Asks the device to end the session. The device reports completion through its end event.
    fn end(&self);
}

/// One candidate surface intersection.
pub trait HitTestResult<Space> {
    /// The intersection pose expressed in `space`, if the device can relate the two.
    fn pose(&self, space: &Space) -> Option<Pose>;
}

/// The per-frame token handed out by the session's animation loop.
pub trait XrFrame {
    type Session: XrSession;
    type HitTestResult: HitTestResult<<Self::Session as XrSession>::ReferenceSpace>;

    /// Intersections for this frame, best candidate first.
    fn hit_test_results(
        &self,
        source: &<Self::Session as XrSession>::HitTestSource,
    ) -> Vec<Self::HitTestResult>;

    fn viewer_pose(&self, space: &<Self::Session as XrSession>::ReferenceSpace) -> Option<Pose>;
}

/// Session type for platforms without an immersive device. It has no values.
#[derive(Debug, Clone, Copy)]
pub enum Unavailable {}

impl HitTestSource for Unavailable {
    fn cancel(&self) {
        match *self {}
    }
}

impl XrSession for Unavailable {
    type ReferenceSpace = Unavailable;
    type HitTestSource = Unavailable;

    fn id(&self) -> SessionId {
        match *self {}
    }

    fn request_reference_space(
        &self,
        _kind: ReferenceSpaceKind,
    ) -> LocalBoxFuture<'static, Result<Self::ReferenceSpace>> {
        match *self {}
    }

    fn request_hit_test_source(
        &self,
        _space: &Self::ReferenceSpace,
    ) -> LocalBoxFuture<'static, Result<Self::HitTestSource>> {
        match *self {}
    }

    fn end(&self) {
        match *self {}
    }
}

/// Frame type paired with [`Unavailable`]; also uninhabited.
#[derive(Debug, Clone, Copy)]
pub enum UnavailableFrame {}

impl HitTestResult<Unavailable> for UnavailableFrame {
    fn pose(&self, _space: &Unavailable) -> Option<Pose> {
        match *self {}
    }
}

impl XrFrame for UnavailableFrame {
    type Session = Unavailable;
    type HitTestResult = UnavailableFrame;

    fn hit_test_results(&self, _source: &Unavailable) -> Vec<Self::HitTestResult> {
        match *self {}
    }

    fn viewer_pose(&self, _space: &Unavailable) -> Option<Pose> {
        match *self {}
    }
}

/// A scripted in-memory device used by the unit tests.
///
/// Reference spaces resolve immediately. Hit-test source requests stay pending until the test
/// calls [`FakeSession::resolve_hit_test_source`] or [`FakeSession::reject_hit_test_source`],
/// which lets tests interleave resolutions with frames and session ends.
#[cfg(test)]
pub mod testing {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use futures::channel::oneshot;
    use futures::FutureExt;

    use super::*;
    use crate::error::ArError;

    #[derive(Debug, Clone, PartialEq)]
    pub struct FakeSpace {
        pub kind: ReferenceSpaceKind,
        pub session: SessionId,
    }

    #[derive(Debug, Clone)]
    pub struct FakeSource {
        pub session: SessionId,
        cancelled: Rc<Cell<bool>>,
    }

    impl FakeSource {
        pub fn is_cancelled(&self) -> bool {
            self.cancelled.get()
        }
    }

    impl HitTestSource for FakeSource {
        fn cancel(&self) {
            self.cancelled.set(true);
        }
    }

    #[derive(Default)]
    struct FakeSessionState {
        reference_space_requests: Cell<usize>,
        hit_test_source_requests: Cell<usize>,
        reject_reference_spaces: Cell<bool>,
        pending_sources: RefCell<Vec<oneshot::Sender<Result<FakeSource>>>>,
        issued_sources: RefCell<Vec<FakeSource>>,
        end_requests: Cell<usize>,
    }

    #[derive(Clone)]
    pub struct FakeSession {
        id: SessionId,
        state: Rc<FakeSessionState>,
    }

    impl Default for FakeSession {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FakeSession {
        pub fn new() -> Self {
            Self {
                id: SessionId::next(),
                state: Rc::new(FakeSessionState::default()),
            }
        }

        pub fn tracking_space(&self) -> FakeSpace {
            FakeSpace {
                kind: ReferenceSpaceKind::Local,
                session: self.id,
            }
        }

        pub fn reject_reference_spaces(&self) {
            self.state.reject_reference_spaces.set(true);
        }

        pub fn reference_space_requests(&self) -> usize {
            self.state.reference_space_requests.get()
        }

        pub fn hit_test_source_requests(&self) -> usize {
            self.state.hit_test_source_requests.get()
        }

        pub fn end_requests(&self) -> usize {
            self.state.end_requests.get()
        }

        pub fn pending_hit_test_sources(&self) -> usize {
            self.state.pending_sources.borrow().len()
        }

        /// Sources handed out so far, whether or not anyone received them.
        pub fn issued_sources(&self) -> Vec<FakeSource> {
            self.state.issued_sources.borrow().clone()
        }

        /// Resolves the oldest pending hit-test source request. Returns false if none is pending
        /// or the requester has gone away.
        pub fn resolve_hit_test_source(&self) -> bool {
            let Some(sender) = self.take_pending() else {
                return false;
            };
            let source = FakeSource {
                session: self.id,
                cancelled: Rc::new(Cell::new(false)),
            };
            self.state.issued_sources.borrow_mut().push(source.clone());
            sender.send(Ok(source)).is_ok()
        }

        pub fn reject_hit_test_source(&self, error: ArError) -> bool {
            match self.take_pending() {
                Some(sender) => sender.send(Err(error)).is_ok(),
                None => false,
            }
        }

        fn take_pending(&self) -> Option<oneshot::Sender<Result<FakeSource>>> {
            let mut pending = self.state.pending_sources.borrow_mut();
            if pending.is_empty() {
                None
            } else {
                Some(pending.remove(0))
            }
        }
    }

    impl XrSession for FakeSession {
        type ReferenceSpace = FakeSpace;
        type HitTestSource = FakeSource;

        fn id(&self) -> SessionId {
            self.id
        }

        fn request_reference_space(
            &self,
            kind: ReferenceSpaceKind,
        ) -> LocalBoxFuture<'static, Result<FakeSpace>> {
            let state = &self.state;
            state
                .reference_space_requests
                .set(state.reference_space_requests.get() + 1);
            let result = if state.reject_reference_spaces.get() {
                Err(ArError::ReferenceSpace(format!(
                    "{} space denied",
                    kind.as_str()
                )))
            } else {
                Ok(FakeSpace {
                    kind,
                    session: self.id,
                })
            };
            futures::future::ready(result).boxed_local()
        }

        fn request_hit_test_source(
            &self,
            space: &FakeSpace,
        ) -> LocalBoxFuture<'static, Result<FakeSource>> {
            assert_eq!(space.kind, ReferenceSpaceKind::Viewer);
            let state = &self.state;
            state
                .hit_test_source_requests
                .set(state.hit_test_source_requests.get() + 1);
            let (sender, receiver) = oneshot::channel();
            state.pending_sources.borrow_mut().push(sender);
            async move {
                receiver.await.unwrap_or_else(|_| {
                    Err(ArError::Cancelled("fake device dropped the request".to_string()))
                })
            }
            .boxed_local()
        }

        fn end(&self) {
            self.state.end_requests.set(self.state.end_requests.get() + 1);
        }
    }

    /// A hit result whose pose is only defined in the session's `local` space.
    #[derive(Debug, Clone)]
    pub struct FakeHit {
        pub pose: Option<Pose>,
    }

    impl FakeHit {
        pub fn at(pose: Pose) -> Self {
            Self { pose: Some(pose) }
        }
    }

    impl HitTestResult<FakeSpace> for FakeHit {
        fn pose(&self, space: &FakeSpace) -> Option<Pose> {
            match space.kind {
                ReferenceSpaceKind::Local => self.pose,
                _ => None,
            }
        }
    }

    /// A frame token carrying canned hit results. Records every poll it receives.
    pub struct FakeFrame {
        hits: Vec<FakeHit>,
        viewer: Option<Pose>,
        polls: Cell<usize>,
    }

    impl FakeFrame {
        pub fn new(hits: Vec<FakeHit>) -> Self {
            Self {
                hits,
                viewer: None,
                polls: Cell::new(0),
            }
        }

        pub fn empty() -> Self {
            Self::new(Vec::new())
        }

        pub fn with_viewer(mut self, viewer: Pose) -> Self {
            self.viewer = Some(viewer);
            self
        }

        pub fn polls(&self) -> usize {
            self.polls.get()
        }
    }

    impl XrFrame for FakeFrame {
        type Session = FakeSession;
        type HitTestResult = FakeHit;

        fn hit_test_results(&self, source: &FakeSource) -> Vec<FakeHit> {
            self.polls.set(self.polls.get() + 1);
            if source.is_cancelled() {
                Vec::new()
            } else {
                self.hits.clone()
            }
        }

        fn viewer_pose(&self, space: &FakeSpace) -> Option<Pose> {
            match space.kind {
                ReferenceSpaceKind::Local => self.viewer,
                _ => None,
            }
        }
    }
}
