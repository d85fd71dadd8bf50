use std::future::Future;

use parking_lot::Mutex;

use super::Reactor;
use crate::common::collections::{BTreeMap, HashSet};
use crate::common::config::Config;
use crate::model::{RuntimeState, StateStore};
use crate::sys::geometry::Rect;
use crate::sys::window_server::{
    DisplayInfo, ExternalCallError, Request, Snapshot, SpaceId, WindowId, WindowInfo, WindowServer,
};

pub const SCREEN: Rect = Rect::new(0.0, 0.0, 1000.0, 800.0);

pub const CONFIG: &str = r#"
[settings]
gap = 0
padding = 0
window_spacing = 0
assignment_strategy = "position"
call_timeout_ms = 50

[[layouts]]
id = "split"
columns = ["1fr", "1fr"]
rows = ["1fr"]
areas = ["left right"]

[[layouts]]
id = "quad"
columns = ["1fr", "1fr"]
rows = ["1fr", "1fr"]
areas = ["tl tr", "bl br"]

[[layouts]]
id = "single"
columns = ["1fr"]
rows = ["1fr"]
areas = ["main"]
"#;

pub fn w(id: u32) -> WindowId { WindowId::new(id) }

pub fn window(id: u32, frame: Rect) -> WindowInfo {
    WindowInfo {
        id: w(id),
        app_name: format!("app{id}"),
        frame,
        ..Default::default()
    }
}

pub fn display(uuid: &str, frame: Rect, space: &str) -> DisplayInfo {
    DisplayInfo {
        uuid: uuid.into(),
        frame,
        visible_frame: frame,
        current_space_id: Some(SpaceId::new(space)),
        is_main: uuid == "main",
    }
}

/// Space "1" on a single 1000x800 display.
pub fn snapshot(windows: Vec<WindowInfo>) -> Snapshot {
    Snapshot {
        space_id: SpaceId::new("1"),
        display_bounds: SCREEN,
        windows,
        focused_window_id: None,
        all_displays: vec![display("main", SCREEN, "1")],
    }
}

#[derive(Default)]
pub struct Failures {
    pub snapshot: bool,
    pub hang_snapshot: bool,
    pub focus: bool,
    pub raise: bool,
    pub moves: HashSet<WindowId>,
}

/// In-memory window server. Records every request and fails on demand.
pub struct FakeServer {
    snapshot: Mutex<Snapshot>,
    requests: Mutex<Vec<Request>>,
    failures: Mutex<Failures>,
}

impl FakeServer {
    pub fn new(snapshot: Snapshot) -> Self {
        FakeServer {
            snapshot: Mutex::new(snapshot),
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(Failures::default()),
        }
    }

    pub fn update_snapshot(&self, f: impl FnOnce(&mut Snapshot)) { f(&mut self.snapshot.lock()) }

    pub fn fail(&self, f: impl FnOnce(&mut Failures)) { f(&mut self.failures.lock()) }

    pub fn take_requests(&self) -> Vec<Request> { std::mem::take(&mut *self.requests.lock()) }

    /// Frames from the recorded move requests, by window. Drains the log.
    pub fn take_frames(&self) -> BTreeMap<WindowId, Rect> {
        self.take_requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::MoveResize { window_id, frame } => Some((window_id, frame)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: Request) { self.requests.lock().push(request); }
}

fn failed(op: &'static str) -> ExternalCallError {
    ExternalCallError::Failed { op, message: "injected".into() }
}

impl WindowServer for FakeServer {
    fn snapshot(&self) -> impl Future<Output = Result<Snapshot, ExternalCallError>> + Send {
        let (fail, hang) = {
            let failures = self.failures.lock();
            (failures.snapshot, failures.hang_snapshot)
        };
        let snapshot = self.snapshot.lock().clone();
        async move {
            if hang {
                std::future::pending::<()>().await;
            }
            if fail { Err(failed("snapshot")) } else { Ok(snapshot) }
        }
    }

    fn move_resize(
        &self,
        id: WindowId,
        frame: Rect,
    ) -> impl Future<Output = Result<(), ExternalCallError>> + Send {
        self.record(Request::MoveResize { window_id: id, frame });
        let fail = self.failures.lock().moves.contains(&id);
        let result = if fail { Err(failed("move_resize")) } else { Ok(()) };
        async move { result }
    }

    fn focus(&self, id: WindowId) -> impl Future<Output = Result<(), ExternalCallError>> + Send {
        self.record(Request::Focus { window_id: id });
        let result = if self.failures.lock().focus { Err(failed("focus")) } else { Ok(()) };
        async move { result }
    }

    fn raise(&self, id: WindowId) -> impl Future<Output = Result<(), ExternalCallError>> + Send {
        self.record(Request::Raise { window_id: id });
        let result = if self.failures.lock().raise { Err(failed("raise")) } else { Ok(()) };
        async move { result }
    }

    fn move_to_space(
        &self,
        id: WindowId,
        space: &SpaceId,
    ) -> impl Future<Output = Result<(), ExternalCallError>> + Send {
        self.record(Request::MoveToSpace { window_id: id, space: space.clone() });
        async { Ok(()) }
    }
}

pub fn reactor(snapshot: Snapshot) -> Reactor<FakeServer> { reactor_with("", snapshot) }

/// Like [`reactor`], with `extra` appended to the configuration.
pub fn reactor_with(extra: &str, snapshot: Snapshot) -> Reactor<FakeServer> {
    let config = Config::parse(&format!("{CONFIG}{extra}")).unwrap();
    Reactor::new(config, StateStore::in_memory(RuntimeState::default()), FakeServer::new(snapshot))
        .unwrap()
}
