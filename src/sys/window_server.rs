use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::geometry::Rect;
use crate::common::collections::HashSet;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    pub const fn new(id: u32) -> Self { WindowId(id) }

    pub fn as_u32(self) -> u32 { self.0 }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Virtual desktop identifier. The window server reports these as integers
/// that can exceed 2^53, so they are carried around as strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    pub fn new(id: impl Into<String>) -> Self { SpaceId(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSpaceId {
    Int(u64),
    Signed(i64),
    Float(f64),
    Text(String),
    // Emitted by the server when the id overflowed its own number type.
    Overflow(bool),
}

impl RawSpaceId {
    fn into_space_id(self) -> Option<SpaceId> {
        match self {
            RawSpaceId::Int(v) => Some(SpaceId(v.to_string())),
            RawSpaceId::Signed(v) => Some(SpaceId(v.to_string())),
            RawSpaceId::Float(v) if v.fract() == 0.0 && v >= 0.0 => {
                Some(SpaceId(format!("{v:.0}")))
            }
            RawSpaceId::Float(v) => Some(SpaceId(v.to_string())),
            RawSpaceId::Text(s) if !s.is_empty() => Some(SpaceId(s)),
            RawSpaceId::Text(_) | RawSpaceId::Overflow(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for SpaceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        RawSpaceId::deserialize(deserializer)?
            .into_space_id()
            .ok_or_else(|| serde::de::Error::custom("space id is not representable"))
    }
}

fn optional_space_id<'de, D>(deserializer: D) -> Result<Option<SpaceId>, D::Error>
where D: Deserializer<'de> {
    Ok(Option::<RawSpaceId>::deserialize(deserializer)?.and_then(RawSpaceId::into_space_id))
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub id: WindowId,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub bundle_id: String,
    #[serde(default)]
    pub title: String,
    pub frame: Rect,
    #[serde(default)]
    pub is_minimized: bool,
    #[serde(default)]
    pub is_hidden: bool,
    /// Window layer, 0 is the normal application layer.
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub subrole: Option<String>,
}

impl WindowInfo {
    pub fn is_tileable(&self) -> bool { !self.is_minimized && !self.is_hidden && self.level == 0 }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub uuid: String,
    #[serde(default)]
    pub frame: Rect,
    #[serde(default)]
    pub visible_frame: Rect,
    #[serde(default, deserialize_with = "optional_space_id")]
    pub current_space_id: Option<SpaceId>,
    #[serde(default)]
    pub is_main: bool,
}

impl DisplayInfo {
    /// The visible frame, falling back to the full frame when the server
    /// did not report one.
    pub fn usable_frame(&self) -> Option<Rect> {
        if !self.visible_frame.is_empty() {
            Some(self.visible_frame)
        } else if !self.frame.is_empty() {
            Some(self.frame)
        } else {
            None
        }
    }
}

/// Point-in-time view of the windows, displays and focus the server reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub space_id: SpaceId,
    pub display_bounds: Rect,
    #[serde(default)]
    pub windows: Vec<WindowInfo>,
    #[serde(default)]
    pub focused_window_id: Option<WindowId>,
    #[serde(default)]
    pub all_displays: Vec<DisplayInfo>,
}

impl Snapshot {
    pub fn tileable_ids(&self) -> HashSet<WindowId> {
        self.windows.iter().filter(|w| w.is_tileable()).map(|w| w.id).collect()
    }

    pub fn window(&self, id: WindowId) -> Option<&WindowInfo> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn display(&self, uuid: &str) -> Option<&DisplayInfo> {
        self.all_displays.iter().find(|d| d.uuid == uuid)
    }

    /// The display currently showing `space_id`.
    pub fn current_display(&self) -> Option<&DisplayInfo> {
        self.all_displays
            .iter()
            .find(|d| d.current_space_id.as_ref() == Some(&self.space_id))
    }
}

#[derive(Debug, Error)]
pub enum ExternalCallError {
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    #[error("{op} failed: {message}")]
    Failed { op: &'static str, message: String },
}

/// The privileged collaborator that enumerates windows and moves them.
///
/// Every call is a suspension point. Callers wrap them in [`with_deadline`].
pub trait WindowServer {
    fn snapshot(&self) -> impl Future<Output = Result<Snapshot, ExternalCallError>> + Send;

    fn move_resize(
        &self,
        id: WindowId,
        frame: Rect,
    ) -> impl Future<Output = Result<(), ExternalCallError>> + Send;

    fn focus(&self, id: WindowId) -> impl Future<Output = Result<(), ExternalCallError>> + Send;

    fn raise(&self, id: WindowId) -> impl Future<Output = Result<(), ExternalCallError>> + Send;

    fn move_to_space(
        &self,
        id: WindowId,
        space: &SpaceId,
    ) -> impl Future<Output = Result<(), ExternalCallError>> + Send;
}

pub async fn with_deadline<T, F>(
    op: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, ExternalCallError>
where
    F: Future<Output = Result<T, ExternalCallError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(op, ?timeout, "external call exceeded its deadline");
            Err(ExternalCallError::Timeout { op, after: timeout })
        }
    }
}

/// Request issued to a [`SnapshotFile`] server.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    MoveResize {
        #[serde(rename = "windowId")]
        window_id: WindowId,
        frame: Rect,
    },
    Focus {
        #[serde(rename = "windowId")]
        window_id: WindowId,
    },
    Raise {
        #[serde(rename = "windowId")]
        window_id: WindowId,
    },
    MoveToSpace {
        #[serde(rename = "windowId")]
        window_id: WindowId,
        space: SpaceId,
    },
}

/// Dry-run server: snapshots come from a JSON file and every request is
/// recorded (and optionally echoed as a JSON line on stdout).
pub struct SnapshotFile {
    path: PathBuf,
    echo: bool,
    requests: Mutex<Vec<Request>>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>, echo: bool) -> Self {
        SnapshotFile {
            path: path.into(),
            echo,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn requests(&self) -> Vec<Request> { self.requests.lock().clone() }

    fn record(&self, request: Request) {
        debug!(?request);
        if self.echo {
            match serde_json::to_string(&request) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("could not encode request: {e}"),
            }
        }
        self.requests.lock().push(request);
    }

    fn read_snapshot(&self) -> Result<Snapshot, ExternalCallError> {
        let failed = |message: String| ExternalCallError::Failed { op: "snapshot", message };
        let buf = std::fs::read_to_string(&self.path)
            .map_err(|e| failed(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&buf).map_err(|e| failed(e.to_string()))
    }
}

impl WindowServer for SnapshotFile {
    fn snapshot(&self) -> impl Future<Output = Result<Snapshot, ExternalCallError>> + Send {
        let result = self.read_snapshot();
        async move { result }
    }

    fn move_resize(
        &self,
        id: WindowId,
        frame: Rect,
    ) -> impl Future<Output = Result<(), ExternalCallError>> + Send {
        self.record(Request::MoveResize { window_id: id, frame });
        async { Ok(()) }
    }

    fn focus(&self, id: WindowId) -> impl Future<Output = Result<(), ExternalCallError>> + Send {
        self.record(Request::Focus { window_id: id });
        async { Ok(()) }
    }

    fn raise(&self, id: WindowId) -> impl Future<Output = Result<(), ExternalCallError>> + Send {
        self.record(Request::Raise { window_id: id });
        async { Ok(()) }
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
