//! Notifications a viewer emits to its host

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Document load progress. Emitted, never stored.
///
/// Serialized as `{ "state", "loaded", "total" }` in every state; the
/// terminal states report zero for both counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProgressEvent {
    /// Bytes received so far; `total` is 0 when unknown
    Loading { loaded: u64, total: u64 },
    Finished,
    Error,
}

impl LoadProgressEvent {
    pub fn state(&self) -> &'static str {
        match self {
            LoadProgressEvent::Loading { .. } => "loading",
            LoadProgressEvent::Finished => "finished",
            LoadProgressEvent::Error => "error",
        }
    }
}

impl Serialize for LoadProgressEvent {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (loaded, total) = match *self {
            LoadProgressEvent::Loading { loaded, total } => (loaded, total),
            LoadProgressEvent::Finished | LoadProgressEvent::Error => (0, 0),
        };

        let mut event = serializer.serialize_struct("LoadProgressEvent", 3)?;
        event.serialize_field("state", self.state())?;
        event.serialize_field("loaded", &loaded)?;
        event.serialize_field("total", &total)?;
        event.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ViewerEvent {
    /// A page finished rendering into the surface
    PageLoaded { page: u32, total: u32 },
    LoadProgress(LoadProgressEvent),
}
