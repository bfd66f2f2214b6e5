//! Viewer component: page cursor, zoom, addressed commands and resize handling
//!
//! - [`ViewerInstance`]: per-viewer state and navigation
//! - [`CommandBus`]: delivers commands to the viewer they address
//! - [`ResizeDebouncer`]: collapses resize bursts into one re-render

mod bus;
mod debounce;
mod events;
mod instance;
mod layout;
mod zoom;

pub use bus::{Command, CommandBus, NavigationCommand, Remote, Target};
pub use debounce::{ResizeDebouncer, DEFAULT_QUIET_INTERVAL};
pub use events::{LoadProgressEvent, ViewerEvent};
pub use instance::{ViewerInstance, ViewerOptions, ViewerSnapshot};
pub use layout::{ContainerSize, HostGeometry, VERTICAL_PADDING};
pub use zoom::{compute_scale, ZoomLevel, ZoomMode, DEFAULT_MAX_SCALE, DEFAULT_ZOOM_PERCENT};
