//! PDF Viewer MCP Library
//!
//! An embeddable PDF viewer component. Rendering is delegated to a backend
//! (PDFium by default); this crate coordinates the viewer state around it:
//! - page navigation and zoom per viewer instance
//! - commands addressed to a viewer by identifier
//! - debounced re-layout and re-render on resize
//!
//! The MCP server in [`server`] hosts viewers and exposes that command
//! surface as tools.

pub mod error;
pub mod pdf;
pub mod server;
pub mod source;
pub mod viewer;

pub use error::{Error, Result};
pub use server::{
    run_server, run_server_with_config, run_server_with_dirs, ServerConfig, ViewerServer,
};
pub use viewer::{
    Command, CommandBus, HostGeometry, LoadProgressEvent, NavigationCommand, Target, ViewerEvent,
    ViewerInstance, ZoomLevel,
};
