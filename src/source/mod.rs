//! Source locator parsing and resolution

pub mod resolver;

pub use resolver::{
    resolve, resolve_base64, resolve_path, resolve_url, validate_path_access, ResolvedPdf,
    SourceLocator, SourcePolicy,
};
