//! Archify scene model and sanitizer
//!
//! The guard between untrusted floor-plan JSON (the browser autosave slot,
//! generated designs, imported files) and the editor session that consumes it.
//!
//! # Core Concepts
//!
//! - [`SceneDocument`]: typed view of the editor's scene JSON, lossless for
//!   fields it does not model
//! - [`AllowList`] / [`AllowListProfile`]: permitted element kinds per call site
//! - [`Sanitizer`]: repairs or drops elements until the document's references
//!   and kinds are consistent
//! - [`Fingerprint`]: Blake3 hash of a document's JSON encoding
//!
//! # Example
//!
//! ```rust
//! use archify_scene::{sanitize, AllowListProfile};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "layers": {
//!         "layer-1": {
//!             "items": {
//!                 "i1": {"id": "i1", "type": "sofa"},
//!                 "i2": {"id": "i2", "type": "alien-spaceship"}
//!             }
//!         }
//!     }
//! });
//!
//! let doc = sanitize(&raw, &AllowListProfile::Autosave.allow_list());
//! assert_eq!(doc.layers["layer-1"].items.len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod allow_list;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod sanitize;

pub use allow_list::{AllowList, AllowListProfile, ElementPolicy, KindSet};
pub use error::{SceneError, SceneResult};
pub use fingerprint::{Fingerprint, FingerprintParseError};
pub use model::{
    Area, Collection, ElementMap, Extra, Hole, Item, Layer, LayerStats, Line, SceneDocument,
    SceneElement, Vertex,
};
pub use sanitize::{
    sanitize, sanitize_document, sanitize_with_report, Removal, RemovalReason, SanitizeReport,
    Sanitized, Sanitizer,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
