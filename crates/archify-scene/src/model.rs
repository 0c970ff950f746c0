//! Scene document model
//!
//! Typed view of the floor-plan JSON the editor produces. Only the fields the
//! sanitizer reasons about are typed; everything else rides along in the
//! `extra` map of each struct so a document round-trips without loss.

use crate::error::SceneError;
use crate::fingerprint::Fingerprint;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Element map keyed by element id, in document order
pub type ElementMap<T> = IndexMap<String, T>;

/// Untyped fields carried through unchanged
pub type Extra = Map<String, Value>;

/// Root of a floor-plan document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Layers by layer id
    #[serde(default)]
    pub layers: IndexMap<String, Layer>,
    /// Top-level fields outside the sanitizer's concern (grids, unit, meta, ...)
    #[serde(flatten)]
    pub extra: Extra,
}

impl SceneDocument {
    /// Empty document with no layers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict typed parse
    ///
    /// Unlike [`crate::sanitize`], this rejects any element that does not fit
    /// the model. Use it for documents this process wrote itself.
    ///
    /// # Errors
    /// `SceneError::Json` on malformed JSON or shape mismatch.
    pub fn from_json_str(raw: &str) -> Result<Self, SceneError> {
        serde_json::from_str(raw).map_err(SceneError::Json)
    }

    /// Compact JSON encoding, as written to the autosave slot
    ///
    /// # Errors
    /// `SceneError::Json` if a carried-through value cannot be encoded.
    pub fn to_json_string(&self) -> Result<String, SceneError> {
        serde_json::to_string(self).map_err(SceneError::Json)
    }

    /// Convert to an untyped JSON value
    ///
    /// # Errors
    /// `SceneError::Json` if a carried-through value cannot be encoded.
    pub fn to_value(&self) -> Result<Value, SceneError> {
        serde_json::to_value(self).map_err(SceneError::Json)
    }

    /// Blake3 hash of the compact JSON encoding
    ///
    /// # Errors
    /// `SceneError::Json` if the document cannot be encoded.
    pub fn fingerprint(&self) -> Result<Fingerprint, SceneError> {
        Fingerprint::of_json(self).map_err(SceneError::Json)
    }

    /// Layer by id
    #[inline]
    #[must_use]
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Element counts summed over all layers
    #[must_use]
    pub fn stats(&self) -> LayerStats {
        self.layers
            .values()
            .map(Layer::stats)
            .fold(LayerStats::default(), |acc, s| acc + s)
    }
}

/// One independently editable slice of the plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Wall endpoints
    #[serde(default)]
    pub vertices: ElementMap<Vertex>,
    /// Wall segments
    #[serde(default)]
    pub lines: ElementMap<Line>,
    /// Wall openings
    #[serde(default)]
    pub holes: ElementMap<Hole>,
    /// Free-standing furnishings and annotations
    #[serde(default)]
    pub items: ElementMap<Item>,
    /// Rooms
    #[serde(default)]
    pub areas: ElementMap<Area>,
    /// Layer metadata (name, altitude, opacity, selection, ...)
    #[serde(flatten)]
    pub extra: Extra,
}

impl Layer {
    /// Element counts for this layer
    #[must_use]
    pub fn stats(&self) -> LayerStats {
        LayerStats {
            vertices: self.vertices.len(),
            lines: self.lines.len(),
            holes: self.holes.len(),
            items: self.items.len(),
            areas: self.areas.len(),
        }
    }
}

/// A wall endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: String,
    /// Kept as written; integer coordinates stay integers
    pub x: serde_json::Number,
    pub y: serde_json::Number,
    /// Incident line ids (back-references)
    #[serde(default)]
    pub lines: Vec<String>,
    /// Areas this vertex bounds (back-references); absent stays absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub areas: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A wall segment between two vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Endpoint vertex ids; exactly two in a valid document
    #[serde(default)]
    pub vertices: Vec<String>,
    /// Holes placed on this line, in placement order
    #[serde(default)]
    pub holes: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A door, window or gate placed on a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Owning line id
    #[serde(default)]
    pub line: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A furnishing, fixture or annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A room polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub vertices: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The element collections of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Vertices,
    Lines,
    Holes,
    Items,
    Areas,
}

impl Collection {
    /// All collections, in sanitation order
    pub const ALL: [Collection; 5] = [
        Collection::Vertices,
        Collection::Lines,
        Collection::Holes,
        Collection::Items,
        Collection::Areas,
    ];

    /// JSON field name of this collection inside a layer
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Vertices => "vertices",
            Collection::Lines => "lines",
            Collection::Holes => "holes",
            Collection::Items => "items",
            Collection::Areas => "areas",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common surface of the typed element structs
pub trait SceneElement: DeserializeOwned + Clone {
    /// Collection this element lives in
    const COLLECTION: Collection;

    /// Element id
    fn id(&self) -> &str;

    /// Element kind (`type` field); `None` for untyped collections
    fn kind(&self) -> Option<&str> {
        None
    }
}

impl SceneElement for Vertex {
    const COLLECTION: Collection = Collection::Vertices;

    fn id(&self) -> &str {
        &self.id
    }
}

impl SceneElement for Line {
    const COLLECTION: Collection = Collection::Lines;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> Option<&str> {
        Some(&self.kind)
    }
}

impl SceneElement for Hole {
    const COLLECTION: Collection = Collection::Holes;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> Option<&str> {
        Some(&self.kind)
    }
}

impl SceneElement for Item {
    const COLLECTION: Collection = Collection::Items;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> Option<&str> {
        Some(&self.kind)
    }
}

impl SceneElement for Area {
    const COLLECTION: Collection = Collection::Areas;

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> Option<&str> {
        Some(&self.kind)
    }
}

/// Element counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStats {
    pub vertices: usize,
    pub lines: usize,
    pub holes: usize,
    pub items: usize,
    pub areas: usize,
}

impl LayerStats {
    /// Total element count
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.vertices + self.lines + self.holes + self.items + self.areas
    }
}

impl std::ops::Add for LayerStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            vertices: self.vertices + rhs.vertices,
            lines: self.lines + rhs.lines,
            holes: self.holes + rhs.holes,
            items: self.items + rhs.items,
            areas: self.areas + rhs.areas,
        }
    }
}
