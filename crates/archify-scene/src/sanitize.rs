//! Document sanitizer
//!
//! Turns an untrusted JSON value into a [`SceneDocument`] the editor can load
//! without tripping over unknown catalog entries or broken references.
//! Nothing here fails: an element that cannot be represented is dropped and
//! recorded in the [`SanitizeReport`].
//!
//! # Pipeline (per layer)
//!
//! ```text
//! re-key by id → lines (kind, endpoints) → holes (kind, owning line)
//!   → line hole lists → items → vertex back-references → areas → selection
//! ```
//!
//! Each step only depends on the ones before it, so a second pass over the
//! output finds nothing to do.

use crate::allow_list::{AllowList, AllowListProfile, ElementPolicy};
use crate::model::{
    Area, Collection, ElementMap, Extra, Hole, Item, Layer, Line, SceneDocument, SceneElement,
    Vertex,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Why an element was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RemovalReason {
    /// `type` is outside the active allow-list
    UnrepresentableElement,
    /// Points at a line or vertex that does not exist
    DanglingReference {
        /// The id that failed to resolve
        target: String,
    },
    /// Value does not have the element's shape
    Malformed {
        /// Decoder message
        detail: String,
    },
    /// Another entry already claimed this id
    DuplicateId,
    /// The collection's policy empties it
    Discarded,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::UnrepresentableElement => f.write_str("kind not permitted"),
            RemovalReason::DanglingReference { target } => {
                write!(f, "dangling reference to '{target}'")
            }
            RemovalReason::Malformed { detail } => write!(f, "malformed: {detail}"),
            RemovalReason::DuplicateId => f.write_str("duplicate id"),
            RemovalReason::Discarded => f.write_str("collection discarded by policy"),
        }
    }
}

/// One dropped element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub layer: String,
    pub collection: Collection,
    pub id: String,
    pub kind: Option<String>,
    #[serde(flatten)]
    pub reason: RemovalReason,
}

/// What a sanitation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanitizeReport {
    /// Every dropped element, in pipeline order
    pub removals: Vec<Removal>,
    /// Layers dropped because they were not objects
    pub dropped_layers: Vec<String>,
    /// Entries moved to the key named by their `id`
    pub rekeyed: usize,
    /// Hole ids appended to their owning line
    pub hole_refs_added: usize,
    /// Stale ids pruned from back-reference and selection lists
    pub stale_refs_pruned: usize,
}

impl SanitizeReport {
    /// True if the pass changed nothing
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.removals.is_empty()
            && self.dropped_layers.is_empty()
            && self.rekeyed == 0
            && self.hole_refs_added == 0
            && self.stale_refs_pruned == 0
    }

    /// Number of dropped elements
    #[inline]
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removals.len()
    }

    /// Removals from one collection
    pub fn removals_in(&self, collection: Collection) -> impl Iterator<Item = &Removal> {
        self.removals
            .iter()
            .filter(move |r| r.collection == collection)
    }
}

/// Sanitized document plus the record of what was changed
#[derive(Debug, Clone, PartialEq)]
pub struct Sanitized {
    pub document: SceneDocument,
    pub report: SanitizeReport,
}

/// Sanitize `raw` against `allow`
#[must_use]
pub fn sanitize(raw: &Value, allow: &AllowList) -> SceneDocument {
    Sanitizer::new(allow).sanitize(raw).document
}

/// Sanitize `raw` against `allow`, keeping the report
#[must_use]
pub fn sanitize_with_report(raw: &Value, allow: &AllowList) -> Sanitized {
    Sanitizer::new(allow).sanitize(raw)
}

/// Re-sanitize a typed document against `allow`
#[must_use]
pub fn sanitize_document(document: &SceneDocument, allow: &AllowList) -> Sanitized {
    Sanitizer::new(allow).sanitize_document(document)
}

/// Applies one allow-list to documents
///
/// Borrows its input and builds a fresh document; callers may keep using the
/// raw value afterwards.
#[derive(Debug, Clone, Copy)]
pub struct Sanitizer<'a> {
    allow: &'a AllowList,
}

impl<'a> Sanitizer<'a> {
    /// Sanitizer for `allow`
    #[inline]
    #[must_use]
    pub fn new(allow: &'a AllowList) -> Self {
        Self { allow }
    }

    /// Active allow-list
    #[inline]
    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        self.allow
    }

    /// Sanitize an untyped document
    #[must_use]
    pub fn sanitize(&self, raw: &Value) -> Sanitized {
        let _span = tracing::debug_span!("sanitize", profile = %self.allow.name).entered();
        let mut report = SanitizeReport::default();

        let Some(root) = raw.as_object() else {
            tracing::warn!("scene document is not an object; using an empty document");
            return Sanitized {
                document: SceneDocument::new(),
                report,
            };
        };

        let mut document = SceneDocument::new();
        for (key, value) in root {
            if key != "layers" {
                document.extra.insert(key.clone(), value.clone());
            }
        }

        match root.get("layers") {
            Some(Value::Object(layers)) => {
                for (layer_id, layer_value) in layers {
                    if let Some(layer_obj) = layer_value.as_object() {
                        let layer = self.sanitize_layer(layer_id, layer_obj, &mut report);
                        document.layers.insert(layer_id.clone(), layer);
                    } else {
                        tracing::warn!(layer = %layer_id, "dropping layer that is not an object");
                        report.dropped_layers.push(layer_id.clone());
                    }
                }
            }
            None | Some(Value::Null) => {}
            Some(_) => tracing::warn!("'layers' is not an object; using no layers"),
        }

        tracing::debug!(
            removed = report.removed_count(),
            rekeyed = report.rekeyed,
            hole_refs_added = report.hole_refs_added,
            stale_refs_pruned = report.stale_refs_pruned,
            "sanitation finished"
        );

        Sanitized { document, report }
    }

    /// Re-sanitize a typed document
    ///
    /// Useful when the active allow-list changed since the document was built.
    #[must_use]
    pub fn sanitize_document(&self, document: &SceneDocument) -> Sanitized {
        match document.to_value() {
            Ok(value) => self.sanitize(&value),
            Err(e) => {
                tracing::warn!(error = %e, "document could not be encoded; using an empty document");
                Sanitized {
                    document: SceneDocument::new(),
                    report: SanitizeReport::default(),
                }
            }
        }
    }

    fn sanitize_layer(
        &self,
        layer_id: &str,
        raw: &serde_json::Map<String, Value>,
        report: &mut SanitizeReport,
    ) -> Layer {
        let mut log = RemovalLog { layer: layer_id, report };

        let extra: Extra = raw
            .iter()
            .filter(|(k, _)| !Collection::ALL.iter().any(|c| c.as_str() == k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut vertices: ElementMap<Vertex> = collect_elements(raw, &mut log);
        let mut lines: ElementMap<Line> = collect_elements(raw, &mut log);
        let mut holes: ElementMap<Hole> = collect_elements(raw, &mut log);
        let mut items: ElementMap<Item> = collect_elements(raw, &mut log);
        let mut areas: ElementMap<Area> = collect_elements(raw, &mut log);

        lines.retain(|_, line| {
            if !self.allow.permits_line(&line.kind) {
                log.remove(line, RemovalReason::UnrepresentableElement);
                return false;
            }
            if line.vertices.len() != 2 {
                let detail = format!("expected 2 endpoints, found {}", line.vertices.len());
                log.remove(line, RemovalReason::Malformed { detail });
                return false;
            }
            if let Some(missing) = line.vertices.iter().find(|v| !vertices.contains_key(*v)) {
                let target = missing.clone();
                log.remove(line, RemovalReason::DanglingReference { target });
                return false;
            }
            true
        });

        holes.retain(|_, hole| {
            if !self.allow.permits_hole(&hole.kind) {
                log.remove(hole, RemovalReason::UnrepresentableElement);
                return false;
            }
            if !lines.contains_key(&hole.line) {
                let target = hole.line.clone();
                log.remove(hole, RemovalReason::DanglingReference { target });
                return false;
            }
            true
        });

        repair_hole_lists(&mut lines, &holes, log.report);

        match self.allow.items {
            ElementPolicy::Discard => log.discard_all(&mut items),
            ElementPolicy::Retain => items.retain(|_, item| {
                let permitted = self.allow.permits_item(&item.kind);
                if !permitted {
                    log.remove(item, RemovalReason::UnrepresentableElement);
                }
                permitted
            }),
        }

        if self.allow.areas == ElementPolicy::Discard {
            log.discard_all(&mut areas);
        }

        for vertex in vertices.values_mut() {
            log.report.stale_refs_pruned += retain_known(&mut vertex.lines, |id| lines.contains_key(id));
            if let Some(area_refs) = vertex.areas.as_mut() {
                log.report.stale_refs_pruned += retain_known(area_refs, |id| areas.contains_key(id));
            }
        }

        let mut layer = Layer {
            vertices,
            lines,
            holes,
            items,
            areas,
            extra,
        };
        log.report.stale_refs_pruned += prune_selection(&mut layer);
        layer
    }
}

impl Default for Sanitizer<'static> {
    fn default() -> Self {
        static AUTOSAVE: std::sync::OnceLock<AllowList> = std::sync::OnceLock::new();
        Sanitizer::new(AUTOSAVE.get_or_init(|| AllowListProfile::Autosave.allow_list()))
    }
}

/// Records removals for one layer
struct RemovalLog<'r> {
    layer: &'r str,
    report: &'r mut SanitizeReport,
}

impl RemovalLog<'_> {
    fn record(&mut self, collection: Collection, id: &str, kind: Option<&str>, reason: RemovalReason) {
        tracing::warn!(
            layer = %self.layer,
            collection = %collection,
            id = %id,
            kind = kind.unwrap_or(""),
            reason = %reason,
            "removing scene element"
        );
        self.report.removals.push(Removal {
            layer: self.layer.to_string(),
            collection,
            id: id.to_string(),
            kind: kind.map(str::to_string),
            reason,
        });
    }

    fn remove<T: SceneElement>(&mut self, element: &T, reason: RemovalReason) {
        self.record(T::COLLECTION, element.id(), element.kind(), reason);
    }

    fn discard_all<T: SceneElement>(&mut self, map: &mut ElementMap<T>) {
        if map.is_empty() {
            return;
        }
        tracing::warn!(
            layer = %self.layer,
            collection = %T::COLLECTION,
            count = map.len(),
            "discarding collection"
        );
        for element in map.values() {
            self.report.removals.push(Removal {
                layer: self.layer.to_string(),
                collection: T::COLLECTION,
                id: element.id().to_string(),
                kind: element.kind().map(str::to_string),
                reason: RemovalReason::Discarded,
            });
        }
        map.clear();
    }
}

/// Decode one collection, re-keying each entry by its `id`
fn collect_elements<T: SceneElement>(
    layer: &serde_json::Map<String, Value>,
    log: &mut RemovalLog<'_>,
) -> ElementMap<T> {
    let collection = T::COLLECTION;
    let mut out = ElementMap::new();

    let entries = match layer.get(collection.as_str()) {
        Some(Value::Object(entries)) => entries,
        None | Some(Value::Null) => return out,
        Some(_) => {
            tracing::warn!(layer = %log.layer, collection = %collection, "collection is not an object; treating as empty");
            return out;
        }
    };

    for (key, value) in entries {
        let Some(fields) = value.as_object() else {
            let detail = "not an object".to_string();
            log.record(collection, key, None, RemovalReason::Malformed { detail });
            continue;
        };

        let mut fields = fields.clone();
        let declared = match fields.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            None | Some(Value::Null | Value::String(_)) => None,
            Some(_) => {
                let detail = "id is not a string".to_string();
                log.record(collection, key, None, RemovalReason::Malformed { detail });
                continue;
            }
        };
        // An element without an id is known by its key.
        let id = declared.unwrap_or_else(|| {
            fields.insert("id".to_string(), Value::String(key.clone()));
            key.clone()
        });
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);

        let element: T = match serde_json::from_value(Value::Object(fields)) {
            Ok(element) => element,
            Err(e) => {
                let detail = e.to_string();
                log.record(collection, &id, kind.as_deref(), RemovalReason::Malformed { detail });
                continue;
            }
        };

        if out.contains_key(&id) {
            log.remove(&element, RemovalReason::DuplicateId);
            continue;
        }
        if id != *key {
            tracing::debug!(layer = %log.layer, collection = %collection, from = %key, to = %id, "re-keying element");
            log.report.rekeyed += 1;
        }
        out.insert(id, element);
    }

    out
}

/// Make each line list exactly the holes that point at it
///
/// Existing order is kept; missing holes are appended in hole-map order.
fn repair_hole_lists(
    lines: &mut ElementMap<Line>,
    holes: &ElementMap<Hole>,
    report: &mut SanitizeReport,
) {
    for (line_id, line) in lines.iter_mut() {
        let mut seen = HashSet::new();
        let before = line.holes.len();
        line.holes.retain(|hole_id| {
            holes
                .get(hole_id)
                .is_some_and(|hole| hole.line == *line_id)
                && seen.insert(hole_id.clone())
        });
        report.stale_refs_pruned += before - line.holes.len();
    }

    for (hole_id, hole) in holes {
        if let Some(line) = lines.get_mut(&hole.line) {
            if !line.holes.iter().any(|h| h == hole_id) {
                line.holes.push(hole_id.clone());
                report.hole_refs_added += 1;
            }
        }
    }
}

/// Keep ids accepted by `known`; returns how many were dropped
fn retain_known(ids: &mut Vec<String>, known: impl Fn(&str) -> bool) -> usize {
    let before = ids.len();
    ids.retain(|id| known(id));
    before - ids.len()
}

/// Drop selection entries naming elements that no longer exist
fn prune_selection(layer: &mut Layer) -> usize {
    let Some(Value::Object(selected)) = layer.extra.get_mut("selected") else {
        return 0;
    };

    let mut pruned = 0;
    for collection in Collection::ALL {
        let Some(Value::Array(ids)) = selected.get_mut(collection.as_str()) else {
            continue;
        };
        let before = ids.len();
        ids.retain(|id| {
            id.as_str().is_some_and(|id| match collection {
                Collection::Vertices => layer.vertices.contains_key(id),
                Collection::Lines => layer.lines.contains_key(id),
                Collection::Holes => layer.holes.contains_key(id),
                Collection::Items => layer.items.contains_key(id),
                Collection::Areas => layer.areas.contains_key(id),
            })
        });
        pruned += before - ids.len();
    }
    pruned
}
