//! Testing utilities for the Archify workspace
//!
//! Raw scene builders and an invariant checker shared by the crates' tests.

#![allow(missing_docs)]

use archify_scene::{AllowList, ElementPolicy, SceneDocument};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Builds raw scene JSON, one layer at a time
///
/// Produces `serde_json::Value` rather than typed documents so tests can feed
/// the sanitizer deliberately broken input.
#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    layers: Map<String, Value>,
    current: Option<String>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or switch to) a layer; later calls add to it
    pub fn layer(mut self, id: &str) -> Self {
        self.layers.entry(id.to_string()).or_insert_with(|| {
            json!({
                "id": id,
                "name": id,
                "vertices": {},
                "lines": {},
                "holes": {},
                "items": {},
                "areas": {}
            })
        });
        self.current = Some(id.to_string());
        self
    }

    pub fn vertex(self, id: &str, x: f64, y: f64) -> Self {
        self.raw("vertices", id, json!({"id": id, "x": x, "y": y, "lines": [], "areas": []}))
    }

    /// Wall between two vertices; also records the back-reference on each
    /// endpoint that exists
    pub fn wall(mut self, id: &str, from: &str, to: &str) -> Self {
        for v in [from, to] {
            if let Some(vertex) = self.collection_mut("vertices").get_mut(v) {
                if let Some(lines) = vertex["lines"].as_array_mut() {
                    lines.push(json!(id));
                }
            }
        }
        self.line(id, "wall", from, to)
    }

    /// Line of any kind, without touching vertex back-references
    pub fn line(self, id: &str, kind: &str, from: &str, to: &str) -> Self {
        self.raw(
            "lines",
            id,
            json!({"id": id, "type": kind, "vertices": [from, to], "holes": []}),
        )
    }

    /// Hole on `line`, also appended to the line's hole list when present
    pub fn hole(mut self, id: &str, kind: &str, line: &str) -> Self {
        if let Some(owner) = self.collection_mut("lines").get_mut(line) {
            if let Some(holes) = owner["holes"].as_array_mut() {
                holes.push(json!(id));
            }
        }
        self.orphan_hole(id, kind, line)
    }

    /// Hole whose owning line does not list it
    pub fn orphan_hole(self, id: &str, kind: &str, line: &str) -> Self {
        self.raw(
            "holes",
            id,
            json!({"id": id, "type": kind, "line": line, "offset": 0.5}),
        )
    }

    pub fn item(self, id: &str, kind: &str) -> Self {
        self.raw(
            "items",
            id,
            json!({"id": id, "type": kind, "x": 0, "y": 0, "rotation": 0}),
        )
    }

    pub fn area(self, id: &str, vertices: &[&str]) -> Self {
        self.raw("areas", id, json!({"id": id, "type": "area", "vertices": vertices}))
    }

    /// Insert `value` under `key` in `collection` verbatim
    pub fn raw(mut self, collection: &str, key: &str, value: Value) -> Self {
        self.collection_mut(collection).insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Value {
        json!({
            "unit": "cm",
            "layers": Value::Object(self.layers),
            "selectedLayer": self.current,
            "width": 3000,
            "height": 2000
        })
    }

    fn collection_mut(&mut self, collection: &str) -> &mut Map<String, Value> {
        let layer_id = match &self.current {
            Some(id) => id.clone(),
            None => {
                *self = std::mem::take(self).layer("layer-1");
                "layer-1".to_string()
            }
        };
        self.layers[&layer_id][collection]
            .as_object_mut()
            .expect("builder layers always hold object collections")
    }
}

/// A square room: four vertices, four walls, a door and a window
pub fn square_room() -> Value {
    SceneBuilder::new()
        .layer("layer-1")
        .vertex("v1", 0.0, 0.0)
        .vertex("v2", 400.0, 0.0)
        .vertex("v3", 400.0, 300.0)
        .vertex("v4", 0.0, 300.0)
        .wall("w1", "v1", "v2")
        .wall("w2", "v2", "v3")
        .wall("w3", "v3", "v4")
        .wall("w4", "v4", "v1")
        .hole("door1", "door", "w1")
        .hole("win1", "window", "w3")
        .item("sofa1", "sofa")
        .area("room1", &["v1", "v2", "v3", "v4"])
        .build()
}

/// Check every structural invariant a sanitized document must satisfy
///
/// Returns the list of violations so proptest failures print all of them.
pub fn invariant_violations(doc: &SceneDocument, allow: &AllowList) -> Vec<String> {
    let mut out = Vec::new();

    for (layer_id, layer) in &doc.layers {
        for (k, v) in &layer.vertices {
            check_key(layer_id, "vertex", k, &v.id, &mut out);
            for l in &v.lines {
                if !layer.lines.contains_key(l) {
                    out.push(format!("{layer_id}: vertex {k} lists missing line {l}"));
                }
            }
            for a in v.areas.iter().flatten() {
                if !layer.areas.contains_key(a) {
                    out.push(format!("{layer_id}: vertex {k} lists missing area {a}"));
                }
            }
        }
        for (k, line) in &layer.lines {
            check_key(layer_id, "line", k, &line.id, &mut out);
            if !allow.permits_line(&line.kind) {
                out.push(format!("{layer_id}: line {k} has kind '{}'", line.kind));
            }
            if line.vertices.len() != 2 {
                out.push(format!("{layer_id}: line {k} has {} endpoints", line.vertices.len()));
            }
            for v in &line.vertices {
                if !layer.vertices.contains_key(v) {
                    out.push(format!("{layer_id}: line {k} has dangling endpoint {v}"));
                }
            }
            let mut seen = HashSet::new();
            for h in &line.holes {
                if !seen.insert(h) {
                    out.push(format!("{layer_id}: line {k} lists hole {h} twice"));
                }
            }
        }
        for (k, hole) in &layer.holes {
            check_key(layer_id, "hole", k, &hole.id, &mut out);
            if !allow.permits_hole(&hole.kind) {
                out.push(format!("{layer_id}: hole {k} has kind '{}'", hole.kind));
            }
            match layer.lines.get(&hole.line) {
                None => out.push(format!("{layer_id}: hole {k} on missing line {}", hole.line)),
                Some(line) => {
                    let count = line.holes.iter().filter(|h| *h == k).count();
                    if count != 1 {
                        out.push(format!(
                            "{layer_id}: line {} lists hole {k} {count} times",
                            hole.line
                        ));
                    }
                }
            }
        }
        for (k, item) in &layer.items {
            check_key(layer_id, "item", k, &item.id, &mut out);
            if allow.items == ElementPolicy::Discard {
                out.push(format!("{layer_id}: item {k} survived a discard policy"));
            } else if !allow.permits_item(&item.kind) {
                out.push(format!("{layer_id}: item {k} has kind '{}'", item.kind));
            }
        }
        if allow.areas == ElementPolicy::Discard && !layer.areas.is_empty() {
            out.push(format!("{layer_id}: {} areas survived", layer.areas.len()));
        }
    }

    out
}

fn check_key(layer_id: &str, kind: &str, key: &str, id: &str, out: &mut Vec<String>) {
    if key != id {
        out.push(format!("{layer_id}: {kind} key '{key}' holds id '{id}'"));
    }
}
