use archify_scene::{sanitize, sanitize_with_report, AllowListProfile, Collection};
use archify_test_utils::{invariant_violations, SceneBuilder};
use proptest::prelude::*;
use serde_json::{json, Value};

const VERTEX_IDS: &[&str] = &["v1", "v2", "v3", "v4"];
const VERTEX_KEYS: &[&str] = &["kv1", "kv2"];
const VERTEX_REFS: &[&str] = &["v1", "v2", "v3", "v4", "ghost", "kv1"];
const LINE_IDS: &[&str] = &["w1", "w2", "w3"];
const LINE_KEYS: &[&str] = &["kw1", "kw2"];
const LINE_REFS: &[&str] = &["w1", "w2", "w3", "gone", "kw1"];
const LINE_KINDS: &[&str] = &["wall", "separator", ""];
const HOLE_IDS: &[&str] = &["h1", "h2", "h3"];
const HOLE_KEYS: &[&str] = &["kh1", "kh2"];
const HOLE_KINDS: &[&str] = &["door", "window", "gate", "portal"];
const ITEM_KEYS: &[&str] = &["i1", "i2", "i3", "stale"];
const ITEM_IDS: &[&str] = &["i1", "i2", "i3"];
const ITEM_KINDS: &[&str] = &["sofa", "tv", "bed", "alien-spaceship"];
const AREA_IDS: &[&str] = &["r1", "r2"];

#[derive(Debug, Clone)]
enum Op {
    Vertex(&'static str),
    Wall(&'static str, &'static str, &'static str),
    Line(&'static str, &'static str, &'static str, &'static str),
    Hole(&'static str, &'static str, &'static str, bool),
    Item(&'static str, &'static str, &'static str),
    Area(&'static str),
    /// Elements stored under a key that differs from their `id`
    VertexUnder(&'static str, &'static str),
    WallUnder(&'static str, &'static str, &'static str, &'static str),
    HoleUnder(&'static str, &'static str, &'static str, &'static str),
}

fn pick(options: &'static [&'static str]) -> impl Strategy<Value = &'static str> {
    prop::sample::select(options)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => pick(VERTEX_IDS).prop_map(Op::Vertex),
        3 => (pick(LINE_IDS), pick(VERTEX_REFS), pick(VERTEX_REFS))
            .prop_map(|(id, from, to)| Op::Wall(id, from, to)),
        1 => (pick(LINE_IDS), pick(LINE_KINDS), pick(VERTEX_REFS), pick(VERTEX_REFS))
            .prop_map(|(id, kind, from, to)| Op::Line(id, kind, from, to)),
        2 => (pick(HOLE_IDS), pick(HOLE_KINDS), pick(LINE_REFS), any::<bool>())
            .prop_map(|(id, kind, line, linked)| Op::Hole(id, kind, line, linked)),
        2 => (pick(ITEM_KEYS), pick(ITEM_IDS), pick(ITEM_KINDS))
            .prop_map(|(key, id, kind)| Op::Item(key, id, kind)),
        1 => pick(AREA_IDS).prop_map(Op::Area),
        1 => (pick(VERTEX_KEYS), pick(VERTEX_IDS))
            .prop_map(|(key, id)| Op::VertexUnder(key, id)),
        1 => (pick(LINE_KEYS), pick(LINE_IDS), pick(VERTEX_REFS), pick(VERTEX_REFS))
            .prop_map(|(key, id, from, to)| Op::WallUnder(key, id, from, to)),
        1 => (pick(HOLE_KEYS), pick(HOLE_IDS), pick(HOLE_KINDS), pick(LINE_REFS))
            .prop_map(|(key, id, kind, line)| Op::HoleUnder(key, id, kind, line)),
    ]
}

fn apply(builder: SceneBuilder, op: &Op, step: usize) -> SceneBuilder {
    match *op {
        #[allow(clippy::cast_precision_loss)]
        Op::Vertex(id) => builder.vertex(id, step as f64 * 10.0, 0.0),
        Op::Wall(id, from, to) => builder.wall(id, from, to),
        Op::Line(id, kind, from, to) => builder.line(id, kind, from, to),
        Op::Hole(id, kind, line, true) => builder.hole(id, kind, line),
        Op::Hole(id, kind, line, false) => builder.orphan_hole(id, kind, line),
        Op::Item(key, id, kind) => builder.raw(
            "items",
            key,
            json!({"id": id, "type": kind, "x": 0, "y": 0}),
        ),
        Op::Area(id) => builder.area(id, &["v1", "v2", "v3"]),
        Op::VertexUnder(key, id) => builder.raw(
            "vertices",
            key,
            json!({"id": id, "x": step, "y": 0, "lines": [], "areas": []}),
        ),
        Op::WallUnder(key, id, from, to) => builder.raw(
            "lines",
            key,
            json!({"id": id, "type": "wall", "vertices": [from, to], "holes": []}),
        ),
        Op::HoleUnder(key, id, kind, line) => builder.raw(
            "holes",
            key,
            json!({"id": id, "type": kind, "line": line, "offset": 0.25}),
        ),
    }
}

fn document() -> impl Strategy<Value = Value> {
    prop::collection::vec(prop::collection::vec(op(), 0..24), 1..3).prop_map(|layers| {
        let mut builder = SceneBuilder::new();
        for (i, ops) in layers.iter().enumerate() {
            builder = builder.layer(&format!("layer-{i}"));
            for (step, op) in ops.iter().enumerate() {
                builder = apply(builder, op, step);
            }
        }
        builder.build()
    })
}

fn profile() -> impl Strategy<Value = AllowListProfile> {
    prop_oneof![
        Just(AllowListProfile::Autosave),
        Just(AllowListProfile::ExternalImport),
    ]
}

fn input_count(raw: &Value, collection: Collection) -> usize {
    raw["layers"]
        .as_object()
        .map_or(0, |layers| {
            layers
                .values()
                .filter_map(|layer| layer[collection.as_str()].as_object())
                .map(serde_json::Map::len)
                .sum()
        })
}

proptest! {
    #[test]
    fn prop_output_satisfies_invariants(raw in document(), profile in profile()) {
        let allow = profile.allow_list();
        let doc = sanitize(&raw, &allow);
        let violations = invariant_violations(&doc, &allow);
        prop_assert!(violations.is_empty(), "{:#?}", violations);
    }

    #[test]
    fn prop_sanitize_is_idempotent(raw in document(), profile in profile()) {
        let allow = profile.allow_list();
        let once = sanitize(&raw, &allow);
        let twice = sanitize_with_report(&once.to_value().unwrap(), &allow);

        prop_assert_eq!(&twice.document, &once);
        prop_assert!(twice.report.is_clean(), "{:?}", twice.report);
    }

    #[test]
    fn prop_input_is_left_untouched(raw in document(), profile in profile()) {
        let before = raw.clone();
        let _ = sanitize(&raw, &profile.allow_list());
        prop_assert_eq!(raw, before);
    }

    #[test]
    fn prop_every_dropped_element_is_reported(raw in document(), profile in profile()) {
        let out = sanitize_with_report(&raw, &profile.allow_list());
        let stats = out.document.stats();

        for (collection, kept) in [
            (Collection::Vertices, stats.vertices),
            (Collection::Lines, stats.lines),
            (Collection::Holes, stats.holes),
            (Collection::Items, stats.items),
            (Collection::Areas, stats.areas),
        ] {
            let removed = out.report.removals_in(collection).count();
            prop_assert_eq!(
                input_count(&raw, collection),
                kept + removed,
                "collection {}",
                collection
            );
        }
    }

    #[test]
    fn prop_layers_and_document_fields_survive(raw in document(), profile in profile()) {
        let doc = sanitize(&raw, &profile.allow_list());
        let input_layers: Vec<&String> = raw["layers"].as_object().unwrap().keys().collect();
        let output_layers: Vec<&String> = doc.layers.keys().collect();

        prop_assert_eq!(input_layers, output_layers);
        prop_assert_eq!(&doc.extra["unit"], &raw["unit"]);
        prop_assert_eq!(&doc.extra["selectedLayer"], &raw["selectedLayer"]);
    }
}
