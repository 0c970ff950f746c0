use archify_scene::{
    sanitize, sanitize_with_report, AllowList, AllowListProfile, Collection, ElementPolicy,
    RemovalReason, SceneDocument,
};
use archify_test_utils::{invariant_violations, square_room, SceneBuilder};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn unknown_item_kind_is_dropped_from_autosave() {
    let raw = SceneBuilder::new()
        .layer("layer-1")
        .item("i1", "sofa")
        .item("i2", "alien-spaceship")
        .build();

    let out = sanitize_with_report(&raw, &AllowListProfile::Autosave.allow_list());
    let items = &out.document.layers["layer-1"].items;

    assert_eq!(items.keys().collect::<Vec<_>>(), vec!["i1"]);
    assert_eq!(out.report.removals.len(), 1);
    assert_eq!(out.report.removals[0].id, "i2");
    assert_eq!(out.report.removals[0].kind.as_deref(), Some("alien-spaceship"));
    assert_eq!(out.report.removals[0].reason, RemovalReason::UnrepresentableElement);
}

#[test]
fn orphan_hole_is_linked_to_its_line() {
    let raw = SceneBuilder::new()
        .layer("layer-1")
        .vertex("a", 0.0, 0.0)
        .vertex("b", 500.0, 0.0)
        .wall("L1", "a", "b")
        .orphan_hole("h1", "door", "L1")
        .build();
    assert_eq!(raw["layers"]["layer-1"]["lines"]["L1"]["holes"], json!([]));

    let out = sanitize_with_report(&raw, &AllowListProfile::Autosave.allow_list());

    assert_eq!(out.document.layers["layer-1"].lines["L1"].holes, vec!["h1"]);
    assert_eq!(out.report.hole_refs_added, 1);
    assert!(out.report.removals.is_empty());
}

#[test]
fn square_room_under_autosave() {
    let allow = AllowListProfile::Autosave.allow_list();
    let out = sanitize_with_report(&square_room(), &allow);
    let layer = &out.document.layers["layer-1"];

    assert_eq!(layer.vertices.len(), 4);
    assert_eq!(layer.lines.len(), 4);
    assert_eq!(layer.lines["w1"].holes, vec!["door1"]);
    assert_eq!(layer.lines["w3"].holes, vec!["win1"]);
    assert!(layer.items.contains_key("sofa1"));
    assert!(layer.areas.is_empty());
    assert_eq!(layer.vertices["v1"].lines, vec!["w1", "w4"]);

    let removed: Vec<_> = out.report.removals_in(Collection::Areas).collect();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].reason, RemovalReason::Discarded);
    assert!(invariant_violations(&out.document, &allow).is_empty());
}

#[test]
fn square_room_under_external_import() {
    let allow = AllowListProfile::ExternalImport.allow_list();
    let doc = sanitize(&square_room(), &allow);
    let layer = &doc.layers["layer-1"];

    assert!(layer.items.is_empty());
    assert!(layer.areas.is_empty());
    assert_eq!(layer.holes.len(), 2);
    assert_eq!(layer.lines.len(), 4);
    assert!(invariant_violations(&doc, &allow).is_empty());
}

#[test]
fn document_fields_outside_layers_are_kept() {
    let raw = square_room();
    let doc = sanitize(&raw, &AllowList::default());

    assert_eq!(doc.extra["unit"], "cm");
    assert_eq!(doc.extra["width"], 3000);
    assert_eq!(doc.extra["selectedLayer"], "layer-1");
    assert_eq!(doc.layers["layer-1"].extra["name"], "layer-1");
}

#[test]
fn non_wall_line_is_removed_with_its_references() {
    let raw = SceneBuilder::new()
        .layer("layer-1")
        .vertex("a", 0.0, 0.0)
        .vertex("b", 100.0, 0.0)
        .vertex("c", 100.0, 100.0)
        .wall("w1", "a", "b")
        .line("s1", "separator", "b", "c")
        .hole("h1", "window", "s1")
        .raw("vertices", "c", json!({"id": "c", "x": 100, "y": 100, "lines": ["s1"]}))
        .build();

    let out = sanitize_with_report(&raw, &AllowListProfile::Autosave.allow_list());
    let layer = &out.document.layers["layer-1"];

    assert!(!layer.lines.contains_key("s1"));
    assert!(layer.holes.is_empty());
    assert!(layer.vertices["c"].lines.is_empty());
    assert_eq!(
        out.report.removals.iter().map(|r| r.collection).collect::<Vec<_>>(),
        vec![Collection::Lines, Collection::Holes]
    );
}

#[test]
fn custom_allow_list_from_toml() {
    let allow: AllowList = toml::from_str(
        r#"
        name = "kiosk"
        item_kinds = ["bed"]
        hole_kinds = ["door"]
        line_kinds = ["wall"]
        areas = "retain"
        "#,
    )
    .unwrap();
    allow.validate().unwrap();
    assert_eq!(allow.items, ElementPolicy::Retain);

    let doc = sanitize(&square_room(), &allow);
    let layer = &doc.layers["layer-1"];

    assert!(layer.items.is_empty());
    assert_eq!(layer.holes.keys().collect::<Vec<_>>(), vec!["door1"]);
    assert!(layer.lines["w3"].holes.is_empty());
    assert!(layer.areas.contains_key("room1"));
}

#[test]
fn sanitized_document_survives_strict_round_trip() {
    let doc = sanitize(&square_room(), &AllowListProfile::Autosave.allow_list());
    let text = doc.to_json_string().unwrap();
    let back = SceneDocument::from_json_str(&text).unwrap();

    assert_eq!(back, doc);
    assert_eq!(back.fingerprint().unwrap(), doc.fingerprint().unwrap());
}

#[test]
fn report_serializes_for_tooling() {
    let raw = SceneBuilder::new()
        .layer("layer-1")
        .item("i2", "alien-spaceship")
        .build();
    let out = sanitize_with_report(&raw, &AllowListProfile::Autosave.allow_list());
    let value = serde_json::to_value(&out.report).unwrap();

    assert_eq!(
        value["removals"][0],
        json!({
            "layer": "layer-1",
            "collection": "items",
            "id": "i2",
            "kind": "alien-spaceship",
            "reason": "unrepresentable_element"
        })
    );
    assert_eq!(value["rekeyed"], 0);
}

#[test]
fn misplaced_vertices_lines_and_holes_are_rekeyed() {
    let raw = json!({
        "layers": {
            "layer-1": {
                "vertices": {
                    "ka": {"id": "a", "x": 0, "y": 0, "lines": ["kw", "w"]},
                    "b": {"id": "b", "x": 300, "y": 0, "lines": ["w"]}
                },
                "lines": {
                    "kw": {"id": "w", "type": "wall", "vertices": ["a", "b"], "holes": ["kh"]}
                },
                "holes": {
                    "kh": {"id": "h", "type": "door", "line": "w"},
                    "h2": {"id": "h2", "type": "window", "line": "kw"}
                }
            }
        }
    });
    let allow = AllowListProfile::Autosave.allow_list();

    let out = sanitize_with_report(&raw, &allow);
    let layer = &out.document.layers["layer-1"];

    let mut vertex_keys: Vec<_> = layer.vertices.keys().collect();
    vertex_keys.sort();
    assert_eq!(vertex_keys, vec!["a", "b"]);
    assert_eq!(layer.lines.keys().collect::<Vec<_>>(), vec!["w"]);
    assert_eq!(layer.holes.keys().collect::<Vec<_>>(), vec!["h"]);
    assert_eq!(layer.vertices["a"].lines, vec!["w"]);
    assert_eq!(layer.lines["w"].holes, vec!["h"]);

    assert_eq!(out.report.rekeyed, 3);
    assert_eq!(out.report.hole_refs_added, 1);
    assert_eq!(out.report.stale_refs_pruned, 2);
    assert_eq!(out.report.removals.len(), 1);
    assert_eq!(out.report.removals[0].id, "h2");
    assert_eq!(
        out.report.removals[0].reason,
        RemovalReason::DanglingReference { target: "kw".to_string() }
    );
    assert!(invariant_violations(&out.document, &allow).is_empty());

    let again = sanitize_with_report(&out.document.to_value().unwrap(), &allow);
    assert_eq!(again.document, out.document);
    assert!(again.report.is_clean());
}

#[test]
fn stale_key_loses_to_matching_key() {
    let raw = SceneBuilder::new()
        .layer("layer-1")
        .vertex("a", 0.0, 0.0)
        .raw("vertices", "stale", json!({"id": "a", "x": 5, "y": 5}))
        .build();

    let out = sanitize_with_report(&raw, &AllowListProfile::Autosave.allow_list());
    let vertices = &out.document.layers["layer-1"].vertices;

    assert_eq!(vertices.len(), 1);
    assert_eq!(vertices["a"].x.as_f64(), Some(0.0));
    assert_eq!(out.report.removals[0].reason, RemovalReason::DuplicateId);
}
