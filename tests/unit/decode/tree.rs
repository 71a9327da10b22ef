use super::*;
use crate::model::document::{LayerId, TextInfo};

fn rec(id: u32, name: &str) -> LayerRecord {
    LayerRecord {
        id: LayerId(id),
        rect: Rect::new(0, 0, 1, 1),
        channels: Vec::new(),
        blend_key: *b"norm",
        opacity: 255,
        fill_opacity: 255,
        clipping: 0,
        flags: 0,
        name: name.to_string(),
        section: None,
        section_blend_key: None,
        text: None,
        adjustment: None,
    }
}

fn folder(id: u32, name: &str, divider: SectionDivider) -> LayerRecord {
    LayerRecord {
        section: Some(divider),
        rect: Rect::default(),
        ..rec(id, name)
    }
}

fn build(records: Vec<LayerRecord>) -> (Vec<Layer>, Vec<DecodeWarning>) {
    let mut rasters = vec![None; records.len()];
    let mut warnings = Vec::new();
    let layers = build_layer_tree(records, &mut rasters, &mut warnings);
    (layers, warnings)
}

fn names(layers: &[Layer]) -> Vec<&str> {
    layers.iter().map(|l| l.name.as_str()).collect()
}

#[test]
fn flat_records_stay_bottom_to_top() {
    let (layers, warnings) = build(vec![rec(0, "bg"), rec(1, "mid"), rec(2, "top")]);
    assert!(warnings.is_empty());
    assert_eq!(names(&layers), ["bg", "mid", "top"]);
}

#[test]
fn group_collects_children_between_markers() {
    // stored bottom-to-top: end marker, children, folder record
    let records = vec![
        rec(0, "bg"),
        folder(1, "</Layer group>", SectionDivider::BoundingEnd),
        rec(2, "child a"),
        rec(3, "child b"),
        folder(4, "group", SectionDivider::ClosedFolder),
        rec(5, "top"),
    ];
    let (layers, warnings) = build(records);
    assert!(warnings.is_empty());
    assert_eq!(names(&layers), ["bg", "group", "top"]);

    let group = &layers[1];
    assert!(group.is_group());
    assert_eq!(group.id, LayerId(4));
    assert_eq!(names(group.children()), ["child a", "child b"]);
    let LayerKind::Group(g) = &group.kind else {
        panic!("expected group");
    };
    assert!(!g.expanded);
}

#[test]
fn nested_groups() {
    let records = vec![
        folder(0, "end outer", SectionDivider::BoundingEnd),
        folder(1, "end inner", SectionDivider::BoundingEnd),
        rec(2, "leaf"),
        folder(3, "inner", SectionDivider::OpenFolder),
        rec(4, "sibling"),
        folder(5, "outer", SectionDivider::OpenFolder),
    ];
    let (layers, warnings) = build(records);
    assert!(warnings.is_empty());
    assert_eq!(names(&layers), ["outer"]);
    let outer = &layers[0];
    assert_eq!(names(outer.children()), ["inner", "sibling"]);
    assert_eq!(names(outer.children()[0].children()), ["leaf"]);
}

#[test]
fn stray_end_marker_is_ignored_with_warning() {
    let records = vec![
        rec(0, "a"),
        folder(1, "end", SectionDivider::BoundingEnd),
    ];
    let (layers, warnings) = build(records);
    assert_eq!(names(&layers), ["a"]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::StructuralInconsistency);
    assert_eq!(warnings[0].layer, Some(LayerId(1)));
}

#[test]
fn unclosed_group_is_closed_at_end_with_warning() {
    let records = vec![rec(0, "child"), folder(1, "group", SectionDivider::OpenFolder)];
    let (layers, warnings) = build(records);
    assert_eq!(names(&layers), ["group"]);
    assert_eq!(names(layers[0].children()), ["child"]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::StructuralInconsistency);
}

#[test]
fn group_uses_section_blend_key_and_flags() {
    let mut header = folder(2, "g", SectionDivider::OpenFolder);
    header.blend_key = *b"norm";
    header.section_blend_key = Some(*b"pass");
    header.flags = 0x02;
    header.opacity = 128;
    let records = vec![folder(0, "end", SectionDivider::BoundingEnd), rec(1, "c"), header];
    let (layers, _) = build(records);
    let g = &layers[0];
    assert_eq!(g.blend_mode, BlendMode::PassThrough);
    assert!(!g.visible);
    assert!((g.opacity - 128.0 / 255.0).abs() < 1e-6);
}

#[test]
fn unknown_blend_key_falls_back_to_normal() {
    let mut r = rec(0, "odd");
    r.blend_key = *b"wat?";
    let (layers, warnings) = build(vec![r]);
    assert_eq!(layers[0].blend_mode, BlendMode::Normal);
    assert_eq!(layers[0].blend_key, "wat?");
    assert_eq!(warnings[0].kind, WarningKind::UnknownBlendMode);
}

#[test]
fn layer_kinds_follow_record_contents() {
    let mut text = rec(0, "t");
    text.text = Some(TextInfo {
        content: "hi".to_string(),
        ..TextInfo::default()
    });
    let mut adj = rec(1, "levels");
    adj.adjustment = Some("levl".to_string());
    let image = rec(2, "px");

    let records = vec![text, adj, image];
    let mut rasters = vec![
        Some(Raster::transparent(1, 1).unwrap()),
        Some(Raster::transparent(1, 1).unwrap()),
        Some(Raster::transparent(1, 1).unwrap()),
    ];
    let mut warnings = Vec::new();
    let layers = build_layer_tree(records, &mut rasters, &mut warnings);

    assert!(matches!(layers[0].kind, LayerKind::Text(_)));
    assert_eq!(layers[0].text().map(|t| t.content.as_str()), Some("hi"));
    assert!(layers[0].raster().is_some());
    assert!(matches!(&layers[1].kind, LayerKind::Adjustment(a) if a.key == "levl"));
    assert!(layers[1].raster().is_none());
    assert!(matches!(layers[2].kind, LayerKind::Image(_)));
    assert!(layers[2].raster().is_some());
    assert!(rasters.iter().all(Option::is_none));
}

#[test]
fn hidden_groups_hide_their_descendants() {
    let mut g = folder(3, "g", SectionDivider::OpenFolder);
    g.flags = 0x02;
    let records = vec![
        rec(0, "below"),
        folder(1, "end", SectionDivider::BoundingEnd),
        rec(2, "inside"),
        g,
        rec(4, "above"),
    ];
    assert_eq!(
        effectively_hidden(&records),
        vec![false, true, true, true, false]
    );
}

#[test]
fn clipping_byte_marks_clipped_layers() {
    let (layers, _) = build(vec![
        rec(0, "base"),
        LayerRecord {
            clipping: 1,
            ..rec(1, "clipped")
        },
    ]);
    assert!(!layers[0].clipped);
    assert!(layers[1].clipped);
}
