//! Template loading from disk, including the `.min` kind sidecar.

use std::fmt::Write as _;

use bozorth3::{Format, MinutiaKind, Template};

#[test]
fn loads_xyt_with_min_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let xyt_path = dir.path().join("probe.xyt");

    let mut xyt = String::new();
    for i in 0..12 {
        writeln!(xyt, "{} {} {} {}", 10 + i * 15, 20 + (i % 4) * 30, i * 7, 60 - i).unwrap();
    }
    std::fs::write(&xyt_path, xyt).unwrap();

    let mut min = String::from("header 1\nheader 2\nheader 3\nheader 4\n");
    let pad = " ".repeat(33);
    for i in 0..12 {
        writeln!(min, "{pad}{}", if i < 6 { "BIF" } else { "RIG" }).unwrap();
    }
    std::fs::write(dir.path().join("probe.min"), min).unwrap();

    let template = Template::load(&xyt_path, 150, Format::NistInternal).unwrap();
    assert_eq!(template.minutiae().len(), 12);

    let bifs = template
        .minutiae()
        .iter()
        .filter(|m| m.kind == Some(MinutiaKind::Bif))
        .count();
    let rigs = template
        .minutiae()
        .iter()
        .filter(|m| m.kind == Some(MinutiaKind::Rig))
        .count();
    assert_eq!((bifs, rigs), (6, 6));
}

#[test]
fn missing_or_malformed_templates_are_errors() {
    let dir = tempfile::tempdir().unwrap();

    assert!(Template::load(dir.path().join("missing.xyt"), 150, Format::NistInternal).is_err());

    let bad = dir.path().join("bad.xyt");
    std::fs::write(&bad, "12 34 ab 1").unwrap();
    assert!(Template::load(&bad, 150, Format::NistInternal).is_err());
}

#[test]
fn xyt_without_sidecar_has_unknown_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let xyt_path = dir.path().join("plain.xyt");
    std::fs::write(&xyt_path, "10 10 45 1\n40 40 200 2\n").unwrap();

    let template = Template::load(&xyt_path, 150, Format::NistInternal).unwrap();
    assert!(template.minutiae().iter().all(|m| m.kind.is_none()));
    // angles above 180 fold down on load
    assert_eq!(template.minutiae()[1].theta, -160);
}
