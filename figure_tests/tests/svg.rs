// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vector output.

use anyhow::Result;
use figure::figure_encoding::{Color, Layer, ScaleOverride, Viewport};
use figure::{export_direct, export_via_device, ExportOptions, Format, Size};
use figure_tests::{parse_svg, scatter, OutputDir};

#[test]
fn svg_output_is_deterministic() -> Result<()> {
    let out = OutputDir::new("svg_output_is_deterministic")?;
    let spec = scatter().add_layer(Layer::smooth());
    export_direct(&spec, out.join("a.svg"), &ExportOptions::default())?;
    export_direct(&spec, out.join("b.svg"), &ExportOptions::default())?;
    assert_eq!(
        std::fs::read(out.join("a.svg"))?,
        std::fs::read(out.join("b.svg"))?
    );
    parse_svg(&out.join("a.svg"))?;
    Ok(())
}

#[test]
fn every_mark_becomes_a_path() -> Result<()> {
    let out = OutputDir::new("every_mark_becomes_a_path")?;
    let path = out.join("scatter.svg");
    let spec = scatter().add_layer(Layer::lines());
    export_via_device(&spec, &path, Format::Svg, Size::default())?;

    let figure = spec.realize(Viewport::new(504.0, 360.0))?;
    let text = std::fs::read_to_string(&path)?;
    assert_eq!(text.matches("<path").count(), figure.marks().len());
    // The background is the only rectangle.
    assert_eq!(text.matches("<rect").count(), 1);
    Ok(())
}

#[test]
fn svg_is_sized_in_points() -> Result<()> {
    let out = OutputDir::new("svg_is_sized_in_points")?;
    let path = out.join("small.svg");
    let exported = export_via_device(&scatter(), &path, Format::Svg, Size::inches(4.0, 3.0))?;
    assert_eq!((exported.width, exported.height), (288, 216));

    let text = std::fs::read_to_string(&path)?;
    assert!(text.contains(r#"width="288pt""#), "{text}");
    assert!(text.contains(r#"height="216pt""#), "{text}");
    Ok(())
}

#[test]
fn manual_colors_are_written_as_hex() -> Result<()> {
    let out = OutputDir::new("manual_colors_are_written_as_hex")?;
    let path = out.join("manual.svg");
    let colors = [
        Color::from_rgb8(0x1b, 0x9e, 0x77),
        Color::from_rgb8(0xd9, 0x5f, 0x02),
        Color::from_rgb8(0x75, 0x70, 0xb3),
        Color::from_rgb8(0xe7, 0x29, 0x8a),
        Color::from_rgb8(0x66, 0xa6, 0x1e),
    ];
    let spec = scatter().add_scale(ScaleOverride::color_manual(colors));
    let exported = export_direct(&spec, &path, &ExportOptions::default())?;
    assert_eq!(exported.format, Format::Svg);

    let text = std::fs::read_to_string(&path)?;
    for hex in ["#1b9e77", "#d95f02", "#7570b3", "#e7298a", "#66a61e"] {
        assert!(text.contains(hex), "{hex} missing");
    }
    Ok(())
}

#[test]
fn translucent_layers_carry_opacity() -> Result<()> {
    let out = OutputDir::new("translucent_layers_carry_opacity")?;
    let path = out.join("faded.svg");
    let spec = scatter().add_layer(Layer::lines().with_alpha(0.25));
    export_direct(&spec, &path, &ExportOptions::default())?;

    let text = std::fs::read_to_string(&path)?;
    assert!(text.contains(r#"stroke-opacity="0.25""#), "{text}");
    parse_svg(&path)?;
    Ok(())
}
