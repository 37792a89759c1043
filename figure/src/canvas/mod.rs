// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing surfaces behind a device.

pub(crate) mod raster;
pub(crate) mod vector;

use std::io::Write;

use figure_encoding::{Figure, Mark};
use peniko::color::palette;
use peniko::kurbo::BezPath;
use peniko::Color;

use crate::{DeviceOptions, EncodeError, Format};

/// A surface that figures are drawn onto and that can serialize itself.
pub(crate) trait Canvas {
    /// Discards everything drawn so far and fills the surface with `color`.
    fn clear(&mut self, color: Color);
    fn fill(&mut self, path: &BezPath, color: Color);
    fn stroke(&mut self, path: &BezPath, color: Color, width: f64);
    fn encode(&self, writer: &mut dyn Write) -> Result<(), EncodeError>;
}

/// Creates a blank canvas for `format`.
///
/// Raster canvases are `width` × `height` pixels, vector canvases are
/// `width` × `height` points. Sizes come from a validated [`Size`](crate::Size),
/// so raster dimensions fit in a `u16`.
pub(crate) fn create(
    format: Format,
    width: f64,
    height: f64,
    options: &DeviceOptions,
) -> Box<dyn Canvas> {
    let background = options.background.unwrap_or(palette::css::WHITE);
    let mut canvas: Box<dyn Canvas> = match format {
        Format::Svg => Box::new(vector::SvgCanvas::new(width, height)),
        Format::Png => Box::new(raster::RasterCanvas::new(
            width as u16,
            height as u16,
            raster::Encoding::Png,
        )),
        Format::Jpeg => Box::new(raster::RasterCanvas::new(
            width as u16,
            height as u16,
            raster::Encoding::Jpeg {
                quality: options.jpeg_quality.clamp(1, 100),
            },
        )),
    };
    canvas.clear(background);
    canvas
}

/// Replaces the contents of `canvas` with `figure`.
pub(crate) fn draw(canvas: &mut dyn Canvas, figure: &Figure, background: Option<Color>) {
    canvas.clear(background.unwrap_or(figure.background()));
    for mark in figure.marks() {
        match mark {
            Mark::Fill { path, color } => canvas.fill(path, *color),
            Mark::Stroke { path, color, width } => canvas.stroke(path, *color, *width),
        }
    }
}
