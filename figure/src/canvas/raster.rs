// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster output through `vello_cpu`.
//!
//! Marks are recorded into a [`RenderContext`] as they are drawn and
//! rasterized into a premultiplied [`Pixmap`] when the canvas is encoded.

use std::io::Write;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use peniko::kurbo::{BezPath, Cap, Join, Rect, Stroke};
use peniko::Color;
use vello_cpu::{Pixmap, RenderContext, RenderMode};

use super::Canvas;
use crate::EncodeError;

/// The pixels of `pixmap` as straight (not premultiplied) RGBA8, row by row.
pub fn unpremultiplied(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len() * 4);
    for px in pixmap.data() {
        let rgb = [px.r, px.g, px.b];
        if px.a == 0 || px.a == 255 {
            out.extend(rgb);
        } else {
            let k = 255.0 / f32::from(px.a);
            out.extend(rgb.map(|c| (f32::from(c) * k + 0.5).min(255.0) as u8));
        }
        out.push(px.a);
    }
    out
}

/// RGB8 composited over white, for formats without alpha.
fn flattened(pixmap: &Pixmap) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixmap.data().len() * 3);
    for px in pixmap.data() {
        let under = 255 - px.a;
        out.extend([px.r, px.g, px.b].map(|c| c.saturating_add(under)));
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Encoding {
    Png,
    Jpeg { quality: u8 },
}

pub(crate) struct RasterCanvas {
    ctx: RenderContext,
    encoding: Encoding,
}

impl RasterCanvas {
    /// `width` and `height` are validated device sizes, at most
    /// [`MAX_PIXELS`](crate::MAX_PIXELS).
    pub(crate) fn new(width: u16, height: u16, encoding: Encoding) -> Self {
        Self {
            ctx: RenderContext::new(width, height),
            encoding,
        }
    }

    /// Rasterizes everything drawn so far.
    pub(crate) fn to_pixmap(&self) -> Pixmap {
        let mut pixmap = Pixmap::new(self.ctx.width(), self.ctx.height());
        self.ctx.render_to_pixmap(&mut pixmap, RenderMode::default());
        pixmap
    }
}

impl Canvas for RasterCanvas {
    fn clear(&mut self, color: Color) {
        self.ctx.reset();
        let bounds = Rect::new(
            0.0,
            0.0,
            f64::from(self.ctx.width()),
            f64::from(self.ctx.height()),
        );
        self.ctx.set_paint(color);
        self.ctx.fill_rect(&bounds);
    }

    fn fill(&mut self, path: &BezPath, color: Color) {
        self.ctx.set_paint(color);
        self.ctx.fill_path(path);
    }

    fn stroke(&mut self, path: &BezPath, color: Color, width: f64) {
        if width <= 0.0 {
            return;
        }
        // Round ends and corners, as in the SVG output.
        self.ctx.set_stroke(
            Stroke::new(width)
                .with_caps(Cap::Round)
                .with_join(Join::Round),
        );
        self.ctx.set_paint(color);
        self.ctx.stroke_path(path);
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), EncodeError> {
        let pixmap = self.to_pixmap();
        let (width, height) = (u32::from(pixmap.width()), u32::from(pixmap.height()));
        match self.encoding {
            Encoding::Png => {
                let mut encoder = png::Encoder::new(writer, width, height);
                encoder.set_color(png::ColorType::Rgba);
                encoder.set_depth(png::BitDepth::Eight);
                let mut writer = encoder.write_header()?;
                writer.write_image_data(&unpremultiplied(&pixmap))?;
                writer.finish()?;
            }
            Encoding::Jpeg { quality } => {
                JpegEncoder::new_with_quality(writer, quality).write_image(
                    &flattened(&pixmap),
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )?;
            }
        }
        Ok(())
    }
}
