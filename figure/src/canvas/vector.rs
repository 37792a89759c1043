// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::io::Write;

use peniko::kurbo::BezPath;
use peniko::Color;
use svg::node::element::{Path, Rectangle};
use svg::{Document, Node};

use super::Canvas;
use crate::EncodeError;

/// An SVG document measured in points.
pub(crate) struct SvgCanvas {
    width: f64,
    height: f64,
    document: Document,
}

impl SvgCanvas {
    pub(crate) fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            document: Self::empty(width, height),
        }
    }

    fn empty(width: f64, height: f64) -> Document {
        Document::new()
            .set("width", format!("{width}pt"))
            .set("height", format!("{height}pt"))
            .set("viewBox", (0.0, 0.0, width, height))
    }
}

/// `#rrggbb` and, for translucent colors, the opacity.
fn paint(color: Color) -> (String, Option<f32>) {
    let rgba = color.to_rgba8();
    let hex = format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b);
    let alpha = color.components[3].clamp(0.0, 1.0);
    (hex, (alpha < 1.0).then_some(alpha))
}

impl Canvas for SvgCanvas {
    fn clear(&mut self, color: Color) {
        self.document = Self::empty(self.width, self.height);
        let (fill, opacity) = paint(color);
        if opacity == Some(0.0) {
            return;
        }
        let mut rect = Rectangle::new()
            .set("width", self.width)
            .set("height", self.height)
            .set("fill", fill);
        if let Some(opacity) = opacity {
            rect = rect.set("fill-opacity", opacity);
        }
        self.document.append(rect);
    }

    fn fill(&mut self, path: &BezPath, color: Color) {
        if path.elements().is_empty() {
            return;
        }
        let (fill, opacity) = paint(color);
        let mut element = Path::new().set("d", path.to_svg()).set("fill", fill);
        if let Some(opacity) = opacity {
            element = element.set("fill-opacity", opacity);
        }
        self.document.append(element);
    }

    fn stroke(&mut self, path: &BezPath, color: Color, width: f64) {
        if path.elements().is_empty() {
            return;
        }
        let (stroke, opacity) = paint(color);
        let mut element = Path::new()
            .set("d", path.to_svg())
            .set("fill", "none")
            .set("stroke", stroke)
            .set("stroke-width", width)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round");
        if let Some(opacity) = opacity {
            element = element.set("stroke-opacity", opacity);
        }
        self.document.append(element);
    }

    fn encode(&self, writer: &mut dyn Write) -> Result<(), EncodeError> {
        svg::write(writer, &self.document)?;
        Ok(())
    }
}
