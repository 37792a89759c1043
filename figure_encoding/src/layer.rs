// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visual layers of a plot.
//!
//! Every layer draws the mapped data in one way. Aesthetics that are *set* on
//! a layer (for example [`PointLayer::color`]) are constants and take
//! precedence over the same channel being *mapped* to a column.

use peniko::kurbo::{BezPath, Circle, Point, Rect, Shape as _};
use peniko::Color;

/// A scatterplot symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Diamond,
    Plus,
    Cross,
}

impl Shape {
    /// The order in which a discrete shape scale hands out symbols.
    ///
    /// Shapes that are easy to tell apart come first.
    pub const SEQUENCE: [Self; 6] = [
        Self::Circle,
        Self::Triangle,
        Self::Square,
        Self::Plus,
        Self::Cross,
        Self::Diamond,
    ];

    /// Whether the symbol is drawn as a filled area, rather than as strokes.
    pub fn is_filled(self) -> bool {
        !matches!(self, Self::Plus | Self::Cross)
    }

    /// The outline of the symbol centered on `center`, fitting a circle of `radius`.
    pub fn outline(self, center: Point, radius: f64) -> BezPath {
        let Point { x, y } = center;
        match self {
            Self::Circle => Circle::new(center, radius).to_path(0.1),
            Self::Square => {
                // Same area as the circle.
                let half = radius * 0.886;
                Rect::new(x - half, y - half, x + half, y + half).to_path(0.1)
            }
            Self::Triangle => {
                let mut path = BezPath::new();
                path.move_to((x, y - radius * 1.15));
                path.line_to((x + radius * 1.0, y + radius * 0.58));
                path.line_to((x - radius * 1.0, y + radius * 0.58));
                path.close_path();
                path
            }
            Self::Diamond => {
                let r = radius * 1.2;
                let mut path = BezPath::new();
                path.move_to((x, y - r));
                path.line_to((x + r, y));
                path.line_to((x, y + r));
                path.line_to((x - r, y));
                path.close_path();
                path
            }
            Self::Plus => {
                let mut path = BezPath::new();
                path.move_to((x - radius, y));
                path.line_to((x + radius, y));
                path.move_to((x, y - radius));
                path.line_to((x, y + radius));
                path
            }
            Self::Cross => {
                let r = radius * std::f64::consts::FRAC_1_SQRT_2;
                let mut path = BezPath::new();
                path.move_to((x - r, y - r));
                path.line_to((x + r, y + r));
                path.move_to((x - r, y + r));
                path.line_to((x + r, y - r));
                path
            }
        }
    }
}

/// Draws one symbol per row.
#[derive(Clone, Debug)]
pub struct PointLayer {
    pub color: Option<Color>,
    pub shape: Option<Shape>,
    /// Diameter in points.
    pub size: Option<f64>,
    pub alpha: f32,
}

impl Default for PointLayer {
    fn default() -> Self {
        Self {
            color: None,
            shape: None,
            size: None,
            alpha: 1.0,
        }
    }
}

/// Connects rows in order of increasing x, one line per color group.
#[derive(Clone, Debug)]
pub struct LineLayer {
    pub color: Option<Color>,
    /// Stroke width in points.
    pub width: f64,
    pub alpha: f32,
}

impl Default for LineLayer {
    fn default() -> Self {
        Self {
            color: None,
            width: 1.0,
            alpha: 1.0,
        }
    }
}

/// Draws bars from zero, stacking color groups.
///
/// Without a y mapping the bar height is the number of rows at each x.
#[derive(Clone, Debug)]
pub struct BarLayer {
    pub color: Option<Color>,
    /// Fraction of the space available at each x position covered by the bar.
    pub width: f64,
    pub alpha: f32,
}

impl Default for BarLayer {
    fn default() -> Self {
        Self {
            color: None,
            width: 0.9,
            alpha: 1.0,
        }
    }
}

/// A least-squares fitted line, one per color group.
#[derive(Clone, Debug)]
pub struct SmoothLayer {
    pub color: Option<Color>,
    /// Stroke width in points.
    pub width: f64,
    pub alpha: f32,
}

impl Default for SmoothLayer {
    fn default() -> Self {
        Self {
            color: None,
            width: 1.5,
            alpha: 1.0,
        }
    }
}

/// One visual element of a figure.
#[derive(Clone, Debug)]
pub enum Layer {
    Points(PointLayer),
    Lines(LineLayer),
    Bars(BarLayer),
    Smooth(SmoothLayer),
}

/// The kind of a [`Layer`], without its settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Points,
    Lines,
    Bars,
    Smooth,
}

impl LayerKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Lines => "lines",
            Self::Bars => "bars",
            Self::Smooth => "smooth",
        }
    }
}

impl Layer {
    pub fn points() -> Self {
        Self::Points(PointLayer::default())
    }

    pub fn lines() -> Self {
        Self::Lines(LineLayer::default())
    }

    pub fn bars() -> Self {
        Self::Bars(BarLayer::default())
    }

    pub fn smooth() -> Self {
        Self::Smooth(SmoothLayer::default())
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Self::Points(_) => LayerKind::Points,
            Self::Lines(_) => LayerKind::Lines,
            Self::Bars(_) => LayerKind::Bars,
            Self::Smooth(_) => LayerKind::Smooth,
        }
    }

    /// Sets a constant color, overriding any color mapping for this layer.
    pub fn with_color(mut self, color: Color) -> Self {
        match &mut self {
            Self::Points(l) => l.color = Some(color),
            Self::Lines(l) => l.color = Some(color),
            Self::Bars(l) => l.color = Some(color),
            Self::Smooth(l) => l.color = Some(color),
        }
        self
    }

    /// Sets the opacity of everything this layer draws.
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        match &mut self {
            Self::Points(l) => l.alpha = alpha,
            Self::Lines(l) => l.alpha = alpha,
            Self::Bars(l) => l.alpha = alpha,
            Self::Smooth(l) => l.alpha = alpha,
        }
        self
    }

    pub(crate) fn color(&self) -> Option<Color> {
        match self {
            Self::Points(l) => l.color,
            Self::Lines(l) => l.color,
            Self::Bars(l) => l.color,
            Self::Smooth(l) => l.color,
        }
    }

    pub(crate) fn alpha(&self) -> f32 {
        match self {
            Self::Points(l) => l.alpha,
            Self::Lines(l) => l.alpha,
            Self::Bars(l) => l.alpha,
            Self::Smooth(l) => l.alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::kurbo::Shape as _;

    #[test]
    fn outlines_are_centered() {
        let center = Point::new(50.0, 40.0);
        for shape in Shape::SEQUENCE {
            let bbox = shape.outline(center, 5.0).bounding_box();
            assert!(bbox.contains(center), "{shape:?}");
            assert!(bbox.width() > 5.0 && bbox.width() < 13.0, "{shape:?}");
        }
    }

    #[test]
    fn set_color_applies_to_every_kind() {
        let red = Color::from_rgb8(255, 0, 0);
        for layer in [Layer::points(), Layer::lines(), Layer::bars(), Layer::smooth()] {
            let layer = layer.with_color(red).with_alpha(2.0);
            assert_eq!(layer.color().map(|c| c.to_rgba8()), Some(red.to_rgba8()));
            assert_eq!(layer.alpha(), 1.0);
        }
    }
}
