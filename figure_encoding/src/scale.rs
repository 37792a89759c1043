// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::Color;

use crate::layer::Shape;
use crate::palette::{Gradient, Palette};

/// A transformation applied to a continuous position channel before it is
/// mapped onto the panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AxisTransform {
    #[default]
    Identity,
    /// Drops values that are not strictly positive.
    Log10,
    /// Drops negative values.
    Sqrt,
    /// Flips the axis direction.
    Reverse,
}

impl AxisTransform {
    /// Applies the transform, returning `None` for values outside its domain.
    pub fn apply(self, value: f64) -> Option<f64> {
        match self {
            Self::Identity => Some(value),
            Self::Log10 => (value > 0.0).then(|| value.log10()),
            Self::Sqrt => (value >= 0.0).then(|| value.sqrt()),
            Self::Reverse => Some(-value),
        }
    }
}

/// Overrides for the x or y channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PositionScale {
    pub transform: AxisTransform,
    /// Limits in data units. Values outside of them are dropped.
    pub limits: Option<(f64, f64)>,
}

/// How the color channel turns data into colors.
#[derive(Clone, Debug)]
pub enum ColorScale {
    /// For numeric columns.
    Gradient(Gradient),
    /// For categorical columns.
    Palette(Palette),
    /// Explicit colors for categorical levels, in level order.
    Manual(Vec<Color>),
}

impl ColorScale {
    pub(crate) fn is_continuous(&self) -> bool {
        matches!(self, Self::Gradient(_))
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Gradient(_) => "gradient",
            Self::Palette(_) => "palette",
            Self::Manual(_) => "manual",
        }
    }
}

/// Maps a numeric column onto symbol diameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeScale {
    /// Smallest and largest diameter in points.
    pub range: (f64, f64),
}

impl Default for SizeScale {
    fn default() -> Self {
        Self { range: (2.0, 8.0) }
    }
}

/// Maps a categorical column onto symbols, in level order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeScale {
    pub shapes: Vec<Shape>,
}

impl Default for ShapeScale {
    fn default() -> Self {
        Self {
            shapes: Shape::SEQUENCE.to_vec(),
        }
    }
}

/// The channel a [`ScaleOverride`] applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScaleKind {
    X,
    Y,
    Color,
    Size,
    Shape,
}

/// A replacement for the default scale of one channel.
///
/// A [`PlotSpec`](crate::PlotSpec) keeps every override it was given; among
/// overrides of the same [`ScaleKind`] the last one wins.
#[derive(Clone, Debug)]
pub enum ScaleOverride {
    X(PositionScale),
    Y(PositionScale),
    Color(ColorScale),
    Size(SizeScale),
    Shape(ShapeScale),
}

impl ScaleOverride {
    pub fn kind(&self) -> ScaleKind {
        match self {
            Self::X(_) => ScaleKind::X,
            Self::Y(_) => ScaleKind::Y,
            Self::Color(_) => ScaleKind::Color,
            Self::Size(_) => ScaleKind::Size,
            Self::Shape(_) => ScaleKind::Shape,
        }
    }

    pub fn x_log10() -> Self {
        Self::X(PositionScale {
            transform: AxisTransform::Log10,
            limits: None,
        })
    }

    pub fn y_log10() -> Self {
        Self::Y(PositionScale {
            transform: AxisTransform::Log10,
            limits: None,
        })
    }

    pub fn x_reverse() -> Self {
        Self::X(PositionScale {
            transform: AxisTransform::Reverse,
            limits: None,
        })
    }

    pub fn y_reverse() -> Self {
        Self::Y(PositionScale {
            transform: AxisTransform::Reverse,
            limits: None,
        })
    }

    pub fn x_limits(low: f64, high: f64) -> Self {
        Self::X(PositionScale {
            transform: AxisTransform::Identity,
            limits: Some((low, high)),
        })
    }

    pub fn y_limits(low: f64, high: f64) -> Self {
        Self::Y(PositionScale {
            transform: AxisTransform::Identity,
            limits: Some((low, high)),
        })
    }

    pub fn color_gradient(gradient: Gradient) -> Self {
        Self::Color(ColorScale::Gradient(gradient))
    }

    pub fn color_palette(palette: Palette) -> Self {
        Self::Color(ColorScale::Palette(palette))
    }

    pub fn color_manual(colors: impl IntoIterator<Item = Color>) -> Self {
        Self::Color(ColorScale::Manual(colors.into_iter().collect()))
    }

    pub fn size_range(smallest: f64, largest: f64) -> Self {
        Self::Size(SizeScale {
            range: (smallest, largest),
        })
    }

    pub fn shapes(shapes: impl IntoIterator<Item = Shape>) -> Self {
        Self::Shape(ShapeScale {
            shapes: shapes.into_iter().collect(),
        })
    }
}
