// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use peniko::kurbo::{BezPath, Rect, Shape as _};
use peniko::Color;
use thiserror::Error;

use crate::dataset::ColumnKind;
use crate::mapping::Channel;

/// The drawing area a figure is realized for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Width in device units.
    pub width: f64,
    /// Height in device units.
    pub height: f64,
    /// Device units per typographic point (1/72 in).
    ///
    /// Symbol sizes and line widths are given in points and scaled by this.
    pub scale: f64,
}

impl Viewport {
    /// A viewport measured in points.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
        }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// A single drawing operation of a [`Figure`].
#[derive(Clone, Debug)]
pub enum Mark {
    Fill { path: BezPath, color: Color },
    Stroke { path: BezPath, color: Color, width: f64 },
}

impl Mark {
    pub fn color(&self) -> Color {
        match self {
            Self::Fill { color, .. } | Self::Stroke { color, .. } => *color,
        }
    }

    /// The area touched by this mark, including half the stroke width.
    pub fn bounding_box(&self) -> Rect {
        match self {
            Self::Fill { path, .. } => path.bounding_box(),
            Self::Stroke { path, width, .. } => path.bounding_box().inflate(width / 2., width / 2.),
        }
    }
}

/// A recoverable problem found while realizing a plot.
///
/// Warnings never stop a figure from being produced.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    /// Rows with a missing or non-finite value in a channel used by the layer were skipped.
    MissingValues { layer: usize, rows: usize },
    /// Rows outside the domain of a position transform or outside explicit limits were skipped.
    OutOfDomain {
        layer: usize,
        channel: Channel,
        rows: usize,
    },
    /// A fixed palette had fewer colors than levels, so colors repeat.
    PaletteExhausted {
        palette: &'static str,
        levels: usize,
        available: usize,
    },
    /// More levels than symbols; rows with the extra levels were skipped.
    TooManyShapes { levels: usize, available: usize },
    /// A fitted line needs at least two distinct x values.
    ///
    /// `group` is the color level, or `None` for an ungrouped layer.
    TooFewPoints { layer: usize, group: Option<usize> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValues { layer, rows } => {
                write!(f, "layer {layer}: removed {rows} rows containing missing values")
            }
            Self::OutOfDomain {
                layer,
                channel,
                rows,
            } => write!(
                f,
                "layer {layer}: removed {rows} rows outside the {channel} scale"
            ),
            Self::PaletteExhausted {
                palette,
                levels,
                available,
            } => write!(
                f,
                "palette {palette} has {available} colors but {levels} levels were requested; colors are recycled"
            ),
            Self::TooManyShapes { levels, available } => write!(
                f,
                "the shape scale has {available} symbols but {levels} levels were requested; extra levels are dropped"
            ),
            Self::TooFewPoints {
                layer,
                group: Some(group),
            } => write!(
                f,
                "layer {layer}: group {group} has fewer than two distinct x values, nothing fitted"
            ),
            Self::TooFewPoints { layer, group: None } => write!(
                f,
                "layer {layer} has fewer than two distinct x values, nothing fitted"
            ),
        }
    }
}

/// Errors that prevent a [`PlotSpec`](crate::PlotSpec) from being realized.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("column '{name}' mapped to {channel} is not in the dataset")]
    MissingColumn { channel: Channel, name: String },
    #[error("{layer} layer requires the {channel} channel to be mapped")]
    MissingChannel {
        layer: &'static str,
        channel: Channel,
    },
    #[error("column '{name}' is {found} but the {channel} channel needs {expected} data")]
    ColumnKind {
        channel: Channel,
        name: String,
        expected: &'static str,
        found: ColumnKind,
    },
    #[error("{found} values supplied to a {scale} {channel} scale")]
    ScaleMismatch {
        channel: Channel,
        scale: &'static str,
        found: ColumnKind,
    },
    #[error("invalid {channel} limits ({low}, {high})")]
    InvalidLimits { channel: Channel, low: f64, high: f64 },
}

/// A realized plot: an ordered list of marks on a sized canvas.
///
/// Figures are produced by [`PlotSpec::realize`](crate::PlotSpec::realize) and
/// are read-only afterwards.
#[derive(Clone, Debug)]
pub struct Figure {
    width: f64,
    height: f64,
    background: Color,
    marks: Vec<Mark>,
    warnings: Vec<Warning>,
}

impl Figure {
    /// A figure with nothing but a background.
    pub fn blank(width: f64, height: f64, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            marks: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn new(
        viewport: Viewport,
        background: Color,
        marks: Vec<Mark>,
        warnings: Vec<Warning>,
    ) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            background,
            marks,
            warnings,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Marks in painting order.
    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}
