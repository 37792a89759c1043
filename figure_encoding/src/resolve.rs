// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Realization of a [`PlotSpec`] into a [`Figure`].
//!
//! Realization runs in four passes:
//!
//! 1. Validate the mapping and build one scale per mapped channel.
//! 2. Pull the rows each layer needs out of the dataset and apply the layer's
//!    statistic (sorting, counting and stacking, or fitting) in data space.
//! 3. Train the position scales on the resulting geometry.
//! 4. Map everything onto the panel and emit marks in painting order.

use std::collections::BTreeSet;

use peniko::kurbo::{BezPath, Point, Rect, Shape as _};
use peniko::Color;

use crate::dataset::{Column, ColumnKind};
use crate::figure::{Figure, Mark, RenderError, Viewport, Warning};
use crate::layer::{Layer, LayerKind, Shape};
use crate::mapping::Channel;
use crate::palette::{Gradient, Palette};
use crate::scale::{AxisTransform, ColorScale, ScaleKind, ScaleOverride, SizeScale};
use crate::spec::PlotSpec;
use crate::ticks::ticks;

/// Diameter of a point symbol when neither set nor mapped, in points.
const DEFAULT_POINT_SIZE: f64 = 4.0;
const TICK_TARGET: usize = 5;
/// Length of axis tick marks, in points.
const TICK_LENGTH: f64 = 3.0;
const AXIS_WIDTH: f64 = 0.75;
const GRID_WIDTH: f64 = 0.5;
/// Continuous ranges grow by this fraction on each side.
const EXPAND: f64 = 0.05;
/// Discrete ranges grow by this many levels on each side.
const DISCRETE_PAD: f64 = 0.6;

pub(crate) fn realize(spec: &PlotSpec, viewport: Viewport) -> Result<Figure, RenderError> {
    let mut warnings = Vec::new();
    let scales = Scales::new(spec, &mut warnings)?;
    for layer in spec.layers() {
        scales.check_layer(spec, layer)?;
    }

    let mut geometries = Vec::with_capacity(spec.layers().len());
    for (index, layer) in spec.layers().iter().enumerate() {
        let rows = scales.rows(index, layer, &mut warnings);
        geometries.push(build_geometry(index, layer, rows, &scales, &mut warnings));
    }

    let mut x_range = Range::default();
    let mut y_range = Range::default();
    for geometry in &geometries {
        geometry.train(&mut x_range, &mut y_range);
    }
    // Without any layer data, the axes still cover the mapped columns.
    if x_range.is_empty() {
        scales.train_raw(Channel::X, &mut x_range);
    }
    if y_range.is_empty() {
        scales.train_raw(Channel::Y, &mut y_range);
    }

    let theme = spec.theme();
    let margin = theme.margin.max(0.0) * viewport.width.min(viewport.height);
    let mut panel = Rect::new(
        margin,
        margin,
        viewport.width - margin,
        viewport.height - margin,
    );
    if panel.width() <= 0.0 || panel.height() <= 0.0 {
        panel = Rect::new(0.0, 0.0, viewport.width, viewport.height);
    }
    let frame = Frame {
        panel,
        x: scales.x_domain(x_range),
        y: scales.y_domain(y_range),
    };

    let mut marks = Vec::new();
    marks.push(Mark::Fill {
        path: panel.to_path(0.1),
        color: theme.panel,
    });
    let x_ticks = axis_ticks(scales.x.as_ref().map(|(_, axis)| axis), frame.x);
    let y_ticks = axis_ticks(scales.y.as_ref().map(|(_, axis)| axis), frame.y);
    if let Some(grid) = theme.grid {
        let mut path = BezPath::new();
        for &x in &x_ticks {
            let px = frame.map_x(x);
            path.move_to((px, panel.y0));
            path.line_to((px, panel.y1));
        }
        for &y in &y_ticks {
            let py = frame.map_y(y);
            path.move_to((panel.x0, py));
            path.line_to((panel.x1, py));
        }
        if !path.elements().is_empty() {
            marks.push(Mark::Stroke {
                path,
                color: grid,
                width: GRID_WIDTH * viewport.scale,
            });
        }
    }

    for (geometry, layer) in geometries.iter().zip(spec.layers()) {
        geometry.emit(layer, &frame, viewport.scale, &mut marks);
    }

    let tick_length = TICK_LENGTH * viewport.scale;
    let mut axes = BezPath::new();
    axes.move_to((panel.x0, panel.y0));
    axes.line_to((panel.x0, panel.y1));
    axes.line_to((panel.x1, panel.y1));
    for &x in &x_ticks {
        let px = frame.map_x(x);
        axes.move_to((px, panel.y1));
        axes.line_to((px, panel.y1 + tick_length));
    }
    for &y in &y_ticks {
        let py = frame.map_y(y);
        axes.move_to((panel.x0, py));
        axes.line_to((panel.x0 - tick_length, py));
    }
    marks.push(Mark::Stroke {
        path: axes,
        color: theme.axis,
        width: AXIS_WIDTH * viewport.scale,
    });

    log::debug!(
        "realized {} layers into {} marks ({} warnings)",
        spec.layers().len(),
        marks.len(),
        warnings.len()
    );
    Ok(Figure::new(viewport, theme.background, marks, warnings))
}

/// The result of reading one cell through a scale.
enum Sample<T> {
    Missing,
    OutOfDomain,
    Value(T),
}

enum Axis {
    Continuous {
        transform: AxisTransform,
        /// Ordered limits, already transformed.
        limits: Option<(f64, f64)>,
    },
    Discrete {
        /// Sorted, unique labels.
        levels: Vec<String>,
    },
}

impl Axis {
    fn sample(&self, column: &Column, row: usize) -> Sample<f64> {
        match self {
            Self::Continuous { transform, limits } => {
                let Some(value) = column.number(row) else {
                    return Sample::Missing;
                };
                match transform.apply(value) {
                    Some(v) if limits.map_or(true, |(lo, hi)| v >= lo && v <= hi) => {
                        Sample::Value(v)
                    }
                    _ => Sample::OutOfDomain,
                }
            }
            Self::Discrete { levels } => match column.category(row) {
                Some(label) => match levels.binary_search_by(|l| l.as_str().cmp(label)) {
                    Ok(idx) => Sample::Value(idx as f64),
                    Err(_) => Sample::OutOfDomain,
                },
                None => Sample::Missing,
            },
        }
    }
}

enum ColorMap {
    Discrete {
        levels: Vec<String>,
        colors: Vec<Color>,
    },
    Continuous {
        low: f64,
        high: f64,
        gradient: Gradient,
    },
}

impl ColorMap {
    /// The color of a row and, for discrete maps, its level.
    fn sample(&self, column: &Column, row: usize) -> Sample<(Color, Option<usize>)> {
        match self {
            Self::Discrete { levels, colors } => match column.category(row) {
                Some(label) => match levels.binary_search_by(|l| l.as_str().cmp(label)) {
                    Ok(idx) => Sample::Value((colors[idx], Some(idx))),
                    Err(_) => Sample::OutOfDomain,
                },
                None => Sample::Missing,
            },
            Self::Continuous {
                low,
                high,
                gradient,
            } => match column.number(row) {
                Some(v) => {
                    let t = if high > low {
                        (v - low) / (high - low)
                    } else {
                        0.5
                    };
                    Sample::Value((gradient.at(t), None))
                }
                None => Sample::Missing,
            },
        }
    }
}

struct SizeMap {
    low: f64,
    high: f64,
    scale: SizeScale,
}

impl SizeMap {
    /// Diameter in points. Sizes are proportional to area, not diameter.
    fn diameter(&self, value: f64) -> f64 {
        let t = if self.high > self.low {
            (value - self.low) / (self.high - self.low)
        } else {
            0.5
        };
        let (d0, d1) = self.scale.range;
        let area = d0 * d0 + (d1 * d1 - d0 * d0) * t.clamp(0.0, 1.0);
        area.max(0.0).sqrt()
    }
}

struct ShapeMap {
    levels: Vec<String>,
    shapes: Vec<Shape>,
}

struct Row {
    x: f64,
    y: f64,
    color: Color,
    group: Option<usize>,
    diameter: f64,
    shape: Shape,
}

struct Scales<'a> {
    x: Option<(&'a Column, Axis)>,
    y: Option<(&'a Column, Axis)>,
    color: Option<(&'a Column, ColorMap)>,
    size: Option<(&'a Column, SizeMap)>,
    shape: Option<(&'a Column, ShapeMap)>,
}

fn mapped_column<'a>(
    spec: &'a PlotSpec,
    channel: Channel,
) -> Result<Option<(&'a str, &'a Column)>, RenderError> {
    let Some(name) = spec.mapping().field(channel) else {
        return Ok(None);
    };
    match spec.data().column(name) {
        Some(column) => Ok(Some((name, column))),
        None => Err(RenderError::MissingColumn {
            channel,
            name: name.to_owned(),
        }),
    }
}

fn levels(column: &Column) -> Vec<String> {
    let set: BTreeSet<&str> = (0..column.len()).filter_map(|r| column.category(r)).collect();
    set.into_iter().map(str::to_owned).collect()
}

fn numeric_extent(column: &Column) -> (f64, f64) {
    let mut range = Range::default();
    for row in 0..column.len() {
        if let Some(v) = column.number(row) {
            range.include(v);
        }
    }
    range.bounds().unwrap_or((0.0, 0.0))
}

fn position_axis(
    spec: &PlotSpec,
    channel: Channel,
    name: &str,
    column: &Column,
) -> Result<Axis, RenderError> {
    let kind = if channel == Channel::X {
        ScaleKind::X
    } else {
        ScaleKind::Y
    };
    let scale = match spec.scale(kind) {
        Some(ScaleOverride::X(s) | ScaleOverride::Y(s)) => Some(*s),
        _ => None,
    };
    if !column.is_continuous() {
        if channel == Channel::Y {
            return Err(RenderError::ColumnKind {
                channel,
                name: name.to_owned(),
                expected: "numeric",
                found: column.kind(),
            });
        }
        if scale.is_some_and(|s| s.transform != AxisTransform::Identity || s.limits.is_some()) {
            return Err(RenderError::ScaleMismatch {
                channel,
                scale: "continuous",
                found: column.kind(),
            });
        }
        return Ok(Axis::Discrete {
            levels: levels(column),
        });
    }
    let transform = scale.map(|s| s.transform).unwrap_or_default();
    let limits = match scale.and_then(|s| s.limits) {
        Some((low, high)) => {
            let invalid = RenderError::InvalidLimits { channel, low, high };
            if !(low.is_finite() && high.is_finite()) || low >= high {
                return Err(invalid);
            }
            match (transform.apply(low), transform.apply(high)) {
                (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
                _ => return Err(invalid),
            }
        }
        None => None,
    };
    Ok(Axis::Continuous { transform, limits })
}

impl<'a> Scales<'a> {
    fn new(spec: &'a PlotSpec, warnings: &mut Vec<Warning>) -> Result<Self, RenderError> {
        let x = match mapped_column(spec, Channel::X)? {
            Some((name, column)) => Some((column, position_axis(spec, Channel::X, name, column)?)),
            None => None,
        };
        let y = match mapped_column(spec, Channel::Y)? {
            Some((name, column)) => Some((column, position_axis(spec, Channel::Y, name, column)?)),
            None => None,
        };

        let color = match mapped_column(spec, Channel::Color)? {
            Some((_, column)) => {
                let scale = match spec.scale(ScaleKind::Color) {
                    Some(ScaleOverride::Color(scale)) => Some(scale),
                    _ => None,
                };
                if let Some(scale) = scale {
                    if scale.is_continuous() != column.is_continuous() {
                        return Err(RenderError::ScaleMismatch {
                            channel: Channel::Color,
                            scale: scale.name(),
                            found: column.kind(),
                        });
                    }
                }
                let map = if column.is_continuous() {
                    let (low, high) = numeric_extent(column);
                    let gradient = match scale {
                        Some(ColorScale::Gradient(gradient)) => *gradient,
                        _ => Gradient::default(),
                    };
                    ColorMap::Continuous {
                        low,
                        high,
                        gradient,
                    }
                } else {
                    let levels = levels(column);
                    let colors = discrete_colors(scale, levels.len(), warnings);
                    ColorMap::Discrete { levels, colors }
                };
                Some((column, map))
            }
            None => None,
        };

        let size = match mapped_column(spec, Channel::Size)? {
            Some((name, column)) => {
                if !column.is_continuous() {
                    return Err(RenderError::ColumnKind {
                        channel: Channel::Size,
                        name: name.to_owned(),
                        expected: "numeric",
                        found: column.kind(),
                    });
                }
                let (low, high) = numeric_extent(column);
                let scale = match spec.scale(ScaleKind::Size) {
                    Some(ScaleOverride::Size(scale)) => *scale,
                    _ => SizeScale::default(),
                };
                Some((column, SizeMap { low, high, scale }))
            }
            None => None,
        };

        let shape = match mapped_column(spec, Channel::Shape)? {
            Some((name, column)) => {
                if column.kind() != ColumnKind::Categorical {
                    return Err(RenderError::ColumnKind {
                        channel: Channel::Shape,
                        name: name.to_owned(),
                        expected: "categorical",
                        found: column.kind(),
                    });
                }
                let mut shapes = match spec.scale(ScaleKind::Shape) {
                    Some(ScaleOverride::Shape(scale)) => scale.shapes.clone(),
                    _ => Shape::SEQUENCE.to_vec(),
                };
                if shapes.is_empty() {
                    shapes = Shape::SEQUENCE.to_vec();
                }
                let levels = levels(column);
                if levels.len() > shapes.len() {
                    warnings.push(Warning::TooManyShapes {
                        levels: levels.len(),
                        available: shapes.len(),
                    });
                }
                Some((column, ShapeMap { levels, shapes }))
            }
            None => None,
        };

        Ok(Self {
            x,
            y,
            color,
            size,
            shape,
        })
    }

    fn check_layer(&self, spec: &PlotSpec, layer: &Layer) -> Result<(), RenderError> {
        let kind = layer.kind();
        let name = |channel| spec.mapping().field(channel).unwrap_or_default().to_owned();
        let require = |channel: Channel, mapped: bool| {
            if mapped {
                Ok(())
            } else {
                Err(RenderError::MissingChannel {
                    layer: kind.name(),
                    channel,
                })
            }
        };
        require(Channel::X, self.x.is_some())?;
        if kind != LayerKind::Bars {
            require(Channel::Y, self.y.is_some())?;
        }
        if kind == LayerKind::Smooth {
            if let Some((column, Axis::Discrete { .. })) = &self.x {
                return Err(RenderError::ColumnKind {
                    channel: Channel::X,
                    name: name(Channel::X),
                    expected: "numeric",
                    found: column.kind(),
                });
            }
        }
        if kind == LayerKind::Bars && layer.color().is_none() {
            if let Some((column, ColorMap::Continuous { .. })) = &self.color {
                return Err(RenderError::ColumnKind {
                    channel: Channel::Color,
                    name: name(Channel::Color),
                    expected: "categorical",
                    found: column.kind(),
                });
            }
        }
        Ok(())
    }

    /// Reads the rows a layer draws, skipping (and reporting) unusable ones.
    fn rows(&self, index: usize, layer: &Layer, warnings: &mut Vec<Warning>) -> Vec<Row> {
        let Some((x_column, x_axis)) = &self.x else {
            return Vec::new();
        };
        let kind = layer.kind();
        let set_color = layer.color();
        let (set_shape, set_size) = match layer {
            Layer::Points(points) => (points.shape, points.size),
            _ => (None, None),
        };
        let default_color = match kind {
            LayerKind::Points | LayerKind::Lines => Color::from_rgb8(0, 0, 0),
            LayerKind::Bars => Color::from_rgb8(0x59, 0x59, 0x59),
            LayerKind::Smooth => Color::from_rgb8(0x33, 0x66, 0xff),
        };

        let mut missing = 0;
        let mut out_of_domain = [(Channel::X, 0), (Channel::Y, 0)];
        let mut rows = Vec::new();
        for row in 0..x_column.len() {
            let x = match x_axis.sample(x_column, row) {
                Sample::Value(v) => v,
                Sample::Missing => {
                    missing += 1;
                    continue;
                }
                Sample::OutOfDomain => {
                    out_of_domain[0].1 += 1;
                    continue;
                }
            };
            let y = match &self.y {
                // Bars without a y mapping count rows.
                None => 1.0,
                Some((y_column, y_axis)) => match y_axis.sample(y_column, row) {
                    Sample::Value(v) => v,
                    Sample::Missing => {
                        missing += 1;
                        continue;
                    }
                    Sample::OutOfDomain => {
                        out_of_domain[1].1 += 1;
                        continue;
                    }
                },
            };
            let (color, group) = match (set_color, &self.color) {
                (Some(color), _) => (color, None),
                (None, Some((column, map))) => match map.sample(column, row) {
                    Sample::Value(v) => v,
                    Sample::Missing | Sample::OutOfDomain => {
                        missing += 1;
                        continue;
                    }
                },
                (None, None) => (default_color, None),
            };
            let mut diameter = set_size.unwrap_or(DEFAULT_POINT_SIZE);
            let mut shape = set_shape.unwrap_or(Shape::Circle);
            if kind == LayerKind::Points {
                if let (None, Some((column, map))) = (set_size, &self.size) {
                    match column.number(row) {
                        Some(v) => diameter = map.diameter(v),
                        None => {
                            missing += 1;
                            continue;
                        }
                    }
                }
                if let (None, Some((column, map))) = (set_shape, &self.shape) {
                    let level = column
                        .category(row)
                        .and_then(|label| map.levels.binary_search_by(|l| l.as_str().cmp(label)).ok());
                    match level.and_then(|idx| map.shapes.get(idx)) {
                        Some(s) => shape = *s,
                        None => {
                            missing += 1;
                            continue;
                        }
                    }
                }
            }
            rows.push(Row {
                x,
                y,
                color,
                group,
                diameter,
                shape,
            });
        }

        if missing > 0 {
            warnings.push(Warning::MissingValues {
                layer: index,
                rows: missing,
            });
        }
        for (channel, rows) in out_of_domain {
            if rows > 0 {
                warnings.push(Warning::OutOfDomain {
                    layer: index,
                    channel,
                    rows,
                });
            }
        }
        rows
    }

    /// Trains a range directly on a mapped column.
    fn train_raw(&self, channel: Channel, range: &mut Range) {
        let mapped = match channel {
            Channel::X => &self.x,
            _ => &self.y,
        };
        if let Some((column, axis)) = mapped {
            for row in 0..column.len() {
                if let Sample::Value(v) = axis.sample(column, row) {
                    range.include(v);
                }
            }
        }
    }

    fn x_domain(&self, range: Range) -> (f64, f64) {
        domain(self.x.as_ref().map(|(_, axis)| axis), range)
    }

    fn y_domain(&self, range: Range) -> (f64, f64) {
        domain(self.y.as_ref().map(|(_, axis)| axis), range)
    }
}

/// Tick positions in data space: one per level on discrete axes.
fn axis_ticks(axis: Option<&Axis>, domain: (f64, f64)) -> Vec<f64> {
    match axis {
        Some(Axis::Discrete { levels }) => (0..levels.len()).map(|i| i as f64).collect(),
        Some(Axis::Continuous { transform, .. }) => {
            ticks(domain.0, domain.1, TICK_TARGET, *transform)
        }
        None => ticks(domain.0, domain.1, TICK_TARGET, AxisTransform::Identity),
    }
}

fn discrete_colors(
    scale: Option<&ColorScale>,
    levels: usize,
    warnings: &mut Vec<Warning>,
) -> Vec<Color> {
    let (name, available, colors) = match scale {
        Some(ColorScale::Manual(colors)) if !colors.is_empty() => (
            "manual",
            Some(colors.len()),
            (0..levels).map(|i| colors[i % colors.len()]).collect(),
        ),
        Some(ColorScale::Palette(palette)) => {
            (palette.name(), palette.capacity(), palette.colors(levels))
        }
        _ => (
            Palette::default().name(),
            None,
            Palette::default().colors(levels),
        ),
    };
    if let Some(available) = available {
        if levels > available {
            warnings.push(Warning::PaletteExhausted {
                palette: name,
                levels,
                available,
            });
        }
    }
    colors
}

/// The data-space extent of a position scale, before expansion.
fn domain(axis: Option<&Axis>, range: Range) -> (f64, f64) {
    match axis {
        Some(Axis::Discrete { levels }) => {
            let n = levels.len().max(1) as f64;
            (-DISCRETE_PAD, n - 1.0 + DISCRETE_PAD)
        }
        Some(Axis::Continuous {
            limits: Some((lo, hi)),
            ..
        }) => expand(*lo, *hi),
        _ => match range.bounds() {
            Some((lo, hi)) => expand(lo, hi),
            None => (0.0, 1.0),
        },
    }
}

fn expand(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        let pad = (hi - lo) * EXPAND;
        (lo - pad, hi + pad)
    } else {
        let pad = if lo == 0.0 { 0.5 } else { lo.abs() * 0.1 };
        (lo - pad, hi + pad)
    }
}

#[derive(Clone, Copy, Default)]
struct Range {
    bounds: Option<(f64, f64)>,
}

impl Range {
    fn include(&mut self, v: f64) {
        if !v.is_finite() {
            return;
        }
        self.bounds = Some(match self.bounds {
            Some((lo, hi)) => (lo.min(v), hi.max(v)),
            None => (v, v),
        });
    }

    fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    fn bounds(&self) -> Option<(f64, f64)> {
        self.bounds
    }
}

/// Maps data space onto the panel.
struct Frame {
    panel: Rect,
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    fn map_x(&self, x: f64) -> f64 {
        self.panel.x0 + (x - self.x.0) / (self.x.1 - self.x.0) * self.panel.width()
    }

    fn map_y(&self, y: f64) -> f64 {
        self.panel.y1 - (y - self.y.0) / (self.y.1 - self.y.0) * self.panel.height()
    }

    fn map(&self, x: f64, y: f64) -> Point {
        Point::new(self.map_x(x), self.map_y(y))
    }
}

struct Bar {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    color: Color,
}

/// A layer after its statistic has been applied, still in data space.
enum Geometry {
    Points(Vec<Row>),
    /// Polylines with their colors.
    Paths { paths: Vec<(Vec<(f64, f64)>, Color)>, width: f64 },
    Bars(Vec<Bar>),
}

fn build_geometry(
    index: usize,
    layer: &Layer,
    rows: Vec<Row>,
    scales: &Scales<'_>,
    warnings: &mut Vec<Warning>,
) -> Geometry {
    match layer {
        Layer::Points(_) => Geometry::Points(rows),
        Layer::Lines(lines) => {
            let continuous_color = layer.color().is_none()
                && matches!(scales.color, Some((_, ColorMap::Continuous { .. })));
            let mut paths = Vec::new();
            for mut group in groups(rows) {
                group.sort_by(|a, b| a.x.total_cmp(&b.x));
                if continuous_color {
                    // Each segment takes the color of its starting row.
                    for pair in group.windows(2) {
                        paths.push((vec![(pair[0].x, pair[0].y), (pair[1].x, pair[1].y)], pair[0].color));
                    }
                } else if let Some(first) = group.first() {
                    let color = first.color;
                    paths.push((group.iter().map(|r| (r.x, r.y)).collect(), color));
                }
            }
            Geometry::Paths {
                paths,
                width: lines.width,
            }
        }
        Layer::Smooth(smooth) => {
            let color = layer.color().unwrap_or(Color::from_rgb8(0x33, 0x66, 0xff));
            let mut paths = Vec::new();
            for group in groups(rows) {
                let level = group.first().and_then(|row| row.group);
                let group_color = match (level, group.first()) {
                    (Some(_), Some(row)) => row.color,
                    _ => color,
                };
                match fit_line(&group) {
                    Some(line) => paths.push((line, group_color)),
                    None => warnings.push(Warning::TooFewPoints {
                        layer: index,
                        group: level,
                    }),
                }
            }
            Geometry::Paths {
                paths,
                width: smooth.width,
            }
        }
        Layer::Bars(bars) => Geometry::Bars(stack_bars(rows, bars.width, scales)),
    }
}

/// Splits rows by color level, keeping rows without a level together.
fn groups(rows: Vec<Row>) -> Vec<Vec<Row>> {
    let mut out: Vec<(Option<usize>, Vec<Row>)> = Vec::new();
    for row in rows {
        match out.iter_mut().find(|(g, _)| *g == row.group) {
            Some((_, members)) => members.push(row),
            None => out.push((row.group, vec![row])),
        }
    }
    out.sort_by_key(|(g, _)| *g);
    out.into_iter().map(|(_, members)| members).collect()
}

/// Least-squares line over the x extent of `rows`.
fn fit_line(rows: &[Row]) -> Option<Vec<(f64, f64)>> {
    let n = rows.len() as f64;
    if rows.len() < 2 {
        return None;
    }
    let mean_x = rows.iter().map(|r| r.x).sum::<f64>() / n;
    let mean_y = rows.iter().map(|r| r.y).sum::<f64>() / n;
    let (mut sxx, mut sxy) = (0.0, 0.0);
    for r in rows {
        sxx += (r.x - mean_x) * (r.x - mean_x);
        sxy += (r.x - mean_x) * (r.y - mean_y);
    }
    if sxx <= f64::EPSILON * n {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let x0 = rows.iter().map(|r| r.x).fold(f64::INFINITY, f64::min);
    let x1 = rows.iter().map(|r| r.x).fold(f64::NEG_INFINITY, f64::max);
    Some(vec![
        (x0, intercept + slope * x0),
        (x1, intercept + slope * x1),
    ])
}

/// Sums rows per (x, level) and stacks levels away from zero.
fn stack_bars(rows: Vec<Row>, width: f64, scales: &Scales<'_>) -> Vec<Bar> {
    let mut cells: Vec<(f64, Option<usize>, f64, Color)> = Vec::new();
    let mut sorted = rows;
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.group.cmp(&b.group)));
    for row in sorted {
        match cells.last_mut() {
            Some((x, group, total, _)) if *x == row.x && *group == row.group => *total += row.y,
            _ => cells.push((row.x, row.group, row.y, row.color)),
        }
    }

    let half = match &scales.x {
        Some((_, Axis::Discrete { .. })) => 0.5 * width,
        _ => {
            let mut gap = f64::INFINITY;
            for pair in cells.windows(2) {
                let d = pair[1].0 - pair[0].0;
                if d > 0.0 {
                    gap = gap.min(d);
                }
            }
            0.5 * width * if gap.is_finite() { gap } else { 1.0 }
        }
    };

    let mut bars = Vec::with_capacity(cells.len());
    let mut current_x = f64::NAN;
    let (mut up, mut down) = (0.0, 0.0);
    for (x, _, total, color) in cells {
        if x != current_x {
            current_x = x;
            up = 0.0;
            down = 0.0;
        }
        let (y0, y1) = if total >= 0.0 {
            let y0 = up;
            up += total;
            (y0, up)
        } else {
            let y0 = down;
            down += total;
            (down, y0)
        };
        bars.push(Bar {
            x0: x - half,
            x1: x + half,
            y0,
            y1,
            color,
        });
    }
    bars
}

fn with_opacity(color: Color, alpha: f32) -> Color {
    let [r, g, b, a] = color.components;
    Color::new([r, g, b, a * alpha])
}

impl Geometry {
    fn train(&self, x: &mut Range, y: &mut Range) {
        match self {
            Self::Points(rows) => {
                for row in rows {
                    x.include(row.x);
                    y.include(row.y);
                }
            }
            Self::Paths { paths, .. } => {
                for (points, _) in paths {
                    for &(px, py) in points {
                        x.include(px);
                        y.include(py);
                    }
                }
            }
            Self::Bars(bars) => {
                for bar in bars {
                    x.include(bar.x0);
                    x.include(bar.x1);
                    y.include(bar.y0);
                    y.include(bar.y1);
                }
            }
        }
    }

    fn emit(&self, layer: &Layer, frame: &Frame, scale: f64, marks: &mut Vec<Mark>) {
        let alpha = layer.alpha();
        match self {
            Self::Points(rows) => {
                for row in rows {
                    let center = frame.map(row.x, row.y);
                    let radius = 0.5 * row.diameter * scale;
                    let path = row.shape.outline(center, radius);
                    let color = with_opacity(row.color, alpha);
                    if row.shape.is_filled() {
                        marks.push(Mark::Fill { path, color });
                    } else {
                        marks.push(Mark::Stroke {
                            path,
                            color,
                            width: (row.diameter / 4.0).max(0.5) * scale,
                        });
                    }
                }
            }
            Self::Paths { paths, width } => {
                for (points, color) in paths {
                    let mut path = BezPath::new();
                    for (i, &(x, y)) in points.iter().enumerate() {
                        if i == 0 {
                            path.move_to(frame.map(x, y));
                        } else {
                            path.line_to(frame.map(x, y));
                        }
                    }
                    if points.len() > 1 {
                        marks.push(Mark::Stroke {
                            path,
                            color: with_opacity(*color, alpha),
                            width: width * scale,
                        });
                    }
                }
            }
            Self::Bars(bars) => {
                for bar in bars {
                    let rect = Rect::from_points(frame.map(bar.x0, bar.y0), frame.map(bar.x1, bar.y1));
                    marks.push(Mark::Fill {
                        path: rect.to_path(0.1),
                        color: with_opacity(bar.color, alpha),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::mapping::ChannelMapping;
    use crate::scale::PositionScale;
    use crate::spec::Theme;

    fn cars() -> Dataset {
        Dataset::new()
            .with_column("displ", vec![1.8, 1.8, 2.0, 2.8, 3.1, 5.7, 6.2])
            .unwrap()
            .with_column("hwy", vec![29.0, 29.0, 31.0, 26.0, 27.0, 17.0, 26.0])
            .unwrap()
            .with_column(
                "class",
                vec!["compact", "compact", "compact", "midsize", "midsize", "suv", "2seater"],
            )
            .unwrap()
    }

    fn viewport() -> Viewport {
        Viewport::new(400.0, 300.0)
    }

    /// The marks drawn by layers, between the grid and the axes.
    fn layer_marks(figure: &Figure) -> &[Mark] {
        let marks = figure.marks();
        &marks[2..marks.len() - 1]
    }

    fn centers(figure: &Figure) -> Vec<Point> {
        layer_marks(figure)
            .iter()
            .map(|mark| mark.bounding_box().center())
            .collect()
    }

    fn count_fills(figure: &Figure) -> usize {
        figure
            .marks()
            .iter()
            .filter(|m| matches!(m, Mark::Fill { .. }))
            .count()
    }

    #[test]
    fn empty_spec_is_a_blank_panel() {
        let spec = PlotSpec::build(Dataset::new(), ChannelMapping::new());
        let figure = spec.realize(viewport()).unwrap();
        // Panel, grid and axes.
        assert_eq!(figure.marks().len(), 3);
        assert!(figure.warnings().is_empty());
    }

    #[test]
    fn one_mark_per_point() {
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("displ").y("hwy"))
            .add_layer(Layer::points());
        let figure = spec.realize(viewport()).unwrap();
        // The panel plus seven circles.
        assert_eq!(count_fills(&figure), 8);
    }

    #[test]
    fn points_stay_inside_the_panel() {
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("displ").y("hwy"))
            .add_layer(Layer::points());
        let figure = spec.realize(viewport()).unwrap();
        let panel = figure.marks()[0].bounding_box();
        for mark in &figure.marks()[2..figure.marks().len() - 1] {
            let center = mark.bounding_box().center();
            assert!(panel.contains(center), "{center:?} outside {panel:?}");
        }
    }

    #[test]
    fn missing_column_is_an_error() {
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("displ").y("cty"))
            .add_layer(Layer::points());
        assert_eq!(
            spec.realize(viewport()).unwrap_err(),
            RenderError::MissingColumn {
                channel: Channel::Y,
                name: "cty".into()
            }
        );
    }

    #[test]
    fn layers_check_their_channels() {
        let spec =
            PlotSpec::build(cars(), ChannelMapping::new().x("displ")).add_layer(Layer::lines());
        assert!(matches!(
            spec.realize(viewport()),
            Err(RenderError::MissingChannel {
                layer: "lines",
                channel: Channel::Y
            })
        ));
        // Bars count rows instead.
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("class")).add_layer(Layer::bars());
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(count_fills(&figure), 1 + 4);
    }

    #[test]
    fn scale_kind_must_match_the_column() {
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("displ").y("hwy").color("class"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::color_gradient(Gradient::Viridis));
        assert!(matches!(
            spec.realize(viewport()),
            Err(RenderError::ScaleMismatch {
                channel: Channel::Color,
                scale: "gradient",
                found: ColumnKind::Categorical
            })
        ));
        // The last color scale wins, so a later palette fixes it.
        let fixed = spec.add_scale(ScaleOverride::color_palette(Palette::OkabeIto));
        assert!(fixed.realize(viewport()).is_ok());
    }

    #[test]
    fn log_scale_drops_non_positive_values() {
        let data = Dataset::new()
            .with_column("x", vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .with_column("y", vec![10.0, 0.0, -5.0, 1000.0])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("y"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::y_log10());
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [Warning::OutOfDomain {
                layer: 0,
                channel: Channel::Y,
                rows: 2
            }]
        );
        assert_eq!(count_fills(&figure), 1 + 2);
    }

    #[test]
    fn missing_values_are_reported_not_fatal() {
        let data = Dataset::new()
            .with_column("x", vec![Some(1.0), None, Some(3.0)])
            .unwrap()
            .with_column("y", vec![Some(1.0), Some(2.0), Some(f64::NAN)])
            .unwrap();
        let spec =
            PlotSpec::build(data, ChannelMapping::new().x("x").y("y")).add_layer(Layer::points());
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [Warning::MissingValues { layer: 0, rows: 2 }]
        );
    }

    #[test]
    fn palettes_warn_when_exhausted() {
        let labels: Vec<String> = (0..10).map(|i| format!("level{i}")).collect();
        let data = Dataset::new()
            .with_column("x", (0..10).map(f64::from).collect::<Vec<_>>())
            .unwrap()
            .with_column("g", labels)
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("x").color("g"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::color_palette(Palette::Set2));
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [Warning::PaletteExhausted {
                palette: "Set2",
                levels: 10,
                available: 8
            }]
        );
    }

    #[test]
    fn shapes_beyond_the_scale_are_dropped() {
        let labels: Vec<String> = (0..8).map(|i| format!("s{i}")).collect();
        let data = Dataset::new()
            .with_column("x", (0..8).map(f64::from).collect::<Vec<_>>())
            .unwrap()
            .with_column("s", labels)
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("x").shape("s"))
            .add_layer(Layer::points());
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [
                Warning::TooManyShapes {
                    levels: 8,
                    available: 6
                },
                Warning::MissingValues { layer: 0, rows: 2 }
            ]
        );
    }

    #[test]
    fn smooth_fits_one_line_per_group() {
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("displ").y("hwy").color("class"))
            .add_layer(Layer::smooth());
        let figure = spec.realize(viewport()).unwrap();
        // "compact" and "midsize" have two distinct x values, the others don't.
        let strokes = figure.marks().len() - 3;
        assert_eq!(strokes, 2);
        assert_eq!(
            figure.warnings(),
            [
                Warning::TooFewPoints {
                    layer: 0,
                    group: Some(0)
                },
                Warning::TooFewPoints {
                    layer: 0,
                    group: Some(3)
                }
            ]
        );
    }

    #[test]
    fn fit_line_recovers_slope() {
        let rows: Vec<Row> = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]
            .into_iter()
            .map(|(x, y)| Row {
                x,
                y,
                color: Color::from_rgb8(0, 0, 0),
                group: None,
                diameter: 1.0,
                shape: Shape::Circle,
            })
            .collect();
        let line = fit_line(&rows).unwrap();
        assert_eq!(line, [(0.0, 1.0), (2.0, 5.0)]);
    }

    #[test]
    fn bars_stack_from_zero() {
        let data = Dataset::new()
            .with_column("x", vec!["a", "a", "b"])
            .unwrap()
            .with_column("y", vec![2.0, 3.0, -1.0])
            .unwrap()
            .with_column("g", vec!["p", "q", "p"])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("y").color("g"));
        let scales = Scales::new(&spec, &mut Vec::new()).unwrap();
        let layer = Layer::bars();
        let rows = scales.rows(0, &layer, &mut Vec::new());
        let bars = stack_bars(rows, 0.9, &scales);
        let spans: Vec<_> = bars.iter().map(|b| (b.y0, b.y1)).collect();
        assert_eq!(spans, [(0.0, 2.0), (2.0, 5.0), (-1.0, 0.0)]);
        assert_eq!(bars[0].x0, bars[1].x0);
        assert!(bars[1].x1 < bars[2].x0);
    }

    #[test]
    fn limits_are_validated() {
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("displ").y("hwy"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::x_limits(5.0, 1.0));
        assert!(matches!(
            spec.realize(viewport()),
            Err(RenderError::InvalidLimits {
                channel: Channel::X,
                ..
            })
        ));
    }

    #[test]
    fn subnormal_ranges_still_realize() {
        let data = Dataset::new()
            .with_column("x", vec![-1e-323, 1e-323])
            .unwrap()
            .with_column("y", vec![1.0, 2.0])
            .unwrap();
        let spec =
            PlotSpec::build(data, ChannelMapping::new().x("x").y("y")).add_layer(Layer::points());
        let figure = spec.realize(Viewport::new(100.0, 100.0)).unwrap();
        assert_eq!(count_fills(&figure), 1 + 2);
        assert!(figure.warnings().is_empty());
    }

    #[test]
    fn sizes_scale_with_area() {
        let data = Dataset::new()
            .with_column("x", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_column("s", vec![0.0, 5.0, 10.0])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("x").size("s"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::size_range(2.0, 10.0));
        let figure = spec.realize(viewport()).unwrap();
        let widths: Vec<f64> = layer_marks(&figure)
            .iter()
            .map(|mark| mark.bounding_box().width())
            .collect();
        // Halfway in value is halfway in area: sqrt((2² + 10²) / 2).
        for (width, expected) in widths.iter().zip([2.0, 52.0_f64.sqrt(), 10.0]) {
            assert!((width - expected).abs() < 0.05, "{widths:?}");
        }

        let map = SizeMap {
            low: 0.0,
            high: 10.0,
            scale: SizeScale { range: (2.0, 10.0) },
        };
        assert_eq!(map.diameter(-5.0), 2.0);
        assert_eq!(map.diameter(20.0), 10.0);
        let flat = SizeMap {
            low: 3.0,
            high: 3.0,
            scale: SizeScale::default(),
        };
        assert_eq!(flat.diameter(3.0), 34.0_f64.sqrt());
    }

    #[test]
    fn gradients_color_numeric_columns() {
        let black = Color::from_rgb8(0, 0, 0);
        let white = Color::from_rgb8(0xff, 0xff, 0xff);
        let gradient = Gradient::Custom {
            low: black,
            high: white,
        };
        let data = Dataset::new()
            .with_column("x", vec![3.0, 1.0, 2.0])
            .unwrap()
            .with_column("c", vec![10.0, 0.0, 5.0])
            .unwrap();
        let mapping = ChannelMapping::new().x("x").y("x").color("c");
        let points = PlotSpec::build(data.clone(), mapping.clone())
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::color_gradient(gradient));
        let figure = points.realize(viewport()).unwrap();
        let colors: Vec<_> = layer_marks(&figure).iter().map(|m| m.color().to_rgba8()).collect();
        assert_eq!(colors[0], white.to_rgba8());
        assert_eq!(colors[1], black.to_rgba8());
        assert_eq!(colors[2], gradient.at(0.5).to_rgba8());

        // Lines break into one segment per pair, colored by its left end.
        let lines = PlotSpec::build(data, mapping)
            .add_layer(Layer::lines())
            .add_scale(ScaleOverride::color_gradient(gradient));
        let figure = lines.realize(viewport()).unwrap();
        let segments = layer_marks(&figure);
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|m| matches!(m, Mark::Stroke { .. })));
        assert_eq!(segments[0].color().to_rgba8(), black.to_rgba8());
        assert_eq!(segments[1].color().to_rgba8(), gradient.at(0.5).to_rgba8());
        assert!(segments[0].bounding_box().center().x < segments[1].bounding_box().center().x);
    }

    #[test]
    fn reversed_axes_run_right_to_left() {
        let data = Dataset::new()
            .with_column("x", vec![1.0, 2.0, 3.0])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("x"))
            .add_layer(Layer::points());
        let plain = centers(&spec.realize(viewport()).unwrap());
        let reversed = centers(&spec.add_scale(ScaleOverride::x_reverse()).realize(viewport()).unwrap());
        assert!(plain[0].x < plain[2].x);
        assert!(reversed[0].x > reversed[2].x);
        // Only the horizontal position changes.
        for (a, b) in plain.iter().zip(&reversed) {
            assert!((a.y - b.y).abs() < 1e-6);
            assert!((a.x + b.x - 400.0).abs() < 1e-6);
        }
    }

    #[test]
    fn square_root_axes_space_squares_evenly() {
        let data = Dataset::new()
            .with_column("x", vec![1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap()
            .with_column("y", vec![0.0, 1.0, 4.0, 9.0, -1.0])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("y"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::Y(PositionScale {
                transform: AxisTransform::Sqrt,
                limits: None,
            }));
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [Warning::OutOfDomain {
                layer: 0,
                channel: Channel::Y,
                rows: 1
            }]
        );
        let ys: Vec<f64> = centers(&figure).iter().map(|c| c.y).collect();
        assert_eq!(ys.len(), 4);
        let step = ys[0] - ys[1];
        assert!(step > 0.0);
        for pair in ys.windows(2) {
            assert!((pair[0] - pair[1] - step).abs() < 1e-6, "{ys:?}");
        }
    }

    #[test]
    fn limits_fix_the_domain_and_drop_rows() {
        let data = Dataset::new()
            .with_column("x", vec![1.0, 2.0, 3.0])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("x"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::x_limits(1.5, 2.5));
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [Warning::OutOfDomain {
                layer: 0,
                channel: Channel::X,
                rows: 2
            }]
        );
        let centers = centers(&figure);
        assert_eq!(centers.len(), 1);
        // The limits are centered on 2, so the one point left is too.
        assert!((centers[0].x - 200.0).abs() < 1e-6, "{centers:?}");
    }

    #[test]
    fn temporal_columns_are_continuous_axes() {
        let data = Dataset::new()
            .with_column("day", vec![172_800_i64, 0, 86_400])
            .unwrap()
            .with_column("y", vec![1.0, 2.0, 3.0])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("day").y("y"))
            .add_layer(Layer::points());
        let figure = spec.realize(viewport()).unwrap();
        assert!(figure.warnings().is_empty());
        let centers = centers(&figure);
        assert!(centers[1].x < centers[2].x && centers[2].x < centers[0].x);
        assert!(spec.add_scale(ScaleOverride::x_log10()).realize(viewport()).is_ok());
    }

    #[test]
    fn shape_overrides_pick_symbols_by_level() {
        let data = Dataset::new()
            .with_column("x", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_column("s", vec!["b", "a", "b"])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("x").shape("s"))
            .add_layer(Layer::points())
            .add_scale(ScaleOverride::shapes([Shape::Plus, Shape::Square]));
        let figure = spec.realize(viewport()).unwrap();
        let marks = layer_marks(&figure);
        // Level "a" is a stroked plus, "b" a filled square.
        assert!(matches!(marks[0], Mark::Fill { .. }));
        assert!(matches!(marks[1], Mark::Stroke { .. }));
        assert!(matches!(marks[2], Mark::Fill { .. }));

        let short = spec.add_scale(ScaleOverride::shapes([Shape::Triangle]));
        let figure = short.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [
                Warning::TooManyShapes {
                    levels: 2,
                    available: 1
                },
                Warning::MissingValues { layer: 0, rows: 2 }
            ]
        );
    }

    #[test]
    fn too_few_points_names_the_color_level() {
        let data = Dataset::new()
            .with_column("x", vec![1.0, 2.0, 3.0, 1.0])
            .unwrap()
            .with_column("y", vec![Some(1.0), Some(2.0), None, Some(4.0)])
            .unwrap()
            .with_column("g", vec!["a", "a", "b", "c"])
            .unwrap();
        let spec = PlotSpec::build(data, ChannelMapping::new().x("x").y("y").color("g"))
            .add_layer(Layer::smooth());
        let figure = spec.realize(viewport()).unwrap();
        // Level "b" loses its only row, so "c" is still reported as level 2.
        assert_eq!(
            figure.warnings(),
            [
                Warning::MissingValues { layer: 0, rows: 1 },
                Warning::TooFewPoints {
                    layer: 0,
                    group: Some(2)
                }
            ]
        );

        let single = Dataset::new().with_column("x", vec![1.0]).unwrap();
        let spec =
            PlotSpec::build(single, ChannelMapping::new().x("x").y("x")).add_layer(Layer::smooth());
        let figure = spec.realize(viewport()).unwrap();
        assert_eq!(
            figure.warnings(),
            [Warning::TooFewPoints {
                layer: 0,
                group: None
            }]
        );
    }

    #[test]
    fn minimal_theme_paints_a_white_panel() {
        let spec = PlotSpec::build(cars(), ChannelMapping::new().x("displ").y("hwy"))
            .with_theme(Theme::minimal());
        let figure = spec.realize(viewport()).unwrap();
        let marks = figure.marks();
        assert_eq!(marks[0].color().to_rgba8(), Color::from_rgb8(0xff, 0xff, 0xff).to_rgba8());
        assert_eq!(marks[1].color().to_rgba8(), Color::from_rgb8(0xde, 0xde, 0xde).to_rgba8());
        assert_eq!(figure.background().to_rgba8(), Theme::default().background.to_rgba8());
    }
}
