// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plot specifications and their realization into drawable figures.
//!
//! A [`PlotSpec`] describes a figure declaratively: a [`Dataset`], a
//! [`ChannelMapping`] from columns to visual channels, an ordered list of
//! [`Layer`]s and an ordered list of [`ScaleOverride`]s. Building a spec is
//! pure; every builder method returns a new spec.
//!
//! [`PlotSpec::realize`] turns a spec into a [`Figure`] for a given
//! [`Viewport`]: a flat, ordered list of filled and stroked paths which a
//! graphics device can draw without knowing anything about the data.
//!
//! ```
//! use figure_encoding::{ChannelMapping, Column, Dataset, Layer, PlotSpec, ScaleOverride, Viewport};
//!
//! let data = Dataset::new()
//!     .with_column("displ", Column::from(vec![1.8, 2.0, 2.8, 3.1]))?
//!     .with_column("hwy", Column::from(vec![29.0, 31.0, 26.0, 23.0]))?;
//! let spec = PlotSpec::build(data, ChannelMapping::new().x("displ").y("hwy"))
//!     .add_layer(Layer::points())
//!     .add_scale(ScaleOverride::y_log10());
//! let figure = spec.realize(Viewport::new(640.0, 480.0))?;
//! assert!(figure.warnings().is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(
    missing_debug_implementations,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    clippy::allow_attributes_without_reason
)]

mod dataset;
mod figure;
mod layer;
mod mapping;
pub mod palette;
mod resolve;
mod scale;
mod spec;
mod ticks;

pub use dataset::{Column, ColumnKind, Dataset, DatasetError};
pub use figure::{Figure, Mark, RenderError, Viewport, Warning};
pub use layer::{BarLayer, Layer, LayerKind, LineLayer, PointLayer, Shape, SmoothLayer};
pub use mapping::{Channel, ChannelMapping};
pub use palette::{Gradient, Palette};
pub use scale::{
    AxisTransform, ColorScale, PositionScale, ScaleKind, ScaleOverride, ShapeScale, SizeScale,
};
pub use spec::{PlotSpec, Theme};

pub use peniko;
pub use peniko::kurbo;
pub use peniko::Color;
