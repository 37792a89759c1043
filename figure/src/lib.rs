// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Graphics devices and file export for [`PlotSpec`]s.
//!
//! Figure writes a plot to disk in one of two ways:
//!
//! - Through an explicit graphics device: [`Device::open`] binds a destination,
//!   a [`Format`] and a [`Size`]; [`Device::render`] draws a spec onto it and
//!   [`Device::close`] writes the file. [`export_via_device`] runs that sequence
//!   for you.
//! - Directly, with [`export_direct`], which infers the format from the file
//!   extension and falls back to a default size.
//!
//! In both cases the destination is only touched when the output is complete:
//! every device stages its output in a temporary file next to the destination
//! and renames it into place on close. A device that is dropped without being
//! closed, for example because rendering failed, discards its staged output.
//!
//! There is no global "current device". Code that wants the open/render/close
//! stack of a traditional plotting system can keep a [`DeviceList`].
//!
//! ```no_run
//! use figure::{export_direct, ExportOptions};
//! use figure::figure_encoding::{ChannelMapping, Dataset, Layer, PlotSpec};
//!
//! let data = Dataset::new()
//!     .with_column("displ", vec![1.8, 2.0, 2.8, 3.1])?
//!     .with_column("hwy", vec![29.0, 31.0, 26.0, 23.0])?;
//! let spec = PlotSpec::build(data, ChannelMapping::new().x("displ").y("hwy"))
//!     .add_layer(Layer::points());
//! let exported = export_direct(&spec, "mileage.png", &ExportOptions::default())?;
//! assert_eq!((exported.width, exported.height), (1050, 750));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Rendering to memory for display is a separate, explicit call:
//! [`render_pixmap`].

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
    clippy::cast_sign_loss,
    clippy::missing_assert_message,
    clippy::allow_attributes_without_reason
)]

mod canvas;
mod device;
mod export;
mod format;
mod size;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use figure_encoding;
pub use vello_cpu;
pub use figure_encoding::{Figure, PlotSpec, RenderError, Warning};

pub use canvas::raster::unpremultiplied;
pub use vello_cpu::Pixmap;
pub use device::{Device, DeviceList};
pub use export::{
    export_direct, export_via_device, export_via_device_with, render_pixmap, Exported,
};
pub use format::Format;
pub use size::{DeviceOptions, ExportOptions, Size, Unit, MAX_PIXELS};

/// Errors that can occur while exporting a figure.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The destination can't receive output: its directory is missing or not
    /// writable, or the destination is itself a directory.
    #[error("couldn't open a graphics device for '{}'", .path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A render or close was requested from a [`DeviceList`] with no open device.
    #[error("no graphics device is open")]
    NoActiveDevice,
    /// The requested format, or the file extension it was inferred from, is
    /// not one of [`Format`].
    #[error("unsupported output format '{0}'")]
    UnsupportedFormat(String),
    /// The plot specification could not be realized.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The device size or resolution is unusable.
    #[error("invalid device size: {0}")]
    InvalidSize(String),
    /// The canvas could not be encoded into the staging file.
    #[error("couldn't encode {format} output")]
    Encode {
        format: Format,
        #[source]
        source: EncodeError,
    },
    /// The staged output could not be moved onto the destination.
    #[error("couldn't write '{}'", .path.display())]
    Finalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The encoder-level cause of an [`Error::Encode`].
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Png(#[from] png::EncodingError),
    #[error(transparent)]
    Jpeg(#[from] image::ImageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
