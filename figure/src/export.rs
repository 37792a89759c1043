// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::path::{Path, PathBuf};

use figure_encoding::{PlotSpec, Viewport, Warning};

use crate::canvas::{self, raster};
use crate::device::{commit, stage, Device};
use crate::size::POINTS_PER_INCH;
use crate::{DeviceOptions, ExportOptions, Format, Pixmap, Result, Size};

/// A report of a completed export.
#[derive(Clone, Debug)]
pub struct Exported {
    pub path: PathBuf,
    pub format: Format,
    /// Pixels for raster formats, points (rounded) for vector formats.
    pub width: u32,
    pub height: u32,
    /// Size of the written file.
    pub bytes: u64,
    /// Recoverable problems found while realizing the plot.
    pub warnings: Vec<Warning>,
}

/// Opens a device, renders `spec` and closes the device.
///
/// If rendering fails the device is released without writing anything, so
/// `path` keeps whatever it held before.
pub fn export_via_device(
    spec: &PlotSpec,
    path: impl AsRef<Path>,
    format: Format,
    size: Size,
) -> Result<Exported> {
    export_via_device_with(spec, path, format, size, &DeviceOptions::default())
}

/// [`export_via_device`] with explicit device options.
pub fn export_via_device_with(
    spec: &PlotSpec,
    path: impl AsRef<Path>,
    format: Format,
    size: Size,
    options: &DeviceOptions,
) -> Result<Exported> {
    let mut device = Device::open_with(path, format, size, options)?;
    device.render(spec)?;
    let exported = device.close()?;
    log_export(&exported);
    Ok(exported)
}

/// Saves `spec` to `path` in one step.
///
/// The format comes from [`ExportOptions::format`] or, failing that, from the
/// extension of `path`; the size defaults to 7 × 5 inches. The spec is
/// realized before anything is created on disk.
pub fn export_direct(
    spec: &PlotSpec,
    path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<Exported> {
    let path = path.as_ref();
    let format = match options.format {
        Some(format) => format,
        None => Format::infer(path)?,
    };
    let size = options.size.unwrap_or_default();
    let viewport = size.viewport(format, options.device.dpi)?;
    let figure = spec.realize(viewport)?;
    for warning in figure.warnings() {
        log::warn!("{}: {warning}", path.display());
    }

    let mut canvas = canvas::create(format, viewport.width, viewport.height, &options.device);
    canvas::draw(&mut *canvas, &figure, options.device.background);
    let staging = stage(path)?;
    let bytes = commit(staging, path, format, &*canvas)?;
    let exported = Exported {
        path: path.to_path_buf(),
        format,
        width: viewport.width.round() as u32,
        height: viewport.height.round() as u32,
        bytes,
        warnings: figure.warnings().to_vec(),
    };
    log_export(&exported);
    Ok(exported)
}

fn log_export(exported: &Exported) {
    log::info!(
        "exported {} {} × {} to '{}' ({} bytes)",
        exported.format,
        exported.width,
        exported.height,
        exported.path.display(),
        exported.bytes
    );
}

/// Renders `spec` into a new `width` × `height` pixmap, one pixel per point.
///
/// This never touches the filesystem. Sizes outside `1..=MAX_PIXELS` fail
/// with [`Error::InvalidSize`](crate::Error::InvalidSize), like devices do.
pub fn render_pixmap(spec: &PlotSpec, width: u32, height: u32) -> Result<Pixmap> {
    let (width, height) = Size::pixels(width, height).to_pixels(POINTS_PER_INCH)?;
    let figure = spec.realize(Viewport::new(width.into(), height.into()))?;
    let mut canvas = raster::RasterCanvas::new(width as u16, height as u16, raster::Encoding::Png);
    canvas::draw(&mut canvas, &figure, None);
    Ok(canvas.to_pixmap())
}
