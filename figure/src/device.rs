// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use figure_encoding::{Figure, PlotSpec, Viewport, Warning};
use tempfile::NamedTempFile;

use crate::canvas::{self, Canvas};
use crate::export::Exported;
use crate::{DeviceOptions, Error, Format, Result, Size};

/// A graphics device bound to one destination file.
///
/// Output goes to a staging file in the destination's directory and only
/// replaces the destination when [`Device::close`] succeeds. Dropping a
/// device without closing it discards everything it drew, leaving the
/// destination as it was.
pub struct Device {
    path: PathBuf,
    format: Format,
    viewport: Viewport,
    options: DeviceOptions,
    canvas: Box<dyn Canvas>,
    staging: NamedTempFile,
    warnings: Vec<Warning>,
    discard: DiscardWarning,
}

/// Warns when a device goes away without being closed.
///
/// The staging file removes itself on drop; this only reports it.
struct DiscardWarning {
    path: PathBuf,
    armed: bool,
}

impl Drop for DiscardWarning {
    fn drop(&mut self) {
        if self.armed {
            log::warn!(
                "device for '{}' dropped without close; output discarded",
                self.path.display()
            );
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Opens a device with the default [`DeviceOptions`].
    pub fn open(path: impl AsRef<Path>, format: Format, size: Size) -> Result<Self> {
        Self::open_with(path, format, size, &DeviceOptions::default())
    }

    /// Opens a device writing `format` output of `size` to `path`.
    ///
    /// Fails with [`Error::InvalidSize`] before touching the filesystem, and
    /// with [`Error::DeviceOpen`] when no staging file can be created next to
    /// `path`.
    pub fn open_with(
        path: impl AsRef<Path>,
        format: Format,
        size: Size,
        options: &DeviceOptions,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let viewport = size.viewport(format, options.dpi)?;
        let staging = stage(&path)?;
        let canvas = canvas::create(format, viewport.width, viewport.height, options);
        log::debug!(
            "opened {format} device for '{}' ({} × {})",
            path.display(),
            viewport.width,
            viewport.height
        );
        Ok(Self {
            discard: DiscardWarning {
                path: path.clone(),
                armed: true,
            },
            path,
            format,
            viewport,
            options: options.clone(),
            canvas,
            staging,
            warnings: Vec::new(),
        })
    }

    /// Realizes `spec` for this device and draws it, replacing any earlier
    /// drawing.
    ///
    /// On error the canvas keeps its previous contents.
    pub fn render(&mut self, spec: &PlotSpec) -> Result<()> {
        let figure = spec.realize(self.viewport)?;
        for warning in figure.warnings() {
            log::warn!("{}: {warning}", self.path.display());
        }
        self.render_figure(&figure);
        Ok(())
    }

    /// Draws an already realized figure, replacing any earlier drawing.
    pub fn render_figure(&mut self, figure: &Figure) {
        canvas::draw(&mut *self.canvas, figure, self.options.background);
        self.warnings = figure.warnings().to_vec();
        log::debug!(
            "rendered {} marks to '{}'",
            figure.marks().len(),
            self.path.display()
        );
    }

    /// Writes the output and moves it onto the destination.
    ///
    /// Nothing is written to the destination if this fails.
    pub fn close(self) -> Result<Exported> {
        let Self {
            path,
            format,
            viewport,
            canvas,
            staging,
            warnings,
            mut discard,
            ..
        } = self;
        // A failed commit is reported through the error, not the warning.
        discard.armed = false;
        let bytes = commit(staging, &path, format, &*canvas)?;
        log::debug!("closed device for '{}'", path.display());
        Ok(Exported {
            path,
            format,
            width: viewport.width.round() as u32,
            height: viewport.height.round() as u32,
            bytes,
            warnings,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The drawing area: pixels for raster formats, points for vector ones.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Warnings from the most recent render.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Creates the staging file for `path` in the same directory, so that the
/// final rename never crosses filesystems.
pub(crate) fn stage(path: &Path) -> Result<NamedTempFile> {
    let open_error = |source| Error::DeviceOpen {
        path: path.to_path_buf(),
        source,
    };
    if path.is_dir() {
        return Err(open_error(io::Error::other("destination is a directory")));
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix(".figure-").suffix(".part");
    // The staged file becomes the output, so it gets 0644 rather than 0600.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir).map_err(open_error)
}

/// Encodes `canvas` into `staging`, syncs it and renames it onto `path`.
///
/// Returns the size of the written file.
pub(crate) fn commit(
    mut staging: NamedTempFile,
    path: &Path,
    format: Format,
    canvas: &dyn Canvas,
) -> Result<u64> {
    let encode_error = |source| Error::Encode { format, source };
    {
        let mut writer = BufWriter::new(&mut staging);
        canvas.encode(&mut writer).map_err(encode_error)?;
        writer.flush().map_err(|e| encode_error(e.into()))?;
    }
    let finalize_error = |source| Error::Finalize {
        path: path.to_path_buf(),
        source,
    };
    staging.as_file().sync_all().map_err(finalize_error)?;
    let file = staging.persist(path).map_err(|e| finalize_error(e.error))?;
    let bytes = file.metadata().map_err(finalize_error)?.len();
    Ok(bytes)
}

/// A caller-owned stack of open devices.
///
/// The most recently opened device is the current one; closing it makes the
/// previous one current again.
#[derive(Debug, Default)]
pub struct DeviceList {
    devices: Vec<Device>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a device and makes it current.
    pub fn open(&mut self, path: impl AsRef<Path>, format: Format, size: Size) -> Result<&Device> {
        self.open_with(path, format, size, &DeviceOptions::default())
    }

    pub fn open_with(
        &mut self,
        path: impl AsRef<Path>,
        format: Format,
        size: Size,
        options: &DeviceOptions,
    ) -> Result<&Device> {
        self.push(Device::open_with(path, format, size, options)?);
        Ok(&self.devices[self.devices.len() - 1])
    }

    /// Makes an already opened device current.
    pub fn push(&mut self, device: Device) {
        self.devices.push(device);
    }

    pub fn current(&self) -> Option<&Device> {
        self.devices.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Device> {
        self.devices.last_mut()
    }

    /// Renders `spec` on the current device.
    pub fn render(&mut self, spec: &PlotSpec) -> Result<()> {
        self.current_mut().ok_or(Error::NoActiveDevice)?.render(spec)
    }

    /// Closes the current device.
    pub fn close(&mut self) -> Result<Exported> {
        self.devices.pop().ok_or(Error::NoActiveDevice)?.close()
    }

    /// Closes every device, most recent first.
    ///
    /// All devices are released even if some fail to close; the first error
    /// is returned.
    pub fn close_all(&mut self) -> Result<Vec<Exported>> {
        let mut exported = Vec::with_capacity(self.devices.len());
        let mut first_error = None;
        while let Some(device) = self.devices.pop() {
            match device.close() {
                Ok(e) => exported.push(e),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(exported),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
