// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device sizes and export configuration.

use figure_encoding::{Color, Viewport};

use crate::{Error, Format};

/// The largest accepted raster dimension, in pixels.
pub const MAX_PIXELS: u32 = 16384;

pub(crate) const POINTS_PER_INCH: f64 = 72.0;

/// The unit of a [`Size`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Device pixels at the configured resolution.
    Px,
    #[default]
    In,
    Cm,
    Mm,
}

impl Unit {
    fn inches_per_unit(self, dpi: f64) -> f64 {
        match self {
            Self::Px => 1.0 / dpi,
            Self::In => 1.0,
            Self::Cm => 1.0 / 2.54,
            Self::Mm => 1.0 / 25.4,
        }
    }
}

/// The physical size of a device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
    pub unit: Unit,
}

impl Default for Size {
    /// 7 × 5 inches.
    fn default() -> Self {
        Self::inches(7.0, 5.0)
    }
}

impl Size {
    pub fn new(width: f64, height: f64, unit: Unit) -> Self {
        Self {
            width,
            height,
            unit,
        }
    }

    pub fn inches(width: f64, height: f64) -> Self {
        Self::new(width, height, Unit::In)
    }

    pub fn pixels(width: u32, height: u32) -> Self {
        Self::new(width.into(), height.into(), Unit::Px)
    }

    pub fn cm(width: f64, height: f64) -> Self {
        Self::new(width, height, Unit::Cm)
    }

    pub fn mm(width: f64, height: f64) -> Self {
        Self::new(width, height, Unit::Mm)
    }

    /// The size in inches.
    pub fn to_inches(self, dpi: f64) -> (f64, f64) {
        let k = self.unit.inches_per_unit(dpi);
        (self.width * k, self.height * k)
    }

    /// The raster size at `dpi`, rounded to whole pixels.
    pub fn to_pixels(self, dpi: f64) -> Result<(u32, u32), Error> {
        if !(dpi.is_finite() && dpi > 0.0) {
            return Err(Error::InvalidSize(format!("resolution must be positive, got {dpi} dpi")));
        }
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(Error::InvalidSize(format!(
                "{} × {} {:?} is not a positive size",
                self.width, self.height, self.unit
            )));
        }
        let (w, h) = self.to_inches(dpi);
        let (w, h) = ((w * dpi).round(), (h * dpi).round());
        let max = f64::from(MAX_PIXELS);
        if w < 1.0 || h < 1.0 || w > max || h > max {
            return Err(Error::InvalidSize(format!(
                "{w} × {h} px is outside 1..={MAX_PIXELS} px"
            )));
        }
        Ok((w as u32, h as u32))
    }

    /// The vector size in points.
    pub fn to_points(self, dpi: f64) -> Result<(f64, f64), Error> {
        // Same validation as raster output.
        self.to_pixels(dpi)?;
        let (w, h) = self.to_inches(dpi);
        Ok((w * POINTS_PER_INCH, h * POINTS_PER_INCH))
    }

    /// The viewport a spec is realized for on a device of `format`.
    ///
    /// Raster viewports are measured in pixels, vector viewports in points.
    pub(crate) fn viewport(self, format: Format, dpi: f64) -> Result<Viewport, Error> {
        if format.is_raster() {
            let (w, h) = self.to_pixels(dpi)?;
            Ok(Viewport::new(w.into(), h.into()).with_scale(dpi / POINTS_PER_INCH))
        } else {
            let (w, h) = self.to_points(dpi)?;
            Ok(Viewport::new(w, h))
        }
    }
}

/// Options shared by every device.
#[derive(Clone, Debug)]
pub struct DeviceOptions {
    /// Raster resolution, and the pixel size used to convert [`Unit::Px`].
    pub dpi: f64,
    /// JPEG quality, from 1 to 100.
    pub jpeg_quality: u8,
    /// Overrides the theme background.
    ///
    /// JPEG output has no alpha channel, so transparent backgrounds are
    /// composited onto white.
    pub background: Option<Color>,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            jpeg_quality: 90,
            background: None,
        }
    }
}

/// Options for [`export_direct`](crate::export_direct).
#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    /// Inferred from the file extension when `None`.
    pub format: Option<Format>,
    /// [`Size::default`] when `None`.
    pub size: Option<Size>,
    pub device: DeviceOptions,
}

impl ExportOptions {
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_device(mut self, device: DeviceOptions) -> Self {
        self.device = device;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_round_at_the_device_resolution() {
        assert_eq!(Size::default().to_pixels(150.0).unwrap(), (1050, 750));
        assert_eq!(Size::inches(1.0, 1.0).to_pixels(72.0).unwrap(), (72, 72));
        assert_eq!(Size::mm(25.4, 50.8).to_pixels(100.0).unwrap(), (100, 200));
        assert_eq!(Size::pixels(640, 480).to_pixels(300.0).unwrap(), (640, 480));
    }

    #[test]
    fn vector_sizes_are_in_points() {
        assert_eq!(Size::default().to_points(150.0).unwrap(), (504.0, 360.0));
        let (w, h) = Size::pixels(300, 150).to_points(150.0).unwrap();
        assert!((w - 144.0).abs() < 1e-9 && (h - 72.0).abs() < 1e-9);
    }

    #[test]
    fn viewport_scale_follows_the_resolution() {
        let raster = Size::default().viewport(Format::Png, 144.0).unwrap();
        assert_eq!((raster.width, raster.height, raster.scale), (1008.0, 720.0, 2.0));
        let vector = Size::default().viewport(Format::Svg, 144.0).unwrap();
        assert_eq!((vector.width, vector.height, vector.scale), (504.0, 360.0, 1.0));
    }

    #[test]
    fn unusable_sizes_are_rejected() {
        for size in [
            Size::inches(0.0, 5.0),
            Size::inches(-1.0, 5.0),
            Size::inches(f64::NAN, 5.0),
            Size::inches(f64::INFINITY, 5.0),
            Size::pixels(MAX_PIXELS + 1, 10),
            Size::new(0.001, 0.001, Unit::In),
        ] {
            assert!(
                matches!(size.to_pixels(150.0), Err(Error::InvalidSize(_))),
                "{size:?}"
            );
        }
        assert!(matches!(
            Size::default().to_pixels(0.0),
            Err(Error::InvalidSize(_))
        ));
    }
}
