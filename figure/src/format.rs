// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::Error;

/// An output file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Png,
    Jpeg,
    Svg,
}

impl Format {
    /// Infers the format from the extension of `path`, ignoring case.
    ///
    /// `jpg` and `jpeg` both map to [`Format::Jpeg`].
    pub fn infer(path: impl AsRef<Path>) -> Result<Self, Error> {
        let extension = path
            .as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy())
            .unwrap_or_default();
        extension.parse()
    }

    /// Whether the format stores pixels rather than drawing commands.
    pub fn is_raster(self) -> bool {
        !matches!(self, Self::Svg)
    }

    /// The canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            _ => Err(Error::UnsupportedFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Svg => "SVG",
        })
    }
}
