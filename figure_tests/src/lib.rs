// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Figure tests.
//!
//! Shared fixtures for the integration tests in `tests/`: a small fuel
//! economy dataset, output directories and decoders for the files Figure
//! writes.
//!
//! Outputs go to a temporary directory which is removed when the test ends.
//! Set `FIGURE_DEBUG_TEST` to `all` or to a comma separated list of test
//! names to keep them in `figure_tests/debug_outputs/<test name>` instead.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(
    missing_debug_implementations,
    unreachable_pub,
    missing_docs,
    clippy::missing_assert_message,
    clippy::allow_attributes_without_reason
)]

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figure::{Pixmap, PlotSpec};
use figure_encoding::{ChannelMapping, Column, Dataset, DatasetError, Layer};
use tempfile::TempDir;

/// Installs a logger that prints through the test harness.
pub fn init_logging() {
    // Only the first call in a test binary succeeds.
    drop(env_logger::builder().is_test(true).try_init());
}

/// A slice of the classic fuel economy data, with a gap in `hwy`.
pub fn mpg() -> Dataset {
    mpg_columns().expect("the mpg fixture columns line up")
}

fn mpg_columns() -> Result<Dataset, DatasetError> {
    let displ = vec![1.8, 1.8, 2.0, 2.8, 3.1, 2.8, 4.2, 5.7, 6.2, 5.3, 2.4, 3.5];
    let hwy = vec![
        Some(29.0),
        Some(29.0),
        Some(31.0),
        Some(26.0),
        Some(27.0),
        Some(23.0),
        None,
        Some(17.0),
        Some(26.0),
        Some(20.0),
        Some(30.0),
        Some(25.0),
    ];
    let class = vec![
        "compact", "compact", "compact", "midsize", "midsize", "suv", "suv", "suv", "2seater",
        "pickup", "compact", "midsize",
    ];
    let drv = vec!["f", "f", "f", "f", "4", "4", "4", "r", "r", "4", "f", "f"];
    // Model years, as seconds since the epoch.
    let year: Vec<i64> = [1999, 1999, 2008, 1999, 2008, 1999, 2008, 1999, 2008, 2008, 1999, 2008]
        .into_iter()
        .map(|y| if y == 1999 { 915_148_800 } else { 1_199_145_600 })
        .collect();
    Dataset::new()
        .with_column("displ", displ)?
        .with_column("hwy", Column::from(hwy))?
        .with_column("class", class)?
        .with_column("drv", drv)?
        .with_column("year", year)
}

/// Points of highway mileage against displacement, colored by class.
pub fn scatter() -> PlotSpec {
    PlotSpec::build(
        mpg(),
        ChannelMapping::new().x("displ").y("hwy").color("class"),
    )
    .add_layer(Layer::points())
}

/// A spec with a mapping but no layers.
pub fn blank() -> PlotSpec {
    PlotSpec::build(mpg(), ChannelMapping::new().x("displ").y("hwy"))
}

/// A directory for the outputs of one test.
pub struct OutputDir {
    path: PathBuf,
    _temp: Option<TempDir>,
}

impl OutputDir {
    pub fn new(test_name: &str) -> Result<Self> {
        if env_var_relates_to("FIGURE_DEBUG_TEST", test_name) {
            let path = Path::new(env!("CARGO_MANIFEST_DIR"))
                .join("debug_outputs")
                .join(test_name);
            if path.exists() {
                std::fs::remove_dir_all(&path)?;
            }
            std::fs::create_dir_all(&path)?;
            Ok(Self { path, _temp: None })
        } else {
            let temp = tempfile::tempdir()?;
            Ok(Self {
                path: temp.path().to_path_buf(),
                _temp: Some(temp),
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Names of everything in the directory, sorted.
    pub fn entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

fn env_var_relates_to(env_var: &'static str, name: &str) -> bool {
    if let Ok(val) = env::var(env_var) {
        if val.eq_ignore_ascii_case("all") {
            return true;
        }
        return val.split(',').any(|test| test.trim().eq_ignore_ascii_case(name));
    }
    false
}

/// The premultiplied RGBA8 value at (`x`, `y`).
pub fn pixel(pixmap: &Pixmap, x: usize, y: usize) -> [u8; 4] {
    let px = pixmap.data()[y * usize::from(pixmap.width()) + x];
    [px.r, px.g, px.b, px.a]
}

/// Decodes a PNG or JPEG file into RGBA8.
pub fn decode(path: &Path) -> Result<image::RgbaImage> {
    let image = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    Ok(image.to_rgba8())
}

/// Parses an SVG file.
pub fn parse_svg(path: &Path) -> Result<usvg::Tree> {
    let text = std::fs::read_to_string(path)?;
    let tree = usvg::Tree::from_str(&text, &usvg::Options::default())
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(tree)
}
