// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use peniko::color::palette;
use peniko::Color;

use crate::dataset::Dataset;
use crate::figure::{Figure, RenderError, Viewport};
use crate::layer::Layer;
use crate::mapping::ChannelMapping;
use crate::resolve;
use crate::scale::{ScaleKind, ScaleOverride};

/// Colors and spacing of everything around the data.
#[derive(Clone, Debug)]
pub struct Theme {
    pub background: Color,
    pub panel: Color,
    /// Grid lines at every tick, or no grid.
    pub grid: Option<Color>,
    pub axis: Color,
    /// Space around the panel, as a fraction of the shorter canvas side.
    pub margin: f64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: palette::css::WHITE,
            panel: Color::from_rgb8(0xeb, 0xeb, 0xeb),
            grid: Some(palette::css::WHITE),
            axis: Color::from_rgb8(0x33, 0x33, 0x33),
            margin: 0.08,
        }
    }
}

impl Theme {
    /// White panel, light grey grid.
    pub fn minimal() -> Self {
        Self {
            panel: palette::css::WHITE,
            grid: Some(Color::from_rgb8(0xde, 0xde, 0xde)),
            ..Self::default()
        }
    }
}

/// An immutable description of a figure.
///
/// Builder methods take `&self` and return a new spec; the dataset is shared
/// between all specs derived from the same [`PlotSpec::build`] call.
#[derive(Clone, Debug)]
pub struct PlotSpec {
    data: Arc<Dataset>,
    mapping: ChannelMapping,
    layers: Vec<Layer>,
    scales: Vec<ScaleOverride>,
    theme: Theme,
}
static_assertions::assert_impl_all!(PlotSpec: Send, Sync);

impl PlotSpec {
    /// A spec without layers or scale overrides.
    pub fn build(data: impl Into<Arc<Dataset>>, mapping: ChannelMapping) -> Self {
        Self {
            data: data.into(),
            mapping,
            layers: Vec::new(),
            scales: Vec::new(),
            theme: Theme::default(),
        }
    }

    /// A new spec with `layer` drawn on top of the existing layers.
    #[must_use]
    pub fn add_layer(&self, layer: Layer) -> Self {
        let mut spec = self.clone();
        spec.layers.push(layer);
        spec
    }

    /// A new spec with `scale` appended to the scale overrides.
    #[must_use]
    pub fn add_scale(&self, scale: ScaleOverride) -> Self {
        let mut spec = self.clone();
        spec.scales.push(scale);
        spec
    }

    #[must_use]
    pub fn with_theme(&self, theme: Theme) -> Self {
        Self {
            theme,
            ..self.clone()
        }
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn mapping(&self) -> &ChannelMapping {
        &self.mapping
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// All scale overrides, in the order they were added.
    pub fn scales(&self) -> &[ScaleOverride] {
        &self.scales
    }

    /// The effective override for `kind`: the last one added.
    pub fn scale(&self, kind: ScaleKind) -> Option<&ScaleOverride> {
        self.scales.iter().rev().find(|s| s.kind() == kind)
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Lays out the spec on `viewport`.
    ///
    /// A spec without layers still produces a figure: background, panel,
    /// grid and axes.
    pub fn realize(&self, viewport: Viewport) -> Result<Figure, RenderError> {
        resolve::realize(self, viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{AxisTransform, PositionScale};

    fn spec() -> PlotSpec {
        let data = Dataset::new().with_column("a", vec![1.0, 2.0]).unwrap();
        PlotSpec::build(data, ChannelMapping::new().x("a").y("a"))
    }

    #[test]
    fn builders_do_not_mutate_the_receiver() {
        let base = spec();
        let layered = base.add_layer(Layer::points()).add_layer(Layer::lines());
        assert!(base.layers().is_empty());
        assert_eq!(layered.layers().len(), 2);
        assert!(std::ptr::eq(base.data(), layered.data()));
    }

    #[test]
    fn same_kind_scales_are_last_wins() {
        let spec = spec()
            .add_scale(ScaleOverride::x_log10())
            .add_scale(ScaleOverride::y_reverse())
            .add_scale(ScaleOverride::x_limits(0.0, 5.0));
        assert_eq!(spec.scales().len(), 3);
        match spec.scale(ScaleKind::X) {
            Some(ScaleOverride::X(PositionScale { transform, limits })) => {
                assert_eq!(*transform, AxisTransform::Identity);
                assert_eq!(*limits, Some((0.0, 5.0)));
            }
            other => panic!("unexpected x scale {other:?}"),
        }
        assert!(matches!(spec.scale(ScaleKind::Y), Some(ScaleOverride::Y(_))));
        assert!(spec.scale(ScaleKind::Color).is_none());
    }
}
