// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Discrete palettes and continuous gradients.

use peniko::Color;

// ColorBrewer qualitative palettes.
const SET1: [[u8; 3]; 9] = [
    [0xe4, 0x1a, 0x1c],
    [0x37, 0x7e, 0xb8],
    [0x4d, 0xaf, 0x4a],
    [0x98, 0x4e, 0xa3],
    [0xff, 0x7f, 0x00],
    [0xff, 0xff, 0x33],
    [0xa6, 0x56, 0x28],
    [0xf7, 0x81, 0xbf],
    [0x99, 0x99, 0x99],
];

const SET2: [[u8; 3]; 8] = [
    [0x66, 0xc2, 0xa5],
    [0xfc, 0x8d, 0x62],
    [0x8d, 0xa0, 0xcb],
    [0xe7, 0x8a, 0xc3],
    [0xa6, 0xd8, 0x54],
    [0xff, 0xd9, 0x2f],
    [0xe5, 0xc4, 0x94],
    [0xb3, 0xb3, 0xb3],
];

const DARK2: [[u8; 3]; 8] = [
    [0x1b, 0x9e, 0x77],
    [0xd9, 0x5f, 0x02],
    [0x75, 0x70, 0xb3],
    [0xe7, 0x29, 0x8a],
    [0x66, 0xa6, 0x1e],
    [0xe6, 0xab, 0x02],
    [0xa6, 0x76, 0x1d],
    [0x66, 0x66, 0x66],
];

// Okabe & Ito, "Color Universal Design".
const OKABE_ITO: [[u8; 3]; 8] = [
    [0xe6, 0x9f, 0x00],
    [0x56, 0xb4, 0xe9],
    [0x00, 0x9e, 0x73],
    [0xf0, 0xe4, 0x42],
    [0x00, 0x72, 0xb2],
    [0xd5, 0x5e, 0x00],
    [0xcc, 0x79, 0xa7],
    [0x00, 0x00, 0x00],
];

const DEFAULT_STOPS: [[u8; 3]; 2] = [[0x13, 0x2b, 0x43], [0x56, 0xb1, 0xf7]];

const VIRIDIS_STOPS: [[u8; 3]; 9] = [
    [0x44, 0x01, 0x54],
    [0x47, 0x2d, 0x7b],
    [0x3b, 0x52, 0x8b],
    [0x2c, 0x72, 0x8e],
    [0x21, 0x91, 0x8c],
    [0x28, 0xae, 0x80],
    [0x5e, 0xc9, 0x62],
    [0xad, 0xdc, 0x30],
    [0xfd, 0xe7, 0x25],
];

const BLUES_STOPS: [[u8; 3]; 5] = [
    [0xef, 0xf3, 0xff],
    [0xbd, 0xd7, 0xe7],
    [0x6b, 0xae, 0xd6],
    [0x31, 0x82, 0xbd],
    [0x08, 0x51, 0x9c],
];

const GREYS_STOPS: [[u8; 3]; 2] = [[0xf0, 0xf0, 0xf0], [0x25, 0x25, 0x25]];

const RED_BLUE_STOPS: [[u8; 3]; 5] = [
    [0xca, 0x00, 0x20],
    [0xf4, 0xa5, 0x82],
    [0xf7, 0xf7, 0xf7],
    [0x92, 0xc5, 0xde],
    [0x05, 0x71, 0xb0],
];

/// A discrete set of colors for categorical data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Palette {
    /// Evenly spaced hues at equal lightness, sized to the number of levels.
    #[default]
    Hue,
    Set1,
    Set2,
    Dark2,
    /// A palette that stays distinguishable under common color vision deficiencies.
    OkabeIto,
    /// Shades of grey, sized to the number of levels.
    Greys,
}

impl Palette {
    pub fn name(self) -> &'static str {
        match self {
            Self::Hue => "hue",
            Self::Set1 => "Set1",
            Self::Set2 => "Set2",
            Self::Dark2 => "Dark2",
            Self::OkabeIto => "Okabe-Ito",
            Self::Greys => "greys",
        }
    }

    /// The number of distinct colors, or `None` when the palette adapts to any
    /// number of levels.
    pub fn capacity(self) -> Option<usize> {
        self.table().map(<[_]>::len)
    }

    fn table(self) -> Option<&'static [[u8; 3]]> {
        match self {
            Self::Hue | Self::Greys => None,
            Self::Set1 => Some(&SET1),
            Self::Set2 => Some(&SET2),
            Self::Dark2 => Some(&DARK2),
            Self::OkabeIto => Some(&OKABE_ITO),
        }
    }

    /// Colors for `n` levels.
    ///
    /// Fixed palettes repeat from the start when `n` exceeds their capacity.
    pub fn colors(self, n: usize) -> Vec<Color> {
        match self {
            Self::Hue => (0..n)
                .map(|i| {
                    // Start at 15 degrees and leave a gap so the first and last
                    // levels don't meet.
                    let hue = 15.0 + 360.0 * i as f64 / n.max(1) as f64;
                    hsl(hue % 360.0, 0.65, 0.55)
                })
                .collect(),
            Self::Greys => (0..n)
                .map(|i| {
                    let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
                    let v = 0.2 + 0.6 * t;
                    Color::new([v, v, v, 1.0])
                })
                .collect(),
            _ => {
                let table = self.table().unwrap_or(&SET1);
                (0..n)
                    .map(|i| {
                        let [r, g, b] = table[i % table.len()];
                        Color::from_rgb8(r, g, b)
                    })
                    .collect()
            }
        }
    }
}

/// A continuous color ramp for numeric data.
#[derive(Clone, Copy, Debug, Default)]
pub enum Gradient {
    /// Dark to light blue.
    #[default]
    Default,
    Viridis,
    Blues,
    Greys,
    /// Diverging red to blue through a light neutral midpoint.
    RedBlue,
    Custom {
        low: Color,
        high: Color,
    },
}

impl Gradient {
    /// The color at `t`, clamped to `0..=1`.
    ///
    /// Non-finite `t` evaluates to the low end.
    pub fn at(self, t: f64) -> Color {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 } as f32;
        let stops: &[[u8; 3]] = match self {
            Self::Default => &DEFAULT_STOPS,
            Self::Viridis => &VIRIDIS_STOPS,
            Self::Blues => &BLUES_STOPS,
            Self::Greys => &GREYS_STOPS,
            Self::RedBlue => &RED_BLUE_STOPS,
            Self::Custom { low, high } => return lerp(low.components, high.components, t),
        };
        let scaled = t * (stops.len() - 1) as f32;
        let idx = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - idx as f32;
        lerp(unorm(stops[idx]), unorm(stops[idx + 1]), frac)
    }
}

fn unorm([r, g, b]: [u8; 3]) -> [f32; 4] {
    [
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        1.0,
    ]
}

fn lerp(a: [f32; 4], b: [f32; 4], t: f32) -> Color {
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = a[i] + (b[i] - a[i]) * t;
    }
    Color::new(out)
}

fn hsl(hue: f64, saturation: f64, lightness: f64) -> Color {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    Color::new([(r + m) as f32, (g + m) as f32, (b + m) as f32, 1.0])
}
