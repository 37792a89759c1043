// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;
use std::fmt;

/// A visual property that a data column can be mapped onto.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    X,
    Y,
    Color,
    Size,
    Shape,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Color => "color",
            Self::Size => "size",
            Self::Shape => "shape",
        })
    }
}

/// Assignment of dataset columns to visual channels.
///
/// Assigning a channel twice keeps the last assignment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelMapping {
    fields: BTreeMap<Channel, String>,
}

impl ChannelMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, channel: Channel, field: impl Into<String>) -> Self {
        self.fields.insert(channel, field.into());
        self
    }

    pub fn x(self, field: impl Into<String>) -> Self {
        self.set(Channel::X, field)
    }

    pub fn y(self, field: impl Into<String>) -> Self {
        self.set(Channel::Y, field)
    }

    pub fn color(self, field: impl Into<String>) -> Self {
        self.set(Channel::Color, field)
    }

    pub fn size(self, field: impl Into<String>) -> Self {
        self.set(Channel::Size, field)
    }

    pub fn shape(self, field: impl Into<String>) -> Self {
        self.set(Channel::Shape, field)
    }

    /// The column mapped onto `channel`, if any.
    pub fn field(&self, channel: Channel) -> Option<&str> {
        self.fields.get(&channel).map(String::as_str)
    }

    /// Iterates over the mapped channels in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &str)> + '_ {
        self.fields.iter().map(|(c, f)| (*c, f.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassignment_is_last_wins() {
        let mapping = ChannelMapping::new().x("displ").y("hwy").x("cty");
        assert_eq!(mapping.field(Channel::X), Some("cty"));
        assert_eq!(mapping.field(Channel::Y), Some("hwy"));
        assert_eq!(mapping.field(Channel::Color), None);
        assert_eq!(
            mapping.iter().collect::<Vec<_>>(),
            [(Channel::X, "cty"), (Channel::Y, "hwy")]
        );
    }
}
