//! Color handling for legend entries.
//!
//! This module provides the [`Color`] type which wraps the `DynamicColor` type
//! from the color crate, and the fixed palette legends draw from when a new
//! disorder, gene or phenotype first appears in a pedigree.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use color::DynamicColor;
use log::warn;

/// Colors handed out to legend entries in order of first appearance.
const LEGEND_PALETTE: [&str; 12] = [
    "#e8702b", "#4a90d9", "#7cb342", "#c2185b", "#8e24aa", "#00897b", "#f4b400", "#5d4037",
    "#3949ab", "#d81b60", "#00acc1", "#9e9d24",
];

/// Wrapper around the `DynamicColor` type from the color crate
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Color {
    /// Create a new `Color` from a CSS color string such as `"#ff0000"` or `"red"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pedigree_core::color::Color;
    ///
    /// let red = Color::new("#ff0000").unwrap();
    /// let blue = Color::new("blue").unwrap();
    /// assert_ne!(red, blue);
    /// ```
    pub fn new(color_str: &str) -> Result<Self, String> {
        match DynamicColor::from_str(color_str) {
            Ok(color) => Ok(Self { color }),
            Err(err) => Err(format!("invalid color `{color_str}`: {err}")),
        }
    }

    /// Returns the palette color for the `index`-th legend entry.
    ///
    /// The palette wraps around once exhausted.
    ///
    /// # Examples
    ///
    /// ```
    /// use pedigree_core::color::Color;
    ///
    /// assert_eq!(Color::from_palette(0), Color::from_palette(12));
    /// assert_ne!(Color::from_palette(0), Color::from_palette(1));
    /// ```
    pub fn from_palette(index: usize) -> Self {
        let hex = LEGEND_PALETTE[index % LEGEND_PALETTE.len()];
        match Self::new(hex) {
            Ok(color) => color,
            Err(err) => {
                warn!(index, color = hex, err:% = err; "Palette color rejected, using default");
                Self::default()
            }
        }
    }

    /// Returns the alpha (transparency) component of this color.
    pub fn alpha(&self) -> f32 {
        self.color.components[3]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new("black").expect("'black' is a valid CSS color")
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color)
    }
}
