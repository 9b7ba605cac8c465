use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::image::Rgb;
use crate::transform::channel_sum;

/// The built-in palette used by colorize and floodfill.
pub const DEFAULT_COLORS: [Rgb; 10] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [0, 255, 255],
    [255, 0, 255],
    [255, 255, 0],
    [0, 200, 255],
    [128, 128, 255],
    [255, 128, 128],
    [128, 255, 128],
];

/// A small ordered set of colors.
///
/// A palette needs at least two entries for its bin width to be defined;
/// [`Palette::validate`] enforces that before any effect uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        let palette = Self { colors };
        palette.validate()?;
        Ok(palette)
    }

    pub fn validate(&self) -> Result<()> {
        if self.colors.len() < 2 {
            return Err(CoreError::InvalidParameter {
                effect: "palette",
                name: "colors",
                value: self.colors.len() as f64,
                reason: "a palette needs at least two colors",
            });
        }
        Ok(())
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Luminance bin width: `ceil(255 / (len - 1))`.
    ///
    /// Also the floodfill sensitivity, on the mean-of-channels (0..=255) scale.
    pub fn step(&self) -> u32 {
        let bins = self.colors.len().saturating_sub(1).max(1) as u32;
        255u32.div_ceil(bins)
    }

    /// Color for an average luminance in 0..=255. The bin index is
    /// `ceil(luma / step)`, clamped to the last entry.
    pub fn color_for_luma(&self, luma: u8) -> Rgb {
        self.color_for_sum(luma as u32 * 3)
    }

    /// Color for a pixel, binned on its exact channel average.
    pub fn color_for(&self, rgb: Rgb) -> Rgb {
        self.color_for_sum(channel_sum(rgb))
    }

    /// `ceil(sum / 3 / step)` computed as `ceil(sum / (3 * step))`.
    fn color_for_sum(&self, sum: u32) -> Rgb {
        let index = sum.div_ceil(3 * self.step()) as usize;
        self.colors[index.min(self.colors.len() - 1)]
    }

    /// A uniformly random entry.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Rgb {
        self.colors[rng.random_range(0..self.colors.len())]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
        }
    }
}
