//! Per-pixel transforms.
//!
//! Every function here maps one pixel's color channels to new ones and clamps
//! the result to 0..=255. None of them touch alpha. Apart from [`noise`], which
//! draws from the supplied RNG, they are pure functions of their inputs.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::image::Rgb;
use crate::palette::Palette;

/// Contrast factors must stay strictly inside this bound; the gain curve has a
/// pole at +259.
pub const CONTRAST_LIMIT: i32 = 259;

/// Brightness factors are scaled by this before being added to each channel.
pub const BRIGHTNESS_SCALE: f64 = 1.5;

pub const DEFAULT_SEPIA_DEPTH: i32 = 25;
pub const DEFAULT_NOISE_RATIO: f64 = 0.5;

/// A single color channel, for the per-channel shift transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
        }
    }
}

/// Round and clamp an intermediate value into a channel.
#[inline]
pub fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Widened so that no `i32` parameter can overflow before the clamp.
#[inline]
fn clamp_wide(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Sum of the three channels. Thresholds on the average compare against
/// this times three so fractional means are not rounded away.
#[inline]
pub fn channel_sum(rgb: Rgb) -> u32 {
    rgb[0] as u32 + rgb[1] as u32 + rgb[2] as u32
}

/// Average of the three channels, truncated. Used where the result is
/// itself a channel value.
#[inline]
pub fn mean(rgb: Rgb) -> u8 {
    (channel_sum(rgb) / 3) as u8
}

pub fn grey(rgb: Rgb) -> Rgb {
    let m = mean(rgb);
    [m, m, m]
}

/// White when the exact average is above 128, i.e. the sum is above 384.
pub fn black_white(rgb: Rgb) -> Rgb {
    if channel_sum(rgb) > 3 * 128 {
        [255, 255, 255]
    } else {
        [0, 0, 0]
    }
}

pub fn invert(rgb: Rgb) -> Rgb {
    [255 - rgb[0], 255 - rgb[1], 255 - rgb[2]]
}

/// Adds `factor * 1.5` to every channel.
pub fn brightness(rgb: Rgb, factor: i32) -> Rgb {
    let shift = factor as f64 * BRIGHTNESS_SCALE;
    rgb.map(|c| clamp_channel(c as f64 + shift))
}

/// Gain for a contrast factor: `259 (f + 255) / (255 (259 - f))`.
///
/// Precondition: `-259 < factor < 259`. At 259 the denominator is zero;
/// callers validate the factor before getting here (see
/// `Effect::validate`).
pub fn contrast_gain(factor: i32) -> f64 {
    debug_assert!(
        factor.abs() < CONTRAST_LIMIT,
        "contrast factor {factor} outside (-259, 259)"
    );
    let f = factor as f64;
    (259.0 * (f + 255.0)) / (255.0 * (259.0 - f))
}

/// Stretches (positive factor) or flattens (negative factor) every channel
/// around mid-grey. Same precondition as [`contrast_gain`].
pub fn contrast(rgb: Rgb, factor: i32) -> Rgb {
    let gain = contrast_gain(factor);
    rgb.map(|c| clamp_channel(gain * (c as f64 - 128.0) + 128.0))
}

/// Adds `factor` to one channel.
pub fn shift_channel(rgb: Rgb, channel: Channel, factor: i32) -> Rgb {
    let mut out = rgb;
    let i = channel.index();
    out[i] = clamp_wide(rgb[i] as i64 + factor as i64);
    out
}

/// Warm tint: `R = m + 2d`, `G = m + d`, `B = m` where `m` is the mean.
pub fn sepia(rgb: Rgb, depth: i32) -> Rgb {
    let m = mean(rgb) as i64;
    let d = depth as i64;
    [clamp_wide(m + 2 * d), clamp_wide(m + d), clamp_wide(m)]
}

/// Collapses red and green into their average, leaving blue as is.
pub fn blue_yellow(rgb: Rgb) -> Rgb {
    let m = ((rgb[0] as u16 + rgb[1] as u16) / 2) as u8;
    [m, m, rgb[2]]
}

/// Each channel moves by up to `ratio` of its own value, in a random
/// direction, with fresh randomness per channel.
pub fn noise<R: Rng>(rgb: Rgb, ratio: f64, rng: &mut R) -> Rgb {
    rgb.map(|c| {
        let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let c = c as f64;
        clamp_channel(c + c * ratio * rng.random::<f64>() * sign)
    })
}

/// Replaces the pixel with the palette entry for its luminance bin.
pub fn colorize(rgb: Rgb, palette: &Palette) -> Rgb {
    palette.color_for(rgb)
}
