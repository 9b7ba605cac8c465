use voover_core::effects::{Effect, EffectChain};
use voover_core::image::{ImageBuffer, Rgb};

/// Builder for synthetic test images with sensible defaults.
pub struct ImageBuilder {
    width: u32,
    height: u32,
    alpha: u8,
    fill: Fill,
}

enum Fill {
    Solid(Rgb),
    Split { left: Rgb, right: Rgb, at: u32 },
    Gradient,
    Pixels(Vec<Rgb>),
}

impl ImageBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: 255,
            fill: Fill::Solid([0, 0, 0]),
        }
    }

    pub fn solid(mut self, rgb: Rgb) -> Self {
        self.fill = Fill::Solid(rgb);
        self
    }

    /// Columns `0..at` get `left`, the rest `right`.
    pub fn split(mut self, left: Rgb, right: Rgb, at: u32) -> Self {
        self.fill = Fill::Split { left, right, at };
        self
    }

    /// Red ramps along x, green along y, blue stays mid-grey.
    pub fn gradient(mut self) -> Self {
        self.fill = Fill::Gradient;
        self
    }

    /// Explicit pixels in row-major order.
    pub fn pixels(mut self, pixels: &[Rgb]) -> Self {
        self.fill = Fill::Pixels(pixels.to_vec());
        self
    }

    pub fn alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn build(self) -> ImageBuffer {
        let (width, height) = (self.width, self.height);
        if let Fill::Pixels(pixels) = &self.fill {
            assert_eq!(
                pixels.len(),
                width as usize * height as usize,
                "pixel list doesn't match {width}x{height}"
            );
        }
        let mut image = ImageBuffer::from_fn(width, height, |x, y| match &self.fill {
            Fill::Solid(rgb) => *rgb,
            Fill::Split { left, right, at } => {
                if x < *at {
                    *left
                } else {
                    *right
                }
            }
            Fill::Gradient => [
                (x * 255 / width.max(2).saturating_sub(1)).min(255) as u8,
                (y * 255 / height.max(2).saturating_sub(1)).min(255) as u8,
                128,
            ],
            Fill::Pixels(pixels) => pixels[(y * width + x) as usize],
        });
        if self.alpha != 255 {
            for y in 0..height {
                for x in 0..width {
                    image.pixel_mut(x, y)[3] = self.alpha;
                }
            }
        }
        image
    }
}

/// Builder for effect chains, including placeholder entries.
#[derive(Default)]
pub struct ChainBuilder {
    chain: EffectChain,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effect(mut self, effect: Effect) -> Self {
        self.chain.push(effect);
        self
    }

    pub fn noop(mut self) -> Self {
        self.chain.push_noop();
        self
    }

    pub fn build(self) -> EffectChain {
        self.chain
    }
}
