//! Flood-fill region recoloring ("fake color").
//!
//! The image is split into 4-connected regions whose mean luminance stays
//! within half a palette step of the region's seed pixel. Each region gets
//! one randomly drawn palette color. Segmentation only ever reads the source
//! pixels; colors are written in a second pass once every region is known.

use rand::Rng;

use crate::error::Result;
use crate::image::{ImageBuffer, Rgb};
use crate::palette::Palette;
use crate::transform::channel_sum;

pub type RegionId = u32;

/// A resolved region: its fill color, the pixel it grew from and how many
/// pixels it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub color: Rgb,
    pub seed: (u32, u32),
    pub size: usize,
}

/// Per-pixel region assignment plus the region table it indexes into.
#[derive(Debug, Clone)]
pub struct RegionMap {
    width: u32,
    height: u32,
    labels: Vec<Option<RegionId>>,
    regions: Vec<Region>,
}

impl RegionMap {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: vec![None; width as usize * height as usize],
            regions: Vec::new(),
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Region owning (x, y), if segmentation reached it.
    pub fn region_at(&self, x: u32, y: u32) -> Option<RegionId> {
        self.labels[self.index(x, y)]
    }

    pub fn color_at(&self, x: u32, y: u32) -> Option<Rgb> {
        self.region_at(x, y)
            .map(|id| self.regions[id as usize].color)
    }

    /// Write every assigned pixel's region color into `image`, keeping alpha.
    pub fn paint(&self, image: &mut ImageBuffer) {
        for y in 0..self.height {
            for x in 0..self.width {
                if let Some(color) = self.color_at(x, y) {
                    image.set_rgb(x, y, color);
                }
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// `|mean_a - mean_b| < step / 2`, on channel sums so means keep their
/// fractional part.
#[inline]
fn same_tone(sum_a: i32, sum_b: i32, step: i32) -> bool {
    2 * (sum_a - sum_b).abs() < 3 * step
}

/// Partition `image` into regions without modifying it.
///
/// Pixels are visited column by column (x outer, y inner); `on_column` runs
/// after each column is finished and may abort the pass by returning an
/// error.
pub fn segment<R, F>(
    image: &ImageBuffer,
    palette: &Palette,
    rng: &mut R,
    mut on_column: F,
) -> Result<RegionMap>
where
    R: Rng,
    F: FnMut(u32) -> Result<()>,
{
    let (width, height) = image.dimensions();
    let step = palette.step() as i32;
    let mut map = RegionMap::new(width, height);
    let mut stack: Vec<(u32, u32)> = Vec::new();

    for x in 0..width {
        for y in 0..height {
            if map.region_at(x, y).is_some() {
                continue;
            }

            let id = map.regions.len() as RegionId;
            let seed_sum = channel_sum(image.rgb(x, y)) as i32;
            let mut size = 0usize;

            let seed_idx = map.index(x, y);
            map.labels[seed_idx] = Some(id);
            stack.clear();
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                size += 1;
                let mut visit = |nx: u32, ny: u32, map: &mut RegionMap| {
                    let idx = map.index(nx, ny);
                    if map.labels[idx].is_none()
                        && same_tone(seed_sum, channel_sum(image.rgb(nx, ny)) as i32, step)
                    {
                        map.labels[idx] = Some(id);
                        stack.push((nx, ny));
                    }
                };
                if cx > 0 {
                    visit(cx - 1, cy, &mut map);
                }
                if cx + 1 < width {
                    visit(cx + 1, cy, &mut map);
                }
                if cy > 0 {
                    visit(cx, cy - 1, &mut map);
                }
                if cy + 1 < height {
                    visit(cx, cy + 1, &mut map);
                }
            }

            map.regions.push(Region {
                color: palette.pick(rng),
                seed: (x, y),
                size,
            });
        }
        on_column(x)?;
    }

    Ok(map)
}

/// Segment `image` and repaint it with one palette color per region.
pub fn recolor<R, F>(
    image: &mut ImageBuffer,
    palette: &Palette,
    rng: &mut R,
    on_column: F,
) -> Result<RegionMap>
where
    R: Rng,
    F: FnMut(u32) -> Result<()>,
{
    let map = segment(image, palette, rng, on_column)?;
    log::debug!(
        "floodfill: {} regions over {}x{}",
        map.region_count(),
        image.width(),
        image.height()
    );
    map.paint(image);
    Ok(map)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::error::CoreError;

    fn no_progress(_: u32) -> Result<()> {
        Ok(())
    }

    #[test]
    fn test_uniform_image_is_one_region() {
        let mut image = ImageBuffer::from_fn(6, 4, |_, _| [40, 90, 200]);
        let mut rng = StdRng::seed_from_u64(11);
        let map = recolor(&mut image, &Palette::default(), &mut rng, no_progress).unwrap();

        assert_eq!(map.region_count(), 1);
        assert_eq!(map.regions()[0].size, 24);
        let fill = map.regions()[0].color;
        assert!(Palette::default().colors().contains(&fill));
        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(image.rgb(x, y), fill);
            }
        }
    }

    #[test]
    fn test_compares_against_seed_not_neighbor() {
        // Neighbors differ by 5, but 15 is too far from the seed at 0.
        let tones = [0u8, 5, 10, 15, 20];
        let image = ImageBuffer::from_fn(5, 1, |x, _| [tones[x as usize]; 3]);
        let mut rng = StdRng::seed_from_u64(0);
        let map = segment(&image, &Palette::default(), &mut rng, no_progress).unwrap();

        assert_eq!(map.region_count(), 2);
        assert_eq!(map.region_at(2, 0), Some(0));
        assert_eq!(map.region_at(3, 0), Some(1));
        assert_eq!(map.regions()[1].seed, (3, 0));
    }

    #[test]
    fn test_diagonal_pixels_are_not_connected() {
        let image = ImageBuffer::from_fn(2, 2, |x, y| if x == y { [255; 3] } else { [0; 3] });
        let mut rng = StdRng::seed_from_u64(0);
        let map = segment(&image, &Palette::default(), &mut rng, no_progress).unwrap();
        assert_eq!(map.region_count(), 4);
    }

    #[test]
    fn test_segment_leaves_source_untouched() {
        let image = ImageBuffer::from_fn(3, 3, |x, y| [(x * 80) as u8, (y * 80) as u8, 0]);
        let copy = image.clone();
        let mut rng = StdRng::seed_from_u64(2);
        segment(&image, &Palette::default(), &mut rng, no_progress).unwrap();
        assert_eq!(image, copy);
    }

    #[test]
    fn test_paint_preserves_alpha() {
        let mut image = ImageBuffer::from_rgba_vec(2, 1, vec![10, 10, 10, 7, 10, 10, 10, 200]).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        recolor(&mut image, &Palette::default(), &mut rng, no_progress).unwrap();
        assert_eq!(image.pixel(0, 0)[3], 7);
        assert_eq!(image.pixel(1, 0)[3], 200);
    }

    #[test]
    fn test_column_callback_once_per_column() {
        let image = ImageBuffer::new(7, 3);
        let mut rng = StdRng::seed_from_u64(0);
        let mut columns = Vec::new();
        segment(&image, &Palette::default(), &mut rng, |x| {
            columns.push(x);
            Ok(())
        })
        .unwrap();
        assert_eq!(columns, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_column_callback_can_abort() {
        let image = ImageBuffer::new(5, 5);
        let mut rng = StdRng::seed_from_u64(0);
        let result = segment(&image, &Palette::default(), &mut rng, |x| {
            if x == 1 { Err(CoreError::Cancelled) } else { Ok(()) }
        });
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }

    #[test]
    fn test_empty_image() {
        let mut image = ImageBuffer::new(0, 0);
        let mut rng = StdRng::seed_from_u64(0);
        let map = recolor(&mut image, &Palette::default(), &mut rng, no_progress).unwrap();
        assert_eq!(map.region_count(), 0);
    }

    #[test]
    fn test_large_region_does_not_overflow_stack() {
        let mut image = ImageBuffer::from_fn(400, 300, |_, _| [128; 3]);
        let mut rng = StdRng::seed_from_u64(9);
        let map = recolor(&mut image, &Palette::default(), &mut rng, no_progress).unwrap();
        assert_eq!(map.region_count(), 1);
        assert_eq!(map.regions()[0].size, 400 * 300);
    }
}
