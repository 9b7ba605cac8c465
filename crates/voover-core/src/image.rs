use crate::error::{CoreError, Result};

/// An (R, G, B) triple. Alpha lives only in [`ImageBuffer`] and is never
/// touched by effects.
pub type Rgb = [u8; 3];

/// An owned RGBA pixel buffer. 4 bytes per pixel, row-major.
///
/// Width and height are fixed for the lifetime of the buffer; effects only
/// ever rewrite the RGB bytes in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Create a new opaque black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Create from existing RGBA data.
    pub fn from_rgba_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(CoreError::BufferSize {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build an opaque image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb) -> Self {
        let mut image = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                image.set_rgb(x, y, f(x, y));
            }
        }
        image
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_rgba_vec(self) -> Vec<u8> {
        self.data
    }

    /// Get pixel RGBA at (x, y). Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let idx = self.offset(x, y);
        &self.data[idx..idx + 4]
    }

    /// Get mutable pixel RGBA at (x, y). Panics if out of bounds.
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let idx = self.offset(x, y);
        &mut self.data[idx..idx + 4]
    }

    pub fn rgb(&self, x: u32, y: u32) -> Rgb {
        let px = self.pixel(x, y);
        [px[0], px[1], px[2]]
    }

    /// Overwrite the color channels at (x, y), leaving alpha alone.
    pub fn set_rgb(&mut self, x: u32, y: u32, rgb: Rgb) {
        self.pixel_mut(x, y)[..3].copy_from_slice(&rgb);
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Mutable RGBA bytes of row `y`.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// All rows as mutable slices, for row-parallel processing.
    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Fails with `DimensionMismatch` unless this buffer still has the
    /// dimensions a run started with.
    pub fn check_dimensions(&self, expected: (u32, u32)) -> Result<()> {
        let actual = self.dimensions();
        if actual != expected || self.data.len() != self.pixel_count() * 4 {
            return Err(CoreError::DimensionMismatch { expected, actual });
        }
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_opaque_black() {
        let image = ImageBuffer::new(4, 3);
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.as_bytes().len(), 4 * 3 * 4);
        assert!(image.as_bytes().chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_pixel_access() {
        let mut image = ImageBuffer::new(4, 4);
        image.pixel_mut(2, 1).copy_from_slice(&[255, 128, 64, 10]);
        assert_eq!(image.pixel(2, 1), &[255, 128, 64, 10]);
        assert_eq!(image.rgb(2, 1), [255, 128, 64]);
    }

    #[test]
    fn test_set_rgb_preserves_alpha() {
        let mut image = ImageBuffer::from_rgba_vec(1, 1, vec![1, 2, 3, 77]).unwrap();
        image.set_rgb(0, 0, [9, 8, 7]);
        assert_eq!(image.pixel(0, 0), &[9, 8, 7, 77]);
    }

    #[test]
    fn test_from_rgba_vec_rejects_wrong_length() {
        let err = ImageBuffer::from_rgba_vec(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::BufferSize {
                width: 2,
                height: 2,
                len: 15
            }
        ));
    }

    #[test]
    fn test_from_fn_row_major() {
        let image = ImageBuffer::from_fn(3, 2, |x, y| [x as u8, y as u8, 0]);
        assert_eq!(image.rgb(2, 1), [2, 1, 0]);
        assert_eq!(&image.as_bytes()[4..8], &[1, 0, 0, 255]);
    }

    #[test]
    fn test_row_mut() {
        let mut image = ImageBuffer::new(2, 2);
        image.row_mut(1)[0] = 42;
        assert_eq!(image.pixel(0, 1)[0], 42);
        assert_eq!(image.pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_check_dimensions() {
        let image = ImageBuffer::new(5, 7);
        assert!(image.check_dimensions((5, 7)).is_ok());
        assert!(matches!(
            image.check_dimensions((7, 5)),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_pixel_out_of_bounds_panics() {
        let image = ImageBuffer::new(2, 2);
        let _ = image.pixel(2, 0);
    }
}
