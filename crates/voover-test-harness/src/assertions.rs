use voover_core::image::ImageBuffer;
use voover_core::pipeline::Progress;

/// Assert two images have the same width and height.
pub fn assert_same_dimensions(actual: &ImageBuffer, expected: &ImageBuffer) {
    assert_eq!(
        actual.dimensions(),
        expected.dimensions(),
        "image is {:?}, expected {:?}",
        actual.dimensions(),
        expected.dimensions()
    );
}

/// Assert every pixel is grey (R = G = B).
pub fn assert_greyscale(image: &ImageBuffer) {
    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b] = image.rgb(x, y);
            assert!(r == g && g == b, "pixel ({x}, {y}) = {:?} is not grey", [r, g, b]);
        }
    }
}

/// Assert every pixel in columns `x0..x1` shares one color, and return it.
pub fn assert_uniform_columns(image: &ImageBuffer, x0: u32, x1: u32) -> [u8; 3] {
    let expected = image.rgb(x0, 0);
    for y in 0..image.height() {
        for x in x0..x1 {
            assert_eq!(
                image.rgb(x, y),
                expected,
                "pixel ({x}, {y}) differs from ({x0}, 0)"
            );
        }
    }
    expected
}

/// Assert alpha is unchanged between two images of equal size.
pub fn assert_alpha_preserved(before: &ImageBuffer, after: &ImageBuffer) {
    assert_same_dimensions(after, before);
    for y in 0..before.height() {
        for x in 0..before.width() {
            assert_eq!(
                after.pixel(x, y)[3],
                before.pixel(x, y)[3],
                "alpha changed at ({x}, {y})"
            );
        }
    }
}

/// Assert progress events of one pass count 0, 1, .., total - 1 in order.
pub fn assert_progress_complete(events: &[Progress], total: u32) {
    let indices: Vec<u32> = events.iter().map(|p| p.index).collect();
    let expected: Vec<u32> = (0..total).collect();
    assert_eq!(indices, expected, "progress indices out of order or incomplete");
    assert!(
        events.iter().all(|p| p.total == total),
        "progress total doesn't match {total}"
    );
}
