use fpid_core::Image;
use crate::types::ScoredKeypoint;
use crate::utils::has_contiguous_arc;
use rayon::prelude::*;

/// Pixels on the circle that must pass the segment test (FAST-9)
pub const ARC_LENGTH: u32 = 9;

/// Distance from the image edge inside which no corner is tested
pub const BORDER: usize = 3;

/// FAST-9 segment-test corner detection
pub struct CornerDetector;

impl CornerDetector {
    /// FAST circle offsets for corner detection
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Detect corners over the whole image, rows in parallel.
    ///
    /// Output is ordered row-major regardless of scheduling.
    pub fn detect(img: &Image, threshold: u8) -> Vec<ScoredKeypoint> {
        let (width, height) = img.dimensions();
        if width < 2 * BORDER + 1 || height < 2 * BORDER + 1 {
            return Vec::new();
        }

        (BORDER..height - BORDER)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in BORDER..width - BORDER {
                    if let Some(response) = Self::segment_test(img, x, y, threshold) {
                        row.push(ScoredKeypoint {
                            x: x as f32,
                            y: y as f32,
                            response,
                        });
                    }
                }
                row
            })
            .collect()
    }

    /// Run the segment test at `(x, y)`; returns the corner response when it passes.
    pub fn segment_test(img: &Image, x: usize, y: usize, threshold: u8) -> Option<f32> {
        let width = img.width();
        let pixels = img.pixels();
        let center = pixels[y * width + x] as i32;
        let t = threshold as i32;

        // Any 9-arc covers at least two of the four compass pixels
        let compass = [0usize, 4, 8, 12].iter().filter(|&&i| {
            let q = Self::circle_pixel(pixels, width, x, y, i);
            q > center + t || q < center - t
        });
        if compass.count() < 2 {
            return None;
        }

        let mut bright: u16 = 0;
        let mut dark: u16 = 0;
        for i in 0..16 {
            let q = Self::circle_pixel(pixels, width, x, y, i);
            if q > center + t {
                bright |= 1 << i;
            } else if q < center - t {
                dark |= 1 << i;
            }
        }

        if has_contiguous_arc(bright, ARC_LENGTH) || has_contiguous_arc(dark, ARC_LENGTH) {
            Some(Self::intensity_response(pixels, width, x, y, center, t))
        } else {
            None
        }
    }

    #[inline]
    fn circle_pixel(pixels: &[u8], width: usize, x: usize, y: usize, i: usize) -> i32 {
        let (dx, dy) = Self::FAST_OFFSETS[i];
        let px = (x as i32 + dx) as usize;
        let py = (y as i32 + dy) as usize;
        pixels[py * width + px] as i32
    }

    /// Mean squared contrast of the circle pixels that clear the threshold
    fn intensity_response(pixels: &[u8], width: usize, x: usize, y: usize, center: i32, t: i32) -> f32 {
        let mut sum_diff = 0.0f32;
        let mut count = 0;

        for i in 0..16 {
            let diff = (Self::circle_pixel(pixels, width, x, y, i) - center).abs();
            if diff > t {
                sum_diff += (diff * diff) as f32;
                count += 1;
            }
        }

        if count > 0 {
            sum_diff / count as f32
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_square_image(width: usize, height: usize) -> Image {
        let mut img = Image::filled(width, height, 50);
        let (cx, cy) = (width / 2, height / 2);
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                img.pixels_mut()[y * width + x] = 255;
            }
        }
        img
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let img = Image::filled(20, 20, 128);
        assert!(CornerDetector::detect(&img, 20).is_empty());
    }

    #[test]
    fn test_square_corners_detected() {
        let img = create_square_image(20, 20);
        let corners = CornerDetector::detect(&img, 20);
        assert!(!corners.is_empty());
        for c in &corners {
            assert!(c.response > 0.0 && c.response.is_finite());
        }
    }

    #[test]
    fn test_tiny_image_is_skipped() {
        let img = Image::filled(6, 6, 0);
        assert!(CornerDetector::detect(&img, 20).is_empty());
    }

    #[test]
    fn test_output_is_row_major() {
        let img = create_square_image(40, 40);
        let corners = CornerDetector::detect(&img, 20);
        for pair in corners.windows(2) {
            assert!((pair[0].y, pair[0].x) < (pair[1].y, pair[1].x));
        }
    }

    #[test]
    fn test_threshold_controls_detection() {
        let img = create_square_image(20, 20);
        assert!(CornerDetector::detect(&img, 127).len() <= CornerDetector::detect(&img, 20).len());
    }
}
