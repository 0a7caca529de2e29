use fpid_core::Image;

/// Tiles per image side used by CLAHE
pub const CLAHE_TILES: usize = 8;
/// Histogram clip limit, as a multiple of the mean bin height
pub const CLAHE_CLIP_LIMIT: f32 = 2.0;

/// Contrast normalisation applied before detection.
///
/// Fingerprint scans vary a lot in pressure and exposure; equalising locally
/// keeps the FAST threshold meaningful across the whole print.
pub struct ImagePreprocessing;

impl ImagePreprocessing {
    /// Apply CLAHE (Contrast Limited Adaptive Histogram Equalization)
    pub fn apply_clahe(img: &Image) -> Image {
        let (width, height) = img.dimensions();
        if img.is_empty() {
            return img.clone();
        }

        let tile_w = width.div_ceil(CLAHE_TILES.min(width));
        let tile_h = height.div_ceil(CLAHE_TILES.min(height));
        // Recount so no tile starts past the image edge
        let tiles_x = width.div_ceil(tile_w);
        let tiles_y = height.div_ceil(tile_h);

        let cdfs: Vec<[f32; 256]> = (0..tiles_y)
            .flat_map(|ty| (0..tiles_x).map(move |tx| (tx, ty)))
            .map(|(tx, ty)| {
                let histogram = Self::tile_histogram(img, tx * tile_w, ty * tile_h, tile_w, tile_h);
                Self::tile_cdf(&Self::clip_histogram(histogram, CLAHE_CLIP_LIMIT))
            })
            .collect();

        // Blend the four surrounding tile mappings so tile seams do not create corners
        Image::from_fn(width, height, |x, y| {
            let gx = ((x as f32 + 0.5) / tile_w as f32 - 0.5).clamp(0.0, (tiles_x - 1) as f32);
            let gy = ((y as f32 + 0.5) / tile_h as f32 - 0.5).clamp(0.0, (tiles_y - 1) as f32);
            let (tx0, ty0) = (gx.floor() as usize, gy.floor() as usize);
            let (tx1, ty1) = ((tx0 + 1).min(tiles_x - 1), (ty0 + 1).min(tiles_y - 1));
            let (fx, fy) = (gx - tx0 as f32, gy - ty0 as f32);

            let v = img.get(x, y) as usize;
            let m = |tx: usize, ty: usize| cdfs[ty * tiles_x + tx][v];
            let top = m(tx0, ty0) * (1.0 - fx) + m(tx1, ty0) * fx;
            let bottom = m(tx0, ty1) * (1.0 - fx) + m(tx1, ty1) * fx;
            (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
        })
    }

    fn tile_histogram(img: &Image, x0: usize, y0: usize, tile_w: usize, tile_h: usize) -> [u32; 256] {
        let mut histogram = [0u32; 256];
        let x1 = (x0 + tile_w).min(img.width());
        let y1 = (y0 + tile_h).min(img.height());
        for y in y0..y1 {
            for x in x0..x1 {
                histogram[img.get(x, y) as usize] += 1;
            }
        }
        histogram
    }

    /// Clip bins above `clip_limit` times the mean height and spread the excess uniformly
    fn clip_histogram(mut histogram: [u32; 256], clip_limit: f32) -> [u32; 256] {
        let total: u32 = histogram.iter().sum();
        let clip_threshold = ((total as f32 / 256.0) * clip_limit).max(1.0) as u32;

        let mut excess = 0u32;
        for count in histogram.iter_mut() {
            if *count > clip_threshold {
                excess += *count - clip_threshold;
                *count = clip_threshold;
            }
        }

        let redistribution = excess / 256;
        let remainder = (excess % 256) as usize;
        for (i, count) in histogram.iter_mut().enumerate() {
            *count += redistribution;
            if i < remainder {
                *count += 1;
            }
        }
        histogram
    }

    fn tile_cdf(histogram: &[u32; 256]) -> [f32; 256] {
        let total: u32 = histogram.iter().sum();
        let mut cdf = [0.0f32; 256];
        if total == 0 {
            return cdf;
        }
        let mut cumulative = 0u32;
        for (slot, &count) in cdf.iter_mut().zip(histogram.iter()) {
            cumulative += count;
            *slot = cumulative as f32 / total as f32 * 255.0;
        }
        cdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clahe_preserves_dimensions() {
        let img = Image::from_fn(50, 30, |x, y| ((x * 5 + y * 3) % 256) as u8);
        let out = ImagePreprocessing::apply_clahe(&img);
        assert_eq!(out.dimensions(), (50, 30));
    }

    #[test]
    fn test_clahe_keeps_uniform_image_uniform() {
        let img = Image::filled(40, 40, 100);
        let out = ImagePreprocessing::apply_clahe(&img);
        let first = out.pixels()[0];
        assert!(out.pixels().iter().all(|&p| p == first));
    }

    #[test]
    fn test_clahe_stretches_low_contrast() {
        // Values in 100..=110 should be spread over a wider range
        let img = Image::from_fn(64, 64, |x, y| 100 + ((x + y) % 11) as u8);
        let out = ImagePreprocessing::apply_clahe(&img);
        let min = *out.pixels().iter().min().unwrap();
        let max = *out.pixels().iter().max().unwrap();
        assert!(max - min > 10, "range {}..{}", min, max);
    }

    #[test]
    fn test_clahe_is_deterministic() {
        let img = Image::from_fn(33, 47, |x, y| ((x * x + y * 7) % 256) as u8);
        assert_eq!(ImagePreprocessing::apply_clahe(&img), ImagePreprocessing::apply_clahe(&img));
    }

    #[test]
    fn test_clahe_tiny_image() {
        let img = Image::from_fn(3, 2, |x, y| (x * 40 + y * 90) as u8);
        let out = ImagePreprocessing::apply_clahe(&img);
        assert_eq!(out.dimensions(), (3, 2));
    }
}
