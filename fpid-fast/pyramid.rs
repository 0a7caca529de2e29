use fpid_core::Image;
use crate::types::ScaleLevel;

/// Levels narrower or shorter than this are not built
pub const MIN_LEVEL_SIZE: usize = 32;

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Scale levels for an image of the given size.
    ///
    /// Level 0 is always present; deeper levels stop at `n_levels` or once a
    /// side would drop below `MIN_LEVEL_SIZE`.
    pub fn generate_scale_levels(width: usize, height: usize, n_levels: usize, scale_factor: f32) -> Vec<ScaleLevel> {
        let mut levels = vec![ScaleLevel {
            level: 0,
            scale: 1.0,
            width,
            height,
        }];

        let mut scale = 1.0f32;
        for level in 1..n_levels {
            scale *= scale_factor;
            let scaled_width = ((width as f32) / scale) as usize;
            let scaled_height = ((height as f32) / scale) as usize;
            if scaled_width < MIN_LEVEL_SIZE || scaled_height < MIN_LEVEL_SIZE {
                break;
            }
            levels.push(ScaleLevel {
                level,
                scale,
                width: scaled_width,
                height: scaled_height,
            });
        }

        levels
    }

    /// Downsampled copies of `img`, one per level after the base.
    ///
    /// The base level is not copied; callers use the source image for level 0.
    pub fn build_levels(img: &Image, scale_levels: &[ScaleLevel]) -> Vec<Image> {
        scale_levels
            .iter()
            .filter(|l| l.level > 0)
            .map(|l| Self::downsample(img, l.width, l.height))
            .collect()
    }

    /// Downsample image using bilinear interpolation
    pub fn downsample(img: &Image, target_width: usize, target_height: usize) -> Image {
        let (src_width, src_height) = img.dimensions();
        let x_ratio = src_width as f32 / target_width as f32;
        let y_ratio = src_height as f32 / target_height as f32;

        Image::from_fn(target_width, target_height, |x, y| {
            let value = Self::bilinear_sample(img, x as f32 * x_ratio, y as f32 * y_ratio);
            value.round().clamp(0.0, 255.0) as u8
        })
    }

    /// Sample image at fractional coordinates using bilinear interpolation
    pub fn bilinear_sample(img: &Image, x: f32, y: f32) -> f32 {
        let (width, height) = img.dimensions();
        let x = x.clamp(0.0, (width - 1) as f32);
        let y = y.clamp(0.0, (height - 1) as f32);

        let x1 = x.floor() as usize;
        let y1 = y.floor() as usize;
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let p11 = img.get(x1, y1) as f32;
        let p12 = img.get(x2, y1) as f32;
        let p21 = img.get(x1, y2) as f32;
        let p22 = img.get(x2, y2) as f32;

        let top = p11 * (1.0 - fx) + p12 * fx;
        let bottom = p21 * (1.0 - fx) + p22 * fx;

        top * (1.0 - fy) + bottom * fy
    }
}
