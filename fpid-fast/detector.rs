use fpid_core::{ExtractorConfig, Image, Keypoint};
use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::preprocessing::ImagePreprocessing;
use crate::pyramid::ImagePyramid;
use crate::refinement::KeypointRefinement;
use crate::types::{ScaleLevel, ScoredKeypoint};
use rayon::prelude::*;
use std::borrow::Cow;
use std::cmp::Ordering;

/// Multi-scale FAST detector.
///
/// The detector holds only its configuration, so one instance serves images
/// of any size and can be shared across threads.
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: ExtractorConfig,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: ExtractorConfig) -> FastResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Detect oriented keypoints in base-image coordinates.
    ///
    /// Zero-sized images are rejected. Images too small or too flat to hold a
    /// corner yield an empty list.
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let (width, height) = img.dimensions();
        if img.is_empty() {
            return Err(FastError::InvalidImageSize { width, height });
        }

        let processed: Cow<'_, Image> = if self.cfg.clahe_preprocessing {
            Cow::Owned(ImagePreprocessing::apply_clahe(img))
        } else {
            Cow::Borrowed(img)
        };

        let levels = ImagePyramid::generate_scale_levels(width, height, self.cfg.n_levels, self.cfg.scale_factor);
        let downsampled = ImagePyramid::build_levels(&processed, &levels);

        let per_level: Vec<Vec<Keypoint>> = levels
            .par_iter()
            .map(|level| {
                let level_img = match level.level {
                    0 => processed.as_ref(),
                    n => &downsampled[n - 1],
                };
                self.detect_at_level(level_img, level, (width, height))
            })
            .collect();

        let merged: Vec<Keypoint> = per_level.into_iter().flatten().collect();
        let mut keypoints = suppress_across_levels(merged, self.cfg.nms_distance);
        keypoints.sort_by(strongest_first);
        keypoints.truncate(self.cfg.max_keypoints);
        Ok(keypoints)
    }

    /// Raw segment-test corners of the base level, before suppression
    pub fn detect_corners(&self, img: &Image) -> FastResult<Vec<ScoredKeypoint>> {
        if img.is_empty() {
            return Err(FastError::InvalidImageSize {
                width: img.width(),
                height: img.height(),
            });
        }
        Ok(CornerDetector::detect(img, self.cfg.threshold))
    }

    /// Detect, suppress, refine and orient corners of one pyramid level
    fn detect_at_level(&self, img: &Image, level: &ScaleLevel, base: (usize, usize)) -> Vec<Keypoint> {
        let corners = CornerDetector::detect(img, self.cfg.threshold);
        let mut kept = KeypointRefinement::non_maximum_suppression(&corners, self.cfg.nms_distance);
        kept.truncate(self.cfg.max_keypoints);

        let x_ratio = base.0 as f32 / level.width as f32;
        let y_ratio = base.1 as f32 / level.height as f32;
        let size = self.cfg.patch_size as f32 * level.scale;

        kept.into_iter()
            .map(|corner| {
                let corner = if self.cfg.subpixel_refinement {
                    KeypointRefinement::refine_subpixel(img, corner)
                } else {
                    corner
                };
                let angle = KeypointRefinement::compute_orientation(img, corner.x, corner.y, self.cfg.patch_size);
                Keypoint {
                    x: corner.x * x_ratio,
                    y: corner.y * y_ratio,
                    angle,
                    size,
                    response: corner.response,
                }
            })
            .collect()
    }

    /// Get detector configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.cfg
    }
}

/// Non-maximum suppression in base-image coordinates, so a corner found on
/// several pyramid levels survives once
fn suppress_across_levels(keypoints: Vec<Keypoint>, min_distance: f32) -> Vec<Keypoint> {
    let scored: Vec<ScoredKeypoint> = keypoints
        .iter()
        .map(|kp| ScoredKeypoint {
            x: kp.x,
            y: kp.y,
            response: kp.response,
        })
        .collect();
    KeypointRefinement::suppression_order(&scored, min_distance)
        .into_iter()
        .map(|i| keypoints[i])
        .collect()
}

/// Descending response; ties broken by position then size for a stable order
fn strongest_first(a: &Keypoint, b: &Keypoint) -> Ordering {
    b.response
        .total_cmp(&a.response)
        .then(a.y.total_cmp(&b.y))
        .then(a.x.total_cmp(&b.x))
        .then(a.size.total_cmp(&b.size))
}
