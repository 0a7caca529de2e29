use fpid_core::ExtractorConfig;
use crate::detector::FastDetector;
use crate::error::FastResult;

/// Fluent builder for a `FastDetector`
#[derive(Debug, Clone, Default)]
pub struct DetectorBuilder {
    config: ExtractorConfig,
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the FAST threshold (1-127)
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set the patch size for orientation and the base descriptor window
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.config.patch_size = patch_size;
        self
    }

    /// Set the number of pyramid levels and the scale step between them
    pub fn pyramid(mut self, n_levels: usize, scale_factor: f32) -> Self {
        self.config.n_levels = n_levels;
        self.config.scale_factor = scale_factor;
        self
    }

    pub fn max_keypoints(mut self, max_keypoints: usize) -> Self {
        self.config.max_keypoints = max_keypoints;
        self
    }

    /// Set the non-maximum suppression (NMS) distance
    pub fn nms_distance(mut self, distance: f32) -> Self {
        self.config.nms_distance = distance;
        self
    }

    /// Enable or disable subpixel refinement
    pub fn subpixel_refinement(mut self, enable: bool) -> Self {
        self.config.subpixel_refinement = enable;
        self
    }

    /// Enable or disable CLAHE preprocessing
    pub fn clahe_preprocessing(mut self, enable: bool) -> Self {
        self.config.clahe_preprocessing = enable;
        self
    }

    /// Apply the fast preset
    pub fn preset_fast(mut self) -> Self {
        self.config = ExtractorConfig::fast_preset();
        self
    }

    /// Apply the precision preset
    pub fn preset_precision(mut self) -> Self {
        self.config = ExtractorConfig::precision_preset();
        self
    }

    /// Build the detector, validating the accumulated settings
    pub fn build(self) -> FastResult<FastDetector> {
        FastDetector::new(self.config)
    }

    pub fn summary(&self) -> String {
        format!("DetectorBuilder: {}", self.config.summary())
    }

    /// Create a builder from an existing configuration
    pub fn from_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn to_config(self) -> ExtractorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FastError;

    #[test]
    fn test_builder_applies_settings() {
        let detector = DetectorBuilder::new()
            .threshold(25)
            .patch_size(21)
            .pyramid(2, 1.5)
            .max_keypoints(42)
            .nms_distance(4.0)
            .subpixel_refinement(false)
            .clahe_preprocessing(false)
            .build()
            .unwrap();

        let cfg = detector.config();
        assert_eq!(cfg.threshold, 25);
        assert_eq!(cfg.patch_size, 21);
        assert_eq!((cfg.n_levels, cfg.scale_factor), (2, 1.5));
        assert_eq!(cfg.max_keypoints, 42);
        assert!(!cfg.subpixel_refinement && !cfg.clahe_preprocessing);
    }

    #[test]
    fn test_builder_validates() {
        let result = DetectorBuilder::new().patch_size(8).build();
        assert!(matches!(result, Err(FastError::InvalidConfig(_))));
    }

    #[test]
    fn test_presets_round_trip_through_config() {
        let cfg = DetectorBuilder::new().preset_precision().to_config();
        assert_eq!(cfg, ExtractorConfig::precision_preset());
        let rebuilt = DetectorBuilder::from_config(cfg.clone()).build().unwrap();
        assert_eq!(rebuilt.config(), &cfg);
        assert!(DetectorBuilder::new().preset_fast().summary().contains("threshold=30"));
    }
}
