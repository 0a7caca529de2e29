use crate::{CoreError, CoreResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Neighbours retrieved per probe descriptor; the ratio test needs exactly two.
pub const K_NEIGHBORS: usize = 2;

/// Lowe ratio used to reject ambiguous matches. Lower is stricter.
pub const DEFAULT_RATIO_THRESHOLD: f32 = 0.7;

/// Keypoint detection and description settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExtractorConfig {
    /// FAST intensity threshold (1-127)
    pub threshold: u8,
    /// Side of the orientation patch and base descriptor window, odd
    pub patch_size: usize,
    /// Number of pyramid levels searched for keypoints
    pub n_levels: usize,
    /// Downscale ratio between consecutive pyramid levels
    pub scale_factor: f32,
    /// Strongest keypoints retained per image after suppression
    pub max_keypoints: usize,
    /// Minimum distance between keypoints kept by non-maximum suppression
    pub nms_distance: f32,
    pub subpixel_refinement: bool,
    /// Contrast-limited histogram equalisation before detection
    pub clahe_preprocessing: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 15,
            n_levels: 4,
            scale_factor: 1.2,
            max_keypoints: 500,
            nms_distance: 3.0,
            subpixel_refinement: true,
            clahe_preprocessing: true,
        }
    }
}

impl ExtractorConfig {
    /// Fewer, stronger keypoints on a single pyramid level
    pub fn fast_preset() -> Self {
        Self {
            threshold: 30,
            n_levels: 1,
            max_keypoints: 250,
            nms_distance: 5.0,
            subpixel_refinement: false,
            ..Self::default()
        }
    }

    /// More keypoints over a deeper pyramid, for low-contrast prints
    pub fn precision_preset() -> Self {
        Self {
            threshold: 12,
            n_levels: 6,
            max_keypoints: 1500,
            nms_distance: 2.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.threshold == 0 || self.threshold > 127 {
            return Err(CoreError::InvalidConfig(format!(
                "threshold {} must be 1-127",
                self.threshold
            )));
        }
        if self.patch_size % 2 == 0 || self.patch_size < 7 {
            return Err(CoreError::InvalidConfig(format!(
                "patch size {} must be odd and at least 7",
                self.patch_size
            )));
        }
        if self.n_levels == 0 {
            return Err(CoreError::InvalidConfig("n_levels must be at least 1".into()));
        }
        if !(self.scale_factor.is_finite() && self.scale_factor > 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "scale factor {} must be greater than 1",
                self.scale_factor
            )));
        }
        if self.max_keypoints == 0 {
            return Err(CoreError::InvalidConfig("max_keypoints must be at least 1".into()));
        }
        if !(self.nms_distance.is_finite() && self.nms_distance >= 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "nms distance {} must be finite and non-negative",
                self.nms_distance
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "threshold={}, patch_size={}, levels={}x{:.2}, max_keypoints={}, nms={:.1}, subpixel={}, clahe={}",
            self.threshold,
            self.patch_size,
            self.n_levels,
            self.scale_factor,
            self.max_keypoints,
            self.nms_distance,
            self.subpixel_refinement,
            self.clahe_preprocessing
        )
    }
}

/// Distance between two descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DescriptorMetric {
    #[default]
    Euclidean,
    Manhattan,
}

impl DescriptorMetric {
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DescriptorMetric::Euclidean => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            DescriptorMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }
}

/// Nearest-neighbour search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SearchStrategy {
    /// Compare every probe descriptor against every candidate descriptor
    #[default]
    Exact,
    /// Best-bin-first kd-tree search; `max_checks == 0` visits every leaf
    KdTree { leaf_size: usize, max_checks: usize },
}

impl SearchStrategy {
    pub fn kd_tree() -> Self {
        SearchStrategy::KdTree {
            leaf_size: 8,
            max_checks: 50,
        }
    }
}

/// Per-invocation matcher settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    pub ratio_threshold: f32,
    pub metric: DescriptorMetric,
    pub strategy: SearchStrategy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: DEFAULT_RATIO_THRESHOLD,
            metric: DescriptorMetric::default(),
            strategy: SearchStrategy::default(),
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.ratio_threshold.is_finite()
            && self.ratio_threshold > 0.0
            && self.ratio_threshold <= 1.0)
        {
            return Err(CoreError::InvalidConfig(format!(
                "ratio threshold {} must be in (0, 1]",
                self.ratio_threshold
            )));
        }
        if let SearchStrategy::KdTree { leaf_size, .. } = self.strategy {
            if leaf_size == 0 {
                return Err(CoreError::InvalidConfig("kd-tree leaf size must be at least 1".into()));
            }
        }
        Ok(())
    }
}

/// Complete identification run configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IdentifyConfig {
    /// Worker threads for the global pool
    pub n_threads: usize,
    /// Gallery entries between progress reports; cosmetic
    pub progress_interval: usize,
    pub extractor: ExtractorConfig,
    pub matcher: MatchConfig,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get().max(1),
            progress_interval: 100,
            extractor: ExtractorConfig::default(),
            matcher: MatchConfig::default(),
        }
    }
}

impl IdentifyConfig {
    pub fn validate(&self) -> CoreResult<()> {
        self.extractor.validate()?;
        self.matcher.validate()?;
        if self.n_threads == 0 {
            return Err(CoreError::InvalidConfig("n_threads must be at least 1".into()));
        }
        Ok(())
    }

    /// Load configuration from a `.json` or `.toml` file, chosen by extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }

    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
