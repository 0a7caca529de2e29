use fpid_core::{Descriptor, ExtractorConfig, FeatureSet, Image, Keypoint};
use fpid_desc::DescriptorGenerator;
use fpid_fast::{DetectorBuilder, FastDetector};
use crate::error::{ExtractError, ExtractResult};

/// Keypoint detector and descriptor generator behind one call.
///
/// Holds no per-image state, so a single extractor can be shared by every
/// worker of a gallery scan.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    fast_detector: FastDetector,
    descriptor_generator: DescriptorGenerator,
}

impl FeatureExtractor {
    pub fn new(cfg: ExtractorConfig) -> ExtractResult<Self> {
        Self::from_builder(DetectorBuilder::from_config(cfg))
    }

    pub fn from_builder(builder: DetectorBuilder) -> ExtractResult<Self> {
        Ok(Self {
            fast_detector: builder.build()?,
            descriptor_generator: DescriptorGenerator::new(),
        })
    }

    /// Detect keypoints and describe them.
    ///
    /// A zero-sized image is an error. An image with no usable corners, flat
    /// or smaller than the detector border, gives an empty set.
    pub fn extract(&self, img: &Image) -> ExtractResult<FeatureSet> {
        let (kps, desc) = self.detect_and_describe(img)?;
        Ok(FeatureSet::new(kps, desc)?)
    }

    pub fn detect_keypoints(&self, img: &Image) -> ExtractResult<Vec<Keypoint>> {
        if img.is_empty() {
            return Err(ExtractError::InvalidImage {
                width: img.width(),
                height: img.height(),
            });
        }
        Ok(self.fast_detector.detect_keypoints(img)?)
    }

    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> Vec<Descriptor> {
        self.descriptor_generator.generate_descriptors(img, kps)
    }

    pub fn detect_and_describe(&self, img: &Image) -> ExtractResult<(Vec<Keypoint>, Vec<Descriptor>)> {
        let kps = self.detect_keypoints(img)?;
        let desc = self.generate_descriptors(img, &kps);
        Ok((kps, desc))
    }

    pub fn config(&self) -> &ExtractorConfig {
        self.fast_detector.config()
    }
}
