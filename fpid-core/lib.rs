//! Shared data model for fingerprint identification.
//!
//! Every stage of the pipeline (detection, description, matching, scanning)
//! speaks in terms of the types defined here.

pub mod config;

pub use config::{
    DescriptorMetric, ExtractorConfig, IdentifyConfig, MatchConfig, SearchStrategy,
    DEFAULT_RATIO_THRESHOLD, K_NEIGHBORS,
};

use thiserror::Error;

/// Number of elements in every descriptor produced within one run.
pub const DESCRIPTOR_LEN: usize = 128;

/// Errors raised when constructing core values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("image data length mismatch: expected {expected_len}, got {actual_len}")]
    ImageDataLength { expected_len: usize, actual_len: usize },
    #[error("feature set has {keypoints} keypoints but {descriptors} descriptors")]
    FeatureSetLength { keypoints: usize, descriptors: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Row-major 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Image {
    /// Wrap a row-major pixel buffer. The buffer must hold exactly `width * height` bytes.
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> CoreResult<Self> {
        let expected_len = width * height;
        if pixels.len() != expected_len {
            return Err(CoreError::ImageDataLength {
                expected_len,
                actual_len: pixels.len(),
            });
        }
        Ok(Self { width, height, pixels })
    }

    /// Image filled with a single intensity.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; width * height],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel, row by row.
    pub fn from_fn<F: FnMut(usize, usize) -> u8>(width: usize, height: usize, mut f: F) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
        Self { width, height, pixels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }
}

/// Key-point ≙ detected corner with subpixel position, orientation (radians) and region size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Diameter of the region summarised by the descriptor, in base-image pixels.
    pub size: f32,
    pub response: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            size: 0.0,
            response: 0.0,
        }
    }
}

/// Gradient-histogram descriptor, `DESCRIPTOR_LEN` floats
pub type Descriptor = Vec<f32>;

/// Keypoints of one image paired 1:1 with their descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> CoreResult<Self> {
        if keypoints.len() != descriptors.len() {
            return Err(CoreError::FeatureSetLength {
                keypoints: keypoints.len(),
                descriptors: descriptors.len(),
            });
        }
        Ok(Self { keypoints, descriptors })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Dimensionality of the first descriptor, `None` for an empty set.
    pub fn descriptor_dim(&self) -> Option<usize> {
        self.descriptors.first().map(Vec::len)
    }

    pub fn into_parts(self) -> (Vec<Keypoint>, Vec<Descriptor>) {
        (self.keypoints, self.descriptors)
    }
}

/// Initialize Rayon thread pool with the specified number of threads.
///
/// The global pool can only be built once per process; later calls return the
/// build error, which callers are free to ignore.
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
