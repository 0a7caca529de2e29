//! Multi-scale FAST keypoint detection.
//!
//! Corners are found with the FAST-9 segment test on every level of an image
//! pyramid, thinned by non-maximum suppression, refined to subpixel accuracy
//! and given an intensity-centroid orientation.

pub mod builder;
pub mod corner_detection;
pub mod detector;
pub mod error;
pub mod preprocessing;
pub mod pyramid;
pub mod refinement;
pub mod types;
pub mod utils;

pub use builder::DetectorBuilder;
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use types::{ScaleLevel, ScoredKeypoint};
