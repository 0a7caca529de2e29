//! Descriptor matching for fingerprint identification.
//!
//! Pipeline for one probe/candidate pair:
//! 1. [`knn_match`] finds the two nearest candidate descriptors per probe descriptor
//! 2. [`ratio_test`] keeps the unambiguous correspondences
//! 3. [`similarity_score`] turns the survivor count into a percentage
//!
//! [`compare`] runs all three steps with a validated [`KnnMatcher`].

mod error;
mod kdtree;
mod knn;
mod ratio;
mod score;
mod types;

pub use error::{DescriptorSet, MatchError, MatchResult};
pub use knn::{knn_match, KnnMatcher};
pub use ratio::ratio_test;
pub use score::similarity_score;
pub use types::{GoodMatch, KnnMatch, Neighbor};

use fpid_core::FeatureSet;

/// Outcome of comparing one probe against one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub good_matches: Vec<GoodMatch>,
    pub score: f32,
}

/// Match, filter and score `candidate` against `probe`
pub fn compare(probe: &FeatureSet, candidate: &FeatureSet, matcher: &KnnMatcher) -> MatchResult<Comparison> {
    let pairs = matcher.knn_match(probe, candidate)?;
    let good_matches = ratio_test(&pairs, matcher.config().ratio_threshold);
    let score = similarity_score(good_matches.len(), probe.len(), candidate.len());
    Ok(Comparison { good_matches, score })
}
