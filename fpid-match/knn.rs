use fpid_core::{Descriptor, FeatureSet, MatchConfig, SearchStrategy, K_NEIGHBORS};
use crate::error::{DescriptorSet, MatchError, MatchResult};
use crate::kdtree::KdTree;
use crate::types::{KnnMatch, TopTwo};
use rayon::prelude::*;

/// k-NN matcher bound to one validated configuration
#[derive(Debug, Clone, Copy)]
pub struct KnnMatcher {
    config: MatchConfig,
}

impl KnnMatcher {
    pub fn new(config: MatchConfig) -> MatchResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn knn_match(&self, probe: &FeatureSet, candidate: &FeatureSet) -> MatchResult<Vec<KnnMatch>> {
        knn_match(probe.descriptors(), candidate.descriptors(), &self.config)
    }
}

/// Find the two nearest candidate descriptors for every probe descriptor.
///
/// Results come back in probe order, one per probe descriptor. A candidate
/// set with fewer than two descriptors cannot support the ratio test and
/// yields no matches at all.
pub fn knn_match(probe: &[Descriptor], candidate: &[Descriptor], config: &MatchConfig) -> MatchResult<Vec<KnnMatch>> {
    if probe.is_empty() || candidate.len() < K_NEIGHBORS {
        return Ok(Vec::new());
    }
    check_descriptors(probe, candidate)?;

    let metric = config.metric;
    let matches = match config.strategy {
        SearchStrategy::Exact => probe
            .par_iter()
            .enumerate()
            .filter_map(|(query_idx, query)| {
                let mut top = TopTwo::new();
                for (train_idx, train) in candidate.iter().enumerate() {
                    top.offer(train_idx, metric.distance(query, train));
                }
                top.into_match(query_idx)
            })
            .collect(),
        SearchStrategy::KdTree { leaf_size, max_checks } => {
            let tree = KdTree::build(candidate, leaf_size);
            probe
                .par_iter()
                .enumerate()
                .filter_map(|(query_idx, query)| tree.nearest_two(query, metric, max_checks).into_match(query_idx))
                .collect()
        }
    };

    Ok(matches)
}

/// All descriptors must share one dimensionality and hold finite values
fn check_descriptors(probe: &[Descriptor], candidate: &[Descriptor]) -> MatchResult<()> {
    let expected = probe[0].len();
    for (set, descriptors) in [(DescriptorSet::Probe, probe), (DescriptorSet::Candidate, candidate)] {
        for (index, d) in descriptors.iter().enumerate() {
            if d.len() != expected {
                return Err(MatchError::DimensionMismatch {
                    set,
                    index,
                    expected,
                    found: d.len(),
                });
            }
            if d.iter().any(|v| !v.is_finite()) {
                return Err(MatchError::NonFiniteDescriptor { set, index });
            }
        }
    }
    Ok(())
}
