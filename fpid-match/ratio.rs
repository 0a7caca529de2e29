use crate::types::{GoodMatch, KnnMatch};

/// Keep matches whose nearest neighbour is clearly closer than the runner-up.
///
/// A pair passes when `nearest < ratio * second`. The comparison is strict and
/// multiplicative, so a second distance of zero never passes. Output keeps
/// the input order.
pub fn ratio_test(pairs: &[KnnMatch], ratio: f32) -> Vec<GoodMatch> {
    pairs
        .iter()
        .filter(|m| passes(m, ratio))
        .map(GoodMatch::from)
        .collect()
}

#[inline]
fn passes(m: &KnnMatch, ratio: f32) -> bool {
    m.nearest.distance < ratio * m.second.distance
}
