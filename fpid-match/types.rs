/// One of the two closest candidate descriptors for a probe descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub train_idx: usize,
    pub distance: f32,
}

/// Nearest and second-nearest candidate descriptors for probe descriptor `query_idx`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnMatch {
    pub query_idx: usize,
    pub nearest: Neighbor,
    pub second: Neighbor,
}

/// A correspondence that survived the ratio test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoodMatch {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: f32,
}

impl From<&KnnMatch> for GoodMatch {
    fn from(m: &KnnMatch) -> Self {
        Self {
            query_idx: m.query_idx,
            train_idx: m.nearest.train_idx,
            distance: m.nearest.distance,
        }
    }
}

/// Running best and second-best neighbours; equal distances keep the earlier entry
#[derive(Debug, Clone, Copy)]
pub(crate) struct TopTwo {
    pub first: Option<Neighbor>,
    pub second: Option<Neighbor>,
}

impl TopTwo {
    pub fn new() -> Self {
        Self { first: None, second: None }
    }

    pub fn offer(&mut self, train_idx: usize, distance: f32) {
        let candidate = Neighbor { train_idx, distance };
        match self.first {
            Some(first) if distance < first.distance => {
                self.second = self.first;
                self.first = Some(candidate);
            }
            None => self.first = Some(candidate),
            Some(_) => match self.second {
                Some(second) if distance >= second.distance => {}
                _ => self.second = Some(candidate),
            },
        }
    }

    /// Distance a new point must beat to enter the top two
    pub fn worst(&self) -> f32 {
        self.second.map_or(f32::INFINITY, |n| n.distance)
    }

    pub fn into_match(self, query_idx: usize) -> Option<KnnMatch> {
        Some(KnnMatch {
            query_idx,
            nearest: self.first?,
            second: self.second?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_two_ordering() {
        let mut top = TopTwo::new();
        for (i, d) in [5.0, 3.0, 4.0, 1.0, 9.0].into_iter().enumerate() {
            top.offer(i, d);
        }
        let m = top.into_match(0).unwrap();
        assert_eq!(m.nearest, Neighbor { train_idx: 3, distance: 1.0 });
        assert_eq!(m.second, Neighbor { train_idx: 1, distance: 3.0 });
    }

    #[test]
    fn test_top_two_ties_keep_earliest() {
        let mut top = TopTwo::new();
        for i in 0..4 {
            top.offer(i, 2.0);
        }
        let m = top.into_match(7).unwrap();
        assert_eq!((m.nearest.train_idx, m.second.train_idx), (0, 1));
        assert_eq!(m.query_idx, 7);
    }

    #[test]
    fn test_single_neighbor_is_not_a_match() {
        let mut top = TopTwo::new();
        top.offer(0, 1.0);
        assert!(top.into_match(0).is_none());
    }
}
