use fpid_core::Image;
use crate::types::ScoredKeypoint;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Subpixel refinement, orientation and suppression of detected corners
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Refine a corner to subpixel accuracy with a quadratic fit of its 3x3 neighbourhood
    pub fn refine_subpixel(img: &Image, kp: ScoredKeypoint) -> ScoredKeypoint {
        let (width, height) = img.dimensions();
        let x = kp.x as usize;
        let y = kp.y as usize;

        if x < 1 || y < 1 || x + 1 >= width || y + 1 >= height {
            return kp;
        }

        let s = |dx: i32, dy: i32| img.get((x as i32 + dx) as usize, (y as i32 + dy) as usize) as f32;

        // Finite differences of f(x,y) = Ax² + By² + Cxy + Dx + Ey + F
        let dx = (s(1, 0) - s(-1, 0)) / 2.0;
        let dy = (s(0, 1) - s(0, -1)) / 2.0;
        let dxx = s(1, 0) - 2.0 * s(0, 0) + s(-1, 0);
        let dyy = s(0, 1) - 2.0 * s(0, 0) + s(0, -1);
        let dxy = (s(1, 1) - s(-1, 1) - s(1, -1) + s(-1, -1)) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        if det.abs() < 1e-6 {
            return kp;
        }

        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        ScoredKeypoint {
            x: kp.x + offset_x,
            y: kp.y + offset_y,
            response: kp.response,
        }
    }

    /// Intensity-centroid orientation over a circular patch of diameter `patch_size`.
    ///
    /// Samples outside the image are clamped to the nearest edge pixel.
    pub fn compute_orientation(img: &Image, x: f32, y: f32, patch_size: usize) -> f32 {
        let (width, height) = img.dimensions();
        let half = (patch_size / 2) as i32;
        let radius_sq = half * half;
        let (cx, cy) = (x.round() as i32, y.round() as i32);

        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let yy = (cy + dy).clamp(0, height as i32 - 1) as usize;
            for dx in -half..=half {
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let xx = (cx + dx).clamp(0, width as i32 - 1) as usize;
                let val = img.get(xx, yy) as i64;
                m10 += dx as i64 * val;
                m01 += dy as i64 * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Greedy non-maximum suppression: strongest first, drop anything closer
    /// than `min_distance` to an already accepted corner.
    ///
    /// Equal responses are ordered by (y, x) so the result does not depend on input order.
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], min_distance: f32) -> Vec<ScoredKeypoint> {
        Self::suppression_order(keypoints, min_distance)
            .into_iter()
            .map(|i| keypoints[i])
            .collect()
    }

    /// Indices of the corners kept by `non_maximum_suppression`, strongest first.
    ///
    /// Corners that compare equal keep their input order.
    pub fn suppression_order(keypoints: &[ScoredKeypoint], min_distance: f32) -> Vec<usize> {
        let mut order: Vec<usize> = (0..keypoints.len()).collect();
        order.sort_by(|&a, &b| Self::strongest_first(&keypoints[a], &keypoints[b]));

        if min_distance <= 0.0 {
            return order;
        }

        let cell = min_distance;
        let min_distance_sq = min_distance * min_distance;
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        let mut accepted: Vec<usize> = Vec::new();

        for idx in order {
            let candidate = keypoints[idx];
            let gx = (candidate.x / cell).floor() as i64;
            let gy = (candidate.y / cell).floor() as i64;

            let suppressed = (gy - 1..=gy + 1).any(|ny| {
                (gx - 1..=gx + 1).any(|nx| {
                    grid.get(&(nx, ny)).is_some_and(|ids| {
                        ids.iter().any(|&i| {
                            let dx = candidate.x - keypoints[i].x;
                            let dy = candidate.y - keypoints[i].y;
                            dx * dx + dy * dy < min_distance_sq
                        })
                    })
                })
            });

            if !suppressed {
                grid.entry((gx, gy)).or_default().push(idx);
                accepted.push(idx);
            }
        }

        accepted
    }

    /// Descending response, then row-major position
    pub fn strongest_first(a: &ScoredKeypoint, b: &ScoredKeypoint) -> Ordering {
        b.response
            .total_cmp(&a.response)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: f32, y: f32, response: f32) -> ScoredKeypoint {
        ScoredKeypoint { x, y, response }
    }

    #[test]
    fn test_nms_keeps_strongest() {
        let input = [kp(10.0, 10.0, 5.0), kp(11.0, 10.0, 9.0), kp(30.0, 30.0, 1.0)];
        let kept = KeypointRefinement::non_maximum_suppression(&input, 3.0);
        assert_eq!(kept, vec![kp(11.0, 10.0, 9.0), kp(30.0, 30.0, 1.0)]);
    }

    #[test]
    fn test_nms_minimum_spacing() {
        let input: Vec<_> = (0..100)
            .map(|i| kp((i % 10) as f32 * 2.0, (i / 10) as f32 * 2.0, (i * 7 % 13) as f32))
            .collect();
        let kept = KeypointRefinement::non_maximum_suppression(&input, 5.0);
        assert!(kept.len() < input.len());
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let dx = kept[i].x - kept[j].x;
                let dy = kept[i].y - kept[j].y;
                assert!((dx * dx + dy * dy).sqrt() >= 5.0);
            }
        }
    }

    #[test]
    fn test_nms_is_order_independent() {
        let mut input = vec![kp(1.0, 1.0, 2.0), kp(2.0, 1.0, 2.0), kp(8.0, 8.0, 2.0)];
        let first = KeypointRefinement::non_maximum_suppression(&input, 3.0);
        input.reverse();
        let second = KeypointRefinement::non_maximum_suppression(&input, 3.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_suppression_order_returns_input_indices() {
        let input = [kp(5.0, 5.0, 1.0), kp(5.0, 5.0, 1.0), kp(5.5, 5.0, 4.0), kp(20.0, 5.0, 1.0)];
        assert_eq!(KeypointRefinement::suppression_order(&input, 2.0), vec![2, 3]);
        // Exact duplicates keep input order when nothing is suppressed
        assert_eq!(KeypointRefinement::suppression_order(&input, 0.0), vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_orientation_points_towards_mass() {
        // Bright right half: centroid lies along +x
        let mut img = Image::filled(21, 21, 0);
        for y in 0..21 {
            for x in 11..21 {
                img.pixels_mut()[y * 21 + x] = 200;
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, 10.0, 10.0, 15);
        assert!(angle.abs() < 1e-3, "angle {}", angle);
    }

    #[test]
    fn test_orientation_at_border_is_finite() {
        let img = Image::filled(10, 10, 90);
        let angle = KeypointRefinement::compute_orientation(&img, 0.0, 9.0, 15);
        assert!(angle.is_finite());
    }

    #[test]
    fn test_subpixel_offset_is_bounded() {
        let mut img = Image::filled(9, 9, 10);
        img.pixels_mut()[4 * 9 + 4] = 200;
        img.pixels_mut()[4 * 9 + 5] = 150;
        let refined = KeypointRefinement::refine_subpixel(&img, kp(4.0, 4.0, 1.0));
        assert!((refined.x - 4.0).abs() <= 0.5);
        assert!((refined.y - 4.0).abs() <= 0.5);
    }
}
