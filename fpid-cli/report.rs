//! Turning a scan outcome into something a person can read or look at.

use fpid_core::{FeatureSet, Image, Keypoint};
use fpid_match::GoodMatch;
use crate::scan::{BestResult, ScanObserver, ScanState, SkippedEntry};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use tracing::info;

/// Final record of an identification run
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    /// Winning gallery label, `None` when nothing matched
    pub identity: Option<String>,
    /// Gallery index of the winner
    pub index: Option<usize>,
    pub score: f32,
    pub good_matches: Vec<GoodMatch>,
    pub probe: FeatureSet,
    pub candidate: Option<FeatureSet>,
}

impl Identification {
    pub fn no_match(probe: FeatureSet) -> Self {
        Self {
            identity: None,
            index: None,
            score: 0.0,
            good_matches: Vec::new(),
            probe,
            candidate: None,
        }
    }

    pub fn from_best(probe: FeatureSet, best: BestResult) -> Self {
        match best.into_inner() {
            Some(c) => Self {
                identity: Some(c.identity),
                index: Some(c.index),
                score: c.score,
                good_matches: c.good_matches,
                probe,
                candidate: Some(c.features),
            },
            None => Self::no_match(probe),
        }
    }

    pub fn is_match(&self) -> bool {
        self.identity.is_some()
    }
}

/// One-line human readable outcome
pub fn summary_line(ident: &Identification) -> String {
    match &ident.identity {
        Some(identity) => format!(
            "best match: {} (score {:.2}%, {} good matches)",
            identity,
            ident.score,
            ident.good_matches.len()
        ),
        None => "no match found in gallery".to_string(),
    }
}

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([255, 64, 64]),
    Rgb([64, 220, 64]),
    Rgb([64, 128, 255]),
    Rgb([255, 200, 0]),
    Rgb([220, 64, 220]),
    Rgb([0, 220, 220]),
];

/// Probe and candidate side by side with matched keypoints joined by lines.
///
/// Only matched keypoints are drawn. The canvas is upscaled by `scale`
/// (at least 1) at the end.
pub fn render_matches(probe_img: &Image, candidate_img: &Image, ident: &Identification, scale: u32) -> RgbImage {
    let offset = probe_img.width();
    let width = probe_img.width() + candidate_img.width();
    let height = probe_img.height().max(candidate_img.height());

    let mut canvas = RgbImage::new(width as u32, height as u32);
    blit_gray(&mut canvas, probe_img, 0);
    blit_gray(&mut canvas, candidate_img, offset);

    if let Some(candidate) = &ident.candidate {
        for (i, m) in ident.good_matches.iter().enumerate() {
            let (Some(p), Some(c)) = (ident.probe.keypoints().get(m.query_idx), candidate.keypoints().get(m.train_idx)) else {
                continue;
            };
            let color = PALETTE[i % PALETTE.len()];
            let from = (p.x, p.y);
            let to = (c.x + offset as f32, c.y);
            draw_line_segment_mut(&mut canvas, from, to, color);
            draw_keypoint(&mut canvas, p, 0.0, color);
            draw_keypoint(&mut canvas, c, offset as f32, color);
        }
    }

    let scale = scale.max(1);
    if scale == 1 {
        return canvas;
    }
    imageops::resize(&canvas, canvas.width() * scale, canvas.height() * scale, FilterType::Triangle)
}

fn blit_gray(canvas: &mut RgbImage, img: &Image, x_offset: usize) {
    for y in 0..img.height() {
        for x in 0..img.width() {
            let v = img.get(x, y);
            canvas.put_pixel((x + x_offset) as u32, y as u32, Rgb([v, v, v]));
        }
    }
}

fn draw_keypoint(canvas: &mut RgbImage, kp: &Keypoint, x_offset: f32, color: Rgb<u8>) {
    let center = ((kp.x + x_offset).round() as i32, kp.y.round() as i32);
    let radius = (kp.size / 4.0).round().max(2.0) as i32;
    draw_hollow_circle_mut(canvas, center, radius, color);
}

/// Logs scan progress every `interval` entries
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    interval: usize,
}

impl ProgressReporter {
    pub fn new(interval: usize) -> Self {
        Self { interval: interval.max(1) }
    }

    pub fn should_report(&self, visited: usize) -> bool {
        visited % self.interval == 0
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ScanObserver for ProgressReporter {
    fn on_state(&self, state: ScanState) {
        if state == ScanState::Scanning {
            info!("comparing probe against gallery");
        }
    }

    fn on_entry(&self, _index: usize, visited: usize, total: usize) {
        if self.should_report(visited) {
            info!("processed {}/{}", visited, total);
        }
    }

    fn on_skip(&self, entry: &SkippedEntry) {
        info!(index = entry.index, "excluded {} from the result", entry.identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::CandidateResult;

    fn set_with(points: &[(f32, f32)]) -> FeatureSet {
        let kps = points.iter().map(|&(x, y)| Keypoint::new(x, y)).collect();
        let descs = points.iter().map(|_| vec![0.0; 4]).collect();
        FeatureSet::new(kps, descs).unwrap()
    }

    fn sample_identification() -> Identification {
        let best = BestResult::none().offer(CandidateResult {
            index: 3,
            identity: "101__M_Left_thumb.BMP".into(),
            features: set_with(&[(4.0, 4.0), (10.0, 12.0)]),
            good_matches: vec![GoodMatch { query_idx: 0, train_idx: 1, distance: 0.1 }],
            score: 87.5,
        });
        Identification::from_best(set_with(&[(5.0, 6.0)]), best)
    }

    #[test]
    fn test_summary_lines() {
        let ident = sample_identification();
        assert!(ident.is_match());
        assert_eq!(summary_line(&ident), "best match: 101__M_Left_thumb.BMP (score 87.50%, 1 good matches)");
        assert_eq!(summary_line(&Identification::no_match(FeatureSet::empty())), "no match found in gallery");
    }

    #[test]
    fn test_sentinel_from_empty_best() {
        let ident = Identification::from_best(FeatureSet::empty(), BestResult::none());
        assert!(!ident.is_match());
        assert_eq!(ident.score, 0.0);
        assert!(ident.candidate.is_none());
    }

    #[test]
    fn test_render_dimensions_and_lines() {
        let ident = sample_identification();
        let probe = Image::filled(20, 16, 0);
        let candidate = Image::filled(24, 20, 0);

        let canvas = render_matches(&probe, &candidate, &ident, 1);
        assert_eq!(canvas.dimensions(), (44, 20));
        assert!(canvas.pixels().any(|p| *p == PALETTE[0]));

        let scaled = render_matches(&probe, &candidate, &ident, 2);
        assert_eq!(scaled.dimensions(), (88, 40));
    }

    #[test]
    fn test_render_without_candidate_draws_no_lines() {
        let ident = Identification::no_match(set_with(&[(5.0, 6.0)]));
        let canvas = render_matches(&Image::filled(8, 8, 50), &Image::filled(8, 8, 50), &ident, 1);
        assert!(canvas.pixels().all(|p| *p == Rgb([50, 50, 50])));
    }

    #[test]
    fn test_progress_interval() {
        let reporter = ProgressReporter::new(100);
        assert!(reporter.should_report(100));
        assert!(!reporter.should_report(150));
        assert!(ProgressReporter::new(0).should_report(1));
    }
}
