//! Rotation-normalised gradient-histogram descriptors.
//!
//! Each keypoint's region is resampled on a 16x16 grid aligned with the
//! keypoint orientation. Gradients are accumulated into 4x4 cells of 8
//! orientation bins, giving `DESCRIPTOR_LEN` = 128 values, then normalised,
//! clipped at `CLIP` and renormalised so that contrast changes between
//! impressions of the same finger cancel out.

use fpid_core::{Descriptor, Image, Keypoint, DESCRIPTOR_LEN};
use rayon::prelude::*;
use std::f32::consts::PI;

const GRID: usize = 16;
const CELLS: usize = 4;
const BINS: usize = 8;
const CLIP: f32 = 0.2;
/// Region diameter used when a keypoint carries no size
const DEFAULT_SIZE: f32 = 15.0;

const _: () = assert!(CELLS * CELLS * BINS == DESCRIPTOR_LEN);

#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorGenerator;

impl DescriptorGenerator {
    pub fn new() -> Self {
        Self
    }

    /// One descriptor per keypoint, in keypoint order
    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> Vec<Descriptor> {
        if img.is_empty() {
            return vec![vec![0.0; DESCRIPTOR_LEN]; kps.len()];
        }
        kps.par_iter().map(|kp| self.describe(img, kp)).collect()
    }

    /// Descriptor of a single keypoint
    pub fn describe(&self, img: &Image, kp: &Keypoint) -> Descriptor {
        let size = if kp.size > 0.0 { kp.size } else { DEFAULT_SIZE };
        let radius = size / 2.0;
        let step = size / GRID as f32;
        let (s, c) = kp.angle.sin_cos();
        let sigma_sq2 = 2.0 * radius * radius;

        let mut hist = [0.0f32; DESCRIPTOR_LEN];

        for i in 0..GRID {
            let v = -radius + (i as f32 + 0.5) * step;
            for j in 0..GRID {
                let u = -radius + (j as f32 + 0.5) * step;

                // Sample position and unit axes of the keypoint frame in image space
                let px = kp.x + c * u - s * v;
                let py = kp.y + s * u + c * v;
                let gu = bilinear_sample(img, px + c * step, py + s * step)
                    - bilinear_sample(img, px - c * step, py - s * step);
                let gv = bilinear_sample(img, px - s * step, py + c * step)
                    - bilinear_sample(img, px + s * step, py - c * step);

                let magnitude = (gu * gu + gv * gv).sqrt();
                if magnitude == 0.0 {
                    continue;
                }
                let weight = (-(u * u + v * v) / sigma_sq2).exp();

                // Split the vote linearly between the two nearest orientation bins
                let bin_pos = (gv.atan2(gu) + PI) / (2.0 * PI) * BINS as f32 - 0.5;
                let lower = bin_pos.floor();
                let frac = bin_pos - lower;
                let b0 = (lower as i32).rem_euclid(BINS as i32) as usize;
                let b1 = (b0 + 1) % BINS;

                let cell = (i / (GRID / CELLS)) * CELLS + j / (GRID / CELLS);
                hist[cell * BINS + b0] += magnitude * weight * (1.0 - frac);
                hist[cell * BINS + b1] += magnitude * weight * frac;
            }
        }

        normalize(&mut hist);
        for value in hist.iter_mut() {
            *value = value.min(CLIP);
        }
        normalize(&mut hist);

        hist.to_vec()
    }
}

fn normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

/// Bilinear interpolation with coordinates clamped to the image
fn bilinear_sample(img: &Image, x: f32, y: f32) -> f32 {
    let (w, h) = img.dimensions();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let dx = x - x0 as f32;
    let dy = y - y0 as f32;

    let top = img.get(x0, y0) as f32 * (1.0 - dx) + img.get(x1, y0) as f32 * dx;
    let bottom = img.get(x0, y1) as f32 * (1.0 - dx) + img.get(x1, y1) as f32 * dx;
    top * (1.0 - dy) + bottom * dy
}
