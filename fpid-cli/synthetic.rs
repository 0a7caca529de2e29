//! Deterministic fingerprint-like images for demos, tests and benchmarks.

use fpid_core::Image;

const CELL: usize = 12;

/// Oriented ridge pattern with pores and ridge breaks.
///
/// `variant` changes ridge orientation, frequency and the placement of pores
/// and breaks, so different variants stand in for different fingers while the
/// same variant always renders the same pixels.
pub fn ridge_image(width: usize, height: usize, variant: u32) -> Image {
    let theta = variant as f32 * 0.9;
    let (sin_t, cos_t) = theta.sin_cos();
    let freq = 0.45 + 0.04 * (variant % 5) as f32;

    Image::from_fn(width, height, |x, y| {
        let (lx, ly) = (x % CELL, y % CELL);
        match cell_hash(x / CELL, y / CELL, variant) % 5 {
            0 if (4..8).contains(&lx) && (4..8).contains(&ly) => 250,
            0 if (2..10).contains(&lx) && (2..10).contains(&ly) => 15,
            1 => 60,
            _ => {
                let (fx, fy) = (x as f32, y as f32);
                let warp = (fx * 0.07).sin() + (fy * 0.05).cos();
                let phase = (fx * cos_t + fy * sin_t) * freq + warp * 1.5;
                (128.0 + 90.0 * phase.sin()) as u8
            }
        }
    })
}

fn cell_hash(cx: usize, cy: usize, variant: u32) -> u64 {
    let mut h = (cx as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ (cy as u64).wrapping_mul(0xc2b2_ae3d_27d4_eb4f)
        ^ (variant as u64).wrapping_mul(0x1656_67b1_9e37_79f9);
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h
}
