//! Segment-test helpers over the 16-pixel Bresenham circle.
//!
//! Bit `i` of a circle mask is set when circle pixel `i` passed the
//! brighter/darker comparison against the centre pixel.

/// True when `mask` holds a circular run of at least `min_len` set bits.
pub fn has_contiguous_arc(mask: u16, min_len: u32) -> bool {
    if min_len == 0 || min_len > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    // After k rounds bit i survives only if bits i, i-1, .., i-k were all set
    let mut run = mask;
    for _ in 1..min_len {
        run &= run.rotate_left(1);
        if run == 0 {
            return false;
        }
    }
    run != 0
}
