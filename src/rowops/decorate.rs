//! Decorative stages: phosphor triads, scanline darkening, interlace blend.
//!
//! All decorations operate at final pixel width on an RGB destination
//! layout. Darkening halves (or quarters, for the strong variants) channel
//! values with a shift masked per channel, so no bit leaks across fields.

use crate::format::RgbLayout;
use crate::foundation::math::{px_read, px_write};

/// Per-column transform of a phosphor-triad pattern: the hot channel is
/// kept at full intensity, the rest are darkened.
#[derive(Clone, Debug)]
pub(crate) struct TriadPattern {
    /// `(keep_mask, dim_mask)` per column in the pattern period.
    columns: Vec<(u32, u32)>,
    shift: u32,
    bpp: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TriadPeriod {
    Px3,
    Px6,
    Px16,
}

impl TriadPeriod {
    pub(crate) fn len(self) -> usize {
        match self {
            Self::Px3 => 3,
            Self::Px6 => 6,
            Self::Px16 => 16,
        }
    }
}

impl TriadPattern {
    pub(crate) fn new(layout: &RgbLayout, period: TriadPeriod, strong: bool) -> Self {
        let shift = if strong { 2 } else { 1 };
        let [r, g, b] = layout.channels().map(|c| c.mask());
        let dim_all = layout.dim_mask(shift);
        let hot = |mask: u32| {
            // keep the hot channel, darken the other two
            (mask, dim_all & !((mask >> shift) & mask))
        };
        let columns = match period {
            TriadPeriod::Px3 => vec![hot(r), hot(g), hot(b)],
            TriadPeriod::Px6 => vec![hot(r), hot(r), hot(g), hot(g), hot(b), hot(b)],
            TriadPeriod::Px16 => {
                let mut cols = Vec::with_capacity(16);
                cols.extend(std::iter::repeat_n(hot(r), 5));
                cols.extend(std::iter::repeat_n(hot(g), 5));
                cols.extend(std::iter::repeat_n(hot(b), 5));
                // mask column between triads
                cols.push((0, dim_all));
                cols
            }
        };
        Self {
            columns,
            shift,
            bpp: usize::from(layout.bytes_per_pixel),
        }
    }

    pub(crate) fn apply_row(&self, dst: &mut [u8], src: &[u8], count: usize, step: usize) {
        let period = self.columns.len();
        for i in 0..count {
            let px = px_read(src, i, step, self.bpp);
            let (keep, dim) = self.columns[i % period];
            px_write(dst, i, self.bpp, (px & keep) | ((px >> self.shift) & dim));
        }
    }
}

/// Darken alternating pixel columns: period 2 halves every second column,
/// period 3 halves the second and quarters the third.
pub(crate) fn scanline_vert_row(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    step: usize,
    layout: &RgbLayout,
    period: usize,
) {
    let bpp = usize::from(layout.bytes_per_pixel);
    let dims = [layout.mask(), layout.dim_mask(1), layout.dim_mask(2)];
    for i in 0..count {
        let px = px_read(src, i, step, bpp);
        let level = (i % period) as u32;
        px_write(dst, i, bpp, (px >> level) & dims[level as usize]);
    }
}

/// Darken a whole row by `level` (0 = copy, 1 = half, 2 = quarter).
pub(crate) fn scanline_horz_row(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    step: usize,
    layout: &RgbLayout,
    level: u32,
) {
    let bpp = usize::from(layout.bytes_per_pixel);
    let dim = [layout.mask(), layout.dim_mask(1), layout.dim_mask(2)][level as usize];
    for i in 0..count {
        let px = px_read(src, i, step, bpp);
        px_write(dst, i, bpp, (px >> level) & dim);
    }
}
