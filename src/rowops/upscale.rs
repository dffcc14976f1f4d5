//! Edge-aware integer upscaler kernels.
//!
//! Each kernel maps one source row (with its previous and next neighbors)
//! to N output rows of N× width. The per-pixel rule is the scale-N edge
//! decision: a corner copies its diagonal neighbor only when the
//! perpendicular neighbors differ, so uniform neighborhoods reproduce
//! unchanged and an isolated pixel becomes an N×N block. The lq/hq
//! flavors soften the copied corner by blending it with the center pixel
//! (50/50 for lq, 3:1 toward the neighbor for hq).
//!
//! Rows are tightly packed and of equal pixel count; the horizontal border
//! clamps to the edge pixel.

use crate::format::{Channel, ColorFormat};
use crate::foundation::math::{px_read, px_write};

/// How a triggered edge corner is filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UpscaleFlavor {
    /// Copy the neighbor (scale2x/3x/4x).
    Scale,
    /// Blend neighbor and center 50/50 (lq family).
    Lq,
    /// Blend 3:1 toward the neighbor (hq family).
    Hq,
}

/// Channel-aware pixel interpolation for the blending flavors.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Interp {
    channels: Option<[Channel; 3]>,
    bpp: usize,
}

impl Interp {
    pub(crate) fn for_format(format: &ColorFormat) -> Self {
        match format {
            ColorFormat::Rgb(layout) => Self {
                channels: Some(layout.channels()),
                bpp: usize::from(layout.bytes_per_pixel),
            },
            ColorFormat::Yuy2 => Self {
                channels: None,
                bpp: 2,
            },
        }
    }

    pub(crate) fn bpp(&self) -> usize {
        self.bpp
    }

    fn mix(&self, a: u32, wa: u32, b: u32, wb: u32) -> u32 {
        let total = wa + wb;
        match self.channels {
            Some(channels) => {
                let mut out = 0;
                for c in channels {
                    let v = (c.extract(a) * wa + c.extract(b) * wb) / total;
                    out |= c.pack(v);
                }
                out
            }
            None => {
                let mut out = 0;
                for byte in 0..self.bpp {
                    let sh = 8 * byte as u32;
                    let v = (((a >> sh) & 0xFF) * wa + ((b >> sh) & 0xFF) * wb) / total;
                    out |= v << sh;
                }
                out
            }
        }
    }

    fn corner(&self, flavor: UpscaleFlavor, neighbor: u32, center: u32) -> u32 {
        match flavor {
            UpscaleFlavor::Scale => neighbor,
            UpscaleFlavor::Lq => self.mix(neighbor, 1, center, 1),
            UpscaleFlavor::Hq => self.mix(neighbor, 3, center, 1),
        }
    }
}

/// Produce two 2×-wide rows from a source row and its vertical neighbors.
#[allow(clippy::too_many_arguments)]
pub(crate) fn scale2x_rows(
    dst0: &mut [u8],
    dst1: &mut [u8],
    prev: &[u8],
    cur: &[u8],
    next: &[u8],
    count: usize,
    flavor: UpscaleFlavor,
    interp: &Interp,
) {
    let bpp = interp.bpp;
    for i in 0..count {
        let left = i.saturating_sub(1);
        let right = (i + 1).min(count - 1);
        let b = px_read(prev, i, bpp, bpp);
        let d = px_read(cur, left, bpp, bpp);
        let e = px_read(cur, i, bpp, bpp);
        let f = px_read(cur, right, bpp, bpp);
        let h = px_read(next, i, bpp, bpp);

        let (e0, e1, e2, e3) = if b != h && d != f {
            (
                if d == b { interp.corner(flavor, d, e) } else { e },
                if b == f { interp.corner(flavor, f, e) } else { e },
                if d == h { interp.corner(flavor, d, e) } else { e },
                if h == f { interp.corner(flavor, f, e) } else { e },
            )
        } else {
            (e, e, e, e)
        };

        px_write(dst0, 2 * i, bpp, e0);
        px_write(dst0, 2 * i + 1, bpp, e1);
        px_write(dst1, 2 * i, bpp, e2);
        px_write(dst1, 2 * i + 1, bpp, e3);
    }
}

/// Produce three 3×-wide rows from a source row and its vertical neighbors.
#[allow(clippy::too_many_arguments)]
pub(crate) fn scale3x_rows(
    dst0: &mut [u8],
    dst1: &mut [u8],
    dst2: &mut [u8],
    prev: &[u8],
    cur: &[u8],
    next: &[u8],
    count: usize,
    flavor: UpscaleFlavor,
    interp: &Interp,
) {
    let bpp = interp.bpp;
    for i in 0..count {
        let left = i.saturating_sub(1);
        let right = (i + 1).min(count - 1);
        let a = px_read(prev, left, bpp, bpp);
        let b = px_read(prev, i, bpp, bpp);
        let c = px_read(prev, right, bpp, bpp);
        let d = px_read(cur, left, bpp, bpp);
        let e = px_read(cur, i, bpp, bpp);
        let f = px_read(cur, right, bpp, bpp);
        let g = px_read(next, left, bpp, bpp);
        let h = px_read(next, i, bpp, bpp);
        let ii = px_read(next, right, bpp, bpp);

        let mut out = [e; 9];
        if b != h && d != f {
            let corner = |n: u32| interp.corner(flavor, n, e);
            if d == b {
                out[0] = corner(d);
            }
            if (d == b && e != c) || (b == f && e != a) {
                out[1] = corner(b);
            }
            if b == f {
                out[2] = corner(f);
            }
            if (d == b && e != g) || (d == h && e != a) {
                out[3] = corner(d);
            }
            if (b == f && e != ii) || (h == f && e != c) {
                out[5] = corner(f);
            }
            if d == h {
                out[6] = corner(d);
            }
            if (d == h && e != ii) || (h == f && e != g) {
                out[7] = corner(h);
            }
            if h == f {
                out[8] = corner(f);
            }
        }

        for k in 0..3 {
            px_write(dst0, 3 * i + k, bpp, out[k]);
            px_write(dst1, 3 * i + k, bpp, out[3 + k]);
            px_write(dst2, 3 * i + k, bpp, out[6 + k]);
        }
    }
}
