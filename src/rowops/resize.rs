//! Horizontal resize kernels: DDA stretch, group max/mean reduction, and
//! the 2-tap low-pass filter.

use crate::foundation::math::{px_read, px_write};
use crate::resample::ResampleParams;
use crate::rowops::blend::RowCombiner;

/// Resize a row by pixel duplication (expansion) or sub-sampling
/// (reduction), following the run accumulator.
pub(crate) fn stretch_row(
    dst: &mut [u8],
    src: &[u8],
    sdx: usize,
    ddx: usize,
    params: &ResampleParams,
    step: usize,
    bpp: usize,
) {
    let mut runs = params.runs();
    if ddx >= sdx {
        let mut out = 0;
        for i in 0..sdx {
            let px = px_read(src, i, step, bpp);
            for _ in 0..runs.next_run() {
                px_write(dst, out, bpp, px);
                out += 1;
            }
        }
    } else {
        let mut at = 0;
        for out in 0..ddx {
            px_write(dst, out, bpp, px_read(src, at, step, bpp));
            at += runs.next_run() as usize;
        }
    }
}

/// Reduce a row by the per-channel mean of each consumed pixel group.
pub(crate) fn mean_reduce_row(
    dst: &mut [u8],
    src: &[u8],
    ddx: usize,
    params: &ResampleParams,
    step: usize,
    comb: &RowCombiner,
) {
    let bpp = comb.bpp();
    let mut runs = params.runs();
    let mut at = 0;
    for out in 0..ddx {
        let run = runs.next_run() as usize;
        let mut acc = px_read(src, at, step, bpp);
        for k in 1..run {
            acc = comb.mean_px(acc, px_read(src, at + k, step, bpp));
        }
        px_write(dst, out, bpp, acc);
        at += run;
    }
}

/// Reduce a row by the per-channel maximum of each consumed pixel group.
pub(crate) fn max_reduce_row(
    dst: &mut [u8],
    src: &[u8],
    ddx: usize,
    params: &ResampleParams,
    step: usize,
    comb: &RowCombiner,
) {
    let bpp = comb.bpp();
    let mut runs = params.runs();
    let mut at = 0;
    for out in 0..ddx {
        let run = runs.next_run() as usize;
        let mut acc = px_read(src, at, step, bpp);
        for k in 1..run {
            acc = comb.max_px(acc, px_read(src, at + k, step, bpp));
        }
        px_write(dst, out, bpp, acc);
        at += run;
    }
}

/// 2-tap horizontal low-pass: each pixel is averaged with its left
/// neighbor; the first pixel passes through.
pub(crate) fn lowpass_row(
    dst: &mut [u8],
    src: &[u8],
    count: usize,
    step: usize,
    comb: &RowCombiner,
) {
    let bpp = comb.bpp();
    if count == 0 {
        return;
    }
    let mut prev = px_read(src, 0, step, bpp);
    px_write(dst, 0, bpp, prev);
    for i in 1..count {
        let cur = px_read(src, i, step, bpp);
        px_write(dst, i, bpp, comb.mean_px(prev, cur));
        prev = cur;
    }
}
