//! The vertical compositor: consumes source rows through the chain's
//! leading segment, combines them, and emits destination rows through the
//! trailing segment.
//!
//! Expansion duplicates rows per the run accumulator; `mean` blends only
//! the first duplicate against the previous row, `low-pass` blends every
//! row against the previous row's pre-blend value, producing cascading
//! smoothing:
//!
//! ```text
//! src   copy  mean  low-pass
//! A     A     A     A
//!       A     A     A
//! B     B     A+B   A+B
//!       B     B     B
//! C     C     B+C   B+C
//! ```
//!
//! Reduction picks, maxes or means whole consumed groups; its low-pass
//! blends each group's first row with the retained last row of the
//! previous group. The integer upscalers run a sliding 3-row window (5 for
//! the 4x variants, which compose their 2x rule with a second scale2x
//! pass) over the leading segment's output.

use crate::arena::{RowArena, RowBuf};
use crate::chain::{Chain, PivotDesc};
use crate::resample::ResampleParams;
use crate::rowops::blend::RowCombiner;
use crate::rowops::upscale::{self, Interp, UpscaleFlavor};
use crate::target::RowTarget;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VertKind {
    /// 1:1 row copy.
    Copy,
    Expand,
    ExpandMean,
    ExpandFilter,
    Reduce,
    ReduceMax,
    ReduceMean,
    ReduceFilter,
    Upscale { n: usize, flavor: UpscaleFlavor },
}

/// Vertical combination state, configured once per pipeline build.
#[derive(Clone, Debug)]
pub(crate) struct VertStage {
    pub(crate) kind: VertKind,
    /// Source row count.
    pub(crate) sdy: usize,
    /// Destination row count.
    pub(crate) ddy: usize,
    /// Source row stride in bytes.
    pub(crate) sdw: usize,
    /// Row-run accumulator parameters.
    pub(crate) params: ResampleParams,
    /// Chain index separating the per-source-row segment from the
    /// per-destination-row segment.
    pub(crate) pivot: usize,
    /// Shape of the data crossing the pivot.
    pub(crate) pivot_desc: PivotDesc,
    /// Format-aware row blending at the pivot.
    pub(crate) comb: RowCombiner,
    /// Pixel interpolation for the blending upscalers.
    pub(crate) interp: Interp,
}

impl VertStage {
    /// Stable human-readable name of the vertical combination.
    pub(crate) fn name(&self) -> String {
        let one_to_one = self.sdy == self.ddy;
        match self.kind {
            VertKind::Copy => "vcopy".into(),
            VertKind::Expand => "vexpansion".into(),
            VertKind::ExpandMean if one_to_one => "vcopy mean".into(),
            VertKind::ExpandMean => "vexpansion mean".into(),
            VertKind::ExpandFilter if one_to_one => "vcopy lowpass".into(),
            VertKind::ExpandFilter => "vexpansion lowpass".into(),
            VertKind::Reduce => "vreduction".into(),
            VertKind::ReduceMax => "vreduction max".into(),
            VertKind::ReduceMean => "vreduction mean".into(),
            VertKind::ReduceFilter => "vreduction lowpass".into(),
            VertKind::Upscale { n, flavor } => {
                let family = match flavor {
                    UpscaleFlavor::Scale => "scale",
                    UpscaleFlavor::Lq => "lq",
                    UpscaleFlavor::Hq => "hq",
                };
                format!("{family}{n}x")
            }
        }
    }

    /// Execute one frame: consume `sdy` source rows from `src`, write
    /// `ddy` destination rows starting at `y0`. `out_bytes` is the byte
    /// width of one destination row at `x_off`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn drive(
        &self,
        chain: &mut Chain,
        arena: &mut RowArena,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
    ) {
        debug_assert_eq!(
            self.params.count() as usize,
            self.sdy.min(self.ddy),
            "run accumulator iterates over the smaller extent"
        );
        match self.kind {
            VertKind::Copy => self.drive_copy(chain, target, x_off, y0, src, out_bytes),
            VertKind::Expand => self.drive_expand(chain, arena, target, x_off, y0, src, out_bytes),
            VertKind::ExpandMean | VertKind::ExpandFilter => {
                self.drive_expand_blend(chain, arena, target, x_off, y0, src, out_bytes);
            }
            VertKind::Reduce => self.drive_reduce(chain, target, x_off, y0, src, out_bytes),
            VertKind::ReduceMax | VertKind::ReduceMean => {
                self.drive_reduce_blend(chain, arena, target, x_off, y0, src, out_bytes);
            }
            VertKind::ReduceFilter => {
                self.drive_reduce_filter(chain, arena, target, x_off, y0, src, out_bytes);
            }
            VertKind::Upscale { n: 4, flavor } => {
                self.drive_upscale4(chain, arena, target, x_off, y0, src, out_bytes, flavor);
            }
            VertKind::Upscale { n, flavor } => {
                self.drive_upscale(chain, arena, target, x_off, y0, src, out_bytes, n, flavor);
            }
        }
    }

    fn src_row<'a>(&self, src: &'a [u8], i: usize) -> &'a [u8] {
        &src[i * self.sdw..]
    }

    fn drive_copy(
        &self,
        chain: &mut Chain,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
    ) {
        let len = chain.len();
        debug_assert!(len > 0, "1:1 copy requires a non-empty chain");
        for i in 0..self.sdy {
            let line = target.line(y0 + i);
            let dst = &mut line[x_off..x_off + out_bytes];
            chain.run(0, len, dst, self.src_row(src, i));
        }
    }

    fn drive_expand(
        &self,
        chain: &mut Chain,
        arena: &mut RowArena,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
    ) {
        let len = chain.len();
        let mut buf = arena.acquire(self.pivot_desc.row_bytes());
        let mut runs = self.params.runs();
        let mut y = y0;
        for i in 0..self.sdy {
            let run = runs.next_run();
            chain.run_partial_into(0, self.pivot, &mut buf, self.src_row(src, i), self.pivot_desc);
            for _ in 0..run {
                let line = target.line(y);
                let dst = &mut line[x_off..x_off + out_bytes];
                chain.run_plain(self.pivot, len, dst, &buf);
                y += 1;
            }
        }
        arena.release(buf);
    }

    /// Expansion (and 1:1) with mean or low-pass blending. The mean effect
    /// applies only when a row is actually duplicated; low-pass always
    /// blends against the previous row's pre-blend value.
    fn drive_expand_blend(
        &self,
        chain: &mut Chain,
        arena: &mut RowArena,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
    ) {
        let len = chain.len();
        let row = self.pivot_desc.row_bytes();
        let mut prev = arena.acquire(row);
        let mut cur = arena.acquire(row);
        let mut have_prev = false;
        let mut runs = self.params.runs();
        let mut y = y0;

        for i in 0..self.sdy {
            let run = runs.next_run();
            chain.run_partial_into(0, self.pivot, &mut cur, self.src_row(src, i), self.pivot_desc);

            let keep_prev = match self.kind {
                VertKind::ExpandFilter => true,
                _ => run >= 2,
            };

            {
                let line = target.line(y);
                let dst = &mut line[x_off..x_off + out_bytes];
                if have_prev {
                    self.comb.mean_rows(&mut prev, &cur, self.pivot_desc.dx);
                    chain.run_plain(self.pivot, len, dst, &prev);
                } else {
                    chain.run_plain(self.pivot, len, dst, &cur);
                }
            }
            y += 1;

            for _ in 1..run {
                let line = target.line(y);
                let dst = &mut line[x_off..x_off + out_bytes];
                chain.run_plain(self.pivot, len, dst, &cur);
                y += 1;
            }

            if keep_prev {
                prev.swap_payload(&mut cur);
                have_prev = true;
            } else {
                have_prev = false;
            }
        }

        arena.release(cur);
        arena.release(prev);
    }

    fn drive_reduce(
        &self,
        chain: &mut Chain,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
    ) {
        let len = chain.len();
        let mut runs = self.params.runs();
        let mut at = 0usize;
        for k in 0..self.ddy {
            let run = runs.next_run() as usize;
            let line = target.line(y0 + k);
            let dst = &mut line[x_off..x_off + out_bytes];
            chain.run(0, len, dst, self.src_row(src, at));
            at += run;
        }
    }

    fn drive_reduce_blend(
        &self,
        chain: &mut Chain,
        arena: &mut RowArena,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
    ) {
        let len = chain.len();
        let row = self.pivot_desc.row_bytes();
        let mut acc = arena.acquire(row);
        let mut cur = arena.acquire(row);
        let mut runs = self.params.runs();
        let mut at = 0usize;

        for k in 0..self.ddy {
            let run = runs.next_run() as usize;
            let line = target.line(y0 + k);
            let dst = &mut line[x_off..x_off + out_bytes];

            if run == 1 {
                chain.run(0, len, dst, self.src_row(src, at));
            } else {
                chain.run_partial_into(
                    0,
                    self.pivot,
                    &mut acc,
                    self.src_row(src, at),
                    self.pivot_desc,
                );
                for j in 1..run {
                    chain.run_partial_into(
                        0,
                        self.pivot,
                        &mut cur,
                        self.src_row(src, at + j),
                        self.pivot_desc,
                    );
                    match self.kind {
                        VertKind::ReduceMax => self.comb.max_rows(&mut acc, &cur, self.pivot_desc.dx),
                        _ => self.comb.mean_rows(&mut acc, &cur, self.pivot_desc.dx),
                    }
                }
                chain.run_plain(self.pivot, len, dst, &acc);
            }
            at += run;
        }

        arena.release(cur);
        arena.release(acc);
    }

    /// Reduction low-pass: each output row blends its group's first row
    /// with the retained last row of the previous group.
    fn drive_reduce_filter(
        &self,
        chain: &mut Chain,
        arena: &mut RowArena,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
    ) {
        let len = chain.len();
        let row = self.pivot_desc.row_bytes();
        let mut saved = arena.acquire(row);
        let mut cur = arena.acquire(row);
        let mut have_saved = false;
        let mut runs = self.params.runs();
        let mut at = 0usize;

        for k in 0..self.ddy {
            let run = runs.next_run() as usize;
            chain.run_partial_into(
                0,
                self.pivot,
                &mut cur,
                self.src_row(src, at),
                self.pivot_desc,
            );
            {
                let line = target.line(y0 + k);
                let dst = &mut line[x_off..x_off + out_bytes];
                if have_saved {
                    self.comb.mean_rows(&mut saved, &cur, self.pivot_desc.dx);
                    chain.run_plain(self.pivot, len, dst, &saved);
                } else {
                    chain.run_plain(self.pivot, len, dst, &cur);
                    have_saved = true;
                }
            }
            if k + 1 < self.ddy {
                chain.run_partial_into(
                    0,
                    self.pivot,
                    &mut saved,
                    self.src_row(src, at + run - 1),
                    self.pivot_desc,
                );
            }
            at += run;
        }

        arena.release(cur);
        arena.release(saved);
    }

    /// Emit the `n` destination rows derived from one source row window.
    #[allow(clippy::too_many_arguments)]
    fn emit_scaled(
        &self,
        chain: &mut Chain,
        target: &mut dyn RowTarget,
        x_off: usize,
        y: usize,
        out_bytes: usize,
        finals: &mut [RowBuf],
        prev: &[u8],
        cur: &[u8],
        next: &[u8],
        flavor: UpscaleFlavor,
    ) {
        let dx = self.pivot_desc.dx;
        match finals.len() {
            2 => {
                let (f0, f1) = finals.split_at_mut(1);
                upscale::scale2x_rows(
                    &mut f0[0],
                    &mut f1[0],
                    prev,
                    cur,
                    next,
                    dx,
                    flavor,
                    &self.interp,
                );
            }
            3 => {
                let (f0, rest) = finals.split_at_mut(1);
                let (f1, f2) = rest.split_at_mut(1);
                upscale::scale3x_rows(
                    &mut f0[0],
                    &mut f1[0],
                    &mut f2[0],
                    prev,
                    cur,
                    next,
                    dx,
                    flavor,
                    &self.interp,
                );
            }
            _ => unreachable!("upscaler factor"),
        }

        let len = chain.len();
        for (r, final_row) in finals.iter().enumerate() {
            let line = target.line(y + r);
            let dst = &mut line[x_off..x_off + out_bytes];
            if self.pivot == len {
                dst.copy_from_slice(&final_row[..out_bytes]);
            } else {
                chain.run_plain(self.pivot, len, dst, final_row);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn drive_upscale(
        &self,
        chain: &mut Chain,
        arena: &mut RowArena,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
        n: usize,
        flavor: UpscaleFlavor,
    ) {
        let row = self.pivot_desc.row_bytes();
        let mut a = arena.acquire(row);
        let mut b = arena.acquire(row);
        let mut c = arena.acquire(row);
        let mut finals: Vec<RowBuf> = (0..n).map(|_| arena.acquire(n * row)).collect();
        let mut y = y0;

        chain.run_partial_into(0, self.pivot, &mut a, self.src_row(src, 0), self.pivot_desc);
        if self.sdy > 1 {
            chain.run_partial_into(0, self.pivot, &mut b, self.src_row(src, 1), self.pivot_desc);
        } else {
            b.copy_from_slice(&a);
        }

        // first row: the previous neighbor clamps to the row itself
        self.emit_scaled(
            chain, target, x_off, y, out_bytes, &mut finals, &a, &a, &b, flavor,
        );
        y += n;

        for i in 1..self.sdy {
            if i + 1 < self.sdy {
                chain.run_partial_into(
                    0,
                    self.pivot,
                    &mut c,
                    self.src_row(src, i + 1),
                    self.pivot_desc,
                );
                self.emit_scaled(
                    chain, target, x_off, y, out_bytes, &mut finals, &a, &b, &c, flavor,
                );
                a.swap_payload(&mut b);
                b.swap_payload(&mut c);
            } else {
                self.emit_scaled(
                    chain, target, x_off, y, out_bytes, &mut finals, &a, &b, &b, flavor,
                );
            }
            y += n;
        }

        while let Some(f) = finals.pop() {
            arena.release(f);
        }
        arena.release(c);
        arena.release(b);
        arena.release(a);
    }

    /// 4x upscaling: the 2x rule over a 5-row window, then a second
    /// scale2x pass over the intermediate rows.
    #[allow(clippy::too_many_arguments)]
    fn drive_upscale4(
        &self,
        chain: &mut Chain,
        arena: &mut RowArena,
        target: &mut dyn RowTarget,
        x_off: usize,
        y0: usize,
        src: &[u8],
        out_bytes: usize,
        flavor: UpscaleFlavor,
    ) {
        let dx = self.pivot_desc.dx;
        let row = self.pivot_desc.row_bytes();
        let len = chain.len();

        let mut p2 = arena.acquire(row);
        let mut p1 = arena.acquire(row);
        let mut cu = arena.acquire(row);
        let mut n1 = arena.acquire(row);
        let mut n2 = arena.acquire(row);
        let mut i0 = arena.acquire(2 * row);
        let mut i1 = arena.acquire(2 * row);
        let mut pm1 = arena.acquire(2 * row);
        let mut np0 = arena.acquire(2 * row);
        let mut t0 = arena.acquire(2 * row);
        let mut t1 = arena.acquire(2 * row);
        let mut f0 = arena.acquire(4 * row);
        let mut f1 = arena.acquire(4 * row);
        let mut f2 = arena.acquire(4 * row);
        let mut f3 = arena.acquire(4 * row);

        chain.run_partial_into(0, self.pivot, &mut cu, self.src_row(src, 0), self.pivot_desc);
        p2.copy_from_slice(&cu);
        p1.copy_from_slice(&cu);
        if self.sdy > 1 {
            chain.run_partial_into(0, self.pivot, &mut n1, self.src_row(src, 1), self.pivot_desc);
        } else {
            n1.copy_from_slice(&cu);
        }
        if self.sdy > 2 {
            chain.run_partial_into(0, self.pivot, &mut n2, self.src_row(src, 2), self.pivot_desc);
        } else {
            n2.copy_from_slice(&n1);
        }

        let mut y = y0;
        for i in 0..self.sdy {
            // first pass: intermediate 2x rows 2i-1 .. 2i+2
            upscale::scale2x_rows(&mut i0, &mut i1, &p1, &cu, &n1, dx, flavor, &self.interp);
            upscale::scale2x_rows(&mut t0, &mut pm1, &p2, &p1, &cu, dx, flavor, &self.interp);
            upscale::scale2x_rows(&mut np0, &mut t1, &cu, &n1, &n2, dx, flavor, &self.interp);

            // second pass: always the plain scale2x rule
            upscale::scale2x_rows(
                &mut f0,
                &mut f1,
                &pm1,
                &i0,
                &i1,
                2 * dx,
                UpscaleFlavor::Scale,
                &self.interp,
            );
            upscale::scale2x_rows(
                &mut f2,
                &mut f3,
                &i0,
                &i1,
                &np0,
                2 * dx,
                UpscaleFlavor::Scale,
                &self.interp,
            );

            for (r, final_row) in [&f0, &f1, &f2, &f3].into_iter().enumerate() {
                let line = target.line(y + r);
                let dst = &mut line[x_off..x_off + out_bytes];
                if self.pivot == len {
                    dst.copy_from_slice(&final_row[..out_bytes]);
                } else {
                    chain.run_plain(self.pivot, len, dst, final_row);
                }
            }
            y += 4;

            if i + 1 < self.sdy {
                p2.swap_payload(&mut p1);
                p1.swap_payload(&mut cu);
                cu.swap_payload(&mut n1);
                n1.swap_payload(&mut n2);
                if i + 3 < self.sdy {
                    chain.run_partial_into(
                        0,
                        self.pivot,
                        &mut n2,
                        self.src_row(src, i + 3),
                        self.pivot_desc,
                    );
                } else {
                    n2.copy_from_slice(&n1);
                }
            }
        }

        arena.release(f3);
        arena.release(f2);
        arena.release(f1);
        arena.release(f0);
        arena.release(t1);
        arena.release(t0);
        arena.release(np0);
        arena.release(pm1);
        arena.release(i1);
        arena.release(i0);
        arena.release(n2);
        arena.release(n1);
        arena.release(cu);
        arena.release(p1);
        arena.release(p2);
    }
}
