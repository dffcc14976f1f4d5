//! The horizontal stage chain and its row execution drivers.
//!
//! A chain runs in two segments around the pivot: `[0, pivot)` executes
//! once per consumed source row, `[pivot, len)` once per produced
//! destination row. Intermediate stages write into their own realized
//! buffers; the final stage of a segment writes into the caller's row.

use smallvec::SmallVec;

use crate::stage::Stage;

/// Upper bound on chain length; exceeding it is a builder bug.
const CHAIN_MAX: usize = 16;

/// Pivot-point data description used when the leading segment is empty:
/// pixel count, source step, pixel size.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PivotDesc {
    pub(crate) dx: usize,
    pub(crate) step: usize,
    pub(crate) bpp: usize,
}

impl PivotDesc {
    pub(crate) fn row_bytes(&self) -> usize {
        self.dx * self.bpp
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Chain {
    stages: SmallVec<[Stage; 8]>,
}

impl Chain {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, stage: Stage) {
        assert!(self.stages.len() < CHAIN_MAX, "stage chain overflow");
        self.stages.push(stage);
    }

    pub(crate) fn len(&self) -> usize {
        self.stages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub(crate) fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub(crate) fn last(&self) -> Option<&Stage> {
        self.stages.last()
    }

    /// Reset per-frame stage state. Called at the start of every drive.
    pub(crate) fn reset_states(&mut self) {
        for stage in &mut self.stages {
            stage.reset_state();
        }
    }

    /// Allocate inter-stage buffers. When the vertical combination sits in
    /// the middle of the chain (`pivot < len`) the final stage writes
    /// destination rows directly and needs no buffer; when the chain feeds
    /// the vertical combination (`pivot == len`) every stage buffers.
    pub(crate) fn realize(&mut self, pivot: usize) {
        let len = self.stages.len();
        for (i, stage) in self.stages.iter_mut().enumerate() {
            if pivot < len && i == len - 1 {
                stage.buffer = None;
            } else {
                stage.realize_buffer();
            }
            stage.realize_extra();
        }
    }

    /// Run `[from, to)` reading `src`, writing the final output to `dst`.
    pub(crate) fn run(&mut self, from: usize, to: usize, dst: &mut [u8], src: &[u8]) {
        self.run_inner(from, to, dst, src, false);
    }

    /// Like [`run`](Self::run), but the first stage reads `src` as tightly
    /// packed regardless of its configured step — used when a combination
    /// buffer replaces the stage's original input.
    pub(crate) fn run_plain(&mut self, from: usize, to: usize, dst: &mut [u8], src: &[u8]) {
        self.run_inner(from, to, dst, src, true);
    }

    /// Run the leading segment `[from, to)` into `out`. An empty segment
    /// gathers the raw source row into `out` using the pivot description.
    pub(crate) fn run_partial_into(
        &mut self,
        from: usize,
        to: usize,
        out: &mut [u8],
        src: &[u8],
        pivot: PivotDesc,
    ) {
        if from == to {
            crate::rowops::copy::copy_row(out, src, pivot.dx, pivot.step, pivot.bpp);
        } else {
            self.run_inner(from, to, out, src, false);
        }
    }

    fn run_inner(&mut self, from: usize, to: usize, dst: &mut [u8], src: &[u8], first_tight: bool) {
        debug_assert!(from < to && to <= self.stages.len());
        if to - from == 1 {
            self.stages[from].exec(dst, src, first_tight);
            return;
        }

        let mut buf = self.stages[from]
            .buffer
            .take()
            .expect("intermediate stage buffer realized");
        self.stages[from].exec(&mut buf, src, first_tight);
        self.stages[from].buffer = Some(buf);

        for i in from + 1..to {
            let prev = self.stages[i - 1]
                .buffer
                .take()
                .expect("intermediate stage buffer realized");
            if i == to - 1 {
                self.stages[i].exec(dst, &prev, false);
            } else {
                let mut buf = self.stages[i]
                    .buffer
                    .take()
                    .expect("intermediate stage buffer realized");
                self.stages[i].exec(&mut buf, &prev, false);
                self.stages[i].buffer = Some(buf);
            }
            self.stages[i - 1].buffer = Some(prev);
        }
    }
}
