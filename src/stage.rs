//! Horizontal transform stages.
//!
//! A stage is one composable per-row transform with its parameters and
//! dispatch resolved at build time. During a frame the descriptor is
//! read-only except for the small per-frame state some decorations carry
//! (row counters, the interlace history row), which the driver resets at
//! the start of every frame.

use crate::context::Capabilities;
use crate::format::{ChannelConv, PaletteTable, RgbLayout};
use crate::resample::ResampleParams;
use crate::rowops::blend::RowCombiner;
use crate::rowops::decorate::TriadPattern;
use crate::rowops::{convert, copy, decorate, resize};

/// What a stage does, with its build-time parameters.
#[derive(Clone, Debug)]
pub(crate) enum StageKind {
    /// Plain copy (also the trailing fast-write stage).
    Copy,
    /// Gather a stepped source into tight packing.
    Destride,
    /// Horizontal resize by run duplication / sub-sampling.
    Stretch { params: ResampleParams },
    /// Horizontal reduction by per-group mean.
    MeanReduce {
        params: ResampleParams,
        comb: RowCombiner,
    },
    /// Horizontal reduction by per-group maximum.
    MaxReduce {
        params: ResampleParams,
        comb: RowCombiner,
    },
    /// 2-tap horizontal low-pass.
    LowPass { comb: RowCombiner },
    /// 8-bit palette index expansion.
    Palette8 { table: PaletteTable },
    /// 16-bit palette index expansion.
    Palette16 { table: PaletteTable },
    /// Hardware-palette 16-bit indices truncated to an 8-bit destination.
    Index16Narrow,
    /// Hardware-palette 16-bit indices widened to a 32-bit destination.
    Index16Widen,
    Rgba8888ToBgra8888,
    Rgb888ToBgra8888,
    Bgr888ToBgra8888,
    Bgra8888ToBgr332,
    Bgra8888ToBgra5551,
    Bgra8888ToBgr565,
    Bgra5551ToBgr332,
    Bgra5551ToBgr565,
    Bgra5551ToBgra8888,
    /// Generic RGB conversion through channel shift/masks.
    RgbToRgb { conv: [ChannelConv; 3] },
    /// RGB to packed luma-chroma.
    RgbToYuy2 { layout: RgbLayout },
    /// Phosphor triad decoration.
    Triad {
        pattern: TriadPattern,
        period: usize,
        strong: bool,
    },
    /// Darken output rows cyclically (stateful across rows).
    ScanHorz { period: u32, layout: RgbLayout },
    /// Darken pixel columns cyclically.
    ScanVert { period: usize, layout: RgbLayout },
    SwapEven,
    SwapOdd,
    /// Blend each row with the previous output row (stateful).
    InterlaceFilter { comb: RowCombiner },
}

/// One realized stage of the horizontal chain.
#[derive(Clone, Debug)]
pub(crate) struct Stage {
    pub(crate) kind: StageKind,
    /// Source pixel count.
    pub(crate) sdx: usize,
    /// Source pixel step in bytes (may exceed `sbpp` for stepped access).
    pub(crate) sdp: usize,
    /// Source pixel size in bytes.
    pub(crate) sbpp: usize,
    /// Output pixel count.
    pub(crate) ddx: usize,
    /// Output pixel size in bytes.
    pub(crate) dbpp: usize,
    /// Dispatch resolved at build: tight sources skip the stepped gather.
    tight: bool,
    /// Inter-stage output row, realized by the builder.
    pub(crate) buffer: Option<Vec<u8>>,
    /// History row for the interlace filter.
    extra: Option<Vec<u8>>,
    /// Per-frame mutable state (row counter / history-valid flag).
    state: u32,
}

impl Stage {
    pub(crate) fn new(
        kind: StageKind,
        sdx: usize,
        sdp: usize,
        sbpp: usize,
        ddx: usize,
        dbpp: usize,
    ) -> Self {
        Self {
            kind,
            sdx,
            sdp,
            sbpp,
            ddx,
            dbpp,
            tight: sdp == sbpp,
            buffer: None,
            extra: None,
            state: 0,
        }
    }

    pub(crate) fn out_bytes(&self) -> usize {
        self.ddx * self.dbpp
    }

    pub(crate) fn realize_buffer(&mut self) {
        self.buffer = Some(vec![0; self.out_bytes()]);
    }

    pub(crate) fn realize_extra(&mut self) {
        if matches!(self.kind, StageKind::InterlaceFilter { .. }) {
            self.extra = Some(vec![0; self.out_bytes()]);
        }
    }

    pub(crate) fn reset_state(&mut self) {
        self.state = 0;
    }

    /// Stable human-readable stage name.
    pub(crate) fn name(&self) -> String {
        match &self.kind {
            StageKind::Copy => "hcopy".into(),
            StageKind::Destride => "rotation".into(),
            StageKind::Stretch { .. } => "hstretch".into(),
            StageKind::MeanReduce { .. } => "hmean".into(),
            StageKind::MaxReduce { .. } => "hmax".into(),
            StageKind::LowPass { .. } => "hfilter".into(),
            StageKind::Palette8 { .. } => format!("palette 8>{}", self.dbpp * 8),
            StageKind::Palette16 { .. } => format!("palette 16>{}", self.dbpp * 8),
            StageKind::Index16Narrow => "conv 16>8".into(),
            StageKind::Index16Widen => "conv 16>32".into(),
            StageKind::Rgba8888ToBgra8888 => "rgba 8888>bgra 8888".into(),
            StageKind::Rgb888ToBgra8888 => "rgb 888>bgra 8888".into(),
            StageKind::Bgr888ToBgra8888 => "bgr 888>bgra 8888".into(),
            StageKind::Bgra8888ToBgr332 => "bgra 8888>bgr 332".into(),
            StageKind::Bgra8888ToBgra5551 => "bgra 8888>bgra 5551".into(),
            StageKind::Bgra8888ToBgr565 => "bgra 8888>bgr 565".into(),
            StageKind::Bgra5551ToBgr332 => "bgra 5551>bgr 332".into(),
            StageKind::Bgra5551ToBgr565 => "bgra 5551>bgr 565".into(),
            StageKind::Bgra5551ToBgra8888 => "bgra 5551>bgra 8888".into(),
            StageKind::RgbToRgb { .. } => "rgb>rgb".into(),
            StageKind::RgbToYuy2 { .. } => "rgb>yuy2".into(),
            StageKind::Triad { period, strong, .. } => {
                if *strong {
                    format!("rgb strong {period}")
                } else {
                    format!("rgb {period}")
                }
            }
            StageKind::ScanHorz { period, .. } => format!("hscanline x{period}"),
            StageKind::ScanVert { period, .. } => format!("vscanline x{period}"),
            StageKind::SwapEven => "swap even".into(),
            StageKind::SwapOdd => "swap odd".into(),
            StageKind::InterlaceFilter { .. } => "vfilter".into(),
        }
    }

    /// Stages that change the color format. These must sit before any
    /// RGB-layout-dependent consumer.
    pub(crate) fn is_conversion(&self) -> bool {
        matches!(
            self.kind,
            StageKind::Palette8 { .. }
                | StageKind::Palette16 { .. }
                | StageKind::Index16Narrow
                | StageKind::Index16Widen
                | StageKind::Rgba8888ToBgra8888
                | StageKind::Rgb888ToBgra8888
                | StageKind::Bgr888ToBgra8888
                | StageKind::Bgra8888ToBgr332
                | StageKind::Bgra8888ToBgra5551
                | StageKind::Bgra8888ToBgr565
                | StageKind::Bgra5551ToBgr332
                | StageKind::Bgra5551ToBgr565
                | StageKind::Bgra5551ToBgra8888
                | StageKind::RgbToRgb { .. }
                | StageKind::RgbToYuy2 { .. }
        )
    }

    /// Stages that decorate the image. These must sit after any change of
    /// size.
    pub(crate) fn is_decoration(&self) -> bool {
        matches!(
            self.kind,
            StageKind::Triad { .. }
                | StageKind::ScanHorz { .. }
                | StageKind::ScanVert { .. }
                | StageKind::SwapEven
                | StageKind::SwapOdd
                | StageKind::InterlaceFilter { .. }
        )
    }

    /// Whether this stage writes with the widest register pattern under the
    /// given capability selection.
    pub(crate) fn is_fastwrite(&self, caps: &Capabilities) -> bool {
        if caps.write_combining {
            return true;
        }
        if caps.accel {
            let tight = self.tight;
            match self.kind {
                StageKind::Copy | StageKind::Destride => true,
                StageKind::SwapEven | StageKind::SwapOdd => true,
                StageKind::InterlaceFilter { .. } => true,
                StageKind::Triad { .. } => tight,
                StageKind::ScanHorz { .. } | StageKind::ScanVert { .. } => tight,
                StageKind::LowPass { .. } => tight,
                StageKind::Palette8 { .. } => self.dbpp == 2 && tight,
                StageKind::Palette16 { .. } => true,
                StageKind::Index16Narrow | StageKind::Index16Widen => true,
                StageKind::Bgra8888ToBgr332
                | StageKind::Bgra8888ToBgra5551
                | StageKind::Bgra8888ToBgr565
                | StageKind::Bgra5551ToBgr332
                | StageKind::Bgra5551ToBgr565
                | StageKind::Bgra5551ToBgra8888 => tight,
                StageKind::RgbToYuy2 { .. } => true,
                _ => false,
            }
        } else {
            !matches!(
                self.kind,
                StageKind::Stretch { .. } | StageKind::MeanReduce { .. } | StageKind::MaxReduce { .. }
            )
        }
    }

    /// Execute the stage: read `sdx` source pixels, write `ddx` tight
    /// output pixels. `force_tight` overrides the stepped dispatch when the
    /// caller feeds an already-gathered row.
    pub(crate) fn exec(&mut self, dst: &mut [u8], src: &[u8], force_tight: bool) {
        let step = if force_tight || self.tight {
            self.sbpp
        } else {
            self.sdp
        };
        let count = self.sdx;
        match &self.kind {
            StageKind::Copy | StageKind::Destride => {
                copy::copy_row(dst, src, count, step, self.sbpp);
            }
            StageKind::Stretch { params } => {
                resize::stretch_row(dst, src, count, self.ddx, params, step, self.sbpp);
            }
            StageKind::MeanReduce { params, comb } => {
                resize::mean_reduce_row(dst, src, self.ddx, params, step, comb);
            }
            StageKind::MaxReduce { params, comb } => {
                resize::max_reduce_row(dst, src, self.ddx, params, step, comb);
            }
            StageKind::LowPass { comb } => {
                resize::lowpass_row(dst, src, count, step, comb);
            }
            StageKind::Palette8 { table } => {
                copy::palette8_row(dst, src, count, step, self.dbpp, table);
            }
            StageKind::Palette16 { table } => {
                copy::palette16_row(dst, src, count, step, self.dbpp, table);
            }
            StageKind::Index16Narrow => copy::index16_narrow_row(dst, src, count, step),
            StageKind::Index16Widen => copy::index16_widen_row(dst, src, count, step),
            StageKind::Rgba8888ToBgra8888 => convert::rgba8888_to_bgra8888(dst, src, count, step),
            StageKind::Rgb888ToBgra8888 => convert::rgb888_to_bgra8888(dst, src, count, step),
            StageKind::Bgr888ToBgra8888 => convert::bgr888_to_bgra8888(dst, src, count, step),
            StageKind::Bgra8888ToBgr332 => convert::bgra8888_to_bgr332(dst, src, count, step),
            StageKind::Bgra8888ToBgra5551 => convert::bgra8888_to_bgra5551(dst, src, count, step),
            StageKind::Bgra8888ToBgr565 => convert::bgra8888_to_bgr565(dst, src, count, step),
            StageKind::Bgra5551ToBgr332 => convert::bgra5551_to_bgr332(dst, src, count, step),
            StageKind::Bgra5551ToBgr565 => convert::bgra5551_to_bgr565(dst, src, count, step),
            StageKind::Bgra5551ToBgra8888 => convert::bgra5551_to_bgra8888(dst, src, count, step),
            StageKind::RgbToRgb { conv } => {
                convert::rgb_to_rgb(dst, src, count, step, self.sbpp, self.dbpp, conv);
            }
            StageKind::RgbToYuy2 { layout } => {
                convert::rgb_to_yuy2(dst, src, count, step, layout);
            }
            StageKind::Triad { pattern, .. } => pattern.apply_row(dst, src, count, step),
            StageKind::ScanHorz { period, layout } => {
                let level = (self.state % period).min(2);
                decorate::scanline_horz_row(dst, src, count, step, layout, level);
                self.state = self.state.wrapping_add(1);
            }
            StageKind::ScanVert { period, layout } => {
                decorate::scanline_vert_row(dst, src, count, step, layout, *period);
            }
            StageKind::SwapEven => copy::swap_pairs_row(dst, src, count, step, self.sbpp, false),
            StageKind::SwapOdd => copy::swap_pairs_row(dst, src, count, step, self.sbpp, true),
            StageKind::InterlaceFilter { comb } => {
                let bpp = self.sbpp;
                let extra = self
                    .extra
                    .as_mut()
                    .expect("interlace filter extra buffer realized");
                if self.state == 0 {
                    copy::copy_row(dst, src, count, step, bpp);
                    extra[..count * bpp].copy_from_slice(&dst[..count * bpp]);
                } else {
                    use crate::foundation::math::{px_read, px_write};
                    for i in 0..count {
                        let cur = px_read(src, i, step, bpp);
                        let prev = px_read(extra, i, bpp, bpp);
                        px_write(extra, i, bpp, cur);
                        px_write(dst, i, bpp, comb.mean_px(cur, prev));
                    }
                }
                self.state = self.state.wrapping_add(1);
            }
        }
    }
}
