//! Pipeline construction.
//!
//! The builder assembles the horizontal chain in a fixed order — format
//! conversion, destriding, horizontal resize, decorations, optional
//! trailing copy — then positions the pivot and configures the vertical
//! combination. Conversions always precede every RGB-layout-dependent
//! stage; decorations always follow every change of size.

use crate::chain::{Chain, PivotDesc};
use crate::combine::{Combine, HorizFlags, VerticalMode};
use crate::context::Capabilities;
use crate::format::{ChannelConv, ColorFormat, PaletteTable, RgbLayout};
use crate::foundation::error::{BlitError, BlitResult};
use crate::resample::ResampleParams;
use crate::rowops::blend::RowCombiner;
use crate::rowops::decorate::{TriadPattern, TriadPeriod};
use crate::rowops::upscale::{Interp, UpscaleFlavor};
use crate::stage::{Stage, StageKind};
use crate::target::TargetFormat;
use crate::vertical::{VertKind, VertStage};

/// Source framebuffer geometry. Strides are in bytes; `src_pixel_step` may
/// exceed the pixel size for stepped (interleaved) framebuffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceGeometry {
    pub dst_w: usize,
    pub dst_h: usize,
    pub src_w: usize,
    pub src_h: usize,
    /// Distance between the starts of consecutive source rows.
    pub src_row_stride: usize,
    /// Distance between consecutive pixels within a source row.
    pub src_pixel_step: usize,
}

impl SourceGeometry {
    fn validate(&self, src_bpp: usize) -> BlitResult<()> {
        if self.dst_w == 0 || self.dst_h == 0 || self.src_w == 0 || self.src_h == 0 {
            return Err(BlitError::geometry("zero source or destination extent"));
        }
        if self.src_pixel_step < src_bpp {
            return Err(BlitError::geometry(format!(
                "source pixel step {} below pixel size {src_bpp}",
                self.src_pixel_step
            )));
        }
        if self.src_row_stride == 0 {
            return Err(BlitError::geometry("source row stride must be > 0"));
        }
        Ok(())
    }

    /// Bytes spanned by one row of pixels.
    pub(crate) fn row_span(&self, src_bpp: usize) -> usize {
        (self.src_w - 1) * self.src_pixel_step + src_bpp
    }
}

/// What feeds the front of the chain.
pub(crate) enum SourceKind {
    Direct(ColorFormat),
    Indexed8(PaletteTable),
    Indexed16(PaletteTable),
    Indexed16Hw,
}

impl SourceKind {
    fn bpp(&self) -> usize {
        match self {
            Self::Direct(format) => format.bytes_per_pixel(),
            Self::Indexed8(_) => 1,
            Self::Indexed16(_) | Self::Indexed16Hw => 2,
        }
    }
}

pub(crate) struct Built {
    pub(crate) chain: Chain,
    pub(crate) vert: VertStage,
    pub(crate) src_row_span: usize,
}

struct Builder<'a> {
    target: &'a TargetFormat,
    geom: &'a SourceGeometry,
    combine: Combine,
    caps: Capabilities,
    chain: Chain,
    /// Pixel count, step and size entering the next stage.
    dx: usize,
    step: usize,
    bpp: usize,
}

pub(crate) fn build(
    target: &TargetFormat,
    geom: &SourceGeometry,
    source: SourceKind,
    combine: Combine,
    caps: Capabilities,
) -> BlitResult<Built> {
    target.validate()?;
    let src_bpp = source.bpp();
    geom.validate(src_bpp)?;
    let dbpp = target.bytes_per_pixel();
    if geom.dst_w * dbpp > target.bytes_per_scanline {
        return Err(BlitError::geometry(format!(
            "destination width {} exceeds the {}-byte scanline",
            geom.dst_w, target.bytes_per_scanline
        )));
    }

    let mut builder = Builder {
        target,
        geom,
        combine,
        caps,
        chain: Chain::new(),
        dx: geom.src_w,
        step: geom.src_pixel_step,
        bpp: src_bpp,
    };

    let engaged = combine
        .vertical
        .scale_factor()
        .is_some_and(|n| geom.dst_w == n * geom.src_w && geom.dst_h == n * geom.src_h);

    // The format at the pivot when the leading segment holds no conversion.
    let raw_format = match &source {
        SourceKind::Direct(format) => PivotFormat::Color(*format),
        SourceKind::Indexed8(_) => PivotFormat::Indices(1),
        SourceKind::Indexed16(_) => PivotFormat::Indices(2),
        SourceKind::Indexed16Hw => PivotFormat::Color(target.color),
    };

    builder.front(source)?;
    let conv_end = builder.chain.len();
    let pivot_input = PivotDesc {
        dx: builder.dx,
        step: builder.step,
        bpp: builder.bpp,
    };

    builder.make(engaged)?;
    let vert = builder.configure_vertical(engaged, conv_end, pivot_input, raw_format);
    builder.chain.realize(vert.pivot);

    tracing::debug!(
        stages = %builder
            .chain
            .stages()
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", "),
        vertical = %vert.name(),
        "pipeline built"
    );

    Ok(Built {
        chain: builder.chain,
        vert,
        src_row_span: geom.row_span(src_bpp),
    })
}

#[derive(Clone, Copy, Debug)]
enum PivotFormat {
    Color(ColorFormat),
    Indices(usize),
}

impl Builder<'_> {
    fn push(&mut self, kind: StageKind, out_dx: usize, out_bpp: usize) {
        let stage = Stage::new(kind, self.dx, self.step, self.bpp, out_dx, out_bpp);
        self.chain.push(stage);
        self.dx = out_dx;
        self.step = out_bpp;
        self.bpp = out_bpp;
    }

    fn push_same(&mut self, kind: StageKind) {
        self.push(kind, self.dx, self.bpp);
    }

    fn destride_if_stepped(&mut self) {
        if self.step != self.bpp {
            self.push_same(StageKind::Destride);
        }
    }

    /// Front of the chain: conversion to the destination format (or index
    /// resolution), plus destriding so downstream stages see tight rows.
    fn front(&mut self, source: SourceKind) -> BlitResult<()> {
        let dbpp = self.target.bytes_per_pixel();
        match source {
            SourceKind::Direct(src_format) => {
                if src_format == self.target.color {
                    self.destride_if_stepped();
                    return Ok(());
                }
                // Only RGB-family sources are convertible.
                let ColorFormat::Rgb(layout) = src_format else {
                    panic!("conversion from a non-RGB source is a contract violation");
                };
                self.convert_rgb(layout);
            }
            SourceKind::Indexed8(table) => {
                self.push(StageKind::Palette8 { table }, self.dx, dbpp);
            }
            SourceKind::Indexed16(table) => {
                self.push(StageKind::Palette16 { table }, self.dx, dbpp);
            }
            SourceKind::Indexed16Hw => match dbpp {
                1 => self.push(StageKind::Index16Narrow, self.dx, 1),
                2 => self.destride_if_stepped(),
                4 => self.push(StageKind::Index16Widen, self.dx, 4),
                other => {
                    return Err(BlitError::validation(format!(
                        "hardware palette indices cannot feed a {other}-byte destination"
                    )));
                }
            },
        }
        Ok(())
    }

    fn convert_rgb(&mut self, src: RgbLayout) {
        // preconversion of the 24/32-bit RGB-ordered layouts
        let layout = if src == RgbLayout::RGBA8888 {
            self.push(StageKind::Rgba8888ToBgra8888, self.dx, 4);
            RgbLayout::BGRA8888
        } else if src == RgbLayout::RGB888 {
            self.push(StageKind::Rgb888ToBgra8888, self.dx, 4);
            RgbLayout::BGRA8888
        } else if src == RgbLayout::BGR888 {
            self.push(StageKind::Bgr888ToBgra8888, self.dx, 4);
            RgbLayout::BGRA8888
        } else {
            src
        };

        if ColorFormat::Rgb(layout) == self.target.color {
            self.destride_if_stepped();
            return;
        }

        let dst = self.target.color;
        if layout == RgbLayout::BGRA8888 {
            match dst {
                ColorFormat::Rgb(l) if l == RgbLayout::BGR332 => {
                    self.destride_if_stepped();
                    self.push(StageKind::Bgra8888ToBgr332, self.dx, 1);
                }
                ColorFormat::Rgb(l) if l == RgbLayout::BGRA5551 => {
                    self.destride_if_stepped();
                    self.push(StageKind::Bgra8888ToBgra5551, self.dx, 2);
                }
                ColorFormat::Rgb(l) if l == RgbLayout::BGR565 => {
                    self.destride_if_stepped();
                    self.push(StageKind::Bgra8888ToBgr565, self.dx, 2);
                }
                ColorFormat::Yuy2 => {
                    self.push(StageKind::RgbToYuy2 { layout }, self.dx, 2);
                }
                ColorFormat::Rgb(l) => self.push_generic_rgb(layout, l),
            }
        } else if layout == RgbLayout::BGRA5551 {
            match dst {
                ColorFormat::Rgb(l) if l == RgbLayout::BGR332 => {
                    self.destride_if_stepped();
                    self.push(StageKind::Bgra5551ToBgr332, self.dx, 1);
                }
                ColorFormat::Rgb(l) if l == RgbLayout::BGR565 => {
                    self.destride_if_stepped();
                    self.push(StageKind::Bgra5551ToBgr565, self.dx, 2);
                }
                ColorFormat::Rgb(l) if l == RgbLayout::BGRA8888 => {
                    self.destride_if_stepped();
                    self.push(StageKind::Bgra5551ToBgra8888, self.dx, 4);
                }
                ColorFormat::Yuy2 => {
                    self.push(StageKind::RgbToYuy2 { layout }, self.dx, 2);
                }
                ColorFormat::Rgb(l) => self.push_generic_rgb(layout, l),
            }
        } else {
            match dst {
                ColorFormat::Yuy2 => self.push(StageKind::RgbToYuy2 { layout }, self.dx, 2),
                ColorFormat::Rgb(l) => self.push_generic_rgb(layout, l),
            }
        }
    }

    fn push_generic_rgb(&mut self, src: RgbLayout, dst: RgbLayout) {
        let conv = [
            ChannelConv::new(src.red, dst.red),
            ChannelConv::new(src.green, dst.green),
            ChannelConv::new(src.blue, dst.blue),
        ];
        self.push(StageKind::RgbToRgb { conv }, self.dx, usize::from(dst.bytes_per_pixel));
    }

    /// Horizontal resize, decorations, and the trailing copy heuristic.
    fn make(&mut self, engaged: bool) -> BlitResult<()> {
        let flags = self.combine.horizontal;
        let comb = RowCombiner::for_format(&self.target.color);
        let (src_w, dst_w) = (self.geom.src_w, self.geom.dst_w);

        // in x reduction the filter is applied before the resize
        if !engaged && flags.contains(HorizFlags::FILTER) && src_w > dst_w {
            self.push_same(StageKind::LowPass { comb });
        }

        if !engaged && dst_w != src_w {
            let params = ResampleParams::new(src_w as u32, dst_w as u32);
            if dst_w < src_w && flags.contains(HorizFlags::MEAN) {
                self.push(StageKind::MeanReduce { params, comb }, dst_w, self.bpp);
            } else if dst_w < src_w && flags.contains(HorizFlags::MAX) {
                self.push(StageKind::MaxReduce { params, comb }, dst_w, self.bpp);
            } else {
                self.push(StageKind::Stretch { params }, dst_w, self.bpp);
            }
        }

        // in x expansion the filter is applied after the resize
        if !engaged && flags.contains(HorizFlags::FILTER) && src_w <= dst_w {
            self.push_same(StageKind::LowPass { comb });
        }

        if engaged {
            // the vertical upscaler performs the resize; decorations sit in
            // the trailing segment and see final-width rows
            self.dx = dst_w;
        }

        if flags.intersects(HorizFlags::rgb_only()) {
            let ColorFormat::Rgb(layout) = self.target.color else {
                return Err(BlitError::validation(
                    "RGB decorations require an RGB destination layout",
                ));
            };
            self.decorations(flags, layout);
        }

        if flags.contains(HorizFlags::INTERLACE_FILTER) {
            self.push_same(StageKind::InterlaceFilter { comb });
        }
        if flags.contains(HorizFlags::SWAP_EVEN) {
            self.push_same(StageKind::SwapEven);
        }
        if flags.contains(HorizFlags::SWAP_ODD) {
            self.push_same(StageKind::SwapOdd);
        }

        // trailing copy stage; the direct upscalers write through their own
        // row buffers and never take one
        if !engaged {
            let need = self.chain.is_empty()
                || (self.combine.vertical.needs_rgb_rows()
                    && self.chain.last().is_some_and(Stage::is_conversion))
                || self
                    .chain
                    .last()
                    .is_some_and(|s| !s.is_fastwrite(&self.caps));
            if need {
                self.push_same(StageKind::Copy);
            }
        }

        Ok(())
    }

    fn decorations(&mut self, flags: HorizFlags, layout: RgbLayout) {
        let triad = |builder: &mut Self, period: TriadPeriod, strong: bool| {
            builder.push_same(StageKind::Triad {
                pattern: TriadPattern::new(&layout, period, strong),
                period: period.len(),
                strong,
            });
        };
        if flags.contains(HorizFlags::RGB_TRIAD16PIX) {
            triad(self, TriadPeriod::Px16, false);
        }
        if flags.contains(HorizFlags::RGB_TRIADSTRONG16PIX) {
            triad(self, TriadPeriod::Px16, true);
        }
        if flags.contains(HorizFlags::RGB_TRIAD6PIX) {
            triad(self, TriadPeriod::Px6, false);
        }
        if flags.contains(HorizFlags::RGB_TRIADSTRONG6PIX) {
            triad(self, TriadPeriod::Px6, true);
        }
        if flags.contains(HorizFlags::RGB_TRIAD3PIX) {
            triad(self, TriadPeriod::Px3, false);
        }
        if flags.contains(HorizFlags::RGB_TRIADSTRONG3PIX) {
            triad(self, TriadPeriod::Px3, true);
        }
        if flags.contains(HorizFlags::RGB_SCANDOUBLEHORZ) {
            self.push_same(StageKind::ScanHorz { period: 2, layout });
        }
        if flags.contains(HorizFlags::RGB_SCANTRIPLEHORZ) {
            self.push_same(StageKind::ScanHorz { period: 3, layout });
        }
        if flags.contains(HorizFlags::RGB_SCANDOUBLEVERT) {
            self.push_same(StageKind::ScanVert { period: 2, layout });
        }
        if flags.contains(HorizFlags::RGB_SCANTRIPLEVERT) {
            self.push_same(StageKind::ScanVert { period: 3, layout });
        }
    }

    fn configure_vertical(
        &self,
        engaged: bool,
        conv_end: usize,
        pivot_input: PivotDesc,
        raw_format: PivotFormat,
    ) -> VertStage {
        let y = self.combine.vertical;
        let y_eff = if y.scale_factor().is_some() && !engaged {
            // axis mismatch: the vertical special case degrades to the
            // generic resampler
            VerticalMode::None
        } else {
            y
        };
        let (sdy, ddy) = (self.geom.src_h, self.geom.dst_h);
        let params = ResampleParams::new(sdy as u32, ddy as u32);

        let (kind, pivot) = if engaged {
            let n = y.scale_factor().expect("engaged implies an upscaler");
            let flavor = match y {
                VerticalMode::Scale2x | VerticalMode::Scale3x | VerticalMode::Scale4x => {
                    UpscaleFlavor::Scale
                }
                VerticalMode::Lq2x | VerticalMode::Lq3x | VerticalMode::Lq4x => UpscaleFlavor::Lq,
                _ => UpscaleFlavor::Hq,
            };
            (VertKind::Upscale { n, flavor }, self.pivot_late(y_eff))
        } else if ddy > sdy {
            let kind = match y_eff {
                VerticalMode::Mean => VertKind::ExpandMean,
                VerticalMode::LowPass => VertKind::ExpandFilter,
                _ => VertKind::Expand,
            };
            (kind, self.pivot_late(y_eff))
        } else if ddy == sdy {
            let kind = match y_eff {
                VerticalMode::Mean => VertKind::ExpandMean,
                VerticalMode::LowPass => VertKind::ExpandFilter,
                _ => VertKind::Copy,
            };
            (kind, self.pivot_early(y_eff))
        } else {
            let kind = match y_eff {
                VerticalMode::Max => VertKind::ReduceMax,
                VerticalMode::Mean => VertKind::ReduceMean,
                VerticalMode::LowPass => VertKind::ReduceFilter,
                _ => VertKind::Reduce,
            };
            (kind, self.pivot_early(y_eff))
        };

        let pivot_desc = if engaged {
            pivot_input
        } else {
            debug_assert!(pivot < self.chain.len());
            let stage = &self.chain.stages()[pivot];
            PivotDesc {
                dx: stage.sdx,
                step: stage.sdp,
                bpp: stage.sbpp,
            }
        };

        let comb = if pivot >= conv_end {
            RowCombiner::for_format(&self.target.color)
        } else {
            match raw_format {
                PivotFormat::Color(format) => RowCombiner::for_format(&format),
                PivotFormat::Indices(bpp) => RowCombiner::bytes(bpp),
            }
        };

        VertStage {
            kind,
            sdy,
            ddy,
            sdw: self.geom.src_row_stride,
            params,
            pivot,
            pivot_desc,
            comb,
            interp: Interp::for_format(&self.target.color),
        }
    }

    /// Early pivot: immediately after the last conversion stage when the
    /// vertical combination needs RGB-comparable rows, else at the front.
    fn pivot_early(&self, y: VerticalMode) -> usize {
        if y.needs_rgb_rows() {
            let stages = self.chain.stages();
            let mut pivot = stages.len();
            while pivot > 0 && !stages[pivot - 1].is_conversion() {
                pivot -= 1;
            }
            pivot
        } else {
            0
        }
    }

    /// Late pivot: at (or just before) the end of the chain, stepping back
    /// over decorations so they run once per destination row.
    fn pivot_late(&self, y: VerticalMode) -> usize {
        let stages = self.chain.stages();
        let mut pivot = if y.writes_direct() {
            stages.len()
        } else {
            debug_assert!(!stages.is_empty(), "late pivot requires a trailing stage");
            stages.len() - 1
        };
        while pivot > 0 && stages[pivot - 1].is_decoration() {
            pivot -= 1;
        }
        pivot
    }
}
