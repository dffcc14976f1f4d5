//! The reusable pipeline object and the per-frame driver.
//!
//! `build_*` runs once per format or geometry change and assembles the
//! stage chain and vertical combination; `drive` replays the pipeline
//! against fresh pixel data, once per frame. A pipeline may be driven any
//! number of times, but never concurrently: both the pipeline and the
//! context are borrowed mutably for the duration of a frame.

use crate::builder::{self, SourceGeometry, SourceKind};
use crate::chain::Chain;
use crate::combine::Combine;
use crate::context::BlitContext;
use crate::format::{ColorFormat, Palette};
use crate::foundation::error::{BlitError, BlitResult};
use crate::target::{RowTarget, TargetFormat};
use crate::vertical::VertStage;

/// A prebuilt frame transform: source format and geometry to destination
/// format and geometry, with the requested combination effects.
pub struct Pipeline {
    chain: Chain,
    vert: VertStage,
    target: TargetFormat,
    dst_w: usize,
    src_w: usize,
    src_row_span: usize,
}

impl Pipeline {
    /// Build a pipeline for an already-decoded RGB (or YUY2, when equal to
    /// the destination) source framebuffer.
    #[tracing::instrument(skip_all, fields(src_w = geom.src_w, src_h = geom.src_h, dst_w = geom.dst_w, dst_h = geom.dst_h))]
    pub fn build_direct(
        ctx: &BlitContext,
        target: &TargetFormat,
        geom: &SourceGeometry,
        src_format: ColorFormat,
        combine: Combine,
    ) -> BlitResult<Self> {
        Self::build(ctx, target, geom, SourceKind::Direct(src_format), combine)
    }

    /// Build a pipeline for an 8-bit palette-indexed source.
    pub fn build_indexed8(
        ctx: &BlitContext,
        target: &TargetFormat,
        geom: &SourceGeometry,
        palette: &Palette,
        combine: Combine,
    ) -> BlitResult<Self> {
        let table = palette.table_for(target.bytes_per_pixel(), 256)?;
        Self::build(ctx, target, geom, SourceKind::Indexed8(table), combine)
    }

    /// Build a pipeline for a 16-bit palette-indexed source resolved in
    /// software through 64Ki-entry tables.
    pub fn build_indexed16(
        ctx: &BlitContext,
        target: &TargetFormat,
        geom: &SourceGeometry,
        palette: &Palette,
        combine: Combine,
    ) -> BlitResult<Self> {
        let table = palette.table_for(target.bytes_per_pixel(), 1 << 16)?;
        Self::build(ctx, target, geom, SourceKind::Indexed16(table), combine)
    }

    /// Build a pipeline for 16-bit indices that already map through a
    /// hardware palette expressed in the destination pixel format.
    pub fn build_indexed16hw(
        ctx: &BlitContext,
        target: &TargetFormat,
        geom: &SourceGeometry,
        combine: Combine,
    ) -> BlitResult<Self> {
        Self::build(ctx, target, geom, SourceKind::Indexed16Hw, combine)
    }

    fn build(
        ctx: &BlitContext,
        target: &TargetFormat,
        geom: &SourceGeometry,
        source: SourceKind,
        combine: Combine,
    ) -> BlitResult<Self> {
        let built = builder::build(target, geom, source, combine, ctx.caps)?;
        Ok(Self {
            chain: built.chain,
            vert: built.vert,
            target: *target,
            dst_w: geom.dst_w,
            src_w: geom.src_w,
            src_row_span: built.src_row_span,
        })
    }

    /// Destination extent in pixels.
    pub fn dst_size(&self) -> (usize, usize) {
        (self.dst_w, self.vert.ddy)
    }

    /// Source extent in pixels.
    pub fn src_size(&self) -> (usize, usize) {
        (self.src_w, self.vert.sdy)
    }

    /// Execute one frame blit at the given destination pixel offset.
    ///
    /// `src` holds the source frame's rows at the geometry's row stride.
    /// Exactly `src_h` rows are consumed and exactly `dst_h` destination
    /// rows are produced.
    pub fn drive(
        &mut self,
        ctx: &mut BlitContext,
        target: &mut dyn RowTarget,
        dst_x: usize,
        dst_y: usize,
        src: &[u8],
    ) -> BlitResult<()> {
        let dbpp = self.target.bytes_per_pixel();
        let out_bytes = self.dst_w * dbpp;
        let x_off = dst_x * dbpp;
        if x_off + out_bytes > self.target.bytes_per_scanline {
            return Err(BlitError::geometry(format!(
                "blit at column {dst_x} overruns the {}-byte scanline",
                self.target.bytes_per_scanline
            )));
        }
        let need = (self.vert.sdy - 1) * self.vert.sdw + self.src_row_span;
        if src.len() < need {
            return Err(BlitError::validation(format!(
                "source buffer holds {} bytes, {need} required",
                src.len()
            )));
        }

        self.chain.reset_states();
        let depth = ctx.arena.depth();
        self.vert
            .drive(&mut self.chain, &mut ctx.arena, target, x_off, dst_y, src, out_bytes);
        debug_assert_eq!(
            ctx.arena.depth(),
            depth,
            "scratch acquisitions must balance within one frame"
        );
        ctx.caps.retire();
        Ok(())
    }

    /// Names of the horizontal stages, in execution order.
    pub fn stage_names(&self) -> Vec<String> {
        self.chain.stages().iter().map(|s| s.name()).collect()
    }

    /// Name of the vertical combination.
    pub fn vertical_name(&self) -> String {
        self.vert.name()
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.stage_names();
        if names.is_empty() {
            write!(f, "{}", self.vert.name())
        } else {
            write!(f, "{} | {}", names.join(", "), self.vert.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::VerticalMode;
    use crate::format::RgbLayout;
    use crate::target::MemoryTarget;

    fn ctx() -> BlitContext {
        BlitContext::default()
    }

    fn rgb32(bytes_per_scanline: usize) -> TargetFormat {
        TargetFormat::new(ColorFormat::Rgb(RgbLayout::BGRA8888), bytes_per_scanline)
    }

    fn identity_geom(w: usize, h: usize) -> SourceGeometry {
        SourceGeometry {
            dst_w: w,
            dst_h: h,
            src_w: w,
            src_h: h,
            src_row_stride: w * 4,
            src_pixel_step: 4,
        }
    }

    #[test]
    fn identity_pipeline_lists_a_copy_stage() {
        let ctx = ctx();
        let pipe = Pipeline::build_direct(
            &ctx,
            &rgb32(16),
            &identity_geom(4, 4),
            ColorFormat::Rgb(RgbLayout::BGRA8888),
            Combine::default(),
        )
        .unwrap();
        assert_eq!(pipe.stage_names(), ["hcopy"]);
        assert_eq!(pipe.vertical_name(), "vcopy");
        assert_eq!(pipe.to_string(), "hcopy | vcopy");
    }

    #[test]
    fn conversion_precedes_resize_and_decoration() {
        let ctx = ctx();
        let target = TargetFormat::new(ColorFormat::Rgb(RgbLayout::BGR565), 64);
        let geom = SourceGeometry {
            dst_w: 32,
            dst_h: 32,
            src_w: 16,
            src_h: 16,
            src_row_stride: 64,
            src_pixel_step: 4,
        };
        let pipe = Pipeline::build_direct(
            &ctx,
            &target,
            &geom,
            ColorFormat::Rgb(RgbLayout::BGRA8888),
            Combine::new(
                VerticalMode::None,
                crate::combine::HorizFlags::RGB_TRIAD3PIX,
            ),
        )
        .unwrap();
        assert_eq!(
            pipe.stage_names(),
            ["bgra 8888>bgr 565", "hstretch", "rgb 3"]
        );
    }

    #[test]
    fn zero_geometry_is_rejected() {
        let ctx = ctx();
        let geom = SourceGeometry {
            dst_w: 0,
            ..identity_geom(4, 4)
        };
        assert!(
            Pipeline::build_direct(
                &ctx,
                &rgb32(16),
                &geom,
                ColorFormat::Rgb(RgbLayout::BGRA8888),
                Combine::default(),
            )
            .is_err()
        );
    }

    #[test]
    fn drive_validates_source_length() {
        let mut ctx = ctx();
        let mut pipe = Pipeline::build_direct(
            &ctx,
            &rgb32(16),
            &identity_geom(4, 4),
            ColorFormat::Rgb(RgbLayout::BGRA8888),
            Combine::default(),
        )
        .unwrap();
        let mut out = vec![0u8; 16 * 4];
        let mut target = MemoryTarget::new(&mut out, 16);
        let short = vec![0u8; 10];
        assert!(pipe.drive(&mut ctx, &mut target, 0, 0, &short).is_err());
    }

    #[test]
    fn drive_validates_destination_column() {
        let mut ctx = ctx();
        let mut pipe = Pipeline::build_direct(
            &ctx,
            &rgb32(16),
            &identity_geom(4, 4),
            ColorFormat::Rgb(RgbLayout::BGRA8888),
            Combine::default(),
        )
        .unwrap();
        let mut out = vec![0u8; 16 * 4];
        let mut target = MemoryTarget::new(&mut out, 16);
        let src = vec![0u8; 4 * 4 * 4];
        assert!(pipe.drive(&mut ctx, &mut target, 1, 0, &src).is_err());
    }

    #[test]
    #[should_panic(expected = "non-RGB source")]
    fn converting_from_yuy2_panics() {
        let ctx = ctx();
        let geom = SourceGeometry {
            src_pixel_step: 2,
            ..identity_geom(4, 4)
        };
        let _ = Pipeline::build_direct(
            &ctx,
            &rgb32(16),
            &geom,
            ColorFormat::Yuy2,
            Combine::default(),
        );
    }
}
