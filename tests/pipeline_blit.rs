//! Whole-pipeline scenarios driven through a memory target.

use blitline::{
    BlitContext, ColorFormat, Combine, HorizFlags, MemoryTarget, Palette, Pipeline, RgbLayout,
    SourceGeometry, TargetFormat, VerticalMode,
};

fn rgb32(width: usize) -> TargetFormat {
    TargetFormat::new(ColorFormat::Rgb(RgbLayout::BGRA8888), width * 4)
}

fn geom(src_w: usize, src_h: usize, dst_w: usize, dst_h: usize, bpp: usize) -> SourceGeometry {
    SourceGeometry {
        dst_w,
        dst_h,
        src_w,
        src_h,
        src_row_stride: src_w * bpp,
        src_pixel_step: bpp,
    }
}

fn px32(frame: &[u8], width: usize, x: usize, y: usize) -> u32 {
    let at = (y * width + x) * 4;
    u32::from_le_bytes(frame[at..at + 4].try_into().unwrap())
}

fn frame32(width: usize, height: usize, f: impl Fn(usize, usize) -> u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            out.extend_from_slice(&f(x, y).to_le_bytes());
        }
    }
    out
}

#[test]
fn identity_round_trip_is_byte_exact() {
    let mut ctx = BlitContext::default();
    let (w, h) = (17, 9);
    let src = frame32(w, h, |x, y| (x as u32) << 16 | (y as u32) << 8 | 0x2A);
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(w),
        &geom(w, h, w, h, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::default(),
    )
    .unwrap();

    let mut out = vec![0u8; w * h * 4];
    let mut target = MemoryTarget::new(&mut out, w * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();
    assert_eq!(out, src);
}

#[test]
fn identity_round_trip_from_stepped_source() {
    let mut ctx = BlitContext::default();
    let (w, h) = (8, 4);
    // pixels every 8 bytes, rows every 80 bytes
    let step = 8;
    let stride = 80;
    let mut src = vec![0u8; (h - 1) * stride + (w - 1) * step + 4];
    for y in 0..h {
        for x in 0..w {
            let v = ((y * w + x) as u32).wrapping_mul(0x01010101);
            src[y * stride + x * step..y * stride + x * step + 4]
                .copy_from_slice(&v.to_le_bytes());
        }
    }
    let geometry = SourceGeometry {
        dst_w: w,
        dst_h: h,
        src_w: w,
        src_h: h,
        src_row_stride: stride,
        src_pixel_step: step,
    };
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(w),
        &geometry,
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::default(),
    )
    .unwrap();

    let mut out = vec![0u8; w * h * 4];
    let mut target = MemoryTarget::new(&mut out, w * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();
    for y in 0..h {
        for x in 0..w {
            assert_eq!(
                px32(&out, w, x, y),
                ((y * w + x) as u32).wrapping_mul(0x01010101)
            );
        }
    }
}

#[test]
fn grayscale_palette_maps_every_byte() {
    let mut ctx = BlitContext::default();
    let (w, h) = (16, 16);
    let palette = Palette::with_map32(
        (0..256u32)
            .map(|i| i | (i << 8) | (i << 16))
            .collect::<Vec<_>>(),
    );
    let src: Vec<u8> = (0..w * h).map(|i| (i % 256) as u8).collect();
    let mut pipe = Pipeline::build_indexed8(
        &ctx,
        &rgb32(w),
        &geom(w, h, w, h, 1),
        &palette,
        Combine::default(),
    )
    .unwrap();

    let mut out = vec![0u8; w * h * 4];
    let mut target = MemoryTarget::new(&mut out, w * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();
    for k in 0..w * h {
        let i = (k % 256) as u32;
        assert_eq!(px32(&out, w, k % w, k / w), i | (i << 8) | (i << 16));
    }
}

#[test]
fn scale2x_checkerboard_is_block_uniform() {
    let mut ctx = BlitContext::default();
    let (sw, sh, dw, dh) = (320, 240, 640, 480);
    let a = 0x00FF_0000;
    let b = 0x0000_00FF;
    let src = frame32(sw, sh, |x, y| if (x + y) % 2 == 0 { a } else { b });
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(dw),
        &geom(sw, sh, dw, dh, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Scale2x),
    )
    .unwrap();
    assert_eq!(pipe.vertical_name(), "scale2x");

    let mut out = vec![0u8; dw * dh * 4];
    let mut target = MemoryTarget::new(&mut out, dw * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();

    // every 2x2 destination block reproduces its source pixel exactly: the
    // vertical neighbors of any checkerboard pixel are equal, so the edge
    // rule never triggers
    for sy in 0..sh {
        for sx in 0..sw {
            let expect = if (sx + sy) % 2 == 0 { a } else { b };
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                assert_eq!(px32(&out, dw, 2 * sx + dx, 2 * sy + dy), expect);
            }
        }
    }
}

#[test]
fn upscalers_keep_uniform_frames_uniform() {
    for (mode, n) in [
        (VerticalMode::Scale2x, 2),
        (VerticalMode::Scale3x, 3),
        (VerticalMode::Scale4x, 4),
        (VerticalMode::Lq2x, 2),
        (VerticalMode::Lq3x, 3),
        (VerticalMode::Lq4x, 4),
        (VerticalMode::Hq2x, 2),
        (VerticalMode::Hq3x, 3),
        (VerticalMode::Hq4x, 4),
    ] {
        let mut ctx = BlitContext::default();
        let (sw, sh) = (12, 7);
        let (dw, dh) = (sw * n, sh * n);
        let color = 0x0030_6090;
        let src = frame32(sw, sh, |_, _| color);
        let mut pipe = Pipeline::build_direct(
            &ctx,
            &rgb32(dw),
            &geom(sw, sh, dw, dh, 4),
            ColorFormat::Rgb(RgbLayout::BGRA8888),
            Combine::vertical(mode),
        )
        .unwrap();

        let mut out = vec![0u8; dw * dh * 4];
        let mut target = MemoryTarget::new(&mut out, dw * 4);
        pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();
        assert!(
            out.chunks(4)
                .all(|c| c == color.to_le_bytes()),
            "{mode:?} broke uniformity"
        );
    }
}

#[test]
fn scale2x_isolated_pixel_becomes_a_block() {
    let mut ctx = BlitContext::default();
    let (sw, sh) = (7, 7);
    let bg = 0x0010_1010;
    let fg = 0x00FF_FFFF;
    let src = frame32(sw, sh, |x, y| if (x, y) == (3, 3) { fg } else { bg });
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(sw * 2),
        &geom(sw, sh, sw * 2, sh * 2, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Scale2x),
    )
    .unwrap();

    let mut out = vec![0u8; sw * 2 * sh * 2 * 4];
    let mut target = MemoryTarget::new(&mut out, sw * 2 * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();

    for y in 0..sh * 2 {
        for x in 0..sw * 2 {
            let expect = if (6..8).contains(&x) && (6..8).contains(&y) {
                fg
            } else {
                bg
            };
            assert_eq!(px32(&out, sw * 2, x, y), expect, "at ({x},{y})");
        }
    }
}

#[test]
fn upscaler_degrades_per_axis_on_geometry_mismatch() {
    let ctx = BlitContext::default();
    // vertical ratio matches 2x but horizontal does not
    let pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(50),
        &geom(20, 10, 50, 20, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Scale2x),
    )
    .unwrap();
    assert_eq!(pipe.vertical_name(), "vexpansion");
    assert!(pipe.stage_names().contains(&"hstretch".to_string()));
}

#[test]
fn vertical_max_reduction_never_loses_brightness() {
    let mut ctx = BlitContext::default();
    let (sw, sh, dh) = (8, 6, 3);
    let src = frame32(sw, sh, |x, y| ((y * 40) as u32) << 16 | (x as u32) << 8);
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(sw),
        &geom(sw, sh, sw, dh, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Max),
    )
    .unwrap();
    assert_eq!(pipe.vertical_name(), "vreduction max");

    let mut out = vec![0u8; sw * dh * 4];
    let mut target = MemoryTarget::new(&mut out, sw * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();

    // each output row covers two source rows; every channel must be >= both
    for y in 0..dh {
        for x in 0..sw {
            let got = px32(&out, sw, x, y);
            for sy in [2 * y, 2 * y + 1] {
                let contrib = px32(&src, sw, x, sy);
                for shift in [0, 8, 16] {
                    assert!((got >> shift) & 0xFF >= (contrib >> shift) & 0xFF);
                }
            }
        }
    }
}

#[test]
fn vertical_mean_reduction_stays_between_bounds() {
    let mut ctx = BlitContext::default();
    let (sw, sh, dh) = (6, 4, 2);
    let src = frame32(sw, sh, |x, y| {
        let v = (x * 30 + y * 50) as u32 & 0xFF;
        v | (v << 8) | (v << 16)
    });
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(sw),
        &geom(sw, sh, sw, dh, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Mean),
    )
    .unwrap();

    let mut out = vec![0u8; sw * dh * 4];
    let mut target = MemoryTarget::new(&mut out, sw * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();

    for y in 0..dh {
        for x in 0..sw {
            let got = px32(&out, sw, x, y);
            let a = px32(&src, sw, x, 2 * y);
            let b = px32(&src, sw, x, 2 * y + 1);
            for shift in [0, 8, 16] {
                let g = (got >> shift) & 0xFF;
                let lo = ((a >> shift) & 0xFF).min((b >> shift) & 0xFF);
                let hi = ((a >> shift) & 0xFF).max((b >> shift) & 0xFF);
                assert!(g >= lo && g <= hi, "channel out of bounds at ({x},{y})");
            }
        }
    }
}

#[test]
fn expansion_mean_blends_only_first_duplicate() {
    let mut ctx = BlitContext::default();
    let (sw, sh, dh) = (4, 2, 4);
    let top = 100u32;
    let bottom = 200u32;
    let src = frame32(sw, sh, |_, y| if y == 0 { top } else { bottom });
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(sw),
        &geom(sw, sh, sw, dh, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Mean),
    )
    .unwrap();
    assert_eq!(pipe.vertical_name(), "vexpansion mean");

    let mut out = vec![0u8; sw * dh * 4];
    let mut target = MemoryTarget::new(&mut out, sw * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();

    // rows: A, A, mean(A,B), B
    assert_eq!(px32(&out, sw, 0, 0), top);
    assert_eq!(px32(&out, sw, 0, 1), top);
    assert_eq!(px32(&out, sw, 0, 2), 150);
    assert_eq!(px32(&out, sw, 0, 3), bottom);
}

#[test]
fn one_to_one_lowpass_blends_with_previous_row() {
    let mut ctx = BlitContext::default();
    let (sw, sh) = (4, 3);
    let rows = [10u32, 90, 30];
    let src = frame32(sw, sh, |_, y| rows[y]);
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(sw),
        &geom(sw, sh, sw, sh, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::LowPass),
    )
    .unwrap();
    assert_eq!(pipe.vertical_name(), "vcopy lowpass");

    let mut out = vec![0u8; sw * sh * 4];
    let mut target = MemoryTarget::new(&mut out, sw * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();

    assert_eq!(px32(&out, sw, 0, 0), 10);
    assert_eq!(px32(&out, sw, 0, 1), 50); // mean(10, 90)
    assert_eq!(px32(&out, sw, 0, 2), 60); // mean(90, 30)
}

#[test]
fn conversion_to_bgr565_is_applied_per_pixel() {
    let mut ctx = BlitContext::default();
    let (w, h) = (4, 2);
    let src = frame32(w, h, |x, y| {
        let v = (x * 60 + y * 17) as u32 & 0xFF;
        v << 16 | (v / 2) << 8 | v
    });
    let target_fmt = TargetFormat::new(ColorFormat::Rgb(RgbLayout::BGR565), w * 2);
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &target_fmt,
        &geom(w, h, w, h, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::default(),
    )
    .unwrap();

    let mut out = vec![0u8; w * h * 2];
    let mut target = MemoryTarget::new(&mut out, w * 2);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();

    for y in 0..h {
        for x in 0..w {
            let px = px32(&src, w, x, y);
            let expect = (((px >> 8) & 0xF800) | ((px >> 5) & 0x07E0) | ((px >> 3) & 0x1F)) as u16;
            let at = y * w * 2 + x * 2;
            assert_eq!(u16::from_le_bytes(out[at..at + 2].try_into().unwrap()), expect);
        }
    }
}

#[test]
fn blit_lands_at_destination_offset() {
    let mut ctx = BlitContext::default();
    let (w, h) = (3, 2);
    let scan = 10usize; // pixels per destination scanline
    let src = frame32(w, h, |x, y| 0x0100 + (y * w + x) as u32);
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &TargetFormat::new(ColorFormat::Rgb(RgbLayout::BGRA8888), scan * 4),
        &geom(w, h, w, h, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::default(),
    )
    .unwrap();

    let mut out = vec![0u8; scan * 6 * 4];
    let mut target = MemoryTarget::new(&mut out, scan * 4);
    pipe.drive(&mut ctx, &mut target, 4, 3, &src).unwrap();

    assert_eq!(px32(&out, scan, 4, 3), 0x0100);
    assert_eq!(px32(&out, scan, 6, 4), 0x0100 + 5);
    // untouched pixels stay zero
    assert_eq!(px32(&out, scan, 0, 0), 0);
    assert_eq!(px32(&out, scan, 3, 3), 0);
    assert_eq!(px32(&out, scan, 7, 3), 0);
}

#[test]
fn scanline_decoration_darkens_alternate_rows() {
    let mut ctx = BlitContext::default();
    let (w, h) = (4, 4);
    let src = frame32(w, h, |_, _| 0x00FF_FFFF);
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(w),
        &geom(w, h, w, h, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::new(VerticalMode::None, HorizFlags::RGB_SCANDOUBLEHORZ),
    )
    .unwrap();

    let mut out = vec![0u8; w * h * 4];
    let mut target = MemoryTarget::new(&mut out, w * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();
    assert_eq!(px32(&out, w, 0, 0), 0x00FF_FFFF);
    assert_eq!(px32(&out, w, 0, 1), 0x007F_7F7F);
    assert_eq!(px32(&out, w, 0, 2), 0x00FF_FFFF);

    // the row counter resets between frames
    let mut out2 = vec![0u8; w * h * 4];
    let mut target2 = MemoryTarget::new(&mut out2, w * 4);
    pipe.drive(&mut ctx, &mut target2, 0, 0, &src).unwrap();
    assert_eq!(out, out2);
}

#[test]
fn indexed16hw_widens_to_32bit_destination() {
    let mut ctx = BlitContext::default();
    let (w, h) = (4, 2);
    let src: Vec<u8> = (0..w * h)
        .flat_map(|i| ((i * 257) as u16).to_le_bytes())
        .collect();
    let mut pipe = Pipeline::build_indexed16hw(
        &ctx,
        &rgb32(w),
        &geom(w, h, w, h, 2),
        Combine::default(),
    )
    .unwrap();

    let mut out = vec![0u8; w * h * 4];
    let mut target = MemoryTarget::new(&mut out, w * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();
    for i in 0..w * h {
        assert_eq!(px32(&out, w, i % w, i / w), (i * 257) as u32);
    }
}

#[test]
fn single_row_source_survives_the_upscaler_window() {
    let mut ctx = BlitContext::default();
    let color = 0x00AB_CDEF;
    let src = frame32(5, 1, |_, _| color);
    let mut pipe = Pipeline::build_direct(
        &ctx,
        &rgb32(10),
        &geom(5, 1, 10, 2, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Scale2x),
    )
    .unwrap();

    let mut out = vec![0u8; 10 * 2 * 4];
    let mut target = MemoryTarget::new(&mut out, 10 * 4);
    pipe.drive(&mut ctx, &mut target, 0, 0, &src).unwrap();
    assert!(out.chunks(4).all(|c| c == color.to_le_bytes()));
}

#[test]
fn one_context_serves_many_pipelines() {
    let mut ctx = BlitContext::default();
    let (w, h) = (6, 6);
    let src = frame32(w, h, |x, y| (x ^ y) as u32 * 0x0101_0101 & 0x00FF_FFFF);

    let mut identity = Pipeline::build_direct(
        &ctx,
        &rgb32(w),
        &geom(w, h, w, h, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::default(),
    )
    .unwrap();
    let mut doubled = Pipeline::build_direct(
        &ctx,
        &rgb32(w * 2),
        &geom(w, h, w * 2, h * 2, 4),
        ColorFormat::Rgb(RgbLayout::BGRA8888),
        Combine::vertical(VerticalMode::Mean),
    )
    .unwrap();

    for _ in 0..3 {
        let mut a = vec![0u8; w * h * 4];
        let mut ta = MemoryTarget::new(&mut a, w * 4);
        identity.drive(&mut ctx, &mut ta, 0, 0, &src).unwrap();
        assert_eq!(a, src);

        let mut b = vec![0u8; w * 2 * h * 2 * 4];
        let mut tb = MemoryTarget::new(&mut b, w * 2 * 4);
        doubled.drive(&mut ctx, &mut tb, 0, 0, &src).unwrap();
        assert_eq!(px32(&b, w * 2, 0, 0), px32(&src, w, 0, 0));
    }
}
