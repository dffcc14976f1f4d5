//! Destination surfaces.
//!
//! A pipeline writes through a [`RowTarget`]: a row accessor returning a
//! mutable byte slice per destination row. The live display surface
//! implements this over its mapped scanlines; [`MemoryTarget`] adapts any
//! caller-owned buffer with an arbitrary scanline stride.

use crate::foundation::error::{BlitError, BlitResult};
use crate::format::ColorFormat;

/// Pixel format and scanline stride of a destination surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TargetFormat {
    pub color: ColorFormat,
    /// Distance between the starts of consecutive rows, in bytes.
    pub bytes_per_scanline: usize,
}

impl TargetFormat {
    pub fn new(color: ColorFormat, bytes_per_scanline: usize) -> Self {
        Self {
            color,
            bytes_per_scanline,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.color.bytes_per_pixel()
    }

    pub(crate) fn validate(&self) -> BlitResult<()> {
        if self.bytes_per_scanline == 0 {
            return Err(BlitError::validation("target scanline stride must be > 0"));
        }
        Ok(())
    }
}

/// Row accessor of a destination surface.
///
/// The returned slice must stay valid until the next `line` call and cover
/// the full scanline. Called once per produced destination row, in
/// ascending row order within each frame.
pub trait RowTarget {
    fn line(&mut self, y: usize) -> &mut [u8];
}

/// A destination surface backed by a caller-owned buffer.
pub struct MemoryTarget<'a> {
    buf: &'a mut [u8],
    bytes_per_scanline: usize,
}

impl<'a> MemoryTarget<'a> {
    pub fn new(buf: &'a mut [u8], bytes_per_scanline: usize) -> Self {
        assert!(bytes_per_scanline > 0, "scanline stride must be > 0");
        Self {
            buf,
            bytes_per_scanline,
        }
    }
}

impl RowTarget for MemoryTarget<'_> {
    fn line(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.bytes_per_scanline;
        let end = (start + self.bytes_per_scanline).min(self.buf.len());
        &mut self.buf[start..end]
    }
}
