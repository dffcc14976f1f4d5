//! Blitline is a per-frame framebuffer transform pipeline.
//!
//! It converts and rescales a source framebuffer (arbitrary pixel depth,
//! color layout and stride) into a destination framebuffer of different
//! resolution and pixel format, optionally applying CRT-style decorations
//! (phosphor triads, scanlines) and edge-aware integer upscalers
//! (scale2x/3x/4x and their lq/hq variants).
//!
//! The API is split in two phases:
//!
//! - [`Pipeline::build_direct`] (and the indexed variants) runs once per
//!   format or geometry change and assembles a reusable chain of row
//!   transforms.
//! - [`Pipeline::drive`] replays the pipeline against new pixel data, once
//!   per frame, writing rows through a [`RowTarget`].
//!
//! Everything is synchronous and single-threaded; a [`BlitContext`] owns
//! the scratch state one frame needs, and borrowing it mutably per drive
//! serializes frames by construction.
#![forbid(unsafe_code)]

mod arena;
mod builder;
mod chain;
mod combine;
mod context;
mod format;
mod foundation;
mod pipeline;
mod resample;
mod rowops;
mod stage;
mod target;
mod vertical;

pub use builder::SourceGeometry;
pub use combine::{Combine, HorizFlags, VerticalMode};
pub use context::{BlitContext, Capabilities};
pub use format::{Channel, ColorFormat, Palette, RgbLayout};
pub use foundation::error::{BlitError, BlitResult};
pub use pipeline::Pipeline;
pub use target::{MemoryTarget, RowTarget, TargetFormat};
