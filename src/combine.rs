//! Frame combination settings: one vertical algorithm plus any number of
//! horizontal and decorative effects.

use serde::{Deserialize, Serialize};

/// Vertical-axis combination algorithm. At most one is active per pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalMode {
    /// Duplicate or drop rows as the geometry requires.
    #[default]
    None,
    /// Saturating per-channel maximum across reduced row groups.
    Max,
    /// Arithmetic mean: blends the first duplicated row (expansion) or the
    /// whole group (reduction).
    Mean,
    /// Low-pass: cascading blend against the previous row's pre-blend value.
    LowPass,
    /// Edge-aware integer upscalers. Engage only when both axes match the
    /// exact ratio; otherwise the axis falls back to generic resampling.
    Scale2x,
    Scale3x,
    Scale4x,
    Lq2x,
    Lq3x,
    Lq4x,
    Hq2x,
    Hq3x,
    Hq4x,
}

impl VerticalMode {
    /// Integer factor of the upscaler modes.
    pub(crate) fn scale_factor(self) -> Option<usize> {
        match self {
            Self::Scale2x | Self::Lq2x | Self::Hq2x => Some(2),
            Self::Scale3x | Self::Lq3x | Self::Hq3x => Some(3),
            Self::Scale4x | Self::Lq4x | Self::Hq4x => Some(4),
            _ => None,
        }
    }

    /// Modes whose row combination reads RGB-comparable pixel values and so
    /// must run before any RGB-dependent decoration.
    pub(crate) fn needs_rgb_rows(self) -> bool {
        matches!(
            self,
            Self::Mean
                | Self::LowPass
                | Self::Lq2x
                | Self::Lq3x
                | Self::Lq4x
                | Self::Hq2x
                | Self::Hq3x
                | Self::Hq4x
        )
    }

    /// Modes that write destination rows directly, without a trailing copy
    /// stage after the vertical combination.
    pub(crate) fn writes_direct(self) -> bool {
        self.scale_factor().is_some()
    }
}

bitflags::bitflags! {
    /// Horizontal-axis and decorative effect bits. Freely combinable;
    /// decorations always run at final pixel width.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct HorizFlags: u32 {
        /// Horizontal reduction uses the local mean instead of sub-sampling.
        const MEAN = 1 << 0;
        /// Horizontal reduction uses the local maximum instead of sub-sampling.
        const MAX = 1 << 1;
        /// 2-tap horizontal low-pass filter (before reduction, after expansion).
        const FILTER = 1 << 2;
        /// Phosphor triads at 3-pixel granularity.
        const RGB_TRIAD3PIX = 1 << 3;
        const RGB_TRIADSTRONG3PIX = 1 << 4;
        /// Phosphor triads at 6-pixel granularity.
        const RGB_TRIAD6PIX = 1 << 5;
        const RGB_TRIADSTRONG6PIX = 1 << 6;
        /// Phosphor triads at 16-pixel granularity.
        const RGB_TRIAD16PIX = 1 << 7;
        const RGB_TRIADSTRONG16PIX = 1 << 8;
        /// Darken every second output row.
        const RGB_SCANDOUBLEHORZ = 1 << 9;
        /// Darken the second and third of every three output rows.
        const RGB_SCANTRIPLEHORZ = 1 << 10;
        /// Darken every second pixel column.
        const RGB_SCANDOUBLEVERT = 1 << 11;
        /// Darken the second and third of every three pixel columns.
        const RGB_SCANTRIPLEVERT = 1 << 12;
        /// Swap pixel pairs starting at even columns.
        const SWAP_EVEN = 1 << 13;
        /// Swap pixel pairs starting at odd columns.
        const SWAP_ODD = 1 << 14;
        /// Interlace low-pass: blend each row with the previous output row.
        const INTERLACE_FILTER = 1 << 15;
    }
}

impl HorizFlags {
    /// Bits that require an RGB destination layout.
    pub(crate) fn rgb_only() -> Self {
        Self::RGB_TRIAD3PIX
            | Self::RGB_TRIADSTRONG3PIX
            | Self::RGB_TRIAD6PIX
            | Self::RGB_TRIADSTRONG6PIX
            | Self::RGB_TRIAD16PIX
            | Self::RGB_TRIADSTRONG16PIX
            | Self::RGB_SCANDOUBLEHORZ
            | Self::RGB_SCANTRIPLEHORZ
            | Self::RGB_SCANDOUBLEVERT
            | Self::RGB_SCANTRIPLEVERT
    }
}

/// Complete combination request for one pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combine {
    pub vertical: VerticalMode,
    pub horizontal: HorizFlags,
}

impl Combine {
    pub fn new(vertical: VerticalMode, horizontal: HorizFlags) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }

    pub fn vertical(vertical: VerticalMode) -> Self {
        Self {
            vertical,
            horizontal: HorizFlags::empty(),
        }
    }
}

impl From<VerticalMode> for Combine {
    fn from(vertical: VerticalMode) -> Self {
        Self::vertical(vertical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_factors() {
        assert_eq!(VerticalMode::Scale2x.scale_factor(), Some(2));
        assert_eq!(VerticalMode::Hq4x.scale_factor(), Some(4));
        assert_eq!(VerticalMode::Mean.scale_factor(), None);
    }

    #[test]
    fn rgb_row_requirements() {
        assert!(VerticalMode::Mean.needs_rgb_rows());
        assert!(VerticalMode::Lq3x.needs_rgb_rows());
        assert!(!VerticalMode::Scale2x.needs_rgb_rows());
        assert!(!VerticalMode::Max.needs_rgb_rows());
    }

    #[test]
    fn direct_modes_are_the_upscalers() {
        for mode in [
            VerticalMode::Scale2x,
            VerticalMode::Lq2x,
            VerticalMode::Hq3x,
        ] {
            assert!(mode.writes_direct());
        }
        assert!(!VerticalMode::Mean.writes_direct());
    }
}
