//! Process-owned pipeline execution context.
//!
//! The context bundles the shared mutable state the pipeline needs at run
//! time: the scratch [`RowArena`](crate::arena::RowArena) and the frozen
//! CPU capability selection. One context serves any number of pipelines,
//! but a single `&mut BlitContext` flows through every `drive`, so two
//! frames can never interleave their scratch usage.

use crate::arena::RowArena;

/// CPU capability selection, frozen for the process lifetime.
///
/// The flags never change observable pixel output; they steer which write
/// patterns the builder considers fast (and therefore whether a trailing
/// copy stage is inserted) and whether accelerated kernel state must be
/// retired after each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Wide-register accelerated kernels are in use.
    pub accel: bool,
    /// The destination is write-combining mapped, making every write
    /// pattern fast regardless of width.
    pub write_combining: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        // Mainstream configuration: frame buffers are write-combining mapped.
        Self {
            accel: false,
            write_combining: true,
        }
    }
}

impl Capabilities {
    /// Retire any per-frame accelerated CPU state.
    ///
    /// Invoked at the end of every `drive`. The default scalar path keeps
    /// no such state, so this is a no-op; it exists so the call site in the
    /// driver matches the contract of accelerated kernel sets, which leave
    /// register state engaged that would corrupt unrelated floating-point
    /// work if not retired.
    pub(crate) fn retire(&self) {}
}

/// Owned execution context: scratch arena plus capability flags.
pub struct BlitContext {
    pub(crate) caps: Capabilities,
    pub(crate) arena: RowArena,
}

impl BlitContext {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            arena: RowArena::new(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }
}

impl Default for BlitContext {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}
