use std::sync::atomic::{AtomicI32, Ordering};

/// Step codes stored in the checkpoint tracker.
///
/// Values are reassigned (not incremented) immediately before each risky
/// teardown action, so a crash mid-shutdown pins the failing step in any
/// out-of-band post-mortem dump. The numbering is historical and kept
/// stable so old crash reports stay comparable.
pub mod step {
    pub const RECORDING: i32 = 9900;
    pub const PLUGINS: i32 = 9016;
    pub const SCRIPTS: i32 = 9020;
    pub const AUDIO: i32 = 9019;
    pub const AUDIO_STOP: i32 = 9917;
    pub const CLASSIFY: i32 = 9901;
    pub const FONTS: i32 = 9902;
    pub const TRANSLATION: i32 = 9907;
    pub const GRAPHICS_MODE: i32 = 9908;
    pub const WORLD_STATE: i32 = 9903;
    pub const EXIT: i32 = 9904;
}

/// Diagnostic "where is shutdown right now" marker.
///
/// Advisory only: it never affects control flow, and atomic-width storage
/// is all the protection it needs.
#[derive(Debug, Default)]
pub struct CheckpointTracker {
    marker: AtomicI32,
}

impl CheckpointTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `code` as the currently executing step.
    pub fn mark(&self, code: i32) {
        self.marker.store(code, Ordering::Relaxed);
    }

    /// Read the last recorded step, for out-of-process diagnostics.
    pub fn read(&self) -> i32 {
        self.marker.load(Ordering::Relaxed)
    }
}
