pub mod alert;
pub mod audio;
pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod debugger;
pub mod error;
pub mod reason;
pub mod session;
pub mod subsystems;
pub mod tempfiles;

pub use alert::{AlertText, DEFAULT_ALERT_CAPACITY};
pub use audio::{CachedClip, DecodeWorker, MixerState, QueuedAudioItem};
pub use checkpoint::{step, CheckpointTracker};
pub use classify::{classify, Classification, ExitCategory};
pub use config::EgressConfig;
pub use coordinator::{run, terminate, ShutdownOutcome, EXIT_NORMAL};
pub use debugger::{notify_debugger, DebuggerLink};
pub use error::{EgressError, Result};
pub use reason::{QuitReason, DEFAULT_REASON_CAPACITY};
pub use session::ShutdownSession;
pub use subsystems::{
    AudioMixer, CdTransport, FontRenderer, GraphicsDriver, PlatformLayer, RecordingService,
    RenderSurface, ScriptHost, SpriteCache, TranslationService, WorldStore,
};
pub use tempfiles::sweep_temp_files;
