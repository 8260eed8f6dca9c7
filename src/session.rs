use crate::checkpoint::CheckpointTracker;
use crate::config::EgressConfig;
use crate::debugger::DebuggerLink;
use crate::subsystems::{
    AudioMixer, CdTransport, FontRenderer, GraphicsDriver, PlatformLayer, RecordingService,
    RenderSurface, ScriptHost, SpriteCache, TranslationService, WorldStore,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything one shutdown invocation owns: a handle per subsystem, the
/// flags that used to be process-wide globals, and the checkpoint tracker.
///
/// Every handle is optional; a subsystem that was never initialized (or
/// was already torn down) is simply absent and its teardown step no-ops.
/// Passing the session by value into the coordinator makes the sequence
/// testable in isolation and re-entrant-safe: a second caller cannot share
/// the first caller's half-consumed handles.
pub struct ShutdownSession {
    pub config: EgressConfig,
    pub checkpoint: Arc<CheckpointTracker>,

    pub debugger: Option<Box<dyn DebuggerLink>>,
    pub recording: Option<Box<dyn RecordingService>>,
    pub cd_transport: Option<Box<dyn CdTransport>>,
    pub scripts: Option<Box<dyn ScriptHost>>,
    pub platform: Option<Box<dyn PlatformLayer>>,
    pub audio: Option<Box<dyn AudioMixer>>,
    pub fonts: Option<Box<dyn FontRenderer>>,
    pub translation: Option<Box<dyn TranslationService>>,
    pub graphics: Option<Box<dyn GraphicsDriver>>,
    pub sub_surface: Option<Box<dyn RenderSurface>>,
    pub sprites: Option<Box<dyn SpriteCache>>,
    pub world: Option<Box<dyn WorldStore>>,

    /// The CD transport was started at some point and needs stopping.
    pub cd_needs_stop: bool,
    /// CD player hardware is in use and the platform must shut it down.
    pub cd_player_in_use: bool,

    /// Directory swept for engine temp files.
    pub temp_dir: PathBuf,
}

impl ShutdownSession {
    /// An empty session: no subsystems attached, temp sweep in the
    /// working directory.
    pub fn new(config: EgressConfig) -> Self {
        Self {
            config,
            checkpoint: Arc::new(CheckpointTracker::new()),
            debugger: None,
            recording: None,
            cd_transport: None,
            scripts: None,
            platform: None,
            audio: None,
            fonts: None,
            translation: None,
            graphics: None,
            sub_surface: None,
            sprites: None,
            world: None,
            cd_needs_stop: false,
            cd_player_in_use: false,
            temp_dir: PathBuf::from("."),
        }
    }

    pub fn with_debugger(mut self, debugger: Box<dyn DebuggerLink>) -> Self {
        self.debugger = Some(debugger);
        self
    }

    pub fn with_recording(mut self, recording: Box<dyn RecordingService>) -> Self {
        self.recording = Some(recording);
        self
    }

    pub fn with_cd_transport(mut self, cd: Box<dyn CdTransport>, needs_stop: bool) -> Self {
        self.cd_transport = Some(cd);
        self.cd_needs_stop = needs_stop;
        self
    }

    pub fn with_scripts(mut self, scripts: Box<dyn ScriptHost>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn with_platform(mut self, platform: Box<dyn PlatformLayer>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioMixer>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_fonts(mut self, fonts: Box<dyn FontRenderer>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn with_translation(mut self, translation: Box<dyn TranslationService>) -> Self {
        self.translation = Some(translation);
        self
    }

    pub fn with_graphics(mut self, graphics: Box<dyn GraphicsDriver>) -> Self {
        self.graphics = Some(graphics);
        self
    }

    pub fn with_sub_surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.sub_surface = Some(surface);
        self
    }

    pub fn with_sprites(mut self, sprites: Box<dyn SpriteCache>) -> Self {
        self.sprites = Some(sprites);
        self
    }

    pub fn with_world(mut self, world: Box<dyn WorldStore>) -> Self {
        self.world = Some(world);
        self
    }

    pub fn with_cd_player_in_use(mut self, in_use: bool) -> Self {
        self.cd_player_in_use = in_use;
        self
    }

    pub fn with_temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_session_has_no_handles() {
        let session = ShutdownSession::new(EgressConfig::default());
        assert!(session.debugger.is_none());
        assert!(session.platform.is_none());
        assert!(session.audio.is_none());
        assert!(!session.cd_needs_stop);
        assert!(!session.cd_player_in_use);
        assert_eq!(session.checkpoint.read(), 0);
    }

    #[test]
    fn builder_attaches_handles() {
        struct NullWorld;
        impl WorldStore for NullWorld {
            fn reset_all(&mut self) {}
        }

        let session = ShutdownSession::new(EgressConfig::default())
            .with_world(Box::new(NullWorld))
            .with_cd_player_in_use(true)
            .with_temp_dir("/tmp");
        assert!(session.world.is_some());
        assert!(session.cd_player_in_use);
        assert_eq!(session.temp_dir, PathBuf::from("/tmp"));
    }
}
