//! Narrow interfaces to the subsystems the termination protocol tears
//! down. Each trait covers exactly what shutdown needs from its owner and
//! nothing more; every method on the teardown path is infallible by
//! contract (a subsystem that cannot stop gracefully still returns, and
//! the coordinator always advances).

/// Input-recording service: capture of player input for replay.
pub trait RecordingService: Send {
    fn stop(&mut self);
}

/// CD audio transport. Only stopped if the session says it was started.
pub trait CdTransport: Send {
    fn stop(&mut self);
}

/// The script virtual machine, as seen from shutdown.
pub trait ScriptHost: Send {
    /// Unregister and release every script-visible object.
    fn release_all_objects(&mut self);

    /// Depth-bounded description of the currently executing script call
    /// chain, newest frame first. Used only for diagnostics in alerts.
    fn call_stack(&self, max_frames: usize) -> String;
}

/// Platform abstraction layer (windowing, plugins, OS services).
pub trait PlatformLayer: Send {
    fn about_to_quit(&mut self);
    fn shutdown_plugins(&mut self);
    fn finished_using_graphics_mode(&mut self);
    fn shutdown_cd_player(&mut self);
    fn post_exit_hook(&mut self);
    fn display_alert(&mut self, text: &str);
}

/// Audio mixer and its background decode worker.
///
/// `stop_decode_worker` must not return until the worker has observably
/// stopped touching shared audio buffers; `release_all` is only called
/// after it returns.
pub trait AudioMixer: Send {
    fn disable_crossfade(&mut self);
    fn stop_music(&mut self);
    fn stop_decode_worker(&mut self);
    fn release_all(&mut self);
}

/// Font rendering backend.
pub trait FontRenderer: Send {
    fn shutdown(&mut self);
}

/// Translation/localization service.
pub trait TranslationService: Send {
    fn close(&mut self);
}

/// Graphics driver. The instance itself is released by dropping the boxed
/// handle once the display mode has been given back.
pub trait GraphicsDriver: Send {
    /// Swap the display back to the surface that was current before the
    /// engine took over.
    fn restore_prior_surface(&mut self);

    /// Release the display mode and fall back to the platform default.
    fn release_display_mode(&mut self);
}

/// A secondary render surface owned by the engine. Dropping the boxed
/// handle destroys it.
pub trait RenderSurface: Send {}

/// Debug-only audit of dynamically-allocated render resources.
pub trait SpriteCache: Send {
    /// Indices of dynamic sprites that were never deleted. Diagnostic
    /// only; shutdown logs them and moves on.
    fn dynamic_leaks(&self) -> Vec<u32>;
}

/// In-memory room/world state store.
pub trait WorldStore: Send {
    /// Wipe all room state by zeroing, not recursive free: child
    /// structures are shared and must not be deallocated twice.
    fn reset_all(&mut self);
}
