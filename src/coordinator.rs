//! The shutdown coordinator: drives the fixed teardown order, classifies
//! the quit reason, displays the alert, and terminates the process.
//!
//! Step order (each step tolerates its subsystem being absent):
//! debugger notice -> recording -> CD transport -> script objects ->
//! platform pre-quit + plugins -> leak audit -> prior surface -> graphics
//! mode handback -> CD player -> audio (crossfade, music, decode worker,
//! release) -> classification -> fonts -> secondary surface ->
//! translation -> display mode -> alert -> graphics driver -> post-exit
//! hook -> world state -> temp files -> exit.

use crate::checkpoint::step;
use crate::classify::{classify, ExitCategory};
use crate::debugger::notify_debugger;
use crate::reason::QuitReason;
use crate::session::ShutdownSession;
use crate::tempfiles::sweep_temp_files;
use tracing::{info, warn};

/// The one exit status this protocol uses. Abnormal termination is
/// communicated through the alert text, never the process status.
pub const EXIT_NORMAL: i32 = 0;

/// What a completed teardown looked like. Only observable through
/// [`run`]; [`terminate`] exits the process instead of returning it.
#[derive(Debug)]
pub struct ShutdownOutcome {
    pub category: ExitCategory,
    pub silent: bool,
    /// Final alert text for non-silent categories.
    pub alert: Option<String>,
    /// Whether the platform was actually asked to display it.
    pub alert_displayed: bool,
    pub handled_by_debugger: bool,
    pub temp_files_removed: usize,
}

/// Tear the engine down and exit the process. Never returns.
///
/// May be called from any point in the running engine, including from an
/// error handler; the session carries everything the sequence needs, so
/// no subsystem is assumed to be in a consistent state.
pub fn terminate(session: ShutdownSession, raw_reason: &str) -> ! {
    let outcome = run(session, raw_reason);
    info!(category = ?outcome.category, "exiting with normal status");
    std::process::exit(EXIT_NORMAL)
}

/// The full teardown sequence, separated from process exit so it can be
/// exercised in tests. Always runs to completion; individual steps never
/// fail observably.
pub fn run(mut session: ShutdownSession, raw_reason: &str) -> ShutdownOutcome {
    // Private bounded copy first: the reason may live inside a plugin or
    // script that this very sequence is about to release.
    let reason = QuitReason::with_capacity(raw_reason, session.config.buffers.reason_capacity);
    info!(reason = reason.as_str(), "engine termination started");

    let handled_by_debugger = notify_debugger(&mut session.debugger, &reason);

    session.checkpoint.mark(step::RECORDING);
    if let Some(recording) = session.recording.as_mut() {
        recording.stop();
    }

    if session.cd_needs_stop {
        if let Some(cd) = session.cd_transport.as_mut() {
            cd.stop();
        }
    }

    session.checkpoint.mark(step::SCRIPTS);
    if let Some(scripts) = session.scripts.as_mut() {
        scripts.release_all_objects();
    }

    if let Some(platform) = session.platform.as_mut() {
        platform.about_to_quit();
    }
    session.checkpoint.mark(step::PLUGINS);
    if let Some(platform) = session.platform.as_mut() {
        platform.shutdown_plugins();
    }

    audit_dynamic_sprites(&session, &reason);

    if let Some(graphics) = session.graphics.as_mut() {
        graphics.restore_prior_surface();
    }
    if let Some(platform) = session.platform.as_mut() {
        platform.finished_using_graphics_mode();
    }
    if session.cd_player_in_use {
        if let Some(platform) = session.platform.as_mut() {
            platform.shutdown_cd_player();
        }
    }

    session.checkpoint.mark(step::AUDIO);
    session.checkpoint.mark(step::AUDIO_STOP);
    if let Some(audio) = session.audio.as_mut() {
        audio.disable_crossfade();
        audio.stop_music();
        // Stop is signal-then-join: when it returns, the decode worker
        // has exited and releasing shared buffers cannot race it.
        audio.stop_decode_worker();
        audio.release_all();
    }

    // Classify while the script host can still describe its call stack.
    session.checkpoint.mark(step::CLASSIFY);
    let snapshot = session
        .scripts
        .as_ref()
        .map(|s| s.call_stack(session.config.buffers.stack_frame_limit))
        .unwrap_or_default();
    let mut classification = classify(&reason, &snapshot, session.config.buffers.alert_capacity);
    if classification.append_reason_tail {
        classification
            .alert
            .push_str(reason.tail(classification.sentinel_len));
        classification.alert.push_str("\n");
    }

    session.checkpoint.mark(step::FONTS);
    if let Some(fonts) = session.fonts.as_mut() {
        fonts.shutdown();
    }

    // Dropping the handle destroys the secondary render surface.
    drop(session.sub_surface.take());

    session.checkpoint.mark(step::TRANSLATION);
    if let Some(translation) = session.translation.as_mut() {
        translation.close();
    }

    session.checkpoint.mark(step::GRAPHICS_MODE);
    if let Some(graphics) = session.graphics.as_mut() {
        graphics.release_display_mode();
    }

    // The window still exists here, so the alert is shown before the
    // driver instance goes away.
    let mut alert_displayed = false;
    if !classification.silent && !handled_by_debugger {
        if let Some(platform) = session.platform.as_mut() {
            platform.display_alert(classification.alert.as_str());
            alert_displayed = true;
        }
    }

    drop(session.graphics.take());

    if let Some(platform) = session.platform.as_mut() {
        platform.post_exit_hook();
    }

    session.checkpoint.mark(step::WORLD_STATE);
    if let Some(world) = session.world.as_mut() {
        world.reset_all();
    }

    let temp_files_removed = sweep_temp_files(
        &session.temp_dir,
        &session.config.cleanup.temp_prefix,
        &session.config.cleanup.temp_suffix,
    );

    info!("***** engine has shut down");
    session.checkpoint.mark(step::EXIT);

    let silent = classification.silent;
    ShutdownOutcome {
        category: classification.category,
        silent,
        alert: if silent {
            None
        } else {
            Some(classification.alert.into_string())
        },
        alert_displayed,
        handled_by_debugger,
        temp_files_removed,
    }
}

/// On a normal exit in debug mode, report dynamic render resources that
/// were never deleted. Diagnostic only; never blocks the exit.
fn audit_dynamic_sprites(session: &ShutdownSession, reason: &QuitReason) {
    if reason.first() != Some('|')
        || !session.config.diagnostics.debug_mode
        || !session.config.diagnostics.leak_check_at_exit
    {
        return;
    }
    if let Some(sprites) = session.sprites.as_ref() {
        for index in sprites.dynamic_leaks() {
            warn!(sprite = index, "dynamic sprite was never deleted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointTracker;
    use crate::config::EgressConfig;
    use crate::debugger::DebuggerLink;
    use crate::subsystems::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Shared call recorder; each probe logs its calls (and the checkpoint
    /// value at the time, where the test cares about ordering).
    type Trace = Arc<Mutex<Vec<String>>>;

    fn trace() -> Trace {
        Arc::new(Mutex::new(Vec::new()))
    }

    struct Probe {
        trace: Trace,
        name: &'static str,
    }

    impl Probe {
        fn log(&self, call: &str) {
            self.trace.lock().push(format!("{}.{}", self.name, call));
        }
    }

    impl RecordingService for Probe {
        fn stop(&mut self) {
            self.log("stop");
        }
    }

    impl CdTransport for Probe {
        fn stop(&mut self) {
            self.log("stop");
        }
    }

    impl ScriptHost for Probe {
        fn release_all_objects(&mut self) {
            self.log("release_all_objects");
        }

        fn call_stack(&self, max_frames: usize) -> String {
            format!("in \"room.asc\" line 40 (top {max_frames} frames)")
        }
    }

    impl PlatformLayer for Probe {
        fn about_to_quit(&mut self) {
            self.log("about_to_quit");
        }
        fn shutdown_plugins(&mut self) {
            self.log("shutdown_plugins");
        }
        fn finished_using_graphics_mode(&mut self) {
            self.log("finished_using_graphics_mode");
        }
        fn shutdown_cd_player(&mut self) {
            self.log("shutdown_cd_player");
        }
        fn post_exit_hook(&mut self) {
            self.log("post_exit_hook");
        }
        fn display_alert(&mut self, text: &str) {
            self.trace.lock().push(format!("platform.alert:{text}"));
        }
    }

    impl AudioMixer for Probe {
        fn disable_crossfade(&mut self) {
            self.log("disable_crossfade");
        }
        fn stop_music(&mut self) {
            self.log("stop_music");
        }
        fn stop_decode_worker(&mut self) {
            self.log("stop_decode_worker");
        }
        fn release_all(&mut self) {
            self.log("release_all");
        }
    }

    impl FontRenderer for Probe {
        fn shutdown(&mut self) {
            self.log("shutdown");
        }
    }

    impl TranslationService for Probe {
        fn close(&mut self) {
            self.log("close");
        }
    }

    impl GraphicsDriver for Probe {
        fn restore_prior_surface(&mut self) {
            self.log("restore_prior_surface");
        }
        fn release_display_mode(&mut self) {
            self.log("release_display_mode");
        }
    }

    impl WorldStore for Probe {
        fn reset_all(&mut self) {
            self.log("reset_all");
        }
    }

    impl SpriteCache for Probe {
        fn dynamic_leaks(&self) -> Vec<u32> {
            self.log("dynamic_leaks");
            vec![3, 8]
        }
    }

    struct SurfaceProbe {
        trace: Trace,
    }

    impl RenderSurface for SurfaceProbe {}

    impl Drop for SurfaceProbe {
        fn drop(&mut self) {
            self.trace.lock().push("sub_surface.dropped".to_string());
        }
    }

    struct DebuggerProbe {
        trace: Trace,
        claims_handled: bool,
    }

    impl DebuggerLink for DebuggerProbe {
        fn forward_exception(&mut self, text: &str) -> bool {
            self.trace.lock().push(format!("debugger.exception:{text}"));
            self.claims_handled
        }
        fn send_exit(&mut self) {
            self.trace.lock().push("debugger.exit".to_string());
        }
        fn shutdown(&mut self) {
            self.trace.lock().push("debugger.shutdown".to_string());
        }
    }

    fn probe(trace: &Trace, name: &'static str) -> Box<Probe> {
        Box::new(Probe {
            trace: Arc::clone(trace),
            name,
        })
    }

    fn full_session(trace: &Trace) -> ShutdownSession {
        ShutdownSession::new(EgressConfig::default())
            .with_recording(probe(trace, "recording"))
            .with_cd_transport(probe(trace, "cd"), true)
            .with_scripts(probe(trace, "scripts"))
            .with_platform(probe(trace, "platform"))
            .with_audio(probe(trace, "audio"))
            .with_fonts(probe(trace, "fonts"))
            .with_translation(probe(trace, "translation"))
            .with_graphics(probe(trace, "graphics"))
            .with_sub_surface(Box::new(SurfaceProbe {
                trace: Arc::clone(trace),
            }))
            .with_world(probe(trace, "world"))
            .with_cd_player_in_use(true)
            .with_temp_dir(std::env::temp_dir())
    }

    #[test]
    fn full_teardown_runs_in_fixed_order() {
        let trace = trace();
        let outcome = run(full_session(&trace), "|Thanks for playing!");

        assert_eq!(
            *trace.lock(),
            vec![
                "recording.stop",
                "cd.stop",
                "scripts.release_all_objects",
                "platform.about_to_quit",
                "platform.shutdown_plugins",
                "graphics.restore_prior_surface",
                "platform.finished_using_graphics_mode",
                "platform.shutdown_cd_player",
                "audio.disable_crossfade",
                "audio.stop_music",
                "audio.stop_decode_worker",
                "audio.release_all",
                "fonts.shutdown",
                "sub_surface.dropped",
                "translation.close",
                "graphics.release_display_mode",
                "platform.post_exit_hook",
                "world.reset_all",
            ]
        );
        assert!(outcome.silent);
        assert!(outcome.alert.is_none());
    }

    #[test]
    fn normal_exit_never_reaches_display_alert() {
        let trace = trace();
        let outcome = run(full_session(&trace), "|bye");
        assert!(outcome.silent);
        assert!(!outcome.alert_displayed);
        assert!(!trace.lock().iter().any(|c| c.starts_with("platform.alert")));
    }

    #[test]
    fn abort_key_shows_fixed_message_without_snapshot() {
        let trace = trace();
        let outcome = run(full_session(&trace), "!|");
        assert_eq!(outcome.category, ExitCategory::PlayerAbort);
        assert!(outcome.alert_displayed);
        let alert = outcome.alert.unwrap();
        assert_eq!(alert, "Abort key pressed.\n\n");
        assert!(!alert.contains("room.asc"));
        // Exception-forward path must not be taken even with a debugger.
        assert!(!trace
            .lock()
            .iter()
            .any(|c| c.starts_with("debugger.exception")));
    }

    #[test]
    fn script_fatal_alert_has_template_snapshot_and_detail() {
        let trace = trace();
        let outcome = run(full_session(&trace), "!?script text");
        assert_eq!(outcome.category, ExitCategory::ScriptFatal);
        let alert = outcome.alert.unwrap();
        let template_at = alert
            .find("fatal error has been generated by the game's own logic")
            .unwrap();
        let stack_at = alert.find("room.asc").unwrap();
        let detail_at = alert.find("script text").unwrap();
        assert!(template_at < stack_at && stack_at < detail_at);
    }

    #[test]
    fn script_error_alert_includes_error_separator() {
        let trace = trace();
        let outcome = run(full_session(&trace), "!some text");
        assert_eq!(outcome.category, ExitCategory::ScriptError);
        let alert = outcome.alert.unwrap();
        assert!(alert.contains("room.asc"));
        assert!(alert.contains("\nError: some text"));
    }

    #[test]
    fn warning_as_error_alert_has_snapshot_and_text() {
        let trace = trace();
        let outcome = run(full_session(&trace), "%warn text");
        assert_eq!(outcome.category, ExitCategory::WarningAsError);
        let alert = outcome.alert.unwrap();
        let stack_at = alert.find("room.asc").unwrap();
        let detail_at = alert.find("warn text").unwrap();
        assert!(stack_at < detail_at);
    }

    #[test]
    fn internal_error_alert_has_no_snapshot() {
        let trace = trace();
        let outcome = run(full_session(&trace), "oops");
        assert_eq!(outcome.category, ExitCategory::Internal);
        let alert = outcome.alert.unwrap();
        assert!(!alert.contains("room.asc"));
        assert!(alert.contains("\nError: oops"));
    }

    #[test]
    fn empty_session_completes_and_checkpoint_reaches_exit() {
        let session = ShutdownSession::new(EgressConfig::default())
            .with_temp_dir(std::env::temp_dir());
        let checkpoint = Arc::clone(&session.checkpoint);
        let outcome = run(session, "!crashed with nothing initialized");
        assert_eq!(outcome.category, ExitCategory::ScriptError);
        assert!(!outcome.alert_displayed); // no platform to display on
        assert_eq!(checkpoint.read(), step::EXIT);
    }

    /// Records the checkpoint value observed at each teardown call, so the
    /// fixed mark-before-step ordering is checked end to end.
    struct CheckpointWitness {
        seen: Trace,
        checkpoint: Arc<CheckpointTracker>,
    }

    impl CheckpointWitness {
        fn log(&self, name: &str) {
            self.seen
                .lock()
                .push(format!("{}@{}", name, self.checkpoint.read()));
        }
    }

    impl RecordingService for CheckpointWitness {
        fn stop(&mut self) {
            self.log("recording");
        }
    }

    impl AudioMixer for CheckpointWitness {
        fn disable_crossfade(&mut self) {
            // First audio action; must already see the stop-step mark.
            self.log("audio");
        }
        fn stop_music(&mut self) {}
        fn stop_decode_worker(&mut self) {}
        fn release_all(&mut self) {}
    }

    impl FontRenderer for CheckpointWitness {
        fn shutdown(&mut self) {
            self.log("fonts");
        }
    }

    impl TranslationService for CheckpointWitness {
        fn close(&mut self) {
            self.log("translation");
        }
    }

    impl WorldStore for CheckpointWitness {
        fn reset_all(&mut self) {
            self.log("world");
        }
    }

    #[test]
    fn checkpoint_is_marked_before_each_step() {
        let seen = trace();
        let session = ShutdownSession::new(EgressConfig::default());
        let witness = |cp: &Arc<CheckpointTracker>| CheckpointWitness {
            seen: Arc::clone(&seen),
            checkpoint: Arc::clone(cp),
        };
        let cp = Arc::clone(&session.checkpoint);
        let session = session
            .with_recording(Box::new(witness(&cp)))
            .with_audio(Box::new(witness(&cp)))
            .with_fonts(Box::new(witness(&cp)))
            .with_translation(Box::new(witness(&cp)))
            .with_world(Box::new(witness(&cp)))
            .with_temp_dir(std::env::temp_dir());

        run(session, "|done");

        assert_eq!(
            *seen.lock(),
            vec![
                format!("recording@{}", step::RECORDING),
                format!("audio@{}", step::AUDIO_STOP),
                format!("fonts@{}", step::FONTS),
                format!("translation@{}", step::TRANSLATION),
                format!("world@{}", step::WORLD_STATE),
            ]
        );
    }

    #[test]
    fn cd_transport_untouched_unless_started() {
        let trace = trace();
        let mut session = full_session(&trace);
        session.cd_needs_stop = false;
        run(session, "|bye");
        assert!(!trace.lock().contains(&"cd.stop".to_string()));
    }

    #[test]
    fn cd_player_hardware_untouched_unless_in_use() {
        let trace = trace();
        let mut session = full_session(&trace);
        session.cd_player_in_use = false;
        run(session, "|bye");
        assert!(!trace
            .lock()
            .contains(&"platform.shutdown_cd_player".to_string()));
    }

    #[test]
    fn debugger_handled_error_suppresses_platform_alert() {
        let trace = trace();
        let session = full_session(&trace).with_debugger(Box::new(DebuggerProbe {
            trace: Arc::clone(&trace),
            claims_handled: true,
        }));
        let outcome = run(session, "!boom");
        assert!(outcome.handled_by_debugger);
        assert!(!outcome.alert_displayed);
        assert!(!trace.lock().iter().any(|c| c.starts_with("platform.alert")));
        // The debugger still got the exception and the exit notice.
        let calls = trace.lock();
        assert!(calls.contains(&"debugger.exception:boom".to_string()));
        assert!(calls.contains(&"debugger.exit".to_string()));
        assert!(calls.contains(&"debugger.shutdown".to_string()));
    }

    #[test]
    fn unhandled_debugger_error_still_shows_alert() {
        let trace = trace();
        let session = full_session(&trace).with_debugger(Box::new(DebuggerProbe {
            trace: Arc::clone(&trace),
            claims_handled: false,
        }));
        let outcome = run(session, "!boom");
        assert!(!outcome.handled_by_debugger);
        assert!(outcome.alert_displayed);
    }

    #[test]
    fn overlong_reason_is_truncated_but_still_classified() {
        let trace = trace();
        let raw = "!?".to_string() + &"detail ".repeat(2000);
        let outcome = run(full_session(&trace), &raw);
        assert_eq!(outcome.category, ExitCategory::ScriptFatal);
        let alert = outcome.alert.unwrap();
        assert!(alert.len() <= EgressConfig::default().buffers.alert_capacity + 1);
    }

    #[test]
    fn temp_files_are_swept_on_exit() {
        let trace = trace();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("~eg042.tmp"), b"scratch").unwrap();
        std::fs::write(dir.path().join("keep.dat"), b"keep").unwrap();

        let session = full_session(&trace).with_temp_dir(dir.path());
        let outcome = run(session, "|bye");
        assert_eq!(outcome.temp_files_removed, 1);
        assert!(!dir.path().join("~eg042.tmp").exists());
        assert!(dir.path().join("keep.dat").exists());
    }

    fn leak_audit_ran(reason: &str, debug_mode: bool) -> bool {
        let trace = trace();
        let mut config = EgressConfig::default();
        config.diagnostics.debug_mode = debug_mode;
        let session = ShutdownSession::new(config)
            .with_sprites(probe(&trace, "sprites"))
            .with_temp_dir(std::env::temp_dir());
        run(session, reason);
        let calls = trace.lock();
        calls.contains(&"sprites.dynamic_leaks".to_string())
    }

    #[test]
    fn sprite_leak_audit_only_runs_on_debug_normal_exit() {
        assert!(leak_audit_ran("|bye", true));
        // Release build: normal exit does not query the cache.
        assert!(!leak_audit_ran("|bye", false));
        // Debug build, but the exit is an error: no audit either.
        assert!(!leak_audit_ran("!err", true));
        assert!(!leak_audit_ran("oops", true));
    }

    #[test]
    fn leak_check_can_be_disabled_in_config() {
        let trace = trace();
        let mut config = EgressConfig::default();
        config.diagnostics.debug_mode = true;
        config.diagnostics.leak_check_at_exit = false;
        let session = ShutdownSession::new(config)
            .with_sprites(probe(&trace, "sprites"))
            .with_temp_dir(std::env::temp_dir());
        run(session, "|bye");
        assert!(!trace
            .lock()
            .contains(&"sprites.dynamic_leaks".to_string()));
    }

    #[test]
    fn real_mixer_decode_worker_is_joined_before_release() {
        use crate::audio::MixerState;
        let trace = trace();
        let session = full_session(&trace);
        // Swap the probe mixer for the real one with a live worker thread.
        let mut session = session;
        session.audio = Some(Box::new(MixerState::new()));
        let outcome = run(session, "|bye");
        assert!(outcome.silent);
    }
}
