//! Audio-subsystem collaborator: the queued-sound data shape and a mixer
//! whose background decode worker stops as a single awaited operation
//! (signal, wait for the thread to finish, then release), so freeing the
//! shared playback queue can never race the worker.

use crate::subsystems::AudioMixer;
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// A decoded (or streamed) clip resource held in the audio cache.
#[derive(Debug)]
pub struct CachedClip {
    pub clip_index: i16,
    pub data: Vec<u8>,
}

/// One sound scheduled or playing.
///
/// Created and mutated only by the audio subsystem; its cached-clip
/// reference is released as part of the audio teardown step, never by the
/// shutdown coordinator directly.
#[derive(Debug, Clone)]
pub struct QueuedAudioItem {
    pub clip_index: i16,
    pub priority: i16,
    pub repeat: bool,
    pub cached_clip: Option<Arc<CachedClip>>,
}

enum DecodeCommand {
    Decode(QueuedAudioItem),
    Shutdown,
}

/// Handle to the background decode worker thread.
pub struct DecodeWorker {
    commands: Sender<DecodeCommand>,
    handle: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Spawn the worker. Decoded items land in `queue`.
    pub fn spawn(queue: Arc<Mutex<Vec<QueuedAudioItem>>>) -> Self {
        let (tx, rx) = unbounded();
        let handle = std::thread::Builder::new()
            .name("audio-decode".to_string())
            .spawn(move || {
                debug!("audio decode worker started");
                while let Ok(command) = rx.recv() {
                    match command {
                        DecodeCommand::Decode(item) => {
                            queue.lock().push(item);
                        }
                        DecodeCommand::Shutdown => break,
                    }
                }
                debug!("audio decode worker exited");
            })
            .expect("failed to spawn audio decode worker");

        Self {
            commands: tx,
            handle: Some(handle),
        }
    }

    /// Queue a sound for decoding.
    pub fn submit(&self, item: QueuedAudioItem) {
        let _ = self.commands.send(DecodeCommand::Decode(item));
    }

    /// Stop the worker and wait for it to finish.
    ///
    /// Signal and wait are one operation: when this returns, the thread
    /// has exited and nothing touches the shared queue any more.
    pub fn stop(mut self) {
        let _ = self.commands.send(DecodeCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("audio decode worker panicked before shutdown");
            }
        }
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }
}

/// Mixer state as shutdown sees it: cross-fade setting, music transport,
/// the shared playback queue, and the decode worker handle.
pub struct MixerState {
    crossfade_enabled: bool,
    music_playing: bool,
    queue: Arc<Mutex<Vec<QueuedAudioItem>>>,
    worker: Option<DecodeWorker>,
}

impl MixerState {
    pub fn new() -> Self {
        let queue = Arc::new(Mutex::new(Vec::new()));
        let worker = DecodeWorker::spawn(Arc::clone(&queue));
        Self {
            crossfade_enabled: true,
            music_playing: true,
            queue,
            worker: Some(worker),
        }
    }

    /// Without a background worker, for hosts that decode inline.
    pub fn without_worker() -> Self {
        Self {
            crossfade_enabled: true,
            music_playing: true,
            queue: Arc::new(Mutex::new(Vec::new())),
            worker: None,
        }
    }

    pub fn submit(&self, item: QueuedAudioItem) {
        match &self.worker {
            Some(worker) => worker.submit(item),
            None => self.queue.lock().push(item),
        }
    }

    pub fn queued_len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn music_playing(&self) -> bool {
        self.music_playing
    }
}

impl Default for MixerState {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioMixer for MixerState {
    fn disable_crossfade(&mut self) {
        self.crossfade_enabled = false;
    }

    fn stop_music(&mut self) {
        if self.music_playing {
            debug!("stopping music");
            self.music_playing = false;
        }
    }

    fn stop_decode_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
    }

    fn release_all(&mut self) {
        let released = {
            let mut queue = self.queue.lock();
            let n = queue.len();
            // Dropping the items drops the cached-clip references.
            queue.clear();
            n
        };
        if released > 0 {
            debug!(released, "released queued audio items");
        }
    }
}
