use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::playback::{Player, PlayerEvent};
use crate::audio::render::{RenderJob, RenderState};
use crate::error::ProcessError;
use crate::io::AudioFile;
use crate::settings::ProcessingSettings;

const OUTPUT_FILE_NAME: &str = "processed.wav";

/// Events delivered to the control thread via `poll_events`.
#[derive(Debug)]
pub enum ProcessorEvent {
    /// The background render finished; carries the destination path or the
    /// failure. Delivered exactly once per job.
    RenderFinished(Result<PathBuf, ProcessError>),
    /// The audition player reached the end of its file.
    PlaybackFinished,
}

/// Entry point for the front end: audition playback plus offline rendering.
///
/// At most one render job runs per processor at a time; a second request
/// while one is in flight fails with `ProcessError::Busy`. Each render
/// overwrites this processor's single cache output file. Playback and
/// rendering are independent paths sharing no audio state.
pub struct AudioProcessor {
    player: Player,
    output_dir: PathBuf,
    render_active: Arc<AtomicBool>,
    render_state: RenderState,
    render_events: Option<rtrb::Consumer<ProcessorEvent>>,
    render_thread: Option<JoinHandle<()>>,
}

impl AudioProcessor {
    /// Processor writing into the user cache directory.
    pub fn new() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
        Self::with_output_dir(base.join("fx-backend"))
    }

    /// Processor writing its output file into the given directory. The
    /// directory is created lazily on the first render.
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            player: Player::new(),
            output_dir: output_dir.into(),
            render_active: Arc::new(AtomicBool::new(false)),
            render_state: RenderState::Idle,
            render_events: None,
            render_thread: None,
        }
    }

    /// Path the next render will write to.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE_NAME)
    }

    /// Start auditioning a file, stopping any current playback first.
    pub fn play_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ProcessError> {
        self.player.play(path)
    }

    /// Stop the audition player. Idempotent.
    pub fn stop_player(&mut self) {
        self.player.stop();
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Sample rate of a file, without decoding its audio payload.
    pub fn file_sample_rate<P: AsRef<Path>>(&self, path: P) -> Result<u32, ProcessError> {
        AudioFile::probe_sample_rate(path)
    }

    /// Render a file through the effect chain, blocking until done.
    ///
    /// Intended to be called from a worker thread; the companion
    /// `process_file_in_background` does that wiring. Returns the
    /// destination path on success.
    pub fn process_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        settings: ProcessingSettings,
    ) -> Result<PathBuf, ProcessError> {
        self.acquire_render_slot()?;

        let result = self
            .prepare_destination()
            .and_then(|dest| RenderJob::new(path.as_ref(), dest, settings).run());

        self.render_state = match &result {
            Ok(_) => RenderState::Done,
            Err(_) => RenderState::Failed,
        };
        self.render_active.store(false, Ordering::Release);
        result
    }

    /// Render on a dedicated worker thread. Completion arrives exactly once
    /// as `ProcessorEvent::RenderFinished` through `poll_events`.
    pub fn process_file_in_background<P: AsRef<Path>>(
        &mut self,
        path: P,
        settings: ProcessingSettings,
    ) -> Result<(), ProcessError> {
        self.acquire_render_slot()?;

        let destination = match self.prepare_destination() {
            Ok(dest) => dest,
            Err(err) => {
                self.render_state = RenderState::Failed;
                self.render_active.store(false, Ordering::Release);
                return Err(err);
            }
        };

        let job = RenderJob::new(path.as_ref(), destination, settings);
        let (mut event_tx, event_rx) = rtrb::RingBuffer::<ProcessorEvent>::new(4);
        let active = Arc::clone(&self.render_active);

        let handle = thread::spawn(move || {
            let result = job.run();
            if let Err(err) = &result {
                log::error!("background render failed: {err}");
            }
            let _ = event_tx.push(ProcessorEvent::RenderFinished(result));
            active.store(false, Ordering::Release);
        });

        self.render_events = Some(event_rx);
        self.render_thread = Some(handle);
        Ok(())
    }

    /// Current render lifecycle state.
    pub fn render_state(&self) -> RenderState {
        self.render_state
    }

    /// Drain all pending events for the control thread.
    pub fn poll_events(&mut self) -> Vec<ProcessorEvent> {
        let mut events = Vec::new();

        while let Some(PlayerEvent::Finished) = self.player.poll_event() {
            events.push(ProcessorEvent::PlaybackFinished);
        }

        let mut render_finished = false;
        if let Some(rx) = &mut self.render_events {
            while let Ok(event) = rx.pop() {
                if let ProcessorEvent::RenderFinished(result) = &event {
                    self.render_state = if result.is_ok() {
                        RenderState::Done
                    } else {
                        RenderState::Failed
                    };
                    render_finished = true;
                }
                events.push(event);
            }
        }

        if render_finished {
            self.render_events = None;
            if let Some(handle) = self.render_thread.take() {
                let _ = handle.join();
            }
        }

        events
    }

    fn acquire_render_slot(&mut self) -> Result<(), ProcessError> {
        if self
            .render_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ProcessError::Busy);
        }
        self.render_state = RenderState::Rendering;
        Ok(())
    }

    fn prepare_destination(&self) -> Result<PathBuf, ProcessError> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| ProcessError::file_access(&self.output_dir, e))?;
        Ok(self.output_path())
    }
}

impl Default for AudioProcessor {
    fn default() -> Self {
        Self::new()
    }
}
