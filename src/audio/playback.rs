use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::ProcessError;
use crate::io::AudioFile;

/// Events emitted by the audition player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Playback ran to the end of the file. Emitted exactly once per
    /// play-to-completion; a manual stop emits nothing.
    Finished,
}

/// Pass-through audition player.
///
/// Decodes the whole file up front and streams it to a cpal output stream at
/// the file's native format, no effects applied. Completely separate from
/// the offline render path; the two share no state.
pub struct Player {
    stream: Option<cpal::Stream>,
    events: Option<rtrb::Consumer<PlayerEvent>>,
    playing: Arc<AtomicBool>,
    position_frames: Arc<AtomicU64>,
    sample_rate: u32,
    total_frames: u64,
}

impl Player {
    pub fn new() -> Self {
        Self {
            stream: None,
            events: None,
            playing: Arc::new(AtomicBool::new(false)),
            position_frames: Arc::new(AtomicU64::new(0)),
            sample_rate: 0,
            total_frames: 0,
        }
    }

    /// Start playing a file, stopping any playback already in progress.
    pub fn play<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ProcessError> {
        self.stop();

        let audio = AudioFile::load(path)?;
        let channels = audio.channels as usize;
        if channels == 0 {
            return Err(ProcessError::FormatMismatch("channel count is zero".into()));
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| ProcessError::EngineStart("no output device available".into()))?;

        let sample_format = device
            .default_output_config()
            .map_err(|e| ProcessError::EngineStart(format!("no output config: {e}")))?
            .sample_format();

        let config = cpal::StreamConfig {
            channels: audio.channels as u16,
            sample_rate: cpal::SampleRate(audio.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (event_tx, event_rx) = rtrb::RingBuffer::<PlayerEvent>::new(4);

        self.playing = Arc::new(AtomicBool::new(true));
        self.position_frames = Arc::new(AtomicU64::new(0));
        self.sample_rate = audio.sample_rate;
        self.total_frames = audio.frames;

        let source = PlaybackSource {
            samples: audio.data,
            pos: 0,
            channels,
            playing: Arc::clone(&self.playing),
            position_frames: Arc::clone(&self.position_frames),
            events: event_tx,
            finished_sent: false,
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, source)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, source)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, source)?,
            other => {
                return Err(ProcessError::EngineStart(format!(
                    "unsupported output sample format {other:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| ProcessError::EngineStart(format!("failed to start stream: {e}")))?;

        self.stream = Some(stream);
        self.events = Some(event_rx);
        Ok(())
    }

    /// Stop playback. Idempotent: stopping an idle player is a no-op.
    pub fn stop(&mut self) {
        self.stream = None;
        self.playing.store(false, Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    /// Current playback position in seconds.
    pub fn position_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.position_frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    /// Duration of the loaded file in seconds, 0 before the first `play`.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_frames as f64 / self.sample_rate as f64
    }

    /// Drain one pending player event, if any.
    pub fn poll_event(&mut self) -> Option<PlayerEvent> {
        self.events.as_mut().and_then(|rx| rx.pop().ok())
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback-side state: owned entirely by the audio thread.
struct PlaybackSource {
    samples: Vec<f32>,
    pos: usize,
    channels: usize,
    playing: Arc<AtomicBool>,
    position_frames: Arc<AtomicU64>,
    events: rtrb::Producer<PlayerEvent>,
    finished_sent: bool,
}

impl PlaybackSource {
    fn next_sample(&mut self) -> f32 {
        if self.pos < self.samples.len() {
            let value = self.samples[self.pos];
            self.pos += 1;
            value
        } else {
            if !self.finished_sent {
                self.finished_sent = true;
                self.playing.store(false, Ordering::Relaxed);
                let _ = self.events.push(PlayerEvent::Finished);
            }
            0.0
        }
    }

    fn update_position(&self) {
        self.position_frames
            .store((self.pos / self.channels) as u64, Ordering::Relaxed);
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut source: PlaybackSource,
) -> Result<cpal::Stream, ProcessError>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let err_fn = |err| log::error!("audio stream error: {err}");

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for sample in data.iter_mut() {
                    *sample = cpal::Sample::from_sample(source.next_sample());
                }
                source.update_position();
            },
            err_fn,
            None,
        )
        .map_err(|e| ProcessError::EngineStart(format!("failed to build stream: {e}")))
}
