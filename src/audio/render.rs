use std::fs;
use std::path::PathBuf;

use crate::effects::EffectChain;
use crate::error::ProcessError;
use crate::io::{AudioFile, AudioWriter};
use crate::settings::ProcessingSettings;

/// The maximum number of frames rendered in any single pass through the
/// chain.
pub const MAX_BLOCK_FRAMES: usize = 4096;

/// Lifecycle of a render job. `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Rendering,
    Done,
    Failed,
}

/// One offline render: source, settings snapshot, destination.
///
/// A job is built per `process_file` call and consumed by running it; the
/// worker takes it by ownership so no state is shared with the control
/// thread. There is no cancellation: a started job runs to completion or
/// failure.
pub struct RenderJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub settings: ProcessingSettings,
}

impl RenderJob {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        settings: ProcessingSettings,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            settings,
        }
    }

    /// Decode the source, drive it through the chain in fixed-size blocks
    /// and write the result. On failure the destination file is removed, so
    /// the caller sees either a complete file or none at all.
    pub fn run(self) -> Result<PathBuf, ProcessError> {
        log::info!(
            "render: {} -> {}",
            self.source.display(),
            self.destination.display()
        );

        let audio = AudioFile::load(&self.source)?;
        let channels = audio.channels as usize;

        let mut chain = EffectChain::new(&self.settings, audio.sample_rate, channels)?;

        let mut writer = AudioWriter::create(&self.destination, audio.source_format())?;

        if let Err(err) = drive(&audio, &mut chain, &mut writer) {
            discard_partial(&self.destination);
            return Err(err);
        }

        let frames_written = writer.frames_written();
        if let Err(err) = writer.finalize() {
            discard_partial(&self.destination);
            return Err(err);
        }

        log::info!(
            "render done: {} frames in, {} frames out",
            audio.frames,
            frames_written
        );

        Ok(self.destination)
    }
}

/// Pull fixed-size blocks from the decoded source through the chain until
/// every source frame is consumed. The final partial block goes through the
/// same path; a zero-frame remainder ends the loop.
fn drive(
    audio: &AudioFile,
    chain: &mut EffectChain,
    writer: &mut AudioWriter,
) -> Result<(), ProcessError> {
    let channels = audio.channels as usize;
    let total_frames = audio.frames as usize;

    let mut block_out = Vec::with_capacity(MAX_BLOCK_FRAMES * channels * 4);
    let mut consumed = 0usize;

    while consumed < total_frames {
        let remaining = total_frames - consumed;
        let block_frames = remaining.min(MAX_BLOCK_FRAMES);

        let start = consumed * channels;
        let end = start + block_frames * channels;
        chain.process_block(&audio.data[start..end], &mut block_out);

        writer.write_block(&block_out)?;
        consumed += block_frames;
    }

    Ok(())
}

fn discard_partial(path: &std::path::Path) {
    if let Err(err) = fs::remove_file(path) {
        log::warn!("could not remove partial output {}: {err}", path.display());
    }
}
