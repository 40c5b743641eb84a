use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::ProcessError;
use crate::io::SourceFormat;

/// Incremental WAV writer that reproduces the source sample layout.
///
/// Interleaved f32 blocks are converted to the source's bit depth on the way
/// out. The file is only valid once `finalize` succeeds; the render driver
/// deletes the destination on any earlier failure.
pub struct AudioWriter {
    writer: hound::WavWriter<BufWriter<File>>,
    format: SourceFormat,
    frames_written: u64,
}

impl AudioWriter {
    /// Create (or overwrite) the destination file and write the WAV header.
    pub fn create<P: AsRef<Path>>(path: P, format: SourceFormat) -> Result<Self, ProcessError> {
        let path = path.as_ref();

        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            sample_format: if format.float {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };

        let writer = hound::WavWriter::create(path, spec)
            .map_err(|e| map_hound_error(path, e))?;

        Ok(Self {
            writer,
            format,
            frames_written: 0,
        })
    }

    /// Append one block of interleaved f32 samples in range [-1.0, 1.0].
    pub fn write_block(&mut self, samples: &[f32]) -> Result<(), ProcessError> {
        match (self.format.float, self.format.bits_per_sample) {
            (true, _) => {
                for &sample in samples {
                    self.writer
                        .write_sample(sample)
                        .map_err(|e| ProcessError::Render(format!("failed to write sample: {e}")))?;
                }
            }
            (false, 16) => {
                for &sample in samples {
                    let pcm = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                    self.writer
                        .write_sample(pcm)
                        .map_err(|e| ProcessError::Render(format!("failed to write sample: {e}")))?;
                }
            }
            (false, 24) => {
                for &sample in samples {
                    let pcm = (sample.clamp(-1.0, 1.0) * 8_388_607.0) as i32;
                    self.writer
                        .write_sample(pcm)
                        .map_err(|e| ProcessError::Render(format!("failed to write sample: {e}")))?;
                }
            }
            (false, _) => {
                for &sample in samples {
                    let pcm = (sample.clamp(-1.0, 1.0) as f64 * 2_147_483_647.0) as i32;
                    self.writer
                        .write_sample(pcm)
                        .map_err(|e| ProcessError::Render(format!("failed to write sample: {e}")))?;
                }
            }
        }

        self.frames_written += (samples.len() / self.format.channels as usize) as u64;
        Ok(())
    }

    /// Frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush and patch the header sizes.
    pub fn finalize(self) -> Result<(), ProcessError> {
        self.writer
            .finalize()
            .map_err(|e| ProcessError::Render(format!("failed to finalize output: {e}")))
    }
}

fn map_hound_error(path: &Path, err: hound::Error) -> ProcessError {
    match err {
        hound::Error::IoError(e) => ProcessError::file_access(path, e),
        other => ProcessError::Render(format!("failed to open output: {other}")),
    }
}
