use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::SampleFormat as SymphoniaSampleFormat;

use crate::error::ProcessError;

/// Sample layout of the source file, carried through to the encoder so the
/// output preserves the input's fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// 16, 24 or 32.
    pub bits_per_sample: u16,
    /// True for 32-bit float sources; `bits_per_sample` is 32 in that case.
    pub float: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WaveformPeak {
    pub min: f32,
    pub max: f32,
}

/// A fully decoded audio file: interleaved f32 samples plus stream format.
pub struct AudioFile {
    pub data: Vec<f32>,
    pub channels: u32,
    pub sample_rate: u32,
    pub frames: u64,
    format: SourceFormat,
}

impl AudioFile {
    /// Load an audio file from disk and decode it to interleaved f32 samples.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProcessError> {
        let path = path.as_ref();

        let file = std::fs::File::open(path)
            .map_err(|e| ProcessError::file_access(path, e))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Hint the probe with the file extension
        let mut hint = Hint::new();
        if let Some(extension) = path.extension() {
            if let Some(ext_str) = extension.to_str() {
                hint.with_extension(ext_str);
            }
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ProcessError::UnsupportedFormat(format!("failed to probe file: {e}")))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProcessError::UnsupportedFormat("no audio tracks found".into()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let channels = codec_params
            .channels
            .ok_or_else(|| ProcessError::UnsupportedFormat("channel count not specified".into()))?
            .count() as u32;
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| ProcessError::UnsupportedFormat("sample rate not specified".into()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| ProcessError::UnsupportedFormat(format!("failed to create decoder: {e}")))?;

        let mut audio_data = Vec::new();
        let mut sample_buf = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::ResetRequired) => {
                    return Err(ProcessError::UnsupportedFormat(
                        "decoder reset mid-stream is not supported".into(),
                    ));
                }
                Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // End of file
                    break;
                }
                Err(e) => {
                    return Err(ProcessError::UnsupportedFormat(format!(
                        "failed to read packet: {e}"
                    )));
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    // Initialize sample buffer on first packet
                    if sample_buf.is_none() {
                        let spec = *decoded.spec();
                        let duration = decoded.capacity() as u64;
                        sample_buf = Some(SampleBuffer::<f32>::new(duration, spec));
                    }

                    if let Some(ref mut buf) = sample_buf {
                        buf.copy_interleaved_ref(decoded);
                        audio_data.extend_from_slice(buf.samples());
                    }
                }
                Err(Error::DecodeError(e)) => {
                    log::warn!("decode error in {}: {e}", path.display());
                    continue;
                }
                Err(e) => {
                    return Err(ProcessError::UnsupportedFormat(format!("decode failed: {e}")));
                }
            }
        }

        let frames = (audio_data.len() / channels as usize) as u64;
        let format = source_format_of(&codec_params, sample_rate, channels as u16);

        Ok(AudioFile {
            data: audio_data,
            channels,
            sample_rate,
            frames,
            format,
        })
    }

    /// Probe a file's sample rate without decoding the audio payload.
    pub fn probe_sample_rate<P: AsRef<Path>>(path: P) -> Result<u32, ProcessError> {
        let path = path.as_ref();

        let file = std::fs::File::open(path)
            .map_err(|e| ProcessError::file_access(path, e))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension() {
            if let Some(ext_str) = extension.to_str() {
                hint.with_extension(ext_str);
            }
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| ProcessError::UnsupportedFormat(format!("failed to probe file: {e}")))?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProcessError::UnsupportedFormat("no audio tracks found".into()))?;

        track
            .codec_params
            .sample_rate
            .ok_or_else(|| ProcessError::UnsupportedFormat("sample rate not specified".into()))
    }

    /// Sample layout to reproduce on the output side.
    pub fn source_format(&self) -> SourceFormat {
        self.format
    }

    /// Duration of the decoded audio in seconds.
    pub fn duration(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Downsampled min/max overview suitable for timeline display.
    pub fn waveform_overview(&self, target_peaks: usize) -> Vec<WaveformPeak> {
        if self.frames == 0 || target_peaks == 0 {
            return Vec::new();
        }

        let total_frames = self.frames as usize;
        let frames_per_peak = (total_frames / target_peaks).max(1);
        let actual_peaks = (total_frames + frames_per_peak - 1) / frames_per_peak;

        let mut peaks = Vec::with_capacity(actual_peaks);

        for peak_idx in 0..actual_peaks {
            let start_frame = peak_idx * frames_per_peak;
            let end_frame = ((peak_idx + 1) * frames_per_peak).min(total_frames);

            let mut min = 0.0f32;
            let mut max = 0.0f32;

            for frame_idx in start_frame..end_frame {
                for ch in 0..self.channels as usize {
                    let sample_idx = frame_idx * self.channels as usize + ch;
                    if sample_idx < self.data.len() {
                        let sample = self.data[sample_idx];
                        min = min.min(sample);
                        max = max.max(sample);
                    }
                }
            }

            peaks.push(WaveformPeak { min, max });
        }

        peaks
    }
}

/// Map the decoder's codec parameters onto the encoder-facing layouts we can
/// reproduce: 16/24/32-bit integer or 32-bit float. Unknown depths fall back
/// to 16-bit.
fn source_format_of(params: &CodecParameters, sample_rate: u32, channels: u16) -> SourceFormat {
    let float = matches!(
        params.sample_format,
        Some(SymphoniaSampleFormat::F32) | Some(SymphoniaSampleFormat::F64)
    );

    let bits_per_sample = if float {
        32
    } else {
        match params.bits_per_sample {
            Some(b) if b <= 16 => 16,
            Some(b) if b <= 24 => 24,
            Some(_) => 32,
            None => 16,
        }
    };

    SourceFormat {
        sample_rate,
        channels,
        bits_per_sample,
        float,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_a_file_access_error() {
        let result = AudioFile::load("/nonexistent/path/audio.wav");
        assert!(matches!(result, Err(ProcessError::FileAccess { .. })));
    }

    #[test]
    fn test_waveform_overview_of_empty_file() {
        let file = AudioFile {
            data: Vec::new(),
            channels: 2,
            sample_rate: 44100,
            frames: 0,
            format: SourceFormat {
                sample_rate: 44100,
                channels: 2,
                bits_per_sample: 16,
                float: false,
            },
        };
        assert!(file.waveform_overview(100).is_empty());
    }
}
