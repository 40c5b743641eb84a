use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::effects::Effect;

const TWO_PI: f32 = 2.0 * PI;
const FFT_SIZE: usize = 1024;
const HALF: usize = FFT_SIZE / 2;

// Combined shift ratio bounds: +/-2400 cents spans [0.25, 4], the secondary
// rate control spans [1/32, 32].
const MIN_RATIO: f32 = 1.0 / 32.0;
const MAX_RATIO: f32 = 32.0;

/// STFT phase-vocoder pitch shifter.
///
/// Shifts pitch without changing duration: each analysis frame is unwrapped
/// to true bin frequencies, the spectrum is remapped by the pitch ratio, and
/// phases are re-accumulated before overlap-add resynthesis. The shift is
/// `2^(cents/1200) * rate`; `overlap` sets the analysis oversampling factor
/// (higher means fewer artifacts and more compute).
pub struct PitchShift {
    ratio: f32,
    step: usize,
    oversample: f32,
    channels: Vec<VocoderChannel>,
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
}

impl PitchShift {
    /// `cents` is clamped to -2400..2400, `rate` to 1/32..32, `overlap` to
    /// 3..32.
    pub fn new(cents: f32, overlap: f32, rate: f32, channels: usize) -> Self {
        let cents = cents.clamp(-2400.0, 2400.0);
        let rate = rate.clamp(MIN_RATIO, MAX_RATIO);
        let ratio = (2.0f32.powf(cents / 1200.0) * rate).clamp(MIN_RATIO, MAX_RATIO);

        let oversample = overlap.clamp(3.0, 32.0).round() as usize;
        let step = (FFT_SIZE / oversample).max(1);

        let mut planner = FftPlanner::<f32>::new();
        let fft_forward = planner.plan_fft_forward(FFT_SIZE);
        let fft_inverse = planner.plan_fft_inverse(FFT_SIZE);

        Self {
            ratio,
            step,
            // Integer division above means the effective factor is not the
            // requested one; the phase math must use the effective value.
            oversample: FFT_SIZE as f32 / step as f32,
            channels: (0..channels).map(|_| VocoderChannel::new(step)).collect(),
            fft_forward,
            fft_inverse,
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }
}

impl Effect for PitchShift {
    fn process(&mut self, buffer: &mut [f32], channels: usize, sample_rate: u32) {
        if channels == 0 || self.channels.len() != channels {
            return;
        }

        let frames = buffer.len() / channels;
        let freq_per_bin = sample_rate as f32 / FFT_SIZE as f32;
        let expected_phase_inc = TWO_PI * self.step as f32 / FFT_SIZE as f32;

        for ch in 0..channels {
            let state = &mut self.channels[ch];
            state.scratch.resize(frames, 0.0);
            for frame in 0..frames {
                state.scratch[frame] = buffer[frame * channels + ch];
            }

            state.run(
                frames,
                self.ratio,
                self.oversample,
                freq_per_bin,
                expected_phase_inc,
                self.step,
                self.fft_forward.as_ref(),
                self.fft_inverse.as_ref(),
            );

            for frame in 0..frames {
                buffer[frame * channels + ch] = state.scratch[frame];
            }
        }
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }

    fn name(&self) -> &str {
        "PitchShift"
    }
}

struct VocoderChannel {
    fill: usize,
    latency: usize,
    input_fifo: Vec<f32>,
    output_fifo: Vec<f32>,
    output_accum: Vec<f32>,
    window: Vec<f32>,
    fft_buffer: Vec<Complex32>,
    last_phase: Vec<f32>,
    phase_sum: Vec<f32>,
    analysis_magn: Vec<f32>,
    analysis_freq: Vec<f32>,
    synthesis_magn: Vec<f32>,
    synthesis_freq: Vec<f32>,
    synthesis_weight: Vec<f32>,
    scratch: Vec<f32>,
}

impl VocoderChannel {
    fn new(step: usize) -> Self {
        let window = (0..FFT_SIZE)
            .map(|i| {
                let phase = TWO_PI * i as f32 / FFT_SIZE as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();

        Self {
            // Start at the latency point so the first frame fires once a full
            // window has been gathered.
            fill: FFT_SIZE - step,
            latency: FFT_SIZE - step,
            input_fifo: vec![0.0; FFT_SIZE],
            output_fifo: vec![0.0; FFT_SIZE],
            output_accum: vec![0.0; FFT_SIZE],
            window,
            fft_buffer: vec![Complex32::new(0.0, 0.0); FFT_SIZE],
            last_phase: vec![0.0; HALF + 1],
            phase_sum: vec![0.0; HALF + 1],
            analysis_magn: vec![0.0; HALF + 1],
            analysis_freq: vec![0.0; HALF + 1],
            synthesis_magn: vec![0.0; HALF + 1],
            synthesis_freq: vec![0.0; HALF + 1],
            synthesis_weight: vec![0.0; HALF + 1],
            scratch: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.fill = self.latency;
        self.input_fifo.fill(0.0);
        self.output_fifo.fill(0.0);
        self.output_accum.fill(0.0);
        self.last_phase.fill(0.0);
        self.phase_sum.fill(0.0);
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &mut self,
        frames: usize,
        ratio: f32,
        oversample: f32,
        freq_per_bin: f32,
        expected_phase_inc: f32,
        step: usize,
        fft_forward: &dyn Fft<f32>,
        fft_inverse: &dyn Fft<f32>,
    ) {
        let latency = self.latency;

        for i in 0..frames {
            let sample = self.scratch[i];
            self.input_fifo[self.fill] = sample;
            self.scratch[i] = self.output_fifo[self.fill - latency];
            self.fill += 1;

            if self.fill >= FFT_SIZE {
                self.process_frame(
                    ratio,
                    oversample,
                    freq_per_bin,
                    expected_phase_inc,
                    step,
                    fft_forward,
                    fft_inverse,
                );
                self.fill = latency;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_frame(
        &mut self,
        ratio: f32,
        oversample: f32,
        freq_per_bin: f32,
        expected_phase_inc: f32,
        step: usize,
        fft_forward: &dyn Fft<f32>,
        fft_inverse: &dyn Fft<f32>,
    ) {
        // Analysis: windowed FFT, then unwrap each bin's phase delta into its
        // true frequency.
        for k in 0..FFT_SIZE {
            self.fft_buffer[k] = Complex32::new(self.input_fifo[k] * self.window[k], 0.0);
        }
        fft_forward.process(&mut self.fft_buffer);

        for k in 0..=HALF {
            let bin = self.fft_buffer[k];
            let magn = 2.0 * bin.norm();
            let phase = bin.im.atan2(bin.re);

            let mut delta = phase - self.last_phase[k];
            self.last_phase[k] = phase;

            delta -= k as f32 * expected_phase_inc;

            // Wrap into +/- pi
            let mut qpd = (delta / PI).round() as i32;
            if qpd >= 0 {
                qpd += qpd & 1;
            } else {
                qpd -= qpd & 1;
            }
            delta -= PI * qpd as f32;

            let deviation = oversample * delta / TWO_PI;
            self.analysis_magn[k] = magn;
            self.analysis_freq[k] = (k as f32 + deviation) * freq_per_bin;
        }

        // Remap bins by the pitch ratio; colliding bins average their
        // frequencies, magnitude-summed.
        self.synthesis_magn.fill(0.0);
        self.synthesis_freq.fill(0.0);
        self.synthesis_weight.fill(0.0);

        for k in 0..=HALF {
            let index = (k as f32 * ratio).round() as usize;
            if index <= HALF {
                self.synthesis_magn[index] += self.analysis_magn[k];
                self.synthesis_freq[index] += self.analysis_freq[k] * ratio;
                self.synthesis_weight[index] += 1.0;
            }
        }

        for k in 0..=HALF {
            if self.synthesis_weight[k] > 0.0 {
                self.synthesis_freq[k] /= self.synthesis_weight[k];
            } else {
                self.synthesis_freq[k] = k as f32 * freq_per_bin;
            }
        }

        // Synthesis: re-accumulate phases and rebuild the spectrum.
        for k in 0..=HALF {
            let magn = self.synthesis_magn[k];
            let deviation = self.synthesis_freq[k] / freq_per_bin - k as f32;
            let phase_inc = TWO_PI * deviation / oversample + k as f32 * expected_phase_inc;
            self.phase_sum[k] += phase_inc;

            let phase = self.phase_sum[k];
            let re = magn * phase.cos();
            let im = magn * phase.sin();

            if k == 0 || k == HALF {
                self.fft_buffer[k] = Complex32::new(re, 0.0);
            } else {
                self.fft_buffer[k] = Complex32::new(re, im);
                self.fft_buffer[FFT_SIZE - k] = Complex32::new(re, -im);
            }
        }

        fft_inverse.process(&mut self.fft_buffer);

        // Overlap-add, normalized for FFT length, window power and overlap.
        let scale = 1.0 / FFT_SIZE as f32;
        let window_scale = 2.0 / (HALF as f32 * oversample);
        for k in 0..FFT_SIZE {
            let value = self.fft_buffer[k].re * scale;
            self.output_accum[k] += value * self.window[k] * window_scale;
        }

        self.output_fifo[..step].copy_from_slice(&self.output_accum[..step]);

        self.output_accum.copy_within(step..FFT_SIZE, 0);
        self.output_accum[FFT_SIZE - step..].fill(0.0);

        self.input_fifo.copy_within(step..FFT_SIZE, 0);
        self.input_fifo[FFT_SIZE - step..].fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44_100;

    fn sine(freq: f32, seconds: f32) -> Vec<f32> {
        let frames = (seconds * SAMPLE_RATE as f32) as usize;
        (0..frames)
            .map(|i| (TWO_PI * freq * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
            .collect()
    }

    /// Rough frequency estimate from zero crossings over the slice.
    fn estimate_frequency(samples: &[f32]) -> f32 {
        let crossings = samples
            .windows(2)
            .filter(|w| w[0] < 0.0 && w[1] >= 0.0)
            .count();
        crossings as f32 / (samples.len() as f32 / SAMPLE_RATE as f32)
    }

    fn shifted_frequency(cents: f32, rate: f32) -> f32 {
        let mut shifter = PitchShift::new(cents, 8.0, rate, 1);
        let mut buffer = sine(440.0, 2.0);
        for block in buffer.chunks_mut(4096) {
            shifter.process(block, 1, SAMPLE_RATE);
        }
        // Skip the first half: it contains the vocoder latency and onset.
        estimate_frequency(&buffer[buffer.len() / 2..])
    }

    #[test]
    fn test_octave_up_doubles_the_frequency() {
        let freq = shifted_frequency(1200.0, 1.0);
        assert!(freq > 700.0 && freq < 1050.0, "expected ~880 Hz, got {freq}");
    }

    #[test]
    fn test_octave_down_halves_the_frequency() {
        let freq = shifted_frequency(-1200.0, 1.0);
        assert!(freq > 150.0 && freq < 290.0, "expected ~220 Hz, got {freq}");
    }

    #[test]
    fn test_cents_and_rate_combine_multiplicatively() {
        // One octave up in cents, halved again by the rate control.
        let shifter = PitchShift::new(1200.0, 8.0, 0.5, 1);
        assert!((shifter.ratio() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_duration_is_preserved() {
        let mut shifter = PitchShift::new(700.0, 8.0, 1.0, 2);
        let mut buffer = vec![0.25f32; 4096 * 2];
        let len_before = buffer.len();
        shifter.process(&mut buffer, 2, SAMPLE_RATE);
        assert_eq!(buffer.len(), len_before);
        for &sample in &buffer {
            assert!(sample.is_finite());
        }
    }

    #[test]
    fn test_extreme_ratio_is_clamped() {
        let shifter = PitchShift::new(2400.0, 8.0, 32.0, 1);
        assert!(shifter.ratio() <= MAX_RATIO);
        let shifter = PitchShift::new(-2400.0, 8.0, 1.0 / 32.0, 1);
        assert!(shifter.ratio() >= MIN_RATIO);
    }
}
