use crate::effects::Effect;

// Schroeder topology: a parallel bank of damped comb filters followed by
// series all-pass filters. Delay lengths are in samples at the 48 kHz
// reference rate and get rescaled to the working rate at construction.
const COMB_DELAYS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];
const ALLPASS_DELAYS: [usize; 4] = [225, 556, 441, 341];
const REFERENCE_RATE: f32 = 48_000.0;

// Fixed medium-hall tuning: comb feedback sets the decay length, damping the
// high-frequency roll-off of the tail.
const COMB_FEEDBACK: f32 = 0.78;
const COMB_DAMPING: f32 = 0.35;
const ALLPASS_FEEDBACK: f32 = 0.5;
const COMB_SUM_SCALE: f32 = 0.015;

// Decorrelates the channels so the tail is not point-mono.
const CHANNEL_SPREAD: usize = 23;

struct CombFilter {
    buffer: Vec<f32>,
    filter_store: f32,
    write_pos: usize,
}

impl CombFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            filter_store: 0.0,
            write_pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];

        // One-pole lowpass in the feedback path
        self.filter_store = output * (1.0 - COMB_DAMPING) + self.filter_store * COMB_DAMPING;

        self.buffer[self.write_pos] = input + self.filter_store * COMB_FEEDBACK;

        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    fn mute(&mut self) {
        self.buffer.fill(0.0);
        self.filter_store = 0.0;
    }
}

struct AllPassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl AllPassFilter {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(1)],
            write_pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        let output = -input + delayed;

        self.buffer[self.write_pos] = input + delayed * ALLPASS_FEEDBACK;

        self.write_pos = (self.write_pos + 1) % self.buffer.len();

        output
    }

    fn mute(&mut self) {
        self.buffer.fill(0.0);
    }
}

struct ChannelReverb {
    combs: Vec<CombFilter>,
    allpasses: Vec<AllPassFilter>,
}

impl ChannelReverb {
    fn new(sample_rate: u32, spread: usize) -> Self {
        let scale = sample_rate as f32 / REFERENCE_RATE;
        let scaled = |base: usize| ((base + spread) as f32 * scale).round() as usize;

        Self {
            combs: COMB_DELAYS.iter().map(|&d| CombFilter::new(scaled(d))).collect(),
            allpasses: ALLPASS_DELAYS
                .iter()
                .map(|&d| AllPassFilter::new(scaled(d)))
                .collect(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= COMB_SUM_SCALE;

        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }

        output
    }

    fn mute(&mut self) {
        for comb in &mut self.combs {
            comb.mute();
        }
        for allpass in &mut self.allpasses {
            allpass.mute();
        }
    }
}

/// Medium-hall reverb, wet/dry blended by the mix percentage.
pub struct Reverb {
    mix: f32,
    channels: Vec<ChannelReverb>,
}

impl Reverb {
    /// `mix_percent` is clamped to 0..100.
    pub fn new(mix_percent: f32, sample_rate: u32, channels: usize) -> Self {
        Self {
            mix: mix_percent.clamp(0.0, 100.0) / 100.0,
            channels: (0..channels)
                .map(|ch| ChannelReverb::new(sample_rate, ch * CHANNEL_SPREAD))
                .collect(),
        }
    }
}

impl Effect for Reverb {
    fn process(&mut self, buffer: &mut [f32], channels: usize, _sample_rate: u32) {
        if channels == 0 || self.channels.len() != channels {
            return;
        }

        let dry_gain = 1.0 - self.mix;
        let wet_gain = self.mix;
        let frames = buffer.len() / channels;

        for frame in 0..frames {
            for ch in 0..channels {
                let idx = frame * channels + ch;
                let input = buffer[idx];
                let wet = self.channels[ch].process(input);
                buffer[idx] = input * dry_gain + wet * wet_gain;
            }
        }
    }

    fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.mute();
        }
    }

    fn name(&self) -> &str {
        "Reverb"
    }
}
