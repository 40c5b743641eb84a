use crate::effects::Effect;

/// Waveshaping distortion: dB pre-gain into a tanh shaper, wet/dry blended
/// by the mix percentage.
pub struct Distortion {
    mix: f32,
    pre_gain: f32,
    post_gain: f32,
}

impl Distortion {
    /// `mix_percent` is clamped to 0..100, `pre_gain_db` to -80..+20 dB.
    pub fn new(mix_percent: f32, pre_gain_db: f32) -> Self {
        let pre_gain_db = pre_gain_db.clamp(-80.0, 20.0);
        let pre_gain = 10.0f32.powf(pre_gain_db / 20.0);

        // Compensate for the loudness increase of hot drive settings
        let post_gain = 1.0 / (1.0 + pre_gain * 0.2);

        Self {
            mix: mix_percent.clamp(0.0, 100.0) / 100.0,
            pre_gain,
            post_gain,
        }
    }

    #[inline]
    fn shape(&self, input: f32) -> f32 {
        (input * self.pre_gain).tanh() * self.post_gain
    }
}

impl Effect for Distortion {
    fn process(&mut self, buffer: &mut [f32], _channels: usize, _sample_rate: u32) {
        let dry_gain = 1.0 - self.mix;
        let wet_gain = self.mix;

        for sample in buffer.iter_mut() {
            let input = *sample;
            let wet = self.shape(input);
            *sample = input * dry_gain + wet * wet_gain;
        }
    }

    fn reset(&mut self) {
        // Stateless waveshaper
    }

    fn name(&self) -> &str {
        "Distortion"
    }
}
