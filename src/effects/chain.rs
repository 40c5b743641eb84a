use crate::effects::{Delay, Distortion, Effect, PitchShift, Reverb, Varispeed};
use crate::error::ProcessError;
use crate::settings::ProcessingSettings;

/// Fixed-order effect pipeline:
/// Reverb -> Delay -> Distortion -> PitchShift -> Varispeed.
///
/// The order matters for the sound (distortion after delay colors the echo
/// tail; the pitch shifter processes the distorted signal) and is kept
/// constant for reproducibility. Only units with non-neutral settings are
/// instantiated, so all-neutral settings leave every block untouched.
pub struct EffectChain {
    effects: Vec<Box<dyn Effect>>,
    varispeed: Option<Varispeed>,
    channels: usize,
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl EffectChain {
    /// Build the chain for one stream format from a settings snapshot.
    pub fn new(
        settings: &ProcessingSettings,
        sample_rate: u32,
        channels: usize,
    ) -> Result<Self, ProcessError> {
        if sample_rate == 0 {
            return Err(ProcessError::FormatMismatch("sample rate is zero".into()));
        }
        if channels == 0 {
            return Err(ProcessError::FormatMismatch("channel count is zero".into()));
        }

        let mut effects: Vec<Box<dyn Effect>> = Vec::new();

        if settings.reverb_mix > 0.0 {
            effects.push(Box::new(Reverb::new(settings.reverb_mix, sample_rate, channels)));
        }

        if settings.delay_mix > 0.0 {
            effects.push(Box::new(Delay::new(
                settings.delay_mix,
                settings.delay_time_ms,
                settings.delay_feedback,
                settings.delay_low_pass_cutoff,
                sample_rate,
                channels,
            )));
        }

        if settings.distortion_mix > 0.0 {
            effects.push(Box::new(Distortion::new(
                settings.distortion_mix,
                settings.distortion_pre_gain_db,
            )));
        }

        if !settings.pitch_is_neutral() {
            effects.push(Box::new(PitchShift::new(
                settings.pitch_cents,
                settings.pitch_overlap,
                settings.pitch_rate,
                channels,
            )));
        }

        let varispeed =
            (settings.play_rate != 1.0).then(|| Varispeed::new(settings.play_rate, channels));

        Ok(Self {
            effects,
            varispeed,
            channels,
            sample_rate,
            scratch: Vec::new(),
        })
    }

    /// True when no unit is active and blocks pass through bit-identical.
    pub fn is_transparent(&self) -> bool {
        self.effects.is_empty() && self.varispeed.is_none()
    }

    /// Rate factor of the final stage, 1.0 when varispeed is inactive.
    pub fn rate(&self) -> f64 {
        self.varispeed.as_ref().map_or(1.0, Varispeed::rate)
    }

    /// Run one block through every active unit. `output` is cleared and
    /// receives the produced frames; the count differs from the input only
    /// when varispeed is active.
    pub fn process_block(&mut self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();

        self.scratch.clear();
        self.scratch.extend_from_slice(input);

        for effect in &mut self.effects {
            effect.process(&mut self.scratch, self.channels, self.sample_rate);
        }

        match &mut self.varispeed {
            Some(varispeed) => varispeed.process(&self.scratch, output),
            None => output.extend_from_slice(&self.scratch),
        }
    }

    /// Clear every unit's state without rebuilding the chain.
    pub fn reset(&mut self) {
        for effect in &mut self.effects {
            effect.reset();
        }
        if let Some(varispeed) = &mut self.varispeed {
            varispeed.reset();
        }
    }
}
