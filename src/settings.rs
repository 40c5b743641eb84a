use serde::{Deserialize, Serialize};

/// Parameter snapshot for one render, one field per effect control.
///
/// Values are stored exactly as the front end supplied them; the effect units
/// clamp to their documented ranges when the chain is built, so an
/// out-of-range value is narrowed rather than applied raw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Reverb wet/dry blend as a percentage. 0 % is all dry.
    pub reverb_mix: f32,

    /// Delay wet/dry blend as a percentage. 0 % is all dry.
    pub delay_mix: f32,

    /// Delay line length in milliseconds. Valid range 0 to 2000 ms.
    pub delay_time_ms: f32,

    /// Share of the delayed signal fed back into the delay line, as a
    /// percentage. Valid range -100 % to 100 %.
    pub delay_feedback: f32,

    /// Cutoff above which the fed-back signal rolls off, in hertz.
    /// Valid range 10 Hz through half the sample rate.
    pub delay_low_pass_cutoff: f32,

    /// Distortion wet/dry blend as a percentage. 0 % is all dry.
    pub distortion_mix: f32,

    /// Gain applied before the waveshaper, in decibels. Valid range
    /// -80 dB to +20 dB.
    pub distortion_pre_gain_db: f32,

    /// Pitch shift in cents; 100 cents is one semitone, 1200 one octave.
    /// Valid range -2400 to 2400.
    pub pitch_cents: f32,

    /// Analysis window overlap factor for the pitch shifter. Higher values
    /// produce fewer artifacts at more compute. Valid range 3.0 to 32.0.
    pub pitch_overlap: f32,

    /// Secondary pitch ratio combined multiplicatively with the cents-based
    /// shift. Valid range 1/32 to 32.
    pub pitch_rate: f32,

    /// Playback rate factor; changes duration. Valid range 0.25 to 4.0.
    pub play_rate: f32,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            reverb_mix: 0.0,
            delay_mix: 0.0,
            delay_time_ms: 0.0,
            delay_feedback: 50.0,
            delay_low_pass_cutoff: 15_000.0,
            distortion_mix: 0.0,
            distortion_pre_gain_db: -6.0,
            pitch_cents: 0.0,
            pitch_overlap: 8.0,
            pitch_rate: 1.0,
            play_rate: 1.0,
        }
    }
}

impl ProcessingSettings {
    /// True when the pitch shifter would leave the signal untouched.
    pub fn pitch_is_neutral(&self) -> bool {
        self.pitch_cents == 0.0 && self.pitch_rate == 1.0
    }

    /// True when every unit is at its zero-effect value, so the whole chain
    /// is a pass-through.
    pub fn is_neutral(&self) -> bool {
        self.reverb_mix <= 0.0
            && self.delay_mix <= 0.0
            && self.distortion_mix <= 0.0
            && self.pitch_is_neutral()
            && self.play_rate == 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_neutral() {
        let settings = ProcessingSettings::default();
        assert!(settings.is_neutral());
        assert!(settings.pitch_is_neutral());
    }

    #[test]
    fn test_any_active_unit_breaks_neutrality() {
        let mut settings = ProcessingSettings::default();
        settings.reverb_mix = 30.0;
        assert!(!settings.is_neutral());

        let mut settings = ProcessingSettings::default();
        settings.pitch_rate = 2.0;
        assert!(!settings.is_neutral());

        let mut settings = ProcessingSettings::default();
        settings.play_rate = 0.5;
        assert!(!settings.is_neutral());
    }

    #[test]
    fn test_feedback_alone_stays_neutral() {
        // Feedback and cutoff only matter once the delay is mixed in.
        let mut settings = ProcessingSettings::default();
        settings.delay_feedback = 100.0;
        settings.delay_time_ms = 500.0;
        assert!(settings.is_neutral());
    }
}
