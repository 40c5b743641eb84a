pub mod chain;
pub mod delay;
pub mod distortion;
pub mod effect_trait;
pub mod pitch_shift;
pub mod reverb;
pub mod varispeed;

pub use chain::EffectChain;
pub use delay::Delay;
pub use distortion::Distortion;
pub use effect_trait::Effect;
pub use pitch_shift::PitchShift;
pub use reverb::Reverb;
pub use varispeed::Varispeed;
