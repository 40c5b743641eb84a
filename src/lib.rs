// fx-backend
//
// Offline audio effects rendering backend. Decodes an audio file, drives it
// through a fixed chain of effect units (reverb, delay, distortion, pitch
// shift, playback rate), and writes the processed result to a new file.
// Also provides a pass-through audition player. Uses lock-free event queues,
// cpal for audio output, and symphonia for audio file decoding.

pub mod audio;
pub mod dsp;
pub mod effects;
pub mod error;
pub mod io;
pub mod settings;

// Re-export commonly used types
pub use audio::{AudioProcessor, Player, ProcessorEvent, RenderJob, RenderState};
pub use error::ProcessError;
pub use io::{AudioFile, AudioWriter, SourceFormat};
pub use settings::ProcessingSettings;
