pub mod audio_file;
pub mod audio_writer;

pub use audio_file::{AudioFile, SourceFormat, WaveformPeak};
pub use audio_writer::AudioWriter;
