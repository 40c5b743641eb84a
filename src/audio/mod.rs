pub mod playback;
pub mod processor;
pub mod render;

pub use playback::{Player, PlayerEvent};
pub use processor::{AudioProcessor, ProcessorEvent};
pub use render::{RenderJob, RenderState, MAX_BLOCK_FRAMES};
