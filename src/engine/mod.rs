mod core;
mod messages;

pub use core::{AlertEngine, FLIP_QUEUE_DEPTH, prepare_pipelines};
pub use messages::FlipEvent;
