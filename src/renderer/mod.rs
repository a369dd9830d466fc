mod frame_buffer;
mod machinery;
mod worker;

use std::num::{NonZeroU32, NonZeroUsize};

use bon::Builder;

use crate::tracer::TraceSettings;

pub use frame_buffer::FrameBuffer;
pub use machinery::{FrameLoop, FrameStats, FrameTracer};

const DEFAULT_TILE_SIZE: NonZeroU32 = NonZeroU32::new(32).unwrap();

#[derive(Copy, Clone, Debug, PartialEq, Builder)]
pub struct RenderSettings {
    /// Edge length of the square blocks handed out to workers.
    #[builder(default = DEFAULT_TILE_SIZE)]
    pub tile_size: NonZeroU32,

    /// Number of worker threads, one per core if not set.
    pub worker_count: Option<NonZeroUsize>,

    /// Paint the debug-marked pixel red in the output.
    #[builder(default)]
    pub highlight_marked: bool,

    #[builder(default)]
    pub trace: TraceSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings::builder().build()
    }
}
