pub mod camera;
pub mod debug;
pub mod geometry;
mod renderer;
pub mod scene;
pub mod tracer;
pub mod util;

pub use crate::renderer::{FrameBuffer, FrameLoop, FrameStats, FrameTracer, RenderSettings};
pub use camera::{Camera, CameraError, ViewProjection, ViewingVolume};
pub use debug::{DebugDraw, DebugMarker, Key, KeyAction, KeyEvent};
pub use scene::{Light, Material, Shape, ShapeSource};
pub use tracer::{TraceSettings, Tracer};
