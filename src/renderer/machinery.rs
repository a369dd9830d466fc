use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::anyhow;
use bon::bon;
use core_affinity::CoreId;
use image::RgbaImage;

use crate::{
    camera::{Camera, CameraError, ViewingVolume},
    debug::{DebugDraw, DebugMarker, draw_ray_path},
    geometry::{ScreenBlock, ScreenPoint, ScreenSize},
    renderer::{FrameBuffer, RenderSettings, worker::Worker},
    scene::{Light, ShapeSource, SnapshotCache},
    tracer::Tracer,
    util::Rgba,
};

const CAMERA_COLOR: Rgba = Rgba {
    r: 0.0,
    g: 0.0,
    b: 1.0,
    a: 1.0,
};
const CAMERA_POINT_SIZE: f32 = 10.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameStats {
    /// Sequence number of the frame, starting at 1.
    pub frame: u64,
    /// Number of objects in the snapshot the frame was traced against.
    pub objects: usize,
    pub elapsed: Duration,
}

/// Renders whole frames of a live scene into a shared frame buffer.
pub struct FrameTracer {
    source: Arc<dyn ShapeSource>,
    viewing_volume: Arc<dyn ViewingVolume>,
    lights: Vec<Light>,
    settings: RenderSettings,

    snapshots: SnapshotCache,
    frame_buffer: Arc<FrameBuffer>,
    marker: Arc<DebugMarker>,
    frame_count: AtomicU64,
}

#[bon]
impl FrameTracer {
    #[builder]
    pub fn new(
        source: Arc<dyn ShapeSource>,
        viewing_volume: Arc<dyn ViewingVolume>,
        resolution: ScreenSize,
        #[builder(default)] lights: Vec<Light>,
        #[builder(default)] settings: RenderSettings,
    ) -> Self {
        FrameTracer {
            source,
            viewing_volume,
            lights,
            settings,

            snapshots: SnapshotCache::new(),
            frame_buffer: Arc::new(FrameBuffer::new(resolution)),
            marker: Arc::new(DebugMarker::new(resolution)),
            frame_count: AtomicU64::new(0),
        }
    }
}

impl FrameTracer {
    pub fn frame_buffer(&self) -> &Arc<FrameBuffer> {
        &self.frame_buffer
    }

    pub fn marker(&self) -> &Arc<DebugMarker> {
        &self.marker
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Number of frames finished so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    /// Camera for the current state of the viewing volume.
    pub fn camera(&self) -> Result<Camera, CameraError> {
        Camera::from_viewing_volume(self.viewing_volume.as_ref(), self.frame_buffer.resolution())
    }

    /// Snapshots the scene and traces every pixel of the frame buffer.
    pub fn trace_frame(&self) -> anyhow::Result<FrameStats> {
        let start = Instant::now();

        let snapshot = self.snapshots.rebuild(self.source.as_ref());
        let camera = self.camera()?;
        let verbose = self.marker.take_verbose_request();
        let marked = self.marker.position();

        log::debug!(
            "Tracing snapshot {} with {} objects",
            snapshot.generation(),
            snapshot.len()
        );

        let tracer = Tracer::new(snapshot.objects(), &self.lights, &self.settings.trace);
        self.sweep(&tracer, &camera, marked)?;

        if verbose {
            log::debug!("Verbose trace of pixel {}, {}", marked.x, marked.y);
            let color = tracer
                .verbose(true)
                .trace(&camera.ray_for_pixel(&marked));
            log::debug!("Pixel {}, {} is {color:?}", marked.x, marked.y);
        }

        self.frame_buffer.mark_dirty();
        let frame = self.frame_count.fetch_add(1, Ordering::AcqRel) + 1;

        let stats = FrameStats {
            frame,
            objects: snapshot.len(),
            elapsed: start.elapsed(),
        };
        log::info!(
            "Frame {} traced in {:.1} ms ({} objects)",
            stats.frame,
            stats.elapsed.as_secs_f64() * 1000.0,
            stats.objects
        );

        Ok(stats)
    }

    /// Starts tracing frames continuously on a background thread.
    pub fn spawn(self: Arc<Self>) -> anyhow::Result<FrameLoop> {
        let running = Arc::new(AtomicBool::new(true));

        let handle = thread::Builder::new().name("frame-loop".to_owned()).spawn({
            let running = Arc::clone(&running);
            let frame_tracer = Arc::clone(&self);
            move || -> anyhow::Result<()> {
                while running.load(Ordering::Acquire) {
                    if let Err(e) = frame_tracer.trace_frame() {
                        log::error!("Frame loop stopped: {e:#}");
                        return Err(e);
                    }
                }
                Ok(())
            }
        })?;

        Ok(FrameLoop {
            frame_tracer: self,
            running,
            handle: Some(handle),
        })
    }

    /// Replays the marked pixel's ray path against the current snapshot.
    /// Returns the number of drawn rays.
    pub fn draw_debug(&self, drawer: &mut dyn DebugDraw) -> anyhow::Result<usize> {
        let snapshot = self.snapshots.current();
        let camera = self.camera()?;

        drawer.draw_point(&camera.origin(), CAMERA_COLOR, CAMERA_POINT_SIZE);

        let tracer = Tracer::new(snapshot.objects(), &self.lights, &self.settings.trace);
        let (_, records) = tracer.trace_collecting(&camera.ray_for_pixel(&self.marker.position()));
        draw_ray_path(&records, drawer);

        Ok(records.len())
    }

    fn sweep(&self, tracer: &Tracer<'_>, camera: &Camera, marked: ScreenPoint) -> anyhow::Result<()> {
        let tile_size = self.settings.tile_size;
        let tiles = ScreenBlock::from_size(camera.get_resolution()).tile_ordering(tile_size);
        let next_tile_index = AtomicUsize::new(0);
        let highlight = self.settings.highlight_marked.then_some(marked);

        let tiles = &tiles;
        let next_tile_index = &next_tile_index;
        let frame_buffer = self.frame_buffer.as_ref();

        thread::scope(|scope| -> anyhow::Result<()> {
            let threads = self
                .worker_cores()
                .into_iter()
                .enumerate()
                .map(|(worker_id, core)| {
                    thread::Builder::new()
                        .name(format!("worker{worker_id}"))
                        .spawn_scoped(scope, move || {
                            if let Some(core) = core {
                                core_affinity::set_for_current(core);
                            }

                            let mut worker = Worker::new(worker_id);
                            let mut buffer = RgbaImage::new(tile_size.get(), tile_size.get());

                            while let Some(tile) =
                                tiles.get(next_tile_index.fetch_add(1, Ordering::AcqRel))
                            {
                                worker.render_tile(tracer, camera, tile, highlight, &mut buffer);
                                frame_buffer.write_tile(tile, &buffer);
                            }

                            worker.finish();
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            for handle in threads {
                handle
                    .join()
                    .map_err(|_| anyhow!("Worker thread panicked"))?;
            }
            Ok(())
        })
    }

    /// One entry per worker thread, with the core to pin it to if known.
    fn worker_cores(&self) -> Vec<Option<CoreId>> {
        let cores = core_affinity::get_core_ids().unwrap_or_default();

        match self.settings.worker_count {
            Some(count) => (0..count.get()).map(|i| cores.get(i).copied()).collect(),
            None if cores.is_empty() => vec![None],
            None => cores.into_iter().map(Some).collect(),
        }
    }
}

/// Handle of a running frame loop.
pub struct FrameLoop {
    frame_tracer: Arc<FrameTracer>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl FrameLoop {
    pub fn frame_tracer(&self) -> &Arc<FrameTracer> {
        &self.frame_tracer
    }

    /// Number of frames finished so far.
    pub fn frames(&self) -> u64 {
        self.frame_tracer.frame_count()
    }

    /// Signal the loop to stop. A frame in progress still gets finished.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Blocks until the loop ends, either after `stop` or on an error.
    pub fn wait(&mut self) -> anyhow::Result<()> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("Frame loop thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.stop();
        if let Err(e) = self.wait() {
            log::warn!("Frame loop ended with an error: {e:#}");
        }
    }
}
