use image::RgbaImage;

use crate::{
    camera::Camera,
    geometry::{ScreenBlock, ScreenPoint},
    tracer::Tracer,
    util::color_to_image,
};

const HIGHLIGHT: image::Rgba<u8> = image::Rgba([255, 0, 0, 255]);

pub struct Worker {
    worker_id: usize,
    traced_pixels: u64,
}

impl Worker {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            traced_pixels: 0,
        }
    }

    /// Traces every pixel of the tile into the top left corner of `buffer`.
    /// `highlight` pixel (if inside the tile) is painted red instead.
    pub fn render_tile(
        &mut self,
        tracer: &Tracer<'_>,
        camera: &Camera,
        tile: &ScreenBlock,
        highlight: Option<ScreenPoint>,
        buffer: &mut RgbaImage,
    ) {
        for point in tile.internal_points() {
            let pixel = if highlight == Some(point) {
                HIGHLIGHT
            } else {
                color_to_image(tracer.trace(&camera.ray_for_pixel(&point)))
            };

            let buffer_position = point - tile.min;
            buffer.put_pixel(buffer_position.x, buffer_position.y, pixel);
        }
        self.traced_pixels += tile.area() as u64;
    }

    pub fn finish(self) {
        log::trace!(
            "Worker {} traced {} pixels",
            self.worker_id,
            self.traced_pixels
        );
    }
}
