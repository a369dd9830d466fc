use std::{
    ops::Deref as _,
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::Context as _;
use image::{GenericImage, GenericImageView, RgbaImage};

use crate::geometry::{ScreenBlock, ScreenPoint, ScreenSize};

/// Shared 8-bit RGBA output image with a dirty flag.
///
/// The renderer sets the flag after finishing a frame, the consumer clears it when it
/// picks the image up.
#[derive(Debug)]
pub struct FrameBuffer {
    image: Mutex<RgbaImage>,
    dirty: AtomicBool,
    resolution: ScreenSize,
}

impl FrameBuffer {
    pub fn new(resolution: ScreenSize) -> Self {
        FrameBuffer {
            image: Mutex::new(RgbaImage::new(resolution.x, resolution.y)),
            dirty: AtomicBool::new(false),
            resolution,
        }
    }

    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.x
    }

    pub fn height(&self) -> u32 {
        self.resolution.y
    }

    pub fn put_pixel(&self, point: &ScreenPoint, pixel: image::Rgba<u8>) {
        self.image
            .lock()
            .expect("Poisoned lock!")
            .put_pixel(point.x, point.y, pixel);
    }

    /// Copies the top left corner of `buffer` into the tile's place in the image.
    pub fn write_tile(&self, tile: &ScreenBlock, buffer: &RgbaImage) {
        self.image
            .lock()
            .expect("Poisoned lock!")
            .copy_from(
                buffer.view(0, 0, tile.width(), tile.height()).deref(),
                tile.min.x,
                tile.min.y,
            )
            .unwrap_or_else(|_| unreachable!("The buffer should always fit into the output"));
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Returns the dirty flag and clears it.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn image(&self) -> &Mutex<RgbaImage> {
        &self.image
    }

    /// Copy of the current image contents.
    pub fn snapshot(&self) -> RgbaImage {
        self.image.lock().expect("Poisoned lock!").clone()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.snapshot()
            .save(path)
            .with_context(|| format!("Failed to save image to {}", path.display()))
    }
}
