use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::geometry::{FloatType, ScreenPoint, ScreenSize, WorldPoint};
use crate::tracer::RayRecord;
use crate::util::Rgba;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    /// Trace the marked pixel with logging on the next frame.
    Verbose,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        KeyEvent {
            key,
            action: KeyAction::Press,
        }
    }

    pub fn release(key: Key) -> Self {
        KeyEvent {
            key,
            action: KeyAction::Release,
        }
    }
}

/// Pixel selected for debugging, shared between the input handler and the frame loop.
#[derive(Debug)]
pub struct DebugMarker {
    x: AtomicU32,
    y: AtomicU32,
    resolution: ScreenSize,
    verbose_requested: AtomicBool,
}

impl DebugMarker {
    /// Marker in the middle of the image.
    pub fn new(resolution: ScreenSize) -> Self {
        assert!(resolution.x > 0 && resolution.y > 0);
        DebugMarker {
            x: AtomicU32::new(resolution.x / 2),
            y: AtomicU32::new(resolution.y / 2),
            resolution,
            verbose_requested: AtomicBool::new(false),
        }
    }

    pub fn position(&self) -> ScreenPoint {
        ScreenPoint::new(
            self.x.load(Ordering::Relaxed),
            self.y.load(Ordering::Relaxed),
        )
    }

    /// Moves the marker, clamping it into the image.
    pub fn set_position(&self, position: ScreenPoint) {
        self.x
            .store(position.x.min(self.resolution.x - 1), Ordering::Relaxed);
        self.y
            .store(position.y.min(self.resolution.y - 1), Ordering::Relaxed);
    }

    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    /// Reacts to a key event. Returns true if the event changed anything.
    pub fn handle_key(&self, event: KeyEvent) -> bool {
        if event.action == KeyAction::Release {
            return false;
        }

        let old = self.position();
        let new = match event.key {
            Key::Left => ScreenPoint::new(old.x.saturating_sub(1), old.y),
            Key::Right => ScreenPoint::new(old.x + 1, old.y),
            // Image rows go down
            Key::Up => ScreenPoint::new(old.x, old.y.saturating_sub(1)),
            Key::Down => ScreenPoint::new(old.x, old.y + 1),
            Key::Verbose => {
                self.request_verbose();
                return true;
            }
        };

        self.set_position(new);
        let moved = self.position() != old;
        if moved {
            log::debug!("Marked pixel moved to {}, {}", new.x, new.y);
        }
        moved
    }

    pub fn request_verbose(&self) {
        self.verbose_requested.store(true, Ordering::Release);
    }

    /// Returns whether a verbose trace was requested, clearing the request.
    pub fn take_verbose_request(&self) -> bool {
        self.verbose_requested.swap(false, Ordering::AcqRel)
    }
}

/// Line drawing collaborator for replaying ray paths.
pub trait DebugDraw {
    fn draw_line(&mut self, from: &WorldPoint, to: &WorldPoint, color: Rgba, width: FloatType);
    fn draw_point(&mut self, center: &WorldPoint, color: Rgba, size: FloatType);
}

/// Colors of the ray path segments, by recursion order.
pub const RAY_PALETTE: [Rgba; 5] = [
    Rgba {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    },
    Rgba {
        r: 0.0,
        g: 1.0,
        b: 0.0,
        a: 1.0,
    },
    Rgba {
        r: 0.0,
        g: 0.0,
        b: 1.0,
        a: 1.0,
    },
    Rgba {
        r: 1.0,
        g: 1.0,
        b: 0.0,
        a: 1.0,
    },
    Rgba {
        r: 0.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    },
];

pub const RAY_LINE_WIDTH: FloatType = 3.0;

/// Draws every recorded ray as a line from its origin to its end.
pub fn draw_ray_path(records: &[RayRecord], drawer: &mut dyn DebugDraw) {
    for (record, color) in records.iter().zip(RAY_PALETTE.iter().cycle()) {
        log::trace!(
            "Ray at depth {}: {:?} -> {:?}",
            record.depth,
            record.ray.origin,
            record.end
        );
        drawer.draw_line(&record.ray.origin, &record.end, *color, RAY_LINE_WIDTH);
    }
}
