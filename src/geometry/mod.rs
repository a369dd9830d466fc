mod screen_block;

use nalgebra::{Matrix4, Point2, Point3, Unit, Vector2, Vector3};

pub use screen_block::{InternalPoints, ScreenBlock};

pub type FloatType = f32;

/// Tolerance used for degenerate-vector checks.
pub const EPSILON: FloatType = 1e-6;

pub type ScreenPoint = Point2<u32>;
pub type ScreenSize = Vector2<u32>;

pub type WorldPoint = Point3<FloatType>;
pub type WorldVector = Vector3<FloatType>;
pub type WorldMatrix = Matrix4<FloatType>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Normalized direction of the ray
    pub direction: Unit<WorldVector>,
}

impl Ray {
    /// Creates a new ray, normalizing the direction.
    /// Panics if the direction is (almost) zero.
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        let direction =
            Unit::try_new(direction, EPSILON).expect("Ray direction must be non-zero");
        Ray { origin, direction }
    }

    pub fn with_unit_direction(origin: WorldPoint, direction: Unit<WorldVector>) -> Ray {
        Ray { origin, direction }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction.as_ref() * distance
    }

    /// Moves the origin forward along the direction, so that a ray spawned on a surface
    /// doesn't immediately hit the same surface again.
    pub fn nudged(&self, epsilon: FloatType) -> Ray {
        Ray {
            origin: self.point_at(epsilon),
            direction: self.direction,
        }
    }
}

/// Which side of a surface the ray crosses at an intersection.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// Ray hits the outer surface, going into the volume.
    Entering,
    /// Ray hits the inner surface, leaving the volume.
    Exiting,
}

impl Side {
    pub fn flipped(self) -> Side {
        match self {
            Side::Entering => Side::Exiting,
            Side::Exiting => Side::Entering,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Intersection {
    pub side: Side,
    /// Distance along the ray, always positive.
    pub distance: FloatType,
    pub point: WorldPoint,
}

impl Intersection {
    pub fn along(ray: &Ray, side: Side, distance: FloatType) -> Intersection {
        Intersection {
            side,
            distance,
            point: ray.point_at(distance),
        }
    }
}

/// Mirrors `direction` around `normal`.
pub fn reflect(direction: &WorldVector, normal: &WorldVector) -> WorldVector {
    direction - normal * (2.0 * normal.dot(direction))
}

/// Bends `direction` through a surface with the given ratio of refractive indices.
/// `normal` must face against the incoming direction.
/// Returns None on total internal reflection.
pub fn refract(
    direction: &Unit<WorldVector>,
    normal: &Unit<WorldVector>,
    eta: FloatType,
) -> Option<Unit<WorldVector>> {
    let cos_i = -normal.dot(direction.as_ref());
    let discriminant = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if discriminant < 0.0 {
        return None;
    }

    let refracted =
        direction.as_ref() * eta + normal.as_ref() * (eta * cos_i - discriminant.sqrt());
    Unit::try_new(refracted, EPSILON)
}
