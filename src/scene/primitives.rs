use nalgebra::{Unit, UnitQuaternion};

use crate::geometry::{EPSILON, FloatType, Intersection, Ray, Side, WorldPoint, WorldVector};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
}

impl Sphere {
    pub fn new(center: WorldPoint, radius: FloatType) -> Sphere {
        assert!(radius > 0.0, "Sphere radius must be positive");
        Sphere { center, radius }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction.as_ref());
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        nearest_root(ray, -b - sqrt_disc, -b + sqrt_disc)
    }

    pub fn normal_at(&self, point: &WorldPoint) -> Unit<WorldVector> {
        Unit::new_normalize(point - self.center)
    }
}

/// Infinite plane bounding the half-space behind its normal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Plane {
    pub point: WorldPoint,
    pub normal: Unit<WorldVector>,
}

impl Plane {
    pub fn new(point: WorldPoint, normal: WorldVector) -> Plane {
        let normal = Unit::try_new(normal, EPSILON).expect("Plane normal must be non-zero");
        Plane { point, normal }
    }

    /// Plane through three points, normal facing towards the side from which
    /// `a`, `b`, `c` appear in counter-clockwise order.
    pub fn through_points(a: WorldPoint, b: WorldPoint, c: WorldPoint) -> Plane {
        Plane::new(a, (b - a).cross(&(c - a)))
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        let denominator = self.normal.dot(ray.direction.as_ref());
        if denominator.abs() < EPSILON {
            return None;
        }

        let t = (self.point - ray.origin).dot(self.normal.as_ref()) / denominator;
        if t <= 0.0 {
            return None;
        }

        let side = if denominator < 0.0 {
            Side::Entering
        } else {
            Side::Exiting
        };
        Some(Intersection::along(ray, side, t))
    }

    pub fn normal_at(&self, _point: &WorldPoint) -> Unit<WorldVector> {
        self.normal
    }
}

/// Sphere scaled along its local axes and then rotated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ellipsoid {
    pub center: WorldPoint,
    pub radii: WorldVector,
    pub orientation: UnitQuaternion<FloatType>,
}

impl Ellipsoid {
    pub fn new(
        center: WorldPoint,
        radii: WorldVector,
        orientation: UnitQuaternion<FloatType>,
    ) -> Ellipsoid {
        assert!(
            radii.iter().all(|r| *r > 0.0),
            "Ellipsoid radii must be positive"
        );
        Ellipsoid {
            center,
            radii,
            orientation,
        }
    }

    pub fn axis_aligned(center: WorldPoint, radii: WorldVector) -> Ellipsoid {
        Self::new(center, radii, UnitQuaternion::identity())
    }

    /// Maps a world space vector into the space where the ellipsoid is a unit sphere.
    fn to_unit_space(&self, v: &WorldVector) -> WorldVector {
        self.orientation
            .inverse_transform_vector(v)
            .component_div(&self.radii)
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        // The mapping is linear, so the ray parameter stays in world units.
        let o = self.to_unit_space(&(ray.origin - self.center));
        let d = self.to_unit_space(ray.direction.as_ref());

        let a = d.dot(&d);
        let b = o.dot(&d);
        let c = o.dot(&o) - 1.0;
        let discriminant = b * b - a * c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        nearest_root(ray, (-b - sqrt_disc) / a, (-b + sqrt_disc) / a)
    }

    pub fn normal_at(&self, point: &WorldPoint) -> Unit<WorldVector> {
        let local = self.orientation.inverse_transform_vector(&(point - self.center));
        let gradient = local.component_div(&self.radii.component_mul(&self.radii));
        Unit::new_normalize(self.orientation * gradient)
    }
}

/// Picks the first root in front of the ray origin.
/// Origin outside the volume gives an entering hit at the near root,
/// origin inside gives an exiting hit at the far root.
fn nearest_root(ray: &Ray, near: FloatType, far: FloatType) -> Option<Intersection> {
    if near > 0.0 {
        Some(Intersection::along(ray, Side::Entering, near))
    } else if far > 0.0 {
        Some(Intersection::along(ray, Side::Exiting, far))
    } else {
        None
    }
}
