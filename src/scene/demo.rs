use std::sync::{Arc, RwLock};

use nalgebra::UnitQuaternion;

use crate::camera::ViewProjection;
use crate::geometry::{ScreenSize, WorldPoint, WorldVector};
use crate::util::Rgba;

use super::{Ellipsoid, Light, Material, Plane, Shape, ShapeSource, Sphere};

/// Flat list of shapes that can be edited while a tracer reads it.
#[derive(Debug, Default)]
pub struct StaticScene {
    shapes: RwLock<Vec<Arc<Shape>>>,
}

impl StaticScene {
    pub fn new(shapes: impl IntoIterator<Item = Shape>) -> Self {
        StaticScene {
            shapes: RwLock::new(shapes.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn add(&self, shape: Shape) -> Arc<Shape> {
        let shape = Arc::new(shape);
        self.shapes
            .write()
            .expect("Poisoned lock!")
            .push(Arc::clone(&shape));
        shape
    }

    /// Removes the shape, returns false if it was not part of the scene.
    pub fn remove(&self, shape: &Arc<Shape>) -> bool {
        let mut shapes = self.shapes.write().expect("Poisoned lock!");
        let count_before = shapes.len();
        shapes.retain(|s| !Arc::ptr_eq(s, shape));
        shapes.len() != count_before
    }

    pub fn clear(&self) {
        self.shapes.write().expect("Poisoned lock!").clear();
    }

    pub fn len(&self) -> usize {
        self.shapes.read().expect("Poisoned lock!").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ShapeSource for StaticScene {
    fn visit_shapes(&self, visitor: &mut dyn FnMut(&Arc<Shape>)) {
        for shape in self.shapes.read().expect("Poisoned lock!").iter() {
            visitor(shape);
        }
    }
}

/// Red ball above a slightly reflective floor, with a mirror, a glass ball and an ellipsoid.
pub fn demo_shapes() -> Vec<Shape> {
    vec![
        Shape::builder()
            .geometry(Sphere::new(WorldPoint::new(10.0, 10.0, -100.0), 15.0))
            .material(
                Material::diffuse(Rgba::new(1.0, 0.1, 0.1, 1.0))
                    .with_specular(Rgba::new(0.6, 0.6, 0.6, 1.0), 40.0),
            )
            .build(),
        Shape::builder()
            .geometry(Plane::through_points(
                WorldPoint::new(0.0, -10.0, 0.0),
                WorldPoint::new(0.0, -10.0, 1.0),
                WorldPoint::new(1.0, -10.0, 0.0),
            ))
            .material(Material::diffuse(Rgba::new(0.5, 0.5, 0.55, 1.0)))
            .reflection(0.2)
            .build(),
        Shape::builder()
            .geometry(Sphere::new(WorldPoint::new(-35.0, 5.0, -130.0), 15.0))
            .material(Material::diffuse(Rgba::new(0.05, 0.05, 0.05, 1.0)))
            .reflection(0.9)
            .build(),
        Shape::builder()
            .geometry(Sphere::new(WorldPoint::new(20.0, -3.0, -60.0), 7.0))
            .material(
                Material::diffuse(Rgba::new(0.02, 0.02, 0.02, 1.0))
                    .with_specular(Rgba::new(1.0, 1.0, 1.0, 1.0), 120.0),
            )
            .reflection(0.1)
            .transparent(true)
            .refraction_index(1.5)
            .build(),
        Shape::builder()
            .geometry(Ellipsoid::new(
                WorldPoint::new(-15.0, -4.0, -75.0),
                WorldVector::new(10.0, 5.0, 5.0),
                UnitQuaternion::from_axis_angle(&WorldVector::z_axis(), 0.4),
            ))
            .material(Material::diffuse(Rgba::new(0.1, 0.8, 0.2, 1.0)))
            .build(),
    ]
}

pub fn demo_lights() -> Vec<Light> {
    vec![
        Light::white(WorldPoint::new(0.0, 400.0, 400.0)),
        Light::new(
            WorldPoint::new(200.0, 100.0, 100.0),
            Rgba::new(0.3, 0.3, 0.35, 1.0),
        ),
    ]
}

/// Camera at the origin looking down -Z.
pub fn demo_view(resolution: ScreenSize) -> ViewProjection {
    ViewProjection::look_at()
        .eye(WorldPoint::origin())
        .target(WorldPoint::new(0.0, 0.0, -1.0))
        .up(WorldVector::y())
        .fov_y(std::f32::consts::FRAC_PI_3)
        .aspect(resolution.x as f32 / resolution.y as f32)
        .call()
}
