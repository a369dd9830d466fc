pub mod demo;
pub mod primitives;
mod snapshot;

use std::sync::Arc;

use bon::bon;
use nalgebra::Unit;

use crate::geometry::{FloatType, Intersection, Ray, WorldPoint, WorldVector};
use crate::util::Rgba;

pub use primitives::{Ellipsoid, Plane, Sphere};
pub use snapshot::{SceneSnapshot, SnapshotCache};

/// Analytic surface a shape is made of.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Geometry {
    Sphere(Sphere),
    Plane(Plane),
    Ellipsoid(Ellipsoid),
}

impl Geometry {
    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        match self {
            Geometry::Sphere(sphere) => sphere.intersect(ray),
            Geometry::Plane(plane) => plane.intersect(ray),
            Geometry::Ellipsoid(ellipsoid) => ellipsoid.intersect(ray),
        }
    }

    /// Outward facing unit normal. Only meaningful for points on the surface.
    pub fn normal_at(&self, point: &WorldPoint) -> Unit<WorldVector> {
        match self {
            Geometry::Sphere(sphere) => sphere.normal_at(point),
            Geometry::Plane(plane) => plane.normal_at(point),
            Geometry::Ellipsoid(ellipsoid) => ellipsoid.normal_at(point),
        }
    }
}

impl From<Sphere> for Geometry {
    fn from(value: Sphere) -> Self {
        Geometry::Sphere(value)
    }
}

impl From<Plane> for Geometry {
    fn from(value: Plane) -> Self {
        Geometry::Plane(value)
    }
}

impl From<Ellipsoid> for Geometry {
    fn from(value: Ellipsoid) -> Self {
        Geometry::Ellipsoid(value)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub diffuse: Rgba,
    pub specular: Rgba,
    pub shininess: FloatType,
}

impl Material {
    /// Purely diffuse material without highlights.
    pub fn diffuse(color: Rgba) -> Material {
        Material {
            diffuse: color,
            specular: Rgba::new(0.0, 0.0, 0.0, 0.0),
            shininess: 0.0,
        }
    }

    pub fn with_specular(self, specular: Rgba, shininess: FloatType) -> Material {
        Material {
            specular,
            shininess,
            ..self
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::diffuse(Rgba::new(0.8, 0.8, 0.8, 1.0))
    }
}

/// Point light.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    pub position: WorldPoint,
    pub color: Rgba,
}

impl Light {
    pub fn new(position: WorldPoint, color: Rgba) -> Light {
        Light { position, color }
    }

    pub fn white(position: WorldPoint) -> Light {
        Light::new(position, Rgba::new(1.0, 1.0, 1.0, 1.0))
    }
}

/// Renderable shape with its surface properties.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    geometry: Geometry,
    material: Material,
    /// Fraction of mirrored light, within [0, 1].
    reflection: FloatType,
    transparent: bool,
    refraction_index: FloatType,
}

#[bon]
impl Shape {
    #[builder]
    pub fn new(
        #[builder(into)] geometry: Geometry,
        #[builder(default)] material: Material,
        #[builder(default)] reflection: FloatType,
        #[builder(default)] transparent: bool,
        #[builder(default = 1.0)] refraction_index: FloatType,
    ) -> Self {
        assert!(refraction_index > 0.0, "Refraction index must be positive");

        Shape {
            geometry,
            material,
            reflection: reflection.clamp(0.0, 1.0),
            transparent,
            refraction_index,
        }
    }
}

impl Shape {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn reflection(&self) -> FloatType {
        self.reflection
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub fn refraction_index(&self) -> FloatType {
        self.refraction_index
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection> {
        self.geometry.intersect(ray)
    }

    pub fn normal_at(&self, point: &WorldPoint) -> Unit<WorldVector> {
        self.geometry.normal_at(point)
    }
}

/// Per-frame entry of the traced object list.
#[derive(Clone, Debug)]
pub struct Object {
    pub shape: Arc<Shape>,
}

/// The scene side of the tracer: walks its nodes and reports every shape once.
pub trait ShapeSource: Send + Sync {
    fn visit_shapes(&self, visitor: &mut dyn FnMut(&Arc<Shape>));
}
