use std::ptr;

use bon::Builder;
use nalgebra::Unit;

use crate::geometry::{FloatType, Ray, Side, WorldPoint, WorldVector, reflect, refract};
use crate::scene::{Light, Object, Shape};
use crate::util::{Rgba, TRANSPARENT_BLACK, clamp_to_one, modulate};

#[derive(Copy, Clone, Debug, PartialEq, Builder)]
pub struct TraceSettings {
    /// Deepest recursion level that still gets traced. Primary rays are depth 0.
    #[builder(default = 3)]
    pub max_depth: u32,

    /// How far spawned reflection and refraction rays are moved off their surface.
    #[builder(default = 1e-3)]
    pub epsilon: FloatType,

    /// Returned for rays that hit nothing and for rays past the depth limit.
    #[builder(default = TRANSPARENT_BLACK)]
    pub background: Rgba,

    /// Length of recorded rays that didn't hit anything.
    #[builder(default = 1000.0)]
    pub miss_distance: FloatType,

    /// Refractive index of the space between shapes.
    #[builder(default = 1.0)]
    pub outside_index: FloatType,
}

impl Default for TraceSettings {
    fn default() -> Self {
        TraceSettings::builder().build()
    }
}

/// Nearest intersection of a ray with the object list.
#[derive(Copy, Clone, Debug)]
pub struct Hit<'a> {
    pub shape: &'a Shape,
    pub point: WorldPoint,
    pub distance: FloatType,
    pub side: Side,
}

/// One traced ray, kept for replaying the path of a pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayRecord {
    pub ray: Ray,
    /// Hit point, or a point `miss_distance` along the ray.
    pub end: WorldPoint,
    pub hit: bool,
    pub depth: u32,
}

/// Recursive ray tracer over a frozen object list.
#[derive(Copy, Clone, Debug)]
pub struct Tracer<'a> {
    objects: &'a [Object],
    lights: &'a [Light],
    settings: &'a TraceSettings,
    verbose: bool,
}

impl<'a> Tracer<'a> {
    pub fn new(objects: &'a [Object], lights: &'a [Light], settings: &'a TraceSettings) -> Self {
        Tracer {
            objects,
            lights,
            settings,
            verbose: false,
        }
    }

    /// Logs every intersection search and recursion step.
    pub fn verbose(self, verbose: bool) -> Self {
        Tracer { verbose, ..self }
    }

    /// Traces a primary ray starting outside of all shapes.
    pub fn trace(&self, ray: &Ray) -> Rgba {
        self.trace_ray(ray, 0, Side::Entering, self.settings.outside_index, None)
    }

    /// Traces a primary ray and returns every ray spawned along the way.
    pub fn trace_collecting(&self, ray: &Ray) -> (Rgba, Vec<RayRecord>) {
        let mut rays = Vec::new();
        let color = self.trace_ray(
            ray,
            0,
            Side::Entering,
            self.settings.outside_index,
            Some(&mut rays),
        );
        (color, rays)
    }

    /// Finds the closest object hit on the requested side, strictly in front of the origin.
    /// On equal distances the object listed first wins.
    pub fn nearest_shape(&self, ray: &Ray, side: Side) -> Option<Hit<'a>> {
        let mut nearest: Option<Hit<'a>> = None;

        for object in self.objects {
            let Some(intersection) = object.shape.intersect(ray) else {
                continue;
            };

            if intersection.side != side || intersection.distance <= 0.0 {
                continue;
            }

            if nearest.is_none_or(|n| intersection.distance < n.distance) {
                nearest = Some(Hit {
                    shape: &object.shape,
                    point: intersection.point,
                    distance: intersection.distance,
                    side: intersection.side,
                });
            }
        }

        if self.verbose {
            match &nearest {
                Some(hit) => log::debug!(
                    "{ray:?} ({side:?}) hits {:?} at {:?}, distance {}",
                    hit.shape.geometry(),
                    hit.point,
                    hit.distance
                ),
                None => log::debug!("{ray:?} ({side:?}) hits nothing"),
            }
        }

        nearest
    }

    /// Color seen along a ray.
    ///
    /// `side` selects which surfaces the ray can hit: rays travelling inside a transparent
    /// shape look for its exiting surface. `medium_index` is the refractive index of the
    /// volume the ray currently travels through. When `rays` is given, every traced ray is
    /// appended to it.
    pub fn trace_ray(
        &self,
        ray: &Ray,
        depth: u32,
        side: Side,
        medium_index: FloatType,
        mut rays: Option<&mut Vec<RayRecord>>,
    ) -> Rgba {
        if depth > self.settings.max_depth {
            return self.settings.background;
        }

        let hit = self.nearest_shape(ray, side);

        if let Some(rays) = rays.as_deref_mut() {
            rays.push(RayRecord {
                ray: *ray,
                end: hit.map_or_else(|| ray.point_at(self.settings.miss_distance), |h| h.point),
                hit: hit.is_some(),
                depth,
            });
        }

        let Some(hit) = hit else {
            return self.settings.background;
        };

        let outward_normal = hit.shape.normal_at(&hit.point);
        let normal = if outward_normal.dot(ray.direction.as_ref()) > 0.0 {
            Unit::new_unchecked(-outward_normal.into_inner())
        } else {
            outward_normal
        };

        let mut color = Rgba::new(0.0, 0.0, 0.0, 1.0);
        for light in self.lights {
            color += self.local_shading(ray, &hit, &normal, light);
        }

        if hit.shape.reflection() > 0.0 {
            let direction = reflect(ray.direction.as_ref(), normal.as_ref());
            let reflection_ray = Ray::new(hit.point, direction).nudged(self.settings.epsilon);

            if self.verbose {
                log::debug!("Depth {depth}: reflection {reflection_ray:?}");
            }

            color += self.trace_ray(
                &reflection_ray,
                depth + 1,
                side,
                medium_index,
                rays.as_deref_mut(),
            ) * hit.shape.reflection();
        }

        if hit.shape.is_transparent() {
            let target_index = match hit.side {
                Side::Entering => hit.shape.refraction_index(),
                Side::Exiting => self.settings.outside_index,
            };
            let eta = medium_index / target_index;

            match refract(&ray.direction, &normal, eta) {
                Some(direction) => {
                    let refraction_ray = Ray::with_unit_direction(hit.point, direction)
                        .nudged(self.settings.epsilon);

                    if self.verbose {
                        log::debug!("Depth {depth}: refraction {refraction_ray:?}, eta {eta}");
                    }

                    color += self.trace_ray(
                        &refraction_ray,
                        depth + 1,
                        side.flipped(),
                        target_index,
                        rays.as_deref_mut(),
                    );
                }
                None => {
                    if self.verbose {
                        log::debug!("Depth {depth}: total internal reflection");
                    }
                }
            }
        }

        clamp_to_one(color)
    }

    /// Diffuse and specular contribution of a single light, zero when the light is occluded.
    fn local_shading(
        &self,
        ray: &Ray,
        hit: &Hit<'_>,
        normal: &Unit<WorldVector>,
        light: &Light,
    ) -> Rgba {
        let none = Rgba::new(0.0, 0.0, 0.0, 0.0);

        let to_light = light.position - hit.point;
        let light_distance = to_light.norm();
        let Some(light_direction) = Unit::try_new(to_light, crate::geometry::EPSILON) else {
            return none;
        };

        if self.in_shadow(hit, &light_direction, light_distance) {
            return none;
        }

        let cos_angle = normal.dot(light_direction.as_ref());
        if cos_angle <= 0.0 {
            return none;
        }

        let material = hit.shape.material();
        let mut color = modulate(light.color, material.diffuse) * cos_angle;

        if material.shininess > 0.0 {
            let highlight =
                reflect(light_direction.as_ref(), normal.as_ref()).dot(ray.direction.as_ref());
            if highlight > 0.0 {
                color += modulate(light.color, material.specular) * highlight.powf(material.shininess);
            }
        }

        color
    }

    /// Is anything other than the shaded shape between the point and the light?
    fn in_shadow(
        &self,
        hit: &Hit<'_>,
        light_direction: &Unit<WorldVector>,
        light_distance: FloatType,
    ) -> bool {
        let shadow_ray = Ray::with_unit_direction(hit.point, *light_direction);

        self.objects
            .iter()
            .filter(|object| !ptr::eq(object.shape.as_ref(), hit.shape))
            .filter_map(|object| object.shape.intersect(&shadow_ray))
            .any(|intersection| {
                intersection.side == Side::Entering
                    && intersection.distance > 0.0
                    && intersection.distance < light_distance
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::geometry::test::{UnitWorldVectorWrapper, WorldPointWrapper};
    use crate::scene::{Material, Plane, Sphere};
    use assert2::assert;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn objects(shapes: Vec<Shape>) -> Vec<Object> {
        shapes
            .into_iter()
            .map(|shape| Object {
                shape: Arc::new(shape),
            })
            .collect()
    }

    fn diffuse_sphere(center: [f32; 3], radius: f32, color: Rgba) -> Shape {
        Shape::builder()
            .geometry(Sphere::new(center.into(), radius))
            .material(Material::diffuse(color))
            .build()
    }

    fn red() -> Rgba {
        Rgba::new(1.0, 0.0, 0.0, 1.0)
    }

    fn forward() -> Ray {
        Ray::new(WorldPoint::origin(), [0.0, 0.0, -1.0].into())
    }

    #[test]
    fn empty_scene_is_background() {
        let settings = TraceSettings::builder()
            .background(Rgba::new(0.1, 0.2, 0.3, 0.4))
            .build();
        let lights = [Light::white([0.0, 100.0, 0.0].into())];
        let tracer = Tracer::new(&[], &lights, &settings);

        assert!(tracer.trace(&forward()) == Rgba::new(0.1, 0.2, 0.3, 0.4));
    }

    #[proptest]
    fn missed_rays_are_background(origin: WorldPointWrapper, direction: UnitWorldVectorWrapper) {
        // Sphere far away from all generated origins, rays pointing away from it
        let objects = objects(vec![diffuse_sphere([0.0, 0.0, 1000.0], 10.0, red())]);
        let settings = TraceSettings::default();
        let lights = [Light::white([0.0, 100.0, 0.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        let mut direction = *direction.as_ref();
        direction.z = -direction.z.abs();
        if let Some(direction) = Unit::try_new(direction, 1e-3) {
            let ray = Ray::with_unit_direction(*origin, direction);
            prop_assert_eq!(tracer.trace(&ray), settings.background);
        }
    }

    #[test]
    fn depth_past_limit_returns_background_immediately() {
        let objects = objects(vec![diffuse_sphere([0.0, 0.0, -10.0], 2.0, red())]);
        let settings = TraceSettings::builder().max_depth(2).build();
        let lights = [Light::white([0.0, 0.0, 0.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        let mut rays = Vec::new();
        let color = tracer.trace_ray(&forward(), 3, Side::Entering, 1.0, Some(&mut rays));

        assert!(color == settings.background);
        assert!(rays.is_empty());
    }

    #[test]
    fn red_sphere_center_pixel() {
        let objects = objects(vec![diffuse_sphere([0.0, 0.0, -100.0], 15.0, red())]);
        let settings = TraceSettings::default();
        let lights = [Light::white([200.0, 100.0, 100.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        let color = tracer.trace(&forward());
        assert!(color.r > 0.0);
        assert!(color.g == 0.0);
        assert!(color.b == 0.0);
    }

    #[test]
    fn light_straight_above_gives_full_diffuse() {
        let diffuse = Rgba::new(0.5, 0.25, 1.0, 1.0);
        let light_color = Rgba::new(1.0, 0.8, 0.6, 1.0);
        let objects = objects(vec![diffuse_sphere([0.0, 0.0, 0.0], 1.0, diffuse)]);
        let settings = TraceSettings::default();

        // Looking down on the top of the sphere, with the light right behind the eye
        let ray = Ray::new([0.0, 10.0, 0.0].into(), [0.0, -1.0, 0.0].into());
        for height in [20.0, 1e3, 1e5] {
            let lights = [Light::new([0.0, height, 0.0].into(), light_color)];
            let tracer = Tracer::new(&objects, &lights, &settings);
            let color = tracer.trace(&ray);

            assert!((color.r - 0.5).abs() < 1e-4);
            assert!((color.g - 0.2).abs() < 1e-4);
            assert!((color.b - 0.6).abs() < 1e-4);
        }
    }

    #[test]
    fn cosine_falloff() {
        let objects = objects(vec![diffuse_sphere([0.0, 0.0, 0.0], 1.0, red())]);
        let settings = TraceSettings::default();
        let ray = Ray::new([0.0, 10.0, 0.0].into(), [0.0, -1.0, 0.0].into());

        // Light at 60 degrees from the normal, very far away
        let angle = std::f32::consts::FRAC_PI_3;
        let lights = [Light::white(
            [1e5 * angle.sin(), 1e5 * angle.cos(), 0.0].into(),
        )];
        let tracer = Tracer::new(&objects, &lights, &settings);
        let color = tracer.trace(&ray);

        assert!((color.r - 0.5).abs() < 1e-3);
    }

    #[test]
    fn shadowed_point_gets_no_light() {
        let floor = Shape::builder()
            .geometry(Plane::new(WorldPoint::origin(), WorldVector::y()))
            .material(Material::diffuse(Rgba::new(1.0, 1.0, 1.0, 1.0)))
            .build();
        let blocker = diffuse_sphere([0.0, 5.0, 0.0], 1.0, red());
        let objects = objects(vec![floor, blocker]);
        let settings = TraceSettings::default();
        let lights = [Light::white([0.0, 100.0, 0.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        let ray_to_shadow = Ray::new([3.0, 10.0, 0.0].into(), [-3.0, -10.0, 0.0].into());
        let shadowed = tracer.trace(&ray_to_shadow);
        assert!(shadowed == Rgba::new(0.0, 0.0, 0.0, 1.0));

        let ray_to_lit = Ray::new([3.0, 10.0, 0.0].into(), [7.0, -10.0, 0.0].into());
        let lit = tracer.trace(&ray_to_lit);
        assert!(lit.r > 0.9);
    }

    #[test]
    fn shadowed_point_still_reflects() {
        let mirror_floor = Shape::builder()
            .geometry(Plane::new(WorldPoint::origin(), WorldVector::y()))
            .material(Material::diffuse(Rgba::new(1.0, 1.0, 1.0, 1.0)))
            .reflection(0.5)
            .build();
        // Sits exactly between the floor origin and the light
        let blocker = diffuse_sphere([2.5, 0.5, 0.0], 0.3, red());
        let green = diffuse_sphere([-10.0, 10.0, 0.0], 3.0, Rgba::new(0.0, 1.0, 0.0, 1.0));
        let objects = objects(vec![mirror_floor, blocker, green]);
        let settings = TraceSettings::default();
        let lights = [Light::white([5.0, 1.0, 0.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        // Hits the floor at the origin, the reflection goes up into the green ball
        let ray = Ray::new([10.0, 10.0, 0.0].into(), [-1.0, -1.0, 0.0].into());
        let (color, rays) = tracer.trace_collecting(&ray);

        assert!(rays.len() == 2);
        assert!(color.r == 0.0);
        assert!(color.b == 0.0);
        assert!(color.g > 0.4);
    }

    #[test]
    fn shape_does_not_shadow_itself() {
        // Light inside a big sphere's bounds from the point of view of the hit point
        let objects = objects(vec![diffuse_sphere([0.0, 0.0, -10.0], 2.0, red())]);
        let settings = TraceSettings::default();
        let lights = [Light::white([0.0, 0.0, 10.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        assert!(tracer.trace(&forward()).r > 0.99);
    }

    #[test]
    fn specular_highlight() {
        let shiny = Shape::builder()
            .geometry(Sphere::new([0.0, 0.0, -10.0].into(), 2.0))
            .material(
                Material::diffuse(Rgba::new(0.0, 0.0, 0.0, 1.0))
                    .with_specular(Rgba::new(0.0, 0.0, 1.0, 1.0), 10.0),
            )
            .build();
        let objects = objects(vec![shiny]);
        let settings = TraceSettings::default();
        let lights = [Light::white([0.0, 0.0, 100.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        // Light behind the eye, mirror direction points straight back
        let color = tracer.trace(&forward());
        assert!((color.b - 1.0).abs() < 1e-4);
        assert!(color.r == 0.0);
    }

    #[test]
    fn mirror_shows_colored_sphere() {
        let mirror = Shape::builder()
            .geometry(Sphere::new([0.0, 0.0, -20.0].into(), 5.0))
            .material(Material::diffuse(Rgba::new(0.0, 0.0, 0.0, 1.0)))
            .reflection(1.0)
            .build();
        let green = diffuse_sphere([0.0, 0.0, 20.0], 5.0, Rgba::new(0.0, 1.0, 0.0, 1.0));
        let objects = objects(vec![mirror, green]);
        let settings = TraceSettings::default();
        let lights = [Light::white([0.0, 0.0, 0.0].into())];

        // The green sphere faces the mirror and the light sits between them
        let ray = Ray::new([0.0, 0.0, 10.0].into(), [0.0, 0.0, -1.0].into());
        let tracer = Tracer::new(&objects, &lights, &settings);
        let (color, rays) = tracer.trace_collecting(&ray);

        let direct = Tracer::new(&objects[1..], &lights, &settings)
            .trace(&Ray::new([0.0, 0.0, 0.0].into(), [0.0, 0.0, 1.0].into()));

        assert!(direct.g > 0.9);
        assert!((color.g - direct.g).abs() < 1e-3);
        assert!(rays.len() == 2);
        assert!(rays[0].hit && rays[1].hit);
        assert!(rays[1].depth == 1);
    }

    #[test]
    fn ray_records_cap_misses() {
        let mirror = Shape::builder()
            .geometry(Sphere::new([0.0, 0.0, -20.0].into(), 5.0))
            .reflection(1.0)
            .build();
        let objects = objects(vec![mirror]);
        let settings = TraceSettings::builder().miss_distance(50.0).build();
        let tracer = Tracer::new(&objects, &[], &settings);

        let (_, rays) = tracer.trace_collecting(&forward());

        assert!(rays.len() == 2);
        assert!(rays[0].hit);
        assert!((rays[0].end - WorldPoint::new(0.0, 0.0, -15.0)).norm() < 1e-4);
        assert!(!rays[1].hit);
        assert!(((rays[1].end - rays[1].ray.origin).norm() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn recursion_is_bounded() {
        // Two facing mirrors would reflect forever
        let objects = objects(vec![
            Shape::builder()
                .geometry(Plane::new([0.0, 0.0, -10.0].into(), WorldVector::z()))
                .reflection(1.0)
                .build(),
            Shape::builder()
                .geometry(Plane::new([0.0, 0.0, 10.0].into(), -WorldVector::z()))
                .reflection(1.0)
                .build(),
        ]);
        let settings = TraceSettings::builder().max_depth(4).build();
        let tracer = Tracer::new(&objects, &[], &settings);

        let (_, rays) = tracer.trace_collecting(&forward());
        assert!(rays.len() == 5);
        assert!(rays.iter().map(|r| r.depth).eq(0..5));
    }

    #[test]
    fn nearest_shape_respects_side_and_order() {
        let objects = objects(vec![
            diffuse_sphere([0.0, 0.0, -20.0], 2.0, red()),
            diffuse_sphere([0.0, 0.0, -10.0], 2.0, red()),
            diffuse_sphere([0.0, 0.0, -10.0], 2.0, red()),
        ]);
        let settings = TraceSettings::default();
        let tracer = Tracer::new(&objects, &[], &settings);

        let hit = tracer.nearest_shape(&forward(), Side::Entering).unwrap();
        assert!((hit.distance - 8.0).abs() < 1e-5);
        // Equal distances: first listed wins
        assert!(ptr::eq(hit.shape, objects[1].shape.as_ref()));

        let inside = Ray::new([0.0, 0.0, -10.0].into(), [0.0, 0.0, -1.0].into());
        let exit = tracer.nearest_shape(&inside, Side::Exiting).unwrap();
        assert!((exit.distance - 2.0).abs() < 1e-5);
        let enter = tracer.nearest_shape(&inside, Side::Entering).unwrap();
        assert!((enter.distance - 8.0).abs() < 1e-5);
    }

    fn glass_ball(reflection: f32) -> Shape {
        Shape::builder()
            .geometry(Sphere::new([0.0, 0.0, -10.0].into(), 2.0))
            .material(Material::diffuse(Rgba::new(0.0, 0.0, 0.0, 1.0)))
            .reflection(reflection)
            .transparent(true)
            .refraction_index(1.5)
            .build()
    }

    #[test]
    fn refraction_passes_through_glass() {
        let backdrop = diffuse_sphere([0.0, 0.0, -40.0], 10.0, Rgba::new(0.0, 0.0, 1.0, 1.0));
        let objects = objects(vec![glass_ball(0.0), backdrop]);
        let settings = TraceSettings::default();
        // Off axis, so that the glass doesn't shadow the backdrop
        let lights = [Light::white([0.0, 30.0, 0.0].into())];
        let tracer = Tracer::new(&objects, &lights, &settings);

        let (color, rays) = tracer.trace_collecting(&forward());

        assert!(color.b > 0.7);
        // Primary, inside the glass, behind the glass
        assert!(rays.len() == 3);
        assert!((rays[1].end - WorldPoint::new(0.0, 0.0, -12.0)).norm() < 1e-3);
        assert!((rays[2].end - WorldPoint::new(0.0, 0.0, -30.0)).norm() < 1e-2);
    }

    #[test]
    fn off_center_refraction_bends() {
        let objects = objects(vec![glass_ball(0.0)]);
        let settings = TraceSettings::default();
        let tracer = Tracer::new(&objects, &[], &settings);

        let ray = Ray::new([1.0, 0.0, 0.0].into(), [0.0, 0.0, -1.0].into());
        let (_, rays) = tracer.trace_collecting(&ray);

        assert!(rays.len() >= 2);
        // Bent towards the axis while inside
        assert!(rays[1].ray.direction.x < 0.0);
        assert!(rays[1].depth == 1);
    }

    #[test]
    fn total_internal_reflection_is_reflection_only() {
        let lights = [Light::white([0.0, 100.0, -10.0].into())];
        let settings = TraceSettings::default();

        // Inside the glass near its surface, travelling almost tangentially
        let ray = Ray::new([0.0, 1.9, -10.0].into(), [0.0, 0.1, -1.0].into());

        let glass = objects(vec![glass_ball(0.5)]);
        let mut rays = Vec::new();
        let color = Tracer::new(&glass, &lights, &settings).trace_ray(
            &ray,
            0,
            Side::Exiting,
            1.5,
            Some(&mut rays),
        );

        let opaque = objects(vec![
            Shape::builder()
                .geometry(Sphere::new([0.0, 0.0, -10.0].into(), 2.0))
                .material(Material::diffuse(Rgba::new(0.0, 0.0, 0.0, 1.0)))
                .reflection(0.5)
                .build(),
        ]);
        let reflection_only = Tracer::new(&opaque, &lights, &settings).trace_ray(
            &ray,
            0,
            Side::Exiting,
            1.5,
            None,
        );

        assert!(color == reflection_only);
        // Every spawned ray stays inside the glass
        assert!(rays.iter().all(|r| r.hit));
        assert!(rays.iter().all(|r| (r.end - WorldPoint::new(0.0, 0.0, -10.0)).norm() < 2.01));
    }

    #[test]
    fn channels_never_exceed_one() {
        let objects = objects(vec![diffuse_sphere(
            [0.0, 0.0, -10.0],
            2.0,
            Rgba::new(1.0, 1.0, 1.0, 1.0),
        )]);
        let settings = TraceSettings::default();
        let lights = [
            Light::white([0.0, 0.0, 10.0].into()),
            Light::white([1.0, 0.0, 10.0].into()),
            Light::white([0.0, 1.0, 10.0].into()),
        ];
        let tracer = Tracer::new(&objects, &lights, &settings);

        let color = tracer.trace(&forward());
        assert!(color == Rgba::new(1.0, 1.0, 1.0, 1.0));
    }
}
