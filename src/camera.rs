use assert2::assert;
use bon::bon;
use nalgebra::{Isometry3, Perspective3, Point2, Vector4};
use thiserror::Error;

use crate::geometry::{
    EPSILON, FloatType, Ray, ScreenPoint, ScreenSize, WorldMatrix, WorldPoint, WorldVector,
};

/// Source of the view and projection transforms, owned by the host.
pub trait ViewingVolume: Send + Sync {
    fn view_matrix(&self) -> WorldMatrix;
    fn projection_matrix(&self) -> WorldMatrix;
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    #[error("view matrix is not invertible")]
    SingularView,
    #[error("projection matrix has a zero horizontal or vertical scale")]
    DegenerateProjection,
    #[error("resolution must be non-zero")]
    EmptyResolution,
}

/// Ray generator for one frame, derived from the host's view and projection.
///
/// Matrices follow the nalgebra convention: column vectors, right handed view space
/// looking down -Z.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    inverse_view: WorldMatrix,
    view_projection: WorldMatrix,
    origin: WorldPoint,

    /// Horizontal and vertical scale terms of the projection
    scale_x: FloatType,
    scale_y: FloatType,

    resolution: ScreenSize,
}

impl Camera {
    pub fn new(
        view: &WorldMatrix,
        projection: &WorldMatrix,
        resolution: ScreenSize,
    ) -> Result<Self, CameraError> {
        if resolution.x == 0 || resolution.y == 0 {
            return Err(CameraError::EmptyResolution);
        }

        let inverse_view = view.try_inverse().ok_or(CameraError::SingularView)?;

        let scale_x = projection[(0, 0)];
        let scale_y = projection[(1, 1)];
        if scale_x.abs() < EPSILON || scale_y.abs() < EPSILON {
            return Err(CameraError::DegenerateProjection);
        }

        let origin = WorldPoint::new(
            inverse_view[(0, 3)],
            inverse_view[(1, 3)],
            inverse_view[(2, 3)],
        );

        Ok(Camera {
            inverse_view,
            view_projection: projection * view,
            origin,
            scale_x,
            scale_y,
            resolution,
        })
    }

    /// Reads both matrices from the viewing volume once.
    pub fn from_viewing_volume(
        volume: &dyn ViewingVolume,
        resolution: ScreenSize,
    ) -> Result<Self, CameraError> {
        Self::new(
            &volume.view_matrix(),
            &volume.projection_matrix(),
            resolution,
        )
    }

    pub fn get_resolution(&self) -> ScreenSize {
        self.resolution
    }

    /// Camera position in world space.
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    /// Ray through the given point in normalized device coordinates,
    /// x going right and y going up, both in [-1, 1].
    pub fn ray_for_ndc(&self, x: FloatType, y: FloatType) -> Ray {
        let view_direction = WorldVector::new(x / self.scale_x, y / self.scale_y, -1.0);
        let direction = self.inverse_view.transform_vector(&view_direction);
        Ray::new(self.origin, direction)
    }

    /// Ray through the center of an image pixel. Pixel rows go from top to bottom.
    pub fn ray_for_pixel(&self, point: &ScreenPoint) -> Ray {
        let x = 2.0 * (point.x as FloatType + 0.5) / self.resolution.x as FloatType - 1.0;
        let y = 1.0 - 2.0 * (point.y as FloatType + 0.5) / self.resolution.y as FloatType;
        self.ray_for_ndc(x, y)
    }

    /// Projects a world point to continuous pixel coordinates.
    /// Returns None for points behind the camera.
    pub fn project(&self, point: &WorldPoint) -> Option<Point2<FloatType>> {
        let clip = self.view_projection * Vector4::new(point.x, point.y, point.z, 1.0);
        if clip.w <= EPSILON {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        Some(Point2::new(
            (ndc_x + 1.0) / 2.0 * self.resolution.x as FloatType,
            (1.0 - ndc_y) / 2.0 * self.resolution.y as FloatType,
        ))
    }
}

/// Plain viewing volume holding fixed matrices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ViewProjection {
    pub view: WorldMatrix,
    pub projection: WorldMatrix,
}

#[bon]
impl ViewProjection {
    /// Perspective camera at `eye` looking at `target`. `fov_y` is in radians.
    #[builder]
    pub fn look_at(
        eye: WorldPoint,
        target: WorldPoint,
        up: WorldVector,
        fov_y: FloatType,
        aspect: FloatType,
        #[builder(default = 0.1)] near: FloatType,
        #[builder(default = 10000.0)] far: FloatType,
    ) -> Self {
        assert!(fov_y > 0.0);
        assert!(aspect > 0.0);
        assert!(near > 0.0);
        assert!(far > near);

        ViewProjection {
            view: Isometry3::look_at_rh(&eye, &target, &up).to_homogeneous(),
            projection: Perspective3::new(aspect, fov_y, near, far).to_homogeneous(),
        }
    }
}

impl ViewingVolume for ViewProjection {
    fn view_matrix(&self) -> WorldMatrix {
        self.view
    }

    fn projection_matrix(&self) -> WorldMatrix {
        self.projection
    }
}
