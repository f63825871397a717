// Pixel → world ray casting against the map plane (y = 0).
//
// Pipeline for a click:
//   window pixel → framebuffer pixel (HiDPI) → NDC → inverse(P·V) → ray
//   → ray/plane intersection → map bounds check
//
// Every rejection is reported as a `PickMiss` so callers can log or test it;
// the viewer itself just ignores the click.

use glam::{DMat4, DVec3, DVec4, Mat4, Vec2, Vec3};

use super::camera::{CameraPose, Projection};
use super::navigation::MapView;

/// Clip-space depth of the near and far planes for `Projection::matrix`
/// (wgpu convention, depth in [0, 1]).
pub const NEAR_CLIP_Z: f64 = 0.0;
pub const FAR_CLIP_Z: f64 = 1.0;

/// Rays flatter than this are treated as parallel to the ground.
const PARALLEL_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickMiss {
    /// Window or framebuffer has zero area (e.g. minimized).
    EmptyViewport,
    /// Inverse projection produced w = 0 or coincident near/far points.
    DegenerateUnprojection,
    /// Ray runs (nearly) parallel to the ground plane.
    ParallelRay,
    /// Plane intersection lies behind the ray origin.
    BehindOrigin,
    /// Intersection lies outside the map plane.
    OutsideMap,
}

/// Window and framebuffer sizes. They differ on HiDPI displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub window: Vec2,
    pub framebuffer: Vec2,
}

impl Viewport {
    pub fn new(window: Vec2, framebuffer: Vec2) -> Self {
        Self { window, framebuffer }
    }

    /// Same size for window and framebuffer.
    #[cfg(test)]
    pub fn uniform(width: f32, height: f32) -> Self {
        let size = Vec2::new(width, height);
        Self::new(size, size)
    }

    pub fn is_empty(&self) -> bool {
        self.window.x <= 0.0 || self.window.y <= 0.0 || self.framebuffer.x <= 0.0 || self.framebuffer.y <= 0.0
    }

    pub fn aspect(&self) -> f32 {
        if self.framebuffer.y > 0.0 {
            self.framebuffer.x / self.framebuffer.y
        } else {
            1.0
        }
    }

    /// Scale a window-space cursor position into framebuffer pixels.
    pub fn window_to_framebuffer(&self, window_px: Vec2) -> Option<Vec2> {
        if self.is_empty() {
            return None;
        }
        Some(window_px * self.framebuffer / self.window)
    }

    /// Framebuffer pixel (top-left origin) → NDC (bottom-left origin, [-1, 1]).
    pub fn pixel_to_ndc(&self, px: Vec2) -> Vec2 {
        Vec2::new(
            (px.x / self.framebuffer.x) * 2.0 - 1.0,
            1.0 - (px.y / self.framebuffer.y) * 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersection with the plane y = 0.
    pub fn intersect_ground(&self) -> Result<Vec3, PickMiss> {
        if self.direction.y.abs() < PARALLEL_EPSILON {
            return Err(PickMiss::ParallelRay);
        }
        let t = -self.origin.y / self.direction.y;
        if t < 0.0 {
            return Err(PickMiss::BehindOrigin);
        }
        Ok(self.at(t))
    }
}

fn unproject_point(inverse_view_proj: DMat4, ndc: Vec2, depth: f64) -> Option<DVec3> {
    let world = inverse_view_proj * DVec4::new(ndc.x as f64, ndc.y as f64, depth, 1.0);
    if world.w.abs() <= f64::EPSILON {
        return None;
    }
    let point = world.truncate() / world.w;
    point.is_finite().then_some(point)
}

/// Build the world-space ray through an NDC position.
///
/// The inverse runs in f64: with a far/near ratio around 1000 an f32 inverse
/// leaves enough noise in the far point to hide a horizontal ray from the
/// parallel check.
pub fn unproject_ray(view_proj: Mat4, ndc: Vec2) -> Result<Ray, PickMiss> {
    let inverse = view_proj.as_dmat4().inverse();
    let near = unproject_point(inverse, ndc, NEAR_CLIP_Z).ok_or(PickMiss::DegenerateUnprojection)?;
    let far = unproject_point(inverse, ndc, FAR_CLIP_Z).ok_or(PickMiss::DegenerateUnprojection)?;
    let direction = (far - near)
        .try_normalize()
        .ok_or(PickMiss::DegenerateUnprojection)?;
    Ok(Ray {
        origin: near.as_vec3(),
        direction: direction.as_vec3(),
    })
}

/// Ray through a framebuffer pixel for the given camera.
pub fn pixel_ray(
    fb_px: Vec2,
    pose: &CameraPose,
    projection: &Projection,
    viewport: &Viewport,
) -> Result<Ray, PickMiss> {
    if viewport.is_empty() {
        return Err(PickMiss::EmptyViewport);
    }
    let view_proj = projection.view_projection(pose, viewport.aspect());
    unproject_ray(view_proj, viewport.pixel_to_ndc(fb_px))
}

pub fn within_map(hit: Vec3, half_extent: f32) -> bool {
    hit.x >= -half_extent && hit.x <= half_extent && hit.z >= -half_extent && hit.z <= half_extent
}

/// Full click test: where on the map (if anywhere) a framebuffer pixel lands.
pub fn pick_ground(
    fb_px: Vec2,
    pose: &CameraPose,
    projection: &Projection,
    viewport: &Viewport,
    half_extent: f32,
) -> Result<Vec3, PickMiss> {
    let hit = pixel_ray(fb_px, pose, projection, viewport)?.intersect_ground()?;
    if !within_map(hit, half_extent) {
        return Err(PickMiss::OutsideMap);
    }
    Ok(hit)
}

/// Index of the first point (in insertion order) within `radius` of `click`.
pub fn hit_test(points: &[Vec2], click: Vec2, radius: f32) -> Option<usize> {
    let radius_sq = radius * radius;
    points
        .iter()
        .position(|p| p.distance_squared(click) <= radius_sq)
}

/// World position for a 3D pin at a stored framebuffer pixel.
///
/// Re-casts the pixel with the current camera. If that misses the plane the
/// pixel is mapped through the map view that was active while walking.
pub fn pin_world_position(
    fb_px: Vec2,
    pose: &CameraPose,
    projection: &Projection,
    viewport: &Viewport,
    walking_map: &MapView,
    plane_size: f32,
) -> Vec3 {
    match pixel_ray(fb_px, pose, projection, viewport).and_then(|ray| ray.intersect_ground()) {
        Ok(hit) => Vec3::new(hit.x, 0.0, hit.z),
        Err(_) => texture_mapped_position(fb_px, viewport, walking_map, plane_size),
    }
}

fn texture_mapped_position(fb_px: Vec2, viewport: &Viewport, map: &MapView, plane_size: f32) -> Vec3 {
    let screen = if viewport.framebuffer.x > 0.0 && viewport.framebuffer.y > 0.0 {
        fb_px / viewport.framebuffer
    } else {
        Vec2::splat(0.5)
    };
    let tex = map.offset + screen * map.scale;
    Vec3::new((0.5 - tex.x) * plane_size, 0.0, (tex.y - 0.5) * plane_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_down_camera() -> (CameraPose, Projection, Viewport) {
        // Exactly straight down, past the pitch limit mouse-look allows.
        let pose = CameraPose {
            position: Vec3::new(0.0, 10.0, 0.0),
            front: Vec3::NEG_Y,
            up: Vec3::Y,
            yaw: 0.0,
            pitch: -90.0,
        };
        let projection = Projection { fov: 45.0, near: 0.005, far: 100.0 };
        (pose, projection, Viewport::uniform(800.0, 800.0))
    }

    #[test]
    fn hidpi_cursor_is_scaled_to_framebuffer() {
        let viewport = Viewport::new(Vec2::new(800.0, 600.0), Vec2::new(1600.0, 1200.0));
        assert_eq!(
            viewport.window_to_framebuffer(Vec2::new(100.0, 50.0)),
            Some(Vec2::new(200.0, 100.0))
        );
    }

    #[test]
    fn ndc_flips_y() {
        let viewport = Viewport::uniform(800.0, 600.0);
        assert_eq!(viewport.pixel_to_ndc(Vec2::ZERO), Vec2::new(-1.0, 1.0));
        assert_eq!(viewport.pixel_to_ndc(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0));
        assert_eq!(viewport.pixel_to_ndc(Vec2::new(400.0, 300.0)), Vec2::ZERO);
    }

    #[test]
    fn center_click_hits_origin_from_above() {
        let (pose, projection, viewport) = top_down_camera();
        let ray = pixel_ray(Vec2::new(400.0, 400.0), &pose, &projection, &viewport).unwrap();
        assert!((ray.direction.y + 1.0).abs() < 1e-4);

        let t = -ray.origin.y / ray.direction.y;
        assert!((t - 10.0).abs() < 0.01);

        let hit = pick_ground(Vec2::new(400.0, 400.0), &pose, &projection, &viewport, 0.5).unwrap();
        assert!(hit.length() < 1e-3);
    }

    #[test]
    fn edge_click_outside_plane_is_rejected() {
        let (pose, projection, viewport) = top_down_camera();
        // Screen edge sees ~4.1 units from center at height 10 with 45° fov.
        let miss = pick_ground(Vec2::new(0.0, 400.0), &pose, &projection, &viewport, 2.0);
        assert_eq!(miss, Err(PickMiss::OutsideMap));

        let hit = pick_ground(Vec2::new(0.0, 400.0), &pose, &projection, &viewport, 10.0);
        assert!(hit.is_ok());
    }

    #[test]
    fn horizon_ray_is_parallel() {
        let pose = CameraPose::new(Vec3::new(0.0, 5.0, 0.0), 0.0, 0.0);
        let projection = Projection { fov: 45.0, near: 0.1, far: 100.0 };
        let viewport = Viewport::uniform(800.0, 800.0);
        let ray = pixel_ray(Vec2::new(400.0, 400.0), &pose, &projection, &viewport).unwrap();
        assert_eq!(ray.intersect_ground(), Err(PickMiss::ParallelRay));
    }

    #[test]
    fn horizontal_pin_falls_back_to_texture_mapping() {
        // Looking level along +X: the center ray never meets the ground.
        let pose = CameraPose::new(Vec3::new(0.0, 5.0, 0.0), 0.0, 0.0);
        let projection = Projection { fov: 45.0, near: 0.1, far: 100.0 };
        let viewport = Viewport::uniform(800.0, 800.0);
        let map = MapView { offset: Vec2::new(0.25, 0.25), scale: 0.5 };
        let pin = pin_world_position(Vec2::new(400.0, 400.0), &pose, &projection, &viewport, &map, 20.0);
        assert!(pin.length() < 1e-5, "pin placed at {pin:?}");
    }

    #[test]
    fn upward_ray_is_behind_origin() {
        let pose = CameraPose::new(Vec3::new(0.0, 5.0, 0.0), 0.0, 45.0);
        let projection = Projection { fov: 45.0, near: 0.1, far: 100.0 };
        let viewport = Viewport::uniform(800.0, 800.0);
        let miss = pick_ground(Vec2::new(400.0, 400.0), &pose, &projection, &viewport, 10.0);
        assert_eq!(miss, Err(PickMiss::BehindOrigin));
    }

    #[test]
    fn empty_viewport_is_rejected() {
        let (pose, projection, _) = top_down_camera();
        let viewport = Viewport::new(Vec2::new(800.0, 600.0), Vec2::ZERO);
        assert_eq!(viewport.window_to_framebuffer(Vec2::ONE), None);
        assert_eq!(
            pick_ground(Vec2::ZERO, &pose, &projection, &viewport, 10.0),
            Err(PickMiss::EmptyViewport)
        );
    }

    #[test]
    fn hit_test_prefers_insertion_order() {
        let points = [Vec2::new(100.0, 100.0), Vec2::new(105.0, 100.0), Vec2::new(300.0, 300.0)];
        // Closer to the second point, but the first is still within radius.
        assert_eq!(hit_test(&points, Vec2::new(104.0, 100.0), 12.0), Some(0));
        assert_eq!(hit_test(&points, Vec2::new(300.0, 312.0), 12.0), Some(2));
        assert_eq!(hit_test(&points, Vec2::new(300.0, 312.1), 12.0), None);
        assert_eq!(hit_test(&[], Vec2::ZERO, 12.0), None);
    }

    #[test]
    fn pin_falls_back_to_texture_mapping() {
        let pose = CameraPose::new(Vec3::new(0.0, 5.0, 0.0), 0.0, 45.0);
        let projection = Projection { fov: 45.0, near: 0.1, far: 100.0 };
        let viewport = Viewport::uniform(800.0, 800.0);
        let map = MapView { offset: Vec2::new(0.25, 0.25), scale: 0.5 };
        let pin = pin_world_position(Vec2::new(400.0, 400.0), &pose, &projection, &viewport, &map, 20.0);
        // Screen center maps to texture center (0.5, 0.5) → plane origin.
        assert!(pin.length() < 1e-5);
    }

    #[test]
    fn pin_uses_ray_when_it_hits() {
        let (pose, projection, viewport) = top_down_camera();
        let pin = pin_world_position(Vec2::new(400.0, 400.0), &pose, &projection, &viewport, &MapView::FULL, 20.0);
        assert!(pin.length() < 1e-3);
        assert_eq!(pin.y, 0.0);
    }
}
