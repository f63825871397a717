// Directional input → movement, facing, and walk-cycle animation.
//
// One controller, two movement variants:
//   MapPan  legacy 2D path. WASD slides the visible window over the map
//           texture, figure stays centered on screen.
//   Avatar  WASD walks a 3D model on the plane relative to the camera's
//           ground-projected forward, turning at a limited rate.
// Facing and animation are derived the same way for both.

use glam::{Mat4, Quat, Vec2, Vec3};

use super::config::{AvatarConfig, MotionMode, ViewerConfig};
use super::navigation::MapView;

/// Moves smaller than this are not counted toward distance walked.
const DISTANCE_EPSILON: f32 = 1e-6;

// ============================================================================
// INPUT
// ============================================================================

/// Held movement keys for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MovementKeys {
    /// Raw direction: x = right − left, y = forward − back. Not normalized.
    pub fn axis(&self) -> Vec2 {
        let mut axis = Vec2::ZERO;
        if self.forward { axis.y += 1.0; }
        if self.back    { axis.y -= 1.0; }
        if self.right   { axis.x += 1.0; }
        if self.left    { axis.x -= 1.0; }
        axis
    }
}

// ============================================================================
// FACING / ANIMATION
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    #[default]
    Idle,
    Right,
    Left,
    Up,
    Down,
}

impl Facing {
    /// Horizontal components win over vertical ones.
    pub fn from_axis(axis: Vec2) -> Self {
        if axis.x > 0.0 {
            Facing::Right
        } else if axis.x < 0.0 {
            Facing::Left
        } else if axis.y > 0.0 {
            Facing::Up
        } else if axis.y < 0.0 {
            Facing::Down
        } else {
            Facing::Idle
        }
    }

    pub fn is_moving(self) -> bool {
        self != Facing::Idle
    }
}

/// Two-frame walk cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WalkAnimation {
    pub timer: f32,
    /// 0 or 1.
    pub frame: u8,
}

impl WalkAnimation {
    pub fn update(&mut self, facing: Facing, dt: f32, period: f32) {
        if !facing.is_moving() {
            *self = Self::default();
            return;
        }
        self.timer += dt;
        while self.timer >= period {
            self.timer -= period;
            self.frame ^= 1;
        }
    }
}

// ============================================================================
// YAW HELPERS
// ============================================================================

/// Wrap an angle into [-180, 180).
pub fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed shortest rotation from `current` to `target`, in [-180, 180).
pub fn shortest_yaw_delta(current: f32, target: f32) -> f32 {
    wrap_degrees(target - current)
}

/// Turn from `current` toward `target` by at most `max_step` degrees.
/// A negative budget is treated as zero.
pub fn step_yaw(current: f32, target: f32, max_step: f32) -> f32 {
    let max_step = max_step.max(0.0);
    let delta = shortest_yaw_delta(current, target);
    wrap_degrees(current + delta.clamp(-max_step, max_step))
}

/// Yaw (degrees) of a ground-plane direction, matching the camera convention.
pub fn yaw_of(direction: Vec3) -> f32 {
    direction.z.atan2(direction.x).to_degrees()
}

// ============================================================================
// VARIANT STATE
// ============================================================================

/// Map-pan variant: distance walked, in screen pixels at the walking zoom.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MapPanState {
    pub distance_px: f32,
}

impl MapPanState {
    /// Slide the map window. Speed scales with zoom so a zoomed-in view pans
    /// proportionally slower across the texture.
    pub fn update(&mut self, axis: Vec2, dt: f32, map: &mut MapView, pan_speed: f32, screen: Vec2) {
        let Some(dir) = axis.try_normalize() else {
            return;
        };

        // Screen up is texture -v.
        let step = Vec2::new(dir.x, -dir.y) * pan_speed * map.scale * dt;
        let before = map.offset;
        let max = map.max_offset();
        map.offset = (map.offset + step).clamp(Vec2::ZERO, Vec2::splat(max));

        if map.scale > 0.0 {
            let moved_px = (map.offset - before) * screen / map.scale;
            self.distance_px += moved_px.length();
        }
    }
}

/// Avatar variant: model pose on the plane plus distance walked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvatarState {
    pub position: Vec3,
    /// Degrees, same convention as camera yaw.
    pub yaw: f32,
    pub target_yaw: f32,
    pub meters: f32,
}

impl Default for AvatarState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            target_yaw: 0.0,
            meters: 0.0,
        }
    }
}

impl AvatarState {
    pub fn update(&mut self, axis: Vec2, dt: f32, ground_forward: Vec3, tuning: &MotionTuning) {
        let right = ground_forward.cross(Vec3::Y);
        let Some(dir) = (ground_forward * axis.y + right * axis.x).try_normalize() else {
            return;
        };

        self.target_yaw = yaw_of(dir);
        self.yaw = step_yaw(self.yaw, self.target_yaw, tuning.turn_rate * dt);

        let before = self.position;
        let limit = tuning.avatar_limit.max(0.0);
        let next = self.position + dir * tuning.move_speed * dt;
        self.position = Vec3::new(next.x.clamp(-limit, limit), next.y, next.z.clamp(-limit, limit));

        let moved = self.position.distance(before);
        if moved > DISTANCE_EPSILON {
            self.meters += moved * tuning.meters_per_world_unit;
        }
    }
}

// ============================================================================
// MODEL PLACEMENT
// ============================================================================

/// What the model loader reports for a loaded mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPlacement {
    /// Bounding-box center in model space.
    pub center: Vec3,
    /// Uniform scale that brings the model to its load height.
    pub scale: f32,
}

impl ModelPlacement {
    /// Placement for a unit cube stand-in scaled to `height`.
    pub fn unit_box(height: f32) -> Self {
        Self { center: Vec3::ZERO, scale: height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarSize {
    Big,
    Mini,
}

impl AvatarSize {
    /// Height used to lift the model so it stands on the plane.
    pub fn desired_height(self, config: &AvatarConfig) -> f32 {
        match self {
            AvatarSize::Big => config.big_height,
            AvatarSize::Mini => config.mini_height,
        }
    }

    /// Height handed to the model loader for its scale computation.
    pub fn load_height(self, config: &AvatarConfig) -> f32 {
        match self {
            AvatarSize::Big => config.big_load_height,
            AvatarSize::Mini => config.mini_load_height,
        }
    }
}

/// translate(position + lift) · rotate(yaw) · scale · translate(−center)
pub fn avatar_transform(avatar: &AvatarState, yaw_offset: f32, lift: f32, placement: &ModelPlacement) -> Mat4 {
    let rotation = Quat::from_rotation_y(-(avatar.yaw + yaw_offset).to_radians());
    Mat4::from_translation(avatar.position + Vec3::Y * lift)
        * Mat4::from_quat(rotation)
        * Mat4::from_scale(Vec3::splat(placement.scale))
        * Mat4::from_translation(-placement.center)
}

// ============================================================================
// CONTROLLER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTuning {
    pub mode: MotionMode,
    pub pan_speed: f32,
    pub move_speed: f32,
    pub turn_rate: f32,
    pub meters_per_world_unit: f32,
    /// Avatar stays within ±avatar_limit on X and Z.
    pub avatar_limit: f32,
    pub frame_period: f32,
}

impl MotionTuning {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            mode: config.avatar.motion_mode,
            pan_speed: config.map.pan_speed,
            move_speed: config.avatar.move_speed,
            turn_rate: config.avatar.turn_rate,
            meters_per_world_unit: config.avatar.meters_per_world_unit,
            avatar_limit: config.map.half_extent + config.camera.clamp_margin,
            frame_period: config.animation.frame_period,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionController {
    pub tuning: MotionTuning,
    pub facing: Facing,
    pub animation: WalkAnimation,
    pub pan: MapPanState,
    pub avatar: AvatarState,
}

impl MotionController {
    pub fn new(tuning: MotionTuning) -> Self {
        Self {
            tuning,
            facing: Facing::Idle,
            animation: WalkAnimation::default(),
            pan: MapPanState::default(),
            avatar: AvatarState::default(),
        }
    }

    pub fn mode(&self) -> MotionMode {
        self.tuning.mode
    }

    /// One frame of movement. `screen` is the framebuffer size, used to turn
    /// map-pan offsets into pixels.
    pub fn update(&mut self, keys: MovementKeys, dt: f32, map: &mut MapView, ground_forward: Vec3, screen: Vec2) {
        let axis = keys.axis();
        match self.tuning.mode {
            MotionMode::MapPan => self.pan.update(axis, dt, map, self.tuning.pan_speed, screen),
            MotionMode::Avatar => self.avatar.update(axis, dt, ground_forward, &self.tuning),
        }

        self.facing = Facing::from_axis(axis);
        self.animation.update(self.facing, dt, self.tuning.frame_period);
    }

    /// Distance walked so far, in meters.
    pub fn walked_meters(&self, meters_per_pixel: f32) -> f32 {
        match self.tuning.mode {
            MotionMode::MapPan => self.pan.distance_px * meters_per_pixel,
            MotionMode::Avatar => self.avatar.meters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning(mode: MotionMode) -> MotionTuning {
        MotionTuning::from_config(&ViewerConfig {
            avatar: AvatarConfig {
                motion_mode: mode,
                ..AvatarConfig::default()
            },
            ..ViewerConfig::default()
        })
    }

    fn keys(forward: bool, back: bool, left: bool, right: bool) -> MovementKeys {
        MovementKeys { forward, back, left, right }
    }

    #[test]
    fn yaw_wraps_the_short_way() {
        assert!((shortest_yaw_delta(170.0, -170.0) - 20.0).abs() < 1e-4);
        assert!((shortest_yaw_delta(-170.0, 170.0) + 20.0).abs() < 1e-4);
        assert!((shortest_yaw_delta(10.0, 40.0) - 30.0).abs() < 1e-4);
    }

    #[test]
    fn step_yaw_lands_exactly_when_budget_suffices() {
        let yaw = step_yaw(170.0, -170.0, 720.0 * 0.1);
        assert!((yaw + 170.0).abs() < 1e-3);
    }

    #[test]
    fn step_yaw_is_rate_limited() {
        let yaw = step_yaw(0.0, 90.0, 10.0);
        assert!((yaw - 10.0).abs() < 1e-4);
        let yaw = step_yaw(0.0, -90.0, 10.0);
        assert!((yaw + 10.0).abs() < 1e-4);
    }

    #[test]
    fn negative_turn_budget_holds_yaw() {
        assert_eq!(step_yaw(30.0, 90.0, -5.0), 30.0);
    }

    #[test]
    fn negative_avatar_limit_pins_to_center() {
        let mut avatar = AvatarState::default();
        let tuning = MotionTuning { avatar_limit: -10.0, ..tuning(MotionMode::Avatar) };
        avatar.update(Vec2::new(1.0, 0.0), 0.1, Vec3::NEG_Z, &tuning);
        assert_eq!(avatar.position, Vec3::ZERO);
    }

    #[test]
    fn facing_priority() {
        assert_eq!(Facing::from_axis(Vec2::new(1.0, 1.0)), Facing::Right);
        assert_eq!(Facing::from_axis(Vec2::new(-1.0, -1.0)), Facing::Left);
        assert_eq!(Facing::from_axis(Vec2::new(0.0, 1.0)), Facing::Up);
        assert_eq!(Facing::from_axis(Vec2::new(0.0, -1.0)), Facing::Down);
        assert_eq!(Facing::from_axis(Vec2::ZERO), Facing::Idle);
    }

    #[test]
    fn opposing_keys_cancel() {
        assert_eq!(keys(true, true, true, true).axis(), Vec2::ZERO);
    }

    #[test]
    fn animation_toggles_every_period_and_resets_when_idle() {
        let mut anim = WalkAnimation::default();
        anim.update(Facing::Right, 0.3, 0.5);
        assert_eq!(anim.frame, 0);
        anim.update(Facing::Right, 0.3, 0.5);
        assert_eq!(anim.frame, 1);
        assert!((anim.timer - 0.1).abs() < 1e-5);
        anim.update(Facing::Idle, 0.3, 0.5);
        assert_eq!(anim, WalkAnimation::default());
    }

    #[test]
    fn diagonal_pan_has_cardinal_speed() {
        let mut map = MapView::centered(0.5);
        let mut pan = MapPanState::default();
        pan.update(Vec2::new(1.0, 1.0), 0.1, &mut map, 0.2, Vec2::new(800.0, 800.0));
        let moved = map.offset - Vec2::splat(0.25);
        assert!((moved.length() - 0.2 * 0.5 * 0.1).abs() < 1e-5);
        assert!(moved.x > 0.0 && moved.y < 0.0);
        // 0.01 texture units at scale 0.5 on an 800px screen → 16px.
        assert!((pan.distance_px - 16.0).abs() < 1e-2);
    }

    #[test]
    fn pan_is_clamped_to_texture() {
        let mut map = MapView { offset: Vec2::new(0.84, 0.0), scale: 0.15 };
        let mut pan = MapPanState::default();
        pan.update(Vec2::new(1.0, 1.0), 10.0, &mut map, 1.0, Vec2::new(800.0, 600.0));
        assert!((map.offset.x - 0.85).abs() < 1e-6);
        assert_eq!(map.offset.y, 0.0);
    }

    #[test]
    fn avatar_walks_forward_and_turns() {
        let mut controller = MotionController::new(tuning(MotionMode::Avatar));
        let mut map = MapView::centered(0.15);
        // Camera looks along -Z, so W walks toward -Z (yaw -90).
        for _ in 0..10 {
            controller.update(keys(true, false, false, false), 0.1, &mut map, Vec3::NEG_Z, Vec2::splat(800.0));
        }
        assert!((controller.avatar.position.z + 4.0).abs() < 1e-4);
        assert!((controller.avatar.yaw + 90.0).abs() < 1e-3);
        assert!((controller.walked_meters(0.5) - 4.0 * 400.0).abs() < 0.5);
        assert_eq!(controller.facing, Facing::Up);
        // Map is untouched in avatar mode.
        assert_eq!(map, MapView::centered(0.15));
    }

    #[test]
    fn avatar_is_clamped_and_stops_counting_at_the_edge() {
        let mut controller = MotionController::new(tuning(MotionMode::Avatar));
        let mut map = MapView::FULL;
        for _ in 0..100 {
            controller.update(keys(false, false, false, true), 0.1, &mut map, Vec3::NEG_Z, Vec2::ONE);
        }
        let limit = controller.tuning.avatar_limit;
        assert!((controller.avatar.position.x - limit).abs() < 1e-4);
        let meters = controller.avatar.meters;
        controller.update(keys(false, false, false, true), 0.1, &mut map, Vec3::NEG_Z, Vec2::ONE);
        assert_eq!(controller.avatar.meters, meters);
    }

    #[test]
    fn idle_avatar_keeps_pose() {
        let mut controller = MotionController::new(tuning(MotionMode::Avatar));
        let mut map = MapView::FULL;
        controller.avatar.yaw = 45.0;
        controller.update(MovementKeys::default(), 0.5, &mut map, Vec3::NEG_Z, Vec2::ONE);
        assert_eq!(controller.avatar.yaw, 45.0);
        assert_eq!(controller.avatar.meters, 0.0);
        assert_eq!(controller.facing, Facing::Idle);
    }

    #[test]
    fn map_pan_mode_moves_map() {
        let mut controller = MotionController::new(tuning(MotionMode::MapPan));
        let mut map = MapView::centered(0.15);
        controller.update(keys(false, false, true, false), 0.5, &mut map, Vec3::NEG_Z, Vec2::splat(800.0));
        assert!(map.offset.x < MapView::centered(0.15).offset.x);
        assert_eq!(controller.facing, Facing::Left);
        assert!(controller.walked_meters(0.5) > 0.0);
        assert_eq!(controller.avatar, AvatarState::default());
    }

    #[test]
    fn transform_places_model_on_plane() {
        let avatar = AvatarState { position: Vec3::new(2.0, 0.0, 3.0), ..AvatarState::default() };
        let placement = ModelPlacement { center: Vec3::new(0.0, 1.0, 0.0), scale: 0.5 };
        let m = avatar_transform(&avatar, 0.0, 0.75, &placement);
        // Model center lands at position + lift.
        let center = m.transform_point3(placement.center);
        assert!((center - Vec3::new(2.0, 0.75, 3.0)).length() < 1e-5);
    }

    #[test]
    fn transform_rotation_follows_yaw() {
        let avatar = AvatarState { yaw: 90.0, ..AvatarState::default() };
        let m = avatar_transform(&avatar, 0.0, 0.0, &ModelPlacement::unit_box(1.0));
        // Yaw 90 faces +Z, so model +X must map there.
        let forward = m.transform_vector3(Vec3::X);
        assert!((forward - Vec3::Z).length() < 1e-5);
    }
}
