// First-person camera pose and projection.
//
// Camera model:
//   - Free position in world space, Y up
//   - Yaw/pitch in degrees; yaw=0 looks along +X, yaw=-90 along -Z
//   - Front is always re-derived from yaw/pitch, except for the explicit
//     look-at framing used when entering the hotspot overview
//   - Pitch clamped to ±89° so the view matrix never degenerates

use glam::{Mat4, Vec3};

use super::config::CameraConfig;

pub const PITCH_LIMIT: f32 = 89.0;

/// Spherical-to-Cartesian conversion used for every yaw/pitch → front update.
pub fn front_from_yaw_pitch(yaw_deg: f32, pitch_deg: f32) -> Vec3 {
    let (yaw, pitch) = (yaw_deg.to_radians(), pitch_deg.to_radians());
    Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
}

/// Inverse of `front_from_yaw_pitch` for a unit vector.
pub fn yaw_pitch_from_front(front: Vec3) -> (f32, f32) {
    let yaw = front.z.atan2(front.x).to_degrees();
    let pitch = front.y.clamp(-1.0, 1.0).asin().to_degrees();
    (yaw, pitch)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    /// Unit look direction.
    pub front: Vec3,
    pub up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraPose {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Self {
            position,
            front: front_from_yaw_pitch(yaw, pitch),
            up: Vec3::Y,
            yaw,
            pitch,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.default_position(), config.default_yaw, config.default_pitch)
    }

    /// Camera at `position` looking at `target`. Yaw/pitch are back-filled
    /// from the look direction so later mouse-look continues smoothly. A
    /// direction steeper than the pitch limit (or a target equal to the
    /// position, which looks straight down) is clamped to ±89° and the front
    /// re-derived.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let front = (target - position).try_normalize().unwrap_or(Vec3::NEG_Y);
        let (yaw, pitch) = yaw_pitch_from_front(front);
        if pitch.abs() > PITCH_LIMIT {
            return Self::new(position, yaw, pitch);
        }
        Self {
            position,
            front,
            up: Vec3::Y,
            yaw,
            pitch,
        }
    }

    /// Apply a yaw/pitch change in degrees and re-derive the front vector.
    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.front = front_from_yaw_pitch(self.yaw, self.pitch);
    }

    /// View matrix looking along `front`. When front is parallel to up the up
    /// hint is swapped for -Z.
    pub fn view_matrix(&self) -> Mat4 {
        let up = if self.front.cross(self.up).length_squared() < 1e-10 {
            Vec3::NEG_Z
        } else {
            self.up
        };
        Mat4::look_to_rh(self.position, self.front, up)
    }

    /// Front flattened onto the ground plane. Used as the "forward" of WASD.
    pub fn ground_forward(&self) -> Vec3 {
        Vec3::new(self.front.x, 0.0, self.front.z)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z)
    }
}

/// Perspective parameters. Aspect comes from the framebuffer each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            fov: config.fov_degrees,
            near: config.near,
            far: config.far,
        }
    }

    /// wgpu-style projection (clip depth in [0, 1]).
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    pub fn view_projection(&self, pose: &CameraPose, aspect: f32) -> Mat4 {
        self.matrix(aspect) * pose.view_matrix()
    }
}

/// Look-around driven by cursor motion while the cursor is captured.
#[derive(Debug, Clone)]
pub struct MouseLook {
    captured: bool,
    first_sample: bool,
    last: (f32, f32),
    pub sensitivity: f32,
}

impl MouseLook {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            captured: false,
            first_sample: true,
            last: (0.0, 0.0),
            sensitivity,
        }
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    pub fn capture(&mut self) {
        self.captured = true;
        self.first_sample = true;
    }

    /// Release capture and re-arm the first-sample flag so the next capture
    /// does not produce a jump.
    pub fn release(&mut self) {
        self.captured = false;
        self.first_sample = true;
    }

    /// Feed an absolute cursor position. Returns true if the pose changed.
    pub fn on_cursor(&mut self, pose: &mut CameraPose, x: f32, y: f32) -> bool {
        if !self.captured {
            self.first_sample = true;
            return false;
        }
        if self.first_sample {
            self.last = (x, y);
            self.first_sample = false;
        }

        // Window y grows downward, pitch grows upward.
        let dx = (x - self.last.0) * self.sensitivity;
        let dy = (self.last.1 - y) * self.sensitivity;
        self.last = (x, y);

        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        pose.rotate(dx, dy);
        true
    }
}
