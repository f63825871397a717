// Tunable constants for the viewer.
//
// Every value has a default so a missing or partial TOML file still yields a
// usable config. Loading order: $MAP_WALKER_CONFIG, then ./map_walker.toml,
// then built-in defaults.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::Deserialize;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MAP_WALKER_CONFIG";
/// Config file picked up from the working directory when no override is set.
pub const DEFAULT_CONFIG_FILE: &str = "map_walker.toml";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Frame-rate cap. The loop waits out the remainder of each frame period.
    pub target_fps: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Map Walker".to_string(),
            width: 1280,
            height: 800,
            target_fps: 75.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Half the side length of the square map plane, in world units.
    pub half_extent: f32,
    /// Fraction of the map texture visible while walking (1.0 = whole map).
    pub initial_tex_scale: f32,
    /// Pan speed in texture units per second at full zoom-out.
    pub pan_speed: f32,
    pub meters_per_pixel: f32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            half_extent: 10.0,
            initial_tex_scale: 0.15,
            pan_speed: 0.15,
            meters_per_pixel: 0.5,
        }
    }
}

impl MapConfig {
    /// Full side length of the plane.
    pub fn plane_size(&self) -> f32 {
        self.half_extent * 2.0
    }
}

/// Geometry of the mode-toggle icon in the top-left corner (framebuffer pixels).
/// The HUD draws the icon from these same numbers, so the clickable area and
/// the visible icon cannot drift apart.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HotspotConfig {
    pub margin: f32,
    pub width: f32,
    /// Width of the alternate (standing figure) glyph shown during overview.
    pub alternate_width: f32,
    pub height: f32,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            margin: 8.0,
            width: 80.0,
            alternate_width: 109.0,
            height: 109.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    /// Click tolerance around an existing point, in framebuffer pixels.
    pub hit_radius: f32,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self { hit_radius: 12.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub default_position: [f32; 3],
    pub default_yaw: f32,
    pub default_pitch: f32,
    /// Eye height while walking; adjusted by the scroll wheel.
    pub walking_height: f32,
    pub min_eye_height: f32,
    /// Height of the overview camera; also the upper bound for eye height.
    pub measuring_height: f32,
    /// Z distance of the key-triggered overview camera from the map center.
    pub overview_back: f32,
    pub overview_yaw: f32,
    pub overview_pitch: f32,
    /// Position of the hotspot-triggered overview camera (looks at the origin).
    pub measuring_position: [f32; 3],
    /// How far the walking camera may stray outside the plane.
    pub clamp_margin: f32,
    /// Degrees per pixel of cursor motion.
    pub mouse_sensitivity: f32,
    /// Eye-height change per scroll tick.
    pub scroll_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near: 0.005,
            far: 100.0,
            default_position: [0.0, 1.7, 6.0],
            default_yaw: -90.0,
            default_pitch: -10.0,
            walking_height: 1.7,
            min_eye_height: 0.01,
            measuring_height: 24.0,
            overview_back: 4.2,
            overview_yaw: -90.0,
            overview_pitch: -80.0,
            measuring_position: [0.0, 24.0, 4.2],
            clamp_margin: 1.0,
            mouse_sensitivity: 0.06,
            scroll_step: 0.5,
        }
    }
}

impl CameraConfig {
    pub fn default_position(&self) -> Vec3 {
        Vec3::from_array(self.default_position)
    }

    pub fn measuring_position(&self) -> Vec3 {
        Vec3::from_array(self.measuring_position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    /// Legacy 2D path: WASD pans the map texture under a fixed figure.
    MapPan,
    /// WASD walks a 3D avatar across the plane.
    Avatar,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub motion_mode: MotionMode,
    /// World units per second.
    pub move_speed: f32,
    /// Degrees per second.
    pub turn_rate: f32,
    pub meters_per_world_unit: f32,
    /// Distance the walking camera trails behind the avatar.
    pub follow_distance: f32,
    /// Added to the model's yaw so its modelled forward lines up with +X.
    pub model_yaw_offset: f32,
    pub big_height: f32,
    pub big_load_height: f32,
    pub mini_height: f32,
    pub mini_load_height: f32,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            motion_mode: MotionMode::Avatar,
            move_speed: 4.0,
            turn_rate: 720.0,
            meters_per_world_unit: 400.0,
            follow_distance: 2.5,
            model_yaw_offset: -90.0,
            big_height: 1.5,
            big_load_height: 1.5,
            mini_height: 0.4,
            mini_load_height: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Seconds between walk-cycle frame flips.
    pub frame_period: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { frame_period: 0.5 }
    }
}

// ============================================================================
// VIEWER CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub map: MapConfig,
    pub hotspot: HotspotConfig,
    pub measure: MeasureConfig,
    pub camera: CameraConfig,
    pub avatar: AvatarConfig,
    pub animation: AnimationConfig,
}

impl ViewerConfig {
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: ViewerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the config file the way the binary does at startup.
    pub fn discover() -> ConfigResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            log::info!("loading config from ${CONFIG_ENV_VAR}: {path}");
            return Self::load(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            log::info!("loading config from {}", local.display());
            return Self::load(local);
        }
        log::info!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        positive("map.half_extent", self.map.half_extent)?;
        positive("map.initial_tex_scale", self.map.initial_tex_scale)?;
        if self.map.initial_tex_scale > 1.0 {
            return Err(invalid("map.initial_tex_scale", "must not exceed 1.0"));
        }
        positive("map.pan_speed", self.map.pan_speed)?;
        positive("measure.hit_radius", self.measure.hit_radius)?;
        positive("hotspot.width", self.hotspot.width)?;
        positive("hotspot.alternate_width", self.hotspot.alternate_width)?;
        positive("hotspot.height", self.hotspot.height)?;
        positive("window.target_fps", self.window.target_fps)?;
        positive("animation.frame_period", self.animation.frame_period)?;
        positive("camera.near", self.camera.near)?;
        if self.camera.far <= self.camera.near {
            return Err(invalid("camera.far", "must be greater than camera.near"));
        }
        if self.map.half_extent + self.camera.clamp_margin <= 0.0 {
            return Err(invalid(
                "camera.clamp_margin",
                "must leave a positive walkable extent",
            ));
        }
        positive("avatar.move_speed", self.avatar.move_speed)?;
        positive("avatar.turn_rate", self.avatar.turn_rate)?;
        if self.camera.min_eye_height > self.camera.measuring_height {
            return Err(invalid(
                "camera.min_eye_height",
                "must not exceed camera.measuring_height",
            ));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> ConfigResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, &format!("must be positive, got {value}")))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
