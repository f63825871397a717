// Walking ⇄ Overview mode machine.
//
// Overview is the fixed top-down camera used for measuring. Entering it
// snapshots the live camera and map pan/zoom; leaving it restores that
// snapshot verbatim. At most one snapshot exists at a time.

use glam::{Vec2, Vec3};

use super::camera::{CameraPose, MouseLook};
use super::config::{CameraConfig, HotspotConfig};

// ============================================================================
// MAP VIEW
// ============================================================================

/// Visible window into the map texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    /// Texture-space top-left corner of the visible window.
    pub offset: Vec2,
    /// Fraction of the texture visible, 1.0 = fully zoomed out.
    pub scale: f32,
}

impl MapView {
    pub const FULL: MapView = MapView {
        offset: Vec2::ZERO,
        scale: 1.0,
    };

    /// Window of the given scale centered on the texture.
    pub fn centered(scale: f32) -> Self {
        let edge = (1.0 - scale) * 0.5;
        Self {
            offset: Vec2::splat(edge),
            scale,
        }
    }

    /// Largest offset that keeps the window inside [0, 1].
    pub fn max_offset(&self) -> f32 {
        (1.0 - self.scale).max(0.0)
    }
}

// ============================================================================
// MODES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Walking,
    Overview,
}

/// How overview was requested. The two produce slightly different framings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewEntry {
    /// Hotspot click: explicit position, oriented to look at the map center.
    Hotspot,
    /// Key press: fixed position behind the center with preset yaw/pitch.
    Key,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedViewState {
    pub pose: CameraPose,
    pub map: MapView,
}

/// Screen-corner rectangle that toggles overview when clicked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hotspot {
    pub min: Vec2,
    pub max: Vec2,
}

impl Hotspot {
    /// Rectangle of the icon currently shown. The HUD draws exactly this.
    pub fn from_config(config: &HotspotConfig, alternate: bool) -> Self {
        let width = if alternate { config.alternate_width } else { config.width };
        let min = Vec2::splat(config.margin);
        Self {
            min,
            max: min + Vec2::new(width, config.height),
        }
    }

    /// Inclusive containment, top-left pixel origin.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

// ============================================================================
// STATE MACHINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct Navigation {
    mode: ViewMode,
    saved: Option<SavedViewState>,
    /// Mirrors `mode == Overview`; tells the HUD which hotspot glyph to draw.
    pub pin_shows_alternate: bool,
}

impl Navigation {
    pub fn new() -> Self {
        Self {
            mode: ViewMode::Walking,
            saved: None,
            pin_shows_alternate: false,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_overview(&self) -> bool {
        self.mode == ViewMode::Overview
    }

    pub fn saved(&self) -> Option<&SavedViewState> {
        self.saved.as_ref()
    }

    /// Snapshot the live view and switch to the measuring camera.
    /// Returns false (and changes nothing) if already in overview.
    pub fn enter_overview(
        &mut self,
        entry: OverviewEntry,
        pose: &mut CameraPose,
        map: &mut MapView,
        look: &mut MouseLook,
        config: &CameraConfig,
    ) -> bool {
        if self.mode == ViewMode::Overview {
            return false;
        }

        self.saved = Some(SavedViewState { pose: *pose, map: *map });
        look.release();
        *map = MapView::FULL;
        *pose = overview_pose(entry, config);

        self.mode = ViewMode::Overview;
        self.pin_shows_alternate = true;
        log::info!(
            "entered overview ({entry:?}) at {:?} yaw {:.1} pitch {:.1}",
            pose.position,
            pose.yaw,
            pose.pitch
        );
        true
    }

    /// Restore the snapshot taken on entry. Returns false if not in overview.
    pub fn exit_overview(&mut self, pose: &mut CameraPose, map: &mut MapView) -> bool {
        if self.mode == ViewMode::Walking {
            return false;
        }
        if let Some(saved) = self.saved.take() {
            *pose = saved.pose;
            *map = saved.map;
        }
        self.mode = ViewMode::Walking;
        self.pin_shows_alternate = false;
        log::info!("returned to walking at {:?}", pose.position);
        true
    }

    pub fn toggle(
        &mut self,
        entry: OverviewEntry,
        pose: &mut CameraPose,
        map: &mut MapView,
        look: &mut MouseLook,
        config: &CameraConfig,
    ) -> ViewMode {
        match self.mode {
            ViewMode::Walking => self.enter_overview(entry, pose, map, look, config),
            ViewMode::Overview => self.exit_overview(pose, map),
        };
        self.mode
    }

    /// Zoom scale active while walking: the saved one during overview.
    pub fn walking_scale(&self, live: &MapView) -> f32 {
        match (&self.mode, &self.saved) {
            (ViewMode::Overview, Some(saved)) => saved.map.scale,
            _ => live.scale,
        }
    }
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new()
    }
}

/// The measuring camera for a given entry variant.
pub fn overview_pose(entry: OverviewEntry, config: &CameraConfig) -> CameraPose {
    match entry {
        OverviewEntry::Hotspot => CameraPose::looking_at(config.measuring_position(), Vec3::ZERO),
        OverviewEntry::Key => CameraPose::new(
            Vec3::new(0.0, config.measuring_height, config.overview_back),
            config.overview_yaw,
            config.overview_pitch,
        ),
    }
}
