// The viewer's single owned state.
//
// Frame order (driven by main.rs):
//   1. every input event → InputCommand → ViewportState::apply
//   2. ViewportState::update(dt, held keys)
//   3. renderers read camera / map / measurements / avatar through accessors
// Nothing here touches the window or GPU, so the whole core runs in tests.

use glam::{Mat4, Vec2, Vec3};

use super::camera::{CameraPose, MouseLook, Projection};
use super::config::{MotionMode, ViewerConfig};
use super::input::InputCommand;
use super::measure::MeasurementLedger;
use super::motion::{avatar_transform, AvatarSize, Facing, ModelPlacement, MotionController, MotionTuning, MovementKeys};
use super::navigation::{Hotspot, MapView, Navigation, OverviewEntry, ViewMode};
use super::picking::{self, PickMiss, Viewport};

/// What applying a command did. The viewer ignores most of these; they make
/// the silent paths observable for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    Unchanged,
    ModeChanged(ViewMode),
    LookCaptured(bool),
    CameraRotated,
    PointAdded(usize),
    PointRemoved(usize),
    MeasurementsCleared,
    ClickIgnored(PickMiss),
    EyeHeightChanged(f32),
    ModelReloadRequested(AvatarSize),
}

pub struct ViewportState {
    config: ViewerConfig,
    camera: CameraPose,
    projection: Projection,
    map: MapView,
    navigation: Navigation,
    look: MouseLook,
    ledger: MeasurementLedger,
    motion: MotionController,
    viewport: Viewport,
    /// Walking eye height target, adjusted by scrolling.
    eye_height: f32,
    avatar_size: AvatarSize,
    pending_model_reload: Option<AvatarSize>,
    primary_pressed: bool,
}

impl ViewportState {
    pub fn new(config: ViewerConfig, viewport: Viewport) -> Self {
        let mut camera = CameraPose::from_config(&config.camera);
        camera.position.y = config.camera.walking_height;
        Self {
            camera,
            projection: Projection::from_config(&config.camera),
            map: MapView::centered(config.map.initial_tex_scale),
            navigation: Navigation::new(),
            look: MouseLook::new(config.camera.mouse_sensitivity),
            ledger: MeasurementLedger::new(),
            motion: MotionController::new(MotionTuning::from_config(&config)),
            viewport,
            eye_height: config.camera.walking_height,
            avatar_size: AvatarSize::Big,
            pending_model_reload: None,
            primary_pressed: false,
            config,
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub fn apply(&mut self, command: InputCommand) -> CommandOutcome {
        match command {
            InputCommand::ToggleOverview => self.toggle_overview(OverviewEntry::Key),
            InputCommand::ToggleMouseLook => self.toggle_mouse_look(),
            InputCommand::PrimaryPress { window_px } => {
                self.primary_pressed = true;
                self.primary_click(window_px)
            }
            InputCommand::PrimaryRelease => {
                self.primary_pressed = false;
                CommandOutcome::Unchanged
            }
            InputCommand::LookCursor { x, y } => {
                if self.look.on_cursor(&mut self.camera, x, y) {
                    CommandOutcome::CameraRotated
                } else {
                    CommandOutcome::Unchanged
                }
            }
            InputCommand::Scroll { ticks } => self.scroll(ticks),
            InputCommand::SelectAvatarSize(size) => {
                self.avatar_size = size;
                self.pending_model_reload = Some(size);
                log::info!("avatar size {size:?} requested, reload scheduled");
                CommandOutcome::ModelReloadRequested(size)
            }
            InputCommand::ClearMeasurements => {
                self.ledger.clear();
                log::debug!("measurements cleared");
                CommandOutcome::MeasurementsCleared
            }
            InputCommand::ToggleStats | InputCommand::Exit => CommandOutcome::Unchanged,
        }
    }

    fn toggle_overview(&mut self, entry: OverviewEntry) -> CommandOutcome {
        let mode = self.navigation.toggle(
            entry,
            &mut self.camera,
            &mut self.map,
            &mut self.look,
            &self.config.camera,
        );
        CommandOutcome::ModeChanged(mode)
    }

    fn toggle_mouse_look(&mut self) -> CommandOutcome {
        if self.navigation.is_overview() {
            return CommandOutcome::Unchanged;
        }
        if self.look.is_captured() {
            self.look.release();
        } else {
            self.look.capture();
        }
        log::debug!("mouse look captured: {}", self.look.is_captured());
        CommandOutcome::LookCaptured(self.look.is_captured())
    }

    fn primary_click(&mut self, window_px: Vec2) -> CommandOutcome {
        let Some(fb_px) = self.viewport.window_to_framebuffer(window_px) else {
            return CommandOutcome::ClickIgnored(PickMiss::EmptyViewport);
        };

        if self.hotspot().contains(fb_px) {
            return self.toggle_overview(OverviewEntry::Hotspot);
        }
        if !self.navigation.is_overview() {
            return CommandOutcome::Unchanged;
        }
        self.measure_click(fb_px)
    }

    fn measure_click(&mut self, fb_px: Vec2) -> CommandOutcome {
        if let Err(miss) = picking::pick_ground(
            fb_px,
            &self.camera,
            &self.projection,
            &self.viewport,
            self.config.map.half_extent,
        ) {
            log::debug!("click at {fb_px} ignored: {miss:?}");
            return CommandOutcome::ClickIgnored(miss);
        }

        if let Some(index) = picking::hit_test(self.ledger.points(), fb_px, self.config.measure.hit_radius) {
            self.ledger.remove_point(index);
            log::debug!("removed point {index}, total {:.1}px", self.ledger.distance_px());
            return CommandOutcome::PointRemoved(index);
        }

        let index = self.ledger.add_point(fb_px);
        log::debug!("added point {index} at {fb_px}, total {:.1}px", self.ledger.distance_px());
        CommandOutcome::PointAdded(index)
    }

    fn scroll(&mut self, ticks: f32) -> CommandOutcome {
        let camera = &self.config.camera;
        self.eye_height = (self.eye_height + ticks * camera.scroll_step)
            .clamp(camera.min_eye_height, camera.measuring_height);
        if !self.navigation.is_overview() {
            self.camera.position.y = self.eye_height;
        }
        CommandOutcome::EyeHeightChanged(self.eye_height)
    }

    // ------------------------------------------------------------------------
    // Per-frame update
    // ------------------------------------------------------------------------

    /// Advance motion by `dt` seconds. Overview freezes movement.
    pub fn update(&mut self, dt: f32, keys: MovementKeys) {
        if self.navigation.is_overview() {
            return;
        }

        self.motion.update(
            keys,
            dt,
            &mut self.map,
            self.camera.ground_forward(),
            self.viewport.framebuffer,
        );

        if self.motion.mode() == MotionMode::Avatar {
            self.follow_avatar();
        }
    }

    /// Keep the walking camera trailing the avatar along its look direction.
    fn follow_avatar(&mut self) {
        let limit = (self.config.map.half_extent + self.config.camera.clamp_margin).max(0.0);
        let behind = self.motion.avatar.position - self.camera.ground_forward() * self.config.avatar.follow_distance;
        self.camera.position = Vec3::new(
            behind.x.clamp(-limit, limit),
            self.eye_height,
            behind.z.clamp(-limit, limit),
        );
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // ------------------------------------------------------------------------
    // Read access for renderers
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection.view_projection(&self.camera, self.viewport.aspect())
    }

    pub fn map_view(&self) -> &MapView {
        &self.map
    }

    pub fn mode(&self) -> ViewMode {
        self.navigation.mode()
    }

    pub fn pin_shows_alternate(&self) -> bool {
        self.navigation.pin_shows_alternate
    }

    /// Hotspot for the glyph currently shown. Hit-testing and the HUD share it.
    pub fn hotspot(&self) -> Hotspot {
        Hotspot::from_config(&self.config.hotspot, self.navigation.pin_shows_alternate)
    }

    pub fn is_look_captured(&self) -> bool {
        self.look.is_captured()
    }

    pub fn primary_pressed(&self) -> bool {
        self.primary_pressed
    }

    pub fn eye_height(&self) -> f32 {
        self.eye_height
    }

    pub fn measurements(&self) -> &MeasurementLedger {
        &self.ledger
    }

    /// World positions for 3D measurement pins, in point order.
    pub fn pin_positions(&self) -> Vec<Vec3> {
        let walking_map = self.navigation.saved().map(|s| s.map).unwrap_or(self.map);
        self.ledger
            .points()
            .iter()
            .map(|&px| {
                picking::pin_world_position(
                    px,
                    &self.camera,
                    &self.projection,
                    &self.viewport,
                    &walking_map,
                    self.config.map.plane_size(),
                )
            })
            .collect()
    }

    /// Distance shown on the HUD: measured polyline in overview, walked
    /// distance otherwise.
    pub fn distance_meters(&self) -> f32 {
        let meters_per_pixel = self.config.map.meters_per_pixel;
        match self.navigation.mode() {
            ViewMode::Overview => {
                let scale = self.navigation.walking_scale(&self.map);
                self.ledger.meters(scale, meters_per_pixel)
            }
            ViewMode::Walking => self.motion.walked_meters(meters_per_pixel),
        }
    }

    pub fn distance_label(&self) -> String {
        format_meters(self.distance_meters())
    }

    pub fn motion_mode(&self) -> MotionMode {
        self.motion.mode()
    }

    pub fn facing(&self) -> Facing {
        self.motion.facing
    }

    pub fn animation_frame(&self) -> u8 {
        self.motion.animation.frame
    }

    pub fn avatar_position(&self) -> Vec3 {
        self.motion.avatar.position
    }

    pub fn avatar_size(&self) -> AvatarSize {
        self.avatar_size
    }

    /// Model transform for the avatar given the loader's placement result.
    pub fn avatar_transform(&self, placement: &ModelPlacement) -> Mat4 {
        let lift = self.avatar_size.desired_height(&self.config.avatar) * 0.5;
        avatar_transform(&self.motion.avatar, self.config.avatar.model_yaw_offset, lift, placement)
    }

    /// Load height of a pending model reload, consumed once.
    pub fn take_model_reload(&mut self) -> Option<f32> {
        self.pending_model_reload
            .take()
            .map(|size| size.load_height(&self.config.avatar))
    }
}

/// Whole meters, e.g. "141m".
pub fn format_meters(meters: f32) -> String {
    format!("{}m", meters.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{AvatarConfig, CameraConfig, MapConfig};

    const SIZE: f32 = 800.0;

    fn config(mode: MotionMode) -> ViewerConfig {
        ViewerConfig {
            avatar: AvatarConfig {
                motion_mode: mode,
                ..AvatarConfig::default()
            },
            ..ViewerConfig::default()
        }
    }

    fn state(mode: MotionMode) -> ViewportState {
        ViewportState::new(config(mode), Viewport::uniform(SIZE, SIZE))
    }

    fn click(state: &mut ViewportState, x: f32, y: f32) -> CommandOutcome {
        let outcome = state.apply(InputCommand::PrimaryPress { window_px: Vec2::new(x, y) });
        state.apply(InputCommand::PrimaryRelease);
        outcome
    }

    fn hotspot_center(state: &ViewportState) -> Vec2 {
        let h = state.hotspot();
        (h.min + h.max) * 0.5
    }

    #[test]
    fn key_toggle_round_trip_restores_view() {
        let mut s = state(MotionMode::MapPan);
        s.apply(InputCommand::Scroll { ticks: 2.0 });
        s.update(0.4, MovementKeys { right: true, forward: true, ..MovementKeys::default() });
        let (camera0, map0) = (*s.camera(), *s.map_view());

        assert_eq!(s.apply(InputCommand::ToggleOverview), CommandOutcome::ModeChanged(ViewMode::Overview));
        assert_eq!(*s.map_view(), MapView::FULL);
        assert!(s.pin_shows_alternate());

        assert_eq!(s.apply(InputCommand::ToggleOverview), CommandOutcome::ModeChanged(ViewMode::Walking));
        assert!((s.camera().position - camera0.position).length() < 1e-5);
        assert!((s.camera().front - camera0.front).length() < 1e-5);
        assert_eq!(*s.map_view(), map0);
        assert!(!s.pin_shows_alternate());
    }

    #[test]
    fn hotspot_click_toggles_both_ways() {
        let mut s = state(MotionMode::Avatar);
        let center = hotspot_center(&s);
        assert_eq!(click(&mut s, center.x, center.y), CommandOutcome::ModeChanged(ViewMode::Overview));
        // Overview shows the wider glyph; its hotspot is what gets tested now.
        let center = hotspot_center(&s);
        assert_eq!(click(&mut s, center.x, center.y), CommandOutcome::ModeChanged(ViewMode::Walking));
    }

    #[test]
    fn hotspot_respects_hidpi_scaling() {
        let mut s = ViewportState::new(
            config(MotionMode::Avatar),
            Viewport::new(Vec2::new(400.0, 400.0), Vec2::new(800.0, 800.0)),
        );
        // Window (45, 30) → framebuffer (90, 60): outside the 8..88 hotspot.
        assert_eq!(click(&mut s, 45.0, 30.0), CommandOutcome::Unchanged);
        // Window (40, 30) → framebuffer (80, 60): inside.
        assert_eq!(click(&mut s, 40.0, 30.0), CommandOutcome::ModeChanged(ViewMode::Overview));
    }

    #[test]
    fn walking_clicks_do_not_measure() {
        let mut s = state(MotionMode::Avatar);
        assert_eq!(click(&mut s, 400.0, 400.0), CommandOutcome::Unchanged);
        assert!(s.measurements().is_empty());
    }

    #[test]
    fn overview_clicks_add_and_remove_points() {
        let mut s = state(MotionMode::Avatar);
        s.apply(InputCommand::ToggleOverview);

        assert_eq!(click(&mut s, 400.0, 400.0), CommandOutcome::PointAdded(0));
        assert_eq!(click(&mut s, 500.0, 400.0), CommandOutcome::PointAdded(1));
        assert!((s.measurements().distance_px() - 100.0).abs() < 1e-3);

        // Within the hit radius of the first point.
        assert_eq!(click(&mut s, 405.0, 405.0), CommandOutcome::PointRemoved(0));
        assert_eq!(s.measurements().points(), &[Vec2::new(500.0, 400.0)]);
        assert_eq!(s.measurements().distance_px(), 0.0);
    }

    #[test]
    fn overview_click_off_the_map_is_ignored() {
        let mut s = ViewportState::new(
            ViewerConfig {
                map: MapConfig { half_extent: 2.0, ..MapConfig::default() },
                ..config(MotionMode::Avatar)
            },
            Viewport::uniform(SIZE, SIZE),
        );
        s.apply(InputCommand::ToggleOverview);
        assert_eq!(click(&mut s, 790.0, 400.0), CommandOutcome::ClickIgnored(PickMiss::OutsideMap));
        assert!(s.measurements().is_empty());
    }

    #[test]
    fn measurements_persist_across_overview_sessions() {
        let mut s = state(MotionMode::Avatar);
        s.apply(InputCommand::ToggleOverview);
        click(&mut s, 400.0, 400.0);
        s.apply(InputCommand::ToggleOverview);
        s.apply(InputCommand::ToggleOverview);
        assert_eq!(s.measurements().len(), 1);

        assert_eq!(s.apply(InputCommand::ClearMeasurements), CommandOutcome::MeasurementsCleared);
        assert!(s.measurements().is_empty());
    }

    #[test]
    fn overview_distance_uses_saved_walking_scale() {
        let mut s = state(MotionMode::Avatar);
        s.apply(InputCommand::ToggleOverview);
        click(&mut s, 400.0, 400.0);
        click(&mut s, 430.0, 400.0);
        // 30px / 0.15 saved scale * 0.5 m/px = 100m
        assert!((s.distance_meters() - 100.0).abs() < 1e-2);
        assert_eq!(s.distance_label(), "100m");
    }

    #[test]
    fn walking_distance_reports_motion() {
        let mut s = state(MotionMode::Avatar);
        s.update(0.25, MovementKeys { forward: true, ..MovementKeys::default() });
        // 4 units/s * 0.25s * 400 m/unit
        assert!((s.distance_meters() - 400.0).abs() < 1e-2);
    }

    #[test]
    fn overview_freezes_motion() {
        let mut s = state(MotionMode::MapPan);
        s.apply(InputCommand::ToggleOverview);
        s.update(1.0, MovementKeys { left: true, ..MovementKeys::default() });
        assert_eq!(*s.map_view(), MapView::FULL);
        assert_eq!(s.facing(), Facing::Idle);
    }

    #[test]
    fn mouse_look_only_while_walking_and_captured() {
        let mut s = state(MotionMode::MapPan);
        let yaw0 = s.camera().yaw;
        assert_eq!(s.apply(InputCommand::LookCursor { x: 10.0, y: 0.0 }), CommandOutcome::Unchanged);

        assert_eq!(s.apply(InputCommand::ToggleMouseLook), CommandOutcome::LookCaptured(true));
        s.apply(InputCommand::LookCursor { x: 10.0, y: 0.0 });
        assert_eq!(s.apply(InputCommand::LookCursor { x: 20.0, y: 0.0 }), CommandOutcome::CameraRotated);
        assert!(s.camera().yaw > yaw0);

        s.apply(InputCommand::ToggleOverview);
        assert!(!s.is_look_captured());
        assert_eq!(s.apply(InputCommand::ToggleMouseLook), CommandOutcome::Unchanged);
        let yaw = s.camera().yaw;
        s.apply(InputCommand::LookCursor { x: 500.0, y: 0.0 });
        assert_eq!(s.camera().yaw, yaw);
    }

    #[test]
    fn scroll_clamps_eye_height_and_skips_overview_camera() {
        let mut s = state(MotionMode::MapPan);
        let camera = CameraConfig::default();
        s.apply(InputCommand::Scroll { ticks: -100.0 });
        assert_eq!(s.eye_height(), camera.min_eye_height);
        assert_eq!(s.camera().position.y, camera.min_eye_height);

        s.apply(InputCommand::ToggleOverview);
        let overview_y = s.camera().position.y;
        s.apply(InputCommand::Scroll { ticks: 1000.0 });
        assert_eq!(s.eye_height(), camera.measuring_height);
        assert_eq!(s.camera().position.y, overview_y);
    }

    #[test]
    fn avatar_camera_follows_within_bounds() {
        let mut s = state(MotionMode::Avatar);
        for _ in 0..200 {
            s.update(0.1, MovementKeys { forward: true, ..MovementKeys::default() });
        }
        let limit = s.config().map.half_extent + s.config().camera.clamp_margin;
        assert!(s.camera().position.z >= -limit - 1e-4);
        assert!((s.avatar_position().z + limit).abs() < 1e-3);
        assert_eq!(s.camera().position.y, s.eye_height());
    }

    #[test]
    fn model_reload_is_consumed_once() {
        let mut s = state(MotionMode::Avatar);
        s.apply(InputCommand::SelectAvatarSize(AvatarSize::Mini));
        assert_eq!(s.take_model_reload(), Some(AvatarConfig::default().mini_load_height));
        assert_eq!(s.take_model_reload(), None);
        assert_eq!(s.avatar_size(), AvatarSize::Mini);
    }

    #[test]
    fn pins_land_on_the_plane_in_overview() {
        let mut s = state(MotionMode::Avatar);
        s.apply(InputCommand::ToggleOverview);
        click(&mut s, 400.0, 400.0);
        let pins = s.pin_positions();
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].y, 0.0);
        assert!(pins[0].x.abs() <= s.config().map.half_extent);
    }

    #[test]
    fn minimized_window_ignores_clicks() {
        let mut s = state(MotionMode::Avatar);
        s.set_viewport(Viewport::uniform(0.0, 0.0));
        assert_eq!(click(&mut s, 20.0, 20.0), CommandOutcome::ClickIgnored(PickMiss::EmptyViewport));
    }

    #[test]
    fn meters_are_rounded() {
        assert_eq!(format_meters(141.42), "141m");
        assert_eq!(format_meters(0.5), "1m");
        assert_eq!(format_meters(0.0), "0m");
    }
}
