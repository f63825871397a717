// On-screen HUD drawn with egui over the 3D scene
// Mode-toggle glyph, measurement polyline, distance label and the F3 stats panel

use egui::epaint::Shadow;
use glam::Vec2;

use super::navigation::Hotspot;

/// Gap between the distance label and the window's top-right corner, in
/// framebuffer pixels.
pub const DISTANCE_MARGIN_PX: f32 = 8.0;

pub struct HudStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub resolution: (u32, u32),
    pub mode: &'static str,
    pub camera_position: (f32, f32, f32),
    pub camera_yaw: f32,
    pub camera_pitch: f32,
    pub eye_height: f32,
    pub measurement_points: usize,
    pub avatar_facing: String,
    pub avatar_position: (f32, f32, f32),
    pub avatar_size: String,
}

/// Everything the HUD draws this frame, in framebuffer pixels.
pub struct HudFrame<'a> {
    /// Rectangle of the mode-toggle glyph; identical to the click target.
    pub hotspot: Hotspot,
    /// Overview shows the standing-figure glyph instead of the pin.
    pub alternate_glyph: bool,
    pub pressed: bool,
    /// Measurement points in click order. Empty while walking.
    pub points: &'a [Vec2],
    pub highlight: Option<usize>,
    pub distance_label: &'a str,
    pub stats: Option<&'a HudStats>,
}

/// Framebuffer pixel → egui point.
pub fn to_screen(px: Vec2, pixels_per_point: f32) -> egui::Pos2 {
    let ppp = if pixels_per_point > 0.0 { pixels_per_point } else { 1.0 };
    egui::pos2(px.x / ppp, px.y / ppp)
}

fn to_rect(hotspot: &Hotspot, pixels_per_point: f32) -> egui::Rect {
    egui::Rect::from_min_max(
        to_screen(hotspot.min, pixels_per_point),
        to_screen(hotspot.max, pixels_per_point),
    )
}

/// Right-top anchor of the distance label for a framebuffer of `size` pixels.
pub fn distance_anchor(size: Vec2, pixels_per_point: f32) -> egui::Pos2 {
    to_screen(
        Vec2::new(size.x - DISTANCE_MARGIN_PX, DISTANCE_MARGIN_PX),
        pixels_per_point,
    )
}

pub struct Hud {
    pub stats_visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Hud {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            device,
            surface_format,
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            stats_visible: false,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.stats_visible = !self.stats_visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// Render one egui frame on top of the scene:
    ///
    /// - measurement polyline and markers (overview only)
    /// - mode-toggle glyph in the top-left corner
    /// - distance label in the top-right corner
    /// - F3 stats panel when `frame.stats` is set
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        frame: &HudFrame<'_>,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);
        let ppp = screen_descriptor.pixels_per_point;
        let size = Vec2::new(
            screen_descriptor.size_in_pixels[0] as f32,
            screen_descriptor.size_in_pixels[1] as f32,
        );

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("hud"),
            ));

            // ── measurement polyline ─────────────────────────────────────────
            if !frame.points.is_empty() {
                let line_stroke = egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 200, 0));
                let screen: Vec<egui::Pos2> = frame.points.iter().map(|&p| to_screen(p, ppp)).collect();
                for pair in screen.windows(2) {
                    painter.line_segment([pair[0], pair[1]], line_stroke);
                }
                for (i, &pos) in screen.iter().enumerate() {
                    if Some(i) == frame.highlight {
                        painter.circle_filled(pos, 6.0, egui::Color32::from_rgb(255, 60, 60));
                        painter.circle_stroke(pos, 8.0, egui::Stroke::new(1.5, egui::Color32::WHITE));
                    } else {
                        painter.circle_filled(pos, 4.0, egui::Color32::from_rgb(255, 200, 0));
                    }
                }
            }

            // ── mode-toggle glyph ────────────────────────────────────────────
            let rect = to_rect(&frame.hotspot, ppp);
            let fill = if frame.pressed {
                egui::Color32::from_rgba_unmultiplied(60, 60, 60, 200)
            } else {
                egui::Color32::from_rgba_unmultiplied(0, 0, 0, 150)
            };
            painter.rect_filled(rect, 6.0, fill);
            if frame.alternate_glyph {
                draw_figure(&painter, rect);
            } else {
                draw_pin(&painter, rect);
            }

            // ── distance label ───────────────────────────────────────────────
            painter.text(
                distance_anchor(size, ppp),
                egui::Align2::RIGHT_TOP,
                frame.distance_label,
                egui::FontId::monospace(20.0),
                egui::Color32::WHITE,
            );

            // ── F3: stats panel ──────────────────────────────────────────────
            if let Some(stats) = frame.stats {
                let below_glyph = rect.max.y + 10.0;
                egui::Area::new(egui::Id::new("hud_stats"))
                    .fixed_pos(egui::pos2(10.0, below_glyph))
                    .show(ctx, |ui| {
                        egui::Frame::none()
                            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
                            .inner_margin(egui::Margin::same(8.0))
                            .rounding(4.0)
                            .show(ui, |ui: &mut egui::Ui| {
                                ui.label(format!("FPS: {}", stats.fps));
                                ui.label(format!("Frame: {:.2} ms", stats.frame_time_avg_ms));
                                ui.label(format!(
                                    "Resolution: {} x {}",
                                    stats.resolution.0, stats.resolution.1
                                ));
                                ui.label(format!("Mode: {}", stats.mode));
                                ui.label(format!(
                                    "Camera: ({:.2}, {:.2}, {:.2})  yaw {:.1}  pitch {:.1}",
                                    stats.camera_position.0,
                                    stats.camera_position.1,
                                    stats.camera_position.2,
                                    stats.camera_yaw,
                                    stats.camera_pitch,
                                ));
                                ui.label(format!("Eye height: {:.2}", stats.eye_height));
                                ui.label(format!("Points: {}", stats.measurement_points));
                                ui.label(format!("Facing: {}", stats.avatar_facing));
                                ui.label(format!(
                                    "Avatar: ({:.2}, {:.2}, {:.2})  {}",
                                    stats.avatar_position.0,
                                    stats.avatar_position.1,
                                    stats.avatar_position.2,
                                    stats.avatar_size,
                                ));
                            });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("HUD Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

/// Map pin: round head over a pointed tip.
fn draw_pin(painter: &egui::Painter, rect: egui::Rect) {
    let color = egui::Color32::from_rgb(230, 70, 60);
    let head = egui::pos2(rect.center().x, rect.top() + rect.height() * 0.38);
    let radius = rect.width().min(rect.height()) * 0.25;
    let tip = egui::pos2(rect.center().x, rect.bottom() - rect.height() * 0.12);
    painter.add(egui::Shape::convex_polygon(
        vec![
            egui::pos2(head.x - radius * 0.8, head.y + radius * 0.5),
            tip,
            egui::pos2(head.x + radius * 0.8, head.y + radius * 0.5),
        ],
        color,
        egui::Stroke::NONE,
    ));
    painter.circle_filled(head, radius, color);
    painter.circle_filled(head, radius * 0.4, egui::Color32::WHITE);
}

/// Standing figure: head, body, legs.
fn draw_figure(painter: &egui::Painter, rect: egui::Rect) {
    let stroke = egui::Stroke::new(4.0, egui::Color32::from_rgb(90, 200, 255));
    let x = rect.center().x;
    let unit = rect.height() / 10.0;
    let top = rect.top() + unit;
    let head = egui::pos2(x, top + unit);
    let neck = egui::pos2(x, top + unit * 2.2);
    let hip = egui::pos2(x, top + unit * 5.5);
    painter.circle_filled(head, unit, stroke.color);
    painter.line_segment([neck, hip], stroke);
    painter.line_segment(
        [egui::pos2(x - unit * 2.0, top + unit * 3.5), egui::pos2(x + unit * 2.0, top + unit * 3.5)],
        stroke,
    );
    painter.line_segment([hip, egui::pos2(x - unit * 1.5, top + unit * 8.0)], stroke);
    painter.line_segment([hip, egui::pos2(x + unit * 1.5, top + unit * 8.0)], stroke);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::HotspotConfig;

    #[test]
    fn framebuffer_pixels_become_points() {
        assert_eq!(to_screen(Vec2::new(200.0, 100.0), 2.0), egui::pos2(100.0, 50.0));
        assert_eq!(to_screen(Vec2::new(200.0, 100.0), 0.0), egui::pos2(200.0, 100.0));
    }

    #[test]
    fn glyph_rect_matches_click_target() {
        let hotspot = Hotspot::from_config(&HotspotConfig::default(), false);
        let rect = to_rect(&hotspot, 2.0);
        assert_eq!(rect.min, egui::pos2(4.0, 4.0));
        assert_eq!(rect.max, egui::pos2(44.0, 58.5));
    }

    #[test]
    fn distance_sits_in_top_right_corner() {
        let anchor = distance_anchor(Vec2::new(1600.0, 1000.0), 2.0);
        assert_eq!(anchor, egui::pos2(796.0, 4.0));
    }
}
