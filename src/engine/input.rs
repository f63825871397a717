// Input state tracking for keyboard and mouse
// Abstracts winit events into held-key state plus discrete commands for the core

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::motion::{AvatarSize, MovementKeys};

/// Discrete actions the core applies through `ViewportState::apply`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputCommand {
    /// Overview toggle from the keyboard.
    ToggleOverview,
    /// Capture/release the cursor for look-around.
    ToggleMouseLook,
    /// Left button down at a window-space position.
    PrimaryPress { window_px: Vec2 },
    PrimaryRelease,
    /// Virtual cursor position for look-around (accumulated raw motion).
    LookCursor { x: f32, y: f32 },
    /// Vertical scroll in ticks; positive = away from the user.
    Scroll { ticks: f32 },
    SelectAvatarSize(AvatarSize),
    /// Drop every measurement point.
    ClearMeasurements,
    /// F3 stats panel. Consumed by the shell, not the core.
    ToggleStats,
    Exit,
}

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,

    // Mouse, in logical window coordinates
    pub mouse_position: (f32, f32),
    look_cursor: (f32, f32),

    pub scale_factor: f64,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            mouse_position: (0.0, 0.0),
            look_cursor: (0.0, 0.0),
            scale_factor: 1.0,
        }
    }

    /// Feed a winit WindowEvent. Returns a command when the event maps to one.
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<InputCommand> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return None;
                };
                match event.state {
                    ElementState::Pressed => {
                        self.keys_held.insert(key);
                        if event.repeat {
                            return None;
                        }
                        key_command(key)
                    }
                    ElementState::Released => {
                        self.keys_held.remove(&key);
                        None
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match (button, state) {
                (MouseButton::Left, ElementState::Pressed) => Some(InputCommand::PrimaryPress {
                    window_px: Vec2::new(self.mouse_position.0, self.mouse_position.1),
                }),
                (MouseButton::Left, ElementState::Released) => Some(InputCommand::PrimaryRelease),
                (MouseButton::Right, ElementState::Pressed) => Some(InputCommand::ToggleMouseLook),
                _ => None,
            },
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(self.scale_factor);
                self.mouse_position = (logical.x, logical.y);
                None
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let ticks = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                (ticks != 0.0).then_some(InputCommand::Scroll { ticks })
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
                None
            }
            WindowEvent::Focused(false) => {
                // Key releases are lost while unfocused.
                self.keys_held.clear();
                None
            }
            _ => None,
        }
    }

    /// Raw mouse motion keeps flowing while the cursor is grabbed, unlike
    /// CursorMoved. It is accumulated into a virtual cursor position.
    pub fn process_device_event(&mut self, event: &DeviceEvent) -> Option<InputCommand> {
        match event {
            DeviceEvent::MouseMotion { delta } => {
                self.look_cursor.0 += delta.0 as f32;
                self.look_cursor.1 += delta.1 as f32;
                Some(InputCommand::LookCursor {
                    x: self.look_cursor.0,
                    y: self.look_cursor.1,
                })
            }
            _ => None,
        }
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// WASD and arrow keys.
    pub fn movement_keys(&self) -> MovementKeys {
        let held = |a: KeyCode, b: KeyCode| self.is_key_held(a) || self.is_key_held(b);
        MovementKeys {
            forward: held(KeyCode::KeyW, KeyCode::ArrowUp),
            back: held(KeyCode::KeyS, KeyCode::ArrowDown),
            left: held(KeyCode::KeyA, KeyCode::ArrowLeft),
            right: held(KeyCode::KeyD, KeyCode::ArrowRight),
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Key-press bindings.
pub fn key_command(key: KeyCode) -> Option<InputCommand> {
    match key {
        KeyCode::Escape => Some(InputCommand::Exit),
        KeyCode::KeyR => Some(InputCommand::ToggleOverview),
        KeyCode::KeyC => Some(InputCommand::ToggleMouseLook),
        KeyCode::KeyM => Some(InputCommand::SelectAvatarSize(AvatarSize::Mini)),
        KeyCode::KeyB => Some(InputCommand::SelectAvatarSize(AvatarSize::Big)),
        KeyCode::Delete | KeyCode::Backspace => Some(InputCommand::ClearMeasurements),
        KeyCode::F3 => Some(InputCommand::ToggleStats),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings() {
        assert_eq!(key_command(KeyCode::KeyR), Some(InputCommand::ToggleOverview));
        assert_eq!(key_command(KeyCode::KeyC), Some(InputCommand::ToggleMouseLook));
        assert_eq!(
            key_command(KeyCode::KeyM),
            Some(InputCommand::SelectAvatarSize(AvatarSize::Mini))
        );
        assert_eq!(key_command(KeyCode::KeyW), None);
    }

    #[test]
    fn mouse_motion_accumulates_into_virtual_cursor() {
        let mut input = InputState::new();
        input.process_device_event(&DeviceEvent::MouseMotion { delta: (3.0, -2.0) });
        let cmd = input.process_device_event(&DeviceEvent::MouseMotion { delta: (1.0, 1.0) });
        assert_eq!(cmd, Some(InputCommand::LookCursor { x: 4.0, y: -1.0 }));
    }

    #[test]
    fn no_keys_means_no_movement() {
        let input = InputState::new();
        assert_eq!(input.movement_keys(), MovementKeys::default());
    }
}
