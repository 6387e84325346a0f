use crate::assets::SpriteAtlas;

use super::input::ActionStates;
use super::rendering::Canvas;
use super::InputAction;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Input state frozen for one simulation tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// True only on the first tick after the key went down.
    pub fn pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self.actions.set_pressed(action, false);
        self
    }

    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set(action, true);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
    /// Unrecoverable scene failure; the loop logs the reason and exits non-zero.
    Abort(String),
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render(&self, canvas: &mut Canvas<'_>, sprites: &SpriteAtlas);
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_action_down_does_not_fake_a_press_edge() {
        let snapshot = InputSnapshot::empty().with_action_down(InputAction::MoveUp, true);
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(!snapshot.pressed(InputAction::MoveUp));
    }

    #[test]
    fn with_action_pressed_sets_edge_and_down() {
        let snapshot = InputSnapshot::empty().with_action_pressed(InputAction::Interact);
        assert!(snapshot.pressed(InputAction::Interact));
        assert!(snapshot.is_down(InputAction::Interact));
        assert!(!snapshot.pressed(InputAction::Pause));
    }

    #[test]
    fn vec2_arithmetic() {
        let sum = Vec2::new(1.0, 2.0) + Vec2::new(3.0, -1.0);
        assert_eq!(sum, Vec2::new(4.0, 1.0));
        assert_eq!(sum - Vec2::new(4.0, 1.0), Vec2::ZERO);
    }
}
