#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Interact,
    Pause,
    Quit,
    ToggleDebug,
    ToggleCollisions,
    ToggleCameraLock,
    ToggleLayerBottom,
    ToggleLayerMid,
    ToggleLayerTop,
}

const ACTION_COUNT: usize = 13;

/// Held state plus the press edge seen since the last tick snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
    pressed: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        let index = action.index();
        if is_down && !self.down[index] {
            self.pressed[index] = true;
        }
        self.down[index] = is_down;
    }

    pub(crate) fn set_pressed(&mut self, action: InputAction, pressed: bool) {
        self.pressed[action.index()] = pressed;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed[action.index()]
    }

    pub(crate) fn clear_pressed(&mut self) {
        self.pressed = [false; ACTION_COUNT];
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Interact => 4,
            InputAction::Pause => 5,
            InputAction::Quit => 6,
            InputAction::ToggleDebug => 7,
            InputAction::ToggleCollisions => 8,
            InputAction::ToggleCameraLock => 9,
            InputAction::ToggleLayerBottom => 10,
            InputAction::ToggleLayerMid => 11,
            InputAction::ToggleLayerTop => 12,
        }
    }
}
