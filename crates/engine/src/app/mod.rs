mod input;
mod loop_runner;
mod metrics;
mod overlay;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopStats;
pub use rendering::{
    text_width_px, world_to_screen_px, wrap_text, Canvas, Renderer, Viewport, GLYPH_ADVANCE,
    LINE_ADVANCE, TEXT_SCALE,
};
pub use scene::{InputSnapshot, Scene, SceneCommand, Vec2};
