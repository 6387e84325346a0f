mod canvas;
mod renderer;
mod text;
mod transform;

pub use canvas::Canvas;
pub use renderer::Renderer;
pub use text::{text_width_px, wrap_text, GLYPH_ADVANCE, LINE_ADVANCE, TEXT_SCALE};
pub use transform::{world_to_screen_px, Viewport};
