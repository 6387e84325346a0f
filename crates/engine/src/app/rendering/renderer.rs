use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture, TextureError};
use winit::window::Window;

use crate::app::overlay::{draw_overlay, OverlayData};
use crate::app::Scene;
use crate::assets::SpriteAtlas;

use super::{Canvas, Viewport};

const CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Presents scenes through a fixed logical frame that pixels scales to the window.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    logical: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>, logical: Viewport) -> Result<Self, Error> {
        let size = window.inner_size();
        let surface = SurfaceTexture::new(size.width.max(1), size.height.max(1), Arc::clone(&window));
        let pixels = Pixels::new(logical.width, logical.height, surface)?;
        Ok(Self {
            window,
            pixels,
            logical,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), TextureError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels.resize_surface(width, height)
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub(crate) fn render_scene(
        &mut self,
        scene: &dyn Scene,
        sprites: &SpriteAtlas,
        overlay: Option<&OverlayData>,
    ) -> Result<(), Error> {
        let Viewport { width, height } = self.logical;
        {
            let mut canvas = Canvas::new(self.pixels.frame_mut(), width, height);
            canvas.clear(CLEAR_COLOR);
            scene.render(&mut canvas, sprites);
            if let Some(overlay) = overlay {
                draw_overlay(&mut canvas, overlay);
            }
        }
        self.pixels.render()
    }
}
