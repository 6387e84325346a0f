use crate::app::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Maps a y-down world pixel position to the frame, with `camera_center` at the frame center.
pub fn world_to_screen_px(world: Vec2, camera_center: Vec2, viewport: Viewport) -> (i32, i32) {
    let x = world.x - camera_center.x + viewport.width as f32 * 0.5;
    let y = world.y - camera_center.y + viewport.height as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}
