use engine::Vec2;

use super::geometry::{Side, TILE_SIZE_F32};

/// How far the player may stray from the center, as a fraction of the view.
const SLACK_COEF: f32 = 0.25;
/// Share of the view that must stay over the map near its borders.
const INDOOR_BORDER_COEF: f32 = 0.7;
const OUTDOOR_BORDER_COEF: f32 = 1.0;
/// Maps narrower than this share of the view are simply centered.
const SMALL_MAP_COEF: f32 = 0.9;
const MANUAL_STEP_PX: f32 = 4.0;

pub const VIEW_TILES_X: f32 = 30.0;
pub const VIEW_TILES_Y: f32 = 16.875;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    center: Vec2,
    size: Vec2,
    locked: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec2::new(
            VIEW_TILES_X * TILE_SIZE_F32,
            VIEW_TILES_Y * TILE_SIZE_F32,
        ))
    }
}

impl Camera {
    pub fn new(size: Vec2) -> Self {
        Self {
            center: Vec2::ZERO,
            size,
            locked: false,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Snaps straight onto the player.
    pub fn reset(&mut self, player_center: Vec2) {
        self.center = player_center;
    }

    pub fn move_by(&mut self, side: Side) {
        let (dx, dy) = side.delta();
        self.center.x += dx as f32 * MANUAL_STEP_PX;
        self.center.y += dy as f32 * MANUAL_STEP_PX;
    }

    /// Follows the player with slack, then keeps the view over the map. No-op while locked.
    pub fn update(&mut self, player_center: Vec2, map_px: Vec2, indoor: bool) {
        if self.locked {
            return;
        }
        let border = if indoor {
            INDOOR_BORDER_COEF
        } else {
            OUTDOOR_BORDER_COEF
        };
        self.center.x = follow_axis(self.center.x, player_center.x, self.size.x, map_px.x, border);
        self.center.y = follow_axis(self.center.y, player_center.y, self.size.y, map_px.y, border);
    }
}

fn follow_axis(center: f32, player: f32, view: f32, map: f32, border: f32) -> f32 {
    if view * SMALL_MAP_COEF > map {
        return map / 2.0;
    }
    let slack = view * SLACK_COEF / 2.0;
    let edge = view * border / 2.0;
    center
        .max(player - slack)
        .min(player + slack)
        .max(edge)
        .min(map - edge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::default()
    }

    #[test]
    fn default_view_is_30_by_16_875_tiles() {
        assert_eq!(camera().size(), Vec2::new(960.0, 540.0));
    }

    #[test]
    fn small_maps_are_centered() {
        let mut cam = camera();
        cam.update(Vec2::new(10.0, 10.0), Vec2::new(320.0, 320.0), false);
        assert_eq!(cam.center(), Vec2::new(160.0, 160.0));
    }

    #[test]
    fn center_stays_in_the_clamp_range_on_large_maps() {
        let map = Vec2::new(3200.0, 3200.0);
        for indoor in [false, true] {
            let border = if indoor { 0.7 } else { 1.0 };
            let mut cam = camera();
            let min_x = 960.0 * border / 2.0;
            let max_x = 3200.0 - min_x;
            let min_y = 540.0 * border / 2.0;
            let max_y = 3200.0 - min_y;
            for step in 0..200 {
                let player = Vec2::new(step as f32 * 16.0, 3200.0 - step as f32 * 16.0);
                cam.update(player, map, indoor);
                let center = cam.center();
                assert!(center.x >= min_x && center.x <= max_x, "x={} indoor={indoor}", center.x);
                assert!(center.y >= min_y && center.y <= max_y, "y={} indoor={indoor}", center.y);
            }
        }
    }

    #[test]
    fn slack_lets_the_player_move_before_recentering() {
        let mut cam = camera();
        let map = Vec2::new(3200.0, 3200.0);
        cam.reset(Vec2::new(1600.0, 1600.0));
        cam.update(Vec2::new(1700.0, 1600.0), map, false);
        assert_eq!(cam.center().x, 1600.0);
        cam.update(Vec2::new(1800.0, 1600.0), map, false);
        assert_eq!(cam.center().x, 1800.0 - 120.0);
    }

    #[test]
    fn locked_camera_ignores_the_player() {
        let mut cam = camera();
        cam.reset(Vec2::new(500.0, 500.0));
        cam.lock();
        cam.update(Vec2::new(2000.0, 2000.0), Vec2::new(3200.0, 3200.0), false);
        assert_eq!(cam.center(), Vec2::new(500.0, 500.0));
        cam.move_by(Side::Left);
        cam.move_by(Side::Down);
        assert_eq!(cam.center(), Vec2::new(496.0, 504.0));
        cam.unlock();
        assert!(!cam.is_locked());
    }
}
