use engine::Vec2;

use super::map::{LayerSlot, MapGrid};

/// One drawing instruction. World-space items are offset by the camera; the rest are screen-space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem<'a> {
    Clear,
    Layer {
        slot: LayerSlot,
        grid: &'a MapGrid,
        tileset: &'a str,
    },
    Sprite {
        sheet: &'a str,
        frame: u32,
        position: Vec2,
    },
    CollisionOverlay {
        grid: &'a MapGrid,
    },
    DialogBox {
        text: &'a str,
        awaiting_input: bool,
    },
    FadeOverlay {
        alpha: u8,
    },
    DebugText {
        lines: Vec<String>,
    },
}

/// Ordered output of a read-only draw pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawList<'a> {
    pub camera_center: Vec2,
    pub view_size: Vec2,
    pub items: Vec<DrawItem<'a>>,
}

impl<'a> DrawList<'a> {
    pub fn new(camera_center: Vec2, view_size: Vec2) -> Self {
        Self {
            camera_center,
            view_size,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: DrawItem<'a>) {
        self.items.push(item);
    }
}
