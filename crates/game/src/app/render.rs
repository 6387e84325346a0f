use engine::{
    text_width_px, world_to_screen_px, wrap_text, Canvas, SpriteAtlas, Vec2, Viewport,
    LINE_ADVANCE,
};

use super::overworld::{
    CollisionCategory, DrawItem, DrawList, LayerSlot, MapGrid, TilePos, TILE_SIZE,
};

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];
const DIALOG_FILL: [u8; 4] = [248, 248, 248, 255];
const DIALOG_BORDER: [u8; 4] = [40, 48, 72, 255];
const DIALOG_TEXT: [u8; 4] = [24, 24, 32, 255];
const DEBUG_PANEL: [u8; 4] = [0, 0, 0, 150];
const DEBUG_TEXT: [u8; 4] = [120, 255, 120, 255];
const BANNER_TEXT: [u8; 4] = [255, 255, 255, 255];

const DIALOG_MARGIN: i32 = 16;
const DIALOG_PADDING: i32 = 14;
const DIALOG_HEIGHT: i32 = 120;
const DEBUG_MARGIN: i32 = 8;

/// Rasterizes one overworld draw list, front to back in list order.
pub(crate) fn draw_overworld(canvas: &mut Canvas<'_>, sprites: &SpriteAtlas, list: &DrawList<'_>) {
    let viewport = Viewport {
        width: list.view_size.x as u32,
        height: list.view_size.y as u32,
    };
    let projector = Projector {
        camera_center: list.camera_center,
        viewport,
    };

    for item in &list.items {
        match item {
            DrawItem::Clear => canvas.clear(BACKGROUND),
            DrawItem::Layer {
                slot,
                grid,
                tileset,
            } => draw_layer(canvas, sprites, &projector, *slot, grid, tileset),
            DrawItem::Sprite {
                sheet,
                frame,
                position,
            } => {
                if let Some(sheet) = sprites.get(sheet) {
                    let (x, y) = projector.to_screen(*position);
                    canvas.blit_frame(sheet, *frame, x, y);
                }
            }
            DrawItem::CollisionOverlay { grid } => draw_collisions(canvas, &projector, grid),
            DrawItem::DialogBox {
                text,
                awaiting_input,
            } => draw_dialog_box(canvas, text, *awaiting_input),
            DrawItem::FadeOverlay { alpha } => {
                canvas.fill_rect(
                    0,
                    0,
                    canvas.width() as i32,
                    canvas.height() as i32,
                    [0, 0, 0, *alpha],
                );
            }
            DrawItem::DebugText { lines } => draw_debug_text(canvas, lines),
        }
    }
}

/// Centered one-line banner over a dimmed frame, used by the pause and battle screens.
pub(crate) fn draw_banner(canvas: &mut Canvas<'_>, title: &str, subtitle: &str) {
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    canvas.fill_rect(0, 0, width, height, [0, 0, 0, 160]);
    let title_y = height / 2 - LINE_ADVANCE;
    canvas.draw_text((width - text_width_px(title)) / 2, title_y, title, BANNER_TEXT);
    if !subtitle.is_empty() {
        canvas.draw_text(
            (width - text_width_px(subtitle)) / 2,
            title_y + LINE_ADVANCE * 2,
            subtitle,
            BANNER_TEXT,
        );
    }
}

struct Projector {
    camera_center: Vec2,
    viewport: Viewport,
}

impl Projector {
    fn to_screen(&self, world: Vec2) -> (i32, i32) {
        world_to_screen_px(world, self.camera_center, self.viewport)
    }

    /// Inclusive-exclusive tile ranges that intersect the view, clamped to the grid.
    fn visible_tiles(&self, grid: &MapGrid) -> (std::ops::Range<i32>, std::ops::Range<i32>) {
        let half_w = self.viewport.width as f32 / 2.0;
        let half_h = self.viewport.height as f32 / 2.0;
        let tile = TILE_SIZE as f32;
        let first_x = ((self.camera_center.x - half_w) / tile).floor() as i32;
        let first_y = ((self.camera_center.y - half_h) / tile).floor() as i32;
        let last_x = ((self.camera_center.x + half_w) / tile).ceil() as i32;
        let last_y = ((self.camera_center.y + half_h) / tile).ceil() as i32;
        (
            first_x.max(0)..last_x.min(grid.width() as i32),
            first_y.max(0)..last_y.min(grid.height() as i32),
        )
    }
}

fn draw_layer(
    canvas: &mut Canvas<'_>,
    sprites: &SpriteAtlas,
    projector: &Projector,
    slot: LayerSlot,
    grid: &MapGrid,
    tileset: &str,
) {
    let Some(sheet) = sprites.get(tileset) else {
        return;
    };
    let (columns, rows) = projector.visible_tiles(grid);
    for y in rows {
        for x in columns.clone() {
            let tile = TilePos::new(x, y);
            let cell = grid.tile(slot, tile);
            if cell == 0 {
                continue;
            }
            let (sx, sy) = projector.to_screen(tile.to_pixel());
            canvas.blit_frame(sheet, u32::from(cell) - 1, sx, sy);
        }
    }
}

fn draw_collisions(canvas: &mut Canvas<'_>, projector: &Projector, grid: &MapGrid) {
    let (columns, rows) = projector.visible_tiles(grid);
    for y in rows {
        for x in columns.clone() {
            let tile = TilePos::new(x, y);
            let Some(color) = CollisionCategory::debug_color(grid.collision_raw(tile)) else {
                continue;
            };
            let (sx, sy) = projector.to_screen(tile.to_pixel());
            canvas.fill_rect(sx, sy, TILE_SIZE, TILE_SIZE, color);
        }
    }
}

fn draw_dialog_box(canvas: &mut Canvas<'_>, text: &str, awaiting_input: bool) {
    let width = canvas.width() as i32 - DIALOG_MARGIN * 2;
    let x = DIALOG_MARGIN;
    let y = canvas.height() as i32 - DIALOG_MARGIN - DIALOG_HEIGHT;
    canvas.fill_rect(x, y, width, DIALOG_HEIGHT, DIALOG_FILL);
    canvas.rect_outline(x, y, width, DIALOG_HEIGHT, DIALOG_BORDER);
    canvas.rect_outline(x + 2, y + 2, width - 4, DIALOG_HEIGHT - 4, DIALOG_BORDER);

    let text_width = width - DIALOG_PADDING * 2;
    let max_lines = ((DIALOG_HEIGHT - DIALOG_PADDING * 2) / LINE_ADVANCE).max(1) as usize;
    for (row, line) in wrap_text(text, text_width)
        .iter()
        .take(max_lines)
        .enumerate()
    {
        canvas.draw_text(
            x + DIALOG_PADDING,
            y + DIALOG_PADDING + row as i32 * LINE_ADVANCE,
            line,
            DIALOG_TEXT,
        );
    }

    if awaiting_input {
        let marker_x = x + width - DIALOG_PADDING - 12;
        let marker_y = y + DIALOG_HEIGHT - DIALOG_PADDING - 8;
        canvas.fill_rect(marker_x, marker_y, 12, 6, DIALOG_BORDER);
        canvas.fill_rect(marker_x + 3, marker_y + 6, 6, 3, DIALOG_BORDER);
    }
}

fn draw_debug_text(canvas: &mut Canvas<'_>, lines: &[String]) {
    let widest = lines
        .iter()
        .map(|line| text_width_px(line))
        .max()
        .unwrap_or(0);
    canvas.fill_rect(
        DEBUG_MARGIN - 4,
        DEBUG_MARGIN - 4,
        widest + 8,
        lines.len() as i32 * LINE_ADVANCE + 4,
        DEBUG_PANEL,
    );
    for (row, line) in lines.iter().enumerate() {
        canvas.draw_text(
            DEBUG_MARGIN,
            DEBUG_MARGIN + row as i32 * LINE_ADVANCE,
            line,
            DEBUG_TEXT,
        );
    }
}

#[cfg(test)]
mod tests {
    use engine::SpriteSheet;

    use super::*;

    const WIDTH: u32 = 128;
    const HEIGHT: u32 = 96;

    fn solid_sheet(frames: &[[u8; 4]]) -> SpriteSheet {
        let size = TILE_SIZE as u32;
        let mut rgba = Vec::new();
        for _ in 0..size {
            for color in frames {
                for _ in 0..size {
                    rgba.extend_from_slice(color);
                }
            }
        }
        SpriteSheet::from_rgba(size * frames.len() as u32, size, size, size, rgba).expect("sheet")
    }

    fn grid(bottom: Vec<u16>, collision: Vec<u8>) -> MapGrid {
        MapGrid::new(2, 2, [bottom, vec![0; 4], vec![0; 4]], collision).expect("grid")
    }

    /// Camera centered so that world (0, 0) lands on the canvas origin.
    fn list<'a>(items: Vec<DrawItem<'a>>) -> DrawList<'a> {
        let mut list = DrawList::new(
            Vec2::new(WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0),
            Vec2::new(WIDTH as f32, HEIGHT as f32),
        );
        for item in items {
            list.push(item);
        }
        list
    }

    fn render(atlas: &SpriteAtlas, list: &DrawList<'_>) -> Vec<u8> {
        let mut frame = vec![0u8; (WIDTH * HEIGHT * 4) as usize];
        let mut canvas = Canvas::new(&mut frame, WIDTH, HEIGHT);
        draw_overworld(&mut canvas, atlas, list);
        frame
    }

    fn pixel(frame: &[u8], x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * WIDTH + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn layer_cells_use_the_previous_tileset_frame_and_skip_zero() {
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];
        let mut atlas = SpriteAtlas::new("unused");
        atlas.insert("tiles", solid_sheet(&[red, blue]));
        let grid = grid(vec![1, 2, 0, 1], vec![0; 4]);

        let frame = render(
            &atlas,
            &list(vec![
                DrawItem::Clear,
                DrawItem::Layer {
                    slot: LayerSlot::Bottom,
                    grid: &grid,
                    tileset: "tiles",
                },
            ]),
        );
        assert_eq!(pixel(&frame, 5, 5), red);
        assert_eq!(pixel(&frame, 40, 5), blue);
        assert_eq!(pixel(&frame, 5, 40), BACKGROUND);
        assert_eq!(pixel(&frame, 40, 40), red);
        assert_eq!(pixel(&frame, 100, 5), BACKGROUND);
    }

    #[test]
    fn later_items_paint_over_earlier_ones() {
        let green = [0, 255, 0, 255];
        let mut atlas = SpriteAtlas::new("unused");
        atlas.insert("tiles", solid_sheet(&[[255, 0, 0, 255]]));
        atlas.insert("hero", solid_sheet(&[green]));
        let grid = grid(vec![1; 4], vec![0; 4]);

        let frame = render(
            &atlas,
            &list(vec![
                DrawItem::Clear,
                DrawItem::Layer {
                    slot: LayerSlot::Bottom,
                    grid: &grid,
                    tileset: "tiles",
                },
                DrawItem::Sprite {
                    sheet: "hero",
                    frame: 0,
                    position: Vec2::new(32.0, 32.0),
                },
                DrawItem::FadeOverlay { alpha: 255 },
            ]),
        );
        assert_eq!(pixel(&frame, 40, 40), [0, 0, 0, 255]);

        let frame = render(
            &atlas,
            &list(vec![
                DrawItem::Clear,
                DrawItem::Layer {
                    slot: LayerSlot::Bottom,
                    grid: &grid,
                    tileset: "tiles",
                },
                DrawItem::Sprite {
                    sheet: "hero",
                    frame: 0,
                    position: Vec2::new(32.0, 32.0),
                },
                DrawItem::FadeOverlay { alpha: 0 },
            ]),
        );
        assert_eq!(pixel(&frame, 40, 40), green);
        assert_eq!(pixel(&frame, 5, 5), [255, 0, 0, 255]);
    }

    #[test]
    fn collision_overlay_tints_only_colored_categories() {
        let atlas = SpriteAtlas::new("unused");
        let grid = grid(vec![0; 4], vec![0, 1, 0, 0]);
        let frame = render(
            &atlas,
            &list(vec![DrawItem::Clear, DrawItem::CollisionOverlay { grid: &grid }]),
        );
        assert_eq!(pixel(&frame, 5, 5), BACKGROUND);
        assert_ne!(pixel(&frame, 40, 5), BACKGROUND);
    }

    #[test]
    fn dialog_box_is_drawn_at_the_bottom() {
        let atlas = SpriteAtlas::new("unused");
        let frame = render(
            &atlas,
            &list(vec![
                DrawItem::Clear,
                DrawItem::DialogBox {
                    text: "",
                    awaiting_input: false,
                },
            ]),
        );
        let inside_y = HEIGHT - DIALOG_MARGIN as u32 - 10;
        assert_eq!(pixel(&frame, WIDTH / 2, inside_y), DIALOG_FILL);
        assert_eq!(pixel(&frame, 4, inside_y), BACKGROUND);
    }
}
