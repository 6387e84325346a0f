use super::rendering::{Canvas, GLYPH_ADVANCE, LINE_ADVANCE, TEXT_SCALE};
use super::LoopStats;

const OVERLAY_PADDING: i32 = 6 * TEXT_SCALE;
const OVERLAY_PANEL_INSET_X: i32 = 4 * TEXT_SCALE;
const OVERLAY_PANEL_INSET_Y: i32 = 3 * TEXT_SCALE;
const OVERLAY_TEXT_PRIMARY_COLOR: [u8; 4] = [244, 248, 252, 255];
const OVERLAY_TEXT_DIM_COLOR: [u8; 4] = [176, 198, 220, 255];
const OVERLAY_PANEL_BG_COLOR: [u8; 4] = [10, 12, 16, 210];
const OVERLAY_PANEL_BORDER_COLOR: [u8; 4] = [92, 106, 126, 255];

/// Loop statistics shown in the top-right corner when the metrics overlay is on.
#[derive(Debug, Clone)]
pub(crate) struct OverlayData {
    pub stats: LoopStats,
    pub present_cap: Option<u32>,
    pub debug_delay_ms: u64,
    pub scene_title: Option<String>,
}

pub(crate) fn draw_overlay(canvas: &mut Canvas<'_>, data: &OverlayData) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }

    let lines = build_overlay_lines(data);
    let longest_line_chars = lines
        .iter()
        .map(|line| line.chars().count() as i32)
        .max()
        .unwrap_or(0);
    let panel_width = longest_line_chars * GLYPH_ADVANCE + OVERLAY_PANEL_INSET_X * 2;
    let panel_height = lines.len() as i32 * LINE_ADVANCE + OVERLAY_PANEL_INSET_Y * 2;
    let panel_left = canvas.width() as i32 - panel_width - OVERLAY_PADDING + OVERLAY_PANEL_INSET_X;
    let panel_top = OVERLAY_PADDING - OVERLAY_PANEL_INSET_Y;
    canvas.fill_rect(
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        OVERLAY_PANEL_BG_COLOR,
    );
    canvas.rect_outline(
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        OVERLAY_PANEL_BORDER_COLOR,
    );

    let text_left = panel_left + OVERLAY_PANEL_INSET_X;
    let mut y = OVERLAY_PADDING;
    for (index, line) in lines.iter().enumerate() {
        let color = if index == 0 {
            OVERLAY_TEXT_PRIMARY_COLOR
        } else {
            OVERLAY_TEXT_DIM_COLOR
        };
        canvas.draw_text(text_left, y, line, color);
        y += LINE_ADVANCE;
    }
}

fn build_overlay_lines(data: &OverlayData) -> Vec<String> {
    let mut lines = vec![
        format_fps_line(data.stats.fps, data.present_cap, data.debug_delay_ms),
        format!("TPS: {:.1}", data.stats.tps),
        format!("Frame: {:.2} ms", data.stats.frame_time_ms),
        format!("Dropped ticks: {}", data.stats.dropped_ticks),
    ];
    if let Some(title) = &data.scene_title {
        lines.push(title.clone());
    }
    lines
}

fn format_fps_line(current_fps: f32, cap: Option<u32>, debug_delay_ms: u64) -> String {
    let cap_text = match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    };
    if debug_delay_ms > 0 {
        format!("FPS: {current_fps:.1} (cap {cap_text}, +{debug_delay_ms} ms)")
    } else {
        format!("FPS: {current_fps:.1} (cap {cap_text})")
    }
}
