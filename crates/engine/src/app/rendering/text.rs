//! 3x5 bitmap font covering printable ASCII, scaled up for a 960x540 frame.

pub const GLYPH_WIDTH: i32 = 3;
pub const GLYPH_HEIGHT: i32 = 5;
pub const TEXT_SCALE: i32 = 3;
pub const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
pub const LINE_ADVANCE: i32 = (GLYPH_HEIGHT + 2) * TEXT_SCALE;

const FIRST_PRINTABLE: u32 = ' ' as u32;
const LAST_PRINTABLE: u32 = '~' as u32;
const FALLBACK_CHAR: char = '?';

// Indexed by `ch - ' '`; each row stores three bits, most significant bit on the left.
const GLYPH_ROWS: [[u8; GLYPH_HEIGHT as usize]; 95] = [
    [0b000, 0b000, 0b000, 0b000, 0b000], [0b010, 0b010, 0b010, 0b000, 0b010],
    [0b101, 0b101, 0b000, 0b000, 0b000], [0b101, 0b111, 0b101, 0b111, 0b101],
    [0b111, 0b110, 0b111, 0b011, 0b111], [0b101, 0b001, 0b010, 0b100, 0b101],
    [0b010, 0b101, 0b010, 0b101, 0b011], [0b010, 0b010, 0b000, 0b000, 0b000],
    [0b001, 0b010, 0b010, 0b010, 0b001], [0b100, 0b010, 0b010, 0b010, 0b100],
    [0b000, 0b101, 0b010, 0b101, 0b000], [0b000, 0b010, 0b111, 0b010, 0b000],
    [0b000, 0b000, 0b000, 0b010, 0b100], [0b000, 0b000, 0b111, 0b000, 0b000],
    [0b000, 0b000, 0b000, 0b000, 0b010], [0b001, 0b001, 0b010, 0b100, 0b100],
    [0b111, 0b101, 0b101, 0b101, 0b111], [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111], [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001], [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111], [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111], [0b111, 0b101, 0b111, 0b001, 0b111],
    [0b000, 0b010, 0b000, 0b010, 0b000], [0b000, 0b010, 0b000, 0b010, 0b100],
    [0b001, 0b010, 0b100, 0b010, 0b001], [0b000, 0b111, 0b000, 0b111, 0b000],
    [0b100, 0b010, 0b001, 0b010, 0b100], [0b111, 0b001, 0b011, 0b000, 0b010],
    [0b111, 0b101, 0b111, 0b100, 0b111], [0b010, 0b101, 0b111, 0b101, 0b101],
    [0b110, 0b101, 0b110, 0b101, 0b110], [0b111, 0b100, 0b100, 0b100, 0b111],
    [0b110, 0b101, 0b101, 0b101, 0b110], [0b111, 0b100, 0b110, 0b100, 0b111],
    [0b111, 0b100, 0b110, 0b100, 0b100], [0b111, 0b100, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b111, 0b101, 0b101], [0b111, 0b010, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b001, 0b101, 0b111], [0b101, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111], [0b101, 0b111, 0b111, 0b101, 0b101],
    [0b101, 0b111, 0b111, 0b111, 0b101], [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b110, 0b101, 0b110, 0b100, 0b100], [0b111, 0b101, 0b101, 0b111, 0b001],
    [0b110, 0b101, 0b110, 0b101, 0b101], [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b010, 0b010, 0b010, 0b010], [0b101, 0b101, 0b101, 0b101, 0b111],
    [0b101, 0b101, 0b101, 0b101, 0b010], [0b101, 0b101, 0b111, 0b111, 0b101],
    [0b101, 0b101, 0b010, 0b101, 0b101], [0b101, 0b101, 0b010, 0b010, 0b010],
    [0b111, 0b001, 0b010, 0b100, 0b111], [0b110, 0b100, 0b100, 0b100, 0b110],
    [0b100, 0b100, 0b010, 0b001, 0b001], [0b011, 0b001, 0b001, 0b001, 0b011],
    [0b010, 0b101, 0b000, 0b000, 0b000], [0b000, 0b000, 0b000, 0b000, 0b111],
    [0b100, 0b010, 0b000, 0b000, 0b000], [0b000, 0b111, 0b001, 0b111, 0b111],
    [0b100, 0b100, 0b110, 0b101, 0b110], [0b000, 0b111, 0b100, 0b100, 0b111],
    [0b001, 0b001, 0b111, 0b101, 0b111], [0b000, 0b111, 0b110, 0b100, 0b111],
    [0b011, 0b100, 0b110, 0b100, 0b100], [0b000, 0b111, 0b101, 0b111, 0b001],
    [0b100, 0b100, 0b110, 0b101, 0b101], [0b010, 0b000, 0b010, 0b010, 0b010],
    [0b001, 0b000, 0b001, 0b101, 0b010], [0b100, 0b101, 0b110, 0b101, 0b101],
    [0b100, 0b100, 0b100, 0b100, 0b111], [0b000, 0b110, 0b111, 0b101, 0b101],
    [0b000, 0b110, 0b101, 0b101, 0b101], [0b000, 0b111, 0b101, 0b101, 0b111],
    [0b000, 0b110, 0b101, 0b110, 0b100], [0b000, 0b111, 0b101, 0b111, 0b001],
    [0b000, 0b110, 0b101, 0b100, 0b100], [0b000, 0b111, 0b110, 0b001, 0b111],
    [0b010, 0b111, 0b010, 0b010, 0b011], [0b000, 0b101, 0b101, 0b101, 0b111],
    [0b000, 0b101, 0b101, 0b101, 0b010], [0b000, 0b101, 0b101, 0b111, 0b010],
    [0b000, 0b101, 0b010, 0b010, 0b101], [0b000, 0b101, 0b101, 0b111, 0b001],
    [0b000, 0b111, 0b001, 0b010, 0b111], [0b011, 0b010, 0b110, 0b010, 0b011],
    [0b010, 0b010, 0b010, 0b010, 0b010], [0b110, 0b010, 0b011, 0b010, 0b110],
    [0b000, 0b011, 0b110, 0b000, 0b000],
];

pub(crate) fn glyph_rows(ch: char) -> Option<[u8; GLYPH_HEIGHT as usize]> {
    let code = ch as u32;
    if (FIRST_PRINTABLE..=LAST_PRINTABLE).contains(&code) {
        Some(GLYPH_ROWS[(code - FIRST_PRINTABLE) as usize])
    } else {
        None
    }
}

/// Rows for `ch`, substituting `?` for anything outside printable ASCII.
pub(crate) fn glyph_rows_or_fallback(ch: char) -> [u8; GLYPH_HEIGHT as usize] {
    glyph_rows(ch)
        .or_else(|| glyph_rows(FALLBACK_CHAR))
        .unwrap_or([0; GLYPH_HEIGHT as usize])
}

pub fn text_width_px(text: &str) -> i32 {
    text.chars().count() as i32 * GLYPH_ADVANCE
}

/// Greedy word wrap to `max_width_px`. Words wider than a full line are split.
pub fn wrap_text(text: &str, max_width_px: i32) -> Vec<String> {
    let max_chars = (max_width_px / GLYPH_ADVANCE).max(1) as usize;
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
            let mut word_chars: Vec<char> = word.chars().collect();
            while word_chars.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word_chars.split_off(max_chars);
                lines.push(word_chars.into_iter().collect());
                word_chars = rest;
            }

            let needed = if current_len == 0 {
                word_chars.len()
            } else {
                current_len + 1 + word_chars.len()
            };
            if needed > max_chars {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current.extend(word_chars.iter());
            current_len += word_chars.len();
        }

        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyph_lookup_covers_ascii_printable_range() {
        for code in 32u8..=126u8 {
            let ch = char::from(code);
            assert!(glyph_rows(ch).is_some(), "missing glyph for '{ch}'");
        }
    }

    #[test]
    fn space_is_blank_and_letters_are_not() {
        assert_eq!(glyph_rows(' '), Some([0; 5]));
        assert_ne!(glyph_rows('A'), Some([0; 5]));
    }

    #[test]
    fn non_ascii_uses_question_mark() {
        assert!(glyph_rows('\u{e9}').is_none());
        assert_eq!(glyph_rows_or_fallback('\u{e9}'), glyph_rows_or_fallback('?'));
    }

    #[test]
    fn layout_metrics_follow_text_scale() {
        assert_eq!(GLYPH_ADVANCE, 12);
        assert_eq!(LINE_ADVANCE, 21);
        assert_eq!(text_width_px("Hi"), 24);
    }

    #[test]
    fn wrap_breaks_on_word_boundaries() {
        let lines = wrap_text("hello there friend", GLYPH_ADVANCE * 11);
        assert_eq!(lines, vec!["hello there", "friend"]);
    }

    #[test]
    fn wrap_splits_words_longer_than_a_line() {
        let lines = wrap_text("abcdefgh", GLYPH_ADVANCE * 3);
        assert_eq!(lines, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn wrap_keeps_explicit_newlines_and_empty_text() {
        assert_eq!(wrap_text("a\nb", 1000), vec!["a", "b"]);
        assert_eq!(wrap_text("", 1000), vec![String::new()]);
    }
}
