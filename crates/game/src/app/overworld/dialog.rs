#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogConfig {
    /// Lets an advance input complete a line that is still being revealed.
    pub skip_reveal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPhase {
    Revealing,
    LineComplete,
    Finished,
}

/// Modal text box: one line at a time, revealed one character per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    lines: Vec<String>,
    line: usize,
    revealed: usize,
    phase: DialogPhase,
    config: DialogConfig,
}

impl Dialog {
    pub fn new(lines: Vec<String>, config: DialogConfig) -> Self {
        let phase = if lines.is_empty() {
            DialogPhase::Finished
        } else {
            DialogPhase::Revealing
        };
        Self {
            lines,
            line: 0,
            revealed: 0,
            phase,
            config,
        }
    }

    pub fn phase(&self) -> DialogPhase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == DialogPhase::Finished
    }

    pub fn line_index(&self) -> usize {
        self.line
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn current_len(&self) -> usize {
        self.lines
            .get(self.line)
            .map(|line| line.chars().count())
            .unwrap_or(0)
    }

    /// The revealed prefix of the current line.
    pub fn visible_text(&self) -> &str {
        let Some(line) = self.lines.get(self.line) else {
            return "";
        };
        if self.is_over() {
            return "";
        }
        match line.char_indices().nth(self.revealed) {
            Some((end, _)) => &line[..end],
            None => line,
        }
    }

    /// Reveals the next character. Empty lines complete on their first tick.
    pub fn tick(&mut self) {
        if self.phase != DialogPhase::Revealing {
            return;
        }
        let len = self.current_len();
        self.revealed = (self.revealed + 1).min(len);
        if self.revealed >= len {
            self.phase = DialogPhase::LineComplete;
        }
    }

    /// Handles the advance input.
    pub fn advance(&mut self) {
        match self.phase {
            DialogPhase::Revealing => {
                if self.config.skip_reveal {
                    self.revealed = self.current_len();
                    self.phase = DialogPhase::LineComplete;
                }
            }
            DialogPhase::LineComplete => {
                if self.line + 1 >= self.lines.len() {
                    self.phase = DialogPhase::Finished;
                    return;
                }
                self.line += 1;
                // The next line opens with its first character already shown.
                self.revealed = 0;
                self.phase = DialogPhase::Revealing;
                self.tick();
            }
            DialogPhase::Finished => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hi_bye(config: DialogConfig) -> Dialog {
        Dialog::new(vec!["Hi".to_string(), "Bye".to_string()], config)
    }

    #[test]
    fn hi_bye_walkthrough() {
        let mut dialog = hi_bye(DialogConfig::default());
        assert_eq!(dialog.visible_text(), "");

        dialog.tick();
        assert_eq!(dialog.visible_text(), "H");
        assert_eq!(dialog.phase(), DialogPhase::Revealing);
        dialog.tick();
        assert_eq!(dialog.visible_text(), "Hi");
        assert_eq!(dialog.phase(), DialogPhase::LineComplete);

        dialog.advance();
        assert_eq!(dialog.line_index(), 1);
        assert_eq!(dialog.visible_text(), "B");
        assert_eq!(dialog.phase(), DialogPhase::Revealing);

        dialog.tick();
        dialog.tick();
        assert_eq!(dialog.visible_text(), "Bye");
        assert_eq!(dialog.phase(), DialogPhase::LineComplete);
        dialog.advance();
        assert!(dialog.is_over());

        dialog.tick();
        dialog.advance();
        assert!(dialog.is_over());
        assert_eq!(dialog.visible_text(), "");
    }

    #[test]
    fn advance_while_revealing_is_ignored_by_default() {
        let mut dialog = hi_bye(DialogConfig::default());
        dialog.tick();
        dialog.advance();
        assert_eq!(dialog.visible_text(), "H");
        assert_eq!(dialog.line_index(), 0);
    }

    #[test]
    fn skip_reveal_completes_the_line() {
        let mut dialog = hi_bye(DialogConfig { skip_reveal: true });
        dialog.tick();
        dialog.advance();
        assert_eq!(dialog.visible_text(), "Hi");
        assert_eq!(dialog.phase(), DialogPhase::LineComplete);
    }

    #[test]
    fn empty_lines_and_empty_dialogs() {
        let mut dialog = Dialog::new(vec![String::new()], DialogConfig::default());
        dialog.tick();
        assert_eq!(dialog.phase(), DialogPhase::LineComplete);
        dialog.advance();
        assert!(dialog.is_over());

        assert!(Dialog::new(Vec::new(), DialogConfig::default()).is_over());
    }

    #[test]
    fn reveal_counts_characters_not_bytes() {
        let mut dialog = Dialog::new(vec!["héé".to_string()], DialogConfig::default());
        dialog.tick();
        dialog.tick();
        assert_eq!(dialog.visible_text(), "hé");
        dialog.tick();
        assert_eq!(dialog.phase(), DialogPhase::LineComplete);
    }
}
