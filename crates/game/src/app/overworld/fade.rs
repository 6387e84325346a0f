use super::intents::TeleportTarget;

pub const FADE_FRAMES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    Idle,
    FadingOut,
    FadingIn,
}

/// What the orchestrator must do after a fade tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FadeStep {
    None,
    /// Screen is fully black: swap maps now.
    Swap(TeleportTarget),
    /// Back to idle: release the player.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadeTransition {
    phase: FadePhase,
    counter: u32,
    pending: Option<TeleportTarget>,
}

impl Default for FadeTransition {
    fn default() -> Self {
        Self {
            phase: FadePhase::Idle,
            counter: 0,
            pending: None,
        }
    }
}

impl FadeTransition {
    #[cfg(test)]
    pub fn phase(&self) -> FadePhase {
        self.phase
    }

    #[cfg(test)]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn is_active(&self) -> bool {
        self.phase != FadePhase::Idle
    }

    #[cfg(test)]
    pub fn pending(&self) -> Option<&TeleportTarget> {
        self.pending.as_ref()
    }

    /// Begins fading out toward `target`. Returns `false` if a fade is already running.
    pub fn start(&mut self, target: TeleportTarget) -> bool {
        if self.is_active() {
            return false;
        }
        self.pending = Some(target);
        self.phase = FadePhase::FadingOut;
        self.counter = 1;
        true
    }

    pub fn tick(&mut self) -> FadeStep {
        match self.phase {
            FadePhase::Idle => FadeStep::None,
            FadePhase::FadingOut => {
                if self.counter >= FADE_FRAMES {
                    self.counter = FADE_FRAMES;
                    self.phase = FadePhase::FadingIn;
                    return match self.pending.take() {
                        Some(target) => FadeStep::Swap(target),
                        None => FadeStep::None,
                    };
                }
                self.counter += 1;
                FadeStep::None
            }
            FadePhase::FadingIn => {
                self.counter = self.counter.saturating_sub(1);
                if self.counter == 0 {
                    self.phase = FadePhase::Idle;
                    return FadeStep::Finished;
                }
                FadeStep::None
            }
        }
    }

    /// Overlay opacity, `0` when idle and `255` at the swap.
    pub fn alpha(&self) -> u8 {
        debug_assert!(self.counter <= FADE_FRAMES, "fade counter {} out of range", self.counter);
        let counter = self.counter.min(FADE_FRAMES);
        (counter * 255 / FADE_FRAMES) as u8
    }
}
