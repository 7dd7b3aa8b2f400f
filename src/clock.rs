use std::time::Duration;

use crate::types::Color;

pub const DEFAULT_CLOCK_TIME: Duration = Duration::from_secs(180);

/// Two count-down clocks. Only the side to move's clock runs, and only once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    initial: Duration,
    white: Duration,
    black: Duration,
    running: bool,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_TIME)
    }
}

impl Clock {
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            white: initial,
            black: initial,
            running: false,
        }
    }

    pub fn remaining(&self, color: Color) -> Duration {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.initial);
    }

    /// Take `elapsed` off `color`'s clock. Returns true when that flag falls.
    /// A stopped clock never moves.
    pub fn tick(&mut self, color: Color, elapsed: Duration) -> bool {
        if !self.running {
            return false;
        }
        let remaining = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        *remaining = remaining.saturating_sub(elapsed);
        remaining.is_zero()
    }

    /// `m:ss` of the time left
    pub fn format_remaining(&self, color: Color) -> String {
        let secs = self.remaining(color).as_secs();
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}
