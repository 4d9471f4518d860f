//! Busy overlay state and the feedback observer interface.

use crate::format::format_clock;

/// State of the busy overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyState {
    /// No request in flight.
    #[default]
    Idle,
    /// Request in flight, no estimate shown.
    Indeterminate,
    /// Counting down the estimate; seconds remaining.
    Countdown(u64),
    /// The estimate has passed; seconds since it ran out.
    Overrun(u64),
}

impl BusyState {
    #[must_use]
    pub const fn is_busy(self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Whether this state advances on ticks.
    #[must_use]
    pub const fn is_timed(self) -> bool {
        matches!(self, Self::Countdown(_) | Self::Overrun(_))
    }
}

/// How a busy episode should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusyOptions {
    /// Countdown length in seconds; `None` for an indeterminate overlay.
    pub countdown: Option<u64>,
}

impl BusyOptions {
    /// Overlay without timer text.
    #[must_use]
    pub const fn indeterminate() -> Self {
        Self { countdown: None }
    }

    /// Overlay counting down from `secs`, then counting up.
    #[must_use]
    pub const fn countdown(secs: u64) -> Self {
        Self {
            countdown: Some(secs),
        }
    }
}

/// Single-owner busy indicator, advanced by discrete one-second ticks.
#[derive(Debug, Clone, Default)]
pub struct BusyIndicator {
    state: BusyState,
    message: Option<String>,
}

impl BusyIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> BusyState {
        self.state
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Starts a busy episode, discarding any timer state from a previous one.
    pub fn show(&mut self, message: impl Into<String>, options: BusyOptions) {
        self.hide();
        self.message = Some(message.into());
        self.state = options
            .countdown
            .map_or(BusyState::Indeterminate, BusyState::Countdown);
    }

    /// Advances the timer by one second.
    ///
    /// A countdown that has reached zero switches to counting up.
    pub fn tick(&mut self) -> BusyState {
        self.state = match self.state {
            BusyState::Countdown(0) => BusyState::Overrun(0),
            BusyState::Countdown(n) => BusyState::Countdown(n - 1),
            BusyState::Overrun(n) => BusyState::Overrun(n.saturating_add(1)),
            other => other,
        };
        self.state
    }

    /// Ends the episode and clears message and timer.
    pub fn hide(&mut self) {
        self.state = BusyState::Idle;
        self.message = None;
    }

    /// Text shown under the spinner while a timed episode runs.
    #[must_use]
    pub fn timer_text(&self) -> Option<String> {
        match self.state {
            BusyState::Countdown(n) => Some(format!("About {} remaining", format_clock(n))),
            BusyState::Overrun(n) => Some(format!(
                "Taking longer than expected ({})",
                format_clock(n)
            )),
            BusyState::Idle | BusyState::Indeterminate => None,
        }
    }
}

/// Kind of a transient status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Transient status line shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Trait for rendering busy episodes and status messages.
///
/// All methods have default no-op implementations for convenience.
pub trait Feedback: Send + Sync {
    /// Called when a busy episode starts.
    fn on_busy(&self, _busy: &BusyIndicator) {}

    /// Called after each timer tick of a timed episode.
    fn on_tick(&self, _busy: &BusyIndicator) {}

    /// Called when the busy episode ends.
    fn on_idle(&self) {}

    /// Called when a status message is posted.
    fn on_status(&self, _status: &StatusMessage) {}
}

/// A null feedback implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {}
