use std::time::{Duration, Instant};

/// A `try_lock`-style deadline.
///
/// `Immediate` is "one attempt, no sleep"; `Millis` is a bounded wait;
/// `Infinite` never gives up and is the distinguished "never time out" case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timeout {
    Immediate,
    Millis(u64),
    Infinite,
}

impl Timeout {
    /// Shorthand for a millisecond timeout; `0` collapses to [`Timeout::Immediate`].
    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::Immediate
        } else {
            Self::Millis(ms)
        }
    }

    /// `None` means "never expires".
    pub(crate) fn deadline(self, now: Instant) -> Option<Instant> {
        match self {
            Self::Infinite => None,
            Self::Immediate => Some(now),
            Self::Millis(ms) => Some(now + Duration::from_millis(ms)),
        }
    }

    /// What's left of this budget after `elapsed` has already passed,
    /// collapsing to [`Timeout::Immediate`] once the budget is spent. Lets a
    /// caller thread one timeout through several sequential waits instead of
    /// handing each wait the full, un-shrunk budget.
    pub(crate) fn remaining_after(self, elapsed: Duration) -> Self {
        match self {
            Self::Infinite => Self::Infinite,
            Self::Immediate => Self::Immediate,
            Self::Millis(ms) => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                if elapsed_ms >= ms {
                    Self::Immediate
                } else {
                    Self::Millis(ms - elapsed_ms)
                }
            },
        }
    }
}
