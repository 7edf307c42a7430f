//! Cursor planning for the navigation engine.
//!
//! The default walk is monotonic: it only ever moves toward the target in a
//! straight line and never crosses the wrap boundary, even when that would
//! be shorter. Some firmware ignores wrap-around while a countdown is
//! running, so the shortest path is opt-in.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default pause after each cursor step; the remote side redraws slowly.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(1);

/// How the cursor is walked to the target option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationStrategy {
    /// Step straight toward the target, never across the wrap boundary
    #[default]
    Monotonic,
    /// Take the fewer presses, crossing the wrap boundary when allowed
    ShortestPath,
}

/// One logical cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Up,
    Down,
}

impl CursorMove {
    /// Key table name for this movement.
    pub fn key_name(self) -> &'static str {
        match self {
            CursorMove::Up => biosnav_types::UP_KEY,
            CursorMove::Down => biosnav_types::DOWN_KEY,
        }
    }

    /// Cursor position after this move on a menu of `len` options.
    ///
    /// At a boundary the cursor wraps when `wrap_around` is set and stays put
    /// otherwise.
    pub fn apply(self, current: usize, len: usize, wrap_around: bool) -> usize {
        match self {
            CursorMove::Down if current + 1 < len => current + 1,
            CursorMove::Down if wrap_around => 0,
            CursorMove::Up if current > 0 => current - 1,
            CursorMove::Up if wrap_around => len.saturating_sub(1),
            _ => current,
        }
    }
}

/// Tunables for how keys are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationConfig {
    pub strategy: NavigationStrategy,
    /// Physical key presses per logical cursor step
    pub presses_per_step: usize,
    /// Pause after each logical step
    pub step_delay: Duration,
    /// Times the commit sequence is sent
    pub commit_repeats: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            strategy: NavigationStrategy::Monotonic,
            presses_per_step: 1,
            step_delay: DEFAULT_STEP_DELAY,
            commit_repeats: 1,
        }
    }
}

impl NavigationConfig {
    /// Configuration with no pauses, for replayed sessions.
    pub fn immediate() -> Self {
        Self {
            step_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: NavigationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_presses_per_step(mut self, presses: usize) -> Self {
        self.presses_per_step = presses.max(1);
        self
    }

    pub fn with_commit_repeats(mut self, repeats: usize) -> Self {
        self.commit_repeats = repeats.max(1);
        self
    }
}

/// Moves needed to bring the cursor from `current` to `target`.
pub fn plan_moves(
    current: usize,
    target: usize,
    len: usize,
    wrap_around: bool,
    strategy: NavigationStrategy,
) -> Vec<CursorMove> {
    if current == target {
        return Vec::new();
    }

    let (direction, straight) = if target > current {
        (CursorMove::Down, target - current)
    } else {
        (CursorMove::Up, current - target)
    };

    if strategy == NavigationStrategy::ShortestPath && wrap_around && current < len && target < len {
        let across = len - straight;
        if across < straight {
            let opposite = match direction {
                CursorMove::Down => CursorMove::Up,
                CursorMove::Up => CursorMove::Down,
            };
            return vec![opposite; across];
        }
    }

    vec![direction; straight]
}
