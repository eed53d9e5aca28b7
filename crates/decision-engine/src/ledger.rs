//! Actions, rounds and the append-only history of a game

use serde::{Deserialize, Serialize};

/// An action index in `[0, N)` where `N` is the size of the action space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Action(pub usize);

impl Action {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn in_range(self, action_count: usize) -> bool {
        self.0 < action_count
    }
}

impl From<usize> for Action {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One completed tick of the game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub own_action: Action,
    pub opponent_action: Action,
    pub realized_payoff: i64,
}

impl Round {
    pub fn new(own_action: Action, opponent_action: Action, realized_payoff: i64) -> Self {
        Self { own_action, opponent_action, realized_payoff }
    }

    pub fn paid_off(&self) -> bool {
        self.realized_payoff > 0
    }
}

/// Append-only record of realized rounds
///
/// Index 0 is the first tick; `len()` is the number of completed ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    rounds: Vec<Round>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from already-realized rounds, oldest first
    pub fn from_rounds(rounds: Vec<Round>) -> Self {
        Self { rounds }
    }

    pub fn push(&mut self, round: Round) {
        self.rounds.push(round);
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    pub fn last(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// The `n` most recent rounds, or `None` if fewer than `n` exist
    pub fn tail(&self, n: usize) -> Option<&[Round]> {
        let len = self.rounds.len();
        if n > len {
            return None;
        }
        Some(&self.rounds[len - n..])
    }

    /// Rounds from `start` onwards (empty once `start >= len`)
    pub fn since(&self, start: usize) -> &[Round] {
        let start = start.min(self.rounds.len());
        &self.rounds[start..]
    }

    pub fn opponent_actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.rounds.iter().map(|r| r.opponent_action)
    }
}

/// Tracks how much of a ledger a stateful strategy has absorbed
///
/// `observe` may be called repeatedly with an unchanged ledger; the cursor
/// hands out each round exactly once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    seen: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> usize {
        self.seen
    }

    /// Indices of rounds not yet absorbed, marking them as absorbed
    pub fn advance(&mut self, ledger: &Ledger) -> core::ops::Range<usize> {
        let start = self.seen.min(ledger.len());
        self.seen = ledger.len();
        start..ledger.len()
    }
}
