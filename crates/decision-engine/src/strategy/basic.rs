//! Small heuristic strategies
//!
//! Single-rule policies. The ensemble keeps them around because a
//! predictable opponent is often beaten by the simplest counter.

use std::sync::Arc;

use crate::ledger::{Action, Cursor, Ledger};
use crate::payoff::PayoffOracle;
use crate::random::SeededRng;
use super::{Fallback, Strategy};

/// Uniform random over the action space
pub struct UniformRandom {
    fallback: Fallback,
    cursor: Cursor,
}

impl UniformRandom {
    pub fn new(action_count: usize, rng: SeededRng) -> Self {
        Self { fallback: Fallback::new(action_count, rng), cursor: Cursor::new() }
    }
}

impl Strategy for UniformRandom {
    fn name(&self) -> &'static str {
        "random"
    }

    fn observe(&mut self, ledger: &Ledger) {
        if !self.cursor.advance(ledger).is_empty() {
            self.fallback.invalidate();
        }
    }

    fn propose(&mut self, _ledger: &Ledger) -> Action {
        self.fallback.pick()
    }
}

/// Cycles through the actions in index order, one per tick
pub struct Iterative {
    action_count: usize,
}

impl Iterative {
    pub fn new(action_count: usize) -> Self {
        Self { action_count }
    }
}

impl Strategy for Iterative {
    fn name(&self) -> &'static str {
        "iterative"
    }

    fn observe(&mut self, _ledger: &Ledger) {}

    fn propose(&mut self, ledger: &Ledger) -> Action {
        Action(ledger.len() % self.action_count)
    }
}

/// Plays whatever the opponent played last
pub struct CopyOpponent {
    fallback: Fallback,
    cursor: Cursor,
}

impl CopyOpponent {
    pub fn new(action_count: usize, rng: SeededRng) -> Self {
        Self { fallback: Fallback::new(action_count, rng), cursor: Cursor::new() }
    }
}

impl Strategy for CopyOpponent {
    fn name(&self) -> &'static str {
        "copy-opponent"
    }

    fn observe(&mut self, ledger: &Ledger) {
        if !self.cursor.advance(ledger).is_empty() {
            self.fallback.invalidate();
        }
    }

    fn propose(&mut self, ledger: &Ledger) -> Action {
        match ledger.last() {
            Some(round) => round.opponent_action,
            None => self.fallback.pick(),
        }
    }
}

/// Plays the counter to the opponent's last action
pub struct Reactionary {
    oracle: Arc<dyn PayoffOracle>,
    fallback: Fallback,
    cursor: Cursor,
}

impl Reactionary {
    pub fn new(oracle: Arc<dyn PayoffOracle>, rng: SeededRng) -> Self {
        let fallback = Fallback::new(oracle.action_count(), rng);
        Self { oracle, fallback, cursor: Cursor::new() }
    }
}

impl Strategy for Reactionary {
    fn name(&self) -> &'static str {
        "reactionary"
    }

    fn observe(&mut self, ledger: &Ledger) {
        if !self.cursor.advance(ledger).is_empty() {
            self.fallback.invalidate();
        }
    }

    fn propose(&mut self, ledger: &Ledger) -> Action {
        match ledger.last().and_then(|r| self.oracle.winning_action(r.opponent_action)) {
            Some(action) => action,
            None => self.fallback.pick(),
        }
    }
}

/// Conditional response observed in human play (Wang, Xu & Zhou 2014):
/// after losing, beat the opponent's last action; after winning, play the
/// opponent's last action; after a draw, play at random.
pub struct BeatHuman {
    oracle: Arc<dyn PayoffOracle>,
    fallback: Fallback,
    cursor: Cursor,
}

impl BeatHuman {
    pub fn new(oracle: Arc<dyn PayoffOracle>, rng: SeededRng) -> Self {
        let fallback = Fallback::new(oracle.action_count(), rng);
        Self { oracle, fallback, cursor: Cursor::new() }
    }
}

impl Strategy for BeatHuman {
    fn name(&self) -> &'static str {
        "beat-human"
    }

    fn observe(&mut self, ledger: &Ledger) {
        if !self.cursor.advance(ledger).is_empty() {
            self.fallback.invalidate();
        }
    }

    fn propose(&mut self, ledger: &Ledger) -> Action {
        let Some(last) = ledger.last() else {
            return self.fallback.pick();
        };

        let result = self.oracle.score(last.own_action, last.opponent_action);
        if result < 0 {
            match self.oracle.winning_action(last.opponent_action) {
                Some(action) => action,
                None => self.fallback.pick(),
            }
        } else if result > 0 {
            last.opponent_action
        } else {
            self.fallback.pick()
        }
    }
}

/// Counters the opponent's most frequent action
pub struct Statistical {
    oracle: Arc<dyn PayoffOracle>,
    counts: Vec<u32>,
    // actions in order of first appearance, for tie-breaking
    seen_order: Vec<Action>,
    fallback: Fallback,
    cursor: Cursor,
}

impl Statistical {
    pub fn new(oracle: Arc<dyn PayoffOracle>, rng: SeededRng) -> Self {
        let action_count = oracle.action_count();
        Self {
            oracle,
            counts: vec![0; action_count],
            seen_order: Vec::with_capacity(action_count),
            fallback: Fallback::new(action_count, rng),
            cursor: Cursor::new(),
        }
    }

    /// Opponent's most frequent action so far, ties going to the one seen first
    pub fn most_frequent(&self) -> Option<Action> {
        let mut top: Option<(Action, u32)> = None;
        for action in &self.seen_order {
            let count = self.counts[action.index()];
            if top.map_or(true, |(_, best)| count > best) {
                top = Some((*action, count));
            }
        }
        top.map(|(action, _)| action)
    }
}

impl Strategy for Statistical {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn observe(&mut self, ledger: &Ledger) {
        let fresh = self.cursor.advance(ledger);
        if fresh.is_empty() {
            return;
        }
        for action in ledger.opponent_actions().skip(fresh.start) {
            let Some(count) = self.counts.get_mut(action.index()) else {
                continue;
            };
            if *count == 0 {
                self.seen_order.push(action);
            }
            *count += 1;
        }
        self.fallback.invalidate();
    }

    fn propose(&mut self, _ledger: &Ledger) -> Action {
        match self.most_frequent().and_then(|a| self.oracle.winning_action(a)) {
            Some(action) => action,
            None => self.fallback.pick(),
        }
    }
}

/// Pulls the arm both players together have pulled least
pub struct LeastPulled {
    pulls: Vec<u32>,
    cursor: Cursor,
}

impl LeastPulled {
    pub fn new(arms: usize) -> Self {
        Self { pulls: vec![0; arms], cursor: Cursor::new() }
    }
}

impl Strategy for LeastPulled {
    fn name(&self) -> &'static str {
        "least-pulled"
    }

    fn observe(&mut self, ledger: &Ledger) {
        let fresh = self.cursor.advance(ledger);
        for round in ledger.since(fresh.start) {
            for action in [round.own_action, round.opponent_action] {
                if let Some(count) = self.pulls.get_mut(action.index()) {
                    *count += 1;
                }
            }
        }
    }

    fn propose(&mut self, _ledger: &Ledger) -> Action {
        let mut best = 0;
        for (arm, count) in self.pulls.iter().enumerate() {
            if *count < self.pulls[best] {
                best = arm;
            }
        }
        Action(best)
    }
}

/// Replays a fixed sequence, cycling when it runs out
pub struct Scripted {
    sequence: Vec<Action>,
}

impl Scripted {
    /// `sequence` must be non-empty
    pub fn new(sequence: Vec<Action>) -> Self {
        Self { sequence }
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn observe(&mut self, _ledger: &Ledger) {}

    fn propose(&mut self, ledger: &Ledger) -> Action {
        if self.sequence.is_empty() {
            return Action(0);
        }
        self.sequence[ledger.len() % self.sequence.len()]
    }
}
