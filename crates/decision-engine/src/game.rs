//! Match execution between two engines

use serde::{Deserialize, Serialize};

use crate::engine::ArbitrationEngine;
use crate::error::EngineError;
use crate::ledger::Action;
use crate::payoff::PayoffOracle;
use crate::random::SeededRng;

/// Result of a single round
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: u32,
    pub move_a: Action,
    pub move_b: Action,
    pub score_a: i64,
    pub score_b: i64,
    pub cumulative_a: i64,
    pub cumulative_b: i64,
}

/// Result of a complete match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub rounds: Vec<RoundResult>,
    pub total_score_a: i64,
    pub total_score_b: i64,
    pub round_count: u32,
}

impl MatchResult {
    fn with_capacity(round_count: u32) -> Self {
        Self {
            rounds: Vec::with_capacity(round_count as usize),
            total_score_a: 0,
            total_score_b: 0,
            round_count,
        }
    }

    fn record(&mut self, move_a: Action, move_b: Action, score_a: i64, score_b: i64) {
        self.total_score_a += score_a;
        self.total_score_b += score_b;
        self.rounds.push(RoundResult {
            round: self.rounds.len() as u32,
            move_a,
            move_b,
            score_a,
            score_b,
            cumulative_a: self.total_score_a,
            cumulative_b: self.total_score_b,
        });
    }
}

/// Play `rounds` ticks of a game scored entirely by `oracle`
///
/// Both engines move simultaneously: each only learns the other's action
/// at the start of the next tick.
pub fn run_match(
    engine_a: &mut ArbitrationEngine,
    engine_b: &mut ArbitrationEngine,
    rounds: u32,
    oracle: &dyn PayoffOracle,
) -> Result<MatchResult, EngineError> {
    let mut result = MatchResult::with_capacity(rounds);
    let mut last: Option<(Action, Action)> = None;

    for _ in 0..rounds {
        let move_a = engine_a.step(last.map(|(_, b)| b))?;
        let move_b = engine_b.step(last.map(|(a, _)| a))?;

        let score_a = oracle.score(move_a, move_b);
        let score_b = oracle.score(move_b, move_a);
        result.record(move_a, move_b, score_a, score_b);

        last = Some((move_a, move_b));
    }

    log::debug!(
        "match over after {} rounds: {} to {}",
        rounds,
        result.total_score_a,
        result.total_score_b
    );

    Ok(result)
}

/// Shared slot machine with arms that cool down as they are pulled
///
/// Each arm pays out with a hidden probability drawn at construction. Every
/// pull, by either player, multiplies that arm's probability by `decay`.
#[derive(Clone, Debug)]
pub struct BanditMachine {
    thresholds: Vec<f64>,
    decay: f64,
    rng: SeededRng,
}

impl BanditMachine {
    pub fn new(arms: usize, decay: f64, seed: u64) -> Self {
        let mut rng = SeededRng::new(seed, u32::MAX);
        let thresholds = (0..arms).map(|_| rng.next_f64()).collect();
        Self { thresholds, decay, rng }
    }

    pub fn arm_count(&self) -> usize {
        self.thresholds.len()
    }

    /// Current payout probability of each arm
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Both players pull at once; returns each player's reward (0 or 1)
    pub fn pull(&mut self, a: Action, b: Action) -> (i64, i64) {
        let reward_a = self.reward(a);
        let reward_b = self.reward(b);
        for arm in [a, b] {
            if let Some(t) = self.thresholds.get_mut(arm.index()) {
                *t *= self.decay;
            }
        }
        (reward_a, reward_b)
    }

    fn reward(&mut self, arm: Action) -> i64 {
        match self.thresholds.get(arm.index()) {
            Some(&p) => i64::from(self.rng.chance(p)),
            None => 0,
        }
    }
}

/// Play `rounds` pulls of a shared bandit machine
pub fn run_bandit_match(
    engine_a: &mut ArbitrationEngine,
    engine_b: &mut ArbitrationEngine,
    machine: &mut BanditMachine,
    rounds: u32,
) -> Result<MatchResult, EngineError> {
    let mut result = MatchResult::with_capacity(rounds);
    let mut last: Option<(Action, Action)> = None;
    let mut rewards = (0, 0);

    for _ in 0..rounds {
        let move_a = engine_a.step_rewarded(last.map(|(_, b)| b), rewards.0)?;
        let move_b = engine_b.step_rewarded(last.map(|(a, _)| a), rewards.1)?;

        rewards = machine.pull(move_a, move_b);
        result.record(move_a, move_b, rewards.0, rewards.1);

        last = Some((move_a, move_b));
    }

    log::debug!(
        "bandit match over after {} pulls: {} to {}",
        rounds,
        result.total_score_a,
        result.total_score_b
    );

    Ok(result)
}
