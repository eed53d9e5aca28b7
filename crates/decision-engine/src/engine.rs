//! Arbitration engine
//!
//! Runs every strategy each tick, scores each one by what its previous
//! proposal would have earned against the opponent's realized action, and
//! plays the proposal of the current leader.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError};
use crate::ledger::{Action, Ledger, Round};
use crate::payoff::PayoffOracle;
use crate::strategy::Strategy;

/// One strategy owned by the engine, with its running score
pub struct StrategyRecord {
    pub strategy: Box<dyn Strategy>,
    /// Sum of `score(last_proposal, opponent_action)` over all scored ticks.
    pub cumulative_score: i64,
    /// Proposal made for the upcoming tick.
    pub last_proposal: Option<Action>,
}

impl StrategyRecord {
    fn new(strategy: Box<dyn Strategy>) -> Self {
        Self { strategy, cumulative_score: 0, last_proposal: None }
    }

    pub fn name(&self) -> &'static str {
        self.strategy.name()
    }
}

pub struct ArbitrationEngine {
    oracle: Arc<dyn PayoffOracle>,
    action_count: usize,
    ledger: Ledger,
    records: Vec<StrategyRecord>,
    tick: u64,
    last_played: Option<Action>,
    leader: usize,
    // set once a strategy misbehaves; every later tick fails with it
    fault: Option<EngineError>,
}

impl ArbitrationEngine {
    /// Engine over a fixed line-up; strategies cannot be added later
    pub fn new(
        oracle: Arc<dyn PayoffOracle>,
        strategies: Vec<Box<dyn Strategy>>,
    ) -> Result<Self, EngineError> {
        let action_count = oracle.action_count();
        if action_count == 0 {
            return Err(ConfigError::EmptyActionSpace.into());
        }
        if strategies.is_empty() {
            return Err(ConfigError::NoStrategies.into());
        }

        Ok(Self {
            oracle,
            action_count,
            ledger: Ledger::new(),
            records: strategies.into_iter().map(StrategyRecord::new).collect(),
            tick: 0,
            last_played: None,
            leader: 0,
            fault: None,
        })
    }

    pub fn from_config(config: &EngineConfig, oracle: Arc<dyn PayoffOracle>) -> Result<Self, EngineError> {
        let strategies = config.build_strategies(&oracle)?;
        Self::new(oracle, strategies)
    }

    /// Number of completed `step` calls
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn records(&self) -> &[StrategyRecord] {
        &self.records
    }

    /// Index of the strategy whose proposal was played last
    pub fn leader(&self) -> usize {
        self.leader
    }

    pub fn last_played(&self) -> Option<Action> {
        self.last_played
    }

    /// The out-of-range proposal that halted the engine, if any
    ///
    /// Once set, the round of the failed tick stays in the ledger, scores
    /// and proposals keep their pre-tick values, and every call errors.
    pub fn fault(&self) -> Option<&EngineError> {
        self.fault.as_ref()
    }

    /// Harness entry point: one call per game tick
    ///
    /// `tick_index` must match the number of ticks this engine has played.
    pub fn play(
        &mut self,
        previous_opponent_action: Option<Action>,
        tick_index: u64,
    ) -> Result<Action, EngineError> {
        if tick_index != self.tick {
            return Err(EngineError::TickMismatch { expected: self.tick, got: tick_index });
        }
        self.step(previous_opponent_action)
    }

    /// Advance one tick, taking the payoff of the last round from the oracle
    pub fn step(&mut self, opponent_action: Option<Action>) -> Result<Action, EngineError> {
        self.advance(opponent_action, None)
    }

    /// Advance one tick with a payoff realized by the environment
    ///
    /// Bandit games reward pulls stochastically, so the payoff cannot be
    /// recomputed from the two actions.
    pub fn step_rewarded(
        &mut self,
        opponent_action: Option<Action>,
        reward: i64,
    ) -> Result<Action, EngineError> {
        self.advance(opponent_action, Some(reward))
    }

    fn advance(&mut self, opponent_action: Option<Action>, payoff: Option<i64>) -> Result<Action, EngineError> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }

        let completed = match (self.last_played, opponent_action) {
            (None, None) => None,
            (None, Some(action)) => return Err(EngineError::UnexpectedOpponentAction { action }),
            (Some(_), None) => return Err(EngineError::MissingOpponentAction { tick: self.tick }),
            (Some(own), Some(opp)) => {
                if !opp.in_range(self.action_count) {
                    return Err(EngineError::InvalidOpponentAction {
                        action: opp,
                        action_count: self.action_count,
                    });
                }
                Some((own, opp))
            }
        };

        if let Some((own, opp)) = completed {
            let realized = payoff.unwrap_or_else(|| self.oracle.score(own, opp));
            self.ledger.push(Round::new(own, opp, realized));
        }

        for record in &mut self.records {
            record.strategy.observe(&self.ledger);
        }

        let mut proposals = Vec::with_capacity(self.records.len());
        for record in &mut self.records {
            let proposal = record.strategy.propose(&self.ledger);
            if !proposal.in_range(self.action_count) {
                let fault = EngineError::OutOfRangeAction {
                    strategy: record.name(),
                    action: proposal,
                    action_count: self.action_count,
                };
                // strategies keep the observed round; nothing past this point is committed
                log::error!("tick {}: {}; engine halted", self.tick, fault);
                self.fault = Some(fault.clone());
                return Err(fault);
            }
            proposals.push(proposal);
        }

        // proposals from the previous tick are scored before being replaced
        for (record, proposal) in self.records.iter_mut().zip(proposals) {
            if let (Some((_, opp)), Some(previous)) = (completed, record.last_proposal) {
                let delta = self.oracle.score(previous, opp);
                record.cumulative_score += delta;
                log::trace!(
                    "tick {} {} proposed {} scored {} total {}",
                    self.tick,
                    record.name(),
                    previous,
                    delta,
                    record.cumulative_score
                );
            }
            record.last_proposal = Some(proposal);
        }

        // the first tick delegates to the first strategy in the line-up
        self.leader = if completed.is_none() { 0 } else { self.best_index() };
        let record = &self.records[self.leader];
        let action = record.last_proposal.unwrap_or(Action(0));

        log::debug!(
            "tick {} leader {} (score {}) plays {}",
            self.tick,
            record.name(),
            record.cumulative_score,
            action
        );

        self.last_played = Some(action);
        self.tick += 1;
        Ok(action)
    }

    /// Highest cumulative score, ties to the earliest strategy
    fn best_index(&self) -> usize {
        let mut best = 0;
        for (i, record) in self.records.iter().enumerate().skip(1) {
            if record.cumulative_score > self.records[best].cumulative_score {
                best = i;
            }
        }
        best
    }
}
