//! Strategy capability and the declarative strategy line-up
//!
//! Every candidate the engine arbitrates between implements [`Strategy`].
//! Stateless policies treat `observe` as a no-op. [`StrategySpec`] is the
//! serializable description a configuration uses to build them.

mod basic;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bandit::{BanditParams, DecayingBanditSelector, SelectionRule};
use crate::error::ConfigError;
use crate::ledger::{Action, Ledger};
use crate::markov::MarkovPredictorBank;
use crate::payoff::PayoffOracle;
use crate::random::SeededRng;

pub use basic::{
    BeatHuman, CopyOpponent, Iterative, LeastPulled, Reactionary, Scripted, Statistical,
    UniformRandom,
};

/// A candidate policy for the next move of a repeated game
///
/// The engine calls `observe` on every strategy before any `propose` within
/// a tick. Strategies get read-only access to the shared ledger.
pub trait Strategy: Send {
    /// Short identifier used in logs and errors
    fn name(&self) -> &'static str;

    /// Absorb rounds appended since the previous call. Calling again with an
    /// unchanged ledger must not double-count; an empty ledger is a no-op.
    fn observe(&mut self, ledger: &Ledger);

    /// Next action, always in range. Repeated calls within one tick return
    /// the same action.
    fn propose(&mut self, ledger: &Ledger) -> Action;
}

/// Uniform random fallback, sampled at most once per tick
///
/// The sample is cached until [`Fallback::invalidate`] is called, which
/// strategies do when `observe` sees a new round.
#[derive(Clone, Debug)]
pub struct Fallback {
    rng: SeededRng,
    action_count: usize,
    cached: Option<Action>,
}

impl Fallback {
    pub fn new(action_count: usize, rng: SeededRng) -> Self {
        Self { rng, action_count, cached: None }
    }

    pub fn pick(&mut self) -> Action {
        if let Some(action) = self.cached {
            return action;
        }
        let action = Action(self.rng.next_index(self.action_count));
        self.cached = Some(action);
        action
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

/// Serializable description of one strategy in an engine's line-up
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategySpec {
    /// Uniform random choice each tick.
    Random,
    /// Actions 0, 1, ..., N-1 in rotation.
    Iterative,
    /// Copy the opponent's last action. Also known as copycat.
    CopyOpponent,
    /// Beat the opponent's last action.
    Reactionary,
    /// Win-stay on the opponent's move, lose-shift to its counter.
    BeatHuman,
    /// Beat the opponent's most frequent action.
    Statistical,
    /// Pull the arm pulled least by both players.
    LeastPulled,
    /// Replay a fixed sequence of actions.
    Scripted { sequence: Vec<usize> },
    /// Variable-order Markov predictor. Orders default to the engine's.
    Markov {
        #[serde(default)]
        orders: Option<Vec<usize>>,
    },
    /// Decaying multi-armed bandit selector.
    DecayingBandit {
        #[serde(default)]
        rule: SelectionRule,
    },
}

/// Everything a [`StrategySpec`] needs to become a running strategy
pub struct BuildContext<'a> {
    pub oracle: Arc<dyn PayoffOracle>,
    pub action_count: usize,
    pub arm_count: usize,
    pub markov_orders: &'a [usize],
    pub bandit: &'a BanditParams,
    pub rng: SeededRng,
}

impl StrategySpec {
    pub fn name(&self) -> &'static str {
        match self {
            StrategySpec::Random => "random",
            StrategySpec::Iterative => "iterative",
            StrategySpec::CopyOpponent => "copy-opponent",
            StrategySpec::Reactionary => "reactionary",
            StrategySpec::BeatHuman => "beat-human",
            StrategySpec::Statistical => "statistical",
            StrategySpec::LeastPulled => "least-pulled",
            StrategySpec::Scripted { .. } => "scripted",
            StrategySpec::Markov { .. } => "markov",
            StrategySpec::DecayingBandit { .. } => "decaying-bandit",
        }
    }

    /// Whether the strategy relies on the game's counter-action
    pub fn needs_winning_action(&self) -> bool {
        matches!(
            self,
            StrategySpec::Reactionary
                | StrategySpec::BeatHuman
                | StrategySpec::Statistical
                | StrategySpec::Markov { .. }
        )
    }

    pub fn build(&self, ctx: BuildContext<'_>) -> Result<Box<dyn Strategy>, ConfigError> {
        if self.needs_winning_action() && ctx.oracle.winning_action(Action(0)).is_none() {
            return Err(ConfigError::NoWinningAction { strategy: self.name() });
        }

        let strategy: Box<dyn Strategy> = match self {
            StrategySpec::Random => Box::new(UniformRandom::new(ctx.action_count, ctx.rng)),
            StrategySpec::Iterative => Box::new(Iterative::new(ctx.action_count)),
            StrategySpec::CopyOpponent => Box::new(CopyOpponent::new(ctx.action_count, ctx.rng)),
            StrategySpec::Reactionary => Box::new(Reactionary::new(ctx.oracle, ctx.rng)),
            StrategySpec::BeatHuman => Box::new(BeatHuman::new(ctx.oracle, ctx.rng)),
            StrategySpec::Statistical => Box::new(Statistical::new(ctx.oracle, ctx.rng)),
            StrategySpec::LeastPulled => Box::new(LeastPulled::new(ctx.arm_count)),
            StrategySpec::Scripted { sequence } => {
                if sequence.is_empty() || sequence.iter().any(|a| *a >= ctx.action_count) {
                    return Err(ConfigError::InvalidScript);
                }
                Box::new(Scripted::new(sequence.iter().copied().map(Action).collect()))
            }
            StrategySpec::Markov { orders } => {
                let orders = orders.as_deref().unwrap_or(ctx.markov_orders);
                Box::new(MarkovPredictorBank::new(orders, ctx.oracle, ctx.rng)?)
            }
            StrategySpec::DecayingBandit { rule } => Box::new(DecayingBanditSelector::new(
                ctx.arm_count,
                *rule,
                ctx.bandit.clone(),
                ctx.rng,
            )?),
        };

        Ok(strategy)
    }
}
