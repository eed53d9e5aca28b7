//! Engine configuration
//!
//! A configuration fixes the action space, the strategy line-up and the
//! hyperparameters of the predictors. It is plain serde data so harnesses
//! can keep it in JSON next to their other settings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bandit::{BanditParams, SelectionRule};
use crate::error::ConfigError;
use crate::markov::max_order;
use crate::payoff::PayoffOracle;
use crate::random::SeededRng;
use crate::strategy::{BuildContext, Strategy, StrategySpec};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub action_space_size: usize,
    /// Orders shared by Markov strategies that do not set their own.
    pub markov_orders: Vec<usize>,
    /// Arms seen by bandit strategies; defaults to the whole action space.
    pub bandit_arm_count: Option<usize>,
    /// Shorthand for `bandit.decay_factor`. When set it takes precedence;
    /// when absent the nested value (0.97 by default) applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay_factor: Option<f64>,
    /// Root seed. Strategy `i` draws from stream `i`.
    pub seed: u64,
    pub strategies: Vec<StrategySpec>,
    pub bandit: BanditParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::rock_paper_scissors()
    }
}

impl EngineConfig {
    /// Hybrid rock-paper-scissors line-up, random first
    pub fn rock_paper_scissors() -> Self {
        Self {
            action_space_size: 3,
            markov_orders: vec![1, 2, 3, 4],
            bandit_arm_count: None,
            decay_factor: None,
            seed: 0,
            strategies: vec![
                StrategySpec::Random,
                StrategySpec::Iterative,
                StrategySpec::CopyOpponent,
                StrategySpec::Reactionary,
                StrategySpec::BeatHuman,
                StrategySpec::Statistical,
                StrategySpec::Markov { orders: None },
            ],
            bandit: BanditParams::default(),
        }
    }

    /// Shared-arm bandit line-up for `arms` arms
    pub fn candy_cane(arms: usize) -> Self {
        Self {
            action_space_size: arms,
            markov_orders: vec![1],
            bandit_arm_count: Some(arms),
            decay_factor: None,
            seed: 0,
            strategies: vec![
                StrategySpec::DecayingBandit { rule: SelectionRule::ExpectedValue },
                StrategySpec::DecayingBandit { rule: SelectionRule::Ucb1 },
                StrategySpec::LeastPulled,
                StrategySpec::CopyOpponent,
                StrategySpec::Random,
            ],
            bandit: BanditParams::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<StrategySpec>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn arm_count(&self) -> usize {
        self.bandit_arm_count.unwrap_or(self.action_space_size)
    }

    /// Bandit parameters with the top-level decay factor applied, if set
    pub fn bandit_params(&self) -> BanditParams {
        match self.decay_factor {
            Some(decay_factor) => BanditParams { decay_factor, ..self.bandit.clone() },
            None => self.bandit.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.action_space_size;
        if n == 0 {
            return Err(ConfigError::EmptyActionSpace);
        }
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }

        let arms = self.arm_count();
        if arms == 0 || arms > n {
            return Err(ConfigError::InvalidArmCount { arms, action_count: n });
        }

        self.bandit_params().validate()?;

        let max = max_order(n);
        let mut order_sets = vec![self.markov_orders.as_slice()];
        for spec in &self.strategies {
            match spec {
                StrategySpec::Markov { orders: Some(orders) } => order_sets.push(orders.as_slice()),
                StrategySpec::Scripted { sequence } => {
                    if sequence.is_empty() || sequence.iter().any(|a| *a >= n) {
                        return Err(ConfigError::InvalidScript);
                    }
                }
                _ => {}
            }
        }
        let uses_shared_orders = self
            .strategies
            .iter()
            .any(|s| matches!(s, StrategySpec::Markov { orders: None }));
        for (i, orders) in order_sets.iter().enumerate() {
            // the shared set only matters when some strategy falls back to it
            if i == 0 && !uses_shared_orders {
                continue;
            }
            if orders.is_empty() {
                return Err(ConfigError::NoMarkovOrders);
            }
            for &order in orders.iter() {
                if order == 0 {
                    return Err(ConfigError::ZeroMarkovOrder);
                }
                if order > max {
                    return Err(ConfigError::MarkovOrderTooLarge { order, max });
                }
            }
        }

        Ok(())
    }

    /// Validate and build the strategy line-up against `oracle`
    pub fn build_strategies(
        &self,
        oracle: &Arc<dyn PayoffOracle>,
    ) -> Result<Vec<Box<dyn Strategy>>, ConfigError> {
        self.validate()?;
        if oracle.action_count() != self.action_space_size {
            return Err(ConfigError::OracleMismatch {
                oracle: oracle.action_count(),
                action_count: self.action_space_size,
            });
        }

        let root = SeededRng::new(self.seed, 0);
        let bandit = self.bandit_params();
        let arm_count = self.arm_count();

        self.strategies
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                spec.build(BuildContext {
                    oracle: Arc::clone(oracle),
                    action_count: self.action_space_size,
                    arm_count,
                    markov_orders: &self.markov_orders,
                    bandit: &bandit,
                    rng: root.fork(i as u32),
                })
            })
            .collect()
    }
}
