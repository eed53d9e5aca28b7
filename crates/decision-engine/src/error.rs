//! Error types for configuration and engine stepping

use crate::ledger::Action;

/// Invalid configuration. Fatal at construction time.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Action space has no actions.
    EmptyActionSpace,
    /// Engine was given no strategies to arbitrate between.
    NoStrategies,
    /// A Markov strategy has no orders configured.
    NoMarkovOrders,
    /// Markov order 0 carries no context.
    ZeroMarkovOrder,
    /// Keys for this order do not fit in 64 bits for the action space.
    MarkovOrderTooLarge { order: usize, max: usize },
    /// The game defines no counter-action, which Markov-style strategies need.
    NoWinningAction { strategy: &'static str },
    /// A bandit selector was built with no arms.
    NoArms,
    /// Bandit arm count is zero or exceeds the action space.
    InvalidArmCount { arms: usize, action_count: usize },
    /// The payoff oracle's action space disagrees with the configuration.
    OracleMismatch { oracle: usize, action_count: usize },
    /// Decay factor must lie in `(0, 1]`.
    InvalidDecay(f64),
    /// A probability-valued parameter lies outside `[0, 1]`.
    InvalidProbability { name: &'static str, value: f64 },
    /// Scripted sequence is empty or contains an out-of-range action.
    InvalidScript,
    /// Configuration document could not be parsed.
    Parse(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::EmptyActionSpace => write!(f, "action space is empty"),
            ConfigError::NoStrategies => write!(f, "no strategies configured"),
            ConfigError::NoMarkovOrders => write!(f, "markov strategy has no orders"),
            ConfigError::ZeroMarkovOrder => write!(f, "markov order must be at least 1"),
            ConfigError::MarkovOrderTooLarge { order, max } =>
                write!(f, "markov order {} exceeds maximum {} for this action space", order, max),
            ConfigError::NoWinningAction { strategy } =>
                write!(f, "strategy {} needs a game with a winning action", strategy),
            ConfigError::NoArms => write!(f, "bandit selector has no arms"),
            ConfigError::InvalidArmCount { arms, action_count } =>
                write!(f, "arm count {} invalid for action space of {}", arms, action_count),
            ConfigError::OracleMismatch { oracle, action_count } =>
                write!(f, "oracle has {} actions, configuration has {}", oracle, action_count),
            ConfigError::InvalidDecay(d) => write!(f, "decay factor {} not in (0, 1]", d),
            ConfigError::InvalidProbability { name, value } =>
                write!(f, "{} = {} is not a probability", name, value),
            ConfigError::InvalidScript => write!(f, "scripted sequence is empty or out of range"),
            ConfigError::Parse(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors surfaced by the arbitration engine
#[derive(Clone, Debug, PartialEq)]
pub enum EngineError {
    Configuration(ConfigError),
    /// A strategy proposed an action outside the action space. This is a
    /// defect in the strategy and is never clamped.
    OutOfRangeAction { strategy: &'static str, action: Action, action_count: usize },
    /// Every tick after the first needs the opponent's previous action.
    MissingOpponentAction { tick: u64 },
    /// The first tick has no previous round, so no opponent action may be reported.
    UnexpectedOpponentAction { action: Action },
    /// The harness reported an opponent action outside the action space.
    InvalidOpponentAction { action: Action, action_count: usize },
    /// The harness tick index disagrees with the engine's tick counter.
    TickMismatch { expected: u64, got: u64 },
}

impl core::fmt::Display for EngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EngineError::Configuration(e) => write!(f, "configuration error: {}", e),
            EngineError::OutOfRangeAction { strategy, action, action_count } =>
                write!(f, "strategy {} proposed action {} outside [0, {})", strategy, action, action_count),
            EngineError::MissingOpponentAction { tick } =>
                write!(f, "tick {} requires the opponent's previous action", tick),
            EngineError::UnexpectedOpponentAction { action } =>
                write!(f, "opponent action {} reported before the first tick was played", action),
            EngineError::InvalidOpponentAction { action, action_count } =>
                write!(f, "opponent action {} outside [0, {})", action, action_count),
            EngineError::TickMismatch { expected, got } =>
                write!(f, "expected tick {}, got {}", expected, got),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Configuration(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(ConfigError::EmptyActionSpace.to_string(), "action space is empty");
        assert_eq!(
            EngineError::OutOfRangeAction { strategy: "markov", action: Action(5), action_count: 3 }
                .to_string(),
            "strategy markov proposed action 5 outside [0, 3)",
        );
        assert_eq!(
            EngineError::from(ConfigError::NoStrategies).to_string(),
            "configuration error: no strategies configured",
        );
    }

    #[test]
    fn test_source_chains_configuration() {
        use std::error::Error;
        let err = EngineError::from(ConfigError::InvalidDecay(1.5));
        assert!(err.source().is_some());
        assert!(EngineError::TickMismatch { expected: 1, got: 2 }.source().is_none());
    }
}
