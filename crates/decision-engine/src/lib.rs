//! Adaptive decision engine for repeated two-player games
//!
//! Every tick the engine runs a line-up of strategies, scores each one by
//! what its previous proposal would have earned, and plays whatever the
//! current leader proposes. The line-up mixes simple heuristics with a
//! variable-order Markov predictor and a decaying multi-armed bandit.
//! This crate is compiled to:
//! - Native (for harnesses and local testing)
//! - WASM (for frontend match replay)

mod random;
mod ledger;
mod error;
mod payoff;
mod strategy;
mod markov;
mod bandit;
mod config;
mod engine;
mod game;

#[cfg(feature = "wasm")]
mod wasm;

pub use random::SeededRng;
pub use ledger::{Action, Cursor, Ledger, Round};
pub use error::{ConfigError, EngineError};
pub use payoff::{BanditArms, PayoffOracle, RockPaperScissors};
pub use strategy::{
    BeatHuman, BuildContext, CopyOpponent, Fallback, Iterative, LeastPulled, Reactionary,
    Scripted, Statistical, Strategy, StrategySpec, UniformRandom,
};
pub use markov::{max_order, MarkovPredictorBank, Prediction, PredictionKey, PredictionTable};
pub use bandit::{ArmStats, BanditParams, Choice, DecayingBanditSelector, SelectionRule};
pub use config::EngineConfig;
pub use engine::{ArbitrationEngine, StrategyRecord};
pub use game::{run_bandit_match, run_match, BanditMachine, MatchResult, RoundResult};
