//! WASM bindings for frontend match replay

#![cfg(feature = "wasm")]

use std::sync::Arc;

use wasm_bindgen::prelude::*;
use crate::{
    run_bandit_match, run_match, ArbitrationEngine, BanditArms, BanditMachine, EngineConfig,
    PayoffOracle, RockPaperScissors, StrategySpec,
};

fn parse_config(json: &str, player: &str) -> Result<EngineConfig, JsError> {
    EngineConfig::from_json(json)
        .map_err(|e| JsError::new(&format!("Invalid config {}: {}", player, e)))
}

fn build_engine(config: &EngineConfig, oracle: &Arc<dyn PayoffOracle>) -> Result<ArbitrationEngine, JsError> {
    ArbitrationEngine::from_config(config, Arc::clone(oracle))
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Replay a match with full round-by-round details
///
/// A config with `bandit_arm_count` set plays the shared bandit machine,
/// seeded from both configs; otherwise both play rock-paper-scissors.
///
/// # Returns
/// Serialized MatchResult
#[wasm_bindgen]
pub fn replay_match(config_a_json: &str, config_b_json: &str, rounds: u32) -> Result<JsValue, JsError> {
    let config_a = parse_config(config_a_json, "A")?;
    let config_b = parse_config(config_b_json, "B")?;

    if config_a.action_space_size != config_b.action_space_size {
        return Err(JsError::new("Configs disagree on the action space"));
    }

    let result = if config_a.bandit_arm_count.is_some() {
        let arms = config_a.action_space_size;
        let oracle: Arc<dyn PayoffOracle> = Arc::new(BanditArms::new(arms));
        let mut a = build_engine(&config_a, &oracle)?;
        let mut b = build_engine(&config_b, &oracle)?;
        let mut machine = BanditMachine::new(
            arms,
            config_a.bandit_params().decay_factor,
            config_a.seed ^ config_b.seed,
        );
        run_bandit_match(&mut a, &mut b, &mut machine, rounds)
    } else {
        let oracle: Arc<dyn PayoffOracle> = Arc::new(RockPaperScissors);
        let mut a = build_engine(&config_a, &oracle)?;
        let mut b = build_engine(&config_b, &oracle)?;
        run_match(&mut a, &mut b, rounds, oracle.as_ref())
    }
    .map_err(|e| JsError::new(&e.to_string()))?;

    serde_wasm_bindgen::to_value(&result)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Get all available strategy kinds, as used in the `kind` tag of a config
#[wasm_bindgen]
pub fn get_strategy_kinds() -> js_sys::Array {
    let specs = [
        StrategySpec::Random,
        StrategySpec::Iterative,
        StrategySpec::CopyOpponent,
        StrategySpec::Reactionary,
        StrategySpec::BeatHuman,
        StrategySpec::Statistical,
        StrategySpec::LeastPulled,
        StrategySpec::Scripted { sequence: vec![0] },
        StrategySpec::Markov { orders: None },
        StrategySpec::DecayingBandit { rule: Default::default() },
    ];

    specs
        .iter()
        .filter_map(|s| serde_json::to_value(s).ok())
        .filter_map(|v| v.get("kind").and_then(|k| k.as_str()).map(JsValue::from_str))
        .collect()
}

/// Default configuration for a named preset, as JSON
#[wasm_bindgen]
pub fn create_config(preset: &str, arms: u32) -> Result<String, JsError> {
    let config = match preset {
        "rock_paper_scissors" => EngineConfig::rock_paper_scissors(),
        "candy_cane" => EngineConfig::candy_cane(arms as usize),
        _ => return Err(JsError::new(&format!("Unknown preset: {}", preset))),
    };

    config.to_json().map_err(|e| JsError::new(&e.to_string()))
}
