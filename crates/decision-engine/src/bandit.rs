//! Decaying multi-armed bandit selector
//!
//! Arms are shared with the opponent and lose value as either player pulls
//! them, so every estimate is discounted by how much the arm has been used.
//! Two selection rules are available: the expected-value heuristic with
//! win-stay and streak persistence, and decayed UCB1.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ledger::{Action, Cursor, Ledger};
use crate::random::SeededRng;
use crate::strategy::Strategy;

/// Tunable constants of the selector
///
/// The defaults come from competition tuning; none of them is derived.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BanditParams {
    /// Per-pull erosion of an arm's value, in `(0, 1]`.
    pub decay_factor: f64,
    /// Subtracted once an opponent has touched the arm.
    pub opponent_penalty: f64,
    /// Wins credited to every arm before the first pull.
    pub optimistic_wins: u32,
    /// Chance of sticking with a losing arm after three identical pulls.
    pub persistence_probability: f64,
    /// Floor for pull counts so cold arms never divide by zero.
    pub epsilon: f64,
}

impl Default for BanditParams {
    fn default() -> Self {
        Self {
            decay_factor: 0.97,
            opponent_penalty: 1.5,
            optimistic_wins: 1,
            persistence_probability: 0.5,
            epsilon: 1e-32,
        }
    }
}

impl BanditParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(ConfigError::InvalidDecay(self.decay_factor));
        }
        if !(0.0..=1.0).contains(&self.persistence_probability) {
            return Err(ConfigError::InvalidProbability {
                name: "persistence_probability",
                value: self.persistence_probability,
            });
        }
        if !(self.epsilon > 0.0) {
            return Err(ConfigError::InvalidProbability { name: "epsilon", value: self.epsilon });
        }
        Ok(())
    }
}

/// How the selector ranks arms
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionRule {
    /// Decayed expected value with win-stay and streak persistence.
    #[default]
    ExpectedValue,
    /// Decayed UCB1 over the agent's own rewards.
    Ucb1,
}

/// Per-arm statistics
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    pub wins: u32,
    pub losses: u32,
    pub opponent_pulls: u32,
    pub own_streak: u32,
    pub opponent_streak: u32,
    /// Decayed sum of rewards from our own pulls (UCB1).
    pub reward_sum: f64,
    /// Our own pulls, floored at epsilon (UCB1).
    pub selections: f64,
}

impl ArmStats {
    fn new(params: &BanditParams) -> Self {
        Self {
            wins: params.optimistic_wins,
            losses: 0,
            opponent_pulls: 0,
            own_streak: 0,
            opponent_streak: 0,
            reward_sum: params.epsilon,
            selections: params.epsilon,
        }
    }

    /// Pulls by both players, including the optimistic prior
    pub fn total_pulls(&self) -> u32 {
        self.wins + self.losses + self.opponent_pulls
    }

    pub fn expected_value(&self, params: &BanditParams) -> f64 {
        let total = self.total_pulls();
        let touched = if self.opponent_pulls > 0 { params.opponent_penalty } else { 0.0 };
        let numerator = self.wins as f64 - self.losses as f64 + self.opponent_pulls as f64
            - touched
            + self.opponent_streak as f64;
        let denominator = (total as f64).max(params.epsilon);
        numerator / denominator * params.decay_factor.powi(total as i32)
    }

    pub fn ucb_score(&self, tick: usize) -> f64 {
        let mean = self.reward_sum / self.selections;
        let bonus = (2.0 * ((tick + 1) as f64).ln() / self.selections).sqrt();
        mean + bonus
    }
}

/// Which branch picked the last proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Explore,
    WinStay,
    Persist,
    BestExpected,
    Ucb,
}

pub struct DecayingBanditSelector {
    rule: SelectionRule,
    params: BanditParams,
    arms: Vec<ArmStats>,
    rng: SeededRng,
    cursor: Cursor,
    cached: Option<(Action, Choice)>,
}

impl DecayingBanditSelector {
    pub fn new(
        arm_count: usize,
        rule: SelectionRule,
        params: BanditParams,
        rng: SeededRng,
    ) -> Result<Self, ConfigError> {
        if arm_count == 0 {
            return Err(ConfigError::NoArms);
        }
        params.validate()?;

        Ok(Self {
            rule,
            arms: vec![ArmStats::new(&params); arm_count],
            params,
            rng,
            cursor: Cursor::new(),
            cached: None,
        })
    }

    pub fn arms(&self) -> &[ArmStats] {
        &self.arms
    }

    pub fn rule(&self) -> SelectionRule {
        self.rule
    }

    /// Branch behind the current cached proposal, if any
    pub fn last_choice(&self) -> Option<Choice> {
        self.cached.map(|(_, choice)| choice)
    }

    /// Arm with the highest expected value, ties to the lowest index
    pub fn best_expected(&self) -> Action {
        let mut best = 0;
        let mut best_value = self.arms[0].expected_value(&self.params);
        for (arm, stats) in self.arms.iter().enumerate().skip(1) {
            let value = stats.expected_value(&self.params);
            if value > best_value {
                best = arm;
                best_value = value;
            }
        }
        Action(best)
    }

    /// Arm with the highest UCB1 score, ties to the lowest index
    pub fn best_ucb(&self, tick: usize) -> Action {
        let mut best = 0;
        let mut best_score = self.arms[0].ucb_score(tick);
        for (arm, stats) in self.arms.iter().enumerate().skip(1) {
            let score = stats.ucb_score(tick);
            if score > best_score {
                best = arm;
                best_score = score;
            }
        }
        Action(best)
    }

    fn choose(&mut self, ledger: &Ledger) -> (Action, Choice) {
        let Some(last) = ledger.last() else {
            return (Action(self.rng.next_index(self.arms.len())), Choice::Explore);
        };

        if self.rule == SelectionRule::Ucb1 {
            return (self.best_ucb(ledger.len()), Choice::Ucb);
        }

        let last_arm = last.own_action;
        let Some(streak) = self.arms.get(last_arm.index()).map(|s| s.own_streak) else {
            return (self.best_expected(), Choice::BestExpected);
        };

        if last.paid_off() {
            return (last_arm, Choice::WinStay);
        }

        // three identical pulls in a row and the last one lost
        if streak >= 2 {
            if self.rng.chance(self.params.persistence_probability) {
                return (last_arm, Choice::Persist);
            }
            return (self.best_expected(), Choice::BestExpected);
        }

        (self.best_expected(), Choice::BestExpected)
    }
}

impl Strategy for DecayingBanditSelector {
    fn name(&self) -> &'static str {
        "decaying-bandit"
    }

    fn observe(&mut self, ledger: &Ledger) {
        let fresh = self.cursor.advance(ledger);
        if fresh.is_empty() {
            return;
        }

        let rounds = ledger.rounds();
        for i in fresh {
            let round = rounds[i];
            let own = round.own_action.index();
            let opp = round.opponent_action.index();
            let previous = i.checked_sub(1).map(|p| rounds[p]);

            if let Some(stats) = self.arms.get_mut(own) {
                if round.paid_off() {
                    stats.wins += 1;
                } else {
                    stats.losses += 1;
                }
                stats.reward_sum += self.params.decay_factor * round.realized_payoff as f64;
                stats.selections += 1.0;
            }
            if let Some(stats) = self.arms.get_mut(opp) {
                stats.opponent_pulls += 1;
            }

            let Some(previous) = previous else {
                continue;
            };

            let prev_own = previous.own_action.index();
            if prev_own == own {
                if let Some(stats) = self.arms.get_mut(own) {
                    stats.own_streak += 1;
                }
            } else {
                for arm in [prev_own, own] {
                    if let Some(stats) = self.arms.get_mut(arm) {
                        stats.own_streak = 0;
                    }
                }
            }

            let prev_opp = previous.opponent_action.index();
            if prev_opp == opp {
                if let Some(stats) = self.arms.get_mut(opp) {
                    stats.opponent_streak += 1;
                }
            } else {
                for arm in [prev_opp, opp] {
                    if let Some(stats) = self.arms.get_mut(arm) {
                        stats.opponent_streak = 0;
                    }
                }
            }
        }
        self.cached = None;
    }

    fn propose(&mut self, ledger: &Ledger) -> Action {
        if let Some((action, _)) = self.cached {
            return action;
        }

        let (action, choice) = self.choose(ledger);
        log::debug!("bandit picked arm {} ({:?})", action, choice);
        self.cached = Some((action, choice));
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Round;

    fn selector(arms: usize, rule: SelectionRule) -> DecayingBanditSelector {
        DecayingBanditSelector::new(arms, rule, BanditParams::default(), SeededRng::new(42, 0))
            .unwrap()
    }

    fn pull(own: usize, opp: usize, reward: i64) -> Round {
        Round::new(Action(own), Action(opp), reward)
    }

    #[test]
    fn test_params_validation() {
        assert!(BanditParams::default().validate().is_ok());

        let bad = BanditParams { decay_factor: 0.0, ..Default::default() };
        assert_eq!(bad.validate(), Err(ConfigError::InvalidDecay(0.0)));

        let bad = BanditParams { decay_factor: 1.2, ..Default::default() };
        assert_eq!(bad.validate(), Err(ConfigError::InvalidDecay(1.2)));

        let bad = BanditParams { persistence_probability: 1.5, ..Default::default() };
        assert!(bad.validate().is_err());

        let none = DecayingBanditSelector::new(
            0,
            SelectionRule::Ucb1,
            BanditParams::default(),
            SeededRng::new(1, 1),
        );
        assert!(matches!(none, Err(ConfigError::NoArms)));
    }

    #[test]
    fn test_params_from_partial_json() {
        let params: BanditParams = serde_json::from_str(r#"{"decay_factor": 0.9}"#).unwrap();
        assert_eq!(params.decay_factor, 0.9);
        assert_eq!(params.opponent_penalty, 1.5);
        assert_eq!(params.optimistic_wins, 1);
    }

    #[test]
    fn test_first_tick_is_random_and_cached() {
        let mut s = selector(10, SelectionRule::ExpectedValue);
        let empty = Ledger::new();
        s.observe(&empty);
        let first = s.propose(&empty);
        assert!(first.in_range(10));
        assert_eq!(s.last_choice(), Some(Choice::Explore));
        for _ in 0..5 {
            assert_eq!(s.propose(&empty), first);
        }
    }

    #[test]
    fn test_expected_value_formula() {
        let params = BanditParams::default();
        let stats = ArmStats {
            wins: 3,
            losses: 1,
            opponent_pulls: 2,
            own_streak: 0,
            opponent_streak: 1,
            reward_sum: 0.0,
            selections: 1.0,
        };
        // (3 - 1 + 2 - 1.5 + 1) / 6 * 0.97^6
        let expected = 3.5 / 6.0 * 0.97f64.powi(6);
        assert!((stats.expected_value(&params) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_fresh_arm_value_is_prior() {
        let params = BanditParams::default();
        let stats = ArmStats::new(&params);
        assert!((stats.expected_value(&params) - 0.97).abs() < 1e-12);

        let cold = BanditParams { optimistic_wins: 0, ..Default::default() };
        assert_eq!(ArmStats::new(&cold).expected_value(&cold), 0.0);
    }

    #[test]
    fn test_observe_counts_and_is_idempotent() {
        let mut s = selector(4, SelectionRule::ExpectedValue);
        let l = Ledger::from_rounds(vec![pull(0, 1, 1), pull(0, 1, 0), pull(2, 1, 0)]);
        s.observe(&l);
        s.observe(&l);

        let arms = s.arms();
        assert_eq!(arms[0].wins, 2);
        assert_eq!(arms[0].losses, 1);
        assert_eq!(arms[1].opponent_pulls, 3);
        assert_eq!(arms[1].opponent_streak, 2);
        assert_eq!(arms[2].losses, 1);
        // own action changed from 0 to 2: both streaks reset
        assert_eq!(arms[0].own_streak, 0);
        assert_eq!(arms[2].own_streak, 0);
    }

    #[test]
    fn test_streak_resets_on_change() {
        let mut s = selector(3, SelectionRule::ExpectedValue);
        let mut l = Ledger::from_rounds(vec![pull(1, 0, 0), pull(1, 0, 0), pull(1, 0, 0)]);
        s.observe(&l);
        assert_eq!(s.arms()[1].own_streak, 2);
        assert_eq!(s.arms()[0].opponent_streak, 2);

        l.push(pull(2, 2, 0));
        s.observe(&l);
        assert_eq!(s.arms()[1].own_streak, 0);
        assert_eq!(s.arms()[0].opponent_streak, 0);
        assert_eq!(s.arms()[2].opponent_streak, 0);
    }

    #[test]
    fn test_win_stay_forever() {
        let mut s = selector(8, SelectionRule::ExpectedValue);
        let mut l = Ledger::new();

        s.observe(&l);
        let first = s.propose(&l);
        let other = Action((first.index() + 1) % 8);

        for tick in 0..50 {
            s.observe(&l);
            let arm = s.propose(&l);
            assert_eq!(arm, first, "left the paying arm at tick {}", tick);
            if tick > 0 {
                assert_eq!(s.last_choice(), Some(Choice::WinStay));
            }
            l.push(Round::new(arm, other, 1));
        }
    }

    #[test]
    fn test_losing_arm_is_abandoned_for_best_value() {
        let mut s = selector(3, SelectionRule::ExpectedValue);
        // arm 0 lost twice; arm 1 untouched; arm 2 touched by the opponent
        let l = Ledger::from_rounds(vec![pull(0, 2, 0), pull(0, 2, 0)]);
        s.observe(&l);
        assert_eq!(s.propose(&l), Action(1));
        assert_eq!(s.last_choice(), Some(Choice::BestExpected));
    }

    #[test]
    fn test_persistence_after_three_identical_losses() {
        let always = BanditParams { persistence_probability: 1.0, ..Default::default() };
        let mut s =
            DecayingBanditSelector::new(3, SelectionRule::ExpectedValue, always, SeededRng::new(1, 0))
                .unwrap();
        let l = Ledger::from_rounds(vec![pull(2, 0, 0), pull(2, 0, 0), pull(2, 0, 0)]);
        s.observe(&l);
        assert_eq!(s.propose(&l), Action(2));
        assert_eq!(s.last_choice(), Some(Choice::Persist));

        // the opponent wandered over arms 0 and 1, arm 3 is untouched
        let never = BanditParams { persistence_probability: 0.0, ..Default::default() };
        let mut s =
            DecayingBanditSelector::new(4, SelectionRule::ExpectedValue, never, SeededRng::new(1, 0))
                .unwrap();
        let l = Ledger::from_rounds(vec![pull(2, 0, 0), pull(2, 1, 0), pull(2, 0, 0)]);
        s.observe(&l);
        assert_eq!(s.arms()[2].own_streak, 2);
        assert_eq!(s.propose(&l), Action(3));
        assert_eq!(s.last_choice(), Some(Choice::BestExpected));
    }

    #[test]
    fn test_ties_go_to_lowest_arm() {
        let s = selector(5, SelectionRule::ExpectedValue);
        assert_eq!(s.best_expected(), Action(0));
        assert_eq!(s.best_ucb(0), Action(0));
    }

    #[test]
    fn test_ucb_explores_untried_arms_in_order() {
        let mut s = selector(4, SelectionRule::Ucb1);
        let mut l = Ledger::new();
        l.push(pull(0, 3, 1));
        s.observe(&l);
        assert_eq!(s.propose(&l), Action(1));
        assert_eq!(s.last_choice(), Some(Choice::Ucb));

        l.push(pull(1, 3, 0));
        s.observe(&l);
        assert_eq!(s.propose(&l), Action(2));
    }

    #[test]
    fn test_ucb_prefers_rewarding_arm_once_explored() {
        let mut s = selector(2, SelectionRule::Ucb1);
        let mut rounds = Vec::new();
        for _ in 0..10 {
            rounds.push(pull(0, 1, 1));
            rounds.push(pull(1, 0, 0));
        }
        let l = Ledger::from_rounds(rounds);
        s.observe(&l);
        assert!(s.arms()[0].reward_sum > s.arms()[1].reward_sum);
        assert_eq!(s.propose(&l), Action(0));
    }
}
