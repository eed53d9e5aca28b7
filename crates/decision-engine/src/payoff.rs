//! Payoff oracles: the rules of the repeated game
//!
//! The engine never hard-codes a scoring table. Callers supply an oracle;
//! two common games ship with the crate.

use crate::ledger::Action;

/// Pairwise rules of a repeated two-player game
pub trait PayoffOracle: Send + Sync {
    /// Size of the action space `N`
    fn action_count(&self) -> usize;

    /// Signed outcome for the player choosing `a` against `b`:
    /// positive when `a` benefits, negative when `b` does
    fn score(&self, a: Action, b: Action) -> i64;

    /// The unique action that defeats `action`, for games with that symmetry
    fn winning_action(&self, _action: Action) -> Option<Action> {
        None
    }

    fn name(&self) -> &'static str;
}

/// Rock (0), paper (1), scissors (2)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RockPaperScissors;

impl PayoffOracle for RockPaperScissors {
    fn action_count(&self) -> usize {
        3
    }

    fn score(&self, a: Action, b: Action) -> i64 {
        // a beats b exactly when a sits one step ahead of b on the cycle
        match (a.index() + 3 - b.index() % 3) % 3 {
            0 => 0,
            1 => 1,
            _ => -1,
        }
    }

    fn winning_action(&self, action: Action) -> Option<Action> {
        Some(Action((action.index() + 1) % 3))
    }

    fn name(&self) -> &'static str {
        "rock-paper-scissors"
    }
}

/// Multi-armed bandit where both players pull from the same arms
///
/// Rewards come from the environment, not from the pair of actions, so the
/// pairwise score only reflects contention: sharing an arm with the
/// opponent cools it for both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BanditArms {
    pub arms: usize,
}

impl BanditArms {
    pub fn new(arms: usize) -> Self {
        Self { arms }
    }
}

impl PayoffOracle for BanditArms {
    fn action_count(&self) -> usize {
        self.arms
    }

    fn score(&self, a: Action, b: Action) -> i64 {
        if a == b { -1 } else { 0 }
    }

    fn name(&self) -> &'static str {
        "bandit-arms"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: Action = Action(0);
    const P: Action = Action(1);
    const S: Action = Action(2);

    #[test]
    fn test_rps_score_matrix() {
        let g = RockPaperScissors;
        assert_eq!(g.score(R, R), 0);
        assert_eq!(g.score(P, R), 1);
        assert_eq!(g.score(S, P), 1);
        assert_eq!(g.score(R, S), 1);
        assert_eq!(g.score(R, P), -1);
        assert_eq!(g.score(P, S), -1);
        assert_eq!(g.score(S, R), -1);
    }

    #[test]
    fn test_rps_score_is_antisymmetric() {
        let g = RockPaperScissors;
        for a in 0..3 {
            for b in 0..3 {
                assert_eq!(g.score(Action(a), Action(b)), -g.score(Action(b), Action(a)));
            }
        }
    }

    #[test]
    fn test_rps_winning_action_beats() {
        let g = RockPaperScissors;
        for a in 0..3 {
            let w = g.winning_action(Action(a)).unwrap();
            assert_eq!(g.score(w, Action(a)), 1);
        }
    }

    #[test]
    fn test_bandit_contention() {
        let g = BanditArms::new(10);
        assert_eq!(g.action_count(), 10);
        assert_eq!(g.score(Action(3), Action(3)), -1);
        assert_eq!(g.score(Action(3), Action(4)), 0);
        assert!(g.winning_action(Action(3)).is_none());
    }
}
