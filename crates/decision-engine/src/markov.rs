//! Variable-order Markov predictor
//!
//! One table per configured order `k` maps the last `k` rounds (both
//! players' actions) to the opponent action that most recently followed
//! that context. Prediction consults the highest order first and counters
//! the first hit.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::ledger::{Action, Cursor, Ledger, Round};
use crate::payoff::PayoffOracle;
use crate::random::SeededRng;
use crate::strategy::{Fallback, Strategy};

/// Context of `order` rounds encoded as base-`N²` digits,
/// one digit `own * N + opponent` per round, oldest first
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PredictionKey(u64);

impl PredictionKey {
    pub fn from_rounds(rounds: &[Round], action_count: usize) -> Self {
        let n = action_count as u64;
        let base = n * n;
        let key = rounds.iter().fold(0u64, |key, round| {
            let digit = round.own_action.index() as u64 * n + round.opponent_action.index() as u64;
            key.wrapping_mul(base).wrapping_add(digit)
        });
        Self(key)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Highest order whose keys fit in a `u64` for `action_count` actions
pub fn max_order(action_count: usize) -> usize {
    let base = (action_count as u64).saturating_mul(action_count as u64);
    if base <= 1 {
        return 64;
    }
    let mut order = 0;
    let mut span: u64 = 1;
    while let Some(next) = span.checked_mul(base) {
        span = next;
        order += 1;
    }
    order
}

/// Opponent action that last followed each context of one order
#[derive(Clone, Debug)]
pub struct PredictionTable {
    order: usize,
    entries: HashMap<PredictionKey, Action>,
}

impl PredictionTable {
    pub fn new(order: usize) -> Self {
        Self { order, entries: HashMap::new() }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(&mut self, key: PredictionKey, next: Action) {
        self.entries.insert(key, next);
    }

    pub fn lookup(&self, key: PredictionKey) -> Option<Action> {
        self.entries.get(&key).copied()
    }
}

/// A hit from the bank: the opponent is expected to play `expected`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub order: usize,
    pub expected: Action,
}

/// Bank of prediction tables, one per configured order
pub struct MarkovPredictorBank {
    oracle: Arc<dyn PayoffOracle>,
    action_count: usize,
    // highest order first
    tables: Vec<PredictionTable>,
    fallback: Fallback,
    cursor: Cursor,
}

impl MarkovPredictorBank {
    pub fn new(
        orders: &[usize],
        oracle: Arc<dyn PayoffOracle>,
        rng: SeededRng,
    ) -> Result<Self, ConfigError> {
        let action_count = oracle.action_count();
        if action_count == 0 {
            return Err(ConfigError::EmptyActionSpace);
        }
        if orders.is_empty() {
            return Err(ConfigError::NoMarkovOrders);
        }
        let max = max_order(action_count);
        for &order in orders {
            if order == 0 {
                return Err(ConfigError::ZeroMarkovOrder);
            }
            if order > max {
                return Err(ConfigError::MarkovOrderTooLarge { order, max });
            }
        }
        if oracle.winning_action(Action(0)).is_none() {
            return Err(ConfigError::NoWinningAction { strategy: "markov" });
        }

        let mut sorted = orders.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();

        Ok(Self {
            oracle,
            action_count,
            tables: sorted.into_iter().map(PredictionTable::new).collect(),
            fallback: Fallback::new(action_count, rng),
            cursor: Cursor::new(),
        })
    }

    /// Configured orders, highest first
    pub fn orders(&self) -> impl Iterator<Item = usize> + '_ {
        self.tables.iter().map(PredictionTable::order)
    }

    pub fn table(&self, order: usize) -> Option<&PredictionTable> {
        self.tables.iter().find(|t| t.order == order)
    }

    /// Most specific prediction available for the tick after `ledger`
    pub fn prediction(&self, ledger: &Ledger) -> Option<Prediction> {
        self.tables.iter().find_map(|table| {
            let context = ledger.tail(table.order)?;
            let key = PredictionKey::from_rounds(context, self.action_count);
            table
                .lookup(key)
                .map(|expected| Prediction { order: table.order, expected })
        })
    }

    /// What the order-`order` table alone would predict, ignoring the others
    pub fn prediction_at(&self, order: usize, ledger: &Ledger) -> Option<Action> {
        let table = self.table(order)?;
        let context = ledger.tail(order)?;
        table.lookup(PredictionKey::from_rounds(context, self.action_count))
    }
}

impl Strategy for MarkovPredictorBank {
    fn name(&self) -> &'static str {
        "markov"
    }

    fn observe(&mut self, ledger: &Ledger) {
        let fresh = self.cursor.advance(ledger);
        if fresh.is_empty() {
            return;
        }

        let rounds = ledger.rounds();
        for i in fresh {
            // the context is the `order` rounds immediately before round i
            for table in &mut self.tables {
                let order = table.order;
                if i < order {
                    continue;
                }
                let key = PredictionKey::from_rounds(&rounds[i - order..i], self.action_count);
                table.record(key, rounds[i].opponent_action);
            }
        }
        self.fallback.invalidate();
    }

    fn propose(&mut self, ledger: &Ledger) -> Action {
        let Some(prediction) = self.prediction(ledger) else {
            return self.fallback.pick();
        };

        log::debug!(
            "markov order {} expects opponent action {}",
            prediction.order,
            prediction.expected
        );

        match self.oracle.winning_action(prediction.expected) {
            Some(counter) => counter,
            None => self.fallback.pick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::{BanditArms, RockPaperScissors};

    fn bank(orders: &[usize]) -> MarkovPredictorBank {
        MarkovPredictorBank::new(orders, Arc::new(RockPaperScissors), SeededRng::new(42, 0)).unwrap()
    }

    /// Ledger where we always played `own` and the opponent played `opponent`
    fn ledger_against(opponent: &[usize], own: usize) -> Ledger {
        Ledger::from_rounds(
            opponent
                .iter()
                .map(|opp| Round::new(Action(own), Action(*opp), 0))
                .collect(),
        )
    }

    fn counter(action: usize) -> Action {
        Action((action + 1) % 3)
    }

    #[test]
    fn test_key_encoding() {
        let rounds = [
            Round::new(Action(1), Action(2), 0),
            Round::new(Action(0), Action(1), 0),
        ];
        // digits: 1*3+2 = 5, 0*3+1 = 1, base 9
        assert_eq!(PredictionKey::from_rounds(&rounds, 3).value(), 5 * 9 + 1);
        assert_eq!(PredictionKey::from_rounds(&[], 3).value(), 0);
    }

    #[test]
    fn test_max_order() {
        // 9^20 < 2^64 < 9^21
        assert_eq!(max_order(3), 20);
        // 4^32 overflows, 4^31 fits
        assert_eq!(max_order(2), 31);
        assert_eq!(max_order(1), 64);
    }

    #[test]
    fn test_rejects_bad_orders() {
        let oracle: Arc<dyn PayoffOracle> = Arc::new(RockPaperScissors);
        let rng = SeededRng::new(1, 0);

        let err = MarkovPredictorBank::new(&[], oracle.clone(), rng.clone()).err();
        assert_eq!(err, Some(ConfigError::NoMarkovOrders));

        let err = MarkovPredictorBank::new(&[1, 0], oracle.clone(), rng.clone()).err();
        assert_eq!(err, Some(ConfigError::ZeroMarkovOrder));

        let err = MarkovPredictorBank::new(&[21], oracle, rng.clone()).err();
        assert_eq!(err, Some(ConfigError::MarkovOrderTooLarge { order: 21, max: 20 }));

        let err = MarkovPredictorBank::new(&[1], Arc::new(BanditArms::new(3)), rng).err();
        assert_eq!(err, Some(ConfigError::NoWinningAction { strategy: "markov" }));
    }

    #[test]
    fn test_orders_sorted_and_deduplicated() {
        let b = bank(&[2, 4, 1, 2, 3]);
        assert_eq!(b.orders().collect::<Vec<_>>(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_cold_start_falls_back_in_range() {
        let mut b = bank(&[1, 2, 3]);
        let empty = Ledger::new();
        b.observe(&empty);
        let first = b.propose(&empty);
        assert!(first.in_range(3));
        assert_eq!(b.propose(&empty), first);
        assert!(b.prediction(&empty).is_none());
    }

    #[test]
    fn test_tables_update_one_round_in_arrears() {
        let mut b = bank(&[1, 2]);

        let l = ledger_against(&[2], 0);
        b.observe(&l);
        assert!(b.table(1).unwrap().is_empty());

        let l = ledger_against(&[2, 1], 0);
        b.observe(&l);
        assert_eq!(b.table(1).unwrap().len(), 1);
        assert!(b.table(2).unwrap().is_empty());

        let l = ledger_against(&[2, 1, 0], 0);
        b.observe(&l);
        assert_eq!(b.table(2).unwrap().len(), 1);

        // (0,2) -> 1 and (0,1) -> 0
        let key = PredictionKey::from_rounds(&l.rounds()[0..1], 3);
        assert_eq!(b.table(1).unwrap().lookup(key), Some(Action(1)));
        let key = PredictionKey::from_rounds(&l.rounds()[1..2], 3);
        assert_eq!(b.table(1).unwrap().lookup(key), Some(Action(0)));
    }

    #[test]
    fn test_observe_is_idempotent() {
        let mut b = bank(&[1, 2, 3]);
        let l = ledger_against(&[0, 1, 2, 0, 1, 2, 0], 1);
        b.observe(&l);
        let sizes: Vec<_> = b.tables.iter().map(PredictionTable::len).collect();
        let proposal = b.propose(&l);

        b.observe(&l);
        b.observe(&l);
        let again: Vec<_> = b.tables.iter().map(PredictionTable::len).collect();
        assert_eq!(sizes, again);
        assert_eq!(b.propose(&l), proposal);
    }

    #[test]
    fn test_incremental_matches_batch_observation() {
        let opponent = [0, 2, 2, 1, 0, 0, 2, 1, 1, 0];

        let mut incremental = bank(&[1, 2, 3]);
        for t in 1..=opponent.len() {
            incremental.observe(&ledger_against(&opponent[..t], 2));
        }

        let mut batch = bank(&[1, 2, 3]);
        let full = ledger_against(&opponent, 2);
        batch.observe(&full);

        for order in 1..=3 {
            assert_eq!(
                incremental.prediction_at(order, &full),
                batch.prediction_at(order, &full),
            );
        }
    }

    #[test]
    fn test_opponent_repeating_lagged_action_is_learned() {
        // the opponent replays its own action from `k` rounds ago
        for k in 1..=4 {
            let seed: Vec<usize> = (0..k).map(|i| (i * 2 + 1) % 3).collect();
            let mut opponent = seed.clone();
            while opponent.len() < 6 * k + 6 {
                opponent.push(opponent[opponent.len() - k]);
            }

            let mut b = bank(&(1..=k).collect::<Vec<_>>());
            for t in 1..opponent.len() {
                let l = ledger_against(&opponent[..t], 0);
                b.observe(&l);
                if t < 2 * k {
                    continue;
                }
                assert_eq!(
                    b.prediction_at(k, &l),
                    Some(Action(opponent[t])),
                    "order {} mispredicted tick {}",
                    k,
                    t
                );
                let used = b.prediction(&l).unwrap();
                assert_eq!(used.order, k, "order {} was not preferred at tick {}", k, t);
                assert_eq!(b.propose(&l), counter(opponent[t]));
            }
        }
    }

    #[test]
    fn test_constant_opponent_learned_after_two_observations() {
        let mut b = bank(&[1]);
        let l = ledger_against(&[1, 1], 0);
        b.observe(&l);
        assert_eq!(b.prediction_at(1, &l), Some(Action(1)));
        assert_eq!(b.propose(&l), counter(1));
    }

    #[test]
    fn test_higher_order_wins_over_lower() {
        let mut b = bank(&[1, 2]);
        // order 2: opponent context (1, 0) was followed by 2
        // order 1: opponent context (0) was most recently followed by 1
        let opponent = [1, 0, 2, 2, 0, 1, 1, 0];
        let l = ledger_against(&opponent, 0);
        b.observe(&l);

        assert_eq!(b.prediction_at(1, &l), Some(Action(1)));
        assert_eq!(b.prediction_at(2, &l), Some(Action(2)));
        assert_eq!(b.prediction(&l), Some(Prediction { order: 2, expected: Action(2) }));
        assert_eq!(b.propose(&l), counter(2));
    }

    #[test]
    fn test_falls_back_to_lower_order_when_context_is_new() {
        let mut b = bank(&[1, 3]);
        let l = ledger_against(&[0, 1, 2, 1], 0);
        b.observe(&l);
        // the last three rounds (1,2,1) have never been a context, but (1) has
        assert_eq!(b.prediction_at(3, &l), None);
        assert_eq!(b.prediction(&l), Some(Prediction { order: 1, expected: Action(2) }));
    }

    #[test]
    fn test_sequence_switch_overwrites_table() {
        // opponent plays 0,0,0,1,1,1 while we hold still
        let opponent = [0, 0, 0, 1, 1, 1];
        let mut b = bank(&[1]);

        // after [0,0] the table knows (0,0) -> 0
        let l = ledger_against(&opponent[..2], 0);
        b.observe(&l);
        assert_eq!(b.propose(&l), counter(0));

        let l = ledger_against(&opponent[..3], 0);
        b.observe(&l);
        assert_eq!(b.propose(&l), counter(0));

        // the switch to 1 overwrites (0,0) and teaches (0,1) -> 1
        let l = ledger_against(&opponent[..4], 0);
        b.observe(&l);
        assert_eq!(b.prediction_at(1, &ledger_against(&[0], 0)), Some(Action(1)));

        let l = ledger_against(&opponent[..5], 0);
        b.observe(&l);
        assert_eq!(b.propose(&l), counter(1));
    }
}
