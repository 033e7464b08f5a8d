//! Joint move histories
//!
//! A state records the last `depth` moves of every tracked history. History 0
//! is the focal player, history 1 the opponent. The extended space carries a
//! third history that is driven by the opponent side.
//!
//! Ids are big-endian per history with the focal history most significant,
//! so in the 64-state space the id bits read `a3 a2 a1 b3 b2 b1`.

use std::fmt;
use std::str::FromStr;
use serde::Serialize;
use crate::error::{Error, Result};
use crate::strategy::Move;

/// Bit layout of a state space
///
/// Only [`StateSpace::M3`] and [`StateSpace::M3_EXTENDED`] can be built, so
/// the shifts in `size` and `opponent_branches` stay in range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StateSpace {
    histories: u8,
    depth: u8,
}

impl StateSpace {
    /// Own and opponent's last three rounds: 64 states
    pub const M3: StateSpace = StateSpace { histories: 2, depth: 3 };
    /// Three histories of three rounds each: 512 states
    pub const M3_EXTENDED: StateSpace = StateSpace { histories: 3, depth: 3 };

    /// Resolve the space whose size equals `len`
    pub fn for_len(len: usize) -> Result<Self> {
        [Self::M3, Self::M3_EXTENDED]
            .into_iter()
            .find(|space| space.size() == len)
            .ok_or_else(|| Error::encoding(format!("expected 64 or 512 characters, got {}", len)))
    }

    pub fn histories(&self) -> usize {
        self.histories as usize
    }

    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    pub fn bits(&self) -> usize {
        self.histories() * self.depth()
    }

    /// Number of states
    pub fn size(&self) -> usize {
        1 << self.bits()
    }

    /// Number of joint moves the non-focal histories can make in one round
    pub fn opponent_branches(&self) -> usize {
        1 << (self.histories() - 1)
    }

    /// XOR masks that flip the most recent move of one history
    ///
    /// `[1, 8]` for the 64-state space, `[1, 8, 64]` for the extended one.
    pub fn perturbations(&self) -> Vec<usize> {
        (0..self.histories())
            .rev()
            .map(|history| 1 << self.shift(history))
            .collect()
    }

    pub fn state(&self, id: usize) -> Result<State> {
        State::from_id(*self, id)
    }

    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        let space = *self;
        (0..self.size()).map(move |id| State { space, id })
    }

    pub(crate) fn shift(&self, history: usize) -> usize {
        (self.histories() - 1 - history) * self.depth()
    }

    pub(crate) fn group_mask(&self) -> usize {
        (1 << self.depth()) - 1
    }

    /// Moves of the non-focal histories for one branch index.
    ///
    /// History 1 is the most significant bit of `branch`, and cooperation
    /// comes first.
    pub(crate) fn opponent_moves(&self, branch: usize) -> Vec<Move> {
        let others = self.histories() - 1;
        (0..others)
            .map(|k| Move::from_bit((branch >> (others - 1 - k)) & 1 == 1))
            .collect()
    }
}

impl Default for StateSpace {
    fn default() -> Self {
        Self::M3
    }
}

impl fmt::Display for StateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} ({} states)", self.histories, self.depth, self.size())
    }
}

/// A point in the joint history space
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    space: StateSpace,
    id: usize,
}

impl PartialOrd for StateSpace {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StateSpace {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.histories, self.depth).cmp(&(other.histories, other.depth))
    }
}

impl State {
    pub fn from_id(space: StateSpace, id: usize) -> Result<Self> {
        if id >= space.size() {
            return Err(Error::InvalidStateIndex { index: id, size: space.size() });
        }
        Ok(Self { space, id })
    }

    /// Build a state from its slots, oldest first within each history
    pub fn from_moves(space: StateSpace, moves: &[Move]) -> Result<Self> {
        if moves.len() != space.bits() {
            return Err(Error::encoding(format!(
                "a state needs {} moves, got {}",
                space.bits(),
                moves.len()
            )));
        }
        let id = moves
            .iter()
            .fold(0usize, |id, m| (id << 1) | usize::from(m.is_defect()));
        Ok(Self { space, id })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn space(&self) -> StateSpace {
        self.space
    }

    /// Move recorded `lag` rounds ago (1 = most recent) in a history
    pub fn slot(&self, history: usize, lag: usize) -> Move {
        debug_assert!(history < self.space.histories());
        debug_assert!(lag >= 1 && lag <= self.space.depth());
        Move::from_bit((self.id >> (self.space.shift(history) + lag - 1)) & 1 == 1)
    }

    /// Most recent move of a history
    pub fn last(&self, history: usize) -> Move {
        self.slot(history, 1)
    }

    /// All slots of a history, oldest first
    pub fn history(&self, history: usize) -> Vec<Move> {
        (1..=self.space.depth()).rev().map(|lag| self.slot(history, lag)).collect()
    }

    fn group(&self, history: usize) -> usize {
        (self.id >> self.space.shift(history)) & self.space.group_mask()
    }

    /// Successor after every history records one more move.
    ///
    /// `moves[0]` is the focal move, the rest follow history order.
    pub fn next(&self, moves: &[Move]) -> State {
        debug_assert_eq!(moves.len(), self.space.histories());
        let mask = self.space.group_mask();
        let id = moves.iter().enumerate().fold(0usize, |id, (history, m)| {
            let group = ((self.group(history) << 1) & mask) | usize::from(m.is_defect());
            id | (group << self.space.shift(history))
        });
        State { space: self.space, id }
    }

    /// Successor with a single opponent history (64-state space)
    pub fn next_pair(&self, own: Move, opponent: Move) -> State {
        self.next(&[own, opponent])
    }

    /// The same round seen from `history`'s seat: that history moves to the
    /// front, the others keep their order.
    pub fn viewed_by(&self, history: usize) -> State {
        debug_assert!(history < self.space.histories());
        let order = std::iter::once(history)
            .chain((0..self.space.histories()).filter(|h| *h != history));
        let id = order.enumerate().fold(0usize, |id, (seat, h)| {
            id | (self.group(h) << self.space.shift(seat))
        });
        State { space: self.space, id }
    }

    /// Exchange the focal and opponent histories
    pub fn swap(&self) -> State {
        self.viewed_by(1)
    }

    /// Zero-sum score of the last round against the opponent history
    pub fn relative_payoff(&self) -> i64 {
        match (self.last(0), self.last(1)) {
            (Move::Cooperate, Move::Defect) => -1,
            (Move::Defect, Move::Cooperate) => 1,
            _ => 0,
        }
    }

    /// Number of histories whose last move differs from `other`, or `None`
    /// when any older slot differs (one round can never bridge them).
    pub fn last_round_difference(&self, other: &State) -> Option<usize> {
        let recent = self
            .space
            .perturbations()
            .into_iter()
            .fold(0usize, |mask, bit| mask | bit);
        let diff = self.id ^ other.id;
        if diff & !recent != 0 {
            return None;
        }
        Some(diff.count_ones() as usize)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for history in 0..self.space.histories() {
            for m in self.history(history) {
                write!(f, "{}", m.to_char())?;
            }
        }
        Ok(())
    }
}

impl FromStr for State {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let space = [StateSpace::M3, StateSpace::M3_EXTENDED]
            .into_iter()
            .find(|space| space.bits() == s.chars().count())
            .ok_or_else(|| Error::encoding(format!("'{}' is not a 6 or 9 move state", s)))?;
        let moves = s
            .chars()
            .enumerate()
            .map(|(position, c)| {
                Move::from_char(c).ok_or_else(|| {
                    Error::encoding(format!("unexpected character '{}' at position {}", c, position))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        State::from_moves(space, &moves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m3(id: usize) -> State {
        State::from_id(StateSpace::M3, id).unwrap()
    }

    #[test]
    fn test_all_defect_state() {
        let s = m3(63);
        assert_eq!(s.to_string(), "dddddd");
        assert_eq!(s.relative_payoff(), 0);
        assert_eq!(m3(0).to_string(), "cccccc");
    }

    #[test]
    fn test_state_43() {
        let s = m3(43);
        assert_eq!(s.to_string(), "dcdcdd");
        assert_eq!(s.relative_payoff(), 0);
        assert_eq!(s.next_pair(Move::Cooperate, Move::Defect).to_string(), "cdcddd");
    }

    #[test]
    fn test_state_44_payoffs() {
        let s = m3(44);
        assert_eq!(s.to_string(), "dcddcc");
        assert_eq!(s.relative_payoff(), 1);
        let n = s.next_pair(Move::Cooperate, Move::Defect);
        assert_eq!(n.to_string(), "cdcccd");
        assert_eq!(n.relative_payoff(), -1);
    }

    #[test]
    fn test_space_layouts() {
        assert_eq!(StateSpace::M3.size(), 64);
        assert_eq!(StateSpace::M3_EXTENDED.size(), 512);
        assert_eq!(StateSpace::M3_EXTENDED.opponent_branches(), 4);
        assert_eq!(StateSpace::for_len(512).unwrap(), StateSpace::M3_EXTENDED);
        assert!(StateSpace::for_len(128).is_err());
        let json = serde_json::to_value(StateSpace::M3_EXTENDED).unwrap();
        assert_eq!(json, serde_json::json!({ "histories": 3, "depth": 3 }));
    }

    #[test]
    fn test_swap() {
        let s = m3(46);
        assert_eq!(s.to_string(), "dcdddc");
        assert_eq!(s.swap().to_string(), "ddcdcd");
    }

    #[test]
    fn test_parse_and_slots() {
        let s: State = "dcdccd".parse().unwrap();
        assert_eq!(s, m3(0b101001));
        assert_eq!(s.slot(0, 3), Move::Defect);
        assert_eq!(s.slot(0, 1), Move::Defect);
        assert_eq!(s.last(1), Move::Defect);
        assert_eq!(s.history(1), vec![Move::Cooperate, Move::Cooperate, Move::Defect]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            State::from_id(StateSpace::M3, 64),
            Err(Error::InvalidStateIndex { index: 64, size: 64 })
        ));
        assert!("ccxccc".parse::<State>().is_err());
        assert!("cccc".parse::<State>().is_err());
    }

    #[test]
    fn test_space_layout() {
        assert_eq!(StateSpace::M3.size(), 64);
        assert_eq!(StateSpace::M3_EXTENDED.size(), 512);
        assert_eq!(StateSpace::M3.perturbations(), vec![1, 8]);
        assert_eq!(StateSpace::M3_EXTENDED.perturbations(), vec![1, 8, 64]);
        assert_eq!(StateSpace::for_len(512).unwrap(), StateSpace::M3_EXTENDED);
        assert!(StateSpace::for_len(40).is_err());
    }

    #[test]
    fn test_extended_views() {
        let s: State = "ddcdddccc".parse().unwrap();
        assert_eq!(s.space(), StateSpace::M3_EXTENDED);
        assert_eq!(s.viewed_by(1).to_string(), "dddddcccc");
        assert_eq!(s.viewed_by(2).to_string(), "cccddcddd");
        let n = s.next(&[Move::Defect, Move::Cooperate, Move::Defect]);
        assert_eq!(n.to_string(), "dcdddcccd");
    }

    #[test]
    fn test_last_round_difference() {
        let s: State = "ddcdddccc".parse().unwrap();
        assert_eq!(s.last_round_difference(&s), Some(0));
        assert_eq!(s.last_round_difference(&"dddddcccc".parse().unwrap()), Some(2));
        assert_eq!(s.last_round_difference(&"cdcdddccc".parse().unwrap()), None);
        assert_eq!(s.last_round_difference(&"ddddddccc".parse().unwrap()), Some(1));
        assert_eq!(s.last_round_difference(&"ddddddccd".parse().unwrap()), Some(2));
        assert_eq!(s.last_round_difference(&"ddddddccd".parse::<State>().unwrap()
            .next(&[Move::Cooperate; 3])), None);
    }

    proptest! {
        #[test]
        fn prop_id_and_text_round_trip(id in 0usize..64, ext in 0usize..512) {
            let s = m3(id);
            prop_assert_eq!(s.to_string().parse::<State>().unwrap(), s);
            prop_assert_eq!(State::from_id(StateSpace::M3, s.id()).unwrap(), s);

            let e = State::from_id(StateSpace::M3_EXTENDED, ext).unwrap();
            prop_assert_eq!(e.to_string().parse::<State>().unwrap(), e);
        }

        #[test]
        fn prop_swap_commutes_with_next(id in 0usize..64, a in any::<bool>(), b in any::<bool>()) {
            let s = m3(id);
            let (a, b) = (Move::from_bit(a), Move::from_bit(b));
            prop_assert_eq!(s.swap().swap(), s);
            prop_assert_eq!(s.next_pair(a, b).swap(), s.swap().next_pair(b, a));
            prop_assert_eq!(s.swap().relative_payoff(), -s.relative_payoff());
        }
    }
}
