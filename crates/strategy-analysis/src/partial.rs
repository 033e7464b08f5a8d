//! Partially specified strategies
//!
//! Slots may be left undefined (`_`) or marked as a wildcard (`*`) that can
//! take either move. Used for constrained searches where only part of the
//! action table has been fixed.

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::graph::DirectedGraph;
use crate::state::{State, StateSpace};
use crate::strategy::{Move, Strategy};
use crate::weighted::DirectedWeightedGraph;

/// Prescription for one state of a [`PartialStrategy`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Cooperate,
    Defect,
    /// No move assigned yet
    Undefined,
    /// Either move
    Wildcard,
}

impl Action {
    pub fn to_char(self) -> char {
        match self {
            Action::Cooperate => 'c',
            Action::Defect => 'd',
            Action::Undefined => '_',
            Action::Wildcard => '*',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(Action::Cooperate),
            'd' => Some(Action::Defect),
            '_' => Some(Action::Undefined),
            '*' => Some(Action::Wildcard),
            _ => None,
        }
    }

    /// The committed move, if any
    pub fn fixed(self) -> Option<Move> {
        match self {
            Action::Cooperate => Some(Move::Cooperate),
            Action::Defect => Some(Move::Defect),
            Action::Undefined | Action::Wildcard => None,
        }
    }

    pub fn is_free(self) -> bool {
        self.fixed().is_none()
    }
}

impl From<Move> for Action {
    fn from(m: Move) -> Self {
        match m {
            Move::Cooperate => Action::Cooperate,
            Move::Defect => Action::Defect,
        }
    }
}

static BOTH: [Move; 2] = [Move::Cooperate, Move::Defect];

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartialStrategy {
    space: StateSpace,
    actions: Vec<Action>,
}

impl PartialStrategy {
    /// Every slot undefined
    pub fn undefined(space: StateSpace) -> Self {
        Self { space, actions: vec![Action::Undefined; space.size()] }
    }

    pub fn space(&self) -> StateSpace {
        self.space
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn action(&self, state: State) -> Result<Action> {
        self.check_state(state)?;
        Ok(self.actions[state.id()])
    }

    fn check_state(&self, state: State) -> Result<()> {
        if state.space() != self.space {
            return Err(Error::SpaceMismatch {
                expected: self.space.size(),
                got: state.space().size(),
            });
        }
        Ok(())
    }

    /// Overwrite one slot
    pub fn set(&mut self, state: State, action: Action) -> Result<()> {
        self.check_state(state)?;
        self.actions[state.id()] = action;
        Ok(())
    }

    /// Ids of the slots that are not committed to a move
    pub fn free_slots(&self) -> Vec<usize> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_free())
            .map(|(i, _)| i)
            .collect()
    }

    /// Successors under every opponent branch, or `None` when the move at
    /// `state` is undefined. A wildcard branches over both own moves.
    pub fn possible_next_states(&self, state: State) -> Result<Option<Vec<State>>> {
        self.check_state(state)?;
        Ok(self.branches(state))
    }

    fn branches(&self, state: State) -> Option<Vec<State>> {
        let own: &[Move] = match self.actions[state.id()] {
            Action::Undefined => return None,
            Action::Wildcard => &BOTH,
            Action::Cooperate => &BOTH[..1],
            Action::Defect => &BOTH[1..],
        };
        let mut next = Vec::with_capacity(own.len() * self.space.opponent_branches());
        for m in own {
            for branch in 0..self.space.opponent_branches() {
                let mut moves = vec![*m];
                moves.extend(self.space.opponent_moves(branch));
                next.push(state.next(&moves));
            }
        }
        Some(next)
    }

    /// Transition graph over all opponent branches; undefined slots have no
    /// outgoing links
    pub fn transition_graph(&self) -> DirectedGraph {
        let mut g = DirectedGraph::new(self.len());
        for s in self.space.states() {
            for n in self.branches(s).into_iter().flatten() {
                g.push_link(s.id(), n.id());
            }
        }
        g
    }

    /// Self-play successors. A seat without a committed move contributes
    /// both moves, or blocks the transition when `skip_unfixed` is set.
    pub fn next_states_with_self(&self, state: State, skip_unfixed: bool) -> Result<Vec<State>> {
        self.check_state(state)?;
        Ok(self.self_play_branches(state, skip_unfixed))
    }

    fn self_play_branches(&self, state: State, skip_unfixed: bool) -> Vec<State> {
        let seats: Vec<&[Move]> = (0..self.space.histories())
            .map(|h| match self.actions[state.viewed_by(h).id()] {
                Action::Cooperate => &BOTH[..1],
                Action::Defect => &BOTH[1..],
                Action::Undefined | Action::Wildcard if skip_unfixed => &[][..],
                Action::Undefined | Action::Wildcard => &BOTH[..],
            })
            .collect();

        let mut combos: Vec<Vec<Move>> = vec![Vec::new()];
        for options in seats {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    options.iter().map(move |m| {
                        let mut moves = prefix.clone();
                        moves.push(*m);
                        moves
                    })
                })
                .collect();
        }
        combos.iter().map(|moves| state.next(moves)).collect()
    }

    /// The deterministic self-play successor
    pub fn next_state_with_self(&self, state: State) -> Result<State> {
        self.check_state(state)?;
        let moves = (0..self.space.histories())
            .map(|h| {
                let seat = state.viewed_by(h);
                self.actions[seat.id()]
                    .fixed()
                    .ok_or(Error::UndeterminedAction { state: seat.id() })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(state.next(&moves))
    }

    pub fn transition_graph_with_self(&self, skip_unfixed: bool) -> DirectedGraph {
        let mut g = DirectedGraph::new(self.len());
        for s in self.space.states() {
            for n in self.self_play_branches(s, skip_unfixed) {
                g.push_link(s.id(), n.id());
            }
        }
        g
    }

    /// [`Self::transition_graph`] weighted by the successor's relative payoff
    pub fn weighted_transition_graph(&self) -> DirectedWeightedGraph {
        let mut g = DirectedWeightedGraph::new(self.len());
        for s in self.space.states() {
            for n in self.branches(s).into_iter().flatten() {
                g.push_link(s.id(), n.id(), n.relative_payoff());
            }
        }
        g
    }

    /// No completion can be trapped in a losing cycle by any opponent
    pub fn is_defensible(&self) -> bool {
        !self.weighted_transition_graph().has_negative_cycle()
    }

    /// The total strategy, if every slot is committed
    pub fn to_strategy(&self) -> Result<Strategy> {
        let actions = self
            .actions
            .iter()
            .enumerate()
            .map(|(state, a)| a.fixed().ok_or(Error::UndeterminedAction { state }))
            .collect::<Result<Vec<_>>>()?;
        Strategy::new(self.space, actions)
    }

    /// Every total strategy obtained by fixing the free slots
    pub fn completions(&self) -> Completions {
        Completions::new(self.clone())
    }
}

impl From<&Strategy> for PartialStrategy {
    fn from(s: &Strategy) -> Self {
        Self {
            space: s.space(),
            actions: s.actions().iter().map(|m| Action::from(*m)).collect(),
        }
    }
}

impl FromStr for PartialStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let space = StateSpace::for_len(s.chars().count())?;
        let actions = s
            .chars()
            .enumerate()
            .map(|(position, c)| {
                Action::from_char(c).ok_or_else(|| {
                    Error::encoding(format!("unexpected character '{}' at position {}", c, position))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { space, actions })
    }
}

impl fmt::Display for PartialStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for a in &self.actions {
            write!(f, "{}", a.to_char())?;
        }
        Ok(())
    }
}

/// Lazy odometer over the completions of a partial strategy.
///
/// Free slots take `c` before `d`; the lowest free id varies slowest.
/// Dropping the iterator early is always safe, and [`Completions::restart`]
/// rewinds it.
#[derive(Clone, Debug)]
pub struct Completions {
    template: PartialStrategy,
    free: Vec<usize>,
    digits: Option<Vec<bool>>,
}

impl Completions {
    fn new(template: PartialStrategy) -> Self {
        let free = template.free_slots();
        let digits = Some(vec![false; free.len()]);
        Self { template, free, digits }
    }

    pub fn restart(&mut self) {
        self.digits = Some(vec![false; self.free.len()]);
    }

    /// Number of free slots
    pub fn free_slots(&self) -> usize {
        self.free.len()
    }

    /// Completions left to yield. `None` when the count does not fit in
    /// a `u128`.
    pub fn len(&self) -> Option<u128> {
        let Some(digits) = &self.digits else { return Some(0) };
        let total = 1u128.checked_shl(u32::try_from(digits.len()).ok()?)?;
        let done = digits.iter().fold(0u128, |n, d| (n << 1) | u128::from(*d));
        Some(total - done)
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_none()
    }
}

impl Iterator for Completions {
    type Item = Strategy;

    fn next(&mut self) -> Option<Strategy> {
        let digits = self.digits.as_mut()?;
        let mut actions: Vec<Move> = self
            .template
            .actions
            .iter()
            .map(|a| a.fixed().unwrap_or(Move::Cooperate))
            .collect();
        for (slot, d) in self.free.iter().zip(digits.iter()) {
            actions[*slot] = Move::from_bit(*d);
        }

        // advance, least significant digit last
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d {
                *d = false;
            } else {
                *d = true;
                carry = false;
                break;
            }
        }
        if carry {
            self.digits = None;
        }

        Strategy::new(self.template.space, actions).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.len().map(usize::try_from) {
            Some(Ok(n)) => (n, Some(n)),
            _ => (usize::MAX, None),
        }
    }
}
