//! Deterministic memory-3 strategies
//!
//! A strategy is an action table indexed by state id. Text encoding is one
//! `c`/`d` character per state in increasing id order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::graph::{Attributes, DirectedGraph, DotOptions};
use crate::state::{State, StateSpace};
use crate::weighted::DirectedWeightedGraph;

/// A move in the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Move {
    Cooperate,
    Defect,
}

impl Move {
    /// `true` is defection, matching the bit encoding of states and ids
    pub fn from_bit(defect: bool) -> Self {
        if defect {
            Move::Defect
        } else {
            Move::Cooperate
        }
    }

    pub fn is_defect(self) -> bool {
        self == Move::Defect
    }

    pub fn flip(self) -> Self {
        match self {
            Move::Cooperate => Move::Defect,
            Move::Defect => Move::Cooperate,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Move::Cooperate => 'c',
            Move::Defect => 'd',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'c' => Some(Move::Cooperate),
            'd' => Some(Move::Defect),
            _ => None,
        }
    }
}

/// Short names accepted by [`Strategy::reference`], with descriptions
pub const REFERENCE_STRATEGIES: [(&str, &str); 5] = [
    ("allc", "Always cooperate."),
    ("alld", "Always defect."),
    ("tft", "Copy the opponent's last move."),
    ("wsls", "Cooperate iff both players made the same move last round."),
    ("grim", "Cooperate until anyone defects, then defect while it is remembered."),
];

/// Total action table over a state space
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Strategy {
    space: StateSpace,
    actions: Vec<Move>,
}

impl Strategy {
    pub fn new(space: StateSpace, actions: Vec<Move>) -> Result<Self> {
        if actions.len() != space.size() {
            return Err(Error::encoding(format!(
                "expected {} actions, got {}",
                space.size(),
                actions.len()
            )));
        }
        Ok(Self { space, actions })
    }

    /// Build the table by evaluating `rule` at every state
    pub fn from_fn(space: StateSpace, rule: impl Fn(State) -> Move) -> Self {
        Self { space, actions: space.states().map(rule).collect() }
    }

    pub fn all_cooperate(space: StateSpace) -> Self {
        Self::from_fn(space, |_| Move::Cooperate)
    }

    pub fn all_defect(space: StateSpace) -> Self {
        Self::from_fn(space, |_| Move::Defect)
    }

    /// Copy the opponent's last move
    pub fn tit_for_tat(space: StateSpace) -> Self {
        Self::from_fn(space, |s| s.last(1))
    }

    /// Cooperate iff both players made the same move last round
    pub fn win_stay_lose_shift(space: StateSpace) -> Self {
        Self::from_fn(space, |s| Move::from_bit(s.last(0) != s.last(1)))
    }

    /// Cooperate only while every remembered move is a cooperation
    pub fn grim_trigger(space: StateSpace) -> Self {
        Self::from_fn(space, |s| Move::from_bit(s.id() != 0))
    }

    /// Look up a reference strategy by short name
    pub fn reference(name: &str, space: StateSpace) -> Option<Self> {
        match name {
            "allc" => Some(Self::all_cooperate(space)),
            "alld" => Some(Self::all_defect(space)),
            "tft" => Some(Self::tit_for_tat(space)),
            "wsls" => Some(Self::win_stay_lose_shift(space)),
            "grim" => Some(Self::grim_trigger(space)),
            _ => None,
        }
    }

    /// Lift a strategy that only reads the last `depth` rounds of every
    /// history. `encoding` has one character per shorter-memory state,
    /// laid out the same way as full states.
    pub fn from_shorter_memory(space: StateSpace, depth: usize, encoding: &str) -> Result<Self> {
        if depth == 0 || depth > space.depth() {
            return Err(Error::encoding(format!(
                "memory depth {} is not between 1 and {}",
                depth,
                space.depth()
            )));
        }
        let short = parse_moves(encoding, 1 << (space.histories() * depth))?;
        let mask = (1 << depth) - 1;
        Ok(Self::from_fn(space, |s| {
            let index = (0..space.histories()).fold(0usize, |index, history| {
                let group = (s.id() >> space.shift(history)) & mask;
                (index << depth) | group
            });
            short[index]
        }))
    }

    /// Decode the numeric form: bit `i` set iff state `i` defects
    pub fn from_id(id: u64) -> Self {
        Self::from_fn(StateSpace::M3, |s| Move::from_bit((id >> s.id()) & 1 == 1))
    }

    /// Numeric form. Only the 64-state space fits.
    pub fn to_id(&self) -> Result<u64> {
        if self.space != StateSpace::M3 {
            return Err(Error::SpaceMismatch {
                expected: StateSpace::M3.size(),
                got: self.space.size(),
            });
        }
        Ok(self
            .actions
            .iter()
            .enumerate()
            .fold(0u64, |id, (i, m)| id | (u64::from(m.is_defect()) << i)))
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

    pub fn actions(&self) -> &[Move] {
        &self.actions
    }

    /// Prescribed move at `state`. Fails for a state of another space.
    pub fn action(&self, state: State) -> Result<Move> {
        self.check_state(state)?;
        Ok(self.play(state))
    }

    fn play(&self, state: State) -> Move {
        self.actions[state.id()]
    }

    pub fn action_at(&self, id: usize) -> Result<Move> {
        self.actions
            .get(id)
            .copied()
            .ok_or(Error::InvalidStateIndex { index: id, size: self.len() })
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

    fn check_space(&self, other: &Strategy) -> Result<()> {
        if self.space != other.space {
            return Err(Error::SpaceMismatch {
                expected: self.space.size(),
                got: other.space.size(),
            });
        }
        Ok(())
    }

    /// Successors with our own move fixed, one per opponent branch
    pub fn possible_next_states(&self, state: State) -> Result<Vec<State>> {
        self.check_state(state)?;
        Ok(self.branches(state))
    }

    pub(crate) fn branches(&self, state: State) -> Vec<State> {
        let own = self.play(state);
        (0..self.space.opponent_branches())
            .map(|branch| {
                let mut moves = vec![own];
                moves.extend(self.space.opponent_moves(branch));
                state.next(&moves)
            })
            .collect()
    }

    /// Successor when every seat plays this strategy
    pub fn next_state_with_self(&self, state: State) -> Result<State> {
        self.next_state_with(state, self)
    }

    /// Successor when we play `self` and every other seat plays `other`,
    /// each reading the round from its own view
    pub fn next_state_with(&self, state: State, other: &Strategy) -> Result<State> {
        self.check_state(state)?;
        self.check_space(other)?;
        Ok(self.step_with(state, other))
    }

    /// Both strategies and `state` share one space
    pub(crate) fn step_with(&self, state: State, other: &Strategy) -> State {
        let moves: Vec<Move> = std::iter::once(self.play(state))
            .chain((1..self.space.histories()).map(|h| other.play(state.viewed_by(h))))
            .collect();
        state.next(&moves)
    }

    /// Every state linked to each successor it can reach under any opponent
    pub fn transition_graph(&self) -> DirectedGraph {
        let mut g = DirectedGraph::new(self.len());
        for s in self.space.states() {
            for n in self.branches(s) {
                g.push_link(s.id(), n.id());
            }
        }
        g
    }

    /// Deterministic self-play graph: exactly one link per state
    pub fn transition_graph_with_self(&self) -> DirectedGraph {
        self.graph_with(self)
    }

    pub fn transition_graph_with(&self, other: &Strategy) -> Result<DirectedGraph> {
        self.check_space(other)?;
        Ok(self.graph_with(other))
    }

    /// `other` shares this space
    pub(crate) fn graph_with(&self, other: &Strategy) -> DirectedGraph {
        let mut g = DirectedGraph::new(self.len());
        for s in self.space.states() {
            g.push_link(s.id(), self.step_with(s, other).id());
        }
        g
    }

    /// [`Self::transition_graph`] weighted by the successor's relative payoff
    pub fn weighted_transition_graph(&self) -> DirectedWeightedGraph {
        let mut g = DirectedWeightedGraph::new(self.len());
        for s in self.space.states() {
            for n in self.branches(s) {
                g.push_link(s.id(), n.id(), n.relative_payoff());
            }
        }
        g
    }

    /// Self-play path from `start`, stopping before the first repeated state
    pub fn trace_with_self(&self, start: State) -> Result<Vec<State>> {
        self.check_state(start)?;
        let mut seen = vec![false; self.len()];
        let mut path = Vec::new();
        let mut current = start;
        while !seen[current.id()] {
            seen[current.id()] = true;
            path.push(current);
            current = self.step_with(current, self);
        }
        Ok(path)
    }

    /// How many recent rounds of (own, others') history the action table
    /// actually reads.
    ///
    /// For every pair of states that differ only inside one history and
    /// prescribe different moves, the shortest differing suffix of that
    /// history is a lower bound. Returns the maximum for history 0 and the
    /// maximum over the remaining histories.
    pub fn minimal_memory_length(&self) -> (usize, usize) {
        let space = self.space;
        let mut lengths = vec![0usize; space.histories()];
        for s in space.states() {
            for (history, length) in lengths.iter_mut().enumerate() {
                let shift = space.shift(history);
                let group = (s.id() >> shift) & space.group_mask();
                for other in (group + 1)..=space.group_mask() {
                    let id = (s.id() & !(space.group_mask() << shift)) | (other << shift);
                    if self.actions[id] == self.play(s) {
                        continue;
                    }
                    let suffix = (group ^ other).trailing_zeros() as usize + 1;
                    *length = (*length).max(suffix);
                }
            }
        }
        let others = lengths[1..].iter().copied().max().unwrap_or(0);
        (lengths[0], others)
    }

    /// DOT labels `<id>_<state>`, filled by prescribed move
    pub fn node_attributes(&self) -> BTreeMap<usize, Attributes> {
        self.space
            .states()
            .map(|s| {
                let fill = match self.play(s) {
                    Move::Cooperate => "lightblue",
                    Move::Defect => "salmon",
                };
                let attributes = Attributes::from([
                    ("label".to_string(), format!("{}_{}", s.id(), s)),
                    ("style".to_string(), "filled".to_string()),
                    ("fillcolor".to_string(), fill.to_string()),
                ]);
                (s.id(), attributes)
            })
            .collect()
    }
}

impl Strategy {
    /// DOT text of the self-play graph, or of the graph against `with`
    pub fn to_dot(&self, with: Option<&Strategy>, remove_isolated: bool) -> Result<String> {
        let graph = match with {
            Some(other) => self.transition_graph_with(other)?,
            None => self.transition_graph_with_self(),
        };
        let options = DotOptions {
            remove_isolated,
            node_attributes: self.node_attributes(),
            ..DotOptions::default()
        };
        Ok(graph.to_dot(&options))
    }
}

fn parse_moves(encoding: &str, expected: usize) -> Result<Vec<Move>> {
    let count = encoding.chars().count();
    if count != expected {
        return Err(Error::encoding(format!("expected {} characters, got {}", expected, count)));
    }
    encoding
        .chars()
        .enumerate()
        .map(|(position, c)| {
            Move::from_char(c).ok_or_else(|| {
                Error::encoding(format!("unexpected character '{}' at position {}", c, position))
            })
        })
        .collect()
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let space = StateSpace::for_len(s.chars().count())?;
        let actions = parse_moves(s, space.size())?;
        Ok(Self { space, actions })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.actions {
            write!(f, "{}", m.to_char())?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Strategy {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Strategy> for String {
    fn from(s: Strategy) -> String {
        s.to_string()
    }
}
