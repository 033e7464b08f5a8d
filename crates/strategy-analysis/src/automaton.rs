//! Moore-machine view of a strategy and its minimization
//!
//! Each state outputs the focal move; inputs are the joint moves of the
//! other histories (one bit per history, history 1 most significant).
//! Minimization is partition refinement: blocks start split by output and
//! are refined by the per-input block of each successor until stable.

use std::collections::HashMap;
use std::hash::Hash;
use log::debug;
use serde::Serialize;
use crate::error::{Error, Result};
use crate::graph::DirectedGraph;
use crate::strategy::{Move, Strategy};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Automaton {
    outputs: Vec<Move>,
    transitions: Vec<Vec<usize>>,
}

/// Result of [`Automaton::minimize`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Minimized {
    /// Block of every original state. Blocks are numbered by first
    /// occurrence, so state 0 is always in block 0.
    pub partition: Vec<usize>,
    /// Quotient machine over the blocks
    pub automaton: Automaton,
}

impl Automaton {
    pub fn new(outputs: Vec<Move>, transitions: Vec<Vec<usize>>) -> Result<Self> {
        if outputs.len() != transitions.len() {
            return Err(Error::SpaceMismatch { expected: outputs.len(), got: transitions.len() });
        }
        let inputs = transitions.first().map_or(0, Vec::len);
        for row in &transitions {
            if row.len() != inputs {
                return Err(Error::SpaceMismatch { expected: inputs, got: row.len() });
            }
            if let Some(&bad) = row.iter().find(|t| **t >= outputs.len()) {
                return Err(Error::InvalidStateIndex { index: bad, size: outputs.len() });
            }
        }
        Ok(Self { outputs, transitions })
    }

    pub fn from_strategy(strategy: &Strategy) -> Self {
        let space = strategy.space();
        let outputs = strategy.actions().to_vec();
        let transitions = space
            .states()
            .map(|s| strategy.branches(s).iter().map(|n| n.id()).collect())
            .collect();
        Self { outputs, transitions }
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn output(&self, state: usize) -> Option<Move> {
        self.outputs.get(state).copied()
    }

    pub fn next(&self, state: usize, input: usize) -> Option<usize> {
        self.transitions.get(state)?.get(input).copied()
    }

    /// Links of every state, one per distinct successor
    pub fn to_graph(&self) -> DirectedGraph {
        let mut g = DirectedGraph::new(self.len());
        for (from, row) in self.transitions.iter().enumerate() {
            for &to in row {
                if !g.has_link(from, to) {
                    g.push_link(from, to);
                }
            }
        }
        g
    }

    pub fn minimize(&self) -> Minimized {
        let mut blocks = canonical(&self.outputs);
        let mut count = block_count(&blocks);
        for round in 1.. {
            let signatures: Vec<(usize, Vec<usize>)> = self
                .transitions
                .iter()
                .enumerate()
                .map(|(i, row)| (blocks[i], row.iter().map(|t| blocks[*t]).collect()))
                .collect();
            let refined = canonical(&signatures);
            let refined_count = block_count(&refined);
            debug!("refinement round {}: {} -> {} blocks", round, count, refined_count);
            if refined_count == count {
                break;
            }
            blocks = refined;
            count = refined_count;
        }

        let mut outputs = vec![Move::Cooperate; count];
        let mut transitions = vec![Vec::new(); count];
        let mut seen = vec![false; count];
        for (state, &block) in blocks.iter().enumerate() {
            if seen[block] {
                continue;
            }
            seen[block] = true;
            outputs[block] = self.outputs[state];
            transitions[block] = self.transitions[state].iter().map(|t| blocks[*t]).collect();
        }
        Minimized { partition: blocks, automaton: Automaton { outputs, transitions } }
    }
}

impl Minimized {
    /// Original states grouped by block
    pub fn classes(&self) -> Vec<Vec<usize>> {
        let mut classes = vec![Vec::new(); self.automaton.len()];
        for (state, &block) in self.partition.iter().enumerate() {
            classes[block].push(state);
        }
        classes
    }
}

/// Number each distinct key by first occurrence
fn canonical<K: Eq + Hash + Clone>(keys: &[K]) -> Vec<usize> {
    let mut ids: HashMap<K, usize> = HashMap::new();
    keys.iter()
        .map(|k| {
            let next = ids.len();
            *ids.entry(k.clone()).or_insert(next)
        })
        .collect()
}

fn block_count(blocks: &[usize]) -> usize {
    blocks.iter().max().map_or(0, |m| m + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateSpace;
    use crate::strategy::tests::TFT_ATFT;

    fn size(s: &Strategy) -> usize {
        Automaton::from_strategy(s).minimize().automaton.len()
    }

    #[test]
    fn test_reference_sizes() {
        assert_eq!(size(&Strategy::all_cooperate(StateSpace::M3)), 1);
        assert_eq!(size(&Strategy::all_defect(StateSpace::M3)), 1);
        assert_eq!(size(&Strategy::tit_for_tat(StateSpace::M3)), 2);
        assert_eq!(size(&Strategy::win_stay_lose_shift(StateSpace::M3)), 2);
        assert_eq!(size(&Strategy::tit_for_tat(StateSpace::M3_EXTENDED)), 2);
    }

    #[test]
    fn test_tft_partition() {
        let m = Automaton::from_strategy(&Strategy::tit_for_tat(StateSpace::M3)).minimize();
        assert_eq!(m.partition[0], 0);
        assert!(m.partition.iter().enumerate().all(|(i, b)| *b == i % 2));
        assert_eq!(m.automaton.output(1), Some(Move::Defect));
        assert_eq!(m.automaton.next(0, 1), Some(1));
        assert_eq!(m.automaton.next(1, 0), Some(0));
        assert_eq!(m.classes()[1].len(), 32);
    }

    #[test]
    fn test_minimize_is_idempotent() {
        let strategies = [
            Strategy::tit_for_tat(StateSpace::M3),
            Strategy::grim_trigger(StateSpace::M3),
            TFT_ATFT.parse().unwrap(),
        ];
        for s in strategies {
            let once = Automaton::from_strategy(&s).minimize();
            let twice = once.automaton.minimize();
            assert_eq!(twice.partition, (0..once.automaton.len()).collect::<Vec<_>>());
            assert_eq!(twice.automaton, once.automaton);
        }
    }

    #[test]
    fn test_quotient_graph() {
        let m = Automaton::from_strategy(&Strategy::win_stay_lose_shift(StateSpace::M3)).minimize();
        let g = m.automaton.to_graph();
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn test_new_validates() {
        assert!(Automaton::new(vec![Move::Cooperate], vec![vec![0, 1]]).is_err());
        assert!(Automaton::new(vec![Move::Cooperate; 2], vec![vec![0]]).is_err());
        assert!(Automaton::new(vec![Move::Cooperate; 2], vec![vec![1], vec![0, 1]]).is_err());
        let a = Automaton::new(vec![Move::Cooperate, Move::Defect], vec![vec![1], vec![0]]).unwrap();
        assert_eq!(a.minimize().automaton.len(), 2);
    }
}
